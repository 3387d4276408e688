//! Equal-tempered note frequencies in whole Hz (A4 = 440).

/// A rest: no pitch.
pub const REST: u16 = 0;

/// Sixteenth note, the sequencer tick.
pub const DUR_16: u16 = 1;
pub const DUR_8: u16 = 2;
pub const DUR_4: u16 = 4;
pub const DUR_2: u16 = 8;
pub const DUR_1: u16 = 16;

// Octave 2
pub const NOTE_C2: u16 = 65;
pub const NOTE_CS2: u16 = 69;
pub const NOTE_D2: u16 = 73;
pub const NOTE_DS2: u16 = 78;
pub const NOTE_E2: u16 = 82;
pub const NOTE_F2: u16 = 87;
pub const NOTE_FS2: u16 = 92;
pub const NOTE_G2: u16 = 98;
pub const NOTE_GS2: u16 = 104;
pub const NOTE_A2: u16 = 110;
pub const NOTE_AS2: u16 = 117;
pub const NOTE_B2: u16 = 123;

// Octave 3
pub const NOTE_C3: u16 = 131;
pub const NOTE_CS3: u16 = 139;
pub const NOTE_D3: u16 = 147;
pub const NOTE_DS3: u16 = 156;
pub const NOTE_E3: u16 = 165;
pub const NOTE_F3: u16 = 175;
pub const NOTE_FS3: u16 = 185;
pub const NOTE_G3: u16 = 196;
pub const NOTE_GS3: u16 = 208;
pub const NOTE_A3: u16 = 220;
pub const NOTE_AS3: u16 = 233;
pub const NOTE_B3: u16 = 247;

// Octave 4
pub const NOTE_C4: u16 = 262;
pub const NOTE_CS4: u16 = 277;
pub const NOTE_D4: u16 = 294;
pub const NOTE_DS4: u16 = 311;
pub const NOTE_E4: u16 = 330;
pub const NOTE_F4: u16 = 349;
pub const NOTE_FS4: u16 = 370;
pub const NOTE_G4: u16 = 392;
pub const NOTE_GS4: u16 = 415;
pub const NOTE_A4: u16 = 440;
pub const NOTE_AS4: u16 = 466;
pub const NOTE_B4: u16 = 494;

// Octave 5
pub const NOTE_C5: u16 = 523;
pub const NOTE_CS5: u16 = 554;
pub const NOTE_D5: u16 = 587;
pub const NOTE_DS5: u16 = 622;
pub const NOTE_E5: u16 = 659;
pub const NOTE_F5: u16 = 698;
pub const NOTE_FS5: u16 = 740;
pub const NOTE_G5: u16 = 784;
pub const NOTE_GS5: u16 = 831;
pub const NOTE_A5: u16 = 880;
pub const NOTE_AS5: u16 = 932;
pub const NOTE_B5: u16 = 988;

// Octave 6
pub const NOTE_C6: u16 = 1047;
pub const NOTE_CS6: u16 = 1109;
pub const NOTE_D6: u16 = 1175;
pub const NOTE_DS6: u16 = 1245;
pub const NOTE_E6: u16 = 1319;
pub const NOTE_F6: u16 = 1397;
pub const NOTE_FS6: u16 = 1480;
pub const NOTE_G6: u16 = 1568;
pub const NOTE_GS6: u16 = 1661;
pub const NOTE_A6: u16 = 1760;
pub const NOTE_AS6: u16 = 1865;
pub const NOTE_B6: u16 = 1976;

/// One octave from C4, used by twelve-key keypads.
pub const CHROMATIC_C4: [u16; 12] = [
    NOTE_C4, NOTE_CS4, NOTE_D4, NOTE_DS4, NOTE_E4, NOTE_F4, NOTE_FS4, NOTE_G4, NOTE_GS4, NOTE_A4,
    NOTE_AS4, NOTE_B4,
];
