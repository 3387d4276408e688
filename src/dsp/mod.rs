//! DSP — fixed-point synthesis that runs inside the sample interrupt.
//!
//! Everything here is integer-only and allocation-free once constructed, so
//! the same code drives a microcontroller timer and the offline renderer.

pub mod echo;
pub mod envelope;
pub mod mixer;
pub mod oscillator;
pub mod renderer;
pub mod synth;
pub mod voice;
