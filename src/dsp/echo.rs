//! Echo — circular delay line with feedback and dry/wet mix.

use crate::fixed::ms_to_samples;

/// Echo settings as requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EchoSettings {
    pub enabled: bool,
    pub delay_ms: u16,
    /// Amount of the delayed signal fed back into the line (0..=255).
    pub feedback: u8,
    /// Dry/wet balance: 0 = dry only, 255 = wet only.
    pub mix: u8,
}

/// A mono echo effect over a fixed buffer.
///
/// The buffer is allocated once at construction and never resized. If the
/// allocation fails the echo stays permanently disabled and every call to
/// [`Echo::process`] passes the dry signal through.
#[derive(Debug)]
pub struct Echo {
    buffer: Option<Box<[i16]>>,
    write_pos: usize,
    delay_samples: usize,
    enabled: bool,
    feedback: i32,
    mix: i32,
}

impl Echo {
    /// Create an echo able to hold `capacity` samples of delay.
    pub fn with_capacity(capacity: usize) -> Self {
        let buffer = allocate(capacity);
        if buffer.is_none() {
            log::warn!("echo buffer of {capacity} samples unavailable, echo disabled");
        }
        Echo {
            buffer,
            write_pos: 0,
            delay_samples: 0,
            enabled: false,
            feedback: 0,
            mix: 0,
        }
    }

    /// Apply new settings.
    ///
    /// The delay is clamped to the buffer capacity. Changing settings while
    /// audio is running takes effect on the next processed sample. Turning
    /// the echo back on starts from an empty line.
    pub fn configure(&mut self, settings: &EchoSettings, sample_rate: u32) {
        let requested = ms_to_samples(settings.delay_ms as u32, sample_rate) as usize;
        self.delay_samples = requested.min(self.capacity());
        self.feedback = settings.feedback as i32;
        self.mix = settings.mix as i32;
        let was_enabled = self.enabled;
        self.enabled = settings.enabled && self.buffer.is_some();
        if self.enabled && !was_enabled {
            self.clear();
        }
    }

    /// Mix one sample.
    ///
    /// `dry` is the full voice mix, `send` the part of it routed into the
    /// echo. When the echo is disabled the buffer is neither read nor
    /// written and `dry` is returned unchanged.
    #[inline]
    pub fn process(&mut self, dry: i32, send: i32) -> i32 {
        if !self.enabled {
            return dry;
        }
        let Some(buffer) = self.buffer.as_deref_mut() else {
            return dry;
        };
        let capacity = buffer.len();

        let wet = if self.delay_samples == 0 {
            send
        } else {
            let read_pos = (self.write_pos + capacity - self.delay_samples) % capacity;
            buffer[read_pos] as i32
        };

        let tail = send + self.feedback * wet / 255;
        buffer[self.write_pos] = saturate(tail);
        self.write_pos = (self.write_pos + 1) % capacity;

        (dry * (255 - self.mix) + wet * self.mix) / 255
    }

    /// Zero the delay line.
    pub fn clear(&mut self) {
        if let Some(buffer) = self.buffer.as_deref_mut() {
            buffer.fill(0);
        }
        self.write_pos = 0;
    }

    pub fn capacity(&self) -> usize {
        self.buffer.as_ref().map_or(0, |b| b.len())
    }

    pub fn delay_samples(&self) -> usize {
        self.delay_samples
    }

    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// False when the buffer could not be allocated.
    pub fn is_available(&self) -> bool {
        self.buffer.is_some()
    }
}

fn allocate(capacity: usize) -> Option<Box<[i16]>> {
    if capacity == 0 {
        return None;
    }
    let mut storage: Vec<i16> = Vec::new();
    storage.try_reserve_exact(capacity).ok()?;
    storage.resize(capacity, 0);
    Some(storage.into_boxed_slice())
}

fn saturate(v: i32) -> i16 {
    v.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
