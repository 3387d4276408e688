//! Mixer — sums voice outputs into a dry bus and an echo send bus.

/// Per-sample accumulator for the voice pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MixBus {
    /// Sum of every voice.
    pub dry: i32,
    /// Sum of voices routed to the echo.
    pub send: i32,
}

impl MixBus {
    pub fn new() -> Self {
        MixBus::default()
    }

    /// Add one voice sample.
    #[inline]
    pub fn add(&mut self, sample: i32, echo_send: bool) {
        self.dry += sample;
        if echo_send {
            self.send += sample;
        }
    }
}

/// Clip a bipolar sample to the 8-bit range around zero.
#[inline]
pub fn clip(sample: i32) -> i16 {
    sample.clamp(-128, 127) as i16
}

/// Convert a bipolar sample to an 8-bit PWM duty. Silence is 128.
#[inline]
pub fn to_duty(sample: i32) -> u8 {
    (clip(sample) + 128) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bus_is_silent() {
        let bus = MixBus::new();
        assert_eq!(bus.dry, 0);
        assert_eq!(to_duty(bus.dry), 128);
    }

    #[test]
    fn accumulates_samples() {
        let mut bus = MixBus::new();
        bus.add(50, false);
        bus.add(-20, true);
        bus.add(7, true);
        assert_eq!(bus.dry, 37);
        assert_eq!(bus.send, -13);
    }

    #[test]
    fn clip_prevents_overflow() {
        assert_eq!(to_duty(4 * 127), 255);
        assert_eq!(to_duty(-4 * 127), 0);
        assert_eq!(to_duty(-127), 1);
        assert_eq!(clip(300), 127);
    }
}
