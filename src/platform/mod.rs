//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Frame timing (display callback timestamps)
//! - Cooperative start/stop of the frame loop

/// Converts display-callback timestamps into frame deltas.
///
/// The host keeps requesting frames while `is_running`; a callback that was
/// already scheduled when `stop` was called gets `None` and does no work.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last_ms: Option<f64>,
    running: bool,
    frames: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        if !self.running {
            log::info!("frame loop started");
        }
        self.running = true;
        self.last_ms = None;
    }

    pub fn stop(&mut self) {
        if self.running {
            log::info!("frame loop stopped after {} frames", self.frames);
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Forget the previous timestamp (tab hidden, window blurred)
    pub fn resync(&mut self) {
        self.last_ms = None;
    }

    /// Seconds since the previous tick. `None` while stopped, on the first
    /// tick after (re)start, and when the clock went backwards.
    pub fn tick(&mut self, now_ms: f64) -> Option<f32> {
        if !self.running {
            return None;
        }
        let last = self.last_ms.replace(now_ms)?;
        let dt = (now_ms - last) / 1000.0;
        if dt <= 0.0 {
            return None;
        }
        self.frames += 1;
        Some(dt as f32)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_has_no_delta() {
        let mut clock = FrameClock::new();
        clock.start();
        assert_eq!(clock.tick(1000.0), None);
        let dt = clock.tick(1016.0).unwrap();
        assert!((dt - 0.016).abs() < 1e-6);
    }

    #[test]
    fn test_stopped_clock_yields_nothing() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(0.0), None);

        clock.start();
        clock.tick(0.0);
        clock.tick(16.0);
        clock.stop();
        // Callback scheduled before stop
        assert_eq!(clock.tick(32.0), None);
        assert_eq!(clock.frames(), 1);

        clock.start();
        assert_eq!(clock.tick(5000.0), None, "no stall-sized delta after restart");
        assert!(clock.tick(5010.0).is_some());
    }

    #[test]
    fn test_backwards_clock_ignored() {
        let mut clock = FrameClock::new();
        clock.start();
        clock.tick(100.0);
        assert_eq!(clock.tick(90.0), None);
        assert!(clock.tick(110.0).is_some());
    }
}
