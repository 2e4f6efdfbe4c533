use crate::config::PlaybackSettings;

/// A cancellable periodic timer driven by caller-supplied monotonic
/// timestamps in milliseconds, independent of the host's frame rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Playback {
    interval_ms: f64,
    active: bool,
    last_tick: Option<f64>,
}

impl Playback {
    pub fn new(settings: PlaybackSettings) -> Self {
        Self {
            interval_ms: settings.interval_ms,
            active: false,
            last_tick: None,
        }
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Activates the timer. The first poll at or after `now` is due immediately.
    pub fn start(&mut self, now: f64) {
        self.active = true;
        self.last_tick = None;
        log::trace!("playback started at {now}");
    }

    pub fn cancel(&mut self) {
        self.active = false;
        self.last_tick = None;
    }

    /// Returns `true` when a tick is due at `now` and records it.
    pub fn poll(&mut self, now: f64) -> bool {
        if !self.active {
            return false;
        }
        match self.last_tick {
            Some(last) if now - last < self.interval_ms => false,
            _ => {
                self.last_tick = Some(now);
                true
            }
        }
    }
}

impl Default for Playback {
    fn default() -> Self {
        Self::new(PlaybackSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_timer_never_ticks() {
        let mut playback = Playback::default();
        assert!(!playback.poll(0.0));
        assert!(!playback.poll(10_000.0));
    }

    #[test]
    fn ticks_respect_interval() {
        let mut playback = Playback::new(PlaybackSettings { interval_ms: 100.0 });
        playback.start(1_000.0);
        assert!(playback.poll(1_000.0));
        assert!(!playback.poll(1_050.0));
        assert!(!playback.poll(1_099.9));
        assert!(playback.poll(1_100.0));
        // A late frame does not queue extra ticks.
        assert!(playback.poll(1_500.0));
        assert!(!playback.poll(1_550.0));
    }

    #[test]
    fn cancel_stops_and_restart_ticks_immediately() {
        let mut playback = Playback::default();
        playback.start(0.0);
        assert!(playback.poll(0.0));
        playback.cancel();
        assert!(!playback.is_active());
        assert!(!playback.poll(1_000.0));

        playback.start(1_010.0);
        assert!(playback.poll(1_010.0));
    }
}
