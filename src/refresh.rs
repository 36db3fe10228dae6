/// Interim refresh timer
///
/// Tracks elapsed wall-clock time since recording started or since the last
/// interim emission, whichever came later. The engine consults this to avoid
/// flooding the decoder with interim requests. The anchor restarts on every
/// emission, so interim updates pace themselves off wall time rather than
/// accumulated audio.

use std::time::{Duration, Instant};

use crate::constants::segmentation::MIN_REFRESH_SECS;

/// Per-utterance refresh state. Created at speech onset, dropped at
/// utterance end.
#[derive(Debug, Clone)]
pub struct RefreshClock {
    /// Recording start, then re-anchored to each interim emission
    anchor: Instant,
    /// When the last interim was emitted, if any
    last_emitted: Option<Instant>,
}

impl RefreshClock {
    pub fn started_at(now: Instant) -> Self {
        RefreshClock {
            anchor: now,
            last_emitted: None,
        }
    }

    /// True once more than the minimum refresh interval has passed since the
    /// anchor. The sample floor is the engine's concern, not the clock's.
    pub fn refresh_due(&self, now: Instant) -> bool {
        now.duration_since(self.anchor) > Duration::from_secs_f32(MIN_REFRESH_SECS)
    }

    /// Restart the refresh window from this emission.
    pub fn mark_emitted(&mut self, now: Instant) {
        self.anchor = now;
        self.last_emitted = Some(now);
    }

    pub fn last_emitted(&self) -> Option<Instant> {
        self.last_emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_due_immediately() {
        let t0 = Instant::now();
        let clock = RefreshClock::started_at(t0);
        assert!(!clock.refresh_due(t0));
        assert!(!clock.refresh_due(t0 + Duration::from_millis(50)));
    }

    #[test]
    fn test_due_after_interval() {
        let t0 = Instant::now();
        let clock = RefreshClock::started_at(t0);
        assert!(clock.refresh_due(t0 + Duration::from_millis(150)));
    }

    #[test]
    fn test_mark_emitted_restarts_window() {
        let t0 = Instant::now();
        let mut clock = RefreshClock::started_at(t0);

        let t1 = t0 + Duration::from_millis(150);
        assert!(clock.refresh_due(t1));
        clock.mark_emitted(t1);

        // Window restarts from the emission, not from recording start
        assert!(!clock.refresh_due(t1 + Duration::from_millis(50)));
        assert!(clock.refresh_due(t1 + Duration::from_millis(150)));
        assert_eq!(clock.last_emitted(), Some(t1));
    }

    #[test]
    fn test_boundary_is_exclusive() {
        let t0 = Instant::now();
        let clock = RefreshClock::started_at(t0);
        // Strictly greater than the interval, not equal
        assert!(!clock.refresh_due(t0 + Duration::from_secs_f32(MIN_REFRESH_SECS)));
    }
}
