// Staged animations as named phases on a timeline
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    pub name: &'static str,
    pub duration: Duration,
}

impl Phase {
    pub const fn new(name: &'static str, duration: Duration) -> Self {
        Self { name, duration }
    }
}

/// A fixed list of phases anchored at a start instant.
///
/// Nothing runs on its own: owners ask which phase is active at a given
/// instant and when the next boundary falls, so tests can step through a
/// sequence without waiting on a wall clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    started: Instant,
    phases: Vec<Phase>,
}

impl Sequence {
    pub fn start(at: Instant, phases: impl IntoIterator<Item = Phase>) -> Self {
        Self {
            started: at,
            phases: phases.into_iter().collect(),
        }
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn ends_at(&self) -> Instant {
        self.started + self.phases.iter().map(|p| p.duration).sum::<Duration>()
    }

    /// Active phase at `now`; `None` once every phase has elapsed.
    pub fn phase_at(&self, now: Instant) -> Option<&'static str> {
        let mut boundary = self.started;
        for phase in &self.phases {
            boundary += phase.duration;
            if now < boundary {
                return Some(phase.name);
            }
        }
        None
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        now >= self.ends_at()
    }

    /// First phase boundary strictly after `now`.
    pub fn next_boundary(&self, now: Instant) -> Option<Instant> {
        let mut boundary = self.started;
        for phase in &self.phases {
            boundary += phase.duration;
            if boundary > now {
                return Some(boundary);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VISIBLE: Phase = Phase::new("visible", Duration::from_millis(3000));
    const FADE: Phase = Phase::new("fade-out", Duration::from_millis(300));

    #[test]
    fn test_phases_in_order() {
        let t0 = Instant::now();
        let seq = Sequence::start(t0, [VISIBLE, FADE]);

        assert_eq!(seq.phase_at(t0), Some("visible"));
        assert_eq!(seq.phase_at(t0 + Duration::from_millis(2999)), Some("visible"));
        assert_eq!(seq.phase_at(t0 + Duration::from_millis(3000)), Some("fade-out"));
        assert_eq!(seq.phase_at(t0 + Duration::from_millis(3300)), None);
        assert!(seq.is_finished(t0 + Duration::from_millis(3300)));
        assert_eq!(seq.ends_at(), t0 + Duration::from_millis(3300));
    }

    #[test]
    fn test_next_boundary() {
        let t0 = Instant::now();
        let seq = Sequence::start(t0, [VISIBLE, FADE]);

        assert_eq!(seq.next_boundary(t0), Some(t0 + Duration::from_millis(3000)));
        assert_eq!(
            seq.next_boundary(t0 + Duration::from_millis(3000)),
            Some(t0 + Duration::from_millis(3300))
        );
        assert_eq!(seq.next_boundary(t0 + Duration::from_secs(4)), None);
    }

    #[test]
    fn test_empty_sequence_is_finished() {
        let t0 = Instant::now();
        let seq = Sequence::start(t0, Vec::<Phase>::new());
        assert!(seq.is_finished(t0));
        assert_eq!(seq.phase_at(t0), None);
    }
}
