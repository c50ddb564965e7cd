// Refresh scheduler - decides when a stats fetch may start and whether its
// response may be applied
use crate::domain::refresh::RefreshState;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Scheduled,
    Manual,
    CatchUp,
}

/// Permission to issue one fetch. The sequence number travels with the
/// request and comes back with its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub trigger: Trigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Newest data so far; patch it in.
    Apply,
    /// Superseded or cancelled; drop silently.
    Stale,
    /// The current request failed; report it.
    Fail,
}

#[derive(Debug)]
pub struct RefreshScheduler {
    interval: Duration,
    timeout: Duration,
    started_at: Option<Instant>,
    visible: bool,
    in_flight: Option<(u64, Instant)>,
    next_seq: u64,
    last_applied: u64,
    discard_below: u64,
    last_success: Option<Instant>,
}

impl RefreshScheduler {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            started_at: None,
            visible: true,
            in_flight: None,
            next_seq: 1,
            last_applied: 0,
            discard_below: 0,
            last_success: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> RefreshState {
        if self.in_flight.is_some() {
            RefreshState::InFlight
        } else if self.started_at.is_none() {
            RefreshState::Idle
        } else if !self.visible {
            RefreshState::Paused
        } else {
            RefreshState::Scheduled
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn last_applied(&self) -> u64 {
        self.last_applied
    }

    /// Returns false if already started.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.started_at.is_some() {
            return false;
        }
        self.started_at = Some(now);
        tracing::debug!("Refresh scheduler started, interval {:?}", self.interval);
        true
    }

    /// Stop scheduling and disown any outstanding request. Idempotent.
    pub fn stop(&mut self) {
        if self.started_at.take().is_some() {
            tracing::debug!("Refresh scheduler stopped");
        }
        self.in_flight = None;
        self.discard_below = self.next_seq;
    }

    /// Timer fired. Hidden pages and pending requests skip the tick.
    pub fn on_tick(&mut self, now: Instant) -> Option<FetchTicket> {
        self.started_at?;
        if !self.visible {
            tracing::debug!("Page hidden, skipping scheduled refresh");
            return None;
        }
        if self.in_flight.is_some() {
            tracing::debug!("Refresh already in flight, skipping tick");
            return None;
        }
        Some(self.begin(Trigger::Scheduled, now))
    }

    /// Becoming visible after more than one interval without fresh data
    /// yields a single catch-up fetch.
    pub fn on_visibility_change(&mut self, visible: bool, now: Instant) -> Option<FetchTicket> {
        let was_visible = std::mem::replace(&mut self.visible, visible);
        if !visible || was_visible {
            return None;
        }
        let started_at = self.started_at?;
        if self.in_flight.is_some() {
            return None;
        }
        let reference = self.last_success.unwrap_or(started_at);
        if now.saturating_duration_since(reference) > self.interval {
            Some(self.begin(Trigger::CatchUp, now))
        } else {
            None
        }
    }

    /// Fetch now unless one is already running. Does not shift the timer.
    pub fn trigger_manual_refresh(&mut self, now: Instant) -> Option<FetchTicket> {
        if self.in_flight.is_some() {
            tracing::debug!("Manual refresh ignored, request already in flight");
            return None;
        }
        Some(self.begin(Trigger::Manual, now))
    }

    fn begin(&mut self, trigger: Trigger, now: Instant) -> FetchTicket {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight = Some((seq, now));
        FetchTicket { seq, trigger }
    }

    pub fn in_flight_deadline(&self) -> Option<Instant> {
        self.in_flight.map(|(_, started)| started + self.timeout)
    }

    /// Give up on a request that outlived the timeout; frees the slot and
    /// returns its sequence number.
    pub fn expire_in_flight(&mut self, now: Instant) -> Option<u64> {
        match self.in_flight {
            Some((seq, started)) if now >= started + self.timeout => {
                self.in_flight = None;
                Some(seq)
            }
            _ => None,
        }
    }

    /// A response for `seq` arrived. Successful responses older than the last
    /// applied one are stale; failures only count for the current request.
    pub fn complete(&mut self, seq: u64, success: bool, now: Instant) -> Completion {
        let was_current = matches!(self.in_flight, Some((current, _)) if current == seq);
        if was_current {
            self.in_flight = None;
        }

        if seq < self.discard_below {
            return Completion::Stale;
        }
        if success {
            if seq <= self.last_applied {
                tracing::debug!(
                    "Discarding stale response {} (last applied {})",
                    seq,
                    self.last_applied
                );
                return Completion::Stale;
            }
            self.last_applied = seq;
            self.last_success = Some(now);
            Completion::Apply
        } else if was_current {
            Completion::Fail
        } else {
            Completion::Stale
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(30);

    fn scheduler() -> (RefreshScheduler, Instant) {
        let mut s = RefreshScheduler::new(INTERVAL, Duration::from_secs(10));
        let t0 = Instant::now();
        s.start(t0);
        (s, t0)
    }

    #[test]
    fn test_lifecycle_states() {
        let mut s = RefreshScheduler::new(INTERVAL, Duration::from_secs(10));
        let t0 = Instant::now();
        assert_eq!(s.state(), RefreshState::Idle);
        assert!(s.start(t0));
        assert!(!s.start(t0));
        assert_eq!(s.state(), RefreshState::Scheduled);

        let ticket = s.on_tick(t0 + INTERVAL).unwrap();
        assert_eq!(ticket.trigger, Trigger::Scheduled);
        assert_eq!(s.state(), RefreshState::InFlight);

        assert_eq!(s.complete(ticket.seq, true, t0 + INTERVAL), Completion::Apply);
        assert_eq!(s.state(), RefreshState::Scheduled);

        s.stop();
        s.stop();
        assert_eq!(s.state(), RefreshState::Idle);
        assert!(s.on_tick(t0 + INTERVAL * 2).is_none());
    }

    #[test]
    fn test_failure_returns_to_scheduled() {
        let (mut s, t0) = scheduler();
        let ticket = s.on_tick(t0 + INTERVAL).unwrap();
        assert_eq!(s.complete(ticket.seq, false, t0 + INTERVAL), Completion::Fail);
        assert_eq!(s.state(), RefreshState::Scheduled);
        assert!(s.on_tick(t0 + INTERVAL * 2).is_some());
    }

    #[test]
    fn test_no_overlapping_requests() {
        let (mut s, t0) = scheduler();
        let first = s.on_tick(t0 + INTERVAL).unwrap();
        assert!(s.trigger_manual_refresh(t0 + INTERVAL).is_none());
        assert!(s.on_tick(t0 + INTERVAL * 2).is_none());

        s.complete(first.seq, true, t0 + INTERVAL * 2);
        let manual = s.trigger_manual_refresh(t0 + INTERVAL * 2).unwrap();
        assert_eq!(manual.trigger, Trigger::Manual);
        assert!(manual.seq > first.seq);
    }

    #[test]
    fn test_hidden_page_skips_ticks() {
        let (mut s, t0) = scheduler();
        assert!(s.on_visibility_change(false, t0).is_none());
        assert_eq!(s.state(), RefreshState::Paused);
        for i in 1..=5 {
            assert!(s.on_tick(t0 + INTERVAL * i).is_none());
        }
        assert_eq!(s.state(), RefreshState::Paused);
    }

    #[test]
    fn test_single_catch_up_after_long_absence() {
        let (mut s, t0) = scheduler();
        let first = s.on_tick(t0 + INTERVAL).unwrap();
        s.complete(first.seq, true, t0 + INTERVAL);

        s.on_visibility_change(false, t0 + INTERVAL);
        let back = t0 + INTERVAL * 3;
        let catch_up = s.on_visibility_change(true, back).unwrap();
        assert_eq!(catch_up.trigger, Trigger::CatchUp);
        assert!(s.on_visibility_change(true, back).is_none());
        assert!(s.on_tick(back).is_none());
    }

    #[test]
    fn test_no_catch_up_after_short_absence() {
        let (mut s, t0) = scheduler();
        let first = s.on_tick(t0 + INTERVAL).unwrap();
        s.complete(first.seq, true, t0 + INTERVAL);

        s.on_visibility_change(false, t0 + INTERVAL);
        assert!(s.on_visibility_change(true, t0 + INTERVAL + INTERVAL / 2).is_none());
        assert_eq!(s.state(), RefreshState::Scheduled);
    }

    #[test]
    fn test_hidden_while_in_flight_never_reports_both() {
        let (mut s, t0) = scheduler();
        let ticket = s.on_tick(t0 + INTERVAL).unwrap();
        s.on_visibility_change(false, t0 + INTERVAL);
        assert_eq!(s.state(), RefreshState::InFlight);
        s.complete(ticket.seq, true, t0 + INTERVAL);
        assert_eq!(s.state(), RefreshState::Paused);
    }

    #[test]
    fn test_older_response_never_overwrites_newer() {
        let (mut s, t0) = scheduler();
        let slow = s.on_tick(t0 + INTERVAL).unwrap();
        assert_eq!(s.expire_in_flight(t0 + INTERVAL + Duration::from_secs(10)), Some(slow.seq));
        let fast = s.trigger_manual_refresh(t0 + INTERVAL + Duration::from_secs(11)).unwrap();

        let later = t0 + INTERVAL + Duration::from_secs(12);
        assert_eq!(s.complete(fast.seq, true, later), Completion::Apply);
        assert_eq!(s.complete(slow.seq, true, later), Completion::Stale);
        assert_eq!(s.last_applied(), fast.seq);
    }

    #[test]
    fn test_late_response_newer_than_applied_still_applies() {
        let (mut s, t0) = scheduler();
        let slow = s.on_tick(t0 + INTERVAL).unwrap();
        s.expire_in_flight(t0 + INTERVAL * 2);
        assert_eq!(s.complete(slow.seq, true, t0 + INTERVAL * 2), Completion::Apply);
    }

    #[test]
    fn test_late_failure_after_timeout_is_not_reported_twice() {
        let (mut s, t0) = scheduler();
        let slow = s.on_tick(t0 + INTERVAL).unwrap();
        s.expire_in_flight(t0 + INTERVAL * 2);
        assert_eq!(s.complete(slow.seq, false, t0 + INTERVAL * 2), Completion::Stale);
    }

    #[test]
    fn test_responses_after_stop_are_stale() {
        let (mut s, t0) = scheduler();
        let ticket = s.on_tick(t0 + INTERVAL).unwrap();
        s.stop();
        assert_eq!(s.complete(ticket.seq, true, t0 + INTERVAL), Completion::Stale);
        assert_eq!(s.last_applied(), 0);
    }

    #[test]
    fn test_timeout_deadline() {
        let (mut s, t0) = scheduler();
        assert_eq!(s.in_flight_deadline(), None);
        s.on_tick(t0 + INTERVAL).unwrap();
        assert_eq!(s.in_flight_deadline(), Some(t0 + INTERVAL + Duration::from_secs(10)));
        assert_eq!(s.expire_in_flight(t0 + INTERVAL + Duration::from_secs(9)), None);
    }
}
