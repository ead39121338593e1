use std::time::Duration;
use tokio::time::Instant;

/// What one observation of the listing did to the room state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Inactive -> Active.
    Appeared,
    /// Active -> Inactive.
    Disappeared,
    StillActive,
    StillAbsent,
}

/// Everything the control loop remembers between ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorState {
    pub room_is_active: bool,
    /// Start time of the tick whose screenshot was last delivered.
    pub last_screenshot: Option<Instant>,
    pub check_count: u64,
    pub screenshot_count: u64,
}

impl MonitorState {
    pub fn begin_check(self) -> Self {
        Self {
            check_count: self.check_count + 1,
            ..self
        }
    }

    pub fn observe(self, room_present: bool) -> (Self, Transition) {
        let transition = match (self.room_is_active, room_present) {
            (false, true) => Transition::Appeared,
            (true, false) => Transition::Disappeared,
            (true, true) => Transition::StillActive,
            (false, false) => Transition::StillAbsent,
        };
        let next = Self {
            room_is_active: room_present,
            ..self
        };
        (next, transition)
    }

    pub fn screenshot_due(&self, now: Instant, interval: Duration) -> bool {
        if !self.room_is_active {
            return false;
        }
        match self.last_screenshot {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= interval,
        }
    }

    /// Records a delivered screenshot for the tick that started at `at`.
    pub fn screenshot_delivered(self, at: Instant) -> Self {
        Self {
            last_screenshot: Some(at),
            screenshot_count: self.screenshot_count + 1,
            ..self
        }
    }

    /// Sequence number the next delivered screenshot will carry.
    pub fn next_sequence(&self) -> u64 {
        self.screenshot_count + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(30);

    #[test]
    fn test_starts_inactive() {
        let state = MonitorState::default();
        assert!(!state.room_is_active);
        assert!(state.last_screenshot.is_none());
        assert_eq!(state.next_sequence(), 1);
    }

    #[test]
    fn test_transitions() {
        let state = MonitorState::default();

        let (state, t) = state.observe(false);
        assert_eq!(t, Transition::StillAbsent);
        let (state, t) = state.observe(true);
        assert_eq!(t, Transition::Appeared);
        let (state, t) = state.observe(true);
        assert_eq!(t, Transition::StillActive);
        let (state, t) = state.observe(false);
        assert_eq!(t, Transition::Disappeared);
        let (state, t) = state.observe(false);
        assert_eq!(t, Transition::StillAbsent);
        assert!(!state.room_is_active);
    }

    #[test]
    fn test_observe_keeps_counters() {
        let now = Instant::now();
        let state = MonitorState::default()
            .begin_check()
            .begin_check()
            .screenshot_delivered(now);
        let (next, _) = state.observe(false);
        assert_eq!(next.check_count, 2);
        assert_eq!(next.screenshot_count, 1);
        assert_eq!(next.last_screenshot, Some(now));
    }

    #[test]
    fn test_first_screenshot_due_immediately() {
        let (state, _) = MonitorState::default().observe(true);
        assert!(state.screenshot_due(Instant::now(), INTERVAL));
    }

    #[test]
    fn test_never_due_while_inactive() {
        let state = MonitorState::default();
        assert!(!state.screenshot_due(Instant::now(), Duration::ZERO));
    }

    #[test]
    fn test_screenshot_interval() {
        let start = Instant::now();
        let (state, _) = MonitorState::default().observe(true);
        let state = state.screenshot_delivered(start);

        assert!(!state.screenshot_due(start + Duration::from_secs(29), INTERVAL));
        assert!(state.screenshot_due(start + INTERVAL, INTERVAL));
        assert_eq!(state.next_sequence(), 2);
    }

    #[test]
    fn test_counter_increments_by_one() {
        let now = Instant::now();
        let state = MonitorState::default();
        let state = state.screenshot_delivered(now);
        assert_eq!(state.screenshot_count, 1);
        let state = state.screenshot_delivered(now);
        assert_eq!(state.screenshot_count, 2);
    }
}
