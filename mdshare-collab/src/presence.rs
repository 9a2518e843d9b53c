//! Online participant count.
//!
//! The relay pushes the count whenever membership changes. The client only
//! displays it: the most recently received value is shown, with no
//! reconciliation of out-of-order deliveries.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresenceTracker {
    count: u64,
    updates: u64,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_count_update(&mut self, count: u64) {
        self.count = count;
        self.updates += 1;
    }

    /// Participants currently online, as last reported.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Whether the relay has reported a count yet.
    pub fn has_report(&self) -> bool {
        self.updates > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_count() {
        let presence = PresenceTracker::new();
        assert_eq!(presence.count(), 0);
        assert!(!presence.has_report());
    }

    #[test]
    fn test_last_received_wins() {
        let mut presence = PresenceTracker::new();
        presence.on_count_update(5);
        presence.on_count_update(2);
        presence.on_count_update(3);
        assert_eq!(presence.count(), 3);
        assert!(presence.has_report());
    }

    #[test]
    fn test_zero_is_accepted() {
        let mut presence = PresenceTracker::new();
        presence.on_count_update(4);
        presence.on_count_update(0);
        assert_eq!(presence.count(), 0);
    }
}
