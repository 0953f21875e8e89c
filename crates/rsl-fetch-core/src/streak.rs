/// Counts consecutive pages that did not produce a newly saved image.
#[derive(Debug, Clone)]
pub struct FailureStreak {
    count: u32,
    limit: u32,
}

impl FailureStreak {
    pub fn new(limit: u32) -> Self {
        Self { count: 0, limit }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn record_success(&mut self) {
        self.count = 0;
    }

    /// Returns `true` once the streak has reached the limit.
    pub fn record_failure(&mut self) -> bool {
        self.count = self.count.saturating_add(1);
        self.is_exhausted()
    }

    pub fn is_exhausted(&self) -> bool {
        self.count >= self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halts_exactly_at_limit() {
        let mut streak = FailureStreak::new(5);
        for _ in 0..4 {
            assert!(!streak.record_failure());
        }
        assert_eq!(streak.count(), 4);
        assert!(streak.record_failure());
        assert!(streak.is_exhausted());
    }

    #[test]
    fn test_success_resets() {
        let mut streak = FailureStreak::new(5);
        for _ in 0..4 {
            streak.record_failure();
        }
        streak.record_success();
        assert_eq!(streak.count(), 0);
        for _ in 0..4 {
            assert!(!streak.record_failure());
        }
    }

    #[test]
    fn test_starts_clean() {
        let mut streak = FailureStreak::new(1);
        assert_eq!(streak.count(), 0);
        assert!(!streak.is_exhausted());
        assert!(streak.record_failure());
    }
}
