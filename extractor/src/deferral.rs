use std::time::Duration;

pub const DEFAULT_DEFERRAL_DELAY: Duration = Duration::from_secs(30);

/// How long an unmatched message stays hidden from every scan, including
/// the one that deferred it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeferralPolicy {
    delay: Duration,
}

impl DeferralPolicy {
    pub fn new(delay: Duration) -> Self {
        DeferralPolicy { delay }
    }

    pub fn deferral_delay(&self) -> Duration {
        self.delay
    }
}

impl Default for DeferralPolicy {
    fn default() -> Self {
        DeferralPolicy::new(DEFAULT_DEFERRAL_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_delay() {
        assert_eq!(
            DeferralPolicy::default().deferral_delay(),
            Duration::from_secs(30)
        );
        assert_eq!(
            DeferralPolicy::new(Duration::from_secs(5)).deferral_delay(),
            Duration::from_secs(5)
        );
    }
}
