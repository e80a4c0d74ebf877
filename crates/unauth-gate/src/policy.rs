use http::StatusCode;
use serde::{Deserialize, Serialize};

/// When a client with recorded failures stops being admitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BlockPolicy {
    /// Reject once the failure count exceeds `max_attempts`.
    Threshold { max_attempts: u32 },
    /// Reject on any recorded failure. Same as a threshold of zero.
    SingleStrike,
}

impl BlockPolicy {
    pub fn blocks(&self, attempts: u32) -> bool {
        match self {
            BlockPolicy::Threshold { max_attempts } => attempts > *max_attempts,
            BlockPolicy::SingleStrike => attempts > 0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlockPolicy::Threshold { .. } => "threshold",
            BlockPolicy::SingleStrike => "single_strike",
        }
    }
}

/// Response statuses counted as authorization failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureStatuses(Vec<StatusCode>);

impl FailureStatuses {
    pub fn new(statuses: impl IntoIterator<Item = StatusCode>) -> Self {
        let mut statuses: Vec<StatusCode> = statuses.into_iter().collect();
        statuses.sort_unstable();
        statuses.dedup();
        Self(statuses)
    }

    pub fn contains(&self, status: StatusCode) -> bool {
        self.0.contains(&status)
    }

    pub fn as_slice(&self) -> &[StatusCode] {
        &self.0
    }
}

impl Default for FailureStatuses {
    fn default() -> Self {
        Self::new([StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_blocks_only_above_max() {
        let policy = BlockPolicy::Threshold { max_attempts: 2 };
        assert!(!policy.blocks(0));
        assert!(!policy.blocks(2));
        assert!(policy.blocks(3));
    }

    #[test]
    fn single_strike_matches_zero_threshold() {
        let zero = BlockPolicy::Threshold { max_attempts: 0 };
        for attempts in 0..4 {
            assert_eq!(BlockPolicy::SingleStrike.blocks(attempts), zero.blocks(attempts));
        }
    }

    #[test]
    fn default_failures_are_401_and_403() {
        let statuses = FailureStatuses::default();
        assert!(statuses.contains(StatusCode::UNAUTHORIZED));
        assert!(statuses.contains(StatusCode::FORBIDDEN));
        assert!(!statuses.contains(StatusCode::NOT_FOUND));
    }
}
