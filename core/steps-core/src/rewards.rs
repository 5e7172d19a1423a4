//! Reward preview and daily goal progress.
//!
//! The backend awards points at the end of the day; these helpers let the
//! client show what today's count is worth before that happens.

use serde::Serialize;

/// Below this many steps a day earns nothing.
pub const MIN_STEPS_THRESHOLD: u64 = 5_000;

/// Steps per point once over the threshold.
pub const STEP_INCREMENT: u64 = 1_000;

/// Points today's count would earn.
pub fn daily_reward(steps: u64) -> u64 {
    if steps < MIN_STEPS_THRESHOLD {
        return 0;
    }
    steps / STEP_INCREMENT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MotivationTier {
    GettingStarted,
    GoodStart,
    Halfway,
    AlmostThere,
    GoalReached,
}

impl MotivationTier {
    fn for_percent(percent: f64) -> Self {
        if percent >= 100.0 {
            MotivationTier::GoalReached
        } else if percent >= 75.0 {
            MotivationTier::AlmostThere
        } else if percent >= 50.0 {
            MotivationTier::Halfway
        } else if percent >= 25.0 {
            MotivationTier::GoodStart
        } else {
            MotivationTier::GettingStarted
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            MotivationTier::GoalReached => "Amazing! You've reached your daily goal!",
            MotivationTier::AlmostThere => "You're almost there! Keep going!",
            MotivationTier::Halfway => "Great progress! Halfway there!",
            MotivationTier::GoodStart => "Good start! Keep walking!",
            MotivationTier::GettingStarted => "Let's get moving! Every step counts!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, uniffi::Record, Serialize)]
pub struct GoalProgress {
    pub steps: u64,
    pub goal: u64,
    /// Capped at 100.
    pub percent: f64,
    pub tier: MotivationTier,
}

pub fn goal_progress(steps: u64, goal: u64) -> GoalProgress {
    let percent = if goal == 0 {
        100.0
    } else {
        (steps as f64 / goal as f64 * 100.0).min(100.0)
    };
    GoalProgress {
        steps,
        goal,
        percent,
        tier: MotivationTier::for_percent(percent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_below_threshold_is_zero() {
        assert_eq!(daily_reward(0), 0);
        assert_eq!(daily_reward(4_999), 0);
    }

    #[test]
    fn test_reward_counts_full_increments() {
        assert_eq!(daily_reward(5_000), 5);
        assert_eq!(daily_reward(7_999), 7);
        assert_eq!(daily_reward(12_000), 12);
    }

    #[test]
    fn test_goal_progress_tiers() {
        assert_eq!(goal_progress(0, 10_000).tier, MotivationTier::GettingStarted);
        assert_eq!(goal_progress(2_500, 10_000).tier, MotivationTier::GoodStart);
        assert_eq!(goal_progress(5_000, 10_000).tier, MotivationTier::Halfway);
        assert_eq!(goal_progress(7_500, 10_000).tier, MotivationTier::AlmostThere);
        assert_eq!(goal_progress(10_000, 10_000).tier, MotivationTier::GoalReached);
    }

    #[test]
    fn test_goal_progress_caps_at_hundred() {
        let progress = goal_progress(25_000, 10_000);
        assert_eq!(progress.percent, 100.0);
        assert_eq!(goal_progress(1, 0).percent, 100.0);
    }
}
