//! Level curve: maps accumulated experience to a level and progress bar.
//!
//! Leaving level `L` costs `LEVEL_XP_STEP * L` experience, so the total
//! experience needed to reach level `L` is the triangular sum
//! `LEVEL_XP_STEP * L * (L - 1) / 2`.

use crate::constants::LEVEL_XP_STEP;
use crate::numbers::{clamped_percent, floor_f64_to_u64, saturating_u32, u64_to_f64};
use crate::state::Difficulty;

/// Experience required to advance from `level` to `level + 1`.
#[must_use]
pub fn calculate_xp_for_next_level(level: u32) -> u64 {
    LEVEL_XP_STEP.saturating_mul(u64::from(level.max(1)))
}

/// Cumulative experience at which `level` begins.
#[must_use]
pub fn level_threshold(level: u32) -> u64 {
    u64::try_from(wide_threshold(level)).unwrap_or(u64::MAX)
}

fn wide_threshold(level: u32) -> u128 {
    let level = u128::from(level.max(1));
    u128::from(LEVEL_XP_STEP) * level * (level - 1) / 2
}

/// Level reached with `experience` points. Level 1 is the floor.
#[must_use]
pub fn calculate_level(experience: u64) -> u32 {
    let estimate = (1.0 + (1.0 + 8.0 * u64_to_f64(experience) / u64_to_f64(LEVEL_XP_STEP)).sqrt())
        / 2.0;
    let mut level = saturating_u32(floor_f64_to_u64(estimate)).max(1);

    // The float estimate can be off by one either way for large inputs.
    let experience = u128::from(experience);
    while level > 1 && wide_threshold(level) > experience {
        level -= 1;
    }
    while level < u32::MAX && wide_threshold(level + 1) <= experience {
        level += 1;
    }
    level
}

/// Percentage of the way from the start of `level` to the next one, in `[0, 100]`.
#[must_use]
pub fn calculate_progress(experience: u64, level: u32) -> f64 {
    let start = level_threshold(level);
    if experience < start {
        return 0.0;
    }
    clamped_percent(experience - start, calculate_xp_for_next_level(level))
}

/// Experience granted for finishing a task of the given tier.
#[must_use]
pub const fn get_xp_reward(difficulty: Difficulty) -> u64 {
    difficulty.xp_reward()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn level_one_is_the_floor() {
        assert_eq!(calculate_level(0), 1);
        assert_eq!(calculate_level(99), 1);
        assert_eq!(calculate_level(100), 2);
        assert_eq!(calculate_level(299), 2);
        assert_eq!(calculate_level(300), 3);
    }

    #[test]
    fn thresholds_are_cumulative_next_level_costs() {
        let mut cumulative = 0;
        for level in 1..200 {
            assert_eq!(level_threshold(level), cumulative);
            assert_eq!(calculate_level(cumulative), level);
            if cumulative > 0 {
                assert_eq!(calculate_level(cumulative - 1), level - 1);
            }
            cumulative += calculate_xp_for_next_level(level);
        }
    }

    #[test]
    fn progress_is_clamped() {
        assert!((calculate_progress(0, 1) - 0.0).abs() < f64::EPSILON);
        assert!((calculate_progress(50, 1) - 50.0).abs() < f64::EPSILON);
        assert!((calculate_progress(200, 2) - 50.0).abs() < f64::EPSILON);
        assert!((calculate_progress(10, 3) - 0.0).abs() < f64::EPSILON);
        assert!((calculate_progress(10_000, 2) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn xp_rewards_follow_tiers() {
        assert!(get_xp_reward(Difficulty::Easy) < get_xp_reward(Difficulty::Medium));
        assert!(get_xp_reward(Difficulty::Medium) < get_xp_reward(Difficulty::Hard));
    }

    #[test]
    fn extreme_experience_does_not_overflow() {
        let level = calculate_level(u64::MAX);
        assert!(level > 1);
        assert!(calculate_level(u64::MAX - 1) <= level);
        assert!((0.0..=100.0).contains(&calculate_progress(u64::MAX, level)));
    }

    proptest! {
        #[test]
        fn level_is_monotonic(a in 0u64..50_000_000, b in 0u64..50_000_000) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(calculate_level(low) <= calculate_level(high));
        }

        #[test]
        fn progress_stays_in_range(xp in 0u64..10_000_000) {
            let level = calculate_level(xp);
            let progress = calculate_progress(xp, level);
            prop_assert!((0.0..=100.0).contains(&progress));
            prop_assert!(level_threshold(level) <= xp);
        }
    }
}
