//! Progression reducers: pure updates of [`PlayerStats`] from task outcomes.
use serde::{Deserialize, Serialize};

use crate::level::get_xp_reward;
use crate::state::{BoostPolicy, Difficulty, PlayerStats};
use crate::tasks::TaskType;

/// The player's verdict on a drawn task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub difficulty: Difficulty,
    pub task_type: TaskType,
    pub completed: bool,
}

impl TaskOutcome {
    #[must_use]
    pub const fn completed(difficulty: Difficulty, task_type: TaskType) -> Self {
        Self {
            difficulty,
            task_type,
            completed: true,
        }
    }

    #[must_use]
    pub const fn skipped(difficulty: Difficulty, task_type: TaskType) -> Self {
        Self {
            difficulty,
            task_type,
            completed: false,
        }
    }
}

/// Updated stats plus what was granted, for notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeReport {
    pub stats: PlayerStats,
    pub points_gained: u64,
    pub xp_gained: u64,
}

impl OutcomeReport {
    /// Experience to announce, if any was gained.
    #[must_use]
    pub const fn xp_notification(&self) -> Option<u64> {
        if self.xp_gained > 0 {
            Some(self.xp_gained)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn level_up(&self, previous: &PlayerStats) -> bool {
        self.stats.level() > previous.level()
    }
}

fn task_xp(stats: &PlayerStats, difficulty: Difficulty, boost: BoostPolicy, now_ms: i64) -> u64 {
    boost.apply(get_xp_reward(difficulty), stats.xp_boost_active(now_ms))
}

/// Apply a completed or failed task to `stats`.
///
/// Completion extends the streak and grants the tier's points and XP;
/// failure only resets the streak.
#[must_use]
pub fn record_task_outcome(
    stats: &PlayerStats,
    outcome: TaskOutcome,
    boost: BoostPolicy,
    now_ms: i64,
) -> OutcomeReport {
    let mut next = stats.clone();
    if !outcome.completed {
        next.current_streak = 0;
        log::debug!("task skipped, streak reset");
        return OutcomeReport {
            stats: next,
            points_gained: 0,
            xp_gained: 0,
        };
    }

    let points = outcome.difficulty.points_reward();
    let xp = task_xp(stats, outcome.difficulty, boost, now_ms);

    next.current_streak = next.current_streak.saturating_add(1);
    next.sync_max_streak();
    next.points = next.points.saturating_add(points);
    next.gain_experience(xp);
    next.tasks_completed = next.tasks_completed.saturating_add(1);
    match outcome.task_type {
        TaskType::Truth => next.truths_answered = next.truths_answered.saturating_add(1),
        TaskType::Dare => next.dares_completed = next.dares_completed.saturating_add(1),
    }
    if outcome.difficulty == Difficulty::Hard {
        next.hard_tasks_completed = next.hard_tasks_completed.saturating_add(1);
    }
    log::debug!(
        "task completed: +{points} points, +{xp} xp, streak {}",
        next.current_streak
    );

    OutcomeReport {
        stats: next,
        points_gained: points,
        xp_gained: xp,
    }
}

/// Spend a skip token on a task the player will not do.
///
/// The task counts as done for points, XP and `tasks_completed` while the
/// streak and the truth/dare counters stay as they were. Returns `None`
/// when no token is available.
#[must_use]
pub fn spend_skip_token(
    stats: &PlayerStats,
    difficulty: Difficulty,
    boost: BoostPolicy,
    now_ms: i64,
) -> Option<OutcomeReport> {
    if stats.skip_tokens == 0 {
        return None;
    }
    let points = difficulty.points_reward();
    let xp = task_xp(stats, difficulty, boost, now_ms);

    let mut next = stats.clone();
    next.skip_tokens -= 1;
    next.points = next.points.saturating_add(points);
    next.gain_experience(xp);
    next.tasks_completed = next.tasks_completed.saturating_add(1);
    log::debug!("skip token used, {} left", next.skip_tokens);

    Some(OutcomeReport {
        stats: next,
        points_gained: points,
        xp_gained: xp,
    })
}

/// Count a shared task.
#[must_use]
pub fn record_share(stats: &PlayerStats) -> PlayerStats {
    let mut next = stats.clone();
    next.shared_tasks = next.shared_tasks.saturating_add(1);
    next
}
