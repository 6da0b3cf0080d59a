//! Fixed achievement list and the unlock check run after every stat change.
use serde::{Deserialize, Serialize};

use crate::state::PlayerStats;

/// Counter an achievement watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AchievementCondition {
    TasksCompleted,
    TruthsAnswered,
    DaresCompleted,
    StreakReached,
    PointsEarned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub condition: AchievementCondition,
    pub value: u64,
}

impl Achievement {
    #[must_use]
    pub fn is_met(&self, stats: &PlayerStats) -> bool {
        let current = match self.condition {
            AchievementCondition::TasksCompleted => u64::from(stats.tasks_completed),
            AchievementCondition::TruthsAnswered => u64::from(stats.truths_answered),
            AchievementCondition::DaresCompleted => u64::from(stats.dares_completed),
            AchievementCondition::StreakReached => u64::from(stats.max_streak),
            AchievementCondition::PointsEarned => stats.points,
        };
        current >= self.value
    }
}

pub const ACHIEVEMENTS: [Achievement; 7] = [
    Achievement {
        id: "beginner",
        title: "Beginner",
        description: "Complete your first 5 tasks",
        condition: AchievementCondition::TasksCompleted,
        value: 5,
    },
    Achievement {
        id: "truthSeeker",
        title: "Truth Seeker",
        description: "Answer 10 truth questions",
        condition: AchievementCondition::TruthsAnswered,
        value: 10,
    },
    Achievement {
        id: "daredevil",
        title: "Daredevil",
        description: "Complete 10 dares",
        condition: AchievementCondition::DaresCompleted,
        value: 10,
    },
    Achievement {
        id: "streakMaster",
        title: "Streak Master",
        description: "Reach a streak of 5 tasks in a row",
        condition: AchievementCondition::StreakReached,
        value: 5,
    },
    Achievement {
        id: "pointsHunter",
        title: "Points Hunter",
        description: "Collect 1000 points",
        condition: AchievementCondition::PointsEarned,
        value: 1_000,
    },
    Achievement {
        id: "champion",
        title: "Champion",
        description: "Complete 50 tasks",
        condition: AchievementCondition::TasksCompleted,
        value: 50,
    },
    Achievement {
        id: "legend",
        title: "Legend",
        description: "Collect 5000 points",
        condition: AchievementCondition::PointsEarned,
        value: 5_000,
    },
];

#[must_use]
pub fn find_achievement(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|achievement| achievement.id == id)
}

/// Add every newly satisfied achievement to a copy of `stats`.
///
/// Held achievements are never removed, even if the counter behind them
/// later drops (points are spendable).
#[must_use]
pub fn unlock_achievements(stats: &PlayerStats) -> (PlayerStats, Vec<&'static Achievement>) {
    let unlocked: Vec<&'static Achievement> = ACHIEVEMENTS
        .iter()
        .filter(|achievement| !stats.achievements.contains(achievement.id))
        .filter(|achievement| achievement.is_met(stats))
        .collect();

    let mut next = stats.clone();
    for achievement in &unlocked {
        log::debug!("achievement unlocked: {}", achievement.id);
        next.achievements.insert(achievement.id.to_string());
    }
    (next, unlocked)
}
