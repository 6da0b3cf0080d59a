//! Quests: tracked goals with progress, completion and a claimable reward.
//!
//! Quests are plain data. [`apply_event_to_quests`] advances them from a
//! task outcome, [`claim_reward`] pays out a finished quest exactly once and
//! [`regenerate_quests`] swaps expired daily/weekly sets for fresh ones.
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

use crate::constants::{
    COMMUNITY_QUEST_LIFETIME_MS, COMMUNITY_TASK_TARGET, DAILY_DARE_TARGET, DAILY_STREAK_TARGET,
    DAILY_TRUTH_TARGET, MS_PER_DAY, MS_PER_HOUR, MS_PER_WEEK, WEEKLY_BOOST_HOURS,
    WEEKLY_DARE_TARGET, WEEKLY_STREAK_TARGET, WEEKLY_TRUTH_TARGET,
};
use crate::shop::SKIP_TOKEN_ITEM_ID;
use crate::state::PlayerStats;
use crate::tasks::TaskType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestKind {
    DailyPersonal,
    WeeklyPersonal,
    CommunityGoal,
}

impl QuestKind {
    #[must_use]
    pub const fn is_personal(self) -> bool {
        matches!(self, Self::DailyPersonal | Self::WeeklyPersonal)
    }
}

/// What a quest counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestGoal {
    TruthsAnswered,
    DaresCompleted,
    StreakReached,
    TasksCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoostKind {
    XpBoost,
    PointsBoost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempBoost {
    #[serde(rename = "type")]
    pub kind: BoostKind,
    pub duration_hours: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardItem {
    pub item_id: String,
    pub quantity: u32,
}

/// Reward attached to a quest. `claimed` flips once, never back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestReward {
    pub points: u64,
    pub xp: u64,
    pub badge_id: Option<String>,
    pub items: SmallVec<[RewardItem; 2]>,
    pub temp_boost: Option<TempBoost>,
    pub claimed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: QuestKind,
    pub goal: QuestGoal,
    pub target_value: u32,
    #[serde(default)]
    pub current_progress: u32,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub reward: QuestReward,
    #[serde(default)]
    pub end_date: Option<i64>,
}

impl Quest {
    #[must_use]
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.end_date.is_some_and(|end| end < now_ms)
    }

    #[must_use]
    pub const fn is_claimable(&self) -> bool {
        self.is_completed && !self.reward.claimed
    }

    /// Progress as a fraction of the target, clamped to `[0, 1]`.
    #[must_use]
    pub fn completion_ratio(&self) -> f64 {
        if self.target_value == 0 {
            return 1.0;
        }
        (f64::from(self.current_progress) / f64::from(self.target_value)).min(1.0)
    }
}

/// A resolved task as seen by the quest tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestEvent {
    pub task_type: TaskType,
    pub completed: bool,
    /// Streak after the outcome was applied.
    pub streak: u32,
}

/// Knobs for how events advance personal quests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestRules {
    /// Count truth/dare events toward personal quests even when skipped.
    pub count_skipped_personal: bool,
}

impl Default for QuestRules {
    fn default() -> Self {
        Self {
            count_skipped_personal: true,
        }
    }
}

fn next_progress(quest: &Quest, event: QuestEvent, rules: QuestRules) -> Option<u32> {
    if !quest.kind.is_personal() {
        return event
            .completed
            .then(|| quest.current_progress.saturating_add(1));
    }

    let counts = event.completed || rules.count_skipped_personal;
    match quest.goal {
        QuestGoal::TruthsAnswered if counts && event.task_type == TaskType::Truth => {
            Some(quest.current_progress.saturating_add(1))
        }
        QuestGoal::DaresCompleted if counts && event.task_type == TaskType::Dare => {
            Some(quest.current_progress.saturating_add(1))
        }
        QuestGoal::StreakReached => Some(event.streak),
        QuestGoal::TasksCompleted if event.completed => {
            Some(quest.current_progress.saturating_add(1))
        }
        _ => None,
    }
}

/// Advance every open quest with `event`. Completed quests are left alone.
#[must_use]
pub fn apply_event_to_quests(quests: &[Quest], event: QuestEvent, rules: QuestRules) -> Vec<Quest> {
    quests
        .iter()
        .map(|quest| {
            if quest.is_completed {
                return quest.clone();
            }
            let Some(progress) = next_progress(quest, event, rules) else {
                return quest.clone();
            };
            let mut updated = quest.clone();
            updated.current_progress = progress;
            updated.is_completed = progress >= quest.target_value;
            if updated.is_completed {
                log::debug!("quest {} completed ({progress}/{})", quest.id, quest.target_value);
            }
            updated
        })
        .collect()
}

/// Pay out `quest` into a copy of `stats`.
///
/// Returns `None` (nothing granted) unless the quest is completed, unclaimed
/// and not already recorded in `completed_quests`. On success the returned
/// quest has its reward marked claimed.
#[must_use]
pub fn claim_reward(stats: &PlayerStats, quest: &Quest, now_ms: i64) -> Option<(PlayerStats, Quest)> {
    if !quest.is_claimable() || stats.completed_quests.contains(&quest.id) {
        return None;
    }

    let reward = &quest.reward;
    let mut next = stats.clone();
    next.points = next.points.saturating_add(reward.points);
    next.gain_experience(reward.xp);
    if let Some(badge) = &reward.badge_id {
        next.badges.insert(badge.clone());
    }
    for item in &reward.items {
        if item.item_id == SKIP_TOKEN_ITEM_ID {
            next.skip_tokens = next.skip_tokens.saturating_add(item.quantity);
        }
    }
    if let Some(TempBoost {
        kind: BoostKind::XpBoost,
        duration_hours,
    }) = reward.temp_boost
    {
        let duration = MS_PER_HOUR.saturating_mul(i64::from(duration_hours));
        next.xp_boost_end_time = Some(now_ms.saturating_add(duration));
    }
    next.active_quests.retain(|id| id != &quest.id);
    next.completed_quests.push(quest.id.clone());

    let mut claimed = quest.clone();
    claimed.reward.claimed = true;
    log::debug!("claimed reward for quest {}", quest.id);
    Some((next, claimed))
}

/// Whether the daily/weekly collection needs fresh quests.
#[must_use]
pub fn needs_regeneration(quests: &[Quest], now_ms: i64) -> bool {
    let stale = |kind: QuestKind| {
        let mut of_kind = quests.iter().filter(|quest| quest.kind == kind).peekable();
        of_kind.peek().is_none() || of_kind.any(|quest| quest.is_expired(now_ms))
    };
    stale(QuestKind::DailyPersonal) || stale(QuestKind::WeeklyPersonal)
}

/// Drop expired quests and append fresh daily and weekly sets.
///
/// Returns the input unchanged when nothing is stale.
#[must_use]
pub fn regenerate_quests(quests: &[Quest], now_ms: i64) -> Vec<Quest> {
    if !needs_regeneration(quests, now_ms) {
        return quests.to_vec();
    }
    let mut next: Vec<Quest> = quests
        .iter()
        .filter(|quest| !quest.is_expired(now_ms))
        .cloned()
        .collect();
    for fresh in generate_daily_quests(now_ms)
        .into_iter()
        .chain(generate_weekly_quests(now_ms))
    {
        if !next.iter().any(|quest| quest.id == fresh.id) {
            next.push(fresh);
        }
    }
    log::info!("regenerated quests: {} active", next.len());
    next
}

/// Replace an expired or missing community goal.
#[must_use]
pub fn regenerate_community_quests(quests: &[Quest], now_ms: i64) -> Vec<Quest> {
    let mut next: Vec<Quest> = quests
        .iter()
        .filter(|quest| !quest.is_expired(now_ms))
        .cloned()
        .collect();
    if next.is_empty() {
        next.push(generate_community_quest(now_ms));
    }
    next
}

fn day_index(now_ms: i64) -> i64 {
    now_ms.div_euclid(MS_PER_DAY)
}

fn week_index(now_ms: i64) -> i64 {
    now_ms.div_euclid(MS_PER_WEEK)
}

struct QuestTemplate {
    slug: &'static str,
    title: &'static str,
    description: &'static str,
    goal: QuestGoal,
    target: u32,
    reward: fn() -> QuestReward,
}

fn build(template: &QuestTemplate, kind: QuestKind, period: i64, end_date: i64) -> Quest {
    Quest {
        id: format!("{}-{period}", template.slug),
        title: template.title.to_string(),
        description: template.description.to_string(),
        kind,
        goal: template.goal,
        target_value: template.target,
        current_progress: 0,
        is_completed: false,
        reward: (template.reward)(),
        end_date: Some(end_date),
    }
}

fn skip_tokens(quantity: u32) -> SmallVec<[RewardItem; 2]> {
    smallvec![RewardItem {
        item_id: SKIP_TOKEN_ITEM_ID.to_string(),
        quantity,
    }]
}

const DAILY_TEMPLATES: [QuestTemplate; 3] = [
    QuestTemplate {
        slug: "daily-truths",
        title: "Truth Master",
        description: "Answer truth questions today",
        goal: QuestGoal::TruthsAnswered,
        target: DAILY_TRUTH_TARGET,
        reward: || QuestReward {
            points: 50,
            xp: 20,
            ..QuestReward::default()
        },
    },
    QuestTemplate {
        slug: "daily-dares",
        title: "Daredevil",
        description: "Take on dares today",
        goal: QuestGoal::DaresCompleted,
        target: DAILY_DARE_TARGET,
        reward: || QuestReward {
            points: 75,
            xp: 30,
            items: skip_tokens(1),
            ..QuestReward::default()
        },
    },
    QuestTemplate {
        slug: "daily-streak",
        title: "Streak Player",
        description: "Complete tasks in a row without skipping",
        goal: QuestGoal::StreakReached,
        target: DAILY_STREAK_TARGET,
        reward: || QuestReward {
            xp: 100,
            badge_id: Some("streak-daily".to_string()),
            ..QuestReward::default()
        },
    },
];

const WEEKLY_TEMPLATES: [QuestTemplate; 3] = [
    QuestTemplate {
        slug: "weekly-truths",
        title: "Truth Seeker",
        description: "Answer truth questions this week",
        goal: QuestGoal::TruthsAnswered,
        target: WEEKLY_TRUTH_TARGET,
        reward: || QuestReward {
            points: 300,
            xp: 150,
            badge_id: Some("truth-seeker".to_string()),
            ..QuestReward::default()
        },
    },
    QuestTemplate {
        slug: "weekly-dares",
        title: "Fearless",
        description: "Take on dares this week",
        goal: QuestGoal::DaresCompleted,
        target: WEEKLY_DARE_TARGET,
        reward: || QuestReward {
            points: 400,
            xp: 150,
            items: skip_tokens(2),
            ..QuestReward::default()
        },
    },
    QuestTemplate {
        slug: "weekly-streak",
        title: "Unstoppable",
        description: "Reach a long streak this week",
        goal: QuestGoal::StreakReached,
        target: WEEKLY_STREAK_TARGET,
        reward: || QuestReward {
            xp: 250,
            temp_boost: Some(TempBoost {
                kind: BoostKind::XpBoost,
                duration_hours: WEEKLY_BOOST_HOURS,
            }),
            ..QuestReward::default()
        },
    },
];

/// Daily quests for the UTC day containing `now_ms`, expiring at midnight.
#[must_use]
pub fn generate_daily_quests(now_ms: i64) -> Vec<Quest> {
    let day = day_index(now_ms);
    let end = (day + 1) * MS_PER_DAY;
    DAILY_TEMPLATES
        .iter()
        .map(|template| build(template, QuestKind::DailyPersonal, day, end))
        .collect()
}

/// Weekly quests for the epoch week containing `now_ms`.
#[must_use]
pub fn generate_weekly_quests(now_ms: i64) -> Vec<Quest> {
    let week = week_index(now_ms);
    let end = (week + 1) * MS_PER_WEEK;
    WEEKLY_TEMPLATES
        .iter()
        .map(|template| build(template, QuestKind::WeeklyPersonal, week, end))
        .collect()
}

/// Shared community goal counting completed tasks.
#[must_use]
pub fn generate_community_quest(now_ms: i64) -> Quest {
    let template = QuestTemplate {
        slug: "community-tasks",
        title: "Party Together",
        description: "Everyone completes tasks toward a shared goal",
        goal: QuestGoal::TasksCompleted,
        target: COMMUNITY_TASK_TARGET,
        reward: || QuestReward {
            points: 500,
            badge_id: Some("community-hero".to_string()),
            ..QuestReward::default()
        },
    };
    build(
        &template,
        QuestKind::CommunityGoal,
        day_index(now_ms),
        now_ms.saturating_add(COMMUNITY_QUEST_LIFETIME_MS),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quest(kind: QuestKind, goal: QuestGoal, target: u32, progress: u32) -> Quest {
        Quest {
            id: format!("{goal:?}-{kind:?}"),
            title: "test".to_string(),
            description: String::new(),
            kind,
            goal,
            target_value: target,
            current_progress: progress,
            is_completed: false,
            reward: QuestReward {
                points: 40,
                xp: 120,
                badge_id: Some("badge".to_string()),
                items: skip_tokens(2),
                temp_boost: Some(TempBoost {
                    kind: BoostKind::XpBoost,
                    duration_hours: 1,
                }),
                claimed: false,
            },
            end_date: None,
        }
    }

    fn event(task_type: TaskType, completed: bool, streak: u32) -> QuestEvent {
        QuestEvent {
            task_type,
            completed,
            streak,
        }
    }

    #[test]
    fn streak_quest_completes_when_streak_reaches_target() {
        let quests = [quest(QuestKind::DailyPersonal, QuestGoal::StreakReached, 5, 4)];
        let updated = apply_event_to_quests(
            &quests,
            event(TaskType::Dare, true, 5),
            QuestRules::default(),
        );
        assert_eq!(updated[0].current_progress, 5);
        assert!(updated[0].is_completed);
    }

    #[test]
    fn streak_quest_is_set_not_incremented() {
        let quests = [quest(QuestKind::WeeklyPersonal, QuestGoal::StreakReached, 10, 7)];
        let updated = apply_event_to_quests(
            &quests,
            event(TaskType::Truth, false, 0),
            QuestRules::default(),
        );
        assert_eq!(updated[0].current_progress, 0);
        assert!(!updated[0].is_completed);
    }

    #[test]
    fn personal_quests_track_their_task_type() {
        let quests = [
            quest(QuestKind::DailyPersonal, QuestGoal::TruthsAnswered, 3, 0),
            quest(QuestKind::DailyPersonal, QuestGoal::DaresCompleted, 3, 0),
        ];
        let updated = apply_event_to_quests(
            &quests,
            event(TaskType::Truth, true, 1),
            QuestRules::default(),
        );
        assert_eq!(updated[0].current_progress, 1);
        assert_eq!(updated[1].current_progress, 0);
    }

    #[test]
    fn skipped_events_count_only_when_rules_allow() {
        let quests = [quest(QuestKind::DailyPersonal, QuestGoal::DaresCompleted, 3, 0)];
        let skipped = event(TaskType::Dare, false, 0);

        let lenient = apply_event_to_quests(&quests, skipped, QuestRules::default());
        assert_eq!(lenient[0].current_progress, 1);

        let strict = apply_event_to_quests(
            &quests,
            skipped,
            QuestRules {
                count_skipped_personal: false,
            },
        );
        assert_eq!(strict[0].current_progress, 0);
    }

    #[test]
    fn community_goal_counts_completed_tasks_only() {
        let quests = [quest(QuestKind::CommunityGoal, QuestGoal::TasksCompleted, 2, 1)];
        let skipped = apply_event_to_quests(
            &quests,
            event(TaskType::Truth, false, 0),
            QuestRules::default(),
        );
        assert_eq!(skipped[0].current_progress, 1);

        let done = apply_event_to_quests(
            &quests,
            event(TaskType::Dare, true, 1),
            QuestRules::default(),
        );
        assert_eq!(done[0].current_progress, 2);
        assert!(done[0].is_completed);
    }

    #[test]
    fn completed_quests_are_frozen() {
        let mut finished = quest(QuestKind::DailyPersonal, QuestGoal::StreakReached, 2, 2);
        finished.is_completed = true;
        let updated = apply_event_to_quests(
            &[finished.clone()],
            event(TaskType::Truth, false, 0),
            QuestRules::default(),
        );
        assert_eq!(updated[0], finished);
    }

    #[test]
    fn claim_grants_every_reward_component_once() {
        let mut done = quest(QuestKind::DailyPersonal, QuestGoal::TruthsAnswered, 1, 1);
        done.is_completed = true;
        let mut stats = PlayerStats::default();
        stats.active_quests.push(done.id.clone());

        let (after, claimed) = claim_reward(&stats, &done, 1_000).expect("claimable");
        assert_eq!(after.points, 40);
        assert_eq!(after.experience, 120);
        assert_eq!(after.level(), 2);
        assert!(after.badges.contains("badge"));
        assert_eq!(after.skip_tokens, 2);
        assert_eq!(after.xp_boost_end_time, Some(1_000 + MS_PER_HOUR));
        assert!(after.active_quests.is_empty());
        assert_eq!(after.completed_quests, vec![done.id.clone()]);
        assert!(claimed.reward.claimed);

        assert!(claim_reward(&after, &claimed, 2_000).is_none());
        assert!(claim_reward(&after, &done, 2_000).is_none());
    }

    #[test]
    fn incomplete_quest_cannot_be_claimed() {
        let open = quest(QuestKind::DailyPersonal, QuestGoal::TruthsAnswered, 3, 1);
        assert!(claim_reward(&PlayerStats::default(), &open, 0).is_none());
    }

    #[test]
    fn points_boost_reward_leaves_xp_boost_alone() {
        let mut done = quest(QuestKind::WeeklyPersonal, QuestGoal::StreakReached, 1, 1);
        done.is_completed = true;
        done.reward.temp_boost = Some(TempBoost {
            kind: BoostKind::PointsBoost,
            duration_hours: 3,
        });
        let (after, _) = claim_reward(&PlayerStats::default(), &done, 0).unwrap();
        assert_eq!(after.xp_boost_end_time, None);
    }

    #[test]
    fn regeneration_replaces_expired_sets() {
        let day_one = 10 * MS_PER_DAY + 5;
        let quests = regenerate_quests(&[], day_one);
        assert_eq!(quests.len(), DAILY_TEMPLATES.len() + WEEKLY_TEMPLATES.len());
        assert!(!needs_regeneration(&quests, day_one));

        let next_day = day_one + MS_PER_DAY;
        assert!(needs_regeneration(&quests, next_day));
        let refreshed = regenerate_quests(&quests, next_day);
        let dailies: Vec<_> = refreshed
            .iter()
            .filter(|quest| quest.kind == QuestKind::DailyPersonal)
            .collect();
        assert_eq!(dailies.len(), DAILY_TEMPLATES.len());
        assert!(dailies.iter().all(|quest| !quest.is_expired(next_day)));
        assert!(dailies.iter().all(|quest| quest.id.ends_with("-11")));
    }

    #[test]
    fn regeneration_keeps_live_quests_untouched() {
        let now = 3 * MS_PER_WEEK + 1;
        let mut quests = regenerate_quests(&[], now);
        quests[0].current_progress = 2;
        let again = regenerate_quests(&quests, now + 1);
        assert_eq!(again, quests);
    }

    #[test]
    fn community_goal_regenerates_after_expiry() {
        let quest = generate_community_quest(0);
        assert_eq!(regenerate_community_quests(&[quest.clone()], 1), vec![quest.clone()]);
        let later = COMMUNITY_QUEST_LIFETIME_MS + 1;
        let fresh = regenerate_community_quests(&[quest.clone()], later);
        assert_eq!(fresh.len(), 1);
        assert_ne!(fresh[0].id, quest.id);
    }

    #[test]
    fn quest_json_uses_storage_names() {
        let value = serde_json::to_value(generate_community_quest(0)).unwrap();
        assert_eq!(value["type"], "COMMUNITY_GOAL");
        assert!(value.get("targetValue").is_some());
        assert!(value["reward"].get("badgeId").is_some());
    }
}
