//! Player progression record and the persisted game snapshot.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::constants::{
    POINTS_EASY, POINTS_HARD, POINTS_MEDIUM, XP_BOOST_MULTIPLIER, XP_EASY, XP_HARD, XP_MEDIUM,
};
use crate::level::calculate_level;
use crate::quests::{Quest, generate_community_quest, generate_daily_quests, generate_weekly_quests};

/// Difficulty tier of a task; each tier carries a fixed points and XP reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Self; 3] = [Self::Easy, Self::Medium, Self::Hard];

    #[must_use]
    pub const fn points_reward(self) -> u64 {
        match self {
            Self::Easy => POINTS_EASY,
            Self::Medium => POINTS_MEDIUM,
            Self::Hard => POINTS_HARD,
        }
    }

    #[must_use]
    pub const fn xp_reward(self) -> u64 {
        match self {
            Self::Easy => XP_EASY,
            Self::Medium => XP_MEDIUM,
            Self::Hard => XP_HARD,
        }
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    /// Parse a lowercase tier name.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.key().eq_ignore_ascii_case(key.trim()))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Whether an active XP boost multiplies experience from task outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostPolicy {
    /// Double task XP while `now < xp_boost_end_time`.
    #[default]
    DoubleWhileActive,
    /// Store the boost end time without touching rewards.
    Ignore,
}

impl BoostPolicy {
    /// Apply the policy to a base experience reward.
    #[must_use]
    pub const fn apply(self, base_xp: u64, boost_active: bool) -> u64 {
        match self {
            Self::DoubleWhileActive if boost_active => base_xp.saturating_mul(XP_BOOST_MULTIPLIER),
            _ => base_xp,
        }
    }
}

/// Per-player progression record.
///
/// Counters only grow except `current_streak`, which drops to zero when a
/// task is not completed. `level` is always derived from `experience`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerStats {
    pub points: u64,
    #[serde(rename = "xp", alias = "experience")]
    pub experience: u64,
    level: u32,
    pub tasks_completed: u32,
    pub truths_answered: u32,
    pub dares_completed: u32,
    pub hard_tasks_completed: u32,
    pub shared_tasks: u32,
    pub current_streak: u32,
    pub max_streak: u32,
    pub achievements: BTreeSet<String>,
    pub badges: BTreeSet<String>,
    pub cosmetics: BTreeSet<String>,
    pub active_quests: Vec<String>,
    pub completed_quests: Vec<String>,
    pub skip_tokens: u32,
    pub xp_boost_end_time: Option<i64>,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            points: 0,
            experience: 0,
            level: 1,
            tasks_completed: 0,
            truths_answered: 0,
            dares_completed: 0,
            hard_tasks_completed: 0,
            shared_tasks: 0,
            current_streak: 0,
            max_streak: 0,
            achievements: BTreeSet::new(),
            badges: BTreeSet::new(),
            cosmetics: BTreeSet::new(),
            active_quests: Vec::new(),
            completed_quests: Vec::new(),
            skip_tokens: 0,
            xp_boost_end_time: None,
        }
    }
}

impl PlayerStats {
    /// Level derived from the current experience.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Builder used by tests and tools to start from a given experience total.
    #[must_use]
    pub fn with_experience(mut self, experience: u64) -> Self {
        self.experience = experience;
        self.sync_level();
        self
    }

    /// Add experience and recompute the level.
    pub fn gain_experience(&mut self, amount: u64) {
        self.experience = self.experience.saturating_add(amount);
        self.sync_level();
    }

    /// Recompute `level` from `experience`. Stored levels are never trusted.
    pub fn sync_level(&mut self) {
        self.level = calculate_level(self.experience);
    }

    #[must_use]
    pub fn xp_boost_active(&self, now_ms: i64) -> bool {
        self.xp_boost_end_time.is_some_and(|end| now_ms < end)
    }

    /// Remaining boost time in milliseconds, zero when no boost runs.
    #[must_use]
    pub fn xp_boost_remaining_ms(&self, now_ms: i64) -> i64 {
        self.xp_boost_end_time
            .map_or(0, |end| end.saturating_sub(now_ms).max(0))
    }

    /// Bring the streak high-water mark up to date.
    pub fn sync_max_streak(&mut self) {
        self.max_streak = self.max_streak.max(self.current_streak);
    }
}

/// Complete persisted game snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameState {
    pub difficulty: Difficulty,
    pub player_stats: PlayerStats,
    pub last_task_timestamp: Option<i64>,
    pub selected_category: String,
    pub available_quests: Vec<Quest>,
    pub community_quests: Vec<Quest>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            player_stats: PlayerStats::default(),
            last_task_timestamp: None,
            selected_category: String::new(),
            available_quests: Vec::new(),
            community_quests: Vec::new(),
        }
    }
}

impl GameState {
    /// Fresh first-launch snapshot with quests generated for `now_ms`.
    #[must_use]
    pub fn initial(selected_category: impl Into<String>, now_ms: i64) -> Self {
        let mut available_quests = generate_daily_quests(now_ms);
        available_quests.extend(generate_weekly_quests(now_ms));
        let community_quests = vec![generate_community_quest(now_ms)];

        let mut player_stats = PlayerStats::default();
        player_stats.active_quests = available_quests
            .iter()
            .chain(&community_quests)
            .map(|quest| quest.id.clone())
            .collect();

        Self {
            difficulty: Difficulty::default(),
            player_stats,
            last_task_timestamp: None,
            selected_category: selected_category.into(),
            available_quests,
            community_quests,
        }
    }

    /// Repair derived fields after loading from storage.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.player_stats.sync_level();
        self.player_stats.sync_max_streak();
        self
    }

    /// Look up a quest in either collection.
    #[must_use]
    pub fn find_quest(&self, quest_id: &str) -> Option<&Quest> {
        self.available_quests
            .iter()
            .chain(&self.community_quests)
            .find(|quest| quest.id == quest_id)
    }

    /// Keep `active_quests` equal to the unclaimed quests currently on offer.
    pub fn sync_active_quests(&mut self) {
        let live: Vec<&str> = self
            .available_quests
            .iter()
            .chain(&self.community_quests)
            .filter(|quest| !quest.reward.claimed)
            .map(|quest| quest.id.as_str())
            .collect();
        let stats = &mut self.player_stats;
        stats.active_quests.retain(|id| live.contains(&id.as_str()));
        for id in live {
            let known = stats.active_quests.iter().any(|active| active == id)
                || stats.completed_quests.iter().any(|done| done == id);
            if !known {
                stats.active_quests.push(id.to_string());
            }
        }
    }

    /// Mutable lookup across both quest collections.
    pub fn find_quest_mut(&mut self, quest_id: &str) -> Option<&mut Quest> {
        self.available_quests
            .iter_mut()
            .chain(self.community_quests.iter_mut())
            .find(|quest| quest.id == quest_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_keys_roundtrip() {
        for tier in Difficulty::ALL {
            assert_eq!(Difficulty::from_key(tier.key()), Some(tier));
        }
        assert_eq!(Difficulty::from_key(" HARD "), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_key("extreme"), None);
    }

    #[test]
    fn boost_policy_only_doubles_when_active() {
        assert_eq!(BoostPolicy::DoubleWhileActive.apply(20, true), 40);
        assert_eq!(BoostPolicy::DoubleWhileActive.apply(20, false), 20);
        assert_eq!(BoostPolicy::Ignore.apply(20, true), 20);
    }

    #[test]
    fn stats_deserialize_with_missing_fields() {
        let stats: PlayerStats =
            serde_json::from_str(r#"{"points": 40, "xp": 150, "level": 9}"#).unwrap();
        assert_eq!(stats.points, 40);
        assert_eq!(stats.experience, 150);
        assert_eq!(stats.skip_tokens, 0);
        assert!(stats.achievements.is_empty());

        let state = GameState {
            player_stats: stats,
            ..GameState::default()
        }
        .normalized();
        assert_eq!(state.player_stats.level(), 2);
    }

    #[test]
    fn boost_window_is_exclusive_at_end() {
        let stats = PlayerStats {
            xp_boost_end_time: Some(1_000),
            ..PlayerStats::default()
        };
        assert!(stats.xp_boost_active(999));
        assert!(!stats.xp_boost_active(1_000));
        assert_eq!(stats.xp_boost_remaining_ms(400), 600);
        assert_eq!(stats.xp_boost_remaining_ms(5_000), 0);
    }

    #[test]
    fn initial_state_tracks_generated_quests() {
        let state = GameState::initial("party", 0);
        assert_eq!(state.selected_category, "party");
        assert_eq!(state.difficulty, Difficulty::Medium);
        assert!(!state.available_quests.is_empty());
        assert_eq!(state.community_quests.len(), 1);
        assert_eq!(
            state.player_stats.active_quests.len(),
            state.available_quests.len() + state.community_quests.len()
        );
        assert_eq!(state.player_stats.level(), 1);
    }

    #[test]
    fn snapshot_json_uses_storage_field_names() {
        let state = GameState::initial("party", 0);
        let value = serde_json::to_value(&state).unwrap();
        assert!(value.get("playerStats").is_some());
        assert!(value.get("availableQuests").is_some());
        assert!(value["playerStats"].get("xp").is_some());
        assert!(value["playerStats"].get("currentStreak").is_some());
        assert_eq!(value["difficulty"], "medium");
    }
}
