//! A play session: the committed snapshot plus the task currently on screen.
//!
//! Every operation computes the next [`GameState`] from the current one and
//! only replaces `self.state` once nothing else can fail, so an error never
//! leaves a half-applied update behind.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use thiserror::Error;

use crate::achievements::unlock_achievements;
use crate::constants::{HISTORY_LIMIT, MS_PER_SECOND};
use crate::progression::{OutcomeReport, TaskOutcome, record_share, record_task_outcome, spend_skip_token};
use crate::quests::{
    QuestEvent, QuestRules, apply_event_to_quests, claim_reward, regenerate_community_quests,
    regenerate_quests,
};
use crate::shop::{PurchaseError, ShopCatalog, SurpriseReward, purchase};
use crate::state::{BoostPolicy, Difficulty, GameState, PlayerStats};
use crate::tasks::{DrawnTask, TaskPool, TaskPoolError, TaskType, roll_task_type};

/// Runtime policy knobs for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionRules {
    pub boost_policy: BoostPolicy,
    /// Count skipped truths/dares toward personal quests.
    pub count_skipped_personal_quests: bool,
}

impl Default for SessionRules {
    fn default() -> Self {
        Self {
            boost_policy: BoostPolicy::default(),
            count_skipped_personal_quests: QuestRules::default().count_skipped_personal,
        }
    }
}

impl SessionRules {
    #[must_use]
    pub const fn quest_rules(self) -> QuestRules {
        QuestRules {
            count_skipped_personal: self.count_skipped_personal_quests,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    TaskPool(#[from] TaskPoolError),
    #[error(transparent)]
    Purchase(#[from] PurchaseError),
    #[error("no task is waiting for a result")]
    NoPendingTask,
    #[error("task {task_id} was already resolved")]
    DuplicateTaskCompletion { task_id: String },
}

/// User-facing messages produced by a session operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    XpGained { amount: u64 },
    LevelUp { level: u32 },
    StreakBroken { lost: u32 },
    SkipTokenUsed { remaining: u32 },
    AchievementUnlocked { id: &'static str, title: &'static str },
    QuestCompleted { id: String, title: String },
    QuestRewardClaimed { id: String, title: String },
    Surprise { reward: SurpriseReward },
}

/// Result of resolving the pending task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub task: DrawnTask,
    pub completed: bool,
    pub used_skip_token: bool,
    pub points_gained: u64,
    pub xp_gained: u64,
    pub notifications: Vec<Notification>,
}

/// Result of sharing the pending task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareReport {
    pub text: String,
    /// `None` when the task had already been resolved before sharing.
    pub turn: Option<TurnReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReport {
    pub item_id: String,
    pub price: u64,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone)]
pub struct GameSession {
    state: GameState,
    completed_tasks: BTreeSet<String>,
    pending: Option<DrawnTask>,
    history: VecDeque<DrawnTask>,
    pool: TaskPool,
    catalog: ShopCatalog,
    rules: SessionRules,
}

fn achievement_notifications(stats: &PlayerStats) -> (PlayerStats, Vec<Notification>) {
    let (stats, unlocked) = unlock_achievements(stats);
    let notes = unlocked
        .into_iter()
        .map(|achievement| Notification::AchievementUnlocked {
            id: achievement.id,
            title: achievement.title,
        })
        .collect();
    (stats, notes)
}

impl GameSession {
    /// Start from a first-launch snapshot.
    #[must_use]
    pub fn new(pool: TaskPool, rules: SessionRules, now_ms: i64) -> Self {
        let category = pool.default_category_id().unwrap_or_default().to_string();
        let state = GameState::initial(category, now_ms);
        Self::from_parts(pool, rules, state, BTreeSet::new(), now_ms)
    }

    /// Rebuild a session from a stored snapshot, repairing what storage cannot be trusted with.
    #[must_use]
    pub fn from_parts(
        pool: TaskPool,
        rules: SessionRules,
        state: GameState,
        completed_tasks: BTreeSet<String>,
        now_ms: i64,
    ) -> Self {
        let mut state = state.normalized();
        if pool.find_category(&state.selected_category).is_none() {
            state.selected_category = pool.default_category_id().unwrap_or_default().to_string();
        }
        let mut session = Self {
            state,
            completed_tasks,
            pending: None,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            pool,
            catalog: ShopCatalog::standard(),
            rules,
        };
        session.refresh_quests(now_ms);
        session
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: ShopCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub const fn stats(&self) -> &PlayerStats {
        &self.state.player_stats
    }

    #[must_use]
    pub const fn completed_tasks(&self) -> &BTreeSet<String> {
        &self.completed_tasks
    }

    #[must_use]
    pub const fn pending(&self) -> Option<&DrawnTask> {
        self.pending.as_ref()
    }

    /// Recent draws, oldest first, at most [`HISTORY_LIMIT`] of them.
    #[must_use]
    pub const fn history(&self) -> &VecDeque<DrawnTask> {
        &self.history
    }

    #[must_use]
    pub const fn pool(&self) -> &TaskPool {
        &self.pool
    }

    #[must_use]
    pub const fn catalog(&self) -> &ShopCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn rules(&self) -> SessionRules {
        self.rules
    }

    #[must_use]
    pub fn into_state(self) -> GameState {
        self.state
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.state.difficulty = difficulty;
    }

    /// Switch the prompt category.
    ///
    /// # Errors
    ///
    /// Returns [`TaskPoolError::UnknownCategory`] when the pool has no such category.
    pub fn select_category(&mut self, category_id: &str) -> Result<(), SessionError> {
        if self.pool.find_category(category_id).is_none() {
            return Err(TaskPoolError::UnknownCategory(category_id.to_string()).into());
        }
        self.state.selected_category = category_id.to_string();
        Ok(())
    }

    /// Spin for truth or dare, then draw a prompt.
    ///
    /// # Errors
    ///
    /// Propagates [`TaskPoolError`] when the rolled list is empty.
    pub fn draw_random<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        now_ms: i64,
    ) -> Result<&DrawnTask, SessionError> {
        let task_type = roll_task_type(rng);
        self.draw(rng, task_type, now_ms)
    }

    /// Draw a prompt of the chosen type from the selected category.
    ///
    /// # Errors
    ///
    /// Propagates [`TaskPoolError`]; the pending task is left as it was.
    pub fn draw<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        task_type: TaskType,
        now_ms: i64,
    ) -> Result<&DrawnTask, SessionError> {
        let task = self
            .pool
            .draw(rng, &self.state.selected_category, task_type, now_ms)?;
        log::debug!("drew {} task {}", task.task_type, task.id);
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(task.clone());
        Ok(self.pending.insert(task))
    }

    /// Seconds left on a timed pending task, clamped at zero.
    #[must_use]
    pub fn time_left_secs(&self, now_ms: i64) -> Option<i64> {
        let task = self.pending.as_ref()?;
        let limit_ms = i64::from(task.time_limit_secs?) * MS_PER_SECOND;
        let elapsed = now_ms.saturating_sub(task.drawn_at);
        Some((limit_ms - elapsed).max(0) / MS_PER_SECOND)
    }

    /// Record the player's result for the pending task.
    ///
    /// A non-completion consumes a skip token when one is available, keeping
    /// the streak alive.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoPendingTask`] when nothing was drawn and
    /// [`SessionError::DuplicateTaskCompletion`] when the task was already resolved.
    pub fn resolve_pending(
        &mut self,
        completed: bool,
        now_ms: i64,
    ) -> Result<TurnReport, SessionError> {
        let task = self.pending.clone().ok_or(SessionError::NoPendingTask)?;
        if self.completed_tasks.contains(&task.id) {
            return Err(SessionError::DuplicateTaskCompletion { task_id: task.id });
        }

        let mut next = self.state.clone();
        let before = next.player_stats.clone();
        let difficulty = next.difficulty;
        let mut notifications = Vec::new();

        let skip = if completed {
            None
        } else {
            spend_skip_token(&before, difficulty, self.rules.boost_policy, now_ms)
        };
        let used_skip_token = skip.is_some();

        let OutcomeReport {
            stats,
            points_gained,
            xp_gained,
        } = if let Some(report) = skip {
            notifications.push(Notification::SkipTokenUsed {
                remaining: report.stats.skip_tokens,
            });
            report
        } else {
            let outcome = TaskOutcome {
                difficulty,
                task_type: task.task_type,
                completed,
            };
            let report = record_task_outcome(&before, outcome, self.rules.boost_policy, now_ms);
            if !completed && before.current_streak > 0 {
                notifications.push(Notification::StreakBroken {
                    lost: before.current_streak,
                });
            }
            let event = QuestEvent {
                task_type: task.task_type,
                completed,
                streak: report.stats.current_streak,
            };
            next.available_quests =
                apply_event_to_quests(&next.available_quests, event, self.rules.quest_rules());
            next.community_quests =
                apply_event_to_quests(&next.community_quests, event, self.rules.quest_rules());
            report
        };

        if xp_gained > 0 {
            notifications.push(Notification::XpGained { amount: xp_gained });
        }
        if stats.level() > before.level() {
            notifications.push(Notification::LevelUp {
                level: stats.level(),
            });
        }
        for quest in next.available_quests.iter().chain(&next.community_quests) {
            let was_open = self
                .state
                .find_quest(&quest.id)
                .is_some_and(|old| !old.is_completed);
            if quest.is_completed && was_open {
                notifications.push(Notification::QuestCompleted {
                    id: quest.id.clone(),
                    title: quest.title.clone(),
                });
            }
        }

        let (stats, unlocked) = achievement_notifications(&stats);
        notifications.extend(unlocked);
        next.player_stats = stats;
        next.last_task_timestamp = Some(now_ms);

        self.state = next;
        self.completed_tasks.insert(task.id.clone());
        self.refresh_quests(now_ms);

        Ok(TurnReport {
            task,
            completed,
            used_skip_token,
            points_gained,
            xp_gained,
            notifications,
        })
    }

    /// Share the pending task; sharing counts as completing it.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoPendingTask`] when nothing was drawn.
    pub fn share_pending(&mut self, now_ms: i64) -> Result<ShareReport, SessionError> {
        let text = self
            .pending
            .as_ref()
            .ok_or(SessionError::NoPendingTask)?
            .share_text();
        let turn = match self.resolve_pending(true, now_ms) {
            Ok(report) => Some(report),
            Err(SessionError::DuplicateTaskCompletion { .. }) => None,
            Err(other) => return Err(other),
        };
        self.state.player_stats = record_share(&self.state.player_stats);
        Ok(ShareReport { text, turn })
    }

    /// Share an earlier draw from [`Self::history`].
    ///
    /// Only `shared_tasks` moves; the task is not resolved again. Returns
    /// `None` when `index` is past the end of the history.
    pub fn share_history(&mut self, index: usize) -> Option<String> {
        let text = self.history.get(index)?.share_text();
        self.state.player_stats = record_share(&self.state.player_stats);
        Some(text)
    }

    /// Buy a shop item by id.
    ///
    /// # Errors
    ///
    /// [`PurchaseError::UnknownItem`] or [`PurchaseError::InsufficientFunds`];
    /// the snapshot is unchanged on error.
    pub fn purchase<R: Rng + ?Sized>(
        &mut self,
        item_id: &str,
        rng: &mut R,
        now_ms: i64,
    ) -> Result<PurchaseReport, SessionError> {
        let item = self
            .catalog
            .find_item(item_id)
            .ok_or_else(|| PurchaseError::UnknownItem(item_id.to_string()))?;
        let bought = purchase(&self.state.player_stats, item, now_ms, rng)?;

        let mut notifications = Vec::new();
        if let Some(reward) = bought.surprise {
            notifications.push(Notification::Surprise { reward });
        }
        let (stats, unlocked) = achievement_notifications(&bought.stats);
        notifications.extend(unlocked);

        let report = PurchaseReport {
            item_id: item.id.clone(),
            price: item.price,
            notifications,
        };
        self.state.player_stats = stats;
        Ok(report)
    }

    /// Claim a completed quest's reward. Returns `None` when there is
    /// nothing to claim (unknown, incomplete or already claimed quest).
    pub fn claim_quest(&mut self, quest_id: &str, now_ms: i64) -> Option<Vec<Notification>> {
        let quest = self.state.find_quest(quest_id)?;
        let (stats, claimed) = claim_reward(&self.state.player_stats, quest, now_ms)?;

        let mut notifications = vec![Notification::QuestRewardClaimed {
            id: claimed.id.clone(),
            title: claimed.title.clone(),
        }];
        if stats.level() > self.state.player_stats.level() {
            notifications.push(Notification::LevelUp {
                level: stats.level(),
            });
        }
        let (stats, unlocked) = achievement_notifications(&stats);
        notifications.extend(unlocked);

        self.state.player_stats = stats;
        if let Some(slot) = self.state.find_quest_mut(quest_id) {
            *slot = claimed;
        }
        Some(notifications)
    }

    /// Regenerate stale quest sets. Returns whether anything changed.
    pub fn refresh_quests(&mut self, now_ms: i64) -> bool {
        let available = regenerate_quests(&self.state.available_quests, now_ms);
        let community = regenerate_community_quests(&self.state.community_quests, now_ms);
        let changed =
            available != self.state.available_quests || community != self.state.community_quests;
        self.state.available_quests = available;
        self.state.community_quests = community;
        self.state.sync_active_quests();
        changed
    }

    /// Wipe all progress back to a first-launch snapshot.
    pub fn reset(&mut self, now_ms: i64) {
        let category = self.pool.default_category_id().unwrap_or_default().to_string();
        self.state = GameState::initial(category, now_ms);
        self.completed_tasks.clear();
        self.pending = None;
        self.history.clear();
        log::info!("progress reset");
    }
}
