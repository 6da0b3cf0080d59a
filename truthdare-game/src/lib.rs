//! Truth or Dare Game Engine
//!
//! Platform-agnostic progression and economy rules for a Truth or Dare party
//! game: task selection, points, experience and levels, streaks, quests,
//! achievements, the points shop and persistence of the game snapshot.
//! Presentation layers drive a [`GameSession`] and commit it through a
//! [`GameStorage`] implementation.

pub mod achievements;
pub mod constants;
pub mod level;
pub mod numbers;
pub mod progression;
pub mod quests;
pub mod session;
pub mod shop;
pub mod state;
pub mod storage;
pub mod tasks;

use std::collections::BTreeSet;

// Re-export commonly used types
pub use achievements::{ACHIEVEMENTS, Achievement, AchievementCondition, unlock_achievements};
pub use level::{calculate_level, calculate_progress, calculate_xp_for_next_level, get_xp_reward};
pub use progression::{OutcomeReport, TaskOutcome, record_share, record_task_outcome, spend_skip_token};
pub use quests::{
    Quest, QuestEvent, QuestGoal, QuestKind, QuestReward, QuestRules, apply_event_to_quests,
    claim_reward, regenerate_quests,
};
pub use session::{
    GameSession, Notification, PurchaseReport, SessionError, SessionRules, ShareReport,
    TurnReport,
};
pub use shop::{ItemEffect, PurchaseError, ShopCatalog, ShopItem, SurpriseReward, purchase};
pub use state::{BoostPolicy, Difficulty, GameState, PlayerStats};
pub use storage::{KeyValueStorage, KeyValueStore, MemoryStore, StorageError};
pub use tasks::{Category, DrawnTask, TaskPool, TaskPoolError, TaskType, roll_task_type};

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the prompt categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the task pool cannot be loaded.
    fn load_task_pool(&self) -> Result<TaskPool, Self::Error>;

    /// Load the session rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules cannot be loaded or parsed.
    fn load_rules(&self) -> Result<SessionRules, Self::Error> {
        Ok(SessionRules::default())
    }
}

/// Loader backed by the prompt set compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledLoader;

impl DataLoader for BundledLoader {
    type Error = serde_json::Error;

    fn load_task_pool(&self) -> Result<TaskPool, Self::Error> {
        TaskPool::bundled()
    }
}

/// Trait for abstracting save/load operations
/// Platform-specific implementations should provide this
pub trait GameStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be saved.
    fn save_state(&self, state: &GameState) -> Result<(), Self::Error>;

    /// Load the snapshot, `None` when nothing usable is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn load_state(&self) -> Result<Option<GameState>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the id set cannot be saved.
    fn save_completed_tasks(&self, task_ids: &BTreeSet<String>) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn load_completed_tasks(&self) -> Result<Option<BTreeSet<String>>, Self::Error>;

    /// Remove everything this storage owns.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn clear(&self) -> Result<(), Self::Error>;
}

/// Main game engine: loads data, restores sessions and commits them.
pub struct GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    data_loader: L,
    storage: S,
}

impl<L, S> GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    /// Create a new game engine with the provided data loader and storage
    pub const fn new(data_loader: L, storage: S) -> Self {
        Self {
            data_loader,
            storage,
        }
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Start a first-launch session, ignoring anything stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the task pool or rules cannot be loaded.
    pub fn create_session(&self, now_ms: i64) -> Result<GameSession, L::Error> {
        let pool = self.data_loader.load_task_pool()?;
        let rules = self.data_loader.load_rules()?;
        Ok(GameSession::new(pool, rules, now_ms))
    }

    /// Restore the stored session, or start fresh when nothing usable is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if loading data or reading storage fails.
    pub fn resume_session(&self, now_ms: i64) -> Result<GameSession, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        let pool = self.data_loader.load_task_pool().map_err(Into::into)?;
        let rules = self.data_loader.load_rules().map_err(Into::into)?;
        let Some(state) = self.storage.load_state().map_err(Into::into)? else {
            log::info!("no stored game, starting fresh");
            return Ok(GameSession::new(pool, rules, now_ms));
        };
        let completed = self
            .storage
            .load_completed_tasks()
            .map_err(Into::into)?
            .unwrap_or_default();
        Ok(GameSession::from_parts(pool, rules, state, completed, now_ms))
    }

    /// Persist the session's snapshot and completed-task set.
    ///
    /// # Errors
    ///
    /// Returns an error if either write fails.
    pub fn commit(&self, session: &GameSession) -> Result<(), S::Error> {
        self.storage.save_state(session.state())?;
        self.storage.save_completed_tasks(session.completed_tasks())
    }

    /// Wipe stored progress and reset `session` to first launch.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be cleared or rewritten.
    pub fn reset(&self, session: &mut GameSession, now_ms: i64) -> Result<(), S::Error> {
        self.storage.clear()?;
        session.reset(now_ms);
        self.commit(session)
    }
}
