//! Centralized balance and tuning constants for the Truth or Dare engine.
//!
//! Rewards, the level curve and shop prices all live here so that the
//! economy can only be rebalanced through reviewed code changes.

// Storage keys -------------------------------------------------------------
pub const STATE_STORAGE_KEY: &str = "truthOrDareGameState";
pub const COMPLETED_TASKS_STORAGE_KEY: &str = "truthOrDareCompletedTasks";

// Time ---------------------------------------------------------------------
pub const MS_PER_SECOND: i64 = 1_000;
pub const MS_PER_HOUR: i64 = 60 * 60 * MS_PER_SECOND;
pub const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;
pub const MS_PER_WEEK: i64 = 7 * MS_PER_DAY;
pub const COMMUNITY_QUEST_LIFETIME_MS: i64 = 30 * MS_PER_DAY;

// Task selection -----------------------------------------------------------
pub const TRUTH_PROBABILITY: f64 = 0.8;
pub const DARE_TIME_LIMIT_SECS: u32 = 60;
/// Presentation pacing before a rolled task is revealed.
pub const REVEAL_DELAY_MS: u64 = 1_500;
/// Drawn tasks kept in a session's history; older draws are dropped first.
pub const HISTORY_LIMIT: usize = 50;

// Rewards per difficulty tier ----------------------------------------------
pub(crate) const POINTS_EASY: u64 = 10;
pub(crate) const POINTS_MEDIUM: u64 = 25;
pub(crate) const POINTS_HARD: u64 = 50;
pub(crate) const XP_EASY: u64 = 10;
pub(crate) const XP_MEDIUM: u64 = 20;
pub(crate) const XP_HARD: u64 = 40;
pub(crate) const XP_BOOST_MULTIPLIER: u64 = 2;

// Level curve --------------------------------------------------------------
/// XP needed to leave level `L` is `LEVEL_XP_STEP * L`.
pub(crate) const LEVEL_XP_STEP: u64 = 100;

// Shop ---------------------------------------------------------------------
pub(crate) const THEME_PRICE: u64 = 500;
pub(crate) const THEME_COSMETIC_ID: &str = "theme.party";
pub(crate) const XP_BOOST_PRICE: u64 = 300;
pub(crate) const XP_BOOST_DURATION_MS: i64 = MS_PER_HOUR;
pub(crate) const SKIP_TOKEN_PRICE: u64 = 200;
pub(crate) const SURPRISE_PRICE: u64 = 100;
pub(crate) const SURPRISE_XP: u64 = 100;
pub(crate) const SURPRISE_POINTS: u64 = 200;
pub(crate) const SURPRISE_SKIP_TOKENS: u32 = 1;
pub(crate) const SURPRISE_BOOST_MS: i64 = 30 * 60 * MS_PER_SECOND;

// Quest catalog ------------------------------------------------------------
pub(crate) const DAILY_TRUTH_TARGET: u32 = 3;
pub(crate) const DAILY_DARE_TARGET: u32 = 3;
pub(crate) const DAILY_STREAK_TARGET: u32 = 5;
pub(crate) const WEEKLY_TRUTH_TARGET: u32 = 20;
pub(crate) const WEEKLY_DARE_TARGET: u32 = 20;
pub(crate) const WEEKLY_STREAK_TARGET: u32 = 10;
pub(crate) const COMMUNITY_TASK_TARGET: u32 = 1_000;
pub(crate) const WEEKLY_BOOST_HOURS: u32 = 2;
