//! Centralized defaults and tuning constants for the SwipeFate engine.
//!
//! Scenario files decide resources, cards and survival bands. Everything
//! here is engine behaviour that a scenario cannot override.

// Session defaults ---------------------------------------------------------
pub const DEFAULT_PLAYER_NAME: &str = "Player";
pub const DEFAULT_DIFFICULTY: &str = "standard";
pub const DEFAULT_TURN_UNIT: &str = "turns";
pub(crate) const DEFAULT_DIFFICULTY_MODIFIER: f64 = 1.0;

// Resource bounds ----------------------------------------------------------
pub const DEFAULT_RESOURCE_MIN: i32 = 0;
pub const DEFAULT_RESOURCE_MAX: i32 = 100;

// Turn bookkeeping ---------------------------------------------------------
pub(crate) const RECENT_CHOICE_WINDOW: usize = 20;

// History ------------------------------------------------------------------
pub const HISTORY_LIMIT: usize = 100;
pub(crate) const HISTORY_ROOT_DIR: &str = ".swipe_verse";
pub(crate) const HISTORY_SUB_DIR: &str = "history";
pub(crate) const HISTORY_FILE_NAME: &str = "game_history.json";

// Achievement thresholds ---------------------------------------------------
pub(crate) const RESOURCE_MASTER_THRESHOLD: i32 = 90;
pub(crate) const BALANCED_RULER_MIN: i32 = 40;
pub(crate) const BALANCED_RULER_MAX: i32 = 60;
pub(crate) const SPEED_RUNNER_MAX_TURNS: u32 = 10;
pub(crate) const RESOURCE_COLLECTOR_THRESHOLD: i32 = 80;
pub(crate) const VETERAN_MIN_TURNS: u32 = 50;
