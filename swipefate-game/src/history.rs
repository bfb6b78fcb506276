//! Finished-game history, statistics and achievements.
//!
//! The history document is loaded once when a [`GameHistory`] is opened and
//! rewritten after every recorded game. A missing or unreadable document
//! starts an empty history; gameplay never fails on persistence.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

use crate::constants::{
    BALANCED_RULER_MAX, BALANCED_RULER_MIN, HISTORY_FILE_NAME, HISTORY_LIMIT, HISTORY_ROOT_DIR,
    HISTORY_SUB_DIR, RESOURCE_COLLECTOR_THRESHOLD, RESOURCE_MASTER_THRESHOLD,
    SPEED_RUNNER_MAX_TURNS, VETERAN_MIN_TURNS,
};
use crate::state::GameState;

/// Errors raised by the file-backed history store.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("history document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not determine the home directory")]
    NoHomeDir,
}

/// Durable storage for the history document.
pub trait HistoryStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the stored document, `None` when nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if stored data exists but cannot be read or parsed.
    fn load(&self) -> Result<Option<HistoryDocument>, Self::Error>;

    /// Replace the stored document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    fn save(&self, document: &HistoryDocument) -> Result<(), Self::Error>;
}

/// Stores history as pretty JSON in a single file.
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    /// Store at `<dir>/game_history.json`, creating `dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| HistoryError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            path: dir.join(HISTORY_FILE_NAME),
        })
    }

    /// Store under `<home>/.swipe_verse/history/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn under_home(home: &Path) -> Result<Self, HistoryError> {
        Self::in_dir(home.join(HISTORY_ROOT_DIR).join(HISTORY_SUB_DIR))
    }

    /// Store under the current user's home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no home directory or the history
    /// directory cannot be created.
    pub fn default_location() -> Result<Self, HistoryError> {
        let home = dirs::home_dir().ok_or(HistoryError::NoHomeDir)?;
        Self::under_home(&home)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for FileHistoryStore {
    type Error = HistoryError;

    fn load(&self) -> Result<Option<HistoryDocument>, Self::Error> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(HistoryError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, document: &HistoryDocument) -> Result<(), Self::Error> {
        let json = serde_json::to_string_pretty(document)?;
        std::fs::write(&self.path, json).map_err(|source| HistoryError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// In-process store. Clones share the same document, so a second
/// [`GameHistory`] opened on a clone sees what the first one saved.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    document: Rc<RefCell<Option<HistoryDocument>>>,
}

impl MemoryHistoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<HistoryDocument> {
        self.document.borrow().clone()
    }
}

impl HistoryStore for MemoryHistoryStore {
    type Error = Infallible;

    fn load(&self) -> Result<Option<HistoryDocument>, Self::Error> {
        Ok(self.document.borrow().clone())
    }

    fn save(&self, document: &HistoryDocument) -> Result<(), Self::Error> {
        *self.document.borrow_mut() = Some(document.clone());
        Ok(())
    }
}

/// Persisted layout: `{games: [...], achievements: [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HistoryDocument {
    #[serde(default)]
    pub games: Vec<GameSummary>,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
}

/// Snapshot of one finished game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub date: DateTime<Utc>,
    pub theme: String,
    pub player_name: String,
    pub turns: u32,
    pub resources: BTreeMap<String, i32>,
    pub difficulty: String,
    pub won: bool,
    pub message: String,
}

impl GameSummary {
    #[must_use]
    pub fn from_state(state: &GameState, won: bool, message: &str, date: DateTime<Utc>) -> Self {
        Self {
            date,
            theme: state.theme.name.clone(),
            player_name: state.player_name.clone(),
            turns: state.turn_count,
            resources: state.resource_values(),
            difficulty: state.difficulty.clone(),
            won,
            message: message.to_string(),
        }
    }
}

/// Unlock predicate evaluated against a winning game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementTrigger {
    /// Some resource ended at or above `threshold`.
    AnyResourceAtLeast { threshold: i32 },
    /// Every resource ended at or above `threshold`.
    AllResourcesAtLeast { threshold: i32 },
    /// Every resource ended inside `min..=max`.
    AllResourcesWithin { min: i32, max: i32 },
    /// The game lasted at most `turns`.
    TurnsAtMost { turns: u32 },
    /// The game lasted at least `turns`.
    TurnsAtLeast { turns: u32 },
}

impl AchievementTrigger {
    #[must_use]
    pub fn is_met(self, game: &GameSummary) -> bool {
        let mut values = game.resources.values().copied();
        match self {
            Self::AnyResourceAtLeast { threshold } => values.any(|v| v >= threshold),
            Self::AllResourcesAtLeast { threshold } => {
                !game.resources.is_empty() && values.all(|v| v >= threshold)
            }
            Self::AllResourcesWithin { min, max } => {
                !game.resources.is_empty() && values.all(|v| (min..=max).contains(&v))
            }
            Self::TurnsAtMost { turns } => game.turns <= turns,
            Self::TurnsAtLeast { turns } => game.turns >= turns,
        }
    }
}

/// Static description of an achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AchievementDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub trigger: AchievementTrigger,
}

pub const ACHIEVEMENTS: [AchievementDefinition; 5] = [
    AchievementDefinition {
        id: "resource_master",
        name: "Resource Master",
        description: "Win a game with any resource at 90 or above",
        icon: "resource_master.png",
        trigger: AchievementTrigger::AnyResourceAtLeast {
            threshold: RESOURCE_MASTER_THRESHOLD,
        },
    },
    AchievementDefinition {
        id: "balanced_ruler",
        name: "Balanced Ruler",
        description: "Win a game with every resource between 40 and 60",
        icon: "balanced_ruler.png",
        trigger: AchievementTrigger::AllResourcesWithin {
            min: BALANCED_RULER_MIN,
            max: BALANCED_RULER_MAX,
        },
    },
    AchievementDefinition {
        id: "speed_runner",
        name: "Speed Runner",
        description: "Win a game in 10 turns or fewer",
        icon: "speed_runner.png",
        trigger: AchievementTrigger::TurnsAtMost {
            turns: SPEED_RUNNER_MAX_TURNS,
        },
    },
    AchievementDefinition {
        id: "resource_collector",
        name: "Resource Collector",
        description: "Win a game with every resource at 80 or above",
        icon: "resource_collector.png",
        trigger: AchievementTrigger::AllResourcesAtLeast {
            threshold: RESOURCE_COLLECTOR_THRESHOLD,
        },
    },
    AchievementDefinition {
        id: "veteran",
        name: "Veteran",
        description: "Win a game lasting 50 turns or more",
        icon: "veteran.png",
        trigger: AchievementTrigger::TurnsAtLeast {
            turns: VETERAN_MIN_TURNS,
        },
    },
];

/// Unlock status of one achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub unlocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<DateTime<Utc>>,
}

impl Achievement {
    #[must_use]
    pub fn locked(definition: &AchievementDefinition) -> Self {
        Self {
            id: definition.id.to_string(),
            name: definition.name.to_string(),
            description: definition.description.to_string(),
            icon: definition.icon.to_string(),
            unlocked: false,
            unlocked_at: None,
        }
    }
}

/// Returned by [`GameHistory::record_game`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub game: GameSummary,
    /// Only achievements unlocked by this game.
    pub new_achievements: Vec<Achievement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryStatistics {
    pub total_games: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_percentage: f64,
    /// Mean length of winning games.
    pub average_turns: f64,
    pub best_resources: BTreeMap<String, i32>,
    pub achievements_unlocked: usize,
    pub total_achievements: usize,
}

/// History of finished games bound to a store.
#[derive(Debug)]
pub struct GameHistory<S: HistoryStore> {
    store: S,
    document: HistoryDocument,
}

impl<S: HistoryStore> GameHistory<S> {
    /// Load the history from `store`, starting empty if nothing usable is
    /// stored.
    pub fn open(store: S) -> Self {
        let document = match store.load() {
            Ok(Some(document)) => document,
            Ok(None) => HistoryDocument::default(),
            Err(err) => {
                log::warn!("history could not be loaded, starting fresh: {err}");
                HistoryDocument::default()
            }
        };
        let mut history = Self { store, document };
        history.trim_to_limit();
        history.reconcile_achievements();
        history
    }

    /// Record a finished game now. `message` defaults to the state's end
    /// message.
    pub fn record_game(
        &mut self,
        state: &GameState,
        won: bool,
        message: Option<&str>,
    ) -> RecordOutcome {
        self.record_game_at(state, won, message, Utc::now())
    }

    /// Record a finished game with an explicit timestamp.
    pub fn record_game_at(
        &mut self,
        state: &GameState,
        won: bool,
        message: Option<&str>,
        date: DateTime<Utc>,
    ) -> RecordOutcome {
        let message = message.unwrap_or(state.end_message.as_str());
        let game = GameSummary::from_state(state, won, message, date);

        self.document.games.push(game.clone());
        self.trim_to_limit();

        let new_achievements = if won {
            self.unlock_achievements(&game, date)
        } else {
            Vec::new()
        };

        if let Err(err) = self.store.save(&self.document) {
            log::error!("failed to persist game history: {err}");
        }

        RecordOutcome {
            game,
            new_achievements,
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn get_statistics(&self) -> HistoryStatistics {
        let games = &self.document.games;
        let total_games = games.len();
        let wins = games.iter().filter(|game| game.won).count();
        let win_percentage = if total_games == 0 {
            0.0
        } else {
            wins as f64 * 100.0 / total_games as f64
        };
        let average_turns = if wins == 0 {
            0.0
        } else {
            let winning_turns: u64 = games
                .iter()
                .filter(|game| game.won)
                .map(|game| u64::from(game.turns))
                .sum();
            winning_turns as f64 / wins as f64
        };

        let mut best_resources = BTreeMap::new();
        for (id, value) in games.iter().flat_map(|game| &game.resources) {
            best_resources
                .entry(id.clone())
                .and_modify(|best: &mut i32| *best = (*best).max(*value))
                .or_insert(*value);
        }

        let achievements = &self.document.achievements;
        HistoryStatistics {
            total_games,
            wins,
            losses: total_games - wins,
            win_percentage,
            average_turns,
            best_resources,
            achievements_unlocked: achievements.iter().filter(|a| a.unlocked).count(),
            total_achievements: achievements.len(),
        }
    }

    /// The `count` most recent games, newest first.
    #[must_use]
    pub fn get_recent_games(&self, count: usize) -> Vec<&GameSummary> {
        self.document.games.iter().rev().take(count).collect()
    }

    #[must_use]
    pub fn get_achievements(&self) -> &[Achievement] {
        &self.document.achievements
    }

    /// Every retained game, oldest first.
    #[must_use]
    pub fn games(&self) -> &[GameSummary] {
        &self.document.games
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    fn unlock_achievements(&mut self, game: &GameSummary, date: DateTime<Utc>) -> Vec<Achievement> {
        let mut unlocked = Vec::new();
        for definition in &ACHIEVEMENTS {
            if !definition.trigger.is_met(game) {
                continue;
            }
            let Some(achievement) = self
                .document
                .achievements
                .iter_mut()
                .find(|a| a.id == definition.id)
            else {
                continue;
            };
            if achievement.unlocked {
                continue;
            }
            achievement.unlocked = true;
            achievement.unlocked_at = Some(date);
            log::info!("achievement unlocked: {}", achievement.name);
            unlocked.push(achievement.clone());
        }
        unlocked
    }

    /// Drop the oldest games beyond the retention cap.
    fn trim_to_limit(&mut self) {
        let len = self.document.games.len();
        if len > HISTORY_LIMIT {
            self.document.games.drain(..len - HISTORY_LIMIT);
        }
    }

    /// Keep catalog order, carry over stored unlocks, and add entries the
    /// stored document predates.
    fn reconcile_achievements(&mut self) {
        let stored = std::mem::take(&mut self.document.achievements);
        self.document.achievements = ACHIEVEMENTS
            .iter()
            .map(|definition| {
                let mut achievement = Achievement::locked(definition);
                if let Some(previous) = stored.iter().find(|a| a.id == definition.id) {
                    achievement.unlocked = previous.unlocked;
                    achievement.unlocked_at = previous.unlocked_at;
                }
                achievement
            })
            .collect();
    }
}
