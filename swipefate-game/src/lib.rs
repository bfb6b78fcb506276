//! SwipeFate Game Engine
//!
//! Platform-agnostic decision engine for swipe-to-decide card games.
//! A scenario (resources, cards, survival bands) is loaded into a
//! [`GameConfig`]; a [`GameSession`] then resolves left/right choices while a
//! [`GameHistory`] records finished games and unlocks achievements. This crate
//! has no UI or platform-specific dependencies.

pub mod card;
pub mod config;
pub mod constants;
pub mod formula;
pub mod history;
pub mod logic;
pub mod resource;
pub mod session;
pub mod state;

#[cfg(test)]
mod test_support;

use anyhow::Context;

// Re-export commonly used types
pub use card::{Card, CardChoice, CardChoices, Direction, UnknownDirection};
pub use config::{
    ConfigError, Filters, FsScenarioLoader, GameConfig, GameInfo, GameSettings, ResourceSpec,
    StatsSettings, Theme, WinCondition, merge_json, normalize_signed_numbers,
};
pub use formula::{Formula, FormulaError, Term};
pub use history::{
    ACHIEVEMENTS, Achievement, AchievementDefinition, AchievementTrigger, FileHistoryStore,
    GameHistory, GameSummary, HistoryDocument, HistoryError, HistoryStatistics, HistoryStore,
    MemoryHistoryStore, RecordOutcome,
};
pub use logic::{
    CardSelection, ChoiceError, ChoiceResult, EngineOptions, GameLogic, GameOverCheck,
};
pub use resource::Resource;
pub use session::{Command, GameSession, SessionError, SessionEvent};
pub use state::{ChoiceRecord, GameState, NewGameOptions, SavedGame, StateError};

/// Trait for abstracting scenario loading.
/// Platform-specific implementations should provide this
pub trait ScenarioLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load and validate the scenario called `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario cannot be found, parsed or validated.
    fn load_scenario(&self, name: &str) -> Result<GameConfig, Self::Error>;
}

/// Main game engine: starts sessions by scenario name and records finished
/// games into one shared history.
pub struct GameEngine<L, S>
where
    L: ScenarioLoader,
    S: HistoryStore,
{
    loader: L,
    history: GameHistory<S>,
    options: EngineOptions,
}

impl<L, S> GameEngine<L, S>
where
    L: ScenarioLoader,
    S: HistoryStore,
{
    /// Create an engine, loading the history from `store`.
    pub fn new(loader: L, store: S) -> Self {
        Self {
            loader,
            history: GameHistory::open(store),
            options: EngineOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Deal a new game of `scenario`.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario cannot be loaded or has no cards.
    pub fn start_session(
        &self,
        scenario: &str,
        options: NewGameOptions,
        seed: u64,
    ) -> anyhow::Result<GameSession> {
        let logic = self.logic_for(scenario, seed)?;
        GameSession::from_logic(logic, options)
            .with_context(|| format!("failed to deal scenario '{scenario}'"))
    }

    /// Continue a saved game of `scenario`.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario cannot be loaded or a replacement
    /// card cannot be dealt.
    pub fn resume_session(
        &self,
        scenario: &str,
        saved: SavedGame,
        seed: u64,
    ) -> anyhow::Result<GameSession> {
        let logic = self.logic_for(scenario, seed)?;
        GameSession::resume(logic, saved)
            .with_context(|| format!("failed to resume scenario '{scenario}'"))
    }

    /// Resolve a choice, recording the game if it ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the session's game is already over.
    pub fn play(
        &mut self,
        session: &mut GameSession,
        direction: Direction,
    ) -> anyhow::Result<ChoiceResult> {
        Ok(session.process_choice_recorded(direction, &mut self.history)?)
    }

    #[must_use]
    pub const fn history(&self) -> &GameHistory<S> {
        &self.history
    }

    #[must_use]
    pub const fn loader(&self) -> &L {
        &self.loader
    }

    fn logic_for(&self, scenario: &str, seed: u64) -> anyhow::Result<GameLogic> {
        let config = self
            .loader
            .load_scenario(scenario)
            .with_context(|| format!("failed to load scenario '{scenario}'"))?;
        Ok(GameLogic::new(config, seed).with_options(self.options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_config;
    use std::collections::HashMap;

    #[derive(Default)]
    struct StaticLoader {
        scenarios: HashMap<String, GameConfig>,
    }

    impl StaticLoader {
        fn with(name: &str, config: GameConfig) -> Self {
            let mut loader = Self::default();
            loader.scenarios.insert(name.to_string(), config);
            loader
        }
    }

    impl ScenarioLoader for StaticLoader {
        type Error = std::io::Error;

        fn load_scenario(&self, name: &str) -> Result<GameConfig, Self::Error> {
            self.scenarios.get(name).cloned().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, format!("no scenario {name}"))
            })
        }
    }

    fn engine() -> GameEngine<StaticLoader, MemoryHistoryStore> {
        GameEngine::new(
            StaticLoader::with("test", sample_config()),
            MemoryHistoryStore::new(),
        )
    }

    #[test]
    fn start_session_uses_named_scenario() {
        let engine = engine();
        let session = engine
            .start_session("test", NewGameOptions::default().with_player("Ada"), 1)
            .unwrap();
        assert_eq!(session.state().player_name, "Ada");
        assert_eq!(session.state().theme.name, "Test Theme");
    }

    #[test]
    fn unknown_scenarios_report_context() {
        let engine = engine();
        let err = engine
            .start_session("missing", NewGameOptions::default(), 1)
            .unwrap_err();
        assert!(err.to_string().contains("failed to load scenario 'missing'"));
    }

    #[test]
    fn play_records_finished_games() {
        let mut engine = engine();
        let mut session = engine
            .start_session("test", NewGameOptions::default(), 2)
            .unwrap();
        let card = session.logic().config().card("card_001").unwrap().clone();
        session.state_mut().current_card = card;
        session.state_mut().set_resource("resource1", 85);

        let result = engine.play(&mut session, Direction::Left).unwrap();
        assert!(result.game_over);
        assert!(result.summary.is_some());
        assert_eq!(engine.history().games().len(), 1);
        assert!(engine.play(&mut session, Direction::Left).is_err());
    }

    #[test]
    fn engine_options_reach_sessions() {
        let options = EngineOptions {
            card_selection: CardSelection::PreferUnseen,
            ..EngineOptions::default()
        };
        let engine = engine().with_options(options);
        let session = engine
            .start_session("test", NewGameOptions::default(), 3)
            .unwrap();
        assert_eq!(session.engine_options(), options);
    }

    #[test]
    fn resume_session_restores_saved_progress() {
        let engine = engine();
        let mut session = engine
            .start_session("test", NewGameOptions::default(), 4)
            .unwrap();
        session.process_choice(Direction::Right).unwrap();
        let saved = session.save();

        let resumed = engine.resume_session("test", saved.clone(), 5).unwrap();
        assert_eq!(resumed.save(), saved);
    }
}
