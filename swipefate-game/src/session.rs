use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::card::Direction;
use crate::config::GameConfig;
use crate::history::{GameHistory, HistoryStore};
use crate::logic::{ChoiceError, ChoiceResult, EngineOptions, GameLogic};
use crate::state::{GameState, NewGameOptions, SavedGame, StateError};

/// Input events a UI layer sends into a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    ChoiceMade { direction: Direction },
    Restart,
}

/// What a dispatched command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Resolved(ChoiceResult),
    Restarted,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Choice(#[from] ChoiceError),
    #[error(transparent)]
    State(#[from] StateError),
}

/// One player's game: the engine plus the state it mutates.
#[derive(Debug, Clone)]
pub struct GameSession {
    logic: GameLogic,
    state: GameState,
    options: NewGameOptions,
}

impl GameSession {
    /// Deal a fresh game for `config` with default engine options.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NoCards`] if the deck is empty.
    pub fn new(config: GameConfig, options: NewGameOptions, seed: u64) -> Result<Self, StateError> {
        Self::from_logic(GameLogic::new(config, seed), options)
    }

    /// Deal a fresh game with a preconfigured engine.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NoCards`] if the deck is empty.
    pub fn from_logic(mut logic: GameLogic, options: NewGameOptions) -> Result<Self, StateError> {
        let state = logic.new_game(options.clone())?;
        Ok(Self {
            logic,
            state,
            options,
        })
    }

    /// Continue a saved game.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NoCards`] if the saved card is gone and the deck
    /// is empty.
    pub fn resume(mut logic: GameLogic, saved: SavedGame) -> Result<Self, StateError> {
        let options = NewGameOptions {
            player_name: Some(saved.player_name.clone()),
            difficulty: Some(saved.difficulty.clone()),
        };
        let state = logic.load_game(saved)?;
        Ok(Self {
            logic,
            state,
            options,
        })
    }

    /// Single entry point for UI commands.
    ///
    /// # Errors
    ///
    /// Returns an error if a choice is made after game over, or a restart
    /// cannot deal a card.
    pub fn dispatch(&mut self, command: Command) -> Result<SessionEvent, SessionError> {
        match command {
            Command::ChoiceMade { direction } => {
                Ok(SessionEvent::Resolved(self.process_choice(direction)?))
            }
            Command::Restart => {
                self.restart()?;
                Ok(SessionEvent::Restarted)
            }
        }
    }

    /// # Errors
    ///
    /// Returns [`ChoiceError::GameOver`] if the game has already ended.
    pub fn process_choice(&mut self, direction: Direction) -> Result<ChoiceResult, ChoiceError> {
        self.logic.process_choice(&mut self.state, direction)
    }

    /// Like [`Self::process_choice`], but a choice that ends the game is
    /// recorded into `history` and the record is attached as the summary.
    ///
    /// # Errors
    ///
    /// Returns [`ChoiceError::GameOver`] if the game has already ended.
    pub fn process_choice_recorded<S: HistoryStore>(
        &mut self,
        direction: Direction,
        history: &mut GameHistory<S>,
    ) -> Result<ChoiceResult, ChoiceError> {
        let mut result = self.process_choice(direction)?;
        if result.applied && result.game_over {
            result.summary = Some(history.record_game(&self.state, result.won, None));
        }
        Ok(result)
    }

    /// Start over with the same player and difficulty.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NoCards`] if the deck is empty.
    pub fn restart(&mut self) -> Result<(), StateError> {
        self.state = self.logic.new_game(self.options.clone())?;
        Ok(())
    }

    #[must_use]
    pub fn save(&self) -> SavedGame {
        self.state.save_game()
    }

    #[must_use]
    pub fn popularity(&self) -> i32 {
        self.logic.calculate_popularity(&self.state)
    }

    #[must_use]
    pub fn progress(&self) -> u32 {
        self.logic.calculate_progress(&self.state)
    }

    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.state.game_over
    }

    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Mutable access for tooling and tests; gameplay goes through
    /// [`Self::dispatch`].
    pub const fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    #[must_use]
    pub const fn logic(&self) -> &GameLogic {
        &self.logic
    }

    #[must_use]
    pub const fn engine_options(&self) -> EngineOptions {
        self.logic.options()
    }

    #[must_use]
    pub fn into_state(self) -> GameState {
        self.state
    }
}
