//! Mutable per-session game state and its save record.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use thiserror::Error;

use crate::card::{Card, Direction};
use crate::config::{GameConfig, GameSettings, Theme};
use crate::constants::{DEFAULT_DIFFICULTY, DEFAULT_PLAYER_NAME};
use crate::resource::Resource;

/// Errors raised while dealing or restoring a game.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("scenario has no cards to deal")]
    NoCards,
}

/// Who is playing and how hard.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewGameOptions {
    pub player_name: Option<String>,
    pub difficulty: Option<String>,
}

impl NewGameOptions {
    #[must_use]
    pub fn with_player(mut self, player_name: impl Into<String>) -> Self {
        self.player_name = Some(player_name.into());
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = Some(difficulty.into());
        self
    }
}

/// One resolved decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRecord {
    pub turn: u32,
    pub card_id: String,
    pub choice: Direction,
    /// Deltas as requested by the card, before clamping.
    pub effects: BTreeMap<String, i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub resources: BTreeMap<String, Resource>,
    pub current_card: Card,
    pub settings: GameSettings,
    pub theme: Theme,
    pub turn_count: u32,
    pub seen_cards: BTreeSet<String>,
    pub difficulty: String,
    pub player_name: String,
    pub game_over: bool,
    #[serde(default)]
    pub won: bool,
    pub end_message: String,
    #[serde(default)]
    pub recent_choices: VecDeque<ChoiceRecord>,
}

impl GameState {
    /// Fresh state around an explicit current card.
    #[must_use]
    pub fn new(
        resources: BTreeMap<String, Resource>,
        current_card: Card,
        settings: GameSettings,
        theme: Theme,
    ) -> Self {
        Self {
            resources,
            current_card,
            settings,
            theme,
            turn_count: 0,
            seen_cards: BTreeSet::new(),
            difficulty: DEFAULT_DIFFICULTY.to_string(),
            player_name: DEFAULT_PLAYER_NAME.to_string(),
            game_over: false,
            won: false,
            end_message: String::new(),
            recent_choices: VecDeque::new(),
        }
    }

    /// Start a game: initial resources from the scenario and a uniformly
    /// random first card.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NoCards`] if the scenario deck is empty.
    pub fn new_game<R: Rng + ?Sized>(
        config: &GameConfig,
        options: NewGameOptions,
        rng: &mut R,
    ) -> Result<Self, StateError> {
        let first_card = deal_card(&config.cards, rng).ok_or(StateError::NoCards)?;
        let mut state = Self::new(
            config.game_settings.build_resources(&config.theme),
            first_card.clone(),
            config.game_settings.clone(),
            config.theme.clone(),
        );
        if let Some(player_name) = options.player_name {
            state.player_name = player_name;
        }
        if let Some(difficulty) = options.difficulty {
            state.difficulty = difficulty;
        }
        Ok(state)
    }

    /// Snapshot into a plain save record.
    #[must_use]
    pub fn save_game(&self) -> SavedGame {
        SavedGame {
            resources: self.resource_values(),
            current_card_id: self.current_card.id.clone(),
            turn_count: self.turn_count,
            seen_cards: self.seen_cards.iter().cloned().collect(),
            difficulty: self.difficulty.clone(),
            player_name: self.player_name.clone(),
            game_over: self.game_over,
            won: self.won,
            end_message: self.end_message.clone(),
        }
    }

    /// Restore a saved game against `config`. If the saved card no longer
    /// exists, a random card is dealt in its place.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NoCards`] if a replacement card is needed and
    /// the deck is empty.
    pub fn load_game<R: Rng + ?Sized>(
        saved: SavedGame,
        config: &GameConfig,
        rng: &mut R,
    ) -> Result<Self, StateError> {
        let current_card = match config.card(&saved.current_card_id) {
            Some(card) => card.clone(),
            None => {
                log::warn!(
                    "saved card '{}' is not in scenario '{}', dealing a random card",
                    saved.current_card_id,
                    config.game_info.title
                );
                deal_card(&config.cards, rng)
                    .ok_or(StateError::NoCards)?
                    .clone()
            }
        };

        let settings = &config.game_settings;
        let mut resources = settings.build_resources(&config.theme);
        for (id, value) in saved.resources {
            match resources.get_mut(&id) {
                Some(resource) => {
                    resource.set_value(value);
                }
                None => {
                    let resource = settings.build_resource(&id, value, &config.theme);
                    resources.insert(id, resource);
                }
            }
        }

        let mut state = Self::new(
            resources,
            current_card,
            settings.clone(),
            config.theme.clone(),
        );
        state.turn_count = saved.turn_count;
        state.seen_cards = saved.seen_cards.into_iter().collect();
        state.difficulty = saved.difficulty;
        state.player_name = saved.player_name;
        state.game_over = saved.game_over;
        state.won = saved.won;
        state.end_message = saved.end_message;
        Ok(state)
    }

    #[must_use]
    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    #[must_use]
    pub fn resource_value(&self, id: &str) -> Option<i32> {
        self.resources.get(id).map(Resource::current_value)
    }

    /// Current value of every resource keyed by id.
    #[must_use]
    pub fn resource_values(&self) -> BTreeMap<String, i32> {
        self.resources
            .iter()
            .map(|(id, resource)| (id.clone(), resource.current_value()))
            .collect()
    }

    /// Set a resource directly (clamped). Unknown ids return `None`.
    pub fn set_resource(&mut self, id: &str, value: i32) -> Option<i32> {
        self.resources
            .get_mut(id)
            .map(|resource| resource.set_value(value))
    }

    #[must_use]
    pub const fn is_playing(&self) -> bool {
        !self.game_over
    }

    pub(crate) fn push_choice(&mut self, record: ChoiceRecord, window: usize) {
        self.recent_choices.push_back(record);
        while self.recent_choices.len() > window {
            self.recent_choices.pop_front();
        }
    }

    pub(crate) fn finish(&mut self, won: bool, message: String) {
        self.game_over = true;
        self.won = won;
        self.end_message = message;
    }
}

/// Plain persisted form of a [`GameState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedGame {
    pub resources: BTreeMap<String, i32>,
    pub current_card_id: String,
    pub turn_count: u32,
    pub seen_cards: Vec<String>,
    pub difficulty: String,
    pub player_name: String,
    pub game_over: bool,
    #[serde(default)]
    pub won: bool,
    #[serde(default)]
    pub end_message: String,
}

impl SavedGame {
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// # Errors
    ///
    /// Returns an error if the JSON is not a save record.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

pub(crate) fn deal_card<'a, R: Rng + ?Sized>(cards: &'a [Card], rng: &mut R) -> Option<&'a Card> {
    cards.choose(rng)
}
