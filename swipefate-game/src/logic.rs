//! Decision resolution: applies a choice, picks the next card and decides
//! whether the game has ended.
use rand::SeedableRng;
use rand::seq::IteratorRandom;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::card::{Card, Direction};
use crate::config::GameConfig;
use crate::constants::RECENT_CHOICE_WINDOW;
use crate::formula::Formula;
use crate::history::RecordOutcome;
use crate::state::{ChoiceRecord, GameState, NewGameOptions, SavedGame, StateError, deal_card};

/// Raised when a choice is submitted to a finished game.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChoiceError {
    #[error("the game is already over")]
    GameOver,
}

/// How a random next card is drawn when a choice names none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardSelection {
    /// Any card in the deck, seen or not.
    #[default]
    Uniform,
    /// Cards not yet in `seen_cards`; the full deck once everything is seen.
    PreferUnseen,
}

impl CardSelection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::PreferUnseen => "prefer-unseen",
        }
    }
}

impl fmt::Display for CardSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "uniform" => Ok(Self::Uniform),
            "prefer-unseen" | "unseen" => Ok(Self::PreferUnseen),
            other => Err(format!("unknown card selection '{other}'")),
        }
    }
}

/// Engine tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    pub card_selection: CardSelection,
    /// Multiply negative effect deltas by the difficulty modifier.
    pub scale_penalties: bool,
    /// How many resolved choices the state keeps in `recent_choices`.
    pub recent_choice_window: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            card_selection: CardSelection::default(),
            scale_penalties: false,
            recent_choice_window: RECENT_CHOICE_WINDOW,
        }
    }
}

/// Outcome of a game-over check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameOverCheck {
    pub game_over: bool,
    pub won: bool,
    pub message: String,
}

impl GameOverCheck {
    fn lost(message: String) -> Self {
        Self {
            game_over: true,
            won: false,
            message,
        }
    }

    fn won(message: String) -> Self {
        Self {
            game_over: true,
            won: true,
            message,
        }
    }
}

/// What happened when a choice was submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceResult {
    /// `false` when the current card has no choice in that direction.
    pub applied: bool,
    pub game_over: bool,
    pub won: bool,
    pub message: String,
    /// Filled in when the finished game was recorded into a history.
    pub summary: Option<RecordOutcome>,
}

impl ChoiceResult {
    fn unchanged(state: &GameState) -> Self {
        Self {
            applied: false,
            game_over: state.game_over,
            won: state.won,
            message: state.end_message.clone(),
            summary: None,
        }
    }
}

/// The decision-resolution engine for one scenario.
#[derive(Debug, Clone)]
pub struct GameLogic {
    config: GameConfig,
    popularity: Option<Formula>,
    options: EngineOptions,
    rng: ChaCha20Rng,
}

impl GameLogic {
    /// Engine over `config` with default options and a seeded RNG.
    #[must_use]
    pub fn new(config: GameConfig, seed: u64) -> Self {
        let popularity = config.popularity_formula().unwrap_or_else(|err| {
            log::warn!("ignoring popularity formula: {err}");
            None
        });
        Self {
            config,
            popularity,
            options: EngineOptions::default(),
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub const fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub const fn options(&self) -> EngineOptions {
        self.options
    }

    /// Restart the random stream from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha20Rng::seed_from_u64(seed);
    }

    /// Deal a new game using this engine's random stream.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NoCards`] if the deck is empty.
    pub fn new_game(&mut self, options: NewGameOptions) -> Result<GameState, StateError> {
        GameState::new_game(&self.config, options, &mut self.rng)
    }

    /// Restore a saved game using this engine's random stream.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NoCards`] if a replacement card is needed and the
    /// deck is empty.
    pub fn load_game(&mut self, saved: SavedGame) -> Result<GameState, StateError> {
        GameState::load_game(saved, &self.config, &mut self.rng)
    }

    /// Resolve the player's swipe on the current card.
    ///
    /// Effects on unknown resources are skipped. A missing choice leaves the
    /// state untouched and reports `applied == false`.
    ///
    /// # Errors
    ///
    /// Returns [`ChoiceError::GameOver`] if the game has already ended.
    pub fn process_choice(
        &mut self,
        state: &mut GameState,
        direction: Direction,
    ) -> Result<ChoiceResult, ChoiceError> {
        if state.game_over {
            return Err(ChoiceError::GameOver);
        }

        let card_id = state.current_card.id.clone();
        let Some(choice) = state.current_card.choice(direction).cloned() else {
            log::warn!("card '{card_id}' has no {direction} choice; ignoring swipe");
            return Ok(ChoiceResult::unchanged(state));
        };

        let modifier = state.settings.difficulty_modifier(&state.difficulty);
        for (resource_id, delta) in &choice.effects {
            let delta = self.scaled_delta(*delta, modifier);
            match state.resources.get_mut(resource_id) {
                Some(resource) => {
                    let value = resource.adjust(delta);
                    log::debug!("{resource_id} {delta:+} -> {value}");
                }
                None => log::warn!("card '{card_id}' affects unknown resource '{resource_id}'"),
            }
        }

        state.turn_count = state.turn_count.saturating_add(1);
        state.push_choice(
            ChoiceRecord {
                turn: state.turn_count,
                card_id: card_id.clone(),
                choice: direction,
                effects: choice.effects.clone(),
            },
            self.options.recent_choice_window,
        );
        state.seen_cards.insert(card_id);

        self.advance_card(state, choice.next_card.as_deref());

        let check = self.check_game_over(state);
        if check.game_over {
            log::info!(
                "game over after {} {}: {}",
                state.turn_count,
                state.settings.turn_unit,
                check.message
            );
            state.finish(check.won, check.message.clone());
        }

        Ok(ChoiceResult {
            applied: true,
            game_over: check.game_over,
            won: check.won,
            message: check.message,
            summary: None,
        })
    }

    /// Evaluate survival bands in declaration order (low bound first), then
    /// the optional target length.
    #[must_use]
    pub fn check_game_over(&self, state: &GameState) -> GameOverCheck {
        for condition in &state.settings.win_conditions {
            let Some(resource) = state.resource(&condition.resource) else {
                continue;
            };
            let value = resource.current_value();
            if value <= condition.min {
                return GameOverCheck::lost(format!("Your {} is too low!", resource.name));
            }
            if value >= condition.max {
                return GameOverCheck::lost(format!("Your {} is too high!", resource.name));
            }
        }

        if let Some(target) = state.settings.target_turns
            && target > 0
            && state.turn_count >= target
        {
            return GameOverCheck::won(format!(
                "You ruled for {} {}!",
                state.turn_count, state.settings.turn_unit
            ));
        }

        GameOverCheck::default()
    }

    /// Popularity as a 0-100 percentage, rounded half away from zero. Without
    /// a formula this is the mean resource value.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn calculate_popularity(&self, state: &GameState) -> i32 {
        let values = state.resource_values();
        let raw = match &self.popularity {
            Some(formula) => formula.evaluate(&values),
            None if values.is_empty() => 0.0,
            None => values.values().map(|v| f64::from(*v)).sum::<f64>() / values.len() as f64,
        };
        raw.round().clamp(0.0, 100.0) as i32
    }

    /// Progress as a 0-100 percentage: turns against `target_turns` when
    /// configured, otherwise the share of the deck already played.
    #[must_use]
    pub fn calculate_progress(&self, state: &GameState) -> u32 {
        if let Some(target) = state.settings.target_turns
            && target > 0
        {
            let pct = u64::from(state.turn_count) * 100 / u64::from(target);
            return u32::try_from(pct.min(100)).unwrap_or(100);
        }

        let total = self.config.cards.len();
        if total == 0 {
            return 0;
        }
        let seen = self
            .config
            .cards
            .iter()
            .filter(|card| state.seen_cards.contains(&card.id))
            .count();
        u32::try_from(seen * 100 / total).unwrap_or(100)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn scaled_delta(&self, delta: i32, modifier: f64) -> i32 {
        if !self.options.scale_penalties || delta >= 0 {
            return delta;
        }
        (f64::from(delta) * modifier).round() as i32
    }

    fn advance_card(&mut self, state: &mut GameState, next_card: Option<&str>) {
        if let Some(next_id) = next_card {
            if let Some(card) = self.config.card(next_id) {
                state.current_card = card.clone();
                return;
            }
            log::warn!("next card '{next_id}' is not in the scenario; dealing at random");
        }

        if let Some(card) = self.draw_random(state) {
            state.current_card = card;
        } else {
            log::warn!("deck is empty; keeping card '{}'", state.current_card.id);
        }
    }

    fn draw_random(&mut self, state: &GameState) -> Option<Card> {
        let cards = &self.config.cards;
        if self.options.card_selection == CardSelection::PreferUnseen
            && let Some(card) = cards
                .iter()
                .filter(|card| !state.seen_cards.contains(&card.id))
                .choose(&mut self.rng)
        {
            return Some(card.clone());
        }
        deal_card(cards, &mut self.rng).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_config;
    use serde_json::json;

    fn engine() -> (GameLogic, GameState) {
        let mut logic = GameLogic::new(sample_config(), 7);
        let mut state = logic.new_game(NewGameOptions::default()).unwrap();
        state.current_card = logic.config().card("card_001").unwrap().clone();
        (logic, state)
    }

    #[test]
    fn explicit_next_card_is_followed() {
        let (mut logic, mut state) = engine();
        let result = logic.process_choice(&mut state, Direction::Left).unwrap();

        assert!(result.applied);
        assert!(!result.game_over);
        assert_eq!(state.resource_value("resource1"), Some(60));
        assert_eq!(state.turn_count, 1);
        assert_eq!(state.current_card.id, "card_002");
        assert!(state.seen_cards.contains("card_001"));
        assert_eq!(state.recent_choices.len(), 1);
        assert_eq!(state.recent_choices[0].choice, Direction::Left);
    }

    #[test]
    fn missing_next_card_draws_from_deck() {
        let (mut logic, mut state) = engine();
        let result = logic.process_choice(&mut state, Direction::Right).unwrap();

        assert!(!result.game_over);
        assert_eq!(state.resource_value("resource2"), Some(45));
        assert_eq!(state.turn_count, 1);
        assert!(logic.config().card(&state.current_card.id).is_some());
    }

    #[test]
    fn dangling_next_card_deals_at_random() {
        let (mut logic, mut state) = engine();
        if let Some(left) = state.current_card.choices.left.as_mut() {
            left.next_card = Some("ghost".to_string());
        }
        let result = logic.process_choice(&mut state, Direction::Left).unwrap();

        assert!(result.applied);
        assert!(!result.game_over);
        assert_eq!(state.turn_count, 1);
        assert_ne!(state.current_card.id, "ghost");
        assert!(
            logic
                .config()
                .cards
                .iter()
                .any(|card| card.id == state.current_card.id)
        );
    }

    #[test]
    fn empty_deck_keeps_the_current_card() {
        let (mut logic, mut state) = engine();
        logic.config.cards.clear();
        let before = state.current_card.clone();

        let result = logic.process_choice(&mut state, Direction::Right).unwrap();
        assert!(result.applied);
        assert_eq!(state.current_card, before);
        assert_eq!(state.turn_count, 1);

        // explicit next cards that no longer resolve fall through to the same rule
        let result = logic.process_choice(&mut state, Direction::Left).unwrap();
        assert!(result.applied);
        assert_eq!(state.current_card, before);
    }

    #[test]
    fn effects_are_clamped_to_bounds() {
        let (mut logic, mut state) = engine();
        state.current_card.choices.left = state
            .current_card
            .choices
            .left
            .take()
            .map(|choice| choice.with_effect("resource2", -60));
        logic.process_choice(&mut state, Direction::Left).unwrap();
        assert_eq!(state.resource_value("resource2"), Some(0));
    }

    #[test]
    fn unknown_effect_resources_are_ignored() {
        let (mut logic, mut state) = engine();
        state.current_card.choices.left = state
            .current_card
            .choices
            .left
            .take()
            .map(|choice| choice.with_effect("mana", 40));
        let result = logic.process_choice(&mut state, Direction::Left).unwrap();
        assert!(result.applied);
        assert_eq!(state.resource_value("resource1"), Some(60));
        assert!(state.resource("mana").is_none());
    }

    #[test]
    fn missing_choice_is_a_no_op() {
        let (mut logic, mut state) = engine();
        state.current_card.choices.right = None;
        let before = state.clone();
        let result = logic.process_choice(&mut state, Direction::Right).unwrap();
        assert!(!result.applied);
        assert_eq!(state, before);
    }

    #[test]
    fn finished_games_reject_choices() {
        let (mut logic, mut state) = engine();
        state.set_resource("resource1", 85);
        let result = logic.process_choice(&mut state, Direction::Left).unwrap();
        assert!(result.game_over);
        assert!(!result.won);
        assert!(state.game_over);
        assert_eq!(state.end_message, result.message);
        assert_eq!(
            logic.process_choice(&mut state, Direction::Left),
            Err(ChoiceError::GameOver)
        );
    }

    #[test]
    fn resource_above_band_is_too_high() {
        let (logic, mut state) = engine();
        state.set_resource("resource1", 95);
        let check = logic.check_game_over(&state);
        assert!(check.game_over);
        assert!(!check.won);
        assert!(check.message.to_lowercase().contains("too high"));
    }

    #[test]
    fn band_edges_end_the_game() {
        let (logic, mut state) = engine();
        state.set_resource("resource1", 10);
        assert!(logic.check_game_over(&state).message.contains("too low"));
        state.set_resource("resource1", 11);
        assert!(!logic.check_game_over(&state).game_over);
    }

    #[test]
    fn first_violated_condition_wins() {
        let config = sample_config()
            .merge_override(&json!({"game_settings": {"win_conditions": [
                {"resource": "resource2", "min": 10, "max": 90},
                {"resource": "resource1", "min": 10, "max": 90}
            ]}}))
            .unwrap();
        let mut logic = GameLogic::new(config, 1);
        let mut state = logic.new_game(NewGameOptions::default()).unwrap();
        state.set_resource("resource1", 0);
        state.set_resource("resource2", 100);
        let check = logic.check_game_over(&state);
        assert_eq!(check.message, "Your Resource2 is too high!");
    }

    #[test]
    fn reaching_target_turns_is_a_win() {
        let config = sample_config()
            .merge_override(&json!({"game_settings": {"target_turns": 2}}))
            .unwrap();
        let mut logic = GameLogic::new(config, 3);
        let mut state = logic.new_game(NewGameOptions::default()).unwrap();
        state.current_card = logic.config().card("card_001").unwrap().clone();

        logic.process_choice(&mut state, Direction::Left).unwrap();
        assert_eq!(logic.calculate_progress(&state), 50);
        let result = logic.process_choice(&mut state, Direction::Left).unwrap();

        assert!(result.game_over);
        assert!(result.won);
        assert_eq!(result.message, "You ruled for 2 years!");
        assert_eq!(logic.calculate_progress(&state), 100);
    }

    #[test]
    fn popularity_uses_formula() {
        let (logic, mut state) = engine();
        state.set_resource("resource1", 60);
        state.set_resource("resource2", 40);
        assert_eq!(logic.calculate_popularity(&state), 50);
        state.set_resource("resource1", 61);
        assert_eq!(logic.calculate_popularity(&state), 51);
    }

    #[test]
    fn popularity_without_formula_is_the_mean() {
        let mut config = sample_config();
        config.game_settings.stats.popularity_formula = None;
        let mut logic = GameLogic::new(config, 5);
        let mut state = logic.new_game(NewGameOptions::default()).unwrap();
        state.set_resource("resource1", 70);
        state.set_resource("resource2", 20);
        assert_eq!(logic.calculate_popularity(&state), 45);
    }

    #[test]
    fn progress_counts_seen_cards_without_target() {
        let (mut logic, mut state) = engine();
        assert_eq!(logic.calculate_progress(&state), 0);
        logic.process_choice(&mut state, Direction::Left).unwrap();
        assert_eq!(logic.calculate_progress(&state), 50);
        logic.process_choice(&mut state, Direction::Right).unwrap();
        assert_eq!(logic.calculate_progress(&state), 100);
    }

    #[test]
    fn penalties_scale_with_difficulty_when_enabled() {
        let mut logic = GameLogic::new(sample_config(), 9).with_options(EngineOptions {
            scale_penalties: true,
            ..EngineOptions::default()
        });
        let mut state = logic
            .new_game(NewGameOptions::default().with_difficulty("hard"))
            .unwrap();
        state.current_card = logic.config().card("card_001").unwrap().clone();
        logic.process_choice(&mut state, Direction::Right).unwrap();
        // -5 * 1.3 = -6.5, rounded away from zero
        assert_eq!(state.resource_value("resource2"), Some(43));
    }

    #[test]
    fn prefer_unseen_avoids_played_cards() {
        let mut logic = GameLogic::new(sample_config(), 11).with_options(EngineOptions {
            card_selection: CardSelection::PreferUnseen,
            ..EngineOptions::default()
        });
        for _ in 0..16 {
            let mut state = logic.new_game(NewGameOptions::default()).unwrap();
            state.current_card = logic.config().card("card_001").unwrap().clone();
            logic.process_choice(&mut state, Direction::Right).unwrap();
            assert_eq!(state.current_card.id, "card_002");
        }
    }

    #[test]
    fn same_seed_replays_identically() {
        let play = |seed| {
            let mut logic = GameLogic::new(sample_config(), seed);
            let mut state = logic.new_game(NewGameOptions::default()).unwrap();
            let mut trail = vec![state.current_card.id.clone()];
            for _ in 0..6 {
                if state.game_over {
                    break;
                }
                logic.process_choice(&mut state, Direction::Right).unwrap();
                trail.push(state.current_card.id.clone());
            }
            trail
        };
        assert_eq!(play(42), play(42));
    }

    #[test]
    fn card_selection_parses_cli_names() {
        assert_eq!("uniform".parse::<CardSelection>(), Ok(CardSelection::Uniform));
        assert_eq!(
            "prefer_unseen".parse::<CardSelection>(),
            Ok(CardSelection::PreferUnseen)
        );
        assert!("sometimes".parse::<CardSelection>().is_err());
        assert_eq!(CardSelection::PreferUnseen.to_string(), "prefer-unseen");
    }
}
