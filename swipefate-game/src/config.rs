//! Scenario configuration: typed schema, loading, normalization and validation.
//!
//! A scenario is validated once at the boundary. The engine afterwards
//! assumes every card id is unique and every survival band is well formed.
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::card::{Card, Direction};
use crate::constants::{
    DEFAULT_DIFFICULTY_MODIFIER, DEFAULT_RESOURCE_MAX, DEFAULT_RESOURCE_MIN, DEFAULT_TURN_UNIT,
};
use crate::formula::{Formula, FormulaError};
use crate::resource::Resource;

/// Errors raised while loading or validating a scenario.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("scenario is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scenario defines no cards")]
    NoCards,
    #[error("card id '{0}' is defined more than once")]
    DuplicateCard(String),
    #[error("card '{card}' {direction} choice points at unknown card '{target}'")]
    DanglingNextCard {
        card: String,
        direction: Direction,
        target: String,
    },
    #[error("win condition references unknown resource '{0}'")]
    UnknownConditionResource(String),
    #[error("win condition for '{resource}' has min {min} >= max {max}")]
    InvertedBand { resource: String, min: i32, max: i32 },
    #[error("resource '{resource}' has min {min} > max {max}")]
    InvertedBounds { resource: String, min: i32, max: i32 },
    #[error("popularity formula is invalid: {0}")]
    Formula(#[from] FormulaError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: String,
}

/// Visual filters the UI may apply to card art.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Filters {
    #[serde(default)]
    pub default: Vec<String>,
    #[serde(default)]
    pub available: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    #[serde(default)]
    pub card_back: String,
    #[serde(default)]
    pub color_scheme: BTreeMap<String, String>,
    #[serde(default)]
    pub resource_icons: BTreeMap<String, String>,
    #[serde(default)]
    pub filters: Filters,
}

/// Survival band: staying strictly inside `(min, max)` keeps the game going.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinCondition {
    pub resource: String,
    pub min: i32,
    pub max: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatsSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity_formula: Option<String>,
}

/// Optional display name and bounds for a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "ResourceSpec::default_min")]
    pub min: i32,
    #[serde(default = "ResourceSpec::default_max")]
    pub max: i32,
}

impl ResourceSpec {
    const fn default_min() -> i32 {
        DEFAULT_RESOURCE_MIN
    }

    const fn default_max() -> i32 {
        DEFAULT_RESOURCE_MAX
    }
}

impl Default for ResourceSpec {
    fn default() -> Self {
        Self {
            name: None,
            min: Self::default_min(),
            max: Self::default_max(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSettings {
    pub initial_resources: BTreeMap<String, i32>,
    #[serde(default)]
    pub win_conditions: Vec<WinCondition>,
    #[serde(default)]
    pub difficulty_modifiers: BTreeMap<String, f64>,
    #[serde(default = "GameSettings::default_turn_unit")]
    pub turn_unit: String,
    #[serde(default)]
    pub stats: StatsSettings,
    /// Per-resource names and bounds; unlisted resources use `0..=100`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, ResourceSpec>,
    /// Episode length. Reaching it inside every band wins the game.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_turns: Option<u32>,
}

impl GameSettings {
    fn default_turn_unit() -> String {
        DEFAULT_TURN_UNIT.to_string()
    }

    /// Multiplier configured for a difficulty name, 1.0 when unlisted.
    #[must_use]
    pub fn difficulty_modifier(&self, difficulty: &str) -> f64 {
        self.difficulty_modifiers
            .get(difficulty)
            .copied()
            .unwrap_or(DEFAULT_DIFFICULTY_MODIFIER)
    }

    #[must_use]
    pub fn resource_spec(&self, id: &str) -> ResourceSpec {
        self.resources.get(id).cloned().unwrap_or_default()
    }

    /// Build a live resource for `id` holding `value`, using the configured
    /// name, bounds and theme icon.
    #[must_use]
    pub fn build_resource(&self, id: &str, value: i32, theme: &Theme) -> Resource {
        let spec = self.resource_spec(id);
        let name = spec.name.unwrap_or_else(|| display_name(id));
        let resource = Resource::bounded(id, name, value, spec.min, spec.max);
        match theme.resource_icons.get(id) {
            Some(icon) => resource.with_icon(icon.clone()),
            None => resource,
        }
    }

    /// Build the starting resources from `initial_resources`.
    #[must_use]
    pub fn build_resources(&self, theme: &Theme) -> BTreeMap<String, Resource> {
        self.initial_resources
            .iter()
            .map(|(id, value)| (id.clone(), self.build_resource(id, *value, theme)))
            .collect()
    }
}

/// The validated scenario bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub game_info: GameInfo,
    pub theme: Theme,
    pub game_settings: GameSettings,
    pub cards: Vec<Card>,
}

impl GameConfig {
    /// Parse and validate a scenario from JSON text. Explicit `+` signs on
    /// numbers are accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the scenario fails
    /// validation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let normalized = normalize_signed_numbers(json);
        let config: Self = serde_json::from_str(&normalized)?;
        config.validate()?;
        Ok(config)
    }

    /// Build and validate a scenario from an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not match the schema or fails
    /// validation.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a scenario file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its content is not a
    /// valid scenario.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Check the scenario invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant: an empty deck, duplicate card
    /// ids, dangling `next_card` references, bands on unknown resources,
    /// inverted bands or bounds, or an unparsable popularity formula.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cards.is_empty() {
            return Err(ConfigError::NoCards);
        }

        let mut ids = HashSet::with_capacity(self.cards.len());
        for card in &self.cards {
            if !ids.insert(card.id.as_str()) {
                return Err(ConfigError::DuplicateCard(card.id.clone()));
            }
        }

        for card in &self.cards {
            for (direction, choice) in card.choices.iter() {
                if let Some(target) = &choice.next_card
                    && !ids.contains(target.as_str())
                {
                    return Err(ConfigError::DanglingNextCard {
                        card: card.id.clone(),
                        direction,
                        target: target.clone(),
                    });
                }
            }
        }

        let settings = &self.game_settings;
        for condition in &settings.win_conditions {
            if !settings.initial_resources.contains_key(&condition.resource) {
                return Err(ConfigError::UnknownConditionResource(
                    condition.resource.clone(),
                ));
            }
            if condition.min >= condition.max {
                return Err(ConfigError::InvertedBand {
                    resource: condition.resource.clone(),
                    min: condition.min,
                    max: condition.max,
                });
            }
        }

        for (id, spec) in &settings.resources {
            if spec.min > spec.max {
                return Err(ConfigError::InvertedBounds {
                    resource: id.clone(),
                    min: spec.min,
                    max: spec.max,
                });
            }
        }

        self.popularity_formula()?;
        Ok(())
    }

    #[must_use]
    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }

    /// Parsed popularity formula, if the scenario configures one.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured formula cannot be parsed.
    pub fn popularity_formula(&self) -> Result<Option<Formula>, FormulaError> {
        self.game_settings
            .stats
            .popularity_formula
            .as_deref()
            .map(Formula::parse)
            .transpose()
    }

    /// Deep-merge a partial JSON override into this scenario and re-validate.
    /// Objects merge key by key; any other value replaces the base value.
    ///
    /// # Errors
    ///
    /// Returns an error if the merged document no longer matches the schema
    /// or fails validation.
    pub fn merge_override(&self, patch: &Value) -> Result<Self, ConfigError> {
        let mut base = serde_json::to_value(self)?;
        merge_json(&mut base, patch);
        Self::from_value(base)
    }
}

/// Recursively merge `patch` into `base`.
pub fn merge_json(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_json(existing, patch_value),
                    None => {
                        base_map.insert(key.clone(), patch_value.clone());
                    }
                }
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

static SIGNED_NUMBER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#""(?:[^"\\]|\\.)*"|([:\[,]\s*)\+(\d)"#).ok());

/// Strip explicit `+` signs from numbers (`"gold": +10`) so hand-written
/// scenarios parse as JSON. String literals are left untouched.
#[must_use]
pub fn normalize_signed_numbers(raw: &str) -> Cow<'_, str> {
    let Some(pattern) = SIGNED_NUMBER.as_ref() else {
        return Cow::Borrowed(raw);
    };
    pattern.replace_all(raw, |caps: &Captures<'_>| match (caps.get(1), caps.get(2)) {
        (Some(prefix), Some(digit)) => format!("{}{}", prefix.as_str(), digit.as_str()),
        _ => caps[0].to_string(),
    })
}

fn display_name(id: &str) -> String {
    id.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Loads scenarios from `<root>/<name>.json`, or from `name` itself when it
/// already points at a JSON file.
#[derive(Debug, Clone)]
pub struct FsScenarioLoader {
    root: PathBuf,
}

impl FsScenarioLoader {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn resolve(&self, name: &str) -> PathBuf {
        let direct = Path::new(name);
        if direct.extension().is_some_and(|ext| ext == "json") {
            if direct.is_absolute() {
                return direct.to_path_buf();
            }
            return self.root.join(direct);
        }
        self.root.join(format!("{name}.json"))
    }
}

impl crate::ScenarioLoader for FsScenarioLoader {
    type Error = ConfigError;

    fn load_scenario(&self, name: &str) -> Result<GameConfig, Self::Error> {
        let path = self.resolve(name);
        log::debug!("loading scenario '{name}' from {}", path.display());
        GameConfig::from_path(&path)
    }
}
