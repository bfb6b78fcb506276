//! Decision cards and their left/right choices.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which way the player swiped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Self; 2] = [Self::Left, Self::Right];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names neither `left` nor `right`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown choice direction '{0}'")]
pub struct UnknownDirection(pub String);

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            _ => Err(UnknownDirection(s.to_string())),
        }
    }
}

/// One branch of a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardChoice {
    pub text: String,
    /// Signed deltas keyed by resource id.
    #[serde(default)]
    pub effects: BTreeMap<String, i32>,
    /// Card to show next; `None` deals a random card.
    #[serde(default)]
    pub next_card: Option<String>,
}

impl CardChoice {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            effects: BTreeMap::new(),
            next_card: None,
        }
    }

    #[must_use]
    pub fn with_effect(mut self, resource_id: impl Into<String>, delta: i32) -> Self {
        self.effects.insert(resource_id.into(), delta);
        self
    }

    #[must_use]
    pub fn with_next_card(mut self, card_id: impl Into<String>) -> Self {
        self.next_card = Some(card_id.into());
        self
    }
}

/// The left/right choice map. Either side may be missing in hand-written
/// scenarios; swiping toward a missing side is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CardChoices {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<CardChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<CardChoice>,
}

impl CardChoices {
    #[must_use]
    pub fn new(left: CardChoice, right: CardChoice) -> Self {
        Self {
            left: Some(left),
            right: Some(right),
        }
    }

    #[must_use]
    pub const fn get(&self, direction: Direction) -> Option<&CardChoice> {
        match direction {
            Direction::Left => self.left.as_ref(),
            Direction::Right => self.right.as_ref(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Direction, &CardChoice)> {
        Direction::ALL
            .into_iter()
            .filter_map(|direction| self.get(direction).map(|choice| (direction, choice)))
    }
}

/// A single decision screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub title: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub choices: CardChoices,
}

impl Card {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
        choices: CardChoices,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            text: text.into(),
            image: None,
            choices,
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    #[must_use]
    pub const fn choice(&self, direction: Direction) -> Option<&CardChoice> {
        self.choices.get(direction)
    }

    #[must_use]
    pub const fn left_choice(&self) -> Option<&CardChoice> {
        self.choices.left.as_ref()
    }

    #[must_use]
    pub const fn right_choice(&self) -> Option<&CardChoice> {
        self.choices.right.as_ref()
    }

    #[must_use]
    pub fn next_card_id(&self, direction: Direction) -> Option<&str> {
        self.choice(direction)?.next_card.as_deref()
    }

    /// String-keyed lookup for UI layers that still pass raw direction names.
    /// Unknown directions resolve to `None`.
    #[must_use]
    pub fn next_card_id_for(&self, direction: &str) -> Option<&str> {
        direction
            .parse::<Direction>()
            .ok()
            .and_then(|direction| self.next_card_id(direction))
    }
}
