//! Bounded numeric stats tracked through a game.
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_RESOURCE_MAX, DEFAULT_RESOURCE_MIN};

/// A single bounded stat such as gold or population.
///
/// `min_value <= current_value <= max_value` holds after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawResource")]
pub struct Resource {
    pub id: String,
    pub name: String,
    current_value: i32,
    min_value: i32,
    max_value: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_path: Option<String>,
}

/// Wire shape of a [`Resource`]; converted through [`Resource::bounded`] so
/// stored values are clamped on the way in.
#[derive(Deserialize)]
struct RawResource {
    id: String,
    name: String,
    current_value: i32,
    #[serde(default = "default_min")]
    min_value: i32,
    #[serde(default = "default_max")]
    max_value: i32,
    #[serde(default)]
    icon_path: Option<String>,
}

const fn default_min() -> i32 {
    DEFAULT_RESOURCE_MIN
}

const fn default_max() -> i32 {
    DEFAULT_RESOURCE_MAX
}

impl From<RawResource> for Resource {
    fn from(raw: RawResource) -> Self {
        let resource = Self::bounded(
            raw.id,
            raw.name,
            raw.current_value,
            raw.min_value,
            raw.max_value,
        );
        match raw.icon_path {
            Some(icon) => resource.with_icon(icon),
            None => resource,
        }
    }
}

impl Resource {
    /// Create a resource with the default `0..=100` bounds.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, current_value: i32) -> Self {
        Self::bounded(
            id,
            name,
            current_value,
            DEFAULT_RESOURCE_MIN,
            DEFAULT_RESOURCE_MAX,
        )
    }

    /// Create a resource with explicit bounds; the value is clamped into them.
    #[must_use]
    pub fn bounded(
        id: impl Into<String>,
        name: impl Into<String>,
        current_value: i32,
        min_value: i32,
        max_value: i32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            current_value,
            min_value,
            max_value,
            icon_path: None,
        }
        .with_bounds(min_value, max_value)
    }

    /// Replace the bounds, re-clamping the current value.
    ///
    /// Inverted bounds are swapped rather than rejected.
    #[must_use]
    pub fn with_bounds(mut self, min_value: i32, max_value: i32) -> Self {
        let (low, high) = if min_value <= max_value {
            (min_value, max_value)
        } else {
            (max_value, min_value)
        };
        self.min_value = low;
        self.max_value = high;
        self.current_value = self.current_value.clamp(low, high);
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon_path: impl Into<String>) -> Self {
        self.icon_path = Some(icon_path.into());
        self
    }

    #[must_use]
    pub const fn current_value(&self) -> i32 {
        self.current_value
    }

    #[must_use]
    pub const fn min_value(&self) -> i32 {
        self.min_value
    }

    #[must_use]
    pub const fn max_value(&self) -> i32 {
        self.max_value
    }

    /// Apply a signed delta, clamping into bounds. Returns the new value.
    pub fn adjust(&mut self, delta: i32) -> i32 {
        self.set_value(self.current_value.saturating_add(delta))
    }

    /// Set an absolute value, clamping into bounds. Returns the new value.
    pub fn set_value(&mut self, value: i32) -> i32 {
        self.current_value = value.clamp(self.min_value, self.max_value);
        self.current_value
    }

    /// Position of the current value inside the bounds, in `[0, 100]`.
    ///
    /// A fixed resource (`min == max`) reports 100.
    #[must_use]
    pub fn get_percentage(&self) -> f64 {
        if self.max_value == self.min_value {
            return 100.0;
        }
        let span = f64::from(self.max_value) - f64::from(self.min_value);
        let offset = f64::from(self.current_value) - f64::from(self.min_value);
        (offset / span * 100.0).clamp(0.0, 100.0)
    }
}
