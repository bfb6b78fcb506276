use std::fmt;
use std::str::FromStr;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use swipefate_game::{CardChoice, Direction, GameState};

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub direction: Direction,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub const fn new(direction: Direction, rationale: Option<String>) -> Self {
        Self {
            direction,
            rationale,
        }
    }
}

/// Policy interface for automated play.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Pick a side of the current card.
    fn pick(&mut self, state: &GameState) -> PolicyDecision;
}

/// Built-in strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    Random,
    Cautious,
    Greedy,
    Balanced,
}

impl PolicyKind {
    pub const ALL: [Self; 4] = [Self::Random, Self::Cautious, Self::Greedy, Self::Balanced];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Cautious => "cautious",
            Self::Greedy => "greedy",
            Self::Balanced => "balanced",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Random => "Swipe left or right with equal odds",
            Self::Cautious => "Keep every resource as far from its band edges as possible",
            Self::Greedy => "Take the choice with the largest total gain",
            Self::Balanced => "Pull every resource toward the middle of its range",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy> {
        match self {
            Self::Random => Box::new(RandomPolicy::new(seed)),
            Self::Cautious => Box::new(CautiousPolicy),
            Self::Greedy => Box::new(GreedyPolicy),
            Self::Balanced => Box::new(BalancedPolicy),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.key() == wanted)
            .ok_or_else(|| format!("unknown policy '{s}'"))
    }
}

struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed ^ 0x5157_1FE5),
        }
    }
}

struct CautiousPolicy;
struct GreedyPolicy;
struct BalancedPolicy;

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn pick(&mut self, state: &GameState) -> PolicyDecision {
        let available: Vec<Direction> = state
            .current_card
            .choices
            .iter()
            .map(|(direction, _)| direction)
            .collect();
        let direction = match available.as_slice() {
            [only] => *only,
            _ if self.rng.gen_bool(0.5) => Direction::Left,
            _ => Direction::Right,
        };
        PolicyDecision::new(direction, None)
    }
}

impl PlayerPolicy for CautiousPolicy {
    fn name(&self) -> &'static str {
        "cautious"
    }

    fn pick(&mut self, state: &GameState) -> PolicyDecision {
        best_by(state, |choice| band_margin(state, choice), "margin")
    }
}

impl PlayerPolicy for GreedyPolicy {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn pick(&mut self, state: &GameState) -> PolicyDecision {
        best_by(state, |choice| total_gain(state, choice), "gain")
    }
}

impl PlayerPolicy for BalancedPolicy {
    fn name(&self) -> &'static str {
        "balanced"
    }

    fn pick(&mut self, state: &GameState) -> PolicyDecision {
        best_by(state, |choice| -center_distance(state, choice), "balance")
    }
}

/// Highest-scoring available side; ties and missing sides favour left.
fn best_by(
    state: &GameState,
    score: impl Fn(&CardChoice) -> i64,
    label: &str,
) -> PolicyDecision {
    let best = state
        .current_card
        .choices
        .iter()
        .map(|(direction, choice)| (direction, score(choice)))
        .fold(None, |best: Option<(Direction, i64)>, candidate| match best {
            Some(current) if current.1 >= candidate.1 => Some(current),
            _ => Some(candidate),
        });
    match best {
        Some((direction, value)) => {
            PolicyDecision::new(direction, Some(format!("{label} {value}")))
        }
        None => PolicyDecision::new(Direction::Left, Some("no choices".to_string())),
    }
}

/// Resource values after applying `choice`, clamped to each resource's bounds.
fn projected(state: &GameState, choice: &CardChoice) -> Vec<(String, i32, i32, i32)> {
    state
        .resources
        .iter()
        .map(|(id, resource)| {
            let delta = choice.effects.get(id).copied().unwrap_or(0);
            let value = resource
                .current_value()
                .saturating_add(delta)
                .clamp(resource.min_value(), resource.max_value());
            (id.clone(), value, resource.min_value(), resource.max_value())
        })
        .collect()
}

fn band_margin(state: &GameState, choice: &CardChoice) -> i64 {
    let values = projected(state, choice);
    state
        .settings
        .win_conditions
        .iter()
        .filter_map(|condition| {
            values
                .iter()
                .find(|(id, ..)| *id == condition.resource)
                .map(|(_, value, ..)| {
                    i64::from((*value - condition.min).min(condition.max - *value))
                })
        })
        .min()
        .unwrap_or(0)
}

fn total_gain(state: &GameState, choice: &CardChoice) -> i64 {
    choice
        .effects
        .iter()
        .filter(|(id, _)| state.resources.contains_key(*id))
        .map(|(_, delta)| i64::from(*delta))
        .sum()
}

fn center_distance(state: &GameState, choice: &CardChoice) -> i64 {
    projected(state, choice)
        .iter()
        .map(|(_, value, min, max)| {
            let center = (i64::from(*min) + i64::from(*max)) / 2;
            (i64::from(*value) - center).abs()
        })
        .sum()
}
