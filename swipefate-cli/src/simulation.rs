use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use swipefate_game::{
    Direction, EngineOptions, GameConfig, GameHistory, GameLogic, GameSession, HistoryStatistics,
    HistoryStore, NewGameOptions,
};

use crate::policy::PolicyKind;

/// Configuration for one automated game.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub seed: u64,
    pub policy: PolicyKind,
    pub max_turns: u32,
    pub engine: EngineOptions,
    pub player: NewGameOptions,
}

impl SimulationConfig {
    #[must_use]
    pub fn new(policy: PolicyKind, seed: u64) -> Self {
        Self {
            seed,
            policy,
            max_turns: 200,
            engine: EngineOptions::default(),
            player: NewGameOptions::default(),
        }
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }
}

/// Snapshot of a resolved card.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionRecord {
    pub turn: u32,
    pub card_id: String,
    pub direction: Direction,
    pub rationale: Option<String>,
}

/// Result of one automated game.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub policy: String,
    pub seed: u64,
    pub turns: u32,
    /// `false` when the run hit the turn cap or a card with no choices.
    pub finished: bool,
    pub won: bool,
    pub message: String,
    pub popularity: i32,
    pub progress: u32,
    pub resources: BTreeMap<String, i32>,
    pub new_achievements: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub decisions: Vec<DecisionRecord>,
}

/// Per-policy aggregate over many runs.
#[derive(Debug, Clone, Serialize)]
pub struct PolicySummary {
    pub policy: String,
    pub games: usize,
    pub finished: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub average_turns: f64,
    pub average_popularity: f64,
}

/// Everything a report renders.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub scenario: String,
    pub runs: Vec<RunRecord>,
    pub summaries: Vec<PolicySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryStatistics>,
}

/// Play one game to the end (or the turn cap). Finished games are recorded
/// into `history` when one is given.
///
/// # Errors
///
/// Returns an error if the scenario cannot deal a card.
pub fn run_game<S: HistoryStore>(
    config: &GameConfig,
    sim: &SimulationConfig,
    mut history: Option<&mut GameHistory<S>>,
    keep_decisions: bool,
) -> Result<RunRecord> {
    let logic = GameLogic::new(config.clone(), sim.seed).with_options(sim.engine);
    let mut session = GameSession::from_logic(logic, sim.player.clone())
        .with_context(|| format!("failed to deal '{}'", config.game_info.title))?;
    let mut policy = sim.policy.create_policy(sim.seed);
    let mut decisions = Vec::new();
    let mut new_achievements = Vec::new();
    let mut stalled = None;

    while !session.is_over() && session.state().turn_count < sim.max_turns {
        let decision = policy.pick(session.state());
        let card_id = session.state().current_card.id.clone();
        let result = match history.as_deref_mut() {
            Some(history) => session.process_choice_recorded(decision.direction, history)?,
            None => session.process_choice(decision.direction)?,
        };
        if !result.applied {
            stalled = Some(format!("card '{card_id}' has no playable choice"));
            break;
        }

        log::debug!(
            "[{} seed {}] turn {}: {card_id} -> {}",
            policy.name(),
            sim.seed,
            session.state().turn_count,
            decision.direction
        );
        if keep_decisions {
            decisions.push(DecisionRecord {
                turn: session.state().turn_count,
                card_id,
                direction: decision.direction,
                rationale: decision.rationale,
            });
        }
        if let Some(summary) = result.summary {
            new_achievements.extend(summary.new_achievements.into_iter().map(|a| a.name));
        }
    }

    let state = session.state();
    let message = if state.game_over {
        state.end_message.clone()
    } else {
        stalled.unwrap_or_else(|| {
            format!("stopped after {} {}", state.turn_count, state.settings.turn_unit)
        })
    };
    Ok(RunRecord {
        policy: sim.policy.key().to_string(),
        seed: sim.seed,
        turns: state.turn_count,
        finished: state.game_over,
        won: state.won,
        message,
        popularity: session.popularity(),
        progress: session.progress(),
        resources: state.resource_values(),
        new_achievements,
        decisions,
    })
}

/// Aggregate runs per policy, in first-seen order.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(runs: &[RunRecord]) -> Vec<PolicySummary> {
    let mut order: Vec<&str> = Vec::new();
    for run in runs {
        if !order.contains(&run.policy.as_str()) {
            order.push(&run.policy);
        }
    }

    order
        .into_iter()
        .map(|policy| {
            let group: Vec<&RunRecord> = runs.iter().filter(|r| r.policy == policy).collect();
            let games = group.len();
            let wins = group.iter().filter(|r| r.won).count();
            let denom = games.max(1) as f64;
            PolicySummary {
                policy: policy.to_string(),
                games,
                finished: group.iter().filter(|r| r.finished).count(),
                wins,
                win_rate: wins as f64 * 100.0 / denom,
                average_turns: group.iter().map(|r| f64::from(r.turns)).sum::<f64>() / denom,
                average_popularity: group.iter().map(|r| f64::from(r.popularity)).sum::<f64>()
                    / denom,
            }
        })
        .collect()
}
