pub mod dqn;
pub mod memory;
pub mod q_network;

use std::{fmt::Debug, sync::Arc};

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
    data::state::State,
    error::TraderResult,
    gym::{Action, Transition},
};

/// Represents the unique identifier of an agent, used in logs and notifications.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Display, Default, Serialize, Deserialize)]
pub enum AgentIdentifier {
    /// Agent identified by its model name, e.g. `model_debug`.
    #[strum(to_string = "{0}")]
    Named(Arc<String>),

    #[default]
    #[strum(to_string = "unnamed")]
    Unnamed,
}

impl AgentIdentifier {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(Arc::new(name.into()))
    }
}

/// Learning agent driven by the training and evaluation loops.
///
/// The loops only decide *when* to learn and checkpoint; how the agent
/// explores, stores experience, learns and persists itself is up to the
/// implementation.
pub trait Agent {
    /// Selects an action for `state`.
    ///
    /// With `is_eval` set the choice must be deterministic (greedy); otherwise
    /// the agent may explore.
    fn act(&mut self, state: &State, is_eval: bool) -> TraderResult<Action>;

    /// Appends one transition to the replay memory.
    fn remember(&mut self, transition: Transition);

    /// Number of transitions currently held in replay memory.
    fn memory_len(&self) -> usize;

    /// Samples `batch_size` transitions, performs one learning step and returns its loss.
    fn train_experience_replay(&mut self, batch_size: usize) -> TraderResult<f64>;

    /// Persists the agent's parameters for `episode`.
    fn save(&mut self, episode: usize) -> TraderResult<()>;

    /// Read-only view of how many positions are currently open.
    ///
    /// Called before every [`Agent::act`]; agents that mask actions can use it,
    /// everyone else can ignore it.
    fn observe_positions(&mut self, _open_positions: usize) {}

    fn identifier(&self) -> AgentIdentifier {
        AgentIdentifier::Unnamed
    }
}

impl Agent for Box<dyn Agent> {
    fn act(&mut self, state: &State, is_eval: bool) -> TraderResult<Action> {
        (**self).act(state, is_eval)
    }

    fn remember(&mut self, transition: Transition) {
        (**self).remember(transition)
    }

    fn memory_len(&self) -> usize {
        (**self).memory_len()
    }

    fn train_experience_replay(&mut self, batch_size: usize) -> TraderResult<f64> {
        (**self).train_experience_replay(batch_size)
    }

    fn save(&mut self, episode: usize) -> TraderResult<()> {
        (**self).save(episode)
    }

    fn observe_positions(&mut self, open_positions: usize) {
        (**self).observe_positions(open_positions)
    }

    fn identifier(&self) -> AgentIdentifier {
        (**self).identifier()
    }
}
