use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::{
    data::{domain::Price, state::State},
    error::{AgentError, TraderError},
    impl_abs_primitive, impl_arithmetic_primitive, impl_from_primitive,
};

pub mod eval;
pub mod ledger;
pub mod run;
pub mod simulator;
pub mod train;

/// Represents a reward value in the quote currency.
///
/// Rewards are realized profit/loss of closed positions; no shaping,
/// discounting or normalization is applied before they reach the agent.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Reward(pub f64);
impl_from_primitive!(Reward, f64);
impl_arithmetic_primitive!(Reward, f64);
impl_abs_primitive!(Reward, f64);

impl From<Price> for Reward {
    fn from(value: Price) -> Self {
        Self(value.0)
    }
}

impl fmt::Display for Reward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// ================================================================================================
// Action
// ================================================================================================

/// The closed set of decisions an agent can take at a timestep.
///
/// The discriminants are the agent's output indices and must not change.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    EnumCount,
    Display,
    IntoStaticStr,
)]
#[strum(serialize_all = "UPPERCASE")]
#[repr(u8)]
pub enum Action {
    #[default]
    Hold = 0,
    Buy = 1,
    Sell = 2,
}

impl Action {
    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for Action {
    type Error = TraderError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Action::Hold),
            1 => Ok(Action::Buy),
            2 => Ok(Action::Sell),
            other => Err(AgentError::InvalidAction(other).into()),
        }
    }
}

impl TryFrom<usize> for Action {
    type Error = TraderError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| TraderError::from(AgentError::InvalidAction(u8::MAX)))
            .and_then(<Action as TryFrom<u8>>::try_from)
    }
}

// ================================================================================================
// Step Outcome
// ================================================================================================

/// Why the ledger vetoed an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// BUY while the ledger already holds `max_position` positions.
    AtCapacity,
    /// SELL while no position is open.
    NoOpenPosition,
}

/// The effect an action had on the ledger at one timestep.
///
/// `Held` means the agent chose to do nothing. `Skipped` means it asked for
/// a trade the position rules did not allow; both earn a zero reward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StepOutcome {
    Bought { price: Price },
    Sold { entry: Price, exit: Price },
    Held,
    Skipped { action: Action, reason: SkipReason },
}

impl StepOutcome {
    /// Realized reward of this step: `exit - entry` for a sell, zero otherwise.
    pub fn reward(&self) -> Reward {
        match self {
            StepOutcome::Sold { entry, exit } => (*exit - *entry).into(),
            _ => Reward(0.0),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, StepOutcome::Skipped { .. })
    }
}

// ================================================================================================
// Transition
// ================================================================================================

/// One `(state, action, reward, next_state, done)` experience tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: State,
    pub action: Action,
    pub reward: Reward,
    pub next_state: State,
    pub done: bool,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_action_codes() {
        assert_eq!(Action::try_from(0u8).expect("hold"), Action::Hold);
        assert_eq!(Action::try_from(1u8).expect("buy"), Action::Buy);
        assert_eq!(Action::try_from(2u8).expect("sell"), Action::Sell);
        assert!(matches!(
            Action::try_from(3u8),
            Err(TraderError::Agent(AgentError::InvalidAction(3)))
        ));
        assert_eq!(Action::Sell.index(), 2);
    }

    #[test]
    fn test_action_labels() {
        assert_eq!(Action::Buy.to_string(), "BUY");
        assert_eq!(Action::from_str("SELL").expect("valid label"), Action::Sell);
    }

    #[test]
    fn test_outcome_reward_is_signed() {
        let loss = StepOutcome::Sold {
            entry: Price(12.0),
            exit: Price(10.0),
        };
        assert_eq!(loss.reward(), Reward(-2.0));
        assert_eq!(StepOutcome::Held.reward(), Reward(0.0));
        assert_eq!(
            StepOutcome::Skipped {
                action: Action::Sell,
                reason: SkipReason::NoOpenPosition
            }
            .reward(),
            Reward(0.0)
        );
    }
}
