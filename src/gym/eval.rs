use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::{
    agent::Agent,
    config::TrainConfig,
    data::{domain::Price, series::PriceSeries, state::StateEncoder},
    error::TraderResult,
    gym::{
        Action, Reward, StepOutcome,
        simulator::{EpisodeSimulator, Mode, StepRecord},
    },
};

/// Label shown for a timestep in the evaluation trade history.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum TradeLabel {
    Buy,
    Sell,
    Hold,
}

/// How a BUY vetoed by the position limit shows up in the trade history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum EvalHistoryPolicy {
    /// Label every BUY action as `BUY`, even when the open was vetoed.
    #[default]
    ActionIntent,
    /// Label only trades that changed the ledger; vetoed BUYs read as `HOLD`.
    AppliedOnly,
}

impl EvalHistoryPolicy {
    pub fn label(&self, action: Action, outcome: &StepOutcome) -> TradeLabel {
        match (self, outcome) {
            (_, StepOutcome::Bought { .. }) => TradeLabel::Buy,
            (_, StepOutcome::Sold { .. }) => TradeLabel::Sell,
            (EvalHistoryPolicy::ActionIntent, StepOutcome::Skipped { .. })
                if action == Action::Buy =>
            {
                TradeLabel::Buy
            }
            _ => TradeLabel::Hold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub price: Price,
    pub label: TradeLabel,
}

/// Outcome of a greedy pass over held-out data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub total_profit: Reward,
    /// One entry per timestep, in order.
    pub history: Vec<TradeRecord>,
}

impl EvaluationResult {
    pub fn count(&self, label: TradeLabel) -> usize {
        self.history.iter().filter(|r| r.label == label).count()
    }
}

/// Runs the agent greedily over `series` without learning.
///
/// Transitions are still appended to the agent's replay memory, so the buffer
/// stays continuous across training and evaluation.
#[tracing::instrument(skip_all, fields(stock = %series.id(), agent = %agent.identifier()))]
pub fn evaluate<A, E>(
    agent: &mut A,
    encoder: &E,
    series: &PriceSeries,
    cfg: &TrainConfig,
) -> TraderResult<EvaluationResult>
where
    A: Agent + ?Sized,
    E: StateEncoder,
{
    tracing::info!("* * * * * *  Starting Evaluation  * * * * * *");

    let policy = cfg.eval_history_policy;
    let mut history = Vec::with_capacity(series.data_length());

    let summary = EpisodeSimulator::new(
        series,
        encoder,
        cfg.window_size,
        cfg.position_limit(),
        Mode::Eval,
    )
    .with_verbose(cfg.verbose)
    .run(agent, |_, step: &StepRecord| {
        history.push(TradeRecord {
            price: step.price,
            label: policy.label(step.action, &step.outcome),
        });
        if step.done {
            tracing::info!("* * * * * *  Evaluation Complete  * * * * * *");
        }
        Ok(())
    })?;

    Ok(EvaluationResult {
        total_profit: summary.total_profit,
        history,
    })
}
