use crate::{
    agent::Agent,
    data::{domain::Price, series::PriceSeries, state::StateEncoder},
    error::TraderResult,
    gym::{
        Action, Reward, SkipReason, StepOutcome, Transition,
        ledger::{OpenOutcome, PositionLedger, PositionLimit},
    },
    report::{format_currency, format_position},
};

/// Whether a simulator pass explores and learns, or acts greedily.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Learn,
    Eval,
}

impl Mode {
    pub fn is_eval(&self) -> bool {
        matches!(self, Mode::Eval)
    }
}

/// Everything that happened at one timestep, handed to the per-step hook.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRecord {
    pub t: usize,
    pub price: Price,
    pub action: Action,
    pub outcome: StepOutcome,
    pub reward: Reward,
    pub done: bool,
    pub open_positions: usize,
}

/// Aggregate of a completed simulator pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PassSummary {
    /// Sum of realized sell rewards. Positions still open are not marked to market.
    pub total_profit: Reward,
    pub steps: usize,
    pub skipped: usize,
    pub open_positions: usize,
}

/// Steps an agent through a price series one timestep at a time.
///
/// Shared by training and evaluation: the loops differ only in [`Mode`] and in
/// the hook they pass to [`EpisodeSimulator::run`]. Each pass owns a fresh
/// [`PositionLedger`], so no positions leak between episodes.
pub struct EpisodeSimulator<'a, E: StateEncoder> {
    series: &'a PriceSeries,
    encoder: &'a E,
    window_size: usize,
    ledger: PositionLedger,
    mode: Mode,
    verbose: bool,
}

impl<'a, E: StateEncoder> EpisodeSimulator<'a, E> {
    pub fn new(
        series: &'a PriceSeries,
        encoder: &'a E,
        window_size: usize,
        limit: PositionLimit,
        mode: Mode,
    ) -> Self {
        Self {
            series,
            encoder,
            window_size,
            ledger: PositionLedger::new(limit),
            mode,
            verbose: false,
        }
    }

    /// Logs every executed trade at debug level.
    pub fn with_verbose(self, verbose: bool) -> Self {
        Self { verbose, ..self }
    }

    /// Runs the pass to completion.
    ///
    /// For every timestep exactly one transition is handed to
    /// [`Agent::remember`], after which `on_step` runs. Errors from the agent,
    /// the encoder or the hook abort the pass.
    pub fn run<A, F>(mut self, agent: &mut A, mut on_step: F) -> TraderResult<PassSummary>
    where
        A: Agent + ?Sized,
        F: FnMut(&mut A, &StepRecord) -> TraderResult<()>,
    {
        let data_length = self.series.data_length();
        let window = self.window_size + 1;
        let mut summary = PassSummary::default();

        if data_length == 0 {
            tracing::warn!(
                stock = %self.series.id(),
                len = self.series.len(),
                "Price series has no actionable timesteps"
            );
            return Ok(summary);
        }

        let mut state = self.encoder.encode(self.series, 0, window)?;

        for t in 0..data_length {
            let next_state = self.encoder.encode(self.series, t + 1, window)?;
            let price = self.series[t];

            agent.observe_positions(self.ledger.len());
            let action = agent.act(&state, self.mode.is_eval())?;

            let outcome = self.apply(action, price)?;
            let reward = outcome.reward();
            summary.total_profit += reward;
            if outcome.is_skipped() {
                summary.skipped += 1;
            }

            let done = t == data_length - 1;
            agent.remember(Transition {
                state,
                action,
                reward,
                next_state: next_state.clone(),
                done,
            });

            let record = StepRecord {
                t,
                price,
                action,
                outcome,
                reward,
                done,
                open_positions: self.ledger.len(),
            };
            on_step(&mut *agent, &record)?;

            summary.steps += 1;
            state = next_state;
        }

        summary.open_positions = self.ledger.len();
        Ok(summary)
    }

    fn apply(&mut self, action: Action, price: Price) -> TraderResult<StepOutcome> {
        let outcome = match action {
            Action::Buy => match self.ledger.open(price) {
                OpenOutcome::Opened => StepOutcome::Bought { price },
                OpenOutcome::Skipped(reason) => StepOutcome::Skipped { action, reason },
            },
            Action::Sell if self.ledger.is_empty() => StepOutcome::Skipped {
                action,
                reason: SkipReason::NoOpenPosition,
            },
            Action::Sell => {
                let entry = self.ledger.close_oldest()?;
                StepOutcome::Sold { entry, exit: price }
            }
            Action::Hold => StepOutcome::Held,
        };

        if self.verbose {
            self.log_trade(&outcome);
        }
        Ok(outcome)
    }

    fn log_trade(&self, outcome: &StepOutcome) {
        match outcome {
            StepOutcome::Bought { price } => {
                tracing::debug!("Buy at: {}", format_currency(*price));
                tracing::debug!("Position size is now: {}", self.ledger.len());
            }
            StepOutcome::Sold { entry, exit } => {
                tracing::debug!(
                    "Sell at: {} | Position: {}",
                    format_currency(*exit),
                    format_position(*exit - *entry)
                );
                tracing::debug!("Position size is now: {}", self.ledger.len());
            }
            StepOutcome::Skipped { action, reason } => {
                tracing::trace!(
                    %action,
                    %reason,
                    capacity = ?self.ledger.capacity(),
                    "Action vetoed by position rules"
                );
            }
            StepOutcome::Held => {}
        }
    }
}
