use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use serde::{Deserialize, Serialize};

use crate::{
    agent::Agent,
    config::TrainConfig,
    data::{
        domain::{Price, StockId},
        series::PriceSeries,
        state::StateEncoder,
    },
    error::{TraderError, TraderResult},
    gym::{
        Reward,
        eval::{EvaluationResult, evaluate},
        train::{EpisodeResult, train_episode},
    },
    notify::{Notification, Notifier},
    report::show_train_result,
};

/// Lifecycle of a multi-episode run.
///
/// ```md
/// Current Phase      | Event                     | Next Phase
/// -------------------|---------------------------|----------------------------
/// `Idle`             | run()                     | `Training(1)`
/// `Training(e)`      | episode finished          | `Evaluation(e)`
/// `Evaluation(e)`    | validation finished       | `Reporting(e)`
/// `Reporting(e)`     | e < episode_count         | `Training(e + 1)`
/// `Reporting(e)`     | e == episode_count        | `Completed`
/// any                | error                     | `Failed`
/// between episodes   | interrupt flag set        | `Interrupted`
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Idle,
    Training(usize),
    Evaluation(usize),
    Reporting(usize),
    Completed,
    Failed,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeReport {
    pub train: EpisodeResult,
    pub validation_profit: Reward,
    pub line: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub episodes: Vec<EpisodeReport>,
    /// Trade history of the final validation pass.
    pub last_evaluation: Option<EvaluationResult>,
}

/// Drives `episode_count` rounds of training, validation and reporting.
///
/// Exactly one notification is sent per run: success after the last episode,
/// or failure carrying the error that aborted the remaining episodes. An
/// interrupt is only honoured between episodes and sends no notification.
pub struct Runner<E, N> {
    config: TrainConfig,
    encoder: E,
    notifier: N,
    interrupt: Option<Arc<AtomicBool>>,
    phase: RunPhase,
}

impl<E: StateEncoder, N: Notifier> Runner<E, N> {
    pub fn new(config: TrainConfig, encoder: E, notifier: N) -> Self {
        Self {
            config,
            encoder,
            notifier,
            interrupt: None,
            phase: RunPhase::Idle,
        }
    }

    pub fn with_interrupt(self, flag: Arc<AtomicBool>) -> Self {
        Self {
            interrupt: Some(flag),
            ..self
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    #[tracing::instrument(
        skip_all,
        fields(model = %self.config.model_name, train = %train.id(), val = %val.id())
    )]
    pub fn run<A: Agent + ?Sized>(
        &mut self,
        agent: &mut A,
        train: &PriceSeries,
        val: &PriceSeries,
    ) -> TraderResult<RunSummary> {
        tracing::info!(
            episodes = self.config.episode_count,
            max_position = ?self.config.max_position,
            "Training model {} with {} episode(s) on {} (validation: {})",
            self.config.model_name,
            self.config.episode_count,
            train.id(),
            val.id()
        );

        let notification = self.notification(vec![train.id().clone(), val.id().clone()]);

        match self.run_episodes(agent, train, val) {
            Ok(summary) => {
                self.phase = RunPhase::Completed;
                self.notifier.notify_success(&notification)?;
                Ok(summary)
            }
            Err(e @ TraderError::Interrupted(_)) => {
                self.phase = RunPhase::Interrupted;
                tracing::warn!(error = %e, "Aborted!");
                Err(e)
            }
            Err(e) => Err(self.fail(&notification, e)),
        }
    }

    /// Prepares the agent and price data with `setup`, then runs them.
    ///
    /// A setup failure ends the run like any other failure: one notification
    /// naming `stocks`, phase `Failed`.
    pub fn launch<A, F>(&mut self, stocks: Vec<StockId>, setup: F) -> TraderResult<RunSummary>
    where
        A: Agent,
        F: FnOnce(&TrainConfig) -> TraderResult<(A, PriceSeries, PriceSeries)>,
    {
        match setup(&self.config) {
            Ok((mut agent, train, val)) => self.run(&mut agent, &train, &val),
            Err(e) => {
                let notification = self.notification(stocks);
                Err(self.fail(&notification, e))
            }
        }
    }

    fn notification(&self, stocks: Vec<StockId>) -> Notification {
        Notification {
            recipient: self.config.recipient.clone(),
            model_name: self.config.model_name.clone(),
            stocks,
        }
    }

    fn fail(&mut self, notification: &Notification, e: TraderError) -> TraderError {
        self.phase = RunPhase::Failed;
        tracing::error!(error = %e, "Run failed");
        if let Err(notify_err) = self.notifier.notify_failure(notification, &e) {
            tracing::error!(error = %notify_err, "Failure notification could not be sent");
        }
        e
    }

    fn run_episodes<A: Agent + ?Sized>(
        &mut self,
        agent: &mut A,
        train: &PriceSeries,
        val: &PriceSeries,
    ) -> TraderResult<RunSummary> {
        self.config.validate()?;
        let initial_offset: Price = val.initial_offset()?;
        let mut summary = RunSummary::default();

        for episode in 1..=self.config.episode_count {
            self.check_interrupt(episode)?;

            self.phase = RunPhase::Training(episode);
            let train_result = train_episode(agent, &self.encoder, train, episode, &self.config)?;

            self.phase = RunPhase::Evaluation(episode);
            let evaluation = evaluate(agent, &self.encoder, val, &self.config)?;

            self.phase = RunPhase::Reporting(episode);
            let line = show_train_result(&train_result, &evaluation, initial_offset);
            summary.episodes.push(EpisodeReport {
                train: train_result,
                validation_profit: evaluation.total_profit,
                line,
            });
            summary.last_evaluation = Some(evaluation);
        }

        Ok(summary)
    }

    fn check_interrupt(&self, episode: usize) -> TraderResult<()> {
        match &self.interrupt {
            Some(flag) if flag.load(Ordering::SeqCst) => Err(TraderError::Interrupted(episode)),
            _ => Ok(()),
        }
    }
}
