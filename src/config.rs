use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    agent::dqn::Strategy,
    error::{SimError, TraderResult},
    gym::{eval::EvalHistoryPolicy, ledger::PositionLimit},
};

/// Configuration blueprint for a training run.
///
/// Built with [`TrainConfig::default`] and the `with_*` methods; call
/// [`TrainConfig::validate`] before handing it to a run.
///
/// # Defaults
///
/// | field                | default        |
/// |----------------------|----------------|
/// | `window_size`        | 10             |
/// | `batch_size`         | 32             |
/// | `episode_count`      | 50             |
/// | `save_thresh`        | 10             |
/// | `max_position`       | unbounded      |
/// | `strategy`           | `t-dqn`        |
/// | `model_name`         | `model_debug`  |
/// | `train_split`        | 0.8            |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Number of price differences fed to the agent per state.
    pub window_size: usize,
    /// Replay mini-batch size; also the memory size that must be exceeded before learning.
    pub batch_size: usize,
    pub episode_count: usize,
    /// Checkpoint every `save_thresh` episodes.
    pub save_thresh: usize,
    /// Maximum simultaneously open positions, `None` for no limit.
    pub max_position: Option<usize>,
    pub strategy: Strategy,
    pub model_name: String,
    /// Directory checkpoints are written to and loaded from.
    pub model_dir: PathBuf,
    /// Resume from `<model_dir>/<model_name>` instead of a fresh agent.
    pub pretrained: bool,
    /// Log every executed trade at debug level.
    pub verbose: bool,
    pub recipient: Option<String>,
    pub eval_history_policy: EvalHistoryPolicy,
    /// Fraction of a single input series used for training when no validation series is given.
    pub train_split: f64,
    pub show_progress: bool,
    /// Seed for exploration, sampling and weight initialisation.
    pub seed: Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            batch_size: 32,
            episode_count: 50,
            save_thresh: 10,
            max_position: None,
            strategy: Strategy::default(),
            model_name: "model_debug".to_string(),
            model_dir: PathBuf::from("models"),
            pretrained: false,
            verbose: false,
            recipient: None,
            eval_history_policy: EvalHistoryPolicy::default(),
            train_split: 0.8,
            show_progress: true,
            seed: None,
        }
    }
}

impl TrainConfig {
    pub fn with_window_size(self, window_size: usize) -> Self {
        Self {
            window_size,
            ..self
        }
    }

    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    pub fn with_episode_count(self, episode_count: usize) -> Self {
        Self {
            episode_count,
            ..self
        }
    }

    pub fn with_save_thresh(self, save_thresh: usize) -> Self {
        Self {
            save_thresh,
            ..self
        }
    }

    pub fn with_max_position(self, max_position: Option<usize>) -> Self {
        Self {
            max_position,
            ..self
        }
    }

    pub fn with_strategy(self, strategy: Strategy) -> Self {
        Self { strategy, ..self }
    }

    pub fn with_model_name(self, model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..self
        }
    }

    pub fn with_model_dir(self, model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            ..self
        }
    }

    pub fn with_pretrained(self, pretrained: bool) -> Self {
        Self { pretrained, ..self }
    }

    pub fn with_verbose(self, verbose: bool) -> Self {
        Self { verbose, ..self }
    }

    pub fn with_recipient(self, recipient: Option<String>) -> Self {
        Self { recipient, ..self }
    }

    pub fn with_eval_history_policy(self, eval_history_policy: EvalHistoryPolicy) -> Self {
        Self {
            eval_history_policy,
            ..self
        }
    }

    pub fn with_train_split(self, train_split: f64) -> Self {
        Self {
            train_split,
            ..self
        }
    }

    pub fn with_show_progress(self, show_progress: bool) -> Self {
        Self {
            show_progress,
            ..self
        }
    }

    pub fn with_seed(self, seed: Option<u64>) -> Self {
        Self { seed, ..self }
    }

    pub fn position_limit(&self) -> PositionLimit {
        self.max_position.into()
    }

    /// Path a pretrained model is loaded from.
    pub fn pretrained_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_name)
    }

    pub fn validate(&self) -> TraderResult<()> {
        fn err(msg: &str) -> TraderResult<()> {
            Err(SimError::InvalidConfig(msg.to_string()).into())
        }

        if self.window_size == 0 {
            return err("window_size must be at least 1");
        }
        if self.batch_size == 0 {
            return err("batch_size must be at least 1");
        }
        if self.episode_count == 0 {
            return err("episode_count must be at least 1");
        }
        if self.save_thresh == 0 {
            return err("save_thresh must be at least 1");
        }
        if !(self.train_split > 0.0 && self.train_split < 1.0) {
            return err("train_split must lie strictly between 0 and 1");
        }
        if self.model_name.trim().is_empty() {
            return err("model_name must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TraderError;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = TrainConfig::default();
        cfg.validate().expect("defaults must validate");
        assert_eq!(cfg.position_limit(), PositionLimit::Unbounded);
        assert_eq!(cfg.strategy, Strategy::TDqn);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let invalid = [
            TrainConfig::default().with_window_size(0),
            TrainConfig::default().with_batch_size(0),
            TrainConfig::default().with_episode_count(0),
            TrainConfig::default().with_save_thresh(0),
            TrainConfig::default().with_train_split(1.0),
            TrainConfig::default().with_model_name("  "),
        ];
        for cfg in invalid {
            assert!(matches!(
                cfg.validate(),
                Err(TraderError::Sim(SimError::InvalidConfig(_)))
            ));
        }
    }

    #[test]
    fn test_pretrained_path() {
        let cfg = TrainConfig::default()
            .with_model_dir("/tmp/models")
            .with_model_name("goog");
        assert_eq!(cfg.pretrained_path(), PathBuf::from("/tmp/models/goog"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: TrainConfig =
            serde_json::from_str(r#"{ "max_position": 3, "strategy": "double-dqn" }"#)
                .expect("valid config json");
        assert_eq!(cfg.position_limit(), PositionLimit::Bounded(3));
        assert_eq!(cfg.strategy, Strategy::DoubleDqn);
        assert_eq!(cfg.window_size, 10);
    }
}
