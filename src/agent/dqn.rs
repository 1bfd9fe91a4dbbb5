use std::path::{Path, PathBuf};

use ndarray::Array2;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::{
    agent::{
        Agent, AgentIdentifier,
        memory::{DEFAULT_MEMORY_CAPACITY, ReplayMemory},
        q_network::{LinearQ, argmax},
    },
    config::TrainConfig,
    data::state::State,
    error::{AgentError, TraderError, TraderResult},
    gym::{Action, Transition},
    io::{SerdeFormat, read_file, write_file},
};

/// How the bootstrap target of a replay update is computed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Bootstrap from the online model itself.
    Dqn,
    /// Bootstrap from a target model refreshed every `reset_every` updates.
    #[default]
    #[strum(serialize = "t-dqn")]
    #[serde(rename = "t-dqn")]
    TDqn,
    /// Online model picks the next action, target model values it.
    DoubleDqn,
}

impl Strategy {
    pub fn from_name(name: &str) -> TraderResult<Self> {
        name.parse()
            .map_err(|_| AgentError::UnknownStrategy(name.to_string()).into())
    }

    fn uses_target(&self) -> bool {
        !matches!(self, Strategy::Dqn)
    }
}

/// Hyperparameters of [`DqnAgent`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DqnParams {
    pub gamma: f64,
    pub learning_rate: f64,
    pub epsilon: f64,
    pub epsilon_min: f64,
    pub epsilon_decay: f64,
    pub memory_capacity: usize,
    /// Target model refresh period, in replay updates.
    pub reset_every: usize,
}

impl Default for DqnParams {
    fn default() -> Self {
        Self {
            gamma: 0.95,
            learning_rate: 1e-3,
            epsilon: 1.0,
            epsilon_min: 0.01,
            epsilon_decay: 0.995,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            reset_every: 1000,
        }
    }
}

/// Persisted form of a [`DqnAgent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqnCheckpoint {
    pub strategy: Strategy,
    pub model: LinearQ,
}

/// Epsilon-greedy deep Q-learning agent with experience replay.
///
/// The very first non-exploratory decision of a fresh agent is always
/// [`Action::Buy`].
#[derive(Debug, Clone)]
pub struct DqnAgent {
    strategy: Strategy,
    params: DqnParams,
    model_name: String,
    model_dir: PathBuf,
    checkpoint_format: SerdeFormat,
    epsilon: f64,
    first_iter: bool,
    n_iter: usize,
    model: LinearQ,
    target_model: LinearQ,
    memory: ReplayMemory,
    rng: StdRng,
}

impl DqnAgent {
    pub fn new(strategy: Strategy, state_size: usize, model_name: impl Into<String>) -> Self {
        Self::with_rng(
            strategy,
            state_size,
            model_name.into(),
            DqnParams::default(),
            StdRng::from_os_rng(),
        )
    }

    fn with_rng(
        strategy: Strategy,
        state_size: usize,
        model_name: String,
        params: DqnParams,
        mut rng: StdRng,
    ) -> Self {
        let model = LinearQ::new(state_size, Action::COUNT, &mut rng);
        Self {
            strategy,
            params,
            model_name,
            model_dir: PathBuf::from("models"),
            checkpoint_format: SerdeFormat::default(),
            epsilon: params.epsilon,
            first_iter: true,
            n_iter: 1,
            target_model: model.clone(),
            model,
            memory: ReplayMemory::new(params.memory_capacity),
            rng,
        }
    }

    /// Builds an agent for `cfg`, loading `<model_dir>/<model_name>` when
    /// `cfg.pretrained` is set.
    pub fn from_config(cfg: &TrainConfig, state_size: usize) -> TraderResult<Self> {
        let mut agent = Self::new(cfg.strategy, state_size, cfg.model_name.clone())
            .with_model_dir(&cfg.model_dir);
        if let Some(seed) = cfg.seed {
            agent = agent.with_seed(seed);
        }
        if cfg.pretrained {
            agent = agent.with_pretrained(&cfg.pretrained_path())?;
        }
        Ok(agent)
    }

    pub fn with_params(self, params: DqnParams) -> Self {
        Self {
            epsilon: params.epsilon,
            memory: ReplayMemory::new(params.memory_capacity),
            params,
            ..self
        }
    }

    /// Reseeds the agent and re-initialises both models from the seed.
    pub fn with_seed(self, seed: u64) -> Self {
        Self::with_rng(
            self.strategy,
            self.model.state_size(),
            self.model_name,
            self.params,
            StdRng::seed_from_u64(seed),
        )
        .with_model_dir(self.model_dir)
        .with_checkpoint_format(self.checkpoint_format)
    }

    pub fn with_model_dir(self, model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            ..self
        }
    }

    pub fn with_checkpoint_format(self, checkpoint_format: SerdeFormat) -> Self {
        Self {
            checkpoint_format,
            ..self
        }
    }

    /// Replaces both models with the ones stored at `path`.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn with_pretrained(self, path: &Path) -> TraderResult<Self> {
        let checkpoint: DqnCheckpoint = read_file(path, self.checkpoint_format)
            .map_err(|e| AgentError::Checkpoint(format!("loading {}: {e}", path.display())))?;

        if checkpoint.model.state_size() != self.model.state_size()
            || checkpoint.model.action_size() != Action::COUNT
        {
            return Err(AgentError::Checkpoint(format!(
                "{} holds a {}x{} model, expected {}x{}",
                path.display(),
                checkpoint.model.action_size(),
                checkpoint.model.state_size(),
                Action::COUNT,
                self.model.state_size()
            ))
            .into());
        }
        if checkpoint.strategy != self.strategy {
            tracing::warn!(
                saved = %checkpoint.strategy,
                configured = %self.strategy,
                "Pretrained model was trained with a different strategy"
            );
        }
        tracing::info!("Loaded pretrained model");

        Ok(Self {
            target_model: checkpoint.model.clone(),
            model: checkpoint.model,
            ..self
        })
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn state_size(&self) -> usize {
        self.model.state_size()
    }

    pub fn checkpoint_path(&self, episode: usize) -> PathBuf {
        self.model_dir.join(format!("{}_{episode}", self.model_name))
    }

    pub fn checkpoint(&self) -> DqnCheckpoint {
        DqnCheckpoint {
            strategy: self.strategy,
            model: self.model.clone(),
        }
    }

    /// Bootstrapped value of `next_state` under the configured strategy.
    fn bootstrap(&self, next_state: &State) -> TraderResult<f64> {
        let value = match self.strategy {
            Strategy::Dqn => max(self.model.predict(next_state)?.iter()),
            Strategy::TDqn => max(self.target_model.predict(next_state)?.iter()),
            Strategy::DoubleDqn => {
                let best = argmax(&self.model.predict(next_state)?);
                self.target_model.predict(next_state)?[best]
            }
        };
        Ok(value)
    }
}

fn max<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    values.fold(f64::NEG_INFINITY, |m, &v| m.max(v))
}

impl Agent for DqnAgent {
    fn act(&mut self, state: &State, is_eval: bool) -> TraderResult<Action> {
        if !is_eval && self.rng.random::<f64>() <= self.epsilon {
            return Action::try_from(self.rng.random_range(0..Action::COUNT));
        }
        if self.first_iter {
            self.first_iter = false;
            return Ok(Action::Buy);
        }
        Action::try_from(argmax(&self.model.predict(state)?))
    }

    fn remember(&mut self, transition: Transition) {
        self.memory.push(transition);
    }

    fn memory_len(&self) -> usize {
        self.memory.len()
    }

    fn train_experience_replay(&mut self, batch_size: usize) -> TraderResult<f64> {
        if self.strategy.uses_target() && self.n_iter % self.params.reset_every == 0 {
            tracing::debug!(n_iter = self.n_iter, "Target model reset");
            self.target_model = self.model.clone();
        }
        self.n_iter += 1;

        let batch = self.memory.sample(&mut self.rng, batch_size)?;
        let mut inputs = Array2::zeros((batch.len(), self.model.state_size()));
        let mut targets = Array2::zeros((batch.len(), Action::COUNT));

        for (i, t) in batch.iter().enumerate() {
            let target = if t.done {
                t.reward.0
            } else {
                t.reward.0 + self.params.gamma * self.bootstrap(&t.next_state)?
            };
            let mut q = self.model.predict(&t.state)?;
            q[t.action.index()] = target;
            inputs.row_mut(i).assign(t.state.as_array());
            targets.row_mut(i).assign(&q);
        }

        let loss = self
            .model
            .fit(&inputs, &targets, self.params.learning_rate)?;

        if self.epsilon > self.params.epsilon_min {
            self.epsilon *= self.params.epsilon_decay;
        }
        Ok(loss)
    }

    fn save(&mut self, episode: usize) -> TraderResult<()> {
        let path = self.checkpoint_path(episode);
        write_file(&path, &self.checkpoint(), self.checkpoint_format).map_err(|e| {
            TraderError::from(AgentError::Checkpoint(format!(
                "writing {}: {e}",
                path.display()
            )))
        })?;
        tracing::debug!(path = %path.display(), "Model written");
        Ok(())
    }

    fn identifier(&self) -> AgentIdentifier {
        AgentIdentifier::named(self.model_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::gym::Reward;

    // ========================================================================
    // 1. Fixtures & Helpers
    // ========================================================================

    fn greedy_params() -> DqnParams {
        DqnParams {
            epsilon: 0.0,
            ..Default::default()
        }
    }

    fn agent(strategy: Strategy) -> DqnAgent {
        DqnAgent::new(strategy, 3, "dqn_test").with_seed(11)
    }

    fn transition(i: usize, done: bool) -> Transition {
        let x = i as f64 / 10.0;
        Transition {
            state: State::from(vec![x, 0.5, 1.0 - x]),
            action: Action::try_from(i % 3).expect("valid action index"),
            reward: Reward(x),
            next_state: State::from(vec![x + 0.1, 0.5, 0.9 - x]),
            done,
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("qtrader-dqn-{}-{name}", std::process::id()))
    }

    // ========================================================================
    // 2. Test Cases
    // ========================================================================

    #[test]
    fn test_strategy_names() {
        assert_eq!(Strategy::from_name("dqn").expect("dqn"), Strategy::Dqn);
        assert_eq!(Strategy::from_name("t-dqn").expect("t-dqn"), Strategy::TDqn);
        assert_eq!(
            Strategy::from_name("double-dqn").expect("double-dqn"),
            Strategy::DoubleDqn
        );
        assert_eq!(Strategy::TDqn.to_string(), "t-dqn");
        assert!(matches!(
            Strategy::from_name("sarsa"),
            Err(TraderError::Agent(AgentError::UnknownStrategy(_)))
        ));
    }

    #[test]
    fn test_first_greedy_action_is_buy() {
        let mut agent = agent(Strategy::TDqn).with_params(greedy_params());
        let state = State::from(vec![0.5, 0.5, 0.5]);

        assert_eq!(agent.act(&state, false).expect("act"), Action::Buy);
        let second = agent.act(&state, false).expect("act");
        let third = agent.act(&state, false).expect("act");
        assert_eq!(second, third, "greedy policy is deterministic");
    }

    #[test]
    fn test_eval_never_explores() {
        let mut agent = agent(Strategy::Dqn);
        let state = State::from(vec![0.1, 0.9, 0.3]);
        assert_eq!(agent.act(&state, true).expect("act"), Action::Buy);

        let expected = agent.act(&state, true).expect("act");
        for _ in 0..20 {
            assert_eq!(agent.act(&state, true).expect("act"), expected);
        }
    }

    #[test]
    fn test_replay_requires_enough_memory() {
        let mut agent = agent(Strategy::TDqn);
        agent.remember(transition(1, false));

        assert!(agent.train_experience_replay(4).is_err());
    }

    #[test]
    fn test_replay_decays_epsilon_for_every_strategy() {
        for strategy in [Strategy::Dqn, Strategy::TDqn, Strategy::DoubleDqn] {
            let mut agent = agent(strategy);
            for i in 0..40 {
                agent.remember(transition(i, i == 39));
            }

            let loss = agent.train_experience_replay(8).expect("replay");

            assert!(loss.is_finite() && loss >= 0.0);
            assert!((agent.epsilon() - 0.995).abs() < 1e-12);
            assert_eq!(agent.memory_len(), 40);
        }
    }

    #[test]
    fn test_epsilon_floor() {
        let mut agent = agent(Strategy::Dqn).with_params(DqnParams {
            epsilon: 0.0101,
            ..Default::default()
        });
        for i in 0..10 {
            agent.remember(transition(i, false));
        }
        for _ in 0..5 {
            agent.train_experience_replay(4).expect("replay");
        }
        assert!(agent.epsilon() < 0.0101);
        assert!(agent.epsilon() >= 0.01 * 0.995);
    }

    #[test]
    fn test_target_model_resets_on_schedule() {
        let mut agent = agent(Strategy::TDqn).with_params(DqnParams {
            reset_every: 2,
            learning_rate: 0.1,
            ..Default::default()
        });
        for i in 0..20 {
            agent.remember(transition(i, false));
        }

        // n_iter 1: no reset, online model moves away from the target.
        agent.train_experience_replay(8).expect("replay");
        assert_ne!(agent.model, agent.target_model);
        // n_iter 2: reset before the update.
        let before = agent.model.clone();
        agent.train_experience_replay(8).expect("replay");
        assert_eq!(agent.target_model, before);
    }

    #[test]
    fn test_save_then_load_pretrained() {
        let dir = temp_dir("ckpt");
        let _ = fs::remove_dir_all(&dir);
        let mut trained = agent(Strategy::DoubleDqn).with_model_dir(&dir);
        trained.save(10).expect("save");
        assert!(dir.join("dqn_test_10").is_file());

        let loaded = DqnAgent::new(Strategy::DoubleDqn, 3, "dqn_test")
            .with_pretrained(&dir.join("dqn_test_10"))
            .expect("load");
        assert_eq!(loaded.model, trained.model);
        assert_eq!(loaded.target_model, trained.model);

        let mismatched =
            DqnAgent::new(Strategy::DoubleDqn, 5, "dqn_test").with_pretrained(&dir.join("dqn_test_10"));
        assert!(matches!(
            mismatched,
            Err(TraderError::Agent(AgentError::Checkpoint(_)))
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_pretrained_is_checkpoint_error() {
        let cfg = TrainConfig::default()
            .with_model_dir(temp_dir("missing"))
            .with_pretrained(true);
        assert!(matches!(
            DqnAgent::from_config(&cfg, 10),
            Err(TraderError::Agent(AgentError::Checkpoint(_)))
        ));
    }
}
