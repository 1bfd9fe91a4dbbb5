#![allow(dead_code)]

use std::{
    cell::RefCell,
    fs,
    path::{Path, PathBuf},
};

use qtrader::prelude::*;

/// Fresh scratch directory for one test.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("qtrader-it-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("scratch dir");
    dir
}

/// Writes a Yahoo-style CSV with the given adjusted closes.
pub fn write_csv(dir: &Path, stock: &str, closes: &[f64]) -> PathBuf {
    let mut csv = String::from("Date,Open,High,Low,Close,Adj Close,Volume\n");
    for (i, close) in closes.iter().enumerate() {
        csv.push_str(&format!(
            "2018-01-{:02},{close},{close},{close},{close},{close},1000\n",
            (i % 28) + 1
        ));
    }
    let path = dir.join(format!("{stock}.csv"));
    fs::write(&path, csv).expect("csv written");
    path
}

/// Deterministic, gently oscillating price path.
pub fn wave(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| 100.0 + 5.0 * (i as f64 / 4.0).sin() + i as f64 * 0.1)
        .collect()
}

pub fn setup_config(model_dir: &Path) -> TrainConfig {
    TrainConfig::default()
        .with_window_size(5)
        .with_batch_size(8)
        .with_episode_count(4)
        .with_save_thresh(2)
        .with_model_name("it_model")
        .with_model_dir(model_dir)
        .with_seed(Some(42))
        .with_show_progress(false)
}

/// Plays a fixed sequence of actions, then holds.
#[derive(Default)]
pub struct ScriptedAgent {
    pub script: Vec<Action>,
    pub cursor: usize,
    pub memory: usize,
    pub saved: Vec<usize>,
    pub fail_save: bool,
}

impl ScriptedAgent {
    pub fn new(script: Vec<Action>) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }
}

impl Agent for ScriptedAgent {
    fn act(&mut self, _state: &State, _is_eval: bool) -> TraderResult<Action> {
        let action = self.script.get(self.cursor).copied().unwrap_or(Action::Hold);
        self.cursor += 1;
        Ok(action)
    }

    fn remember(&mut self, _transition: Transition) {
        self.memory += 1;
    }

    fn memory_len(&self) -> usize {
        self.memory
    }

    fn train_experience_replay(&mut self, _batch_size: usize) -> TraderResult<f64> {
        Ok(0.0)
    }

    fn save(&mut self, episode: usize) -> TraderResult<()> {
        if self.fail_save {
            return Err(AgentError::Checkpoint("disk full".to_string()).into());
        }
        self.saved.push(episode);
        Ok(())
    }
}

/// Keeps every notification in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    pub successes: RefCell<Vec<Notification>>,
    pub failures: RefCell<Vec<(Notification, String)>>,
}

impl Notifier for RecordingNotifier {
    fn notify_success(&self, notification: &Notification) -> TraderResult<()> {
        self.successes.borrow_mut().push(notification.clone());
        Ok(())
    }

    fn notify_failure(&self, notification: &Notification, error: &TraderError) -> TraderResult<()> {
        self.failures
            .borrow_mut()
            .push((notification.clone(), error.to_string()));
        Ok(())
    }
}
