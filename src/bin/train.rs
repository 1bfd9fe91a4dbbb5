//! Trains a DQN trading agent on historical `Adj Close` prices.
//!
//! ```text
//! train data/GOOG.csv data/GOOG_2018.csv --strategy t-dqn --episode-count 50 --debug
//! ```

use std::{
    fs,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use qtrader::{
    io::read_file,
    notify::{LogNotifier, Notifier, OutboxNotifier},
    prelude::*,
};
use tokio::runtime::Runtime;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Deep Q-learning stock trading trainer
#[derive(Parser, Debug)]
#[command(name = "train")]
#[command(author, version, about)]
struct Cli {
    /// CSV with an `Adj Close` column used for training
    train_stock: PathBuf,

    /// CSV used for validation; without it the training file is split
    val_stock: Option<PathBuf>,

    /// JSON file with a `TrainConfig`; flags below override its fields
    #[arg(long, env = "QTRADER_CONFIG")]
    config: Option<PathBuf>,

    /// Q-learning strategy: dqn, t-dqn or double-dqn
    #[arg(long, value_parser = Strategy::from_name)]
    strategy: Option<Strategy>,

    #[arg(long)]
    window_size: Option<usize>,

    #[arg(long)]
    batch_size: Option<usize>,

    #[arg(long)]
    episode_count: Option<usize>,

    #[arg(long)]
    model_name: Option<String>,

    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Resume from `<model-dir>/<model-name>`
    #[arg(long)]
    pretrained: bool,

    /// Who is told about the outcome of the run
    #[arg(long, env = "QTRADER_RECIPIENT")]
    recipient: Option<String>,

    /// Maximum number of simultaneously open positions
    #[arg(long)]
    max_position: Option<usize>,

    /// Checkpoint every N episodes
    #[arg(long)]
    save_thresh: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Write notifications as JSON files into this directory instead of the log
    #[arg(long)]
    outbox: Option<PathBuf>,

    /// Log every executed trade
    #[arg(long)]
    debug: bool,

    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    fn stocks(&self) -> Vec<StockId> {
        std::iter::once(&self.train_stock)
            .chain(&self.val_stock)
            .map(|path| StockId::from_path(path))
            .collect()
    }

    fn train_config(&self) -> Result<TrainConfig> {
        let mut cfg = match &self.config {
            Some(path) => read_file(path, SerdeFormat::from_path(path)?)
                .with_context(|| format!("Failed to read config {}", path.display()))?,
            None => TrainConfig::default(),
        };

        if let Some(v) = self.strategy {
            cfg = cfg.with_strategy(v);
        }
        if let Some(v) = self.window_size {
            cfg = cfg.with_window_size(v);
        }
        if let Some(v) = self.batch_size {
            cfg = cfg.with_batch_size(v);
        }
        if let Some(v) = self.episode_count {
            cfg = cfg.with_episode_count(v);
        }
        if let Some(v) = &self.model_name {
            cfg = cfg.with_model_name(v.clone());
        }
        if let Some(v) = &self.model_dir {
            cfg = cfg.with_model_dir(v.clone());
        }
        if self.max_position.is_some() {
            cfg = cfg.with_max_position(self.max_position);
        }
        if let Some(v) = self.save_thresh {
            cfg = cfg.with_save_thresh(v);
        }
        if self.recipient.is_some() {
            cfg = cfg.with_recipient(self.recipient.clone());
        }
        if self.seed.is_some() {
            cfg = cfg.with_seed(self.seed);
        }
        if self.pretrained {
            cfg = cfg.with_pretrained(true);
        }
        if self.debug {
            cfg = cfg.with_verbose(true);
        }
        if self.no_progress {
            cfg = cfg.with_show_progress(false);
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.debug)?;

    let cfg = cli.train_config()?;
    let notifier: Box<dyn Notifier> = match &cli.outbox {
        Some(dir) => Box::new(OutboxNotifier::new(dir)),
        None => Box::new(LogNotifier),
    };

    let interrupt = Arc::new(AtomicBool::new(false));
    let _signals = watch_ctrl_c(interrupt.clone())?;

    let encoder = SigmoidWindowEncoder;
    let state_size = encoder.state_size(cfg.window_size);
    let mut runner = Runner::new(cfg, encoder, notifier.as_ref()).with_interrupt(interrupt);

    let summary = runner.launch(cli.stocks(), |cfg| {
        let agent = DqnAgent::from_config(cfg, state_size)?;
        info!(
            strategy = %agent.strategy(),
            state_size = agent.state_size(),
            epsilon = agent.epsilon(),
            pretrained = cfg.pretrained,
            "Agent ready"
        );
        let (train, val) = load_series(&cli, cfg)?;
        Ok((agent, train, val))
    })?;

    if let Some(last) = summary.episodes.last() {
        info!(
            episodes = summary.episodes.len(),
            validation_profit = %last.validation_profit,
            "Training finished"
        );
    }
    Ok(())
}

fn load_series(cli: &Cli, cfg: &TrainConfig) -> TraderResult<(PriceSeries, PriceSeries)> {
    let train = load_adj_close(&cli.train_stock)?;
    match &cli.val_stock {
        Some(path) => Ok((train, load_adj_close(path)?)),
        None => {
            info!(
                split = cfg.train_split,
                "No validation data given, splitting {}",
                train.id()
            );
            train.split(cfg.train_split)
        }
    }
}

// ================================================================================================
// Signal Handling
// ================================================================================================

/// Sets `flag` on the first Ctrl-C so the run stops after the current episode;
/// a second Ctrl-C exits immediately. The returned runtime must stay alive.
fn watch_ctrl_c(flag: Arc<AtomicBool>) -> Result<Runtime> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("signals")
        .enable_all()
        .build()
        .context("Failed to start signal runtime")?;

    runtime.spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                return;
            }
            if flag.swap(true, Ordering::SeqCst) {
                warn!("Second interrupt, exiting");
                std::process::exit(130);
            }
            warn!("Interrupt received, stopping after the current episode");
        }
    });
    Ok(runtime)
}

// ================================================================================================
// Tracing Configuration
// ================================================================================================

fn init_tracing(debug: bool) -> Result<WorkerGuard> {
    let default_level = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let log_dir = PathBuf::from("logs");
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;
    let file_name = format!("train_{}.log", Utc::now().format("%Y-%m-%d"));

    let file_appender = tracing_appender::rolling::never(&log_dir, &file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_span_events(fmt::format::FmtSpan::NONE)
        .with_current_span(true)
        .with_timer(fmt::time::UtcTime::rfc_3339());
    let console_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    info!(log_file = %log_dir.join(&file_name).display(), "Logging to file");
    Ok(guard)
}
