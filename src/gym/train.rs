use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use crate::{
    agent::Agent,
    config::TrainConfig,
    data::{series::PriceSeries, state::StateEncoder},
    error::{SimError, TraderResult},
    gym::{
        Reward,
        simulator::{EpisodeSimulator, Mode},
    },
};

/// Diagnostics of one training episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeResult {
    pub episode: usize,
    pub episode_count: usize,
    pub total_profit: Reward,
    /// Mean loss of the learning updates in this episode.
    ///
    /// `None` when replay memory never exceeded the batch size, so no update ran.
    pub mean_loss: Option<f64>,
    pub updates: usize,
}

/// Runs one training episode over `series`.
///
/// After every transition, one experience-replay update runs if the agent's
/// memory holds more than `batch_size` transitions; update failures abort the
/// episode. Memory is never cleared here, so updates start earlier in later
/// episodes. The agent is checkpointed when `episode` is a multiple of
/// `save_thresh`.
#[tracing::instrument(
    skip_all,
    fields(episode = episode, episode_count = cfg.episode_count, agent = %agent.identifier())
)]
pub fn train_episode<A, E>(
    agent: &mut A,
    encoder: &E,
    series: &PriceSeries,
    episode: usize,
    cfg: &TrainConfig,
) -> TraderResult<EpisodeResult>
where
    A: Agent + ?Sized,
    E: StateEncoder,
{
    cfg.validate()?;
    tracing::info!("* * * Starting Training on Episode {episode} * * *");

    let batch_size = cfg.batch_size;
    let mut losses: Vec<f64> = Vec::new();
    let pb = progress_bar(cfg.show_progress, series.data_length() as u64)?;
    pb.set_message(format!("Episode {episode}/{}", cfg.episode_count));

    let summary = EpisodeSimulator::new(
        series,
        encoder,
        cfg.window_size,
        cfg.position_limit(),
        Mode::Learn,
    )
    .with_verbose(cfg.verbose)
    .run(agent, |agent, _step| {
        if agent.memory_len() > batch_size {
            let loss = agent.train_experience_replay(batch_size)?;
            losses.push(loss);
        }
        pb.inc(1);
        Ok(())
    })?;
    pb.finish_and_clear();

    if episode % cfg.save_thresh == 0 {
        agent.save(episode)?;
        tracing::info!(episode, "Checkpoint saved");
    }

    let mean_loss = mean(&losses);
    if mean_loss.is_none() {
        tracing::warn!(
            memory = agent.memory_len(),
            batch_size,
            "No learning update ran this episode"
        );
    }

    Ok(EpisodeResult {
        episode,
        episode_count: cfg.episode_count,
        total_profit: summary.total_profit,
        mean_loss,
        updates: losses.len(),
    })
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn progress_bar(visible: bool, len: u64) -> TraderResult<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta_precise})")
            .map_err(SimError::ProgressBar)?
            .progress_chars("#>-"),
    );
    Ok(bar)
}
