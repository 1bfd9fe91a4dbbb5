use std::{fs, path::PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
    data::domain::StockId,
    error::{IoError, TraderError, TraderResult},
};

/// Who to tell about a run and what it was about.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: Option<String>,
    pub model_name: String,
    pub stocks: Vec<StockId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

/// Outbound port informed once when a run completes or fails.
///
/// Transport and credentials are the implementation's business; the run only
/// hands over a [`Notification`] and, on failure, the error that ended it.
pub trait Notifier {
    fn notify_success(&self, notification: &Notification) -> TraderResult<()>;

    fn notify_failure(&self, notification: &Notification, error: &TraderError) -> TraderResult<()>;
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify_success(&self, notification: &Notification) -> TraderResult<()> {
        (**self).notify_success(notification)
    }

    fn notify_failure(&self, notification: &Notification, error: &TraderError) -> TraderResult<()> {
        (**self).notify_failure(notification, error)
    }
}

/// Emits notifications as structured log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_success(&self, n: &Notification) -> TraderResult<()> {
        tracing::info!(
            recipient = n.recipient.as_deref().unwrap_or("-"),
            model = %n.model_name,
            stocks = ?n.stocks,
            "Training has completed for {}!",
            n.model_name
        );
        Ok(())
    }

    fn notify_failure(&self, n: &Notification, error: &TraderError) -> TraderResult<()> {
        tracing::error!(
            recipient = n.recipient.as_deref().unwrap_or("-"),
            model = %n.model_name,
            stocks = ?n.stocks,
            error = %error,
            "Training failed for {} with error {}",
            n.model_name,
            error
        );
        Ok(())
    }
}

/// Message written by [`OutboxNotifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub status: RunStatus,
    pub sent_at: DateTime<Utc>,
    pub subject: String,
    pub body: String,
    #[serde(flatten)]
    pub notification: Notification,
}

/// Drops each notification as a JSON file into a directory.
///
/// A separate mailer or chat bot can pick the files up; this keeps delivery
/// credentials out of the training process.
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    dir: PathBuf,
}

impl OutboxNotifier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn write(&self, message: &OutboxMessage) -> TraderResult<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(IoError::from)?;
        let file_name = format!(
            "{}-{}-{}.json",
            message.sent_at.format("%Y%m%dT%H%M%S%.3f"),
            message.notification.model_name,
            message.status
        );
        let path = self.dir.join(file_name);
        let json = serde_json::to_vec_pretty(message).map_err(IoError::from)?;
        fs::write(&path, json).map_err(IoError::from)?;
        tracing::debug!(path = %path.display(), status = %message.status, "Notification queued");
        Ok(path)
    }
}

impl Notifier for OutboxNotifier {
    fn notify_success(&self, n: &Notification) -> TraderResult<()> {
        self.write(&OutboxMessage {
            status: RunStatus::Succeeded,
            sent_at: Utc::now(),
            subject: "Training Successful".to_string(),
            body: format!("Training has completed for {}!", n.model_name),
            notification: n.clone(),
        })
        .map(|_| ())
    }

    fn notify_failure(&self, n: &Notification, error: &TraderError) -> TraderResult<()> {
        self.write(&OutboxMessage {
            status: RunStatus::Failed,
            sent_at: Utc::now(),
            subject: "Training Failed".to_string(),
            body: format!(
                "Training failed for {} with error {error}! Review logs and try again.",
                n.model_name
            ),
            notification: n.clone(),
        })
        .map(|_| ())
    }
}
