// src/notify/mod.rs
//! Run notifications: a text summary plus the report artifact.
//!
//! Delivery is best effort. A failed notifier is logged and the run still
//! succeeds; the artifact on disk is the source of truth.

pub mod slack;

use anyhow::Result;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use crate::pipeline::SummaryCounts;

pub use slack::SlackNotifier;

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    pub reference_date: NaiveDate,
    /// Report workbook. A directory attaches every file inside.
    pub attachment: PathBuf,
    pub message: String,
}

impl NotificationEvent {
    pub fn new(reference_date: NaiveDate, attachment: impl Into<PathBuf>, counts: SummaryCounts) -> Self {
        Self {
            reference_date,
            attachment: attachment.into(),
            message: summary_message(reference_date, &counts),
        }
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, ev: &NotificationEvent) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Slack-flavoured text summary of one run.
pub fn summary_message(date: NaiveDate, counts: &SummaryCounts) -> String {
    format!(
        "*:bar_chart: NSM Recommendations — {}*\n\
         > :arrow_up: *Increase:* {}\n\
         > :arrow_down: *Decrease:* {}\n\
         > :no_entry_sign: *Excluded (low volume or minimal change):* {}\n\
         :paperclip: Summary + details attached.",
        date.format("%Y-%m-%d"),
        counts.increase,
        counts.decrease,
        counts.excluded
    )
}

/// Files to attach: the path itself, or the sorted regular files of a directory.
pub async fn attachment_files(path: &Path) -> Result<Vec<PathBuf>> {
    let meta = tokio::fs::metadata(path).await?;
    if !meta.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut out = Vec::new();
    let mut entries = tokio::fs::read_dir(path).await?;
    while let Some(e) = entries.next_entry().await? {
        if e.file_type().await?.is_file() {
            out.push(e.path());
        }
    }
    out.sort();
    Ok(out)
}

/// Fans an event out to every configured notifier.
#[derive(Default)]
pub struct NotifierMux {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slack when `SLACK_BOT_TOKEN` and `SLACK_CHANNEL` are set; otherwise empty
    /// (the summary only goes to the log).
    pub fn from_env() -> Self {
        let mut mux = Self::new();
        if let Some(slack) = SlackNotifier::from_env() {
            mux = mux.with(Box::new(slack));
        }
        mux
    }

    pub fn with(mut self, n: Box<dyn Notifier>) -> Self {
        self.notifiers.push(n);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Deliver to everyone; returns how many succeeded. Never fails.
    pub async fn notify(&self, ev: &NotificationEvent) -> usize {
        tracing::info!(
            date = %ev.reference_date,
            attachment = %ev.attachment.display(),
            "{}",
            ev.message
        );
        let mut ok = 0;
        for n in &self.notifiers {
            match n.send(ev).await {
                Ok(()) => {
                    tracing::info!(notifier = n.name(), "notification delivered");
                    ok += 1;
                }
                Err(e) => tracing::warn!(notifier = n.name(), error = ?e, "notification failed"),
            }
        }
        ok
    }
}
