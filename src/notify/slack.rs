use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;

use super::{attachment_files, NotificationEvent, Notifier};

pub const DEFAULT_API_BASE: &str = "https://slack.com/api";

/// Uploads the report through Slack's external-upload flow and posts the
/// summary as the initial comment.
#[derive(Clone)]
pub struct SlackNotifier {
    token: String,
    channel: String,
    api_base: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

#[derive(Debug, Deserialize)]
struct UploadUrlResponse {
    ok: bool,
    #[serde(default)]
    upload_url: Option<String>,
    #[serde(default)]
    file_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OkResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackNotifier {
    pub fn new(token: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            channel: channel.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }

    /// `None` unless both `SLACK_BOT_TOKEN` and `SLACK_CHANNEL` are set.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("SLACK_BOT_TOKEN").ok().filter(|s| !s.trim().is_empty());
        let channel = std::env::var("SLACK_CHANNEL").ok().filter(|s| !s.trim().is_empty());
        match (token, channel) {
            (Some(t), Some(c)) => Some(Self::new(t, c)),
            _ => {
                tracing::debug!("Slack disabled (no SLACK_BOT_TOKEN / SLACK_CHANNEL)");
                None
            }
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    /// Retry `op` with exponential backoff (500ms, 1s, 2s, ...).
    async fn with_backoff<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.max_retries => {
                    tracing::debug!(attempt, error = ?e, "{what} failed; retrying");
                    tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                }
                Err(e) => return Err(e.context(format!("{what} failed after {attempt} attempts"))),
            }
        }
    }

    async fn upload_one(&self, path: &Path) -> Result<(String, String)> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "report".to_string());

        let length = bytes.len().to_string();
        let form = [("filename", filename.as_str()), ("length", length.as_str())];
        let form = &form;

        let ticket: UploadUrlResponse = self
            .with_backoff("slack getUploadURLExternal", || async move {
                let rsp = self
                    .client
                    .post(format!("{}/files.getUploadURLExternal", self.api_base))
                    .bearer_auth(&self.token)
                    .timeout(self.timeout)
                    .form(form)
                    .send()
                    .await
                    .context("slack post")?
                    .error_for_status()
                    .context("slack non-2xx")?;
                Ok(rsp.json::<UploadUrlResponse>().await.context("slack json")?)
            })
            .await?;

        if !ticket.ok {
            return Err(anyhow!(
                "slack getUploadURLExternal: {}",
                ticket.error.unwrap_or_else(|| "unknown error".into())
            ));
        }
        let (Some(url), Some(file_id)) = (ticket.upload_url, ticket.file_id) else {
            return Err(anyhow!("slack getUploadURLExternal: missing upload_url/file_id"));
        };

        let (url, bytes) = (url.as_str(), &bytes);
        self.with_backoff("slack file upload", || async move {
            self.client
                .post(url)
                .timeout(self.timeout)
                .body(bytes.clone())
                .send()
                .await
                .context("slack upload")?
                .error_for_status()
                .context("slack upload non-2xx")?;
            Ok(())
        })
        .await?;

        Ok((file_id, filename))
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, ev: &NotificationEvent) -> Result<()> {
        let files = attachment_files(&ev.attachment)
            .await
            .with_context(|| format!("listing {}", ev.attachment.display()))?;

        let mut uploaded = Vec::with_capacity(files.len());
        for f in &files {
            let (id, title) = self.upload_one(f).await?;
            uploaded.push(json!({ "id": id, "title": title }));
        }

        let body = json!({
            "files": uploaded,
            "channel_id": self.channel,
            "initial_comment": ev.message,
        });

        let body = &body;
        let done: OkResponse = self
            .with_backoff("slack completeUploadExternal", || async move {
                let rsp = self
                    .client
                    .post(format!("{}/files.completeUploadExternal", self.api_base))
                    .bearer_auth(&self.token)
                    .timeout(self.timeout)
                    .json(body)
                    .send()
                    .await
                    .context("slack post")?
                    .error_for_status()
                    .context("slack non-2xx")?;
                Ok(rsp.json::<OkResponse>().await.context("slack json")?)
            })
            .await?;

        if !done.ok {
            return Err(anyhow!(
                "slack completeUploadExternal: {}",
                done.error.unwrap_or_else(|| "unknown error".into())
            ));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}
