//! Submission sinks
//!
//! A finished session's payload is handed to exactly one [`SubmissionSink`].
//! Submission is best effort: the service spawns it with
//! [`spawn_submission`] and only logs the outcome, so a failing sink never
//! delays or withholds the worker's completion code.
//!
//! Available sinks:
//! - [`FirebaseSink`]: pushes the payload under `submissions` in a Firebase
//!   Realtime Database
//! - [`FirebaseWorkerSink`]: writes one entry per article under
//!   `annotations/{title}/workers/{worker}`
//! - [`JsonFileSink`]: writes `submission_<sessionId>.json` to a directory
//! - [`NoopSink`]: logs and discards

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::annotations::AnnotationRecord;
use crate::payload::SessionPayload;
use crate::survey::SurveyResponse;
use crate::{Error, Result};

/// HTTP request timeout for remote sinks
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = concat!("nat/", env!("CARGO_PKG_VERSION"));

/// Where a submission ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub sink: &'static str,
    /// Database key, URL or file path of the stored submission
    pub location: String,
}

/// Destination for finished session payloads
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Store one payload
    async fn submit(&self, payload: &SessionPayload) -> Result<SubmissionReceipt>;
}

/// Sink selection from the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    Firebase {
        database_url: String,
        #[serde(default)]
        auth_token: Option<String>,
    },
    FirebasePerWorker {
        database_url: String,
        #[serde(default)]
        auth_token: Option<String>,
    },
    File {
        directory: PathBuf,
    },
    None,
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::File {
            directory: PathBuf::from("submissions"),
        }
    }
}

impl SinkConfig {
    /// Build the configured sink
    pub fn build(&self) -> Result<Arc<dyn SubmissionSink>> {
        let sink: Arc<dyn SubmissionSink> = match self {
            SinkConfig::Firebase {
                database_url,
                auth_token,
            } => Arc::new(FirebaseSink::new(database_url, auth_token.clone())?),
            SinkConfig::FirebasePerWorker {
                database_url,
                auth_token,
            } => Arc::new(FirebaseWorkerSink::new(database_url, auth_token.clone())?),
            SinkConfig::File { directory } => Arc::new(JsonFileSink::new(directory.clone())),
            SinkConfig::None => Arc::new(NoopSink),
        };
        info!("Submission sink: {}", sink.name());
        Ok(sink)
    }
}

/// Submit `payload` on a background task, logging the outcome
///
/// There is no retry. The returned handle is only useful to tests.
pub fn spawn_submission(sink: Arc<dyn SubmissionSink>, payload: SessionPayload) -> JoinHandle<()> {
    tokio::spawn(async move {
        match sink.submit(&payload).await {
            Ok(receipt) => info!(
                session_id = %payload.session_id,
                sink = receipt.sink,
                location = %receipt.location,
                "Submission stored"
            ),
            Err(e) => error!(
                session_id = %payload.session_id,
                sink = sink.name(),
                completion_code = %payload.completion_code,
                "Submission failed: {}",
                e
            ),
        }
    })
}

/// Database key derived from an article title: whitespace runs become `_`
///
/// Characters Firebase forbids in keys (`. $ # [ ] /`) are replaced too.
pub fn safe_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .replace(['.', '$', '#', '[', ']', '/'], "_")
}

fn http_client() -> Result<Client> {
    Ok(Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()?)
}

/// Firebase Realtime Database REST endpoint
#[derive(Debug, Clone)]
struct FirebaseEndpoint {
    database_url: String,
    auth_token: Option<String>,
}

impl FirebaseEndpoint {
    fn new(database_url: &str, auth_token: Option<String>) -> Result<Self> {
        let database_url = database_url.trim().trim_end_matches('/').to_string();
        if !(database_url.starts_with("https://") || database_url.starts_with("http://")) {
            return Err(Error::Config(format!(
                "Firebase database_url must be an http(s) URL, got '{}'",
                database_url
            )));
        }
        Ok(Self {
            database_url,
            auth_token: auth_token.filter(|t| !t.is_empty()),
        })
    }

    /// URL of the node at `path` (without the auth parameter)
    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.database_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Sink(format!("Firebase returned {}: {}", status, body)))
}

/// Pushes whole payloads under `submissions`
pub struct FirebaseSink {
    client: Client,
    endpoint: FirebaseEndpoint,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

impl FirebaseSink {
    pub fn new(database_url: &str, auth_token: Option<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            endpoint: FirebaseEndpoint::new(database_url, auth_token)?,
        })
    }
}

#[async_trait]
impl SubmissionSink for FirebaseSink {
    fn name(&self) -> &'static str {
        "firebase"
    }

    async fn submit(&self, payload: &SessionPayload) -> Result<SubmissionReceipt> {
        let url = self.endpoint.url("submissions");
        debug!(session_id = %payload.session_id, url = %url, "Pushing submission");

        let response = self
            .endpoint
            .authorize(self.client.post(&url))
            .json(payload)
            .send()
            .await?;
        let pushed: PushResponse = check_status(response).await?.json().await?;

        Ok(SubmissionReceipt {
            sink: self.name(),
            location: format!("submissions/{}", pushed.name),
        })
    }
}

/// Per-article entry written by [`FirebaseWorkerSink`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerArticleEntry {
    pub session_id: uuid::Uuid,
    pub article_id: u32,
    pub annotations: Vec<AnnotationRecord>,
    pub survey: Option<SurveyResponse>,
    pub completion_code: String,
    pub timestamp: String,
}

/// Writes each article's results under `annotations/{title}/workers/{worker}`
///
/// Sessions opened without a worker id are keyed by their session id.
pub struct FirebaseWorkerSink {
    client: Client,
    endpoint: FirebaseEndpoint,
}

impl FirebaseWorkerSink {
    pub fn new(database_url: &str, auth_token: Option<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            endpoint: FirebaseEndpoint::new(database_url, auth_token)?,
        })
    }

    /// Node path and entry for every article in the payload
    pub fn entries(payload: &SessionPayload) -> Vec<(String, WorkerArticleEntry)> {
        let worker = payload
            .worker_id
            .as_deref()
            .filter(|w| !w.trim().is_empty())
            .map(safe_title)
            .unwrap_or_else(|| payload.session_id.to_string());

        payload
            .article_titles
            .iter()
            .map(|article| {
                let path = format!(
                    "annotations/{}/workers/{}",
                    safe_title(&article.title),
                    worker
                );
                let entry = WorkerArticleEntry {
                    session_id: payload.session_id,
                    article_id: article.id,
                    annotations: payload
                        .annotations_by_article
                        .get(&article.id)
                        .cloned()
                        .unwrap_or_default(),
                    survey: payload.survey_by_article.get(&article.id).cloned(),
                    completion_code: payload.completion_code.clone(),
                    timestamp: payload.timestamp.clone(),
                };
                (path, entry)
            })
            .collect()
    }
}

#[async_trait]
impl SubmissionSink for FirebaseWorkerSink {
    fn name(&self) -> &'static str {
        "firebase_per_worker"
    }

    async fn submit(&self, payload: &SessionPayload) -> Result<SubmissionReceipt> {
        let entries = Self::entries(payload);
        let mut written = Vec::with_capacity(entries.len());

        for (path, entry) in entries {
            let url = self.endpoint.url(&path);
            debug!(session_id = %payload.session_id, url = %url, "Writing article entry");
            let response = self
                .endpoint
                .authorize(self.client.put(&url))
                .json(&entry)
                .send()
                .await?;
            check_status(response).await?;
            written.push(path);
        }

        Ok(SubmissionReceipt {
            sink: self.name(),
            location: written.join(", "),
        })
    }
}

/// Writes each payload to `submission_<sessionId>.json` in a directory
pub struct JsonFileSink {
    directory: PathBuf,
}

impl JsonFileSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn path_for(&self, payload: &SessionPayload) -> PathBuf {
        self.directory
            .join(format!("submission_{}.json", payload.session_id))
    }
}

#[async_trait]
impl SubmissionSink for JsonFileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn submit(&self, payload: &SessionPayload) -> Result<SubmissionReceipt> {
        tokio::fs::create_dir_all(&self.directory).await?;
        let path = self.path_for(payload);
        tokio::fs::write(&path, payload.to_pretty_json()?).await?;

        Ok(SubmissionReceipt {
            sink: self.name(),
            location: path.display().to_string(),
        })
    }
}

/// Discards payloads
pub struct NoopSink;

#[async_trait]
impl SubmissionSink for NoopSink {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn submit(&self, payload: &SessionPayload) -> Result<SubmissionReceipt> {
        info!(
            session_id = %payload.session_id,
            completion_code = %payload.completion_code,
            "Submission discarded (no sink configured)"
        );
        Ok(SubmissionReceipt {
            sink: self.name(),
            location: String::new(),
        })
    }
}
