use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::io::ReaderStream;

use crate::auth::DIRECTORY_TOKEN_HEADER;
use crate::error::{Error, Result};
use crate::types::ImportBatch;

/// Destination for import batches.
#[async_trait]
pub trait BatchSink: Send + Sync {
    async fn submit(&self, batch: &ImportBatch) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    error: Option<String>,
}

/// Submits batches to a running service's document endpoint as multipart
/// uploads, streaming each file from disk.
#[derive(Clone)]
pub struct IngestionClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
    directory_token: Option<String>,
}

impl IngestionClient {
    pub fn new(
        service_uri: &str,
        access_token: Option<String>,
        directory_token: Option<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(600))
            .build()?;
        Ok(Self {
            client,
            base_url: service_uri.trim_end_matches('/').to_string(),
            access_token,
            directory_token,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn build_form(batch: &ImportBatch) -> Result<Form> {
        let mut form = Form::new();
        for scope in &batch.scope_ids {
            form = form.text("scopeIds", scope.as_str().to_string());
        }

        for file in &batch.files {
            let handle = tokio::fs::File::open(&file.path).await?;
            let body = reqwest::Body::wrap_stream(ReaderStream::new(handle));
            let part = Part::stream_with_length(body, file.size_bytes)
                .file_name(file.file_name())
                .mime_str("application/octet-stream")?;
            form = form.part("formFiles", part);
        }
        Ok(form)
    }
}

#[async_trait]
impl BatchSink for IngestionClient {
    async fn submit(&self, batch: &ImportBatch) -> Result<()> {
        let url = format!("{}/api/v1/documents", self.base_url);
        let form = Self::build_form(batch).await?;

        let mut request = self.client.post(&url).multipart(form);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        if let Some(token) = &self.directory_token {
            request = request.header(DIRECTORY_TOKEN_HEADER, token);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let message = match resp.json::<ApiResponse>().await {
            Ok(ApiResponse { error: Some(e) }) => e,
            _ => "Server error (no details provided)".to_string(),
        };
        Err(Error::Ingestion(format!(
            "service returned {}: {message}",
            status.as_u16()
        )))
    }
}

/// Result of submitting one batch.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub index: usize,
    pub files: usize,
    pub result: std::result::Result<(), String>,
}

/// Per-batch outcomes of one import run, ordered by batch index.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub expected: usize,
    pub outcomes: Vec<BatchOutcome>,
}

impl ImportReport {
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.len() == self.expected && self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    #[must_use]
    pub fn imported_files(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| o.files)
            .sum()
    }
}

/// Submits every batch exactly once, at most `concurrency` at a time.
/// Completion order is unspecified; the report is sorted by batch index.
pub async fn submit_batches(
    sink: Arc<dyn BatchSink>,
    batches: Vec<ImportBatch>,
    concurrency: usize,
) -> ImportReport {
    let expected = batches.len();
    let file_counts: Vec<usize> = batches.iter().map(ImportBatch::len).collect();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, batch) in batches.into_iter().enumerate() {
        let sink = Arc::clone(&sink);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let files = batch.len();
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return BatchOutcome {
                    index,
                    files,
                    result: Err("submission pool closed".to_string()),
                };
            };

            tracing::info!(batch = index, files, bytes = batch.total_bytes(), "submitting batch");
            let result = sink.submit(&batch).await.map_err(|e| e.to_string());
            if let Err(e) = &result {
                tracing::warn!(batch = index, "batch failed: {e}");
            }
            BatchOutcome {
                index,
                files,
                result,
            }
        });
    }

    let mut outcomes = Vec::with_capacity(expected);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => tracing::error!("batch task aborted: {e}"),
        }
    }

    for (index, &files) in file_counts.iter().enumerate() {
        if !outcomes.iter().any(|o| o.index == index) {
            outcomes.push(BatchOutcome {
                index,
                files,
                result: Err("batch task aborted".to_string()),
            });
        }
    }

    outcomes.sort_by_key(|o| o.index);
    ImportReport { expected, outcomes }
}
