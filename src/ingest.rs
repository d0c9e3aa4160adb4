//! Ingestion client: batched upsert of harvest records into the external
//! embedding index.
//!
//! Records with whitespace-only content carry nothing to embed and are
//! dropped before batching. A batch failure is fatal for the rest of the
//! run; the offending payload is logged and no further batches are sent.

use crate::extract::HarvestRecord;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// The record shape the embedding service accepts. Only `content` is
/// embedded; the rest rides along as metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestRecord {
    pub id: String,
    pub content: String,
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Project harvest records into upsertable records.
///
/// Ids are `{type}-{index}` over the input ordering, so re-running ingestion
/// on the same harvest file overwrites rather than duplicates. Skipping a
/// blank record does not shift later ids.
pub fn prepare_records(records: &[HarvestRecord]) -> Vec<IngestRecord> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.content.trim().is_empty())
        .map(|(i, r)| IngestRecord {
            id: format!("{}-{}", r.kind, i),
            content: r.content.clone(),
            title: r.title.clone(),
            url: r.url.clone(),
            kind: r.kind.to_string(),
        })
        .collect()
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    namespace: &'a str,
    records: &'a [IngestRecord],
}

/// Client for the embedding service's upsert endpoint.
pub struct IngestClient {
    client: reqwest::Client,
    endpoint: String,
    namespace: String,
    batch_size: usize,
}

impl IngestClient {
    pub fn new(
        endpoint: String,
        api_key: Option<String>,
        namespace: String,
        batch_size: usize,
    ) -> Result<Self> {
        anyhow::ensure!(
            endpoint.starts_with("http://") || endpoint.starts_with("https://"),
            "ingest endpoint must be an http(s) URL"
        );
        anyhow::ensure!(batch_size >= 1, "batch size must be at least 1");

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            headers.insert(
                "api-key",
                HeaderValue::from_str(key.trim()).context("invalid ingest API key")?,
            );
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()
            .context("failed to build ingest HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            namespace,
            batch_size,
        })
    }

    /// Upsert all records in bounded batches. Fail-fast: the first failed
    /// batch ends the run. Returns the number of records upserted.
    pub async fn upsert_all(&self, records: &[IngestRecord]) -> Result<usize> {
        let mut sent = 0usize;
        for (batch_index, batch) in records.chunks(self.batch_size).enumerate() {
            let request = UpsertRequest {
                namespace: &self.namespace,
                records: batch,
            };
            let response = self
                .client
                .post(&self.endpoint)
                .json(&request)
                .send()
                .await
                .with_context(|| format!("upsert batch {} failed to send", batch_index + 1))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                error!(
                    batch = batch_index + 1,
                    %status,
                    payload = %serde_json::to_string(batch).unwrap_or_default(),
                    "upsert batch rejected"
                );
                anyhow::bail!("upsert batch {} rejected ({status}): {body}", batch_index + 1);
            }

            sent += batch.len();
            info!(batch = batch_index + 1, records = batch.len(), "batch upserted");
        }
        Ok(sent)
    }
}
