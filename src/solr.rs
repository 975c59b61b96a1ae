//! Index submitter
//!
//! Bulk-submits mapped documents to the search index over HTTP and requests an
//! explicit commit, so accepted documents become query-visible immediately.
//! Failures are reported, never retried here; the next scheduled run is the
//! retry policy.

use crate::mapper::IndexDocument;
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, error, info};

/// Submission errors
#[derive(Error, Debug)]
pub enum SubmitError {
	/// Transport or serialization error
	#[error("Index request failed: {0}")]
	Transport(#[from] reqwest::Error),

	/// The index answered with a non-success status
	#[error("Index rejected the submission with status {status}")]
	Rejected { status: StatusCode },
}

/// Result type for submissions
pub type Result<T> = std::result::Result<T, SubmitError>;

/// Destination for one run's worth of documents
#[async_trait]
pub trait DocumentSink: Send + Sync {
	/// Submit the full document batch in one request and commit it
	async fn submit(&self, documents: &[IndexDocument]) -> Result<()>;
}

/// Solr bulk-ingest client with basic authentication
pub struct SolrClient {
	http: reqwest::Client,
	url: String,
	username: String,
	password: String,
}

impl SolrClient {
	pub fn new(url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
		Self {
			http: reqwest::Client::new(),
			url: url.into(),
			username: username.into(),
			password: password.into(),
		}
	}
}

#[async_trait]
impl DocumentSink for SolrClient {
	async fn submit(&self, documents: &[IndexDocument]) -> Result<()> {
		let first = documents.first().map_or("<empty>", |d| d.id.as_str());
		let last = documents.last().map_or("<empty>", |d| d.id.as_str());
		info!(
			"Submitting {} documents to the index, from {first} to {last}",
			documents.len()
		);

		let response = self
			.http
			.post(&self.url)
			.query(&[("wt", "json"), ("commit", "true")])
			.basic_auth(&self.username, Some(&self.password))
			.json(documents)
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			error!("Index rejected the submission with {status}: {body}");
			return Err(SubmitError::Rejected { status });
		}

		let body = response.text().await.unwrap_or_default();
		debug!("Index response: {body}");
		info!(
			"Submitted and committed {} documents, from {first} to {last}",
			documents.len()
		);

		Ok(())
	}
}
