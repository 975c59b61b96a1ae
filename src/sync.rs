//! Sync orchestrator
//!
//! One synchronization run: fetch a batch of unindexed records, map them to
//! documents, submit to the index, and mark the whole batch indexed only after
//! the submission succeeds. Commitment is all-or-nothing per run; a failed
//! submission leaves every record eligible for the next run.

use crate::mapper::{map_to_documents, MappingStrategy};
use crate::solr::DocumentSink;
use crate::store::LogStore;
use std::collections::BTreeSet;
use tracing::{error, info, warn};

/// How one synchronization run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
	/// The store had nothing to synchronize
	NothingToIndex,
	/// The batch was submitted and committed
	Indexed { records: usize, documents: usize },
	/// The index refused the batch; no record was marked
	SubmitFailed,
	/// The run task died before producing an outcome (set by the scheduler)
	Aborted,
}

/// Run-once synchronization over the store and sink seams
pub struct SyncService<S, K> {
	store: S,
	sink: K,
	strategy: MappingStrategy,
}

impl<S: LogStore, K: DocumentSink> SyncService<S, K> {
	pub fn new(store: S, sink: K, strategy: MappingStrategy) -> Self {
		Self { store, sink, strategy }
	}

	/// Execute one synchronization run.
	///
	/// Never fails outward: every internal failure is logged and folded into
	/// the returned [`SyncOutcome`].
	pub async fn run_once(&self) -> SyncOutcome {
		info!("Synchronization started");

		let records = self.store.fetch_unindexed_batch().await;
		if records.is_empty() {
			info!("Synchronization ended: no documents to index");
			return SyncOutcome::NothingToIndex;
		}

		let documents = map_to_documents(&records, self.strategy);

		if let Err(e) = self.sink.submit(&documents).await {
			error!("Submission failed, not marking any record as indexed: {e}");
			info!("Synchronization ended unsuccessfully");
			return SyncOutcome::SubmitFailed;
		}

		// Every fetched record is marked, including those whose payload
		// produced zero fragments. Set semantics: each id exactly once.
		let ids: Vec<i64> = records
			.iter()
			.map(|record| record.id)
			.collect::<BTreeSet<_>>()
			.into_iter()
			.collect();

		if let Err(e) = self.store.mark_indexed(&ids).await {
			// The submission stands; the store and the index disagree until the
			// next run re-submits these records.
			warn!("Failed to mark {} records as indexed: {e}", ids.len());
		}

		info!("Synchronization ended successfully");

		SyncOutcome::Indexed {
			records: records.len(),
			documents: documents.len(),
		}
	}
}
