//! Log store client
//!
//! Read side fetches bounded batches of unindexed records; write side flips the
//! indexed flag once the search index has confirmed a submission.

use crate::db::entities::{log_entry, LogEntry};
use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use thiserror::Error;
use tracing::{debug, error, info};

/// Upper bound on the number of records pulled per synchronization run
pub const FETCH_BATCH_SIZE: u64 = 2000;

/// Log store errors
#[derive(Error, Debug)]
pub enum StoreError {
	/// Query error
	#[error("Store query failed: {0}")]
	Query(#[from] DbErr),

	/// The update ran but no row confirmed it
	#[error("Indexed-state update not confirmed for any of {expected} records")]
	UpdateNotConfirmed { expected: usize },
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// The store operations the synchronization run depends on
#[async_trait]
pub trait LogStore: Send + Sync {
	/// Fetch up to [`FETCH_BATCH_SIZE`] unindexed records, ascending by id.
	///
	/// Never fails from the caller's point of view: a query error is logged and
	/// collapses to an empty batch, which callers must treat as "nothing to
	/// synchronize in this run".
	async fn fetch_unindexed_batch(&self) -> Vec<log_entry::Model>;

	/// Mark exactly the given records as indexed, returning the confirmed ids.
	///
	/// An unconfirmed update is an error, distinct from the no-op on an empty
	/// id set; callers must not assume partial success.
	async fn mark_indexed(&self, ids: &[i64]) -> Result<Vec<i64>>;
}

/// SeaORM-backed [`LogStore`]
pub struct DbLogStore {
	conn: DatabaseConnection,
}

impl DbLogStore {
	pub fn new(conn: DatabaseConnection) -> Self {
		Self { conn }
	}

	async fn try_fetch_unindexed(&self) -> Result<Vec<log_entry::Model>> {
		let records = LogEntry::find()
			.filter(log_entry::Column::IsIndexed.eq(false))
			.order_by_asc(log_entry::Column::Id)
			.limit(FETCH_BATCH_SIZE)
			.all(&self.conn)
			.await?;

		Ok(records)
	}
}

#[async_trait]
impl LogStore for DbLogStore {
	async fn fetch_unindexed_batch(&self) -> Vec<log_entry::Model> {
		match self.try_fetch_unindexed().await {
			Ok(records) => {
				if records.is_empty() {
					debug!("No unindexed log entries found");
				}
				records
			}
			Err(e) => {
				// Collapsed to an empty batch on purpose; the error level line
				// keeps a failing query distinguishable from an empty store.
				error!("Failed to fetch unindexed log entries: {e}");
				Vec::new()
			}
		}
	}

	async fn mark_indexed(&self, ids: &[i64]) -> Result<Vec<i64>> {
		if ids.is_empty() {
			return Ok(Vec::new());
		}

		let first = ids[0];
		let last = ids[ids.len() - 1];
		debug!("Marking {} log entries as indexed, from {first} to {last}", ids.len());

		let updated = LogEntry::update_many()
			.col_expr(log_entry::Column::IsIndexed, Expr::value(true))
			.filter(log_entry::Column::Id.is_in(ids.iter().copied()))
			.exec_with_returning(&self.conn)
			.await?;

		if updated.is_empty() {
			return Err(StoreError::UpdateNotConfirmed { expected: ids.len() });
		}

		info!("Marked {} log entries as indexed, from {first} to {last}", updated.len());

		Ok(updated.into_iter().map(|entry| entry.id).collect())
	}
}
