//! Process configuration
//!
//! Everything comes from the environment and is validated once at startup; a
//! missing or invalid required setting aborts the process before the scheduler
//! starts.

use crate::mapper::MappingStrategy;
use anyhow::{Context, Result};
use std::env;
use std::num::NonZeroUsize;

/// Fallback schedule: every minute
pub const DEFAULT_CRON_SCHEDULE: &str = "*/1 * * * *";

/// Validated process configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
	/// Store connection string
	pub database_url: String,

	/// Bulk-ingest endpoint of the search index
	pub solr_url: String,

	pub solr_username: String,
	pub solr_password: String,

	/// Cron expression driving the scheduler
	pub cron_schedule: String,

	/// When set, payloads are fragmented to this many characters per document;
	/// when unset, submission is one document per record
	pub fragment_limit: Option<NonZeroUsize>,
}

impl SyncConfig {
	/// Read and validate the configuration from the environment.
	pub fn from_env() -> Result<Self> {
		Ok(Self {
			database_url: required("DATABASE_URL")?,
			solr_url: required("SOLR_URL")?,
			solr_username: required("SOLR_USERNAME")?,
			solr_password: required("SOLR_PASSWORD")?,
			cron_schedule: env::var("CRON_SCHEDULE")
				.unwrap_or_else(|_| DEFAULT_CRON_SCHEDULE.to_string()),
			fragment_limit: fragment_limit_from_env()?,
		})
	}

	/// The mapping strategy this configuration selects
	pub fn mapping_strategy(&self) -> MappingStrategy {
		match self.fragment_limit {
			Some(limit) => MappingStrategy::Fragmented { limit },
			None => MappingStrategy::Single,
		}
	}
}

fn required(name: &str) -> Result<String> {
	env::var(name).with_context(|| format!("The environment variable '{name}' is not defined"))
}

fn fragment_limit_from_env() -> Result<Option<NonZeroUsize>> {
	let Ok(raw) = env::var("FRAGMENT_SIZE_LIMIT") else {
		return Ok(None);
	};

	let limit: usize = raw
		.trim()
		.parse()
		.with_context(|| format!("FRAGMENT_SIZE_LIMIT must be a positive integer, got '{raw}'"))?;
	let limit = NonZeroUsize::new(limit)
		.context("FRAGMENT_SIZE_LIMIT must be a positive integer, got '0'")?;

	Ok(Some(limit))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config(fragment_limit: Option<NonZeroUsize>) -> SyncConfig {
		SyncConfig {
			database_url: "postgres://localhost/logs".to_string(),
			solr_url: "http://localhost:8983/solr/logs/update".to_string(),
			solr_username: "solr".to_string(),
			solr_password: "secret".to_string(),
			cron_schedule: DEFAULT_CRON_SCHEDULE.to_string(),
			fragment_limit,
		}
	}

	#[test]
	fn fragment_limit_selects_the_fragmented_strategy() {
		let limit = NonZeroUsize::new(512).unwrap();

		assert_eq!(
			config(Some(limit)).mapping_strategy(),
			MappingStrategy::Fragmented { limit }
		);
		assert_eq!(config(None).mapping_strategy(), MappingStrategy::Single);
	}
}
