//! Document mapper
//!
//! Pure transformation of store records into index-submission documents. The
//! submission strategy is chosen once at startup from configuration: either one
//! document per record, or fixed-size payload fragments when a fragment limit
//! is configured.

use crate::db::entities::log_entry;
use chrono::SecondsFormat;
use serde::Serialize;
use std::num::NonZeroUsize;
use uuid::Uuid;

/// One bulk-submission document as the index expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDocument {
	/// String form of the source record id; repeats across fragments of one record
	pub id: String,
	/// ISO-8601 timestamp
	pub timestamp: String,
	/// Full payload text
	pub data: String,
	/// Exact-match fragment, present only under fragmented mapping
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data_exact: Option<String>,
	/// Token shared by all fragments of one record
	#[serde(skip_serializing_if = "Option::is_none")]
	pub group_id: Option<String>,
	pub source: String,
	pub hostname: String,
	pub appname: String,
}

/// How records become documents, fixed for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingStrategy {
	/// One document per record
	Single,
	/// One document per payload chunk of at most `limit` characters
	Fragmented { limit: NonZeroUsize },
}

/// Map a batch of records into submission documents.
///
/// Pure, no I/O. The only non-determinism is the fragment group token, freshly
/// generated per record per call. Under [`MappingStrategy::Fragmented`] a
/// record with an empty payload yields zero documents; it is still part of the
/// batch and still gets marked indexed after a successful submission.
pub fn map_to_documents(records: &[log_entry::Model], strategy: MappingStrategy) -> Vec<IndexDocument> {
	match strategy {
		MappingStrategy::Single => records.iter().map(document_for).collect(),
		MappingStrategy::Fragmented { limit } => records
			.iter()
			.flat_map(|record| fragment_record(record, limit.get()))
			.collect(),
	}
}

fn document_for(record: &log_entry::Model) -> IndexDocument {
	IndexDocument {
		id: record.id.to_string(),
		timestamp: record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
		data: record.data.clone(),
		data_exact: None,
		group_id: None,
		source: record.source.clone(),
		hostname: record.hostname.clone(),
		appname: record.appname.clone(),
	}
}

fn fragment_record(record: &log_entry::Model, limit: usize) -> Vec<IndexDocument> {
	let group_id = Uuid::new_v4().to_string();
	let chars: Vec<char> = record.data.chars().collect();

	chars
		.chunks(limit)
		.map(|chunk| {
			let mut document = document_for(record);
			document.data_exact = Some(chunk.iter().collect());
			document.group_id = Some(group_id.clone());
			document
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{TimeZone, Utc};
	use pretty_assertions::assert_eq;

	fn record(id: i64, data: &str) -> log_entry::Model {
		log_entry::Model {
			id,
			timestamp: Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap(),
			data: data.to_string(),
			source: "syslog".to_string(),
			hostname: "edge-01".to_string(),
			appname: "gateway".to_string(),
			is_indexed: false,
		}
	}

	fn limit(n: usize) -> MappingStrategy {
		MappingStrategy::Fragmented {
			limit: NonZeroUsize::new(n).unwrap(),
		}
	}

	#[test]
	fn single_strategy_maps_one_document_per_record() {
		let records = vec![record(1, "alpha"), record(2, ""), record(3, "gamma")];

		let documents = map_to_documents(&records, MappingStrategy::Single);

		assert_eq!(documents.len(), 3);
		assert_eq!(documents[0].id, "1");
		assert_eq!(documents[0].data, "alpha");
		assert_eq!(documents[0].data_exact, None);
		assert_eq!(documents[0].group_id, None);
		// Empty payloads still produce a document in single mode
		assert_eq!(documents[1].data, "");
	}

	#[test]
	fn timestamp_renders_with_millisecond_precision() {
		let documents = map_to_documents(&[record(7, "x")], MappingStrategy::Single);

		assert_eq!(documents[0].timestamp, "2024-05-17T09:30:00.000Z");
	}

	#[test]
	fn fragments_partition_payloads_by_character_count() {
		let records = vec![record(1, "abcde"), record(2, "abcdefghijkl"), record(3, "")];

		let documents = map_to_documents(&records, limit(10));

		// Lengths [5], [10, 2], [] -- three documents total
		assert_eq!(documents.len(), 3);
		assert_eq!(documents[0].data_exact.as_deref(), Some("abcde"));
		assert_eq!(documents[1].data_exact.as_deref(), Some("abcdefghij"));
		assert_eq!(documents[2].data_exact.as_deref(), Some("kl"));

		// Every fragment keeps the full payload and the record id
		assert_eq!(documents[1].id, "2");
		assert_eq!(documents[2].id, "2");
		assert_eq!(documents[1].data, "abcdefghijkl");
		assert_eq!(documents[2].data, "abcdefghijkl");
	}

	#[test]
	fn fragments_of_one_record_share_a_group_token() {
		let documents = map_to_documents(&[record(1, "abcdefghijkl")], limit(5));

		assert_eq!(documents.len(), 3);
		let group = documents[0].group_id.clone().unwrap();
		assert!(documents.iter().all(|d| d.group_id.as_ref() == Some(&group)));
	}

	#[test]
	fn group_tokens_differ_across_records() {
		let records = vec![record(1, "aaa"), record(2, "bbb")];

		let documents = map_to_documents(&records, limit(10));

		assert_eq!(documents.len(), 2);
		assert_ne!(documents[0].group_id, documents[1].group_id);
	}

	#[test]
	fn fragments_cover_the_payload_with_no_gaps_or_overlaps() {
		let payload = "žluťoučký kůň úpěl ďábelské ódy";
		let documents = map_to_documents(&[record(9, payload)], limit(4));

		let reassembled: String = documents
			.iter()
			.map(|d| d.data_exact.clone().unwrap())
			.collect();
		assert_eq!(reassembled, payload);

		for document in &documents {
			assert!(document.data_exact.as_ref().unwrap().chars().count() <= 4);
		}
	}

	#[test]
	fn empty_payload_yields_zero_fragments() {
		let documents = map_to_documents(&[record(4, "")], limit(10));

		assert_eq!(documents, Vec::new());
	}

	#[test]
	fn payload_shorter_than_limit_yields_exactly_one_fragment() {
		let documents = map_to_documents(&[record(5, "tiny")], limit(100));

		assert_eq!(documents.len(), 1);
		assert_eq!(documents[0].data_exact.as_deref(), Some("tiny"));
	}

	#[test]
	fn fragment_fields_are_omitted_from_json_in_single_mode() {
		let documents = map_to_documents(&[record(11, "payload")], MappingStrategy::Single);

		let json = serde_json::to_value(&documents[0]).unwrap();
		assert!(json.get("data_exact").is_none());
		assert!(json.get("group_id").is_none());
		assert_eq!(json["id"], "11");
		assert_eq!(json["source"], "syslog");
		assert_eq!(json["hostname"], "edge-01");
		assert_eq!(json["appname"], "gateway");
	}

	#[test]
	fn fragment_fields_are_present_in_json_in_fragmented_mode() {
		let documents = map_to_documents(&[record(12, "payload")], limit(3));

		let json = serde_json::to_value(&documents[0]).unwrap();
		assert_eq!(json["data_exact"], "pay");
		assert!(json.get("group_id").is_some());
	}
}
