//! Log entry entity, one row per log event awaiting or having completed indexing

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "log_entries")]
pub struct Model {
	/// Monotonically assigned by the store
	#[sea_orm(primary_key)]
	pub id: i64,

	pub timestamp: DateTimeUtc,

	/// Raw log payload text
	pub data: String,

	pub source: String,

	pub hostname: String,

	pub appname: String,

	/// Flipped to true only after the index confirms receipt
	#[sea_orm(indexed)]
	pub is_indexed: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
