//! Create the log_entries table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
	async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.create_table(
				Table::create()
					.table(LogEntries::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(LogEntries::Id)
							.big_integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(
						ColumnDef::new(LogEntries::Timestamp)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.col(ColumnDef::new(LogEntries::Data).text().not_null())
					.col(ColumnDef::new(LogEntries::Source).text().not_null())
					.col(ColumnDef::new(LogEntries::Hostname).text().not_null())
					.col(ColumnDef::new(LogEntries::Appname).text().not_null())
					.col(
						ColumnDef::new(LogEntries::IsIndexed)
							.boolean()
							.not_null()
							.default(false),
					)
					.to_owned(),
			)
			.await?;

		// Partial scans for the fetch query hit this index
		manager
			.create_index(
				Index::create()
					.name("idx_log_entries_is_indexed")
					.table(LogEntries::Table)
					.col(LogEntries::IsIndexed)
					.to_owned(),
			)
			.await?;

		Ok(())
	}

	async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.drop_table(Table::drop().table(LogEntries::Table).to_owned())
			.await
	}
}

#[derive(DeriveIden)]
enum LogEntries {
	Table,
	Id,
	Timestamp,
	Data,
	Source,
	Hostname,
	Appname,
	IsIndexed,
}
