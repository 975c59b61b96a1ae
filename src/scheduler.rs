//! Scheduler guard
//!
//! Fires synchronization runs on a cron schedule evaluated in one fixed, named
//! timezone, so the same expression resolves to the same wall-clock moments on
//! every host. A compare-and-swap flag guarantees at most one run executes at a
//! time; a tick arriving while a run is in flight is dropped, not queued.

use crate::solr::DocumentSink;
use crate::store::LogStore;
use crate::sync::{SyncOutcome, SyncService};
use chrono::{DateTime, Datelike, Duration as ChronoDuration, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// All cron evaluation happens in this timezone, regardless of host settings
pub const SCHEDULER_TIMEZONE: Tz = chrono_tz::America::Lima;

/// Schedule errors
#[derive(Error, Debug)]
pub enum ScheduleError {
	/// Wrong number of cron fields
	#[error("Cron expression must have 5 fields, got {0}")]
	FieldCount(usize),

	/// Unparseable field
	#[error("Invalid cron field '{0}'")]
	InvalidField(String),

	/// Value outside the field's range
	#[error("Cron field '{raw}' out of range ({min}-{max})")]
	OutOfRange { raw: String, min: u32, max: u32 },

	/// The scan found no matching minute
	#[error("No upcoming fire time within 366 days of {0}")]
	NoUpcomingFire(String),
}

/// One cron field: `*`, `*/n`, or a single value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CronField {
	Any,
	Step(u32),
	At(u32),
}

impl CronField {
	fn matches(self, value: u32, min: u32) -> bool {
		match self {
			Self::Any => true,
			Self::Step(step) => (value - min) % step == 0,
			Self::At(at) => value == at,
		}
	}

	fn is_restricted(self) -> bool {
		!matches!(self, Self::Any)
	}
}

/// Parsed 5-field cron expression (minute, hour, day-of-month, month, day-of-week)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
	minute: CronField,
	hour: CronField,
	day_of_month: CronField,
	month: CronField,
	day_of_week: CronField,
	raw: String,
}

impl CronSchedule {
	/// Parse a 5-field cron expression. Fields accept `*`, `*/n`, or one value.
	pub fn parse(raw: &str) -> Result<Self, ScheduleError> {
		let trimmed = raw.trim();
		let parts: Vec<&str> = trimmed.split_whitespace().collect();
		if parts.len() != 5 {
			return Err(ScheduleError::FieldCount(parts.len()));
		}

		Ok(Self {
			minute: parse_field(parts[0], 0, 59)?,
			hour: parse_field(parts[1], 0, 23)?,
			day_of_month: parse_field(parts[2], 1, 31)?,
			month: parse_field(parts[3], 1, 12)?,
			day_of_week: parse_field(parts[4], 0, 7)?,
			raw: trimmed.to_string(),
		})
	}

	/// The raw expression, for log lines
	pub fn raw(&self) -> &str {
		&self.raw
	}

	/// Compute the next fire time strictly after `now`.
	///
	/// Scans forward minute-by-minute up to 366 days, in `now`'s timezone.
	pub fn next_after(&self, now: DateTime<Tz>) -> Result<DateTime<Tz>, ScheduleError> {
		let base = now
			.with_second(0)
			.and_then(|t| t.with_nanosecond(0))
			.unwrap_or(now);

		let max_minutes = 366 * 24 * 60;
		for offset in 1..=max_minutes {
			let candidate = base + ChronoDuration::minutes(offset);
			if self.matches(candidate) {
				return Ok(candidate);
			}
		}

		Err(ScheduleError::NoUpcomingFire(now.to_rfc3339()))
	}

	fn matches(&self, candidate: DateTime<Tz>) -> bool {
		if !self.minute.matches(candidate.minute(), 0) {
			return false;
		}
		if !self.hour.matches(candidate.hour(), 0) {
			return false;
		}
		if !self.month.matches(candidate.month(), 1) {
			return false;
		}

		let dom = self.day_of_month.matches(candidate.day(), 1);
		let dow = {
			// Both 0 and 7 mean Sunday
			let candidate_dow = candidate.weekday().num_days_from_sunday();
			match self.day_of_week {
				CronField::At(7) => candidate_dow == 0,
				field => field.matches(candidate_dow, 0),
			}
		};

		// Vixie cron: two restricted day fields combine with OR
		match (self.day_of_month.is_restricted(), self.day_of_week.is_restricted()) {
			(true, true) => dom || dow,
			_ => dom && dow,
		}
	}
}

fn parse_field(raw: &str, min: u32, max: u32) -> Result<CronField, ScheduleError> {
	if raw == "*" {
		return Ok(CronField::Any);
	}

	if let Some(step) = raw.strip_prefix("*/") {
		let step: u32 = step
			.parse()
			.map_err(|_| ScheduleError::InvalidField(raw.to_string()))?;
		if step == 0 || step > max {
			return Err(ScheduleError::OutOfRange {
				raw: raw.to_string(),
				min,
				max,
			});
		}
		return Ok(CronField::Step(step));
	}

	let value: u32 = raw
		.parse()
		.map_err(|_| ScheduleError::InvalidField(raw.to_string()))?;
	if value < min || value > max {
		return Err(ScheduleError::OutOfRange {
			raw: raw.to_string(),
			min,
			max,
		});
	}

	Ok(CronField::At(value))
}

/// Outcome of one scheduler tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
	/// A run was started and finished (possibly unsuccessfully)
	Ran(SyncOutcome),
	/// The previous run was still in flight; this tick was dropped
	Skipped,
}

/// Recurring trigger with a non-overlap guard.
///
/// The run-in-progress flag is the only state shared across ticks. It is
/// mutated exclusively through compare-and-swap here, and the reset runs even
/// when a synchronization task dies, so a crash inside one run can never wedge
/// the schedule.
pub struct SchedulerGuard<S, K> {
	service: Arc<SyncService<S, K>>,
	schedule: CronSchedule,
	run_in_progress: AtomicBool,
}

impl<S, K> SchedulerGuard<S, K>
where
	S: LogStore + 'static,
	K: DocumentSink + 'static,
{
	pub fn new(service: SyncService<S, K>, schedule: CronSchedule) -> Self {
		Self {
			service: Arc::new(service),
			schedule,
			run_in_progress: AtomicBool::new(false),
		}
	}

	/// Start a run unless one is already in flight.
	pub async fn try_tick(&self) -> TickOutcome {
		if self
			.run_in_progress
			.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
			.is_err()
		{
			info!("Ignoring tick, the previous run has not yet concluded");
			return TickOutcome::Skipped;
		}

		let service = Arc::clone(&self.service);
		let result = tokio::spawn(async move { service.run_once().await }).await;

		// Unconditional reset: a panicked run must not leave the flag stuck
		self.run_in_progress.store(false, Ordering::SeqCst);

		match result {
			Ok(outcome) => TickOutcome::Ran(outcome),
			Err(e) => {
				error!("Synchronization run aborted: {e}");
				TickOutcome::Ran(SyncOutcome::Aborted)
			}
		}
	}

	/// Sleep-and-tick loop, forever.
	pub async fn run(&self) -> Result<(), ScheduleError> {
		info!(
			"Scheduling synchronization with '{}' in {}",
			self.schedule.raw(),
			SCHEDULER_TIMEZONE
		);

		loop {
			let now = Utc::now().with_timezone(&SCHEDULER_TIMEZONE);
			let next = self.schedule.next_after(now)?;
			let wait = (next - now).to_std().unwrap_or_default();

			debug!("Next synchronization tick at {next}");
			tokio::time::sleep(wait).await;

			info!(
				"Executing synchronization tick at {}",
				Utc::now().with_timezone(&SCHEDULER_TIMEZONE).format("%Y-%m-%d %H:%M:%S %Z")
			);
			self.try_tick().await;
		}
	}
}
