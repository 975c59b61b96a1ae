use anyhow::{Context, Result};
use clap::Parser;
use logsync::config::SyncConfig;
use logsync::db::Database;
use logsync::scheduler::{CronSchedule, SchedulerGuard};
use logsync::solr::SolrClient;
use logsync::store::DbLogStore;
use logsync::sync::SyncService;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "logsync-daemon", about = "Log store to search index synchronization daemon")]
struct Args {
	/// Run one synchronization immediately and exit instead of scheduling
	#[arg(long)]
	once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("logsync=info")))
		.with(fmt::layer())
		.init();

	// Fail fast: configuration and schedule must be valid before anything runs
	let config = SyncConfig::from_env().context("Configuration is incomplete")?;
	let schedule = CronSchedule::parse(&config.cron_schedule)
		.with_context(|| format!("Invalid CRON_SCHEDULE '{}'", config.cron_schedule))?;
	let strategy = config.mapping_strategy();

	let db = Database::connect(&config.database_url)
		.await
		.context("Failed to connect to the log store")?;
	db.migrate()
		.await
		.context("Failed to prepare the log store schema")?;

	let store = DbLogStore::new(db.conn().clone());
	let sink = SolrClient::new(config.solr_url, config.solr_username, config.solr_password);
	let service = SyncService::new(store, sink, strategy);

	if args.once {
		let outcome = service.run_once().await;
		info!("Single synchronization finished: {outcome:?}");
		return Ok(());
	}

	let guard = SchedulerGuard::new(service, schedule);

	let ctrl_c = async {
		signal::ctrl_c()
			.await
			.expect("failed to install Ctrl+C handler");
	};

	#[cfg(unix)]
	let terminate = async {
		signal::unix::signal(signal::unix::SignalKind::terminate())
			.expect("failed to install signal handler")
			.recv()
			.await;
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		result = guard.run() => {
			result.context("Scheduler stopped")?;
		}
		() = ctrl_c => {
			info!("Received Ctrl+C, shutting down gracefully...");
		}
		() = terminate => {
			info!("Received SIGTERM, shutting down gracefully...");
		}
	}

	Ok(())
}
