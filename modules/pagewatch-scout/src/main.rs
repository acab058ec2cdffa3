use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use pagewatch_common::Config;
use pagewatch_scout::{TaskChecker, TaskScheduler, TaskService, TaskStore};
use pagewatch_store::PgStore;
use pagewatch_web::{ExtractorChain, HttpFetcher, PageFetcher};

#[derive(Parser)]
#[command(name = "pagewatch", about = "Watch pages and boards for a keyword")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one scheduling pass over all due tasks
    Run,
    /// Run scheduling passes on a fixed timer until interrupted
    Watch,
    /// Create a task
    Add {
        url: String,
        keyword: String,
        /// Minutes between checks
        #[arg(long, default_value_t = 60)]
        interval: i32,
    },
    /// Delete a task and everything recorded for it
    Remove { id: Uuid },
    /// Stop checking a task
    Pause { id: Uuid },
    /// Resume checking a paused task
    Resume { id: Uuid },
    /// Check a task now, regardless of its schedule
    Check { id: Uuid },
    /// List tasks
    Tasks,
    /// Show recent alerts
    Alerts {
        #[arg(long)]
        limit: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json)?;

    let config = Config::from_env()?;
    config.log_redacted();

    let store = PgStore::connect(&config.database_url)
        .await
        .context("connecting to database")?;
    store.migrate().await?;
    let store: Arc<dyn TaskStore> = Arc::new(store);

    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(config.crawl.fetch_timeout)?);
    let extractor = Arc::new(ExtractorChain::standard(fetcher.clone()));
    let checker = Arc::new(TaskChecker::new(
        store.clone(),
        fetcher,
        extractor,
        config.crawl.clone(),
    ));
    let scheduler = TaskScheduler::new(store.clone(), checker.clone());
    let service = TaskService::new(store, checker);

    match cli.command {
        Command::Run => print_json(&scheduler.check_all().await?)?,
        Command::Watch => {
            scheduler
                .watch(config.watch_interval, async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!(error = %e, "Cannot listen for Ctrl-C");
                        std::future::pending::<()>().await;
                    }
                    info!("Interrupted, stopping");
                })
                .await
        }
        Command::Add {
            url,
            keyword,
            interval,
        } => print_json(&service.create_task(&url, &keyword, interval).await?)?,
        Command::Remove { id } => service.delete_task(id).await?,
        Command::Pause { id } => service.set_active(id, false).await?,
        Command::Resume { id } => service.set_active(id, true).await?,
        Command::Check { id } => print_json(&service.check_now(id).await?)?,
        Command::Tasks => print_json(&service.list_tasks().await?)?,
        Command::Alerts { limit } => print_json(&service.recent_alerts(limit).await?)?,
    }

    Ok(())
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("pagewatch=info".parse()?);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
