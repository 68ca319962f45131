use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dashboard_api::DashboardClient;
use nagios_bridge::{
    load_exposure_map, ApiKeys, BatchSink, BridgeConfig, DashboardSink, DrySink, ExposureRules,
    NagiosPaths, PollSchedule, Poller, Scheduler, StatusFile, TickOutcome, TokenRefreshJob,
    TOKEN_REFRESH_CRON,
};

#[derive(Parser, Debug)]
#[command(name = "nagios-bridge")]
#[command(about = "Forward Nagios host and service status to a status dashboard")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the bridge on its poll schedule
    Start {
        /// Path to the bridge configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Log feed results instead of sending them
        #[arg(long)]
        dry_run: bool,

        /// Run a single tick and exit
        #[arg(long)]
        once: bool,
    },

    /// Validate the configuration and object cache, then print the feeds
    Check {
        /// Path to the bridge configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("nagios_bridge=info")),
        )
        .init();

    match Args::parse().command {
        Command::Start {
            config,
            dry_run,
            once,
        } => start(&config, dry_run, once).await,
        Command::Check { config } => check(&config),
    }
}

fn load(config_path: &Path) -> Result<(BridgeConfig, NagiosPaths)> {
    let config = BridgeConfig::load(config_path)
        .with_context(|| format!("invalid configuration in {}", config_path.display()))?;
    let paths = NagiosPaths::load(&config.nagios_config_file_path)?;
    Ok((config, paths))
}

/// Validate everything and print a per-entity summary of the feeds
fn check(config_path: &Path) -> Result<()> {
    let (config, paths) = load(config_path)?;
    let map = load_exposure_map(&config.rules, &paths.object_cache_file)?;

    println!("object cache: {}", paths.object_cache_file.display());
    println!("status file:  {}", paths.status_file.display());
    println!("schedule:     {}", config.poll_schedule.expr());
    println!();

    for (host, feeds) in map.hosts() {
        println!("host {host}");
        for feed in feeds {
            println!("  {} '{}'", feed.integration_id, feed.name);
        }
    }
    for (service, feeds) in map.services() {
        println!("service {service}");
        for feed in feeds {
            println!("  {} '{}'", feed.integration_id, feed.name);
            for dependency in &feed.dependencies {
                println!("    depends on {dependency}");
            }
        }
    }

    println!();
    println!("{} feeds", map.feed_count());
    Ok(())
}

async fn start(config_path: &Path, dry_run: bool, once: bool) -> Result<()> {
    let (config, paths) = load(config_path)?;
    let map = Arc::new(load_exposure_map(&config.rules, &paths.object_cache_file)?);
    let source = StatusFile::new(&paths.status_file);

    if dry_run {
        info!("dry run, results will be logged only");
        let poller = Poller::new(source, DrySink, map, config.batch_size);
        return run(poller, &config, &paths, once).await;
    }

    let client = DashboardClient::builder()
        .upsert_endpoint(&config.api.upsert_endpoint)
        .token_endpoint(&config.api.jwt_key_refresh_endpoint)
        .timeout(config.api.request_timeout)
        .build()?;
    let keys = ApiKeys::new(&config.api.keys);

    let refresh = Arc::new(TokenRefreshJob::new(keys.clone(), client.clone()));
    refresh.refresh().await;
    let refresh_handle =
        Scheduler::default().spawn(refresh, PollSchedule::parse(TOKEN_REFRESH_CRON)?);

    let poller = Poller::new(source, DashboardSink::new(client, keys), map, config.batch_size);
    let result = run(poller, &config, &paths, once).await;

    refresh_handle.stop().await;
    result
}

async fn run<K: BatchSink + 'static>(
    poller: Poller<StatusFile, K>,
    config: &BridgeConfig,
    paths: &NagiosPaths,
    once: bool,
) -> Result<()> {
    if once {
        return match poller.tick().await {
            TickOutcome::Failed { error, .. } => Err(error.into()),
            outcome => {
                info!(report = ?outcome.report(), "tick finished");
                Ok(())
            }
        };
    }

    let poller = Arc::new(poller);
    let handle = Scheduler::default().spawn(poller.clone(), config.poll_schedule.clone());

    let result = wait_for_shutdown(&poller, &config.rules, &paths.object_cache_file).await;

    info!("shutting down");
    handle.stop().await;
    result
}

#[cfg(unix)]
fn reload<K: BatchSink>(
    poller: &Poller<StatusFile, K>,
    rules: &ExposureRules,
    object_cache: &Path,
) {
    match load_exposure_map(rules, object_cache) {
        Ok(map) => {
            info!(feeds = map.feed_count(), "exposure map reloaded");
            poller.replace_exposures(Arc::new(map));
        }
        Err(e) => error!(error = %e, "reload failed, keeping the previous exposure map"),
    }
}

#[cfg(unix)]
async fn wait_for_shutdown<K: BatchSink>(
    poller: &Poller<StatusFile, K>,
    rules: &ExposureRules,
    object_cache: &Path,
) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => return result.map_err(Into::into),
            _ = hangup.recv() => {
                info!("SIGHUP received, reloading object cache");
                reload(poller, rules, object_cache);
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown<K: BatchSink>(
    _poller: &Poller<StatusFile, K>,
    _rules: &ExposureRules,
    _object_cache: &Path,
) -> Result<()> {
    tokio::signal::ctrl_c().await.map_err(Into::into)
}
