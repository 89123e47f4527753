//! Feedrelay main entry point
//!
//! This is the command-line interface for the Feedrelay article relay.

use clap::Parser;
use feedrelay::config::{load_config_with_hash, Config};
use feedrelay::crawler::{import_sources, HttpFetcher, SweepRunner};
use feedrelay::delivery::Deliverer;
use feedrelay::notify::TelegramNotifier;
use feedrelay::runtime::{drain_outbox, spawn_delivery_loop, spawn_sweep_loop};
use feedrelay::storage::{open_storage, SqliteStorage};
use feedrelay::{Clock, SystemClock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Feedrelay: a polite article relay
///
/// Feedrelay re-visits configured web pages, extracts new articles, and
/// announces each of them once on Telegram while honouring rate limits.
#[derive(Parser, Debug)]
#[command(name = "feedrelay")]
#[command(version)]
#[command(about = "A polite article relay", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the configured sources without running
    #[arg(long, conflicts_with_all = ["stats", "import_only", "once"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "import_only", "once"])]
    stats: bool,

    /// Store the configured sources and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "once"])]
    import_only: bool,

    /// Run a single sweep, deliver what it found, and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "import_only"])]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.import_only {
        handle_import(&config)?;
    } else if cli.once {
        handle_once(&config).await?;
    } else {
        handle_run(&config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("feedrelay=info,warn"),
            1 => EnvFilter::new("feedrelay=debug,info"),
            2 => EnvFilter::new("feedrelay=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Feedrelay Dry Run ===\n");

    println!("Scheduler:");
    println!("  Sweep interval: {}s", config.scheduler.sweep_interval);
    println!("  Max retries per sweep: {}", config.scheduler.max_retries);
    println!("  Visit timeout: {}s", config.scheduler.visit_timeout);

    println!("\nDelivery:");
    println!("  Tick interval: {}s", config.delivery.tick_interval);
    println!("  Default channel: {}", config.telegram.channel);
    println!("  API: {}", config.telegram.api_base);

    println!("\nDatabase: {}", config.database.path);
    println!("User agent: {}", config.fetcher.user_agent);

    println!("\nSources ({}):", config.sources.len());
    for source in &config.sources {
        println!("  - {} <{}>", source.name, source.url);
        println!(
            "    cards: {:?}, title: {:?}, link: {:?}",
            source.article_selector, source.title_selector, source.detail_selector
        );
        if !source.tags.is_empty() {
            println!("    tags: {}", source.tags.join(", "));
        }
        if !source.channels.is_empty() {
            println!("    channels: {}", source.channels.join(", "));
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use feedrelay::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.database.path);

    let storage = open_storage(Path::new(&config.database.path))?;
    let stats = load_statistics(&storage, config.scheduler.max_retries)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --import-only mode
fn handle_import(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(Path::new(&config.database.path))?;
    let imported = import_sources(&storage, config);
    println!(
        "✓ Imported {}/{} sources into {}",
        imported,
        config.sources.len(),
        config.database.path
    );
    Ok(())
}

struct Relay {
    runner: SweepRunner<SqliteStorage>,
    deliverer: Deliverer<SqliteStorage>,
}

/// Opens the store, imports sources, and wires the collaborators together
fn build_relay(config: &Config) -> Result<Relay, Box<dyn std::error::Error>> {
    let storage = Arc::new(open_storage(Path::new(&config.database.path))?);
    import_sources(storage.as_ref(), config);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let fetcher = Arc::new(HttpFetcher::new(&config.fetcher)?);
    let notifier = Arc::new(TelegramNotifier::new(&config.telegram));

    Ok(Relay {
        runner: SweepRunner::new(
            Arc::clone(&storage),
            fetcher,
            Arc::clone(&clock),
            config.scheduler.max_retries,
            config.scheduler.visit_timeout(),
        ),
        deliverer: Deliverer::new(storage, notifier, clock),
    })
}

/// Cancels the returned token on Ctrl+C
fn shutdown_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing current work");
            token.cancel();
        }
    });
    cancel
}

/// Handles the --once mode
async fn handle_once(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let Relay {
        runner,
        mut deliverer,
    } = build_relay(config)?;
    let cancel = shutdown_token();

    let report = runner.run_sweep(&cancel).await?;
    let delivered = drain_outbox(&mut deliverer, config.delivery.tick_interval(), &cancel).await?;

    println!("✓ Sweep: {}", report);
    println!("✓ Delivered {} article(s)", delivered);
    Ok(())
}

/// Handles the main relay operation: both loops until Ctrl+C
async fn handle_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let Relay { runner, deliverer } = build_relay(config)?;
    let cancel = shutdown_token();

    tracing::info!(
        "Relaying {} source(s): sweep every {}s, delivery tick every {}s",
        config.sources.len(),
        config.scheduler.sweep_interval,
        config.delivery.tick_interval
    );

    let sweeps = spawn_sweep_loop(runner, config.scheduler.sweep_interval(), cancel.clone());
    let deliveries =
        spawn_delivery_loop(deliverer, config.delivery.tick_interval(), cancel.clone());

    let (sweep_result, delivery_result) = tokio::join!(sweeps, deliveries);
    sweep_result?;
    delivery_result?;

    tracing::info!("Relay stopped");
    Ok(())
}
