use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::capture::BrowserCapture;
use crate::config::{Config, init};
use crate::listing::{RelayListing, RoomSource};
use crate::monitor::{Monitor, MonitorSettings};
use crate::notify::TelegramNotifier;

#[derive(Parser)]
#[command(name = "gartic-room-watcher")]
#[command(about = "Watches a Gartic room and posts screenshots to Telegram", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the self-test, then monitor the target room until interrupted
    Run {
        /// KEY=VALUE override file, read when present
        #[arg(short, long, default_value = "tex.txt")]
        env_file: PathBuf,

        /// Stop after this many checks (0 means no limit)
        #[arg(short, long, default_value = "0")]
        max_checks: u64,

        /// Log level (trace, debug, info, warn, error)
        #[arg(short, long)]
        log_level: Option<String>,

        /// Directory for temporary screenshots
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Fetch the room listing once and print it
    ListRooms {
        /// KEY=VALUE override file, read when present
        #[arg(short, long, default_value = "tex.txt")]
        env_file: PathBuf,
    },
}

/// CLI entry point
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            env_file,
            max_checks,
            log_level,
            output_dir,
        } => {
            start_monitor(env_file, max_checks, log_level, output_dir).await?;
        }
        Commands::ListRooms { env_file } => {
            list_rooms(env_file).await?;
        }
    }

    Ok(())
}

/// Fetches the listing once and prints every room, marking the target
async fn list_rooms(env_file: PathBuf) -> Result<()> {
    let config = Config::load_from(&env_file)?;
    let source = RelayListing::new(&config.listing);

    println!("Fetching {}\n", source.url());
    let listing = source
        .fetch_rooms()
        .await
        .context("Failed to fetch room listing")?;
    let rooms = listing.rooms();

    if listing.is_empty() {
        println!("No active rooms");
    } else {
        if rooms.len() < listing.len() {
            println!("Skipped {} malformed entries\n", listing.len() - rooms.len());
        }
        println!("{} active rooms:\n", rooms.len());
        for (idx, room) in rooms.iter().enumerate() {
            let marker = if room.code == config.target_room { " <- target" } else { "" };
            println!("  [{}] {} {}{}", idx + 1, room.code, room.occupancy(), marker);
        }
    }

    if !rooms.iter().any(|room| room.code == config.target_room) {
        println!("\nTarget room {} is not active", config.target_room);
    }

    Ok(())
}

/// Loads the configuration, runs the self-test and monitors until interrupted
async fn start_monitor(
    env_file: PathBuf,
    max_checks: u64,
    log_level: Option<String>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = Config::load_from(&env_file)?;

    if let Some(level) = log_level {
        config.logging.level = level;
    }
    if let Some(dir) = output_dir {
        config.capture.output_dir = dir;
    }
    init::init(&config.logging);

    info!("Starting Gartic room watcher v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", config);

    std::fs::create_dir_all(&config.capture.output_dir).with_context(|| {
        format!(
            "Failed to create screenshot directory {}",
            config.capture.output_dir.display()
        )
    })?;

    let mut monitor = Monitor::new(
        MonitorSettings::from_config(&config, max_checks),
        Arc::new(RelayListing::new(&config.listing)),
        Arc::new(BrowserCapture::new(config.capture.clone())),
        Arc::new(TelegramNotifier::new(config.telegram.clone())),
    );

    monitor.self_test().await?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                signal_token.cancel();
            }
            Err(e) => warn!("Failed to listen for interrupt: {}", e),
        }
    });

    let summary = monitor.run(cancel).await?;
    info!(
        "Monitor exited after {} checks and {} screenshots",
        summary.checks, summary.screenshots
    );

    Ok(())
}
