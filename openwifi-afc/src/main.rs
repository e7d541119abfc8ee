//! openwifi-afc: AFC channel agent for an openwifi access point.
//!
//! On startup the agent asks the AFC portal which 6GHz channels it may use,
//! moves the access point to the 5GHz partner of the lowest granted
//! channel, then accepts `set <channel>` commands on stdin.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

mod afc;
mod ap;
mod config;
mod coordinator;
mod dispatcher;
mod logging;
mod startup;
#[cfg(test)]
mod testing;

use afc::{AfcClient, Credentials, HttpsTransport, PortalEndpoints};
use ap::{ApController, DryRunController, HostapdController};
use coordinator::{Coordinator, InquiryParams};

const DEFAULT_RETENTION_DAYS: u64 = 7;

/// openwifi-afc - AFC channel agent for openwifi
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "afc.toml")]
    config: PathBuf,

    /// Directory where log files are stored
    #[arg(short, long)]
    logfile: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log access point changes instead of applying them
    #[arg(long)]
    dry_run: bool,

    /// Skip the startup inquiry
    #[arg(long)]
    skip_startup: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let file_config = match config::load_config(&args.config) {
        Ok(c) => {
            eprintln!("Loaded config from: {}", args.config.display());
            c
        }
        Err(e) => {
            eprintln!("Failed to load config file: {}", e);
            return Err(e.into());
        }
    };

    // Command line takes precedence over the config file
    let log_dir = args
        .logfile
        .clone()
        .or_else(|| file_config.logging.log_dir.as_ref().map(PathBuf::from));
    let log_retention_days = file_config
        .logging
        .retention_days
        .unwrap_or(DEFAULT_RETENTION_DAYS);
    logging::init_logging(
        log_dir.as_deref(),
        log_retention_days,
        args.verbose,
        file_config.logging.level.as_deref(),
    )?;

    let connection = &file_config.connection;
    let transport = HttpsTransport::new(connection.timeout(), !connection.insecure_skip_verify)?;
    let endpoints = PortalEndpoints::from_config(connection);
    let client = AfcClient::new(
        transport,
        endpoints,
        Credentials::from(&file_config.account),
    );
    info!("AFC portal: {}", client.endpoints().base_url);

    let controller: Arc<dyn ApController> = if args.dry_run {
        info!("Dry run: the access point will not be modified");
        Arc::new(DryRunController)
    } else {
        let hostapd = HostapdController::from_config(&file_config.openwifi);
        info!("hostapd config: {}", hostapd.config_path().display());
        Arc::new(hostapd)
    };

    let params = InquiryParams {
        device: file_config.ap.clone(),
        channel_classes: file_config.inquiry.channel_classes.clone(),
        frequency_ranges: file_config.inquiry.frequency_ranges.clone(),
    };
    let mut coordinator = Coordinator::new(client, controller, params)
        .with_policy(file_config.inquiry.selection.policy());

    if args.skip_startup {
        info!("Startup inquiry skipped");
    } else {
        startup::run_startup(&mut coordinator).await;
    }

    let (tx, rx) = dispatcher::command_queue();
    if let Err(e) = dispatcher::spawn_stdin_producer(tx) {
        error!("Failed to start command input: {}", e);
        return Err(e.into());
    }

    let consumer = tokio::spawn(async move {
        dispatcher::run_consumer(rx, &mut coordinator).await
    });

    dispatcher::run_until_shutdown(consumer, async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down..."),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    })
    .await;

    info!("Shutdown complete.");
    Ok(())
}
