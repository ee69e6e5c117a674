//! CLI entry point: loads settings, wires a stdout sink, and runs the
//! ingestion pipeline until interrupted.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use clap::Parser;
use ingest_core::event::{DecodedMessage, Dispatcher, Sink};
use ingest_core::{CollectorSettings, Lifecycle};
use log::{error, info};

#[derive(Parser, Debug)]
#[command(name = "ingestd", about = "Raw-socket syslog ingestion daemon")]
struct Args {
    /// Path to the JSON settings file; created with defaults if absent.
    #[arg(short, long, default_value = "ingestd.json")]
    settings: PathBuf,

    /// Raise the log level from info to debug.
    #[arg(short, long)]
    verbose: bool,
}

/// Minimal concrete sink that writes decoded events to stdout. Real sinks are
/// an external concern; this one exists so the binary is runnable on its own.
struct StdoutSink;

impl Sink for StdoutSink {
    fn emit<'a>(
        &'a self,
        message: &'a DecodedMessage,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            println!(
                "{} {} sev={} fac={} {}",
                message.received_at.to_rfc3339(),
                message.event.source_ip,
                message.event.severity,
                message.event.facility,
                message.event.message,
            );
            Ok(())
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let settings = ingest_core::config::load_or_create(&args.settings)?;
    info!("loaded settings from {}", args.settings.display());

    let exit_code = run(settings).await;
    std::process::exit(exit_code);
}

async fn run(settings: CollectorSettings) -> i32 {
    if settings.use_tcp {
        error!("use_tcp is set, but this build only implements the raw-socket UDP core");
        return 1;
    }

    let mut dispatcher = Dispatcher::new();
    dispatcher.register(std::sync::Arc::new(StdoutSink));

    let lifecycle = Lifecycle::new(settings, dispatcher);
    if let Err(err) = lifecycle.start().await {
        error!("failed to start ingestion pipeline: {err:#}");
        return 1;
    }

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {err:#}");
    }
    info!("shutdown requested, stopping pipeline");

    let snapshot = lifecycle.stop().await;
    info!(
        "final metrics: datagrams_received={} bytes_received={} dispatched={} parse_errors_ip={} parse_errors_udp={} parse_errors_syslog={}",
        snapshot.datagrams_received,
        snapshot.bytes_received,
        snapshot.dispatched,
        snapshot.parse_errors_ip,
        snapshot.parse_errors_udp,
        snapshot.parse_errors_syslog,
    );

    0
}
