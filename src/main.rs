//! Surveillance-console client CLI
//!
//! Runs the client session loop against a console server, plus a couple of
//! offline geometry helpers for checking overlays by hand.

use clap::{Parser, Subcommand};
use nearsight::{
    client::{ClientConfig, ConsoleClient},
    continuity::ContinuityMonitor,
    controller::{ClientSession, SessionConfig},
    geo,
    store::KvStore,
    types::LatLon,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "nearsight")]
#[command(about = "Client core for a Bluetooth/location surveillance console", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the persistent client state file
    #[arg(short, long, default_value = "nearsight.json")]
    state_path: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a console server and run the session loop
    Run {
        /// Console server base URL
        #[arg(long, env = "NEARSIGHT_URL", default_value = "http://127.0.0.1:8080")]
        url: String,

        /// Device poll interval in seconds
        #[arg(short, long, default_value = "5")]
        interval: u64,
    },

    /// Compute distance and bearing between two coordinates
    Distance {
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
    },

    /// Print a CEP ring around a point (for checking map overlays)
    Cep {
        lat: f64,
        lon: f64,
        /// Radius in meters
        #[arg(short, long, default_value = "50")]
        radius: f64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Run { url, interval } => {
            run_session(&cli.state_path, url, interval).await?;
        }

        Commands::Distance {
            lat1,
            lon1,
            lat2,
            lon2,
        } => {
            let a = LatLon::new(lat1, lon1);
            let b = LatLon::new(lat2, lon2);
            println!("Distance: {:.1} m", geo::distance_m(a, b));
            println!("Bearing:  {:.1}°", geo::bearing_deg(a, b));
        }

        Commands::Cep { lat, lon, radius } => {
            let ring = geo::cep_ring(LatLon::new(lat, lon), radius);
            println!("CEP ring: {} points, radius {} m", ring.len(), radius);
            for p in &ring {
                println!("{:.6},{:.6}", p.lon, p.lat);
            }
        }
    }

    Ok(())
}

async fn run_session(
    state_path: &PathBuf,
    url: String,
    interval: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Connecting to console at {}", url);
    tracing::info!("State path: {}", state_path.display());
    tracing::info!("Poll interval: {}s", interval);

    let client = ConsoleClient::new(ClientConfig::new(url))?;
    let monitor = ContinuityMonitor::new(KvStore::open(state_path)?);
    let config = SessionConfig {
        poll_interval: Duration::from_secs(interval),
        ..Default::default()
    };

    let mut session = ClientSession::new(client, monitor, config);
    session.connect().await?;

    let stats = session.stats();

    // Stats reporting task
    let stats_handle = {
        let stats = stats.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(10));
            loop {
                interval.tick().await;
                let s = stats.snapshot();
                tracing::info!(
                    "Stats: messages={}, snapshots={}, gps_fixes={}, resets={}, errors={}",
                    s.messages,
                    s.snapshots,
                    s.gps_fixes,
                    s.resets,
                    s.errors
                );
            }
        })
    };

    // The push transport would feed this sender; without one the loop
    // still polls snapshots and reconciles track sessions.
    let (push_tx, push_rx) = mpsc::channel(256);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = session.run(push_rx) => {}
    }

    drop(push_tx);
    stats_handle.abort();

    let s = stats.snapshot();
    tracing::info!("Final statistics:");
    tracing::info!("  Messages handled: {}", s.messages);
    tracing::info!("  Snapshots merged: {}", s.snapshots);
    tracing::info!("  GPS fixes kept: {}", s.gps_fixes);
    tracing::info!("  Full resets: {}", s.resets);
    tracing::info!("  Errors: {}", s.errors);

    Ok(())
}
