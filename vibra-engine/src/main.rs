//! Vibra engine demo runner - main entry point
//!
//! Loads a media catalog (or a bare timeline document), builds a capability
//! profile, and plays the timeline against a simulated playback clock,
//! logging every dispatched effect.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vibra_common::catalog::Catalog;
use vibra_common::config::resolve_config;
use vibra_common::events::PlaybackState;
use vibra_common::timeline::{Timeline, TimelineDocument};
use vibra_engine::actuator::ConsoleActuator;
use vibra_engine::capabilities::ActuatorCapabilities;
use vibra_engine::source::{PlaybackSource, SimulatedPlayer};
use vibra_engine::HapticsEngine;

/// Command-line arguments for the vibra demo runner
#[derive(Parser, Debug)]
#[command(name = "vibra-engine")]
#[command(about = "Timeline-synchronized haptic playback engine")]
#[command(version)]
struct Args {
    /// Media catalog JSON file
    #[arg(long, env = "VIBRA_CATALOG")]
    catalog: Option<PathBuf>,

    /// Catalog entry to play (defaults to the first)
    #[arg(long)]
    title: Option<String>,

    /// Bare timeline document JSON file (alternative to --catalog)
    #[arg(long, env = "VIBRA_TIMELINE")]
    timeline: Option<PathBuf>,

    /// Actuator capability tier: full, waveform-only, basic, none
    #[arg(long, default_value = "full")]
    capabilities: ActuatorCapabilities,

    /// Playback rate multiplier for the simulated clock
    #[arg(long, default_value_t = 1.0)]
    rate: f64,

    /// Media duration in ms (defaults to last event + 1s)
    #[arg(long)]
    duration_ms: Option<u64>,

    /// Seek to this position (ms) before playback starts
    #[arg(long)]
    start_at: Option<u64>,

    /// Run the pipeline without dispatching effects
    #[arg(long)]
    no_haptics: bool,

    /// Engine configuration TOML file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vibra_engine=debug,vibra_common=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = resolve_config(args.config.as_deref(), "VIBRA_CONFIG")
        .context("Failed to load engine configuration")?;

    // Pick the timeline to play
    let (title, document) = if let Some(path) = &args.catalog {
        let catalog = Catalog::load(path)
            .with_context(|| format!("Failed to load catalog {}", path.display()))?;
        let item = match &args.title {
            Some(title) => catalog
                .find_by_title(title)
                .with_context(|| format!("No catalog entry titled {title:?}"))?,
            None => catalog.items().first().context("Catalog is empty")?,
        };
        (item.title.clone(), item.haptics.clone())
    } else if let Some(path) = &args.timeline {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read timeline {}", path.display()))?;
        let document = TimelineDocument::from_json(&json)
            .with_context(|| format!("Failed to parse timeline {}", path.display()))?;
        (path.display().to_string(), document)
    } else {
        bail!("Provide --catalog or --timeline");
    };

    let timeline = Timeline::from_document(document).context("Invalid timeline document")?;
    let duration_ms = args.duration_ms.unwrap_or_else(|| {
        timeline
            .events()
            .last()
            .map(|e| e.timestamp + 1_000)
            .unwrap_or(1_000)
    });

    info!(
        title = %title,
        events = timeline.len(),
        duration_ms,
        rate = args.rate,
        "Loaded timeline"
    );

    // Build the engine around the logging driver
    let engine = HapticsEngine::new(
        Arc::new(ConsoleActuator),
        args.capabilities.clone(),
        &config,
    );
    engine.shared_state().set_haptics_enabled(!args.no_haptics);

    // Mirror the engine event stream into the log
    let mut events = engine.shared_state().subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            debug!(?event, "engine event");
        }
    });

    // Simulated playback session
    let player = Arc::new(SimulatedPlayer::with_rate(duration_ms, args.rate));
    let session = engine.start_session(timeline, Arc::clone(&player) as Arc<dyn PlaybackSource>);
    let scheduler = session.scheduler();

    if let Some(position) = args.start_at {
        let (old, new) = player.seek_to(position);
        scheduler.notify_discontinuity(old, new);
    }

    player.play();
    scheduler.notify_playback_state(PlaybackState::Playing);

    // Run until the simulated media ends or Ctrl-C
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut poll = tokio::time::interval(Duration::from_millis(100));
    loop {
        tokio::select! {
            _ = poll.tick() => {
                if player.is_ended() {
                    info!("Simulated media ended");
                    scheduler.notify_playback_state(PlaybackState::Ended);
                    break;
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    session.shutdown();
    info!("Session complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
