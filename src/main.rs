//! Vibrascope - Real-Time Vibration Telemetry Console
//!
//! Client-side pipeline for vibration analysis data streamed from an
//! acquisition server.
//!
//! # Usage
//!
//! ```bash
//! # Connect to an acquisition server
//! vibrascope --stream 192.168.1.20:5000 --api http://192.168.1.20:5000
//!
//! # Develop without hardware
//! vibrascope --synthetic
//!
//! # Start recording as soon as the link is up
//! vibrascope --synthetic --record
//! ```
//!
//! # Environment Variables
//!
//! - `VIBRASCOPE_CONFIG`: Path to a TOML config file
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use vibrascope::acquisition::{run_status_poll, AcquisitionClient};
use vibrascope::config::{AcquisitionConfig, ConfigUpdate};
use vibrascope::link::{LinkCommand, StreamTransport, SyntheticTransport, TcpTransport};
use vibrascope::notify::{LogNotifier, Notifier};
use vibrascope::pipeline::{AppState, IngestLoop};
use vibrascope::recorder::ops;
use vibrascope::render::{run_render_loop, DisplaySurface, LogSurface};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "vibrascope")]
#[command(about = "Real-time vibration telemetry console")]
#[command(version)]
struct CliArgs {
    /// Telemetry stream address
    #[arg(long, value_name = "HOST:PORT", default_value = "127.0.0.1:5000")]
    stream: String,

    /// Acquisition server API base URL
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    api: String,

    /// Generate synthetic telemetry instead of connecting to a server
    #[arg(long)]
    synthetic: bool,

    /// Path to a TOML config file (overrides VIBRASCOPE_CONFIG)
    #[arg(long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Ask the server to open this serial port before streaming
    #[arg(long, value_name = "PORT")]
    port: Option<String>,

    /// Start a recording session as soon as the link is up and export it
    /// on shutdown
    #[arg(long)]
    record: bool,
}

// ============================================================================
// Task Names for Supervisor Logging
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    Ingest,
    Render,
    TimerRefresh,
    StatusPoll,
    AutoRecord,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::Ingest => write!(f, "Ingest"),
            TaskName::Render => write!(f, "Render"),
            TaskName::TimerRefresh => write!(f, "TimerRefresh"),
            TaskName::StatusPoll => write!(f, "StatusPoll"),
            TaskName::AutoRecord => write!(f, "AutoRecord"),
        }
    }
}

// ============================================================================
// Task Spawning
// ============================================================================

fn spawn_render(
    task_set: &mut JoinSet<Result<TaskName>>,
    state: Arc<RwLock<AppState>>,
    cancel: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[Render] Task starting");
        let surfaces: Vec<Box<dyn DisplaySurface>> = vec![Box::new(LogSurface::new())];
        run_render_loop(state, surfaces, cancel).await;
        Ok(TaskName::Render)
    });
}

fn spawn_timer_refresh(
    task_set: &mut JoinSet<Result<TaskName>>,
    state: Arc<RwLock<AppState>>,
    cancel: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[TimerRefresh] Task starting");
        ops::run_timer_refresh(state, cancel).await;
        Ok(TaskName::TimerRefresh)
    });
}

fn spawn_status_poll(
    task_set: &mut JoinSet<Result<TaskName>>,
    state: Arc<RwLock<AppState>>,
    client: AcquisitionClient,
    cancel: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[StatusPoll] Task starting");
        run_status_poll(state, client, cancel).await;
        Ok(TaskName::StatusPoll)
    });
}

/// Wait for the link to come up, then start a recording session.
fn spawn_auto_record(
    task_set: &mut JoinSet<Result<TaskName>>,
    state: Arc<RwLock<AppState>>,
    client: AcquisitionClient,
    notifier: Arc<dyn Notifier>,
    cancel: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[AutoRecord] Task starting, waiting for link");
        let mut interval = tokio::time::interval(std::time::Duration::from_millis(250));
        loop {
            tokio::select! {
                () = cancel.cancelled() => return Ok(TaskName::AutoRecord),
                _ = interval.tick() => {}
            }
            let connected = state.read().await.connection.is_connected();
            if connected {
                if ops::start_session(&state, &client, notifier.as_ref())
                    .await
                    .is_ok()
                {
                    info!("[AutoRecord] Session started");
                }
                return Ok(TaskName::AutoRecord);
            }
        }
    });
}

/// Run the supervisor loop: monitor tasks, cancel on failure.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel: CancellationToken,
) -> Result<()> {
    info!("🔒 Supervisor: All tasks spawned, monitoring...");

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                info!("🛑 Supervisor: Shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!("🔒 Supervisor: Task {} completed normally", task_name);
                        // A finished ingest loop means the link is gone for
                        // good; wind everything else down.
                        if matches!(task_name, TaskName::Ingest) {
                            cancel.cancel();
                        }
                    }
                    Some(Ok(Err(e))) => {
                        error!("🔒 Supervisor: Task failed with error: {}", e);
                        cancel.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("🔒 Supervisor: Task panicked: {}", e);
                        cancel.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("🔒 Supervisor: All tasks completed");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

// ============================================================================
// Console Runner
// ============================================================================

/// Run the console with any stream transport.
async fn run_console<T: StreamTransport>(
    mut transport: T,
    args: &CliArgs,
    config: AcquisitionConfig,
    client: AcquisitionClient,
    cancel: CancellationToken,
) -> Result<()> {
    let state = Arc::new(RwLock::new(AppState::new(config.clone())));
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    info!("✓ Application state initialized");

    // Mirror our startup config to the server, best-effort, and queue the
    // motor frequency command for when the stream opens.
    if let Err(e) = client.push_config(&ConfigUpdate::from(&config)).await {
        warn!("could not push startup config: {e}");
    }
    let (command_tx, command_rx) = mpsc::channel::<LinkCommand>(16);
    let _ = command_tx
        .send(LinkCommand::SetMotorFrequency {
            frequency: config.motor_frequency,
        })
        .await;

    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    // Task 1: Ingest loop (owns the transport)
    let ingest = IngestLoop::new(
        Arc::clone(&state),
        Arc::clone(&notifier),
        cancel.clone(),
        command_rx,
    );
    task_set.spawn(async move {
        info!("[Ingest] Task starting");
        let stats = ingest.run(&mut transport).await;
        info!(
            "[Ingest] {} frames decoded, {} skipped",
            stats.frames_decoded, stats.frames_skipped
        );
        Ok(TaskName::Ingest)
    });

    // Tasks 2-4: periodic work
    spawn_render(&mut task_set, Arc::clone(&state), cancel.clone());
    spawn_timer_refresh(&mut task_set, Arc::clone(&state), cancel.clone());
    spawn_status_poll(
        &mut task_set,
        Arc::clone(&state),
        client.clone(),
        cancel.clone(),
    );

    if args.record {
        spawn_auto_record(
            &mut task_set,
            Arc::clone(&state),
            client.clone(),
            Arc::clone(&notifier),
            cancel.clone(),
        );
    }

    let result = run_supervisor(&mut task_set, cancel).await;
    task_set.shutdown().await;

    // Best-effort: freeze and export anything recorded before exiting.
    if args.record {
        ops::stop_session(&state, &client, notifier.as_ref()).await;
        ops::export_session(&state, &client, notifier.as_ref()).await;
    }

    result
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let config = AcquisitionConfig::load(args.config.as_deref());
    info!(
        "Motor: {} Hz | Noise threshold: {} | Range: {} Hz | Axis: {}",
        config.motor_frequency, config.noise_threshold, config.fft_range, config.main_axis
    );

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Vibrascope - Vibration Telemetry Console");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("");

    let client = AcquisitionClient::new(&args.api)
        .with_context(|| format!("invalid API base URL: {}", args.api))?;

    // Ask the server to open a serial port first if requested.
    if let Some(port) = &args.port {
        info!("🔌 Requesting serial port {port}");
        if let Err(e) = client.connect_port(port).await {
            warn!("could not open {port}: {e}");
        }
    }

    // Graceful shutdown via Ctrl+C
    let cancel = CancellationToken::new();
    let shutdown_token = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    if args.synthetic {
        info!("📥 Input: synthetic frame generator");
        let transport = SyntheticTransport::new(config.clone());
        run_console(transport, &args, config, client, cancel).await?;
    } else {
        let (host, port) = args
            .stream
            .split_once(':')
            .context("Invalid stream address format. Expected HOST:PORT")?;
        let port: u16 = port.parse().context("Invalid port number")?;
        info!("📥 Input: telemetry stream from {}", args.stream);
        let transport = TcpTransport::new(host, port);
        run_console(transport, &args, config, client, cancel).await?;
    }

    info!("");
    info!("✓ Vibrascope shutdown complete");
    Ok(())
}
