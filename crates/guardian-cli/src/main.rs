//! `guardian-cli` – the `collision-guard` binary.
//!
//! Replays a recorded point-cloud stream through a complete guardian:
//!
//! 1. Loads `~/.guardian/config.toml` (or `--config <path>`), applies
//!    `GUARDIAN_*` overrides and validates it.  Any configuration error is
//!    fatal.
//! 2. Wires the transform buffer, the [`CollisionGuardian`] frame loop and the
//!    periodic safety monitor over two event buses: one carrying frames in,
//!    one carrying collision warnings and system alerts out.
//! 3. Feeds the recording in, paced by the frame timestamps unless `--fast`
//!    is given.
//! 4. Intercepts **Ctrl-C** to publish a system alert and stop the replay.
//! 5. Prints the guardian counters and the final safety status.

mod config;
mod recording;

use chrono::{DateTime, Utc};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, warn};

use guardian_kernel::{SafetyMonitor, SafetyStatusHandle};
use guardian_middleware::{EventBus, LatestObserved, Topic};
use guardian_runtime::{
    init_tracing, run_frame_loop, CollisionGuardian, GuardianConfig, GuardianStats, MonitorTask,
};
use guardian_types::{ComponentHealth, Event, EventPayload, GuardianError, SafetyStatus};

use recording::Recording;

const USAGE: &str = "usage: collision-guard [--config <path>] [--fast] <recording.jsonl>";
const FRAME_SOURCE: &str = "guardian-cli::replay";
const MAX_REPLAY_GAP: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    let _telemetry = init_tracing("collision-guard");
    print_banner();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}: {e}\n  {USAGE}", "Error".red());
            return ExitCode::from(2);
        }
    };

    let cfg = match load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {e}", "Config error".red().bold());
            return ExitCode::FAILURE;
        }
    };

    let alarms = EventBus::default();
    let shutdown = Arc::new(AtomicBool::new(false));
    install_ctrlc(shutdown.clone(), alarms.clone());

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: failed to start Tokio runtime: {e}", "Error".red());
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&cfg, &args, alarms, shutdown)) {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "replay aborted");
            eprintln!("{}: {e}", "Error".red().bold());
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Arguments and configuration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
struct CliArgs {
    config: Option<PathBuf>,
    recording: PathBuf,
    fast: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs, String> {
    let mut config = None;
    let mut recording = None;
    let mut fast = false;

    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                config = Some(PathBuf::from(it.next().ok_or("--config needs a path")?));
            }
            "--fast" => fast = true,
            flag if flag.starts_with('-') => return Err(format!("unknown option {flag}")),
            _ if recording.is_none() => recording = Some(PathBuf::from(&arg)),
            _ => return Err(format!("unexpected argument {arg}")),
        }
    }

    Ok(CliArgs {
        config,
        recording: recording.ok_or("missing recording path")?,
        fast,
    })
}

/// An explicit path must exist; the default path falls back to built-in
/// defaults when absent.
fn load_config(explicit: Option<&Path>) -> Result<GuardianConfig, GuardianError> {
    if let Some(path) = explicit {
        let cfg = config::load_from(path)?.ok_or_else(|| {
            GuardianError::Config(format!("config file {} not found", path.display()))
        })?;
        println!("  Config loaded from {}", path.display().to_string().bold());
        return Ok(cfg);
    }

    let path = config::config_path();
    match config::load_from(&path)? {
        Some(cfg) => {
            println!("  Config loaded from {}", path.display().to_string().bold());
            Ok(cfg)
        }
        None => {
            println!(
                "  {} Using built-in defaults.",
                format!("No config at {}.", path.display()).dimmed()
            );
            let mut cfg = GuardianConfig::default();
            config::apply_env_overrides(&mut cfg);
            cfg.validate()?;
            Ok(cfg)
        }
    }
}

fn install_ctrlc(shutdown: Arc<AtomicBool>, bus: EventBus) {
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping replay …".yellow().bold());
        let alert = Event::new(
            "guardian-cli",
            EventPayload::SystemFault {
                component: "cli".to_string(),
                message: "operator interrupt".to_string(),
            },
        );
        let _ = bus.publish_to(Topic::SystemAlerts, alert);
        shutdown.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; replay cannot be interrupted cleanly");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Replay
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct RunSummary {
    stats: GuardianStats,
    status: SafetyStatus,
    unreadable_lines: usize,
    interrupted: bool,
}

async fn run(
    cfg: &GuardianConfig,
    args: &CliArgs,
    alarms: EventBus,
    shutdown: Arc<AtomicBool>,
) -> Result<RunSummary, GuardianError> {
    let recording = Recording::open(&args.recording)?;
    let mut alerts = alarms.subscribe_to(Topic::SystemAlerts);

    let monitor = SafetyMonitor::new(LatestObserved::subscribe(&alarms), SafetyStatusHandle::new())
        .with_passenger_msg(cfg.passenger_msg.clone())
        .with_warning_timeout(cfg.warning_timeout());
    let monitor_task = MonitorTask::spawn(monitor, cfg.monitor_interval());

    let ingest = EventBus::default();
    let frames = ingest.subscribe_to(Topic::PointClouds);
    let mut guardian = CollisionGuardian::new(cfg, cfg.transform_buffer(), alarms)?;
    let frame_loop = tokio::spawn(async move { run_frame_loop(frames, &mut guardian).await });

    let mut unreadable_lines = 0;
    let mut previous: Option<DateTime<Utc>> = None;
    for (line, item) in recording {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        let frame = match item {
            Ok(frame) => frame,
            Err(e) => {
                warn!(line, error = %e, "skipping unreadable recording line");
                unreadable_lines += 1;
                continue;
            }
        };

        if args.fast {
            tokio::task::yield_now().await;
        } else {
            pace(previous, frame.timestamp).await;
        }
        previous = Some(frame.timestamp);

        ingest.publish_to(Topic::PointClouds, Event::new(FRAME_SOURCE, EventPayload::PointCloud(frame)))?;
    }
    drop(ingest);

    let stats = frame_loop
        .await
        .map_err(|e| GuardianError::Channel(format!("frame loop failed: {e}")))?;

    // Let the monitor observe the last warning before stopping it.
    tokio::time::sleep(cfg.monitor_interval() * 2).await;
    let monitor = monitor_task.stop().await?;

    while let Ok(event) = alerts.try_recv() {
        if let EventPayload::SystemFault { component, message } = event.payload {
            warn!(%component, %message, "system alert");
        }
    }

    Ok(RunSummary {
        stats,
        status: monitor.status().snapshot(),
        unreadable_lines,
        interrupted: shutdown.load(Ordering::SeqCst),
    })
}

/// Sleep for the capture-time gap between two frames, capped at
/// [`MAX_REPLAY_GAP`].  Out-of-order timestamps do not sleep.
async fn pace(previous: Option<DateTime<Utc>>, next: DateTime<Utc>) {
    if let Some(gap) = previous.and_then(|p| (next - p).to_std().ok()) {
        tokio::time::sleep(gap.min(MAX_REPLAY_GAP)).await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║        Collision Guardian            ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!(
        "  {} {}",
        "collision-guard".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!();
}

fn print_summary(summary: &RunSummary) {
    let stats = &summary.stats;
    println!();
    if summary.interrupted {
        println!("  {}", "Replay interrupted.".yellow());
    }
    println!("  Frames processed     {}", stats.frames_processed);
    println!("  Frames dropped       {}", stats.frames_dropped);
    if stats.frames_lagged > 0 {
        println!("  Frames lagged        {}", stats.frames_lagged.to_string().yellow());
    }
    println!("  Alarm frames         {}", stats.alarm_frames);
    println!("  Warnings published   {}", stats.warnings_published);
    if stats.warnings_undelivered > 0 {
        println!("  Warnings undelivered {}", stats.warnings_undelivered);
    }
    if summary.unreadable_lines > 0 {
        println!("  Unreadable lines     {}", summary.unreadable_lines.to_string().yellow());
    }
    println!();

    let status = &summary.status;
    if status.require_emergency_stop {
        println!("  {}", "EMERGENCY STOP REQUIRED".red().bold());
        if let Some(msg) = &status.passenger_msg {
            println!("  Passenger message: {}", msg.bold());
        }
        if let Some(at) = status.safety_mode_trigger_time {
            println!("  Triggered at:      {}", at.to_rfc3339().dimmed());
        }
    } else {
        println!("  Safety status: {}", "clear".green().bold());
    }
    if status.warning_stream == ComponentHealth::TimedOut {
        println!("  {}", "Collision warning stream timed out.".yellow());
    }
    println!();
}
