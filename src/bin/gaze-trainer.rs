//! Gaze Trainer CLI
//!
//! Commands:
//! - run: Monitor gaze and punish distraction until interrupted
//! - bounds: Print the normalized bounds for a configuration
//! - devices: List available trackers
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use gaze_trainer::config::TimestampSource;
use gaze_trainer::{
    Actuator, BoundsResolver, ConsoleActuator, MonotonicClock, ReplaySource, ReplayTracker,
    Session, SessionOutcome, SessionSummary, TrackerApi, TrainerConfig, TrainerError,
    PROGRAM_NAME, TRAINER_VERSION,
};

/// Gaze Trainer - sound a deterrent when your gaze wanders off the work area
#[derive(Parser)]
#[command(name = "gaze-trainer")]
#[command(version = TRAINER_VERSION)]
#[command(about = "Punish looking away from a screen region", long_about = None)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor gaze until interrupted or the stream ends
    Run {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Replay recorded gaze points from an NDJSON file (use - for stdin)
        #[arg(long)]
        replay: Option<String>,

        /// Replay as fast as possible, timing samples by their recorded timestamps
        #[arg(long, requires = "replay")]
        fast: bool,

        /// Never ring the bell or play sound
        #[arg(long)]
        mute: bool,

        /// Print the session summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print normalized bounds for a configuration
    Bounds {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available trackers
    Devices {
        /// Replay source to enumerate (use - for stdin)
        #[arg(long)]
        replay: Option<String>,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "gaze_trainer=debug"
    } else {
        "gaze_trainer=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), TrainerCliError> {
    match cli.command {
        Commands::Run {
            config,
            replay,
            fast,
            mute,
            json,
        } => cmd_run(config.as_deref(), replay.as_deref(), fast, mute, json),

        Commands::Bounds { config, json } => cmd_bounds(config.as_deref(), json),

        Commands::Devices { replay } => cmd_devices(replay.as_deref()),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_run(
    config_path: Option<&Path>,
    replay: Option<&str>,
    fast: bool,
    mute: bool,
    json: bool,
) -> Result<(), TrainerCliError> {
    let mut config = TrainerConfig::load_or_default(config_path)?;
    if fast {
        config.tracker.timestamps = TimestampSource::Device;
    }

    let Some(replay) = replay else {
        // No hardware backend is compiled in; a replay is the only tracker
        println!("Error: No device found");
        return Ok(());
    };
    let source = ReplaySource::from_arg(replay);
    if source == ReplaySource::Stdin && atty::is(atty::Stream::Stdin) {
        warn!("reading gaze points from an interactive terminal");
    }
    let tracker = ReplayTracker::new(source, !fast);
    info!(
        "replaying gaze points from {}{}",
        tracker.source().url(),
        if fast { " (fast)" } else { "" }
    );

    let actuator = build_actuator(&config, mute)?;

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })
    .map_err(|e| TrainerCliError::Signal(e.to_string()))?;

    let clock = MonotonicClock::new();
    match Session::new(config).run(&tracker, actuator, &clock, &running)? {
        SessionOutcome::NoDevice => {
            println!("Error: No device found");
            Ok(())
        }
        SessionOutcome::Completed(summary) => print_summary(&summary, json),
    }
}

fn cmd_bounds(config_path: Option<&Path>, json: bool) -> Result<(), TrainerCliError> {
    let config = TrainerConfig::load_or_default(config_path)?;
    let placed = BoundsResolver::place(&config.display, &config.boundary_box);
    let bounds = config.bounds();

    if json {
        println!("{}", serde_json::to_string_pretty(&bounds)?);
    } else {
        println!(
            "Display: {}x{}",
            config.display.width, config.display.height
        );
        println!(
            "Box:     {}x{} at ({}, {}){}",
            placed.width,
            placed.height,
            placed.x,
            placed.y,
            if placed.auto_center { " (auto-centered)" } else { "" }
        );
        println!(
            "Bounds:  X[{}-{}], Y[{}-{}]",
            bounds.x_min, bounds.x_max, bounds.y_min, bounds.y_max
        );
    }

    Ok(())
}

fn cmd_devices(replay: Option<&str>) -> Result<(), TrainerCliError> {
    let urls = match replay {
        Some(replay) => ReplayTracker::new(ReplaySource::from_arg(replay), false)
            .enumerate_devices()?,
        None => Vec::new(),
    };

    if urls.is_empty() {
        println!("Error: No device found");
    } else {
        for url in urls {
            println!("{}", url);
        }
    }

    Ok(())
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), TrainerCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} {}", PROGRAM_NAME, TRAINER_VERSION),
    });

    // Parse without validation so geometry problems get their own check
    let config = match config_path {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<TrainerConfig>(&content) {
                Ok(config) => {
                    checks.push(DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!("Loaded {}", path.display()),
                    });
                    Some(config)
                }
                Err(e) => {
                    checks.push(DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Invalid TOML: {}", e),
                    });
                    None
                }
            },
            Err(e) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                });
                None
            }
        },
        None => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "No config file given, using defaults".to_string(),
            });
            Some(TrainerConfig::default())
        }
    };

    if let Some(config) = &config {
        let geometry = BoundsResolver::validate(&config.display, &config.boundary_box);
        checks.push(match (geometry, config.geometry.strict) {
            (Ok(()), _) => {
                let b = config.bounds();
                DoctorCheck {
                    name: "geometry".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Bounds X[{}-{}], Y[{}-{}]",
                        b.x_min, b.x_max, b.y_min, b.y_max
                    ),
                }
            }
            (Err(e), true) => DoctorCheck {
                name: "geometry".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
            (Err(e), false) => DoctorCheck {
                name: "geometry".to_string(),
                status: CheckStatus::Warning,
                message: format!("{} (strict geometry disabled)", e),
            },
        });

        checks.push(match config.validate_settings() {
            Ok(()) => DoctorCheck {
                name: "settings".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Threshold {} ms, invalid samples {}",
                    config.punishment.threshold_ms,
                    if config.punishment.treat_invalid_as_out_of_bounds {
                        "count as out of bounds"
                    } else {
                        "ignored"
                    }
                ),
            },
            Err(e) => DoctorCheck {
                name: "settings".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        });

        checks.push(audio_check(config));
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--replay - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        program: PROGRAM_NAME.to_string(),
        version: TRAINER_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Gaze Trainer Doctor Report");
        println!("==========================");
        println!("Version: {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }

        if let Some(config) = &config {
            println!("\nEffective configuration:\n");
            print!("{}", config.to_toml_string()?);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(TrainerCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn build_actuator(config: &TrainerConfig, mute: bool) -> Result<Box<dyn Actuator>, TrainerError> {
    if !mute {
        if let Some(path) = &config.audio.sound_file {
            if let Some(sound) = sound_actuator(path)? {
                return Ok(sound);
            }
        }
    }
    Ok(Box::new(ConsoleActuator::new(config.audio.bell && !mute)))
}

#[cfg(feature = "audio")]
fn sound_actuator(path: &Path) -> Result<Option<Box<dyn Actuator>>, TrainerError> {
    let sound = gaze_trainer::LoopingSound::open(path)?;
    info!("punishment sound ready");
    Ok(Some(Box::new(sound)))
}

#[cfg(not(feature = "audio"))]
fn sound_actuator(path: &Path) -> Result<Option<Box<dyn Actuator>>, TrainerError> {
    warn!(
        "{} configured but built without the `audio` feature, using the console",
        path.display()
    );
    Ok(None)
}

fn audio_check(config: &TrainerConfig) -> DoctorCheck {
    match &config.audio.sound_file {
        None => DoctorCheck {
            name: "audio".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "No sound file, console actuator (bell {})",
                if config.audio.bell { "on" } else { "off" }
            ),
        },
        Some(path) if !path.is_file() => DoctorCheck {
            name: "audio".to_string(),
            status: CheckStatus::Error,
            message: format!("Sound file {} does not exist", path.display()),
        },
        Some(path) if cfg!(feature = "audio") => DoctorCheck {
            name: "audio".to_string(),
            status: CheckStatus::Ok,
            message: format!("Looping {}", path.display()),
        },
        Some(path) => DoctorCheck {
            name: "audio".to_string(),
            status: CheckStatus::Warning,
            message: format!(
                "{} configured but built without the `audio` feature",
                path.display()
            ),
        },
    }
}

fn print_summary(summary: &SessionSummary, json: bool) -> Result<(), TrainerCliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    let stats = &summary.stats;
    println!("Session {}", summary.session_id);
    println!("  Device:        {}", summary.device_url);
    println!(
        "  Duration:      {}s",
        (summary.ended_at - summary.started_at).num_seconds()
    );
    println!(
        "  Samples:       {} ({} in, {} out, {} ignored)",
        stats.samples, stats.in_bounds, stats.out_of_bounds, stats.ignored
    );
    if let Some(ratio) = summary.focus_ratio {
        println!("  Focus:         {:.1}%", ratio * 100.0);
    }
    println!(
        "  Punishments:   {} ({} ms total)",
        stats.punishments, stats.punished_ms
    );
    println!("  Longest away:  {} ms", stats.longest_streak_ms);

    Ok(())
}

// Error types

#[derive(Debug)]
enum TrainerCliError {
    Trainer(TrainerError),
    Json(serde_json::Error),
    Signal(String),
    DoctorFailed,
}

impl From<TrainerError> for TrainerCliError {
    fn from(e: TrainerError) -> Self {
        TrainerCliError::Trainer(e)
    }
}

impl From<serde_json::Error> for TrainerCliError {
    fn from(e: serde_json::Error) -> Self {
        TrainerCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<TrainerCliError> for CliError {
    fn from(e: TrainerCliError) -> Self {
        match e {
            TrainerCliError::Trainer(e) => {
                let (code, hint) = match &e {
                    TrainerError::Config(_) | TrainerError::Toml(_) => {
                        ("CONFIG_ERROR", Some("Run 'gaze-trainer doctor --config <file>'"))
                    }
                    TrainerError::InvalidGeometry(_) => (
                        "GEOMETRY_ERROR",
                        Some("Keep the boundary box inside the display, or set geometry.strict = false"),
                    ),
                    TrainerError::Connection(_) => {
                        ("DEVICE_UNAVAILABLE", Some("Check that the tracker is connected and not in use"))
                    }
                    TrainerError::Device(_) => ("DEVICE_ERROR", None),
                    TrainerError::Audio(_) => {
                        ("AUDIO_ERROR", Some("Check the sound file and output device, or use --mute"))
                    }
                    TrainerError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
                    TrainerError::Json(_) => ("JSON_ERROR", Some("Check JSON syntax")),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: hint.map(str::to_string),
                }
            }
            TrainerCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            TrainerCliError::Signal(msg) => CliError {
                code: "SIGNAL_ERROR".to_string(),
                message: msg,
                hint: Some("Could not install the Ctrl-C handler".to_string()),
            },
            TrainerCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    program: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
