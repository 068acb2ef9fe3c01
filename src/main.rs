//! WakaTime Heartbeat CLI
//!
//! Reports editor activity to WakaTime through wakatime-cli.

use clap::{Args, Parser, Subcommand};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use wakatime_heartbeat::{
    config::Config,
    init_logging,
    stats::{create_shared_stats_with_persistence, read_persisted, SharedPipelineStats},
    Activity, Admission, Category, CommandRunner, EntityType, EventPipeline, FixedBinary,
    FlushOutcome, Heartbeat, TracingLogger, Validator, VERSION,
};

#[derive(Parser)]
#[command(name = "wakatime-heartbeat")]
#[command(version = VERSION)]
#[command(about = "Report editor activity to WakaTime through wakatime-cli", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read activity events (one JSON object per line) from stdin and report them
    Watch {
        /// Run wakatime-cli synchronously and log its output
        #[arg(long)]
        debug: bool,

        /// Override the flush interval in seconds
        #[arg(long)]
        flush_interval: Option<u64>,
    },

    /// Send a single heartbeat immediately
    Send {
        #[command(flatten)]
        heartbeat: HeartbeatArgs,
    },

    /// Show the wakatime-cli arguments and JSON for a heartbeat without sending it
    Preview {
        #[command(flatten)]
        heartbeat: HeartbeatArgs,
    },

    /// Show configuration and cumulative statistics
    Status,

    /// Show configuration
    Config,
}

#[derive(Args)]
struct HeartbeatArgs {
    /// File path, domain or app name
    #[arg(long)]
    entity: String,

    /// The entity was just saved
    #[arg(long)]
    write: bool,

    /// Activity category, e.g. coding, debugging, "writing tests"
    #[arg(long)]
    category: Option<Category>,

    /// file, domain or app
    #[arg(long)]
    entity_type: Option<EntityType>,

    #[arg(long)]
    project: Option<String>,

    /// Project name used when wakatime-cli cannot detect one
    #[arg(long)]
    alternate_project: Option<String>,

    #[arg(long)]
    language: Option<String>,

    #[arg(long)]
    branch: Option<String>,

    #[arg(long)]
    lineno: Option<u32>,

    #[arg(long)]
    cursorpos: Option<u32>,

    #[arg(long)]
    lines_in_file: Option<u32>,

    /// The entity has unsaved changes
    #[arg(long)]
    unsaved: bool,
}

impl HeartbeatArgs {
    /// Apply the arguments on top of a heartbeat seeded with common flags.
    fn apply(self, heartbeat: Heartbeat) -> Heartbeat {
        let mut heartbeat = heartbeat
            .entity(self.entity)
            .is_write(self.write)
            .category(self.category.unwrap_or_default())
            .entity_type(self.entity_type.unwrap_or_default());

        if let Some(project) = self.project {
            heartbeat = heartbeat.project(project);
        }
        if let Some(project) = self.alternate_project {
            heartbeat = heartbeat.alternate_project(project);
        }
        if let Some(language) = self.language {
            heartbeat = heartbeat.language(language);
        }
        if let Some(branch) = self.branch {
            heartbeat = heartbeat.branch(branch);
        }
        if let Some(line) = self.lineno {
            heartbeat = heartbeat.lineno(line);
        }
        if let Some(position) = self.cursorpos {
            heartbeat = heartbeat.cursorpos(position);
        }
        if let Some(lines) = self.lines_in_file {
            heartbeat = heartbeat.lines_in_file(lines);
        }
        if self.unsaved {
            heartbeat = heartbeat.is_unsaved_entity(true);
        }
        heartbeat
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = config.unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config, using defaults: {e}");
        Config::default()
    });

    if let Err(e) = init_logging(&config.log_level, cli.verbose) {
        eprintln!("Warning: Could not initialize logging: {e}");
    }

    match cli.command {
        Commands::Watch {
            debug,
            flush_interval,
        } => {
            cmd_watch(config, debug, flush_interval);
        }
        Commands::Send { heartbeat } => {
            cmd_send(config, heartbeat);
        }
        Commands::Preview { heartbeat } => {
            cmd_preview(&config, heartbeat);
        }
        Commands::Status => {
            cmd_status(&config);
        }
        Commands::Config => {
            cmd_config(&config, cli.config);
        }
    }
}

/// Build a pipeline wired to wakatime-cli from the configuration.
fn build_pipeline(config: &Config) -> (EventPipeline, SharedPipelineStats) {
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let runner = config
        .process_timeout()
        .map_or_else(CommandRunner::new, CommandRunner::with_timeout);
    let stats = create_shared_stats_with_persistence(config.stats_path());
    if let Err(e) = stats.load() {
        eprintln!("Warning: Could not load previous stats, starting from zero: {e}");
    }
    let pipeline = EventPipeline::with_stats(
        config.pipeline_settings(),
        Arc::new(runner),
        Arc::new(FixedBinary(config.resolved_cli_path())),
        Arc::new(TracingLogger),
        Arc::clone(&stats),
    );
    pipeline.set_common_flags(config.common_flags());
    (pipeline, stats)
}

fn cmd_watch(mut config: Config, debug: bool, flush_interval: Option<u64>) {
    require_api_key(&config);
    config.debug |= debug;
    if let Some(secs) = flush_interval {
        config.flush_interval = Duration::from_secs(secs.max(1));
    }

    println!("WakaTime Heartbeat v{VERSION}");
    println!();
    println!("  wakatime-cli: {}", config.resolved_cli_path().display());
    println!("  API key: configured");
    println!("  Plugin: {}", config.plugin.user_agent());
    println!(
        "  Heartbeat frequency: {}s",
        config.heartbeat_frequency.as_secs()
    );
    println!("  Flush interval: {}s", config.flush_interval.as_secs());
    println!("  Debug: {}", config.debug);
    println!();
    println!("Reading activity from stdin. Press Ctrl+C to stop");
    println!();

    let (mut pipeline, stats) = build_pipeline(&config);
    pipeline.start();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(Arc::clone(&running));

    let lines = spawn_stdin_reader();

    while running.load(Ordering::SeqCst) {
        match lines.recv_timeout(Duration::from_millis(100)) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Activity>(line) {
                    Ok(activity) => match pipeline.handle_activity(&activity) {
                        Admission::Queued => {
                            tracing::debug!(entity = %activity.entity, "Queued heartbeat");
                        }
                        Admission::Debounced | Admission::Ignored => {}
                    },
                    Err(e) => eprintln!("Warning: Skipping malformed activity line: {e}"),
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    println!();
    println!("Stopping, sending {} queued heartbeat(s)...", pipeline.pending());
    report_outcome(pipeline.shutdown());

    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save stats: {e}");
    }

    println!();
    println!("{}", stats.summary());
}

/// Forward stdin lines to a channel; it disconnects at EOF.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    eprintln!("Error reading stdin: {e}");
                    break;
                }
            }
        }
    });
    rx
}

fn cmd_send(config: Config, args: HeartbeatArgs) {
    require_api_key(&config);
    let (mut pipeline, stats) = build_pipeline(&config);
    let heartbeat = args.apply(pipeline.new_heartbeat());
    if let Err(e) = pipeline.send(heartbeat, true) {
        for missing in e.inner() {
            eprintln!("Error: {missing}");
        }
        std::process::exit(1);
    }

    let outcome = pipeline.shutdown();
    report_outcome(outcome);

    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save stats: {e}");
    }

    if !matches!(outcome, FlushOutcome::Sent { .. }) {
        std::process::exit(1);
    }
}

fn cmd_preview(config: &Config, args: HeartbeatArgs) {
    let heartbeat = args.apply(Heartbeat::from_common(
        &config.common_flags(),
        chrono::Utc::now(),
    ));

    println!("Command line:");
    println!("  {}", config.resolved_cli_path().display());
    for arg in heartbeat.to_cli_args(true) {
        println!("  {arg}");
    }
    println!();
    println!("JSON:");
    println!("{}", heartbeat.to_json_object(true));
    println!();
    println!("As an extra heartbeat:");
    println!("{}", heartbeat.to_json_object(false));

    let missing = Validator::missing_flags(&heartbeat);
    if !missing.is_empty() {
        println!();
        println!("Missing required flags:");
        for name in missing {
            println!("  {name}");
        }
    }
}

fn cmd_status(config: &Config) {
    println!("WakaTime Heartbeat Status");
    println!("=========================");
    println!();

    let cli_path = config.resolved_cli_path();
    println!(
        "wakatime-cli: {} {}",
        cli_path.display(),
        if cli_path.exists() {
            "✓"
        } else {
            "(not found) ✗"
        }
    );
    println!(
        "API key: {}",
        if config.require_api_key().is_ok() {
            "configured ✓"
        } else {
            "not set ✗ (watch and send will not start)"
        }
    );
    println!();

    println!("Configuration:");
    println!("  Plugin: {}", config.plugin.user_agent());
    println!(
        "  Heartbeat frequency: {}s",
        config.heartbeat_frequency.as_secs()
    );
    println!("  Flush interval: {}s", config.flush_interval.as_secs());
    if let Some(timeout) = config.process_timeout() {
        println!("  Process timeout: {}s", timeout.as_secs());
    }
    println!("  Debug: {}", config.debug);
    println!();

    let stats_path = config.stats_path();
    if stats_path.exists() {
        match read_persisted(&stats_path) {
            Ok(stats) => {
                println!("Cumulative Statistics:");
                println!("  Heartbeats queued: {}", stats.accepted);
                println!("  Activity events debounced: {}", stats.debounced);
                println!("  Heartbeats rejected: {}", stats.rejected);
                println!("  wakatime-cli invocations: {}", stats.batches);
                println!("  Heartbeats sent: {}", stats.sent);
                println!("  Heartbeats in failed invocations: {}", stats.failed);
                println!(
                    "  Last updated: {}",
                    stats.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
            Err(e) => eprintln!("Warning: Could not read stats: {e}"),
        }
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_config(config: &Config, path: Option<PathBuf>) {
    println!("Configuration");
    println!("=============");
    println!();
    println!(
        "Config file: {:?}",
        path.unwrap_or_else(Config::config_path)
    );
    println!();

    let mut shown = config.clone();
    if let Some(key) = shown.api_key.as_deref() {
        shown.api_key = Some(wakatime_heartbeat::flags::obfuscate(key));
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&shown).unwrap_or_else(|_| "Error".to_string())
    );
}

fn report_outcome(outcome: FlushOutcome) {
    match outcome {
        FlushOutcome::Empty | FlushOutcome::Busy => {}
        FlushOutcome::Sent { heartbeats } => println!("Sent {heartbeats} heartbeat(s)"),
        FlushOutcome::Dispatched { heartbeats } => {
            println!("Dispatched {heartbeats} heartbeat(s)")
        }
        FlushOutcome::Invalid { heartbeats } => {
            eprintln!("Error: Dropped {heartbeats} heartbeat(s) with missing required flags")
        }
        FlushOutcome::Failed { heartbeats } => {
            eprintln!("Error: wakatime-cli failed, {heartbeats} heartbeat(s) not sent")
        }
    }
}

/// Exit before sending anything when no API key is configured.
fn require_api_key(config: &Config) {
    if let Err(e) = config.require_api_key() {
        eprintln!("Error: {e}");
        eprintln!("Heartbeats without --key are dropped before wakatime-cli runs.");
        eprintln!("Run `wakatime-heartbeat config` to see the config file location.");
        std::process::exit(1);
    }
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: Could not set Ctrl+C handler: {e}");
    }
}
