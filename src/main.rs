#![forbid(unsafe_code)]

mod batch;
mod completion;
mod constants;
mod desktop;
mod dispatcher;
mod error;
mod hotkeys;
mod job;
mod pagination;
mod registry;
mod window_locator;
mod x11_utils;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use tracing::{error, info, warn, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use batch::{BatchEngine, BatchObserver, BatchOutcome, FormLock, MacroCommand, MacroRunState};
use completion::PrintSession;
use constants::{config, exit};
use desktop::Desktop;
use dispatcher::InputDispatcher;
use job::{JobForm, WordbookType};
use registry::PositionRegistry;
use window_locator::TitleMatch;
use x11_utils::X11Desktop;

#[derive(Parser)]
#[command(about = "Batch-prints wordbook days by driving the host application's UI")]
struct Cli {
    /// Position registry file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every day in a range
    Run(RunArgs),
    /// Move the pointer to a registry position on the host window
    Point {
        /// Dotted registry path, e.g. ui_positions.buttons.print
        path: String,
    },
    /// List every registry leaf and its value
    Keys,
    /// List top-level windows and whether they match the configured title
    Windows {
        /// Match titles by substring instead of exactly
        #[arg(long)]
        contains: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// JSON job file; flags given on the command line override its fields
    #[arg(long)]
    job: Option<PathBuf>,

    #[arg(long)]
    name: Option<String>,

    #[arg(long = "type", value_enum)]
    kind: Option<WordbookType>,

    #[arg(long)]
    version: Option<String>,

    #[arg(long)]
    start: Option<u32>,

    #[arg(long)]
    end: Option<u32>,

    /// Directory the host writes printed files into
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Wait for the start hotkey (F9) before the first day
    #[arg(long)]
    armed: bool,
}

impl RunArgs {
    fn form(&self) -> Result<JobForm> {
        let mut form = match &self.job {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .context(format!("Failed to read job file {}", path.display()))?;
                serde_json::from_str(&raw).context(format!("Failed to parse job file {}", path.display()))?
            }
            None => JobForm::default(),
        };
        if let Some(name) = &self.name {
            form.name = name.clone();
        }
        if self.kind.is_some() {
            form.kind = self.kind;
        }
        if self.version.is_some() {
            form.version = self.version.clone();
        }
        if let Some(start) = self.start {
            form.day_start = start;
        }
        if let Some(end) = self.end {
            form.day_end = end;
        }
        Ok(form)
    }

    fn output_dir(&self) -> Result<PathBuf> {
        let dir = match &self.output_dir {
            Some(dir) => dir.clone(),
            None => dirs::document_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join(config::APP_DIR)
                .join("Work"),
        };
        std::fs::create_dir_all(&dir).context(format!("Failed to create output directory {}", dir.display()))?;
        Ok(dir)
    }
}

/// Form readout for the terminal: state changes go to the log, the
/// progress lines to stdout
struct TerminalObserver;

impl BatchObserver for TerminalObserver {
    fn state_changed(&mut self, state: MacroRunState, form: &FormLock) {
        info!(state = %state, locked = form.locked().len(), "Form updated");
    }

    fn log(&mut self, line: &str) {
        println!("{line}");
    }
}

/// Hotkeys are optional; signals always work
fn spawn_command_sources(sender: Sender<MacroCommand>) {
    if hotkeys::check_permissions() {
        match hotkeys::spawn_listener(sender.clone()) {
            Ok(_) => info!("Hotkey support enabled (F9 start, F10 pause, F11 stop)"),
            Err(e) => {
                error!("Failed to start hotkey listener: {}", e);
                hotkeys::print_permission_error();
            }
        }
    } else {
        hotkeys::print_permission_error();
    }

    #[cfg(unix)]
    if let Err(e) = hotkeys::spawn_signal_listener(sender) {
        warn!(error = %e, "Running without signal handling");
    }
}

fn run(registry: &PositionRegistry, args: &RunArgs) -> Result<i32> {
    let form = args.form()?;
    let output_dir = args.output_dir()?;
    info!(dir = %output_dir.display(), "Using output directory");

    let (tx, rx) = mpsc::channel();
    spawn_command_sources(tx);

    let desktop = X11Desktop::connect()?;
    let mut engine = BatchEngine::new(
        InputDispatcher::new(desktop, registry),
        TerminalObserver,
        rx,
        PrintSession::new(output_dir.to_string_lossy()),
    );

    if args.armed && !engine.wait_for_start() {
        info!("Stopped before the batch started");
        return Ok(0);
    }

    let report = engine.start(&form)?;
    info!(completed = ?report.completed, "Batch report");
    Ok(match report.outcome {
        BatchOutcome::Finished | BatchOutcome::Stopped { .. } => 0,
        BatchOutcome::Aborted(_) => exit::ABORTED,
    })
}

fn point(registry: &PositionRegistry, path: &str) -> Result<()> {
    let mut dispatcher = InputDispatcher::new(X11Desktop::connect()?, registry);
    let at = dispatcher.move_to(path)?;
    println!("{path}: ({}, {})", at.x, at.y);
    Ok(())
}

/// `path = value` per leaf; null leaves are listed as `<missing>`
fn key_listing(registry: &PositionRegistry) -> Vec<String> {
    registry
        .leaf_paths()
        .into_iter()
        .map(|path| match registry.get(&path) {
            Ok(value) => format!("{path} = {value}"),
            Err(_) => format!("{path} = <missing>"),
        })
        .collect()
}

fn keys(registry: &PositionRegistry) {
    for line in key_listing(registry) {
        println!("{line}");
    }
}

fn windows(registry: &PositionRegistry, contains: bool) -> Result<()> {
    let strategy = if contains { TitleMatch::Contains } else { TitleMatch::Exact };
    let title = registry.window_title()?;
    let mut desktop = X11Desktop::connect()?;
    for window in desktop.windows()? {
        let marker = if strategy.matches(&window.title, title) { "*" } else { " " };
        println!(
            "{marker} {:#010x} {:>5},{:<5} {:>4}x{:<4} {}",
            window.id, window.origin.x, window.origin.y, window.width, window.height, window.title
        );
    }
    Ok(())
}

fn load_registry(path: Option<&Path>) -> Result<PositionRegistry> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(PositionRegistry::config_path);
    info!(path = %path.display(), "Loading position registry");
    PositionRegistry::load(&path)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let registry = load_registry(cli.config.as_deref())?;

    match &cli.command {
        Command::Run(args) => {
            let code = run(&registry, args)?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Command::Point { path } => point(&registry, path)?,
        Command::Keys => keys(&registry),
        Command::Windows { contains } => windows(&registry, *contains)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(std::iter::once("autotestcrafter").chain(args.iter().copied())).unwrap();
        match cli.command {
            Command::Run(args) => args,
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_run_flags_build_form() {
        let args = parse(&["run", "--name", "Book", "--type", "eng-kor-random", "--version", "2", "--start", "1", "--end", "4"]);
        let form = args.form().unwrap();
        assert_eq!(form.name, "Book");
        assert_eq!(form.kind, Some(WordbookType::EngKorRandom));
        assert_eq!(form.version.as_deref(), Some("2"));
        assert_eq!((form.day_start, form.day_end), (1, 4));
    }

    #[test]
    fn test_flags_override_job_file() {
        let dir = tempfile::tempdir().unwrap();
        let job = dir.path().join("job.json");
        std::fs::write(&job, r#"{"name": "Book", "type": "random", "version": "1", "day_start": 1, "day_end": 9}"#).unwrap();

        let args = parse(&["run", "--job", job.to_str().unwrap(), "--end", "3"]);
        let form = args.form().unwrap();
        assert_eq!(form.kind, Some(WordbookType::Random));
        assert_eq!((form.day_start, form.day_end), (1, 3));
    }

    #[test]
    fn test_output_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("Work");
        let args = parse(&["run", "--output-dir", out.to_str().unwrap()]);
        assert_eq!(args.output_dir().unwrap(), out);
        assert!(out.is_dir());
    }

    #[test]
    fn test_key_listing_marks_null_leaves() {
        let registry = PositionRegistry::from_value(serde_json::json!({
            "window_title": "Host",
            "ui_positions": { "unset": null, "ok": [1, 2] }
        }));
        assert_eq!(
            key_listing(&registry),
            vec![
                "window_title = \"Host\"",
                "ui_positions.unset = <missing>",
                "ui_positions.ok = [1,2]",
            ]
        );
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["autotestcrafter", "keys", "--config", "/tmp/p.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.json")));
        assert!(matches!(cli.command, Command::Keys));
    }
}
