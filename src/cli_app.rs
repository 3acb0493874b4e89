//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use serde_json::{Value, json};
use thiserror::Error;

use python_tutor::analytics::{DEFAULT_RECENT_K, DEFAULT_TOP_N, Insights, KeywordVocabulary};
use python_tutor::core::config::Config;
use python_tutor::core::errors::TutorError;
use python_tutor::history::{HistoryWriter, RepairOutcome, repair_history, scan_history};
#[cfg(feature = "chart")]
use python_tutor::report::{ChartOptions, open_image, render_chart};
use python_tutor::report::render_text_summary;
use python_tutor::tutor::{
    GeminiClient, RetryPolicy, TutorSession, load_knowledge_base, system_instruction,
};

/// Python Tutor: ask questions, keep a self-repairing history, review progress.
#[derive(Debug, Parser)]
#[command(
    name = "tutor",
    author,
    version,
    about = "Python Tutor - LLM tutoring with usage analytics",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the history log path.
    #[arg(long, global = true, value_name = "PATH")]
    history: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Start an interactive tutoring session.
    Chat,
    /// Validate the history log, writing a `_cleaned` copy if lines are invalid.
    Validate(ValidateArgs),
    /// Print cumulative usage statistics.
    Stats(StatsArgs),
    /// Render the two-panel PNG analytics report.
    #[cfg(feature = "chart")]
    Report(ReportArgs),
    /// View configuration state.
    Config(ConfigArgs),
    /// Show version and optional build metadata.
    Version(VersionArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct ValidateArgs {
    /// Log to validate (defaults to the configured history log).
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Args, Default)]
struct StatsArgs {
    /// Session length in minutes to show in the summary header.
    #[arg(long, default_value_t = 0.0, value_name = "MINUTES")]
    duration: f64,
    /// Number of top keywords to show.
    #[arg(long, value_name = "N")]
    top: Option<usize>,
    /// Number of recent exchanges to show.
    #[arg(long, value_name = "K")]
    recent: Option<usize>,
}

#[cfg(feature = "chart")]
#[derive(Debug, Clone, Args, Default)]
struct ReportArgs {
    /// Output image path (defaults to the configured report image).
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Open the image with the platform viewer after writing it.
    #[arg(long)]
    open: bool,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
}

#[derive(Debug, Clone, Args, Default)]
struct VersionArgs {
    /// Include additional build metadata fields.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// The history log had invalid lines and a repaired copy was written.
    #[error("history log repaired into {}", .0.display())]
    Repaired(PathBuf),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) | Self::Repaired(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
        }
    }
}

impl From<TutorError> for CliError {
    fn from(err: TutorError) -> Self {
        match err {
            TutorError::InvalidConfig { .. }
            | TutorError::MissingConfig { .. }
            | TutorError::ConfigParse { .. }
            | TutorError::MissingApiKey { .. } => Self::User(err.to_string()),
            TutorError::Serialization { .. } => Self::Internal(err.to_string()),
            _ => Self::Runtime(err.to_string()),
        }
    }
}

/// Install the stderr tracing subscriber for this invocation.
pub fn init_tracing(cli: &Cli) {
    let env_directive = std::env::var("TUTOR_LOG").ok();
    let directive = log_directive(cli.verbose, cli.quiet, env_directive.as_deref());
    let filter = tracing_subscriber::EnvFilter::try_new(&directive)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// `-v`/`-q` win over `TUTOR_LOG`, which wins over the `warn` default.
fn log_directive(verbose: bool, quiet: bool, env_directive: Option<&str>) -> String {
    if verbose {
        return "debug".to_string();
    }
    if quiet {
        return "error".to_string();
    }
    env_directive
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or("warn")
        .to_string()
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Chat => run_chat(cli),
        Command::Validate(args) => run_validate(cli, args),
        Command::Stats(args) => run_stats(cli, args),
        #[cfg(feature = "chart")]
        Command::Report(args) => run_report(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Version(args) => emit_version(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(history) = &cli.history {
        config.paths.history_log.clone_from(history);
    }
    Ok(config)
}

/// Read the log (valid records only) and aggregate it.
fn load_insights(config: &Config, top: usize, recent: usize) -> Result<Insights, CliError> {
    let scan = scan_history(&config.paths.history_log)?;
    if !scan.is_clean() {
        tracing::warn!(
            dropped = scan.rejected.len(),
            "ignoring invalid history lines; run `tutor validate` to write a repaired copy"
        );
    }
    let vocabulary = KeywordVocabulary::new(&config.analytics.keywords)?;
    Ok(Insights::compute(&scan.records, &vocabulary, top, recent))
}

// ──────────────────── chat ────────────────────

fn run_chat(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let client = GeminiClient::from_env(&config.model)?;
    let knowledge = load_knowledge_base(&config.paths.knowledge_base)?;
    let mut session = TutorSession::new(
        client,
        HistoryWriter::new(&config.paths.history_log),
        RetryPolicy::from_config(&config.retry),
        system_instruction(&knowledge),
        config.model.max_output_tokens,
    );
    let mut editor =
        DefaultEditor::new().map_err(|e| CliError::Runtime(format!("terminal setup: {e}")))?;

    println!(
        "{}",
        "--- Python Tutor Active (Type 'exit' to end) ---".bright_green()
    );
    loop {
        match editor.readline("\nStudent: ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if is_exit_command(input) {
                    break;
                }
                let _ = editor.add_history_entry(input);
                match session.ask(input) {
                    Ok(answer) => println!("\n{} {answer}", "Tutor:".bold().cyan()),
                    Err(e) => eprintln!("{}", format!("Error: {e}").red()),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(CliError::Runtime(format!("input failure: {e}"))),
        }
    }

    let minutes = session.elapsed_minutes();
    println!("\n[System] Finalizing session ({minutes} min)...");
    let outcome = repair_history(
        &config.paths.history_log,
        &config.paths.effective_repair_dir()?,
    )?;
    if !outcome.is_valid() {
        println!("{}", "⚠️  Note: Logs were repaired.".yellow());
    }

    let insights = load_insights(
        &config,
        config.analytics.top_keywords,
        config.analytics.recent_window,
    )?;
    let mut stdout = io::stdout().lock();
    render_text_summary(&mut stdout, &insights, minutes)?;
    stdout.flush()?;
    Ok(())
}

fn is_exit_command(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "exit" | "quit")
}

// ──────────────────── validate ────────────────────

fn run_validate(cli: &Cli, args: &ValidateArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let path = args
        .path
        .clone()
        .unwrap_or_else(|| config.paths.history_log.clone());
    let outcome = repair_history(&path, &config.paths.effective_repair_dir()?)?;

    match output_mode(cli) {
        OutputMode::Human => match &outcome {
            RepairOutcome::Missing => {
                println!("No history log at {}; nothing to validate.", path.display());
            }
            RepairOutcome::Clean { records } => {
                println!("History log is valid ({records} records).");
            }
            RepairOutcome::Repaired {
                cleaned_path,
                kept,
                dropped,
            } => {
                println!("{}", "⚠️  Note: Logs were repaired.".yellow());
                println!("  Kept:     {kept}");
                println!("  Dropped:  {dropped}");
                println!("  Repaired: {}", cleaned_path.display());
            }
        },
        OutputMode::Json => {
            let mut payload = json!({
                "command": "validate",
                "path": path.to_string_lossy(),
                "valid": outcome.is_valid(),
            });
            match &outcome {
                RepairOutcome::Missing => payload["status"] = json!("missing"),
                RepairOutcome::Clean { records } => {
                    payload["status"] = json!("clean");
                    payload["records"] = json!(records);
                }
                RepairOutcome::Repaired {
                    cleaned_path,
                    kept,
                    dropped,
                } => {
                    payload["status"] = json!("repaired");
                    payload["cleaned_path"] = json!(cleaned_path.to_string_lossy());
                    payload["kept"] = json!(kept);
                    payload["dropped"] = json!(dropped);
                }
            }
            write_json_line(&payload)?;
        }
    }

    match outcome {
        RepairOutcome::Repaired { cleaned_path, .. } => Err(CliError::Repaired(cleaned_path)),
        RepairOutcome::Missing | RepairOutcome::Clean { .. } => Ok(()),
    }
}

// ──────────────────── stats / report ────────────────────

fn run_stats(cli: &Cli, args: &StatsArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let top = positive_or(args.top, config.analytics.top_keywords, "--top")?;
    let recent = positive_or(args.recent, config.analytics.recent_window, "--recent")?;
    if !args.duration.is_finite() || args.duration < 0.0 {
        return Err(CliError::User(
            "--duration must be a non-negative number of minutes".to_string(),
        ));
    }
    let insights = load_insights(&config, top, recent)?;

    match output_mode(cli) {
        OutputMode::Human => {
            let mut stdout = io::stdout().lock();
            render_text_summary(&mut stdout, &insights, args.duration)?;
            stdout.flush()?;
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "stats",
                "history": config.paths.history_log.to_string_lossy(),
                "session_minutes": args.duration,
                "insights": insights.to_json(),
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn positive_or(value: Option<usize>, fallback: usize, flag: &str) -> Result<usize, CliError> {
    match value {
        Some(0) => Err(CliError::User(format!("{flag} must be at least 1"))),
        Some(n) => Ok(n),
        None if fallback == 0 => Ok(if flag == "--top" {
            DEFAULT_TOP_N
        } else {
            DEFAULT_RECENT_K
        }),
        None => Ok(fallback),
    }
}

#[cfg(feature = "chart")]
fn run_report(cli: &Cli, args: &ReportArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let insights = load_insights(
        &config,
        config.analytics.top_keywords,
        config.analytics.recent_window,
    )?;
    let options = ChartOptions {
        output: args
            .output
            .clone()
            .unwrap_or_else(|| config.paths.report_image.clone()),
        dpi: config.chart.dpi,
        font_path: config.chart.font_path.clone(),
    };
    let written = render_chart(&insights, &options)?;

    match output_mode(cli) {
        OutputMode::Human => {
            println!("{} {}", "Report saved:".green(), written.display());
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "report",
                "path": written.to_string_lossy(),
                "records": insights.summary.total_queries,
                "dpi": options.dpi,
            });
            write_json_line(&payload)?;
        }
    }
    if args.open {
        open_image(&written)?;
    }
    Ok(())
}

// ──────────────────── config / version ────────────────────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = load_config(cli)?;

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", config.to_toml()?);
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
    }
}

fn emit_version(cli: &Cli, args: &VersionArgs) -> Result<(), CliError> {
    let version = env!("CARGO_PKG_VERSION");
    let package = env!("CARGO_PKG_NAME");
    let target = option_env!("TARGET").unwrap_or("unknown");
    let profile = option_env!("PROFILE").unwrap_or("unknown");
    let chart = cfg!(feature = "chart");

    match output_mode(cli) {
        OutputMode::Human => {
            println!("tutor {version}");
            if args.verbose {
                println!("package: {package}");
                println!("target: {target}");
                println!("profile: {profile}");
                println!("chart: {chart}");
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "binary": "tutor",
                "version": version,
                "package": package,
                "build": {
                    "target": target,
                    "profile": profile,
                    "chart": chart,
                }
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("TUTOR_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

/// `--json` wins; then `TUTOR_OUTPUT_FORMAT` (`json`, `human`, or `auto` for
/// JSON only when stdout is not a terminal); human otherwise.
fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("auto") if !stdout_is_tty => OutputMode::Json,
        _ => OutputMode::Human,
    }
}
