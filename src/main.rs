// KioskLog - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. Config loading (config.toml) and logging initialisation
// 3. Dispatch to scan / dump / patterns / config commands
//
// Logs go to stderr; the report summary and listings go to stdout.

use clap::{Args, Parser, Subcommand};
use kiosklog::app::{dump, pattern_mgr, scan};
use kiosklog::core::export;
use kiosklog::core::filter;
use kiosklog::core::model::{ReportFormat, SessionScope};
use kiosklog::core::patterns::{PatternTable, RoleAssignment};
use kiosklog::platform::config::{self, AppConfig, PlatformPaths};
use kiosklog::platform::fs;
use kiosklog::util::constants;
use kiosklog::util::error::{KioskLogError, Result};
use kiosklog::util::logging;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// KioskLog - classify kiosk client logs into an event report.
///
/// Walks a tree of per-machine zip bundles, matches every log line against
/// an editable pattern table, and derives first/normal/abnormal boot events
/// from the order of logouts and client starts.
#[derive(Parser, Debug)]
#[command(name = "kiosklog", version, about)]
struct Cli {
    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    /// Path to config.toml (default: platform config directory).
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a directory of machine archives and write the event report.
    Scan(ScanArgs),

    /// Show or edit the pattern table.
    Patterns {
        /// Pattern table file (default: from config, then platform directory).
        #[arg(short = 'p', long = "patterns", global = true)]
        patterns: Option<PathBuf>,

        #[command(subcommand)]
        action: PatternAction,
    },

    /// Dump every log line of one archive into per-kind CSV tables.
    Dump(DumpArgs),

    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Directory holding the machine archives (default: from config).
    root: Option<PathBuf>,

    /// Report file to write.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Report format.
    #[arg(long = "format", value_parser = parse_format)]
    format: Option<ReportFormat>,

    /// Only include log files dated on or after this day (YYYY-MM-DD).
    #[arg(long = "from", value_parser = filter::parse_date)]
    from: Option<chrono::NaiveDate>,

    /// Only include log files dated on or before this day (YYYY-MM-DD).
    #[arg(long = "to", value_parser = filter::parse_date)]
    to: Option<chrono::NaiveDate>,

    /// Pattern table file (default: from config, then platform directory).
    #[arg(short = 'p', long = "patterns")]
    patterns: Option<PathBuf>,

    /// Whether boundary checkpoints reset per machine or span the whole run.
    #[arg(long = "session-scope", value_parser = parse_scope)]
    session_scope: Option<SessionScope>,
}

#[derive(Args, Debug)]
struct DumpArgs {
    /// Machine archive (zip) to dump.
    archive: PathBuf,

    /// Directory for Main_Logs.csv, Local_Logs.csv and Command_Logs.csv.
    #[arg(short = 'o', long = "output", default_value = constants::DEFAULT_DUMP_DIR)]
    output: PathBuf,
}

#[derive(Subcommand, Debug)]
enum PatternAction {
    /// List entries in match order with their roles.
    List,
    /// Append a new entry.
    Add { key: String, pattern: String },
    /// Remove an entry by key.
    Remove { key: String },
    /// Restore the built-in table.
    Reset,
}

fn parse_format(s: &str) -> std::result::Result<ReportFormat, String> {
    s.parse()
}

fn parse_scope(s: &str) -> std::result::Result<SessionScope, String> {
    s.parse()
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let platform_paths = PlatformPaths::resolve();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| platform_paths.config_file.clone());
    let (app_config, config_warnings) = config::load_config(&config_path);

    logging::init(cli.debug, app_config.log_level.as_deref());

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        config = %config_path.display(),
        "KioskLog starting"
    );
    for warning in &config_warnings {
        tracing::warn!(warning = %warning, "Config warning");
    }

    let result = match cli.command {
        Command::Scan(args) => run_scan(args, app_config, &platform_paths),
        Command::Patterns { patterns, action } => {
            let path = patterns_path(patterns, &app_config, &platform_paths);
            run_patterns(action, &path, &app_config.roles)
        }
        Command::Dump(args) => run_dump(args, &app_config),
        Command::Config => {
            let patterns = patterns_path(None, &app_config, &platform_paths);
            print_config(&app_config, &config_path, &patterns)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Pattern file location: CLI override > config > platform default.
fn patterns_path(cli: Option<PathBuf>, config: &AppConfig, paths: &PlatformPaths) -> PathBuf {
    cli.or_else(|| config.patterns_file.clone())
        .unwrap_or_else(|| paths.patterns_file.clone())
}

fn load_patterns(path: &Path, roles: &RoleAssignment) -> PatternTable {
    let (table, errors) = pattern_mgr::load_or_init(path, roles);
    for err in &errors {
        tracing::warn!(error = %err, "Pattern table warning");
    }
    table
}

fn run_scan(args: ScanArgs, mut config: AppConfig, paths: &PlatformPaths) -> Result<()> {
    // CLI flags override config values.
    if let Some(format) = args.format {
        config.output_format = format;
    }
    if let Some(scope) = args.session_scope {
        config.session_scope = scope;
    }
    config.date_range = config.date_range.with_overrides(args.from, args.to)?;
    let root = args.root.unwrap_or_else(|| config.logs_dir.clone());
    let output = args.output.unwrap_or_else(|| config.output_file.clone());

    let table = load_patterns(
        &patterns_path(args.patterns, &config, paths),
        &config.roles,
    );
    let options = scan::ScanOptions::from_config(&config, root);
    let report = scan::run_scan(&options, &table)?;

    write_report(&report.records, &output, config.output_format)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let io_err = |source: std::io::Error| KioskLogError::Io {
        path: PathBuf::from("<stdout>"),
        operation: "write summary",
        source,
    };
    writeln!(
        out,
        "Scanned {} archives, {} files, {} lines in {:.2}s",
        report.stats.archives,
        report.stats.files,
        report.stats.lines,
        report.stats.duration.as_secs_f64()
    )
    .map_err(io_err)?;
    export::write_summary(&export::summarize(&report.records), &mut out).map_err(io_err)?;
    writeln!(out, "Report written to {}", output.display()).map_err(io_err)?;

    if report.stats.malformed_timestamps > 0 {
        writeln!(
            out,
            "{} matched lines skipped for malformed timestamps",
            report.stats.malformed_timestamps
        )
        .map_err(io_err)?;
    }
    if !report.unprocessed.is_empty() {
        writeln!(out, "Unprocessed inputs ({}):", report.unprocessed.len()).map_err(io_err)?;
        for item in &report.unprocessed {
            writeln!(out, "  {}: {}", item.path.display(), item.reason).map_err(io_err)?;
        }
    }
    Ok(())
}

fn write_report(
    records: &[kiosklog::core::model::EventRecord],
    output: &Path,
    format: ReportFormat,
) -> Result<()> {
    let io_err = |source: std::io::Error| KioskLogError::Io {
        path: output.to_path_buf(),
        operation: "create report",
        source,
    };
    fs::ensure_parent_dir(output).map_err(io_err)?;
    let file = std::fs::File::create(output).map_err(io_err)?;
    let writer = std::io::BufWriter::new(file);

    let written = match format {
        ReportFormat::Csv => export::export_csv(records, writer, output)?,
        ReportFormat::Json => export::export_json(records, writer, output)?,
    };
    tracing::info!(path = %output.display(), records = written, %format, "Report written");
    Ok(())
}

fn run_dump(args: DumpArgs, config: &AppConfig) -> Result<()> {
    let report = dump::dump_archive(&args.archive, &config.log_dir_name)?;
    let written = dump::write_tables(&report.tables, &args.output)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let io_err = |source: std::io::Error| KioskLogError::Io {
        path: PathBuf::from("<stdout>"),
        operation: "write summary",
        source,
    };
    writeln!(
        out,
        "Dumped {} files, {} lines from {}",
        report.files,
        report.lines,
        args.archive.display()
    )
    .map_err(io_err)?;
    if written.is_empty() {
        writeln!(out, "No log lines found; nothing written").map_err(io_err)?;
    }
    for (kind, path, rows) in &written {
        writeln!(out, "  {:<8} {:>8} rows  {}", kind.to_string(), rows, path.display())
            .map_err(io_err)?;
    }
    for item in &report.unprocessed {
        writeln!(out, "  unprocessed {}: {}", item.path.display(), item.reason).map_err(io_err)?;
    }
    Ok(())
}

fn run_patterns(action: PatternAction, path: &Path, roles: &RoleAssignment) -> Result<()> {
    let table = match action {
        PatternAction::List => load_patterns(path, roles),
        PatternAction::Add { key, pattern } => {
            pattern_mgr::add_pattern(path, roles, &key, &pattern)?
        }
        PatternAction::Remove { key } => pattern_mgr::remove_pattern(path, roles, &key)?.0,
        PatternAction::Reset => pattern_mgr::reset_patterns(path, roles)?,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let io_err = |source: std::io::Error| KioskLogError::Io {
        path: PathBuf::from("<stdout>"),
        operation: "list patterns",
        source,
    };
    writeln!(out, "# {}", path.display()).map_err(io_err)?;
    for entry in table.iter() {
        writeln!(
            out,
            "{} {:<18} {}",
            export::pad_to_width(entry.key(), 20),
            entry.role().label(),
            entry.pattern()
        )
        .map_err(io_err)?;
    }
    Ok(())
}

fn print_config(config: &AppConfig, config_path: &Path, patterns_path: &Path) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let io_err = |source: std::io::Error| KioskLogError::Io {
        path: PathBuf::from("<stdout>"),
        operation: "print config",
        source,
    };
    writeln!(out, "# config file:   {}", config_path.display()).map_err(io_err)?;
    writeln!(out, "# patterns file: {}", patterns_path.display()).map_err(io_err)?;
    write!(out, "{}", config.to_toml()).map_err(io_err)?;
    Ok(())
}
