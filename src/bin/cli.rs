//! Menu Sync CLI
//!
//! Collects school cafeteria menus and mirrors them into a calendar.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use clap::{ArgAction, Parser, ValueEnum};
use menu_sync::{
    calendar::CredentialSource,
    error::Result,
    models::{Config, ParserConfig, ProviderParams, Reminder, SyncWindow},
    pipeline::{
        self, CleanupOptions, EventSettings, RunOptions, cleanup_exit_code, exit_code,
        format_records,
    },
    utils::{TextRules, log::log_file_path, resolve_color},
};

/// School menu → calendar sync
#[derive(Parser, Debug)]
#[command(
    name = "menu-sync",
    version,
    about = "Sync school cafeteria menus into Google Calendar as all-day events"
)]
struct Cli {
    /// Base URL of the menu API (selects the provider)
    #[arg(short = 'u', long, required_unless_present = "cleanup_duplicates")]
    base_url: Option<String>,

    /// Target calendar ID (required unless --dry-run)
    #[arg(short = 'c', long)]
    calendar_id: Option<String>,

    /// Prefix marking the events this tool manages
    #[arg(short = 'p', long, default_value = "")]
    event_prefix: String,

    /// Event color name or ID (1-11)
    #[arg(short = 'o', long, default_value = "grape")]
    event_color: String,

    /// OAuth client secret file
    #[arg(short = 'r', long, conflicts_with = "service_account")]
    credentials: Option<PathBuf>,

    /// OAuth token cache file
    #[arg(short = 't', long, default_value = "token.json")]
    token: PathBuf,

    /// Service account key file (instead of the OAuth flow)
    #[arg(long)]
    service_account: Option<PathBuf>,

    /// Log level
    #[arg(short = 'l', long, value_enum, ignore_case = true, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Directory for daily log files
    #[arg(short = 'd', long)]
    log_dir: Option<PathBuf>,

    /// Log only to the file in --log-dir
    #[arg(short = 'n', long, requires = "log_dir")]
    no_stdout: bool,

    /// Number of weeks to sync
    #[arg(short = 'w', long, default_value_t = 8)]
    max_weeks: u32,

    /// First day to sync (YYYY-MM-DD), defaults to today
    #[arg(short = 's', long)]
    start_date: Option<NaiveDate>,

    /// Collect and diff only, never change the calendar
    #[arg(short = 'x', long)]
    dry_run: bool,

    /// Popup reminder such as 15m, 1h or 1d
    #[arg(long)]
    reminder: Option<String>,

    /// FDMealPlanner account ID
    #[arg(short = 'a', long)]
    account_id: Option<String>,

    /// FDMealPlanner location ID
    #[arg(short = 'i', long)]
    location_id: Option<String>,

    /// FDMealPlanner meal period ID
    #[arg(short = 'm', long)]
    meal_period_id: Option<String>,

    /// FDMealPlanner tenant ID
    #[arg(short = 'e', long)]
    tenant_id: Option<String>,

    /// Text replacements as find->replace, applied in order
    #[arg(short = 'R', long, num_args = 1.., action = ArgAction::Append)]
    text_replacements: Vec<String>,

    /// Remove the "WG" abbreviation from menu text
    #[arg(long)]
    replace_wg: bool,

    /// Report duplicate menu events instead of syncing
    #[arg(long, conflicts_with = "dry_run")]
    cleanup_duplicates: bool,

    /// Delete the duplicates found by --cleanup-duplicates
    #[arg(long, requires = "cleanup_duplicates")]
    delete: bool,

    /// Policy configuration file
    #[arg(long, default_value = "menu-sync.toml")]
    config: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Writes every log line to stderr and the log file.
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

/// Initialize logging, optionally into a daily file.
fn init_logging(level: LogLevel, log_dir: Option<&Path>, no_stdout: bool) -> io::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_filter()));
    builder.format_timestamp_secs();

    if let Some(dir) = log_dir {
        fs::create_dir_all(dir)?;
        let path = log_file_path(dir, Local::now().date_naive());
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let target: Box<dyn Write + Send> = if no_stdout {
            Box::new(file)
        } else {
            Box::new(Tee { file })
        };
        builder
            .target(env_logger::Target::Pipe(target))
            .write_style(env_logger::WriteStyle::Never);
    }

    builder.init();
    Ok(())
}

/// Turn flags into run options, surfacing configuration errors early.
fn build_options(cli: &Cli) -> Result<RunOptions> {
    let color_id = resolve_color(&cli.event_color)?;
    let reminder = cli
        .reminder
        .as_deref()
        .map(str::parse::<Reminder>)
        .transpose()?;
    let text_rules = TextRules::parse(&cli.text_replacements, cli.replace_wg)?;

    Ok(RunOptions {
        parser: ParserConfig {
            base_url: cli.base_url.clone().unwrap_or_default(),
            params: ProviderParams {
                account_id: cli.account_id.clone(),
                location_id: cli.location_id.clone(),
                meal_period_id: cli.meal_period_id.clone(),
                tenant_id: cli.tenant_id.clone(),
            },
            text_rules,
        },
        window: window(cli)?,
        calendar_id: cli.calendar_id.clone(),
        event: EventSettings {
            prefix: cli.event_prefix.clone(),
            color_id,
            reminder,
        },
        dry_run: cli.dry_run,
        credentials: credentials(cli)?,
    })
}

fn build_cleanup_options(cli: &Cli) -> Result<CleanupOptions> {
    Ok(CleanupOptions {
        window: window(cli)?,
        calendar_id: cli.calendar_id.clone(),
        prefix: cli.event_prefix.clone(),
        delete: cli.delete,
        credentials: credentials(cli)?,
    })
}

fn window(cli: &Cli) -> Result<SyncWindow> {
    let start_date = cli.start_date.unwrap_or_else(|| Local::now().date_naive());
    SyncWindow::new(start_date, cli.max_weeks)
}

fn credentials(cli: &Cli) -> Result<CredentialSource> {
    CredentialSource::from_args(
        cli.credentials.clone(),
        cli.token.clone(),
        cli.service_account.clone(),
    )
}

async fn cleanup(cli: &Cli, config: &Config) -> ExitCode {
    let result = match build_cleanup_options(cli) {
        Ok(options) => pipeline::run_cleanup(options, config).await,
        Err(e) => Err(e),
    };

    match &result {
        Ok(report) if report.has_failures() => log::warn!("Cleanup completed with failures"),
        Ok(_) => log::info!("Done!"),
        Err(e) if e.is_configuration() => log::error!("Configuration error: {e}"),
        Err(e) => log::error!("Cleanup failed: {e}"),
    }

    ExitCode::from(u8::try_from(cleanup_exit_code(&result)).unwrap_or(1))
}

/// Main entry point for the CLI application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.log_level, cli.log_dir.as_deref(), cli.no_stdout) {
        eprintln!("Failed to set up logging: {e}");
        return ExitCode::from(pipeline::run::EXIT_CONFIGURATION as u8);
    }

    let config = Config::load_or_default(&cli.config);
    if cli.cleanup_duplicates {
        return cleanup(&cli, &config).await;
    }

    let result = match build_options(&cli) {
        Ok(options) => pipeline::run(options, &config).await,
        Err(e) => Err(e),
    };

    match &result {
        Ok(outcome) => {
            if cli.calendar_id.is_none() {
                print!("{}", format_records(&outcome.records));
            }
            if outcome.has_failures() {
                log::warn!("Completed with failures");
            } else {
                log::info!("Done!");
            }
        }
        Err(e) if e.is_configuration() => log::error!("Configuration error: {e}"),
        Err(e) => log::error!("Sync process failed: {e}"),
    }

    ExitCode::from(u8::try_from(exit_code(&result)).unwrap_or(1))
}
