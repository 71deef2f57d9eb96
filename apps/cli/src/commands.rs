//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use broadsheet_core::{IssueRunResult, ProgressReporter, SystemProbe, run_issue};
use broadsheet_render::HtmlRenderer;
use broadsheet_shared::{
    AppConfig, IssueConfig, Resolution, init_config, load_config, load_config_from,
    validate_api_key,
};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Broadsheet: today's paper, assembled for offline reading.
#[derive(Parser)]
#[command(
    name = "broadsheet",
    version,
    about = "Assemble today's newspaper issue into a local archive.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.broadsheet/broadsheet.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Edition resolution strategy.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum ResolutionArg {
    /// Trust the system clock.
    Clock,
    /// Check the clock against the printed date on the contents page.
    Scrape,
}

impl From<ResolutionArg> for Resolution {
    fn from(arg: ResolutionArg) -> Self {
        match arg {
            ResolutionArg::Clock => Resolution::Clock,
            ResolutionArg::Scrape => Resolution::Scrape,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch, render and archive today's issue.
    Run {
        /// Archive root (overrides `archive.dir`).
        #[arg(long)]
        archive_dir: Option<PathBuf>,

        /// Edition resolution strategy (overrides `edition.resolution`).
        #[arg(long)]
        resolution: Option<ResolutionArg>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "broadsheet=info",
        1 => "broadsheet=debug",
        _ => "broadsheet=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run {
            archive_dir,
            resolution,
        } => cmd_run(config_path, archive_dir, resolution).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

/// Load the config from `--config` or the default location.
fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => {
            if !path.exists() {
                return Err(eyre!("config file '{}' does not exist", path.display()));
            }
            load_config_from(path)?
        }
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    config_path: Option<&Path>,
    archive_dir: Option<PathBuf>,
    resolution: Option<ResolutionArg>,
) -> Result<()> {
    let mut config = load(config_path)?;
    if let Some(resolution) = resolution {
        config.edition.resolution = resolution.into();
    }

    // Validate API key before doing anything
    let api_key = validate_api_key(&config)?;

    let mut issue_config = IssueConfig::new(&config, api_key);
    if let Some(dir) = archive_dir {
        issue_config.archive_dir = dir;
    }

    info!(
        archive = %issue_config.archive_dir.display(),
        resolution = ?issue_config.edition.resolution,
        "starting issue run"
    );

    let reporter = CliProgress::new();
    let outcome = run_issue(
        &issue_config,
        chrono::Utc::now(),
        &SystemProbe,
        &HtmlRenderer,
        &reporter,
    )
    .await;

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            reporter.abandon();
            return Err(e.into());
        }
    };

    print_summary(&result);
    Ok(())
}

fn print_summary(result: &IssueRunResult) {
    println!();
    println!("  Issue assembled!");
    println!("  Date:      {} ({})", result.date, result.kind);
    println!("  Paper:     {}", result.paper_name);
    println!("  Books:     {}", result.book_count);
    println!("  Articles:  {}", result.article_count);
    println!("  Skipped:   {}", result.skipped);
    println!("  Max words: {}", result.max_words);
    println!("  Path:      {}", result.issue_dir.display());
    if !result.pruned.is_empty() {
        println!("  Pruned:    {} old issue(s)", result.pruned.len());
    }
    println!("  Time:      {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn abandon(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_fetched(&self, page: u32, records: usize) {
        self.spinner
            .set_message(format!("Fetched page {page} ({records} records)"));
    }

    fn article_written(&self, file: &str, count: usize) {
        self.spinner.set_message(format!("Rendering [{count}] {file}"));
    }

    fn done(&self, _result: &IssueRunResult) {
        self.spinner.finish_and_clear();
    }
}
