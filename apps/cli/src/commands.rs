//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Report, Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use casegraph_core::pipeline::{self, BuildOptions, BuildOutput, ProgressReporter};
use casegraph_core::{EntityKind, build_graphs};
use casegraph_loader::{LoadOptions, PackageSource};
use casegraph_shared::{AppConfig, ConvertConfig, init_config, load_config, load_config_from};
use casegraph_writer::{OutputLayout, WriteOptions};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// casegraph: publish CASE frameworks as CTDL courses and competency frameworks.
#[derive(Parser)]
#[command(
    name = "casegraph",
    version,
    about = "Convert CASE packages into CTDL/CTDL-ASN graphs with a validation report.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.casegraph/casegraph.toml.
    #[arg(long, global = true, env = "CASEGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Convert a CASE package (URL or JSON file) into registry-ready files.
    Convert(ConvertArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
pub(crate) struct ConvertArgs {
    /// CFPackage URL or path to an exported package JSON file.
    pub source: String,

    /// Output root directory (defaults to `output_root` from config).
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Registry resource base URI.
    #[arg(long)]
    pub registry_base: Option<String>,

    /// Publisher CTIDs or registry URIs (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub publisher: Vec<String>,

    /// Owning organization CTIDs or registry URIs (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub owned_by: Vec<String>,

    /// Offering organization CTIDs or registry URIs (comma-separated).
    /// Courses and programs only get `offeredBy` when this is set.
    #[arg(long, value_delimiter = ',')]
    pub offered_by: Option<Vec<String>>,

    /// Build and validate without writing any files.
    #[arg(long)]
    pub dry_run: bool,
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
        0 => "casegraph=info",
        1 => "casegraph=debug",
        _ => "casegraph=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
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
        Command::Convert(args) => cmd_convert(&args, config_path).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

/// Flags override the config file, which overrides defaults.
fn merge_convert_config(config: &AppConfig, args: &ConvertArgs) -> ConvertConfig {
    let mut merged = ConvertConfig::from(config);
    if let Some(base) = &args.registry_base {
        merged.registry_base = base.clone();
    }
    if !args.publisher.is_empty() {
        merged.publisher = args.publisher.clone();
    }
    if !args.owned_by.is_empty() {
        merged.owned_by = args.owned_by.clone();
    }
    if let Some(offered_by) = &args.offered_by {
        merged.offered_by = Some(offered_by.clone());
    }
    merged
}

async fn cmd_convert(args: &ConvertArgs, config_path: Option<&Path>) -> Result<()> {
    let start = Instant::now();
    let config = resolve_config(config_path)?;
    let options = BuildOptions::from_config(&merge_convert_config(&config, args))?;
    let source = PackageSource::parse(&args.source)?;

    info!(%source, dry_run = args.dry_run, "converting CASE package");

    let reporter = CliProgress::new();
    reporter.phase("Loading CASE package");
    let load_opts = LoadOptions {
        timeout_secs: config.defaults.fetch_timeout_secs,
    };
    let package = match casegraph_loader::load(&source, &load_opts).await {
        Ok(package) => package,
        Err(e) => return Err(reporter.fail(eyre!("failed to load '{source}': {e}"))),
    };

    let output = match build_graphs(&package, &options, &reporter) {
        Ok(output) => output,
        Err(e) => return Err(reporter.fail(e.into())),
    };

    let layout = OutputLayout::from_defaults(&config.defaults, args.out.as_deref());
    let written = if args.dry_run {
        None
    } else {
        let write_opts = WriteOptions {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            registry_base: options.registry_base.clone(),
            publisher_ctid: options.publisher_ctid(),
        };
        Some(casegraph_writer::write_outputs(&output, &layout, &write_opts)?)
    };

    if output.report.has_errors() {
        warn!("some entities failed validation; see the validation report");
    }

    print_summary(&output, written.as_ref(), &layout, start);
    pipeline::ensure_some_output(&output)?;
    Ok(())
}

fn print_summary(
    output: &BuildOutput,
    written: Option<&casegraph_writer::WriteResult>,
    layout: &OutputLayout,
    start: Instant,
) {
    let report = &output.report;
    let line = |label: &str, kind: EntityKind| {
        println!(
            "  {label:<18} {:>4} built, {:>4} with errors",
            report.checked_count(kind),
            report.error_count(kind)
        );
    };

    println!();
    match written {
        Some(result) => println!("  Conversion complete: {} file(s) written", result.manifest.files.len()),
        None => println!("  Dry run complete: nothing written"),
    }
    line("Courses:", EntityKind::Course);
    line("Frameworks:", EntityKind::CompetencyFramework);
    line("Competencies:", EntityKind::Competency);
    line("Learning programs:", EntityKind::LearningProgram);
    println!("  {:<18} {:>4}", "Anomalies:", report.anomalies().len());
    if let Some(result) = written {
        println!("  Output:   {}", result.root.display());
        println!(
            "  Report:   {}",
            result.root.join(&layout.validations_file).display()
        );
    }
    println!("  Time:     {:.1}s", start.elapsed().as_secs_f64());
    println!();
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
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    /// Clear the spinner before an error is reported.
    fn fail(&self, err: Report) -> Report {
        self.spinner.finish_and_clear();
        err
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn course_built(&self, name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Building [{current}/{total}] {name}"));
    }

    fn done(&self, _output: &BuildOutput) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
