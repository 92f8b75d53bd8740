//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use doxymark_core::pipeline::{ProgressReporter, RenderResult};
use doxymark_shared::{AppConfig, RenderConfig, init_config, load_config, load_config_from};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// doxymark: Doxygen XML to Markdown.
#[derive(Parser)]
#[command(
    name = "doxymark",
    version,
    about = "Render Doxygen XML output as Markdown API documentation.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
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

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Render a Doxygen XML directory to Markdown.
    Render(RenderArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags for `doxymark render`. Anything given here wins over the config file.
#[derive(clap::Args, Debug)]
pub(crate) struct RenderArgs {
    /// Directory containing Doxygen's `index.xml`.
    pub input: PathBuf,

    /// Output file (group documents are named after it).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write one document per group.
    #[arg(long, conflicts_with = "single")]
    pub groups: bool,

    /// Write everything into a single document.
    #[arg(long)]
    pub single: bool,

    /// Do not emit heading anchors.
    #[arg(long)]
    pub no_anchors: bool,

    /// Directory with `namespace.md`, `class.md` and `group.md` templates.
    #[arg(long, value_name = "DIR")]
    pub templates: Option<PathBuf>,

    /// Config file to use instead of `~/.doxymark/doxymark.toml`.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
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
        0 => "doxymark=info",
        1 => "doxymark=debug",
        _ => "doxymark=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

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
    match cli.command {
        Command::Render(args) => cmd_render(&args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_render(args: &RenderArgs) -> Result<()> {
    if !args.input.is_dir() {
        return Err(eyre!("input '{}' is not a directory", args.input.display()));
    }

    let app_config = resolve_config(args.config.as_deref())?;
    let config = render_config(&app_config, args);

    info!(
        input = %config.input_dir.display(),
        output = %config.output.display(),
        groups = config.groups,
        "rendering documentation"
    );

    let reporter = CliProgress::new();
    let result = doxymark_core::pipeline::render_docs(&config, &reporter).await?;

    // Print summary
    println!();
    println!("  Documentation rendered!");
    println!("  Documents: {}", result.units);
    println!("  Rendered:  {}", result.nodes_rendered);
    println!("  Skipped:   {}", result.nodes_skipped);
    for file in &result.files {
        println!("  Wrote:     {}", file.display());
    }
    println!(
        "  Time:      {:.1}s",
        result.elapsed.as_secs_f64()
    );
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Merge the file configuration with command-line overrides.
fn render_config(app_config: &AppConfig, args: &RenderArgs) -> RenderConfig {
    let mut config = RenderConfig::from(app_config);
    config.input_dir = args.input.clone();

    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    if args.groups {
        config.groups = true;
    }
    if args.single {
        config.groups = false;
    }
    if args.no_anchors {
        config.anchors = false;
    }
    if let Some(dir) = &args.templates {
        config.template_dir = Some(dir.clone());
    }
    config
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
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn node_rendered(&self, name: &str, current: usize, total: usize) {
        self.spinner.set_message(format!("Rendering [{current}/{total}] {name}"));
    }

    fn done(&self, _result: &RenderResult) {
        self.spinner.finish_and_clear();
    }
}
