//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use docenrich_core::{Aggregator, Enricher, OutputFormat, ProcessProgress, ProcessSummary};
use docenrich_extract::read_document;
use docenrich_shared::{
    CancelSignal, Context, EnrichConfig, Metadata, SourceGroup, init_config, load_config,
    load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docenrich: enrich documents with aggregated source data.
#[derive(Parser)]
#[command(
    name = "docenrich",
    version,
    about = "Enrich documentation files with metadata, context, and aggregated source data.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (.toml, or JSON for any other extension).
    /// Defaults to ~/.docenrich/docenrich.toml.
    #[arg(long, global = true, env = "DOCENRICH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Cancel the whole run after this many seconds.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

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
    /// Enrich every supported document under a directory.
    Process {
        /// Directory to walk recursively.
        #[arg(long)]
        input_dir: PathBuf,

        /// File the records are written to.
        #[arg(long)]
        output: PathBuf,

        /// Output format: json or jsonl.
        #[arg(long, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Enrich one document and print the record.
    Enrich {
        /// Document to enrich.
        file: PathBuf,
    },

    /// Run one aggregation pass over precomputed metadata and context.
    Integrate {
        /// Metadata as JSON text or a path to a JSON file.
        #[arg(long)]
        metadata: String,

        /// Context as JSON text or a path to a JSON file.
        #[arg(long)]
        context: String,

        /// Which configured source list to query: external or internal.
        #[arg(long, default_value_t = SourceGroup::External)]
        group: SourceGroup,
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
        0 => "docenrich=warn",
        1 => "docenrich=info",
        2 => "docenrich=debug",
        _ => "docenrich=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
    if let Command::Config { action } = &cli.command {
        return match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()),
        };
    }

    let config = resolve_config(cli.config.as_deref())?;
    let cancel = install_cancel(cli.timeout);

    match cli.command {
        Command::Process {
            input_dir,
            output,
            format,
        } => cmd_process(config, &input_dir, &output, format, &cancel).await,
        Command::Enrich { file } => cmd_enrich(config, &file, &cancel).await,
        Command::Integrate {
            metadata,
            context,
            group,
        } => cmd_integrate(config, &metadata, &context, group, &cancel).await,
        Command::Config { .. } => Ok(()),
    }
}

fn resolve_config(path: Option<&Path>) -> Result<EnrichConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// A signal fired by Ctrl-C or, when given, the `--timeout` deadline.
fn install_cancel(timeout: Option<u64>) -> CancelSignal {
    let (handle, signal) = CancelSignal::pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling in-flight fetches");
            handle.cancel();
        }
    });

    match timeout {
        Some(secs) => signal.with_timeout(Duration::from_secs(secs)),
        None => signal,
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_process(
    config: EnrichConfig,
    input_dir: &Path,
    output: &Path,
    format: OutputFormat,
    cancel: &CancelSignal,
) -> Result<()> {
    if !input_dir.is_dir() {
        return Err(eyre!("'{}' is not a directory", input_dir.display()));
    }

    info!(input = %input_dir.display(), output = %output.display(), %format, "processing directory");

    let enricher = Enricher::new(config)?;
    let reporter = CliProgress::new();
    let summary = docenrich_core::process_directory(
        input_dir, output, format, &enricher, cancel, &reporter,
    )
    .await?;

    println!();
    println!("  Documents processed.");
    println!("  Found:    {}", summary.documents);
    println!("  Enriched: {}", summary.enriched);
    println!("  Failed:   {}", summary.failed);
    println!(
        "  Cache:    {} hits / {} misses",
        summary.cache_hits, summary.cache_misses
    );
    println!("  Output:   {}", output.display());
    println!("  Time:     {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_enrich(config: EnrichConfig, file: &Path, cancel: &CancelSignal) -> Result<()> {
    let text = read_document(file)?;
    let enricher = Enricher::new(config)?;
    let record = enricher.enrich(file, &text, cancel).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn cmd_integrate(
    config: EnrichConfig,
    metadata: &str,
    context: &str,
    group: SourceGroup,
    cancel: &CancelSignal,
) -> Result<()> {
    let metadata = Metadata::from_value(json_arg("metadata", metadata)?)?;
    let context = Context::from_value(json_arg("context", context)?)?;

    let aggregator = Aggregator::new(Arc::new(config))?;
    let result = aggregator
        .integrate_group(group, &metadata, &context, cancel)
        .await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Parse a JSON argument given inline or as a file path.
fn json_arg(name: &str, raw: &str) -> Result<serde_json::Value> {
    let path = Path::new(raw);
    let text = if path.is_file() {
        std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read --{name} file {}", path.display()))?
    } else {
        raw.to_string()
    };
    serde_json::from_str(&text).wrap_err_with(|| format!("--{name} is not valid JSON"))
}

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

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Per-document progress bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }
}

impl ProcessProgress for CliProgress {
    fn start(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn document_done(&self, path: &Path, ok: bool) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if ok {
            self.bar.set_message(name);
        } else {
            self.bar.set_message(format!("{name} (skipped)"));
        }
        self.bar.inc(1);
    }

    fn finish(&self, _summary: &ProcessSummary) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_process_command() {
        let cli = Cli::try_parse_from([
            "docenrich",
            "-vv",
            "--timeout",
            "30",
            "process",
            "--input-dir",
            "docs",
            "--output",
            "out.jsonl",
            "--format",
            "jsonl",
        ])
        .expect("valid args");

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.timeout, Some(30));
        match cli.command {
            Command::Process {
                input_dir,
                output,
                format,
            } => {
                assert_eq!(input_dir, PathBuf::from("docs"));
                assert_eq!(output, PathBuf::from("out.jsonl"));
                assert_eq!(format, OutputFormat::Jsonl);
            }
            _ => panic!("expected process"),
        }
    }

    #[test]
    fn integrate_defaults_to_external_group() {
        let cli = Cli::try_parse_from([
            "docenrich",
            "integrate",
            "--metadata",
            r#"{"keywords":["rust"]}"#,
            "--context",
            r#"{"named_entities":[]}"#,
        ])
        .expect("valid args");
        match cli.command {
            Command::Integrate { group, .. } => assert_eq!(group, SourceGroup::External),
            _ => panic!("expected integrate"),
        }
    }

    #[test]
    fn rejects_unknown_format_and_group() {
        let bad_format = Cli::try_parse_from([
            "docenrich", "process", "--input-dir", "d", "--output", "o", "--format", "yaml",
        ]);
        assert!(bad_format.is_err());

        let internal = Cli::try_parse_from([
            "docenrich", "integrate", "--metadata", "{}", "--context", "{}", "--group", "internal",
        ])
        .expect("valid args");
        assert!(matches!(
            internal.command,
            Command::Integrate { group: SourceGroup::Internal, .. }
        ));
    }

    #[test]
    fn json_arg_accepts_inline_json() {
        let value = json_arg("metadata", r#"{"keywords":["rust"]}"#).expect("json");
        assert_eq!(value["keywords"][0], "rust");
        assert!(json_arg("metadata", "{not json").is_err());
    }
}
