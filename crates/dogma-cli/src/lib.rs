use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use dogma_config::{Config, LoadOptions, LogSettings};
use dogma_contract::{Contract, Extractor, Field, Schema, TypeDefinition};
use dogma_http::Descriptor;
use dogma_markdown::{build_section_tree, scan_blocks_from_reader};
use tracing_subscriber::EnvFilter;

/// Entry point for CLI execution. Returns the desired exit code.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();

    let mut options = LoadOptions::default();
    if let Some(path) = &cli.config {
        options = options.with_override_path(path);
    }
    let config = Config::load(options)?;
    init_logging(&config.log, cli.verbose);
    tracing::debug!(layers = config.sources.layers.len(), "configuration loaded");

    match cli.command {
        Command::Tree(args) => handle_tree(args),
        Command::Extract(args) => handle_extract(&config, args),
        Command::Registry(args) => handle_registry(&config, args),
    }
}

// RUST_LOG wins over --verbose, which wins over `[log] filter`.
fn init_logging(settings: &LogSettings, verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = match verbose {
            0 => settings.filter.as_str(),
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
    });

    // Fails only when a global subscriber is already installed; keep that one.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

fn handle_tree(args: TreeArgs) -> Result<i32> {
    let scanned = if is_stdin(&args.input) {
        scan_blocks_from_reader(&mut BufReader::new(io::stdin().lock()))
    } else {
        let file = File::open(&args.input)
            .with_context(|| format!("failed to open {}", args.input.display()))?;
        scan_blocks_from_reader(&mut BufReader::new(file))
    };
    let blocks = scanned.with_context(|| format!("failed to read {}", label(&args.input)))?;
    let root = build_section_tree(blocks);

    let mut rendered = String::new();
    for (level, section) in root.iter().skip(1) {
        rendered.push_str(&"  ".repeat(level - 1));
        rendered.push_str(&"#".repeat(section.depth()));
        rendered.push(' ');
        rendered.push_str(section.title());
        rendered.push('\n');
    }

    emit(&rendered)?;
    Ok(0)
}

fn handle_extract(config: &Config, args: ExtractArgs) -> Result<i32> {
    let contract = extract(config, &args.input)?;
    report_diagnostics(&args.input, &contract);

    match args.format.unwrap_or(ExtractFormatValue::Plain) {
        ExtractFormatValue::Plain => emit(&render_plain(&contract))?,
        ExtractFormatValue::Json => println!("{}", serde_json::to_string_pretty(&contract)?),
    }
    Ok(0)
}

fn handle_registry(config: &Config, args: RegistryArgs) -> Result<i32> {
    let contract = extract(config, &args.input)?;
    report_diagnostics(&args.input, &contract);

    let descriptors: Vec<Descriptor> = contract.endpoints.iter().map(Descriptor::from).collect();
    println!("{}", serde_json::to_string_pretty(&descriptors)?);
    Ok(0)
}

fn extract(config: &Config, input: &Path) -> Result<Contract> {
    let source = read_source(input)?;
    Extractor::from_config(config)
        .parse_document(&source)
        .map_err(|err| anyhow!("{}: {err}", label(input)))
}

fn read_source(input: &Path) -> Result<String> {
    if is_stdin(input) {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("failed to read stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))
}

fn report_diagnostics(input: &Path, contract: &Contract) {
    for diagnostic in &contract.diagnostics {
        eprintln!(
            "warning: {}:{}: {}",
            label(input),
            diagnostic.line,
            diagnostic.message
        );
    }
}

fn render_plain(contract: &Contract) -> String {
    let mut out = String::new();

    out.push_str("endpoints:\n");
    if contract.endpoints.is_empty() {
        out.push_str("  (none)\n");
    }
    for endpoint in &contract.endpoints {
        out.push_str(&format!("  {} {}\n", endpoint.verb, endpoint.path()));
        for (kind, schema) in [
            ("params", &endpoint.url_params),
            ("body", &endpoint.body),
            ("result", &endpoint.result),
        ] {
            if let Some(summary) = schema_summary(schema) {
                out.push_str(&format!("    {kind}: {summary}\n"));
            }
        }
    }

    out.push_str("types:\n");
    if contract.types.is_empty() {
        out.push_str("  (none)\n");
    }
    for schema in contract.types.values() {
        let summary = match &schema.definition {
            TypeDefinition::Fields { fields } => fields_summary(fields),
            TypeDefinition::Raw { language, .. } => raw_summary(language.as_deref()),
        };
        out.push_str(&format!("  {}: {summary}\n", schema.name));
    }

    out
}

fn schema_summary(schema: &Schema) -> Option<String> {
    match schema {
        Schema::Empty => None,
        Schema::Fields { fields } => Some(fields_summary(fields)),
        Schema::Raw { language, .. } => Some(raw_summary(language.as_deref())),
    }
}

fn fields_summary(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|field| {
            let marker = if field.required { "" } else { "?" };
            format!("{}{marker}: {}", field.name, field.ty)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn raw_summary(language: Option<&str>) -> String {
    match language {
        Some(language) => format!("<{language} block>"),
        None => "<text>".to_owned(),
    }
}

fn is_stdin(input: &Path) -> bool {
    input.as_os_str() == "-"
}

fn label(input: &Path) -> String {
    if is_stdin(input) {
        "<stdin>".to_owned()
    } else {
        input.display().to_string()
    }
}

fn emit(content: &str) -> Result<()> {
    print!("{}", content);
    if !content.ends_with('\n') {
        println!();
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Extract API contracts from Markdown documents",
    propagate_version = true
)]
struct Cli {
    /// Config file layered over any discovered `.dogma.toml`
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the section tree of a document
    Tree(TreeArgs),
    /// Extract endpoints and types
    Extract(ExtractArgs),
    /// Print `{name, method}` descriptors for a handler registry
    Registry(RegistryArgs),
}

#[derive(Args)]
struct TreeArgs {
    /// Markdown file, or `-` for stdin
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

#[derive(Args)]
struct ExtractArgs {
    /// Markdown file, or `-` for stdin
    #[arg(value_name = "FILE")]
    input: PathBuf,
    /// Output format (plain or json)
    #[arg(long, value_enum)]
    format: Option<ExtractFormatValue>,
}

#[derive(Args)]
struct RegistryArgs {
    /// Markdown file, or `-` for stdin
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExtractFormatValue {
    Plain,
    Json,
}
