use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use charon::config::{
    DEFAULT_EXPORT_DIR, DEFAULT_GROUP, DEFAULT_IMPORT_DIR, DEFAULT_STORE_PATH,
    DEFAULT_UNIQUE_PROPERTY,
};
use charon::export::run_export;
use charon::import::{run_import, run_update};
use charon::options::{ExportOptions, ImportOptions, UpdateOptions};
use charon::stats::RunSummary;
use charon::store::JsonFileStore;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "charon")]
#[command(about = "Move catalogue entities between CSV/JSON files and the entity store")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Entity store file
    #[arg(long, default_value = DEFAULT_STORE_PATH, global = true)]
    store: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export all entities of one kind to a file
    Export(ExportArgs),
    /// Insert one entity per row of a file
    Import(ImportArgs),
    /// Merge file rows into existing entities matched by a unique property
    Update(UpdateArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Entity class name (e.g. Person or App\Entity\Person)
    #[arg(short, long)]
    class_name: Option<String>,

    /// Encoder, e.g. person:csv, clip:json, json
    #[arg(short = 'x', long)]
    encoder: Option<String>,

    /// Normalization group
    #[arg(short, long, default_value = DEFAULT_GROUP)]
    group: String,

    /// Destination directory
    #[arg(short, long, default_value = DEFAULT_EXPORT_DIR)]
    directory: String,
}

#[derive(Args)]
struct SourceArgs {
    /// Entity class name (inferred from the encoder or file name if omitted)
    #[arg(short, long)]
    class_name: Option<String>,

    /// Encoder (defaults to <table>:<extension>)
    #[arg(short = 'x', long)]
    encoder: Option<String>,

    /// Directory searched recursively for the source file
    #[arg(short, long, default_value = DEFAULT_IMPORT_DIR)]
    directory: String,

    /// Source file name
    #[arg(short, long)]
    file_name: String,
}

#[derive(Args)]
struct ImportArgs {
    #[command(flatten)]
    source: SourceArgs,
}

#[derive(Args)]
struct UpdateArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Unique property used to match rows to stored entities
    #[arg(short, long, default_value = DEFAULT_UNIQUE_PROPERTY)]
    property: String,

    /// Let file values win over stored values
    #[arg(short, long)]
    overwrite: bool,
}

impl From<SourceArgs> for ImportOptions {
    fn from(args: SourceArgs) -> Self {
        ImportOptions {
            class_name: args.class_name,
            encoder: args.encoder,
            directory: Some(args.directory),
            file_name: Some(args.file_name),
        }
    }
}

fn run(cli: Cli) -> Result<RunSummary> {
    let mut store = JsonFileStore::open(&cli.store)
        .with_context(|| format!("Failed to open entity store: {}", cli.store))?;

    match cli.command {
        Commands::Export(args) => {
            let options = ExportOptions {
                class_name: args.class_name,
                encoder: args.encoder,
                group: Some(args.group),
                directory: Some(args.directory),
            };
            run_export(&options, &store)
        }
        Commands::Import(args) => run_import(&ImportOptions::from(args.source), &mut store),
        Commands::Update(args) => {
            let options = UpdateOptions {
                source: args.source.into(),
                property: Some(args.property),
                overwrite: args.overwrite,
            };
            run_update(&options, &mut store)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let start = Instant::now();
    match run(cli) {
        Ok(summary) => {
            println!("{}", summary.message());
            info!(
                operation = %summary.operation,
                rows = summary.rows,
                created = summary.created,
                updated = summary.updated,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Completed successfully"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
