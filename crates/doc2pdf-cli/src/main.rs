#[cfg(feature = "server")]
mod server;
mod store;

use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use doc2pdf::config::{ConvertOptions, DelegateOptions};
use doc2pdf::record::RecordStore;
use doc2pdf::{ConversionRequest, convert};
use rayon::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use store::SqliteRecordStore;

#[derive(Parser)]
#[command(
    name = "doc2pdf",
    version,
    about = "Convert DOCX, PPTX, XLSX, CSV, TXT and Markdown files to PDF"
)]
struct Cli {
    /// Directory receiving the produced PDFs
    #[arg(long, global = true, env = "DOC2PDF_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// SQLite database holding the conversion log
    #[arg(long, global = true, env = "DOC2PDF_DATABASE", default_value = "conversions.db")]
    database: PathBuf,

    /// External engine used for DOCX and PPTX
    #[arg(long, global = true, env = "DOC2PDF_SOFFICE", default_value = "soffice")]
    soffice: PathBuf,

    /// Kill the external engine after this many seconds (0 disables the limit)
    #[arg(long, global = true, env = "DOC2PDF_TIMEOUT_SECS", default_value_t = 120)]
    timeout_secs: u64,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert one or more files
    Convert {
        /// Input files (.docx, .pptx, .xlsx, .csv, .txt, .md)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Name to convert the input under (single input only)
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the conversion log
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the upload server
    #[cfg(feature = "server")]
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(short, long, default_value_t = 8080)]
        port: u16,

        /// Directory uploads are stored in
        #[arg(long, env = "DOC2PDF_UPLOAD_DIR", default_value = "uploads")]
        upload_dir: PathBuf,

        /// Largest accepted upload, in megabytes
        #[arg(long, env = "DOC2PDF_MAX_UPLOAD_MB", default_value_t = 64)]
        max_upload_mb: u64,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let options = ConvertOptions {
        delegate: DelegateOptions {
            program: cli.soffice.clone(),
            timeout: (cli.timeout_secs > 0).then(|| Duration::from_secs(cli.timeout_secs)),
        },
        ..ConvertOptions::with_output_dir(&cli.output_dir)
    };

    match cli.command {
        Command::Convert { inputs, name } => {
            ensure_dir(&cli.output_dir)?;
            let store = open_store(&cli.database)?;
            run_convert(&inputs, name, &options, &store)
        }
        Command::List { json } => {
            let store = open_store(&cli.database)?;
            run_list(&store, json)
        }
        #[cfg(feature = "server")]
        Command::Serve {
            host,
            port,
            upload_dir,
            max_upload_mb,
        } => {
            ensure_dir(&cli.output_dir)?;
            ensure_dir(&upload_dir)?;
            let store = open_store(&cli.database)?;
            server::start_server(
                &host,
                port,
                server::ServerState {
                    options,
                    upload_dir,
                    store: Box::new(store),
                    max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
                },
            )
        }
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating directory {dir:?}"))
}

fn open_store(path: &Path) -> Result<SqliteRecordStore> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_dir(parent)?;
    }
    SqliteRecordStore::open(path).with_context(|| format!("opening database {path:?}"))
}

fn run_convert(
    inputs: &[PathBuf],
    name: Option<String>,
    options: &ConvertOptions,
    store: &dyn RecordStore,
) -> Result<()> {
    let requests: Vec<ConversionRequest> = match name {
        Some(name) if inputs.len() == 1 => vec![ConversionRequest::new(&inputs[0], name)],
        Some(_) => anyhow::bail!("--name can only be used with a single input"),
        None => inputs.iter().map(ConversionRequest::from_path).collect(),
    };

    let results: Vec<_> = requests
        .par_iter()
        .map(|request| (request, convert(request, options)))
        .collect();

    let mut failed = 0;
    let mut unrecorded = 0;
    for (request, result) in results {
        match result {
            Ok(conversion) => {
                println!(
                    "Converted: {:?} -> {:?}",
                    request.input_path, conversion.output_path
                );
                if let Err(e) = store.insert(&conversion.record()) {
                    error!(file_name = %conversion.file_name, error = %e, "recording failed");
                    eprintln!("Not recorded: {:?}: {e}", conversion.file_name);
                    unrecorded += 1;
                }
            }
            Err(e) => {
                error!(input = %request.input_path.display(), kind = ?e.kind(), "{e}");
                eprintln!("Failed: {:?}: {e}", request.input_path);
                failed += 1;
            }
        }
    }

    let total = requests.len();
    info!(total, failed, unrecorded, "batch finished");
    match (failed, unrecorded) {
        (0, 0) => Ok(()),
        (failed, 0) => anyhow::bail!("{failed} of {total} conversions failed"),
        (0, unrecorded) => {
            anyhow::bail!("{unrecorded} of {total} conversions could not be recorded")
        }
        (failed, unrecorded) => anyhow::bail!(
            "{failed} of {total} conversions failed and {unrecorded} could not be recorded"
        ),
    }
}

fn run_list(store: &dyn RecordStore, json: bool) -> Result<()> {
    let records = store.list().context("reading conversion log")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    for record in &records {
        println!(
            "{}\t{}\t{}",
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            record.file_type,
            record.file_name
        );
    }
    Ok(())
}
