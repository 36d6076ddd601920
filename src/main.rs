use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use spectral_ingest::config::IngestConfig;
use spectral_ingest::{
    classify_traced, content_hash, export, load_file, ExportContext, HeaderMap,
    NormalizedSpectrum,
};

/// Ingest spectral files (CSV, JCAMP-DX) and re-export them.
#[derive(Parser, Debug)]
#[command(name = "spectral-ingest")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    config: IngestConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a file and print technique, hash, metadata and parse trace as JSON.
    Inspect { file: PathBuf },
    /// Print the content hash used for deduplication.
    Hash { file: PathBuf },
    /// Parse a file and re-encode it.
    Export {
        file: PathBuf,
        /// csv, json or jcamp
        #[arg(short, long)]
        format: String,
        /// Output path; defaults to stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Sample the spectrum belongs to, recorded in JSON exports.
        #[arg(long)]
        sample_id: Option<i64>,
    },
    /// Classify from header records and a filename, without any data.
    Classify {
        #[arg(long, default_value = "")]
        filename: String,
        /// Header record as LABEL=VALUE; repeatable.
        #[arg(long = "header", value_name = "LABEL=VALUE")]
        headers: Vec<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect { file } => {
            let spectrum = ingest(&cli.config, &file)?;
            let summary = json!({
                "technique": spectrum.technique(),
                "content_hash": spectrum.content_hash(),
                "data_points": spectrum.len(),
                "x_range": spectrum.x_range(),
                "metadata": spectrum.metadata(),
                "trace": spectrum.trace(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Hash { file } => {
            check_upload(&cli.config, &file)?;
            let bytes =
                std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            println!("{}", content_hash(&bytes));
        }
        Command::Export {
            file,
            format,
            out,
            sample_id,
        } => {
            let spectrum = ingest(&cli.config, &file)?;
            let mut context = ExportContext::new(file_name(&file));
            context.sample_id = sample_id;
            let payload = export(&spectrum, &format, &context)?;
            log::info!(
                "Exported {} points as {} ({})",
                spectrum.len(),
                payload.filename,
                payload.content_type
            );
            match out {
                Some(path) => std::fs::write(&path, &payload.body)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => print!("{}", payload.body),
            }
        }
        Command::Classify { filename, headers } => {
            let mut header = HeaderMap::new();
            for record in &headers {
                let Some((label, value)) = record.split_once('=') else {
                    bail!("header record '{record}' is not LABEL=VALUE");
                };
                header.insert(label, value);
            }
            let (technique, stage) = classify_traced(&header, &filename);
            match stage {
                Some(stage) => log::info!("Classified by {stage}"),
                None => log::info!("No classification evidence"),
            }
            println!("{technique}");
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> &str {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
}

/// Enforce the size and extension policy on a file about to be ingested.
fn check_upload(config: &IngestConfig, path: &Path) -> Result<()> {
    let size = std::fs::metadata(path)
        .with_context(|| format!("reading {}", path.display()))?
        .len();
    config.check(file_name(path), size)?;
    Ok(())
}

fn ingest(config: &IngestConfig, path: &Path) -> Result<NormalizedSpectrum> {
    check_upload(config, path)?;
    match load_file(path) {
        Ok(spectrum) => {
            log::info!(
                "Loaded {}: {} points, technique {}, hash {}",
                path.display(),
                spectrum.len(),
                spectrum.technique(),
                spectrum.content_hash().unwrap_or_default()
            );
            log::debug!("Parse trace: {:?}", spectrum.trace());
            Ok(spectrum)
        }
        Err(e) => {
            log::error!("Failed to load file: {e:#}");
            Err(e)
        }
    }
}
