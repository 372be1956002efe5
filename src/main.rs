//! `gfshard`: split a chunk into Reed-Solomon shares and rebuild it.
//!
//! # Usage
//!
//! ```text
//! gfshard split chunk.bin out/ --data 40 --failures 10   # share_###.bin + manifest.json
//! gfshard recombine out/ restored.bin                    # missing shares zero-filled
//! gfshard recombine out/ restored.bin --erasures         # missing shares as erasures
//! gfshard params --data 40 --failures 10 --field gf65536
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gfshard_core::{decode_chunk, encode_chunk, FieldKind, ShardMetadata, ShardParams, Sharder};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const MANIFEST_FILE: &str = "manifest.json";
const MANIFEST_VERSION: u8 = 1;

#[derive(Parser)]
#[command(
    name = "gfshard",
    version,
    about = "Reed-Solomon sharding for encrypted chunks"
)]
struct Cli {
    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a file into k + 2m shares.
    Split {
        input: PathBuf,
        out_dir: PathBuf,

        /// Number of data shares (k).
        #[arg(short = 'k', long)]
        data: usize,

        /// Number of shares that may be lost or corrupted (m).
        #[arg(short = 'm', long)]
        failures: usize,

        /// Galois field: gf256 or gf65536.
        #[arg(short, long, default_value = "gf256")]
        field: FieldKind,
    },

    /// Rebuild a file from a share directory.
    Recombine {
        in_dir: PathBuf,
        output: PathBuf,

        /// Treat missing share files as erasures (tolerates up to 2m of
        /// them) instead of zero-filled placeholders.
        #[arg(short, long)]
        erasures: bool,
    },

    /// Print the block geometry for a configuration as JSON.
    Params {
        #[arg(short = 'k', long)]
        data: usize,

        #[arg(short = 'm', long)]
        failures: usize,

        #[arg(short, long, default_value = "gf256")]
        field: FieldKind,
    },
}

/// Written next to the shares; everything `recombine` needs.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct Manifest {
    version: u8,
    #[serde(flatten)]
    meta: ShardMetadata,
    file_name: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(&cli.log_level);

    match cli.command {
        Commands::Split {
            input,
            out_dir,
            data,
            failures,
            field,
        } => split_cmd(&input, &out_dir, field, data, failures),
        Commands::Recombine {
            in_dir,
            output,
            erasures,
        } => recombine_cmd(&in_dir, &output, erasures),
        Commands::Params {
            data,
            failures,
            field,
        } => params_cmd(field, data, failures),
    }
}

fn setup_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn share_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("share_{index:03}.bin"))
}

fn split_cmd(input: &Path, out_dir: &Path, field: FieldKind, k: usize, m: usize) -> Result<()> {
    let data = fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;

    let start = Instant::now();
    let chunk = encode_chunk(&data, field, k, m).context("failed to split input")?;
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        bytes = data.len(),
        shares = chunk.shares.len(),
        "erasure encoding finished"
    );

    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    for (i, share) in chunk.shares.iter().enumerate() {
        let path = share_path(out_dir, i);
        fs::write(&path, share).with_context(|| format!("failed to write {}", path.display()))?;
    }

    let manifest = Manifest {
        version: MANIFEST_VERSION,
        meta: chunk.meta,
        file_name: input
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("input.bin")
            .to_string(),
    };
    let json = serde_json::to_vec_pretty(&manifest).context("failed to serialize manifest")?;
    let path = out_dir.join(MANIFEST_FILE);
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;

    println!("Split {} → {}", input.display(), out_dir.display());
    Ok(())
}

fn read_manifest(dir: &Path) -> Result<Manifest> {
    let path = dir.join(MANIFEST_FILE);
    let bytes = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let manifest: Manifest = serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    if manifest.version != MANIFEST_VERSION {
        bail!("unsupported manifest version {}", manifest.version);
    }
    Ok(manifest)
}

fn read_shares(dir: &Path, total: usize) -> Result<Vec<Option<Vec<u8>>>> {
    (0..total)
        .map(|i| {
            let path = share_path(dir, i);
            if !path.exists() {
                warn!(share = i, "share file missing");
                return Ok(None);
            }
            fs::read(&path)
                .map(Some)
                .with_context(|| format!("failed to read {}", path.display()))
        })
        .collect()
}

fn recombine_cmd(in_dir: &Path, output: &Path, erasures: bool) -> Result<()> {
    let manifest = read_manifest(in_dir)?;
    let meta = &manifest.meta;
    let shares = read_shares(in_dir, meta.total_shares())?;

    let start = Instant::now();
    let decoded = if erasures && meta.original_len > 0 {
        let sharder = Sharder::new(meta.params()?)?;
        let slots: Vec<Option<&[u8]>> = shares.iter().map(Option::as_deref).collect();
        sharder.recombine_with_erasures(&slots, meta.original_len)
    } else {
        decode_chunk(meta, shares)
    };
    let data =
        decoded.with_context(|| format!("failed to recombine shares in {}", in_dir.display()))?;
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        bytes = data.len(),
        erasures,
        "erasure decoding finished"
    );

    fs::write(output, &data).with_context(|| format!("failed to write {}", output.display()))?;
    println!("Recombined {} → {}", manifest.file_name, output.display());
    Ok(())
}

fn params_cmd(field: FieldKind, k: usize, m: usize) -> Result<()> {
    let params = ShardParams::new(field, k, m)?;
    println!("{}", serde_json::to_string_pretty(&params)?);
    Ok(())
}
