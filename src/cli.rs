//! CLI commands and argument parsing.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::Table;

use crate::container;

/// Compresses and decompresses sequences of v86 virtual-machine save states.
#[derive(Parser)]
#[command(name = "savestream")]
#[command(version)]
#[command(about = "Deduplicate a sequence of v86 save states into a single savestream container.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Encode one or more save states into a savestream container.
    Encode {
        /// Input save-state files, followed by the output savestream path.
        #[arg(required = true, num_args = 2..)]
        paths: Vec<PathBuf>,
    },

    /// Decode a savestream container back into save-state files.
    Decode {
        /// Input savestream file.
        input: PathBuf,

        /// Directory to write decoded save states into.
        out_dir: PathBuf,

        /// Decode only this frame index, instead of every frame.
        #[arg(long)]
        index: Option<usize>,
    },

    /// Trim a savestream container to a half-open frame range.
    Trim {
        /// Input savestream file.
        input: PathBuf,

        /// Output savestream file.
        output: PathBuf,

        /// First frame index to keep.
        start: usize,

        /// One past the last frame index to keep (defaults to the end).
        end: Option<usize>,
    },

    /// Print frame count and size statistics for a savestream container.
    Info {
        /// Input savestream file.
        input: PathBuf,
    },
}

/// Initializes logging and parses CLI arguments.
pub fn init() -> Cli {
    let subscriber = tracing_subscriber::fmt()
        .with_file(true)
        .with_line_number(true)
        .finish();
    // Only meaningful failure mode is a subscriber already installed, which
    // would mean this ran twice; either way there's nothing useful to do
    // about it here.
    let _ = tracing::subscriber::set_global_default(subscriber);
    Cli::parse()
}

/// Runs a CLI command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Encode { paths } => encode_command(paths),
        Commands::Decode { input, out_dir, index } => decode_command(&input, &out_dir, index),
        Commands::Trim { input, output, start, end } => trim_command(&input, &output, start, end),
        Commands::Info { input } => info_command(&input),
    }
}

fn encode_command(mut paths: Vec<PathBuf>) -> Result<()> {
    let output = paths.pop().expect("clap enforces at least 2 paths");

    let mut states = Vec::with_capacity(paths.len());
    for path in &paths {
        let bytes =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        states.push(bytes);
    }

    let stream = container::encode(&states).with_context(|| "encoding failed")?;
    fs::write(&output, &stream)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "✓ Encoded {} state(s) -> {} ({} bytes)",
        paths.len(),
        output.display(),
        stream.len()
    );
    Ok(())
}

fn decode_command(input: &std::path::Path, out_dir: &std::path::Path, index: Option<usize>) -> Result<()> {
    let stream =
        fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let written = if let Some(index) = index {
        let state = container::decode_one(&stream, index).with_context(|| "decoding failed")?;
        let path = out_dir.join(format!("{index}.bin"));
        fs::write(&path, &state).with_context(|| format!("failed to write {}", path.display()))?;
        1
    } else {
        let decoder = container::decode(&stream).with_context(|| "decoding failed")?;
        let mut count = 0usize;
        for (i, state) in decoder.enumerate() {
            let state = state.with_context(|| format!("decoding frame {i} failed"))?;
            let path = out_dir.join(format!("{i}.bin"));
            fs::write(&path, &state)
                .with_context(|| format!("failed to write {}", path.display()))?;
            count += 1;
        }
        count
    };

    println!("✓ Decoded {written} state(s) -> {}", out_dir.display());
    Ok(())
}

fn trim_command(
    input: &std::path::Path,
    output: &std::path::Path,
    start: usize,
    end: Option<usize>,
) -> Result<()> {
    let stream =
        fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let trimmed = container::trim(&stream, start, end).with_context(|| "trim failed")?;
    fs::write(output, &trimmed)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("✓ Trimmed -> {} ({} bytes)", output.display(), trimmed.len());
    Ok(())
}

fn info_command(input: &std::path::Path) -> Result<()> {
    let stream =
        fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let frame_count = container::length(&stream).with_context(|| "reading container failed")?;
    let total_size = stream.len();
    let avg = if frame_count == 0 {
        "n/a".to_string()
    } else {
        format!("{:.1}", total_size as f64 / frame_count as f64)
    };

    let mut table = Table::new();
    table.set_header(vec!["metric", "value"]);
    table.add_row(vec!["frame count".to_string(), frame_count.to_string()]);
    table.add_row(vec!["total size (bytes)".to_string(), total_size.to_string()]);
    table.add_row(vec!["avg bytes/frame".to_string(), avg]);
    println!("{table}");

    Ok(())
}
