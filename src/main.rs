use anyhow::{Context, Result};
use clap::Parser;
use splomgraph::{runtime, OutputFormat};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "splomgraph")]
#[command(about = "Render layered plots and scatter-plot matrices from tabular data", long_about = None)]
struct Args {
    /// Plot program (e.g., 'splom(sepal_length, sepal_width) | color(species)')
    dsl: String,

    /// Input data (.csv or .json). Reads CSV from stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file. Writes to stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file with render options
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Log pipeline stages to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "splomgraph=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut options = runtime::load_options(args.config.as_deref())?;
    if let Some(format) = args.format {
        options.format = format;
    }
    if let Some(width) = args.width {
        options.width = width;
    }
    if let Some(height) = args.height {
        options.height = height;
    }

    let data = runtime::load_dataset(args.input.as_deref())?;
    tracing::info!(rows = data.nrows(), columns = data.headers().len(), "loaded dataset");

    let bytes = runtime::render_program(&args.dsl, data, &options)?;

    match &args.output {
        Some(path) => {
            fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(&bytes)
                .context("Failed to write image to stdout")?;
            handle.flush().context("Failed to flush stdout")?;
        }
    }

    Ok(())
}
