//! charex - one-shot character card extraction
//!
//! Reads a locator file (a SakuraFM URL or a JanitorAI transcript), runs the
//! matching normalizer and writes the card under `<output>/<source>/`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use charex_common::config::TomlConfig;
use charex_ex::{CardPersister, NormalizerRegistry};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for charex
#[derive(Parser, Debug)]
#[command(name = "charex")]
#[command(about = "Extract a character card from a supported source")]
#[command(version)]
struct Args {
    /// Source type (sakura or janitor)
    #[arg(short = 't', long = "type")]
    source_type: String,

    /// File holding the URL or transcript JSON
    #[arg(short, long)]
    input: PathBuf,

    /// Output root directory (falls back to DATA_DIR, then the config file)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load_or_default();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("charex_ex={}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let registry = NormalizerRegistry::standard(Duration::from_secs(config.fetch.timeout_secs))
        .context("Failed to initialize source normalizers")?;
    let normalizer = registry.by_short_name(&args.source_type).ok_or_else(|| {
        anyhow!(
            "Unknown source type '{}' (expected one of: {})",
            args.source_type,
            registry.short_names().join(", ")
        )
    })?;

    let input = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("Failed to read input file {}", args.input.display()))?;

    info!(source = normalizer.label(), input = %args.input.display(), "Extracting character");
    let extraction = normalizer
        .extract(&input)
        .await
        .context("Extraction failed")?;
    info!(name = %extraction.card.data.name, "Extracted character");

    let output = config.resolve_data_dir(args.output.as_deref());
    let persister = CardPersister::new(output);
    let written = persister
        .persist(
            &extraction.card,
            &extraction.raw,
            extraction.avatar.as_deref(),
            normalizer.label(),
        )
        .await
        .context("Failed to save card")?;

    info!(
        json = %written.json_path.display(),
        image = ?written.image_path,
        "Card saved"
    );
    Ok(())
}
