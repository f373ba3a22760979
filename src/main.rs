use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use dualstream::core::config::FusionConfig;
use dualstream::core::geometry;
use dualstream::export::ExportFormat;
use dualstream::pipeline::{discover_pairs, load_page, run_batch, run_page, PagePair, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "dualstream")]
#[command(version, about = "Fuse a layout OCR export with a token OCR export by centroid inclusion", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct FusionArgs {
    /// TOML file with fusion settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tolerance buffer as a fraction of the median token height
    #[arg(long)]
    tolerance: Option<f64>,

    /// Rescue tolerance as a multiple of the buffer
    #[arg(long)]
    rescue: Option<f64>,

    /// Line band height for reading order (default: median token height)
    #[arg(long)]
    band_height: Option<f64>,

    /// Output format(s) to generate
    #[arg(short, long, value_enum, value_delimiter = ',', default_values_t = vec![Format::Json])]
    format: Vec<Format>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fuse one page
    Fuse {
        /// Layout (skeleton) export: Textract or native regions
        #[arg(long)]
        layout: PathBuf,

        /// Token (muscle) export: Vision or native tokens
        #[arg(long)]
        tokens: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "fused_output")]
        output: PathBuf,

        #[command(flatten)]
        fusion: FusionArgs,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Fuse every page pair found in a directory
    Batch {
        /// Directory holding `<page>_aws.json`/`<page>_google.json` or
        /// `<page>.layout.json`/`<page>.tokens.json` pairs
        input: PathBuf,

        /// Output directory for all results
        #[arg(short, long, default_value = "batch_output")]
        output: PathBuf,

        #[command(flatten)]
        fusion: FusionArgs,
    },

    /// Show what the two exports contain
    Info {
        #[arg(long)]
        layout: PathBuf,

        #[arg(long)]
        tokens: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Format {
    Json,
    Text,
    Markdown,
    Html,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => ExportFormat::Json,
            Format::Text => ExportFormat::Text,
            Format::Markdown => ExportFormat::Markdown,
            Format::Html => ExportFormat::Html,
        }
    }
}

impl FusionArgs {
    /// File settings first, flags on top.
    fn pipeline_config(&self, output: PathBuf) -> Result<PipelineConfig> {
        let mut fusion = match &self.config {
            Some(path) => FusionConfig::from_toml_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => FusionConfig::default(),
        };
        if let Some(value) = self.tolerance {
            fusion = fusion.with_tolerance_fraction(value);
        }
        if let Some(value) = self.rescue {
            fusion = fusion.with_rescue_multiplier(value);
        }
        if self.band_height.is_some() {
            fusion = fusion.with_band_height(self.band_height);
        }
        fusion.validate()?;

        let formats = self.format.iter().map(|f| ExportFormat::from(*f)).collect();
        Ok(PipelineConfig::new(fusion, output, formats))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fuse {
            layout,
            tokens,
            output,
            fusion,
            quiet,
        } => fuse_single(layout, tokens, output, &fusion, quiet),
        Commands::Batch {
            input,
            output,
            fusion,
        } => fuse_batch(&input, output, &fusion),
        Commands::Info { layout, tokens } => show_info(layout, tokens),
    }
}

fn require_file(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("Input file does not exist: {}", path.display());
    }
    if !path.is_file() {
        anyhow::bail!("Input is not a file: {}", path.display());
    }
    Ok(())
}

fn fuse_single(
    layout: PathBuf,
    tokens: PathBuf,
    output: PathBuf,
    fusion: &FusionArgs,
    quiet: bool,
) -> Result<()> {
    require_file(&layout)?;
    require_file(&tokens)?;

    let config = fusion.pipeline_config(output)?;
    let pair = PagePair::from_paths(layout, tokens);

    if !quiet {
        println!("[*] Layout: {}", pair.layout.display());
        println!("[*] Tokens: {}", pair.tokens.display());
        println!("[*] Output: {}", config.output.display());
        println!(
            "[*] Tolerance: {} x median height, rescue x{}",
            config.fusion.tolerance_fraction, config.fusion.rescue_multiplier
        );
    }

    let summary = run_page(&pair, &config)
        .with_context(|| format!("Failed to process page: {}", pair.name))?;

    if !quiet {
        println!(
            "[+] {} region(s), {} token(s): {} assigned, {} unmatched, {} notice(s)",
            summary.regions, summary.tokens, summary.assigned, summary.unmatched, summary.notices
        );
        println!("\n[✓] Done! Results saved to: {}", config.output.display());
    }

    Ok(())
}

fn fuse_batch(input: &Path, output: PathBuf, fusion: &FusionArgs) -> Result<()> {
    if !input.is_dir() {
        anyhow::bail!("Input is not a directory: {}", input.display());
    }

    let config = fusion.pipeline_config(output)?;
    let pairs = discover_pairs(input)?;
    if pairs.is_empty() {
        anyhow::bail!("No page pairs found in {}", input.display());
    }

    println!("[*] Batch processing {} page(s)", pairs.len());
    println!("[*] Base output: {}\n", config.output.display());

    let mut success = 0;
    let mut failed = 0;
    for (name, result) in run_batch(&pairs, &config) {
        match result {
            Ok(summary) => {
                println!(
                    "  [✓] {name}: {} assigned, {} unmatched",
                    summary.assigned, summary.unmatched
                );
                success += 1;
            }
            Err(e) => {
                eprintln!("  [✗] {name}: {e:#}");
                failed += 1;
            }
        }
    }

    println!("\n[*] Summary: {} succeeded, {} failed", success, failed);

    if failed > 0 {
        anyhow::bail!("{} page(s) failed to process", failed);
    }

    Ok(())
}

fn show_info(layout: PathBuf, tokens: PathBuf) -> Result<()> {
    require_file(&layout)?;
    require_file(&tokens)?;

    let pair = PagePair::from_paths(layout, tokens);
    let inputs = load_page(&pair)?;

    let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
    for region in &inputs.regions {
        *kinds.entry(region.kind.label()).or_default() += 1;
    }
    let malformed_regions = inputs
        .regions
        .iter()
        .filter(|r| geometry::validate_region_polygon(&r.polygon).is_err())
        .count();
    let malformed_tokens = inputs
        .tokens
        .iter()
        .filter(|t| geometry::validate_token_polygon(&t.polygon).is_err())
        .count();

    println!("Page Information");
    println!("================");
    println!("Page: {}", pair.name);
    println!("Regions: {}", inputs.regions.len());
    for (kind, count) in &kinds {
        println!("  {kind}: {count}");
    }
    println!("Malformed regions: {}", malformed_regions);
    println!("Tokens: {}", inputs.tokens.len());
    println!("Malformed tokens: {}", malformed_tokens);

    Ok(())
}
