use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::core::config::FusionConfig;
use crate::core::model::{FusedPage, GeometricRegion, LinguisticToken};
use crate::export::{ExportFormat, SerializationRouter};
use crate::fusion::index::RegionIndex;
use crate::fusion::{CentroidFusionEngine, FusionEngine};
use crate::ocr::parse_tokens;
use crate::skeleton::parse_regions;

/// File-name suffixes pairing a layout export with its token export.
const PAIR_SUFFIXES: &[(&str, &str)] = &[
    ("_aws.json", "_google.json"),
    (".layout.json", ".tokens.json"),
];

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub fusion: FusionConfig,
    pub output: PathBuf,
    pub formats: Vec<ExportFormat>,
}

impl PipelineConfig {
    pub fn new(fusion: FusionConfig, output: PathBuf, formats: Vec<ExportFormat>) -> Self {
        Self {
            fusion,
            output,
            formats,
        }
    }
}

/// The two exports describing one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePair {
    pub name: String,
    pub layout: PathBuf,
    pub tokens: PathBuf,
}

impl PagePair {
    /// Names the page after the layout file, minus its pairing suffix.
    pub fn from_paths(layout: PathBuf, tokens: PathBuf) -> Self {
        let file_name = layout
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = PAIR_SUFFIXES
            .iter()
            .find_map(|(suffix, _)| file_name.strip_suffix(suffix))
            .map(str::to_string)
            .or_else(|| layout.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "page".to_string());
        Self {
            name,
            layout,
            tokens,
        }
    }
}

/// Parsed but not yet fused page.
#[derive(Debug, Clone)]
pub struct PageInputs {
    pub name: String,
    pub regions: Vec<GeometricRegion>,
    pub tokens: Vec<LinguisticToken>,
}

/// Counts reported per page by `run_page`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    pub name: String,
    pub regions: usize,
    pub tokens: usize,
    pub assigned: usize,
    pub unmatched: usize,
    pub notices: usize,
}

impl PageSummary {
    fn of(page: &FusedPage, tokens: usize) -> Self {
        Self {
            name: page.page.clone(),
            regions: page.regions.len(),
            tokens,
            assigned: page.regions.iter().map(|r| r.token_ids.len()).sum(),
            unmatched: page.unmatched_tokens.len(),
            notices: page.notices.len(),
        }
    }
}

pub fn load_page(pair: &PagePair) -> Result<PageInputs> {
    let layout_raw = fs::read_to_string(&pair.layout)
        .with_context(|| format!("failed to read layout file {}", pair.layout.display()))?;
    let tokens_raw = fs::read_to_string(&pair.tokens)
        .with_context(|| format!("failed to read token file {}", pair.tokens.display()))?;

    let regions = parse_regions(&layout_raw)
        .with_context(|| format!("failed to parse {}", pair.layout.display()))?;
    let tokens = parse_tokens(&tokens_raw)
        .with_context(|| format!("failed to parse {}", pair.tokens.display()))?;

    Ok(PageInputs {
        name: pair.name.clone(),
        regions,
        tokens,
    })
}

/// Region Index → Fusion Engine → Serialization Router for one page.
pub fn fuse_page(
    name: &str,
    regions: Vec<GeometricRegion>,
    tokens: &[LinguisticToken],
    config: &FusionConfig,
) -> crate::core::error::Result<FusedPage> {
    config.validate()?;
    let index = RegionIndex::build(regions)?;
    let engine = CentroidFusionEngine::new(*config);
    let mapping = engine.fuse(&index, tokens);
    let router = SerializationRouter::new(tokens);
    Ok(router.route(name, config, &index, &mapping))
}

pub fn export_page(page: &FusedPage, output: &Path, formats: &[ExportFormat]) -> Result<()> {
    for format in formats {
        format
            .exporter(output)
            .export(page)
            .with_context(|| format!("failed to export {} as {:?}", page.page, format))?;
    }
    Ok(())
}

pub fn run_page(pair: &PagePair, config: &PipelineConfig) -> Result<PageSummary> {
    let inputs = load_page(pair)?;
    let page = fuse_page(&inputs.name, inputs.regions, &inputs.tokens, &config.fusion)
        .with_context(|| format!("failed to fuse page {}", inputs.name))?;
    export_page(&page, &config.output, &config.formats)?;
    Ok(PageSummary::of(&page, inputs.tokens.len()))
}

/// Finds `<stem>_aws.json` + `<stem>_google.json` and
/// `<stem>.layout.json` + `<stem>.tokens.json` pairs, sorted by page name.
/// When both conventions yield the same page name, the later layout file
/// keeps its full stem (`<stem>_aws`) so the outputs stay apart.
pub fn discover_pairs(dir: &Path) -> Result<Vec<PagePair>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read directory {}", dir.display()))?;

    let mut pairs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        for (layout_suffix, tokens_suffix) in PAIR_SUFFIXES {
            let Some(stem) = file_name.strip_suffix(layout_suffix) else {
                continue;
            };
            let tokens = dir.join(format!("{stem}{tokens_suffix}"));
            if tokens.is_file() {
                pairs.push(PagePair::from_paths(path.clone(), tokens));
            } else {
                warn!(layout = %path.display(), "layout file without a token file, skipped");
            }
        }
    }
    pairs.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.layout.cmp(&b.layout)));

    let mut taken: HashSet<String> = pairs.iter().map(|p| p.name.clone()).collect();
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(pairs.len());
    for mut pair in pairs {
        if !seen.insert(pair.name.clone()) {
            let stem = pair
                .layout
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            if stem.is_empty() || !taken.insert(stem.clone()) {
                warn!(layout = %pair.layout.display(), page = %pair.name, "page name already taken, skipped");
                continue;
            }
            warn!(layout = %pair.layout.display(), page = %pair.name, renamed = %stem, "page name already taken, renamed");
            seen.insert(stem.clone());
            pair.name = stem;
        }
        unique.push(pair);
    }
    unique.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(unique)
}

/// Runs every pair in parallel. Results come back in page-name order.
pub fn run_batch(pairs: &[PagePair], config: &PipelineConfig) -> Vec<(String, Result<PageSummary>)> {
    let mut results: Vec<(String, Result<PageSummary>)> = pairs
        .par_iter()
        .map(|pair| (pair.name.clone(), run_page(pair, config)))
        .collect();
    results.sort_by(|a, b| a.0.cmp(&b.0));

    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    info!(pages = results.len(), failed, "batch finished");
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_output_dir(prefix: &str) -> PathBuf {
        let mut out = std::env::temp_dir();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let pid = std::process::id();
        out.push(format!("{prefix}-{pid}-{now}"));
        out
    }

    const LAYOUT: &str = r#"{"regions": [
        {"id": "p", "type": "paragraph", "bbox": [0, 0, 100, 20]},
        {"id": "f", "type": "diagram", "bbox": [0, 50, 100, 100]}
    ]}"#;

    const TOKENS: &str = r#"{"tokens": [
        {"text": "сәлем", "bbox": [5, 5, 30, 15]},
        {"text": "әлем", "bbox": [35, 5, 60, 15]},
        {"text": "шет", "bbox": [500, 500, 520, 510]}
    ]}"#;

    #[test]
    fn page_name_drops_pair_suffix() {
        let pair = PagePair::from_paths(PathBuf::from("in/scan_07_aws.json"), PathBuf::from("x"));
        assert_eq!(pair.name, "scan_07");
        let pair = PagePair::from_paths(PathBuf::from("in/p2.layout.json"), PathBuf::from("x"));
        assert_eq!(pair.name, "p2");
        let pair = PagePair::from_paths(PathBuf::from("in/other.json"), PathBuf::from("x"));
        assert_eq!(pair.name, "other");
    }

    #[test]
    fn run_page_writes_requested_formats() -> Result<()> {
        let dir = temp_output_dir("dualstream-pipeline");
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("p1.layout.json"), LAYOUT)?;
        fs::write(dir.join("p1.tokens.json"), TOKENS)?;

        let out = dir.join("out");
        let config = PipelineConfig::new(
            FusionConfig::default(),
            out.clone(),
            vec![ExportFormat::Json, ExportFormat::Markdown],
        );
        let pair = PagePair::from_paths(dir.join("p1.layout.json"), dir.join("p1.tokens.json"));
        let summary = run_page(&pair, &config)?;

        assert_eq!(summary.regions, 2);
        assert_eq!(summary.tokens, 3);
        assert_eq!(summary.assigned, 2);
        assert_eq!(summary.unmatched, 1);
        assert!(out.join("p1.json").exists());
        assert!(out.join("p1.md").exists());
        assert!(!out.join("p1.html").exists());

        let _ = fs::remove_dir_all(&dir);
        Ok(())
    }

    #[test]
    fn batch_pairs_files_and_reports_failures() -> Result<()> {
        let dir = temp_output_dir("dualstream-batch");
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("b_aws.json"), LAYOUT)?;
        fs::write(dir.join("b_google.json"), TOKENS)?;
        fs::write(dir.join("a.layout.json"), LAYOUT)?;
        fs::write(dir.join("a.tokens.json"), "{\"broken\": true}")?;
        fs::write(dir.join("lonely_aws.json"), LAYOUT)?;

        let pairs = discover_pairs(&dir)?;
        let names: Vec<&str> = pairs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        let config = PipelineConfig::new(FusionConfig::default(), dir.join("out"), vec![ExportFormat::Json]);
        let results = run_batch(&pairs, &config);
        assert_eq!(results[0].0, "a");
        assert!(results[0].1.is_err());
        assert!(results[1].1.is_ok());

        let _ = fs::remove_dir_all(&dir);
        Ok(())
    }

    #[test]
    fn pairs_sharing_a_page_name_get_distinct_outputs() -> Result<()> {
        let dir = temp_output_dir("dualstream-collision");
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("x.layout.json"), LAYOUT)?;
        fs::write(dir.join("x.tokens.json"), TOKENS)?;
        fs::write(dir.join("x_aws.json"), LAYOUT)?;
        fs::write(dir.join("x_google.json"), r#"{"tokens": []}"#)?;

        let pairs = discover_pairs(&dir)?;
        let names: Vec<&str> = pairs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["x", "x_aws"]);
        assert_eq!(pairs[0].layout, dir.join("x.layout.json"));

        let out = dir.join("out");
        let config = PipelineConfig::new(FusionConfig::default(), out.clone(), vec![ExportFormat::Json]);
        let results = run_batch(&pairs, &config);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        assert_eq!(results[0].1.as_ref().map(|s| s.assigned).ok(), Some(2));
        assert_eq!(results[1].1.as_ref().map(|s| s.assigned).ok(), Some(0));
        assert!(out.join("x.json").exists());
        assert!(out.join("x_aws.json").exists());

        let _ = fs::remove_dir_all(&dir);
        Ok(())
    }
}
