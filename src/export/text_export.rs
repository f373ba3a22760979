use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::model::{FusedPage, FusedRegion, RegionContent};
use crate::export::{content_text, page_path, ExportFormat, Exporter};

#[derive(Debug, Clone)]
pub struct TextExporter {
    out_dir: PathBuf,
}

impl TextExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    fn format_region(region: &FusedRegion) -> String {
        match &region.content {
            RegionContent::Text { text } => text.clone(),
            RegionContent::GridEntry { row, column, text } => {
                format!("[CELL {row},{column}] {text}")
            }
            RegionContent::Labels { .. } => {
                format!("[DIAGRAM] {}", content_text(&region.content))
            }
        }
    }

    pub fn render(page: &FusedPage) -> String {
        let mut out = String::new();
        for region in page.regions.iter().filter(|r| !r.content.is_empty()) {
            out.push_str(&Self::format_region(region));
            out.push_str("\n\n");
        }

        if !page.unmatched_tokens.is_empty() {
            out.push_str("=== Unmatched tokens ===\n");
            for token in &page.unmatched_tokens {
                out.push_str(&format!("{} {} ({})\n", token.id, token.text, token.reason.code()));
            }
        }
        out
    }
}

impl Exporter for TextExporter {
    fn export(&self, page: &FusedPage) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        let path = page_path(&self.out_dir, &page.page, ExportFormat::Text);
        fs::write(&path, Self::render(page))
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
