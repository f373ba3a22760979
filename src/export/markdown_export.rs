use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::model::{FusedPage, FusedRegion, RegionContent, RegionId, RegionKind};
use crate::export::{page_path, ExportFormat, Exporter};

#[derive(Debug, Clone)]
pub struct MarkdownExporter {
    out_dir: PathBuf,
}

/// Widest or tallest grid drawn as a Markdown table. Larger index ranges
/// are listed cell by cell instead.
const MAX_GRID_SIDE: u32 = 256;

/// Cells of one table, keyed by (row, column).
#[derive(Debug, Default)]
struct Grid<'a> {
    cells: BTreeMap<(u32, u32), &'a str>,
}

impl<'a> Grid<'a> {
    /// A cell with text is never replaced by an empty one at the same slot.
    fn insert(&mut self, row: u32, column: u32, text: &'a str) {
        let slot = self.cells.entry((row, column)).or_insert(text);
        if slot.is_empty() {
            *slot = text;
        }
    }

    fn to_markdown(&self) -> String {
        let rows = self.cells.keys().map(|(r, _)| r.saturating_add(1)).max().unwrap_or(0);
        let columns = self.cells.keys().map(|(_, c)| c.saturating_add(1)).max().unwrap_or(0);
        if rows == 0 || columns == 0 {
            return String::new();
        }
        if rows > MAX_GRID_SIDE || columns > MAX_GRID_SIDE {
            return self.to_list();
        }

        let mut out = String::new();
        for row in 0..rows {
            let line: Vec<String> = (0..columns)
                .map(|column| escape_cell(self.cells.get(&(row, column)).copied().unwrap_or("")))
                .collect();
            out.push_str(&format!("| {} |\n", line.join(" | ")));
            if row == 0 {
                out.push_str(&format!("|{}\n", " --- |".repeat(columns as usize)));
            }
        }
        out
    }

    fn to_list(&self) -> String {
        self.cells
            .iter()
            .map(|((row, column), text)| format!("- ({row}, {column}) {}\n", escape_cell(text)))
            .collect()
    }
}

/// Which grid a cell belongs to: its parent table, or else the run of
/// parentless cells it sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum GridKey<'a> {
    Table(&'a RegionId),
    Loose(usize),
}

fn grid_keys(page: &FusedPage) -> Vec<Option<GridKey<'_>>> {
    let mut runs = 0usize;
    let mut in_run = false;
    page.regions
        .iter()
        .map(|region| match (&region.content, &region.parent) {
            (RegionContent::GridEntry { .. }, Some(parent)) => Some(GridKey::Table(parent)),
            (RegionContent::GridEntry { .. }, None) => {
                if !in_run {
                    runs += 1;
                    in_run = true;
                }
                Some(GridKey::Loose(runs))
            }
            _ => {
                in_run = false;
                None
            }
        })
        .collect()
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

impl MarkdownExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    fn format_region(region: &FusedRegion) -> String {
        match (&region.kind, &region.content) {
            (RegionKind::Caption, RegionContent::Text { text }) => format!("*{text}*"),
            (_, RegionContent::Text { text }) => text.clone(),
            (_, RegionContent::Labels { labels }) => {
                let mut out = format!("**Diagram {}:**\n\n", region.id);
                for label in labels {
                    out.push_str(&format!("- {label}\n"));
                }
                out
            }
            (_, RegionContent::GridEntry { .. }) => String::new(),
        }
    }

    /// Table cells sharing a parent are reassembled into one grid, placed
    /// where the first of them appears. Cells without a parent are grouped
    /// into one grid per unbroken run.
    pub fn render(page: &FusedPage) -> String {
        let keys = grid_keys(page);
        let mut grids: BTreeMap<GridKey, Grid> = BTreeMap::new();
        for (region, key) in page.regions.iter().zip(&keys) {
            if let (RegionContent::GridEntry { row, column, text }, Some(key)) = (&region.content, key) {
                grids.entry(*key).or_default().insert(*row, *column, text.as_str());
            }
        }

        let mut out = format!("# {}\n\n", page.page);
        let mut table_no = 0usize;
        for (region, key) in page.regions.iter().zip(&keys) {
            let block = match key {
                Some(key) => match grids.remove(key) {
                    Some(grid) => {
                        table_no += 1;
                        format!("**Table {table_no}:**\n\n{}", grid.to_markdown())
                    }
                    None => String::new(),
                },
                None => Self::format_region(region),
            };
            if !block.trim().is_empty() {
                out.push_str(block.trim_end());
                out.push_str("\n\n");
            }
        }

        if !page.unmatched_tokens.is_empty() {
            out.push_str("## Unmatched tokens\n\n");
            for token in &page.unmatched_tokens {
                out.push_str(&format!("- `{}` {} ({})\n", token.id, token.text, token.reason.code()));
            }
        }
        out
    }
}

impl Exporter for MarkdownExporter {
    fn export(&self, page: &FusedPage) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        let path = page_path(&self.out_dir, &page.page, ExportFormat::Markdown);
        fs::write(&path, Self::render(page))
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
