use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::model::FusedPage;
use crate::export::{page_path, ExportFormat, Exporter};

#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for JsonExporter {
    fn export(&self, page: &FusedPage) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        let path = page_path(&self.out_dir, &page.page, ExportFormat::Json);
        let data = serde_json::to_string_pretty(page)?;
        fs::write(&path, data).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
