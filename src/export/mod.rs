pub mod html_debug_export;
pub mod json_export;
pub mod markdown_export;
pub mod router;
pub mod text_export;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::model::{FusedPage, RegionContent};

pub use html_debug_export::HtmlDebugExporter;
pub use json_export::JsonExporter;
pub use markdown_export::MarkdownExporter;
pub use router::{SerializationRouter, Strategy};
pub use text_export::TextExporter;

pub trait Exporter {
    fn export(&self, page: &FusedPage) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Json,
    Text,
    Markdown,
    Html,
}

impl ExportFormat {
    pub fn exporter(self, out_dir: &Path) -> Box<dyn Exporter + Send + Sync> {
        let out_dir = out_dir.to_path_buf();
        match self {
            ExportFormat::Json => Box::new(JsonExporter::new(out_dir)),
            ExportFormat::Text => Box::new(TextExporter::new(out_dir)),
            ExportFormat::Markdown => Box::new(MarkdownExporter::new(out_dir)),
            ExportFormat::Html => Box::new(HtmlDebugExporter::new(out_dir)),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Text => "txt",
            ExportFormat::Markdown => "md",
            ExportFormat::Html => "html",
        }
    }
}

/// `<out_dir>/<page>.<ext>`
pub fn page_path(out_dir: &Path, page: &str, format: ExportFormat) -> PathBuf {
    out_dir.join(format!("{page}.{}", format.extension()))
}

/// Plain rendering of a region's content, shared by the text and HTML views.
pub fn content_text(content: &RegionContent) -> String {
    match content {
        RegionContent::Text { text } | RegionContent::GridEntry { text, .. } => text.clone(),
        RegionContent::Labels { labels } => labels.join(", "),
    }
}
