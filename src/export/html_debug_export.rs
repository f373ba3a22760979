use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::geometry::{BBox, Point};
use crate::core::model::{FusedPage, FusedRegion, UnmatchedToken};
use crate::export::{content_text, page_path, ExportFormat, Exporter};

/// Rendered width of the overlay canvas in CSS pixels.
const CANVAS_WIDTH: f64 = 1000.0;

/// Review overlay: region outlines coloured by type, unmatched tokens in red.
/// Coordinates are scaled from the page's coordinate extent so normalized
/// and pixel inputs render alike.
#[derive(Debug, Clone)]
pub struct HtmlDebugExporter {
    out_dir: PathBuf,
}

impl HtmlDebugExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    fn region_to_div(region: &FusedRegion, scale: f64) -> String {
        let Some(bbox) = BBox::from_points(&region.polygon) else {
            return String::new();
        };
        let text = content_text(&region.content);
        format!(
            r#"<div class='bbox region {kind}' style='{style}' data-id='{id}' data-type='{kind}' data-confidence='{conf:.3}' data-tokens='{tokens}' data-text='{text}'></div>"#,
            kind = region.kind.label(),
            style = position_style(&bbox, scale),
            id = html_escape::encode_single_quoted_attribute(&region.id.0),
            conf = region.confidence,
            tokens = region.token_ids.len(),
            text = html_escape::encode_single_quoted_attribute(&text),
        )
    }

    fn orphan_to_div(token: &UnmatchedToken, scale: f64) -> String {
        let Some(bbox) = BBox::from_points(&token.polygon) else {
            return String::new();
        };
        format!(
            r#"<div class='bbox orphan' style='{style}' data-id='{id}' data-type='unmatched' data-confidence='{conf:.3}' data-reason='{reason}' data-text='{text}'></div>"#,
            style = position_style(&bbox, scale),
            id = token.id,
            conf = token.confidence,
            reason = token.reason.code(),
            text = html_escape::encode_single_quoted_attribute(&token.text),
        )
    }

    pub fn render(page: &FusedPage) -> String {
        let extent = page
            .regions
            .iter()
            .flat_map(|r| r.polygon.iter())
            .chain(page.unmatched_tokens.iter().flat_map(|t| t.polygon.iter()))
            .copied()
            .collect::<Vec<Point>>();
        let (scale, height) = match BBox::from_points(&extent) {
            Some(b) if b.x1 > 0.0 => {
                let scale = CANVAS_WIDTH / b.x1;
                (scale, (b.y1 * scale).max(0.0))
            }
            _ => (1.0, CANVAS_WIDTH),
        };

        let mut boxes = String::new();
        for region in &page.regions {
            boxes.push_str(&Self::region_to_div(region, scale));
        }
        for token in &page.unmatched_tokens {
            boxes.push_str(&Self::orphan_to_div(token, scale));
        }

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset='utf-8'>
<title>Fusion review {title}</title>
<style>
body {{ margin: 0; font-family: Arial, sans-serif; }}
#canvas {{ position: relative; width: {width}px; height: {height:.0}px; border: 1px solid #ccc; }}
.bbox {{ position: absolute; border: 2px solid rgba(0,0,255,0.4); box-sizing: border-box; }}
.bbox.paragraph {{ background: rgba(100,100,255,0.1); }}
.bbox.caption {{ background: rgba(0,200,200,0.15); }}
.bbox.table_cell {{ background: rgba(255,165,0,0.15); border-style: dashed; }}
.bbox.diagram {{ background: rgba(128,0,128,0.1); }}
.bbox.unknown {{ border-color: rgba(128,128,128,0.5); }}
.bbox.orphan {{ border-color: rgba(255,0,0,0.9); background: rgba(255,0,0,0.2); }}
#info {{ position: fixed; right: 10px; top: 10px; background: #fff; padding: 10px; border: 1px solid #ddd; max-width: 300px; }}
</style>
</head>
<body>
<div id='info'>Click a box to inspect.</div>
<div id='canvas'>
{boxes}
</div>
<script>
const info = document.getElementById('info');
for (const el of document.querySelectorAll('.bbox')) {{
  el.addEventListener('click', (event) => {{
    event.stopPropagation();
    info.innerText = `id: ${{el.dataset.id}}\ntype: ${{el.dataset.type}}\nconfidence: ${{el.dataset.confidence}}\nreason: ${{el.dataset.reason || ''}}\ntext: ${{el.dataset.text}}`;
  }});
}}
</script>
</body>
</html>"#,
            title = html_escape::encode_text(&page.page),
            width = CANVAS_WIDTH,
            height = height,
            boxes = boxes,
        )
    }
}

fn position_style(bbox: &BBox, scale: f64) -> String {
    format!(
        "left:{:.1}px; top:{:.1}px; width:{:.1}px; height:{:.1}px;",
        bbox.x0 * scale,
        bbox.y0 * scale,
        bbox.width() * scale,
        bbox.height() * scale
    )
}

impl Exporter for HtmlDebugExporter {
    fn export(&self, page: &FusedPage) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        let path = page_path(&self.out_dir, &page.page, ExportFormat::Html);
        fs::write(&path, Self::render(page))
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
