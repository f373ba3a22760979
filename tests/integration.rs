use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use pretty_assertions::assert_eq;
use serde_json::Value;

use dualstream::core::config::FusionConfig;
use dualstream::export::ExportFormat;
use dualstream::pipeline::{fuse_page, load_page, run_page, PagePair, PipelineConfig};

const TEXTRACT: &str = r#"{"Blocks": [
    {"Id": "page", "BlockType": "PAGE", "Geometry": {"BoundingBox": {"Width": 1, "Height": 1, "Left": 0, "Top": 0}}},
    {"Id": "para", "BlockType": "LAYOUT_TEXT", "Confidence": 95.0,
     "Geometry": {"BoundingBox": {"Width": 0.6, "Height": 0.05, "Left": 0.1, "Top": 0.1}}},
    {"Id": "tbl", "BlockType": "TABLE", "Confidence": 90.0,
     "Geometry": {"BoundingBox": {"Width": 0.6, "Height": 0.1, "Left": 0.1, "Top": 0.3}},
     "Relationships": [{"Type": "CHILD", "Ids": ["c1", "c2"]}]},
    {"Id": "c1", "BlockType": "CELL", "RowIndex": 1, "ColumnIndex": 1,
     "Geometry": {"BoundingBox": {"Width": 0.3, "Height": 0.1, "Left": 0.1, "Top": 0.3}}},
    {"Id": "c2", "BlockType": "CELL", "RowIndex": 1, "ColumnIndex": 2,
     "Geometry": {"BoundingBox": {"Width": 0.3, "Height": 0.1, "Left": 0.4, "Top": 0.3}}},
    {"Id": "fig", "BlockType": "LAYOUT_FIGURE",
     "Geometry": {"BoundingBox": {"Width": 0.3, "Height": 0.2, "Left": 0.1, "Top": 0.6}}}
]}"#;

const TEXTRACT_MERGED: &str = r#"{"Blocks": [
    {"Id": "tbl", "BlockType": "TABLE",
     "Geometry": {"BoundingBox": {"Width": 0.6, "Height": 0.1, "Left": 0.1, "Top": 0.3}},
     "Relationships": [{"Type": "CHILD", "Ids": ["c1", "c2"]}, {"Type": "MERGED_CELL", "Ids": ["m1"]}]},
    {"Id": "c1", "BlockType": "CELL", "RowIndex": 1, "ColumnIndex": 1,
     "Geometry": {"BoundingBox": {"Width": 0.3, "Height": 0.1, "Left": 0.1, "Top": 0.3}}},
    {"Id": "c2", "BlockType": "CELL", "RowIndex": 1, "ColumnIndex": 2,
     "Geometry": {"BoundingBox": {"Width": 0.3, "Height": 0.1, "Left": 0.4, "Top": 0.3}}},
    {"Id": "m1", "BlockType": "MERGED_CELL", "RowIndex": 1, "ColumnIndex": 1,
     "Geometry": {"BoundingBox": {"Width": 0.6, "Height": 0.1, "Left": 0.1, "Top": 0.3}},
     "Relationships": [{"Type": "CHILD", "Ids": ["c1", "c2"]}]}
]}"#;

fn vision_word(text: &str, x0: u32, y0: u32, x1: u32, y1: u32) -> String {
    format!(
        r#"{{"boundingBox": {{"vertices": [{{"x": {x0}, "y": {y0}}}, {{"x": {x1}, "y": {y0}}}, {{"x": {x1}, "y": {y1}}}, {{"x": {x0}, "y": {y1}}}]}},
            "confidence": 0.98, "symbols": [{{"text": "{text}"}}]}}"#
    )
}

fn vision_document() -> String {
    let words = [
        vision_word("Қазақ", 110, 110, 200, 140),
        vision_word("тілі", 210, 110, 280, 140),
        vision_word("сабағы", 290, 110, 400, 140),
        vision_word("Аты", 120, 320, 200, 350),
        vision_word("шет", 900, 900, 950, 930),
    ]
    .join(", ");
    format!(
        r#"{{"responses": [{{"fullTextAnnotation": {{"pages": [{{"width": 1000, "height": 1000,
            "blocks": [{{"paragraphs": [{{"words": [{words}]}}]}}]}}]}}}}]}}"#
    )
}

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

fn write_pair(dir: &Path, name: &str, layout: &str, tokens: &str) -> Result<PagePair> {
    fs::create_dir_all(dir)?;
    let layout_path = dir.join(format!("{name}_aws.json"));
    let tokens_path = dir.join(format!("{name}_google.json"));
    fs::write(&layout_path, layout)?;
    fs::write(&tokens_path, tokens)?;
    Ok(PagePair::from_paths(layout_path, tokens_path))
}

fn json_config(out: PathBuf) -> PipelineConfig {
    PipelineConfig::new(FusionConfig::default(), out, vec![ExportFormat::Json])
}

#[test]
fn textract_and_vision_pages_fuse_end_to_end() -> Result<()> {
    let dir = temp_output_dir("dualstream-e2e");
    let pair = write_pair(&dir, "scan", TEXTRACT, &vision_document())?;
    let out = dir.join("out");
    run_page(&pair, &json_config(out.clone()))?;

    let page: Value = serde_json::from_str(&fs::read_to_string(out.join("scan.json"))?)?;
    assert_eq!(page["page"], "scan");

    let ids: Vec<&str> = page["regions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["para", "tbl", "c1", "c2", "fig"]);

    let para = &page["regions"][0];
    assert_eq!(para["type"], "paragraph");
    assert_eq!(para["content"]["strategy"], "text");
    assert_eq!(para["content"]["text"], "Қазақ тілі сабағы");

    let c1 = &page["regions"][2];
    assert_eq!(c1["content"]["text"], "Аты");
    assert_eq!(c1["parent"], "tbl");

    let empty_cell = &page["regions"][3];
    assert_eq!(empty_cell["content"]["strategy"], "grid_entry");
    assert_eq!(empty_cell["content"]["row"], 0);
    assert_eq!(empty_cell["content"]["column"], 1);
    assert_eq!(empty_cell["content"]["text"], "");

    assert_eq!(page["regions"][4]["content"]["labels"], serde_json::json!([]));

    let unmatched = page["unmatched_tokens"].as_array().unwrap();
    assert_eq!(unmatched.len(), 1);
    assert_eq!(unmatched[0]["text"], "шет");
    assert_eq!(unmatched[0]["reason"], "unmatched");

    let _ = fs::remove_dir_all(&dir);
    Ok(())
}

#[test]
fn identical_inputs_give_identical_bytes() -> Result<()> {
    let dir = temp_output_dir("dualstream-determinism");
    let pair = write_pair(&dir, "scan", TEXTRACT, &vision_document())?;

    run_page(&pair, &json_config(dir.join("first")))?;
    run_page(&pair, &json_config(dir.join("second")))?;

    let first = fs::read(dir.join("first/scan.json"))?;
    let second = fs::read(dir.join("second/scan.json"))?;
    assert!(first == second, "outputs differ between runs");

    let _ = fs::remove_dir_all(&dir);
    Ok(())
}

#[test]
fn boundary_miss_is_recovered_by_the_buffer() -> Result<()> {
    let dir = temp_output_dir("dualstream-buffer");
    // centroid (20, 22) sits 2 units below the region; token height 50
    let pair = write_pair(
        &dir,
        "edge",
        r#"{"regions": [{"id": "p", "type": "paragraph", "bbox": [0, 0, 100, 20]}]}"#,
        r#"{"tokens": [{"text": "шекара", "bbox": [10, -3, 30, 47]}]}"#,
    )?;
    let inputs = load_page(&pair)?;

    let buffered = fuse_page("edge", inputs.regions.clone(), &inputs.tokens, &FusionConfig::default())?;
    assert!(buffered.metrics.tolerance_buffer >= 2.0);
    let region = buffered.region("p").expect("region p is kept");
    assert_eq!(region.token_ids.len(), 1);
    assert!(buffered.unmatched_tokens.is_empty());

    let strict = FusionConfig::default().with_tolerance_fraction(0.0);
    let unbuffered = fuse_page("edge", inputs.regions, &inputs.tokens, &strict)?;
    assert!(unbuffered.regions[0].token_ids.is_empty());
    assert_eq!(unbuffered.unmatched_tokens.len(), 1);
    assert_eq!(unbuffered.unmatched_tokens[0].reason.code(), "unmatched");

    let _ = fs::remove_dir_all(&dir);
    Ok(())
}

#[test]
fn degenerate_token_is_orphaned_and_the_run_completes() -> Result<()> {
    let dir = temp_output_dir("dualstream-degenerate");
    let pair = write_pair(
        &dir,
        "dot",
        r#"{"regions": [
            {"id": "p", "type": "paragraph", "bbox": [0, 0, 100, 20]},
            {"id": "line", "type": "caption", "polygon": [[0, 50], [100, 50]]}
        ]}"#,
        r#"{"tokens": [
            {"text": "жақсы", "bbox": [5, 5, 40, 15]},
            {"text": ".", "polygon": [[5, 5]]}
        ]}"#,
    )?;
    let out = dir.join("out");
    run_page(&pair, &json_config(out.clone()))?;

    let page: Value = serde_json::from_str(&fs::read_to_string(out.join("dot.json"))?)?;
    assert_eq!(page["regions"].as_array().unwrap().len(), 2);
    assert_eq!(page["regions"][0]["content"]["text"], "жақсы");

    let unmatched = page["unmatched_tokens"].as_array().unwrap();
    assert_eq!(unmatched.len(), 1);
    assert_eq!(unmatched[0]["reason"], "malformed_geometry.too_few_points");

    let notices = page["notices"].as_array().unwrap();
    assert!(notices
        .iter()
        .any(|n| n["kind"] == "malformed_region" && n["region"] == "line"));

    let _ = fs::remove_dir_all(&dir);
    Ok(())
}

#[test]
fn invalid_document_is_fatal_and_writes_nothing() -> Result<()> {
    let dir = temp_output_dir("dualstream-invalid");
    let pair = write_pair(&dir, "bad", r#"{"Pages": []}"#, &vision_document())?;
    let out = dir.join("out");

    let err = run_page(&pair, &json_config(out.clone())).unwrap_err();
    assert!(format!("{err:#}").contains("invalid layout document"));
    assert!(!out.join("bad.json").exists());

    let _ = fs::remove_dir_all(&dir);
    Ok(())
}

#[test]
fn duplicate_region_ids_are_rejected() -> Result<()> {
    let dir = temp_output_dir("dualstream-duplicate");
    let pair = write_pair(
        &dir,
        "dup",
        r#"{"regions": [
            {"id": "p", "type": "paragraph", "bbox": [0, 0, 10, 10]},
            {"id": "p", "type": "diagram", "bbox": [20, 0, 30, 10]}
        ]}"#,
        r#"{"tokens": []}"#,
    )?;

    let err = run_page(&pair, &json_config(dir.join("out"))).unwrap_err();
    assert!(format!("{err:#}").contains("duplicate region identifier: p"));

    let _ = fs::remove_dir_all(&dir);
    Ok(())
}

#[test]
fn merged_cell_keeps_the_text_of_the_cells_it_spans() -> Result<()> {
    let dir = temp_output_dir("dualstream-merged");
    let pair = write_pair(&dir, "merged", TEXTRACT_MERGED, &vision_document())?;
    let out = dir.join("out");
    let config = PipelineConfig::new(FusionConfig::default(), out.clone(), vec![ExportFormat::Markdown]);
    run_page(&pair, &config)?;

    let md = fs::read_to_string(out.join("merged.md"))?;
    assert!(md.contains("| Аты |  |\n| --- | --- |\n"), "{md}");
    assert_eq!(md.matches("**Table").count(), 1);

    let _ = fs::remove_dir_all(&dir);
    Ok(())
}
