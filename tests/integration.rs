use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde_json::json;

use pagerebuild::core::model::{DocBlock, MergeRegion};
use pagerebuild::export::{DocxStyle, ExportFormat};
use pagerebuild::ocr::RawPage;
use pagerebuild::pipeline::{export_document, load_layouts, rebuild_pages};
use pagerebuild::rebuild::{AssemblyMode, AssemblyOptions, OverrideRegistry};

fn batch() -> AssemblyOptions {
    AssemblyOptions::default()
}

fn write_layout(dir: &std::path::Path, page: &RawPage) -> Result<PathBuf> {
    let path = dir.join(format!("{}.json", page.page_id));
    fs::write(&path, serde_json::to_string(page)?)?;
    Ok(path)
}

/// Structure-recognized table with a two-level header, as the layout model
/// emits it.
#[test]
fn test_html_table_page_end_to_end() -> Result<()> {
    let html = "<html><body><table>\
        <tr><td rowspan=\"2\">Year</td><td colspan=\"2\">Output</td></tr>\
        <tr><td>Grain</td><td>Cloth</td></tr>\
        <tr><td>1950</td><td>12</td><td>7</td></tr>\
        </table></body></html>";
    let raw = RawPage::new(
        "1.jpg",
        vec![
            json!({"type": "text", "bbox": [0, 0, 300, 20], "res": [
                {"text": "Table 1", "confidence": 0.99, "text_region": [[0, 0], [300, 0], [300, 20], [0, 20]]}
            ]}),
            json!({"type": "table", "bbox": [0, 30, 300, 200], "res": {"html": html}}),
        ],
    );

    let (document, summary) = rebuild_pages(&[raw], &OverrideRegistry::builtin(), &batch());

    assert_eq!(summary.tables, 1);
    assert_eq!(summary.diagnostics, 0);
    // A page with a table emits only its tables.
    assert_eq!(document.paragraphs().count(), 0);
    let table = document.tables().next().expect("table");
    assert_eq!((table.row_count(), table.col_count()), (3, 3));
    assert_eq!(
        table.merges(),
        &[
            MergeRegion { top: 0, left: 0, bottom: 1, right: 0 },
            MergeRegion { top: 0, left: 1, bottom: 0, right: 2 },
        ]
    );
    assert_eq!(table.cell(1, 1), Some("Grain"));
    assert_eq!(table.cell(2, 2), Some("7"));
    Ok(())
}

#[test]
fn test_batch_of_pages_from_saved_layouts() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let pages = [
        RawPage::new(
            "1.jpg",
            vec![
                json!([[[0, 0], [100, 0], [100, 10], [0, 10]], ["第一段", 0.95]]),
                json!([[[0, 20], [100, 20], [100, 30], [0, 30]], ["second line", 0.9]]),
            ],
        ),
        RawPage::new("2.jpg", Vec::new()),
        RawPage::new(
            "3.jpg",
            vec![json!({"type": "table", "res": {"html": "<p>no table here</p>"}})],
        ),
    ];
    let paths = pages
        .iter()
        .map(|page| write_layout(dir.path(), page))
        .collect::<Result<Vec<_>>>()?;

    let raw_pages = load_layouts(&paths)?;
    let (document, summary) = rebuild_pages(&raw_pages, &OverrideRegistry::builtin(), &batch());

    assert_eq!(summary.pages, 3);
    assert_eq!(summary.placeholders, 1);
    assert_eq!(document.page_break_count(), 2);
    assert_eq!(
        document.blocks,
        vec![
            DocBlock::Heading { text: "Content from 1.jpg".to_string() },
            DocBlock::Paragraph { text: "第一段".to_string() },
            DocBlock::Paragraph { text: "second line".to_string() },
            DocBlock::PageBreak,
            DocBlock::Heading { text: "Content from 2.jpg".to_string() },
            DocBlock::Paragraph { text: "[No content could be extracted from 2.jpg]".to_string() },
            DocBlock::PageBreak,
            DocBlock::Heading { text: "Content from 3.jpg".to_string() },
            DocBlock::Paragraph {
                text: "[Warning: Could not find table structure in provided HTML]".to_string()
            },
        ]
    );
    Ok(())
}

#[test]
fn test_override_page_is_rebuilt_by_registered_handler() -> Result<()> {
    let line = |text: &str, x: i32, y: i32| json!([[[x, y], [x + 40, y], [x + 40, y + 10], [x, y + 10]], [text, 0.9]]);
    let mut elements = vec![line("15.", 0, 0), line("材料一", 0, 20)];
    for (label, y) in [("西汉", 100), ("唐代", 140), ("北宋", 180)] {
        elements.push(line(label, 0, y));
        for (i, value) in ["1", "2", "3", "4"].iter().enumerate() {
            elements.push(line(value, 50 * (i as i32 + 1), y));
        }
        elements.push(line(if label == "北宋" { "37.1%" } else { "x" }, 250, y));
    }
    elements.push(line("阅读材料，回答问题", 0, 300));

    let options = AssemblyOptions {
        mode: AssemblyMode::SingleImage,
        ..AssemblyOptions::default()
    };
    let (document, summary) =
        rebuild_pages(&[RawPage::new("6.jpg", elements)], &OverrideRegistry::builtin(), &options);

    assert_eq!(summary.diagnostics, 1);
    let table = document.tables().next().expect("override table");
    assert_eq!((table.row_count(), table.col_count()), (5, 5));
    assert_eq!(table.rows()[3][0], "唐代");
    let paragraphs: Vec<_> = document.paragraphs().collect();
    assert_eq!(paragraphs, vec!["15.", "材料一", "阅读材料，回答问题"]);
    Ok(())
}

#[test]
fn test_same_page_without_override_takes_generic_path() {
    let raw = RawPage::new(
        "6.jpg",
        vec![json!([[[0, 0], [10, 0], [10, 10], [0, 10]], ["plain", 0.9]])],
    );
    let (document, summary) = rebuild_pages(&[raw], &OverrideRegistry::empty(), &batch());
    assert_eq!(summary.diagnostics, 0);
    assert_eq!(document.tables().count(), 0);
    assert_eq!(document.paragraphs().collect::<Vec<_>>(), vec!["plain"]);
}

#[test]
fn test_export_all_formats() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let raw = RawPage::new(
        "1.jpg",
        vec![json!({"type": "table", "res": {"html": "<table><tr><td colspan='2'>a &amp; b</td></tr><tr><td>c</td><td>d</td></tr></table>"}})],
    );
    let (document, _) = rebuild_pages(&[raw], &OverrideRegistry::builtin(), &batch());

    let formats = [
        ExportFormat::Docx,
        ExportFormat::Json,
        ExportFormat::Markdown,
        ExportFormat::Text,
        ExportFormat::Html,
    ];
    let written = export_document(
        &document,
        &dir.path().join("extracted_text.docx"),
        &formats,
        &DocxStyle::default(),
    )?;
    assert_eq!(written.len(), formats.len());

    let html = fs::read_to_string(dir.path().join("extracted_text.html"))?;
    assert!(html.contains("<td colspan='2'>a &amp; b</td>"));
    let text = fs::read_to_string(dir.path().join("extracted_text.txt"))?;
    assert!(text.contains("c\td"));
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("extracted_text.json"))?)?;
    assert_eq!(json["blocks"][1]["type"], "table");
    Ok(())
}
