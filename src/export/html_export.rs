use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use crate::core::model::{DocBlock, ReconstructedDocument, TableBlock};
use crate::export::{ensure_parent, Exporter};

/// Standalone HTML page. Merged regions are written back as real
/// `colspan`/`rowspan` cells.
#[derive(Debug, Clone)]
pub struct HtmlExporter {
    path: PathBuf,
}

impl HtmlExporter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn render(document: &ReconstructedDocument) -> String {
        let mut body = String::new();
        for block in &document.blocks {
            match block {
                DocBlock::Heading { text } => {
                    body.push_str(&format!("<h1>{}</h1>\n", html_escape::encode_text(text)));
                }
                DocBlock::Paragraph { text } => {
                    body.push_str(&format!("<p>{}</p>\n", html_escape::encode_text(text)));
                }
                DocBlock::Table(table) => body.push_str(&table_to_html(table)),
                DocBlock::PageBreak => body.push_str("<hr class='page-break'/>\n"),
            }
        }

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset='utf-8'>
<style>
table {{ border-collapse: collapse; margin: 0 0 1em 0; }}
td {{ border: 1px solid #444; padding: 2px 6px; }}
hr.page-break {{ page-break-after: always; }}
</style>
</head>
<body>
{body}</body>
</html>
"#
        )
    }
}

fn table_to_html(table: &TableBlock) -> String {
    let mut html = String::from("<table>\n");
    for (r, row) in table.rows().iter().enumerate() {
        html.push_str("<tr>");
        for (c, cell) in row.iter().enumerate() {
            let mut attrs = String::new();
            if let Some(region) = table.merge_at(r, c) {
                if (region.top, region.left) != (r, c) {
                    continue;
                }
                if region.col_span() > 1 {
                    attrs.push_str(&format!(" colspan='{}'", region.col_span()));
                }
                if region.row_span() > 1 {
                    attrs.push_str(&format!(" rowspan='{}'", region.row_span()));
                }
            }
            let text = html_escape::encode_text(cell).replace('\n', "<br/>");
            html.push_str(&format!("<td{attrs}>{text}</td>"));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
    html
}

impl Exporter for HtmlExporter {
    fn export(&self, document: &ReconstructedDocument) -> Result<()> {
        ensure_parent(&self.path)?;
        fs::write(&self.path, Self::render(document))?;
        Ok(())
    }
}
