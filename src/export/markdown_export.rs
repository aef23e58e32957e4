use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use crate::core::model::{DocBlock, ReconstructedDocument, TableBlock};
use crate::export::{ensure_parent, Exporter};

#[derive(Debug, Clone)]
pub struct MarkdownExporter {
    path: PathBuf,
}

impl MarkdownExporter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn render(document: &ReconstructedDocument) -> String {
        let mut markdown = String::new();
        for block in &document.blocks {
            let block_text = match block {
                DocBlock::Heading { text } => format!("# {text}"),
                DocBlock::Paragraph { text } => text.clone(),
                DocBlock::Table(table) => Self::format_table(table),
                DocBlock::PageBreak => "---".to_string(),
            };
            if !block_text.is_empty() {
                markdown.push_str(&block_text);
                markdown.push_str("\n\n");
            }
        }
        markdown
    }

    /// GFM pipe table with the first row as header. Merged regions keep their
    /// text in the top-left cell and leave the covered cells blank.
    fn format_table(table: &TableBlock) -> String {
        let cols = table.col_count();
        if cols == 0 {
            return String::new();
        }

        let mut lines = Vec::with_capacity(table.row_count() + 1);
        for (r, row) in table.rows().iter().enumerate() {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(c, cell)| match table.merge_at(r, c) {
                    Some(region) if (region.top, region.left) != (r, c) => String::new(),
                    _ => escape_cell(cell),
                })
                .collect();
            lines.push(format!("| {} |", cells.join(" | ")));
            if r == 0 {
                lines.push(format!("|{}", " --- |".repeat(cols)));
            }
        }
        lines.join("\n")
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', "<br>")
}

impl Exporter for MarkdownExporter {
    fn export(&self, document: &ReconstructedDocument) -> Result<()> {
        ensure_parent(&self.path)?;
        fs::write(&self.path, Self::render(document))?;
        Ok(())
    }
}
