use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use crate::core::model::{DocBlock, ReconstructedDocument, TableBlock};
use crate::export::{ensure_parent, Exporter};

/// Plain text: tables as tab separated rows, page breaks as form feeds.
#[derive(Debug, Clone)]
pub struct TextExporter {
    path: PathBuf,
}

impl TextExporter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn format_block(block: &DocBlock) -> String {
        match block {
            DocBlock::Heading { text } => format!("=== {text} ==="),
            DocBlock::Paragraph { text } => text.clone(),
            DocBlock::Table(table) => Self::format_table(table),
            DocBlock::PageBreak => "\u{000C}".to_string(),
        }
    }

    fn format_table(table: &TableBlock) -> String {
        table
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.replace('\n', " "))
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render(document: &ReconstructedDocument) -> String {
        let mut text = String::new();
        for block in &document.blocks {
            text.push_str(&Self::format_block(block));
            text.push_str("\n\n");
        }
        text
    }
}

impl Exporter for TextExporter {
    fn export(&self, document: &ReconstructedDocument) -> Result<()> {
        ensure_parent(&self.path)?;
        fs::write(&self.path, Self::render(document))?;
        Ok(())
    }
}
