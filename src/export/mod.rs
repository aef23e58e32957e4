pub mod docx_export;
pub mod html_export;
pub mod json_export;
pub mod markdown_export;
pub mod text_export;

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::model::{DocBlock, ReconstructedDocument, TableBlock};

pub use docx_export::{DocxExporter, DocxStyle};
pub use html_export::HtmlExporter;
pub use json_export::JsonExporter;
pub use markdown_export::MarkdownExporter;
pub use text_export::TextExporter;

/// The output-document collaborator the rebuild engine writes into.
pub trait DocumentSink {
    fn add_heading(&mut self, text: &str);
    fn add_paragraph(&mut self, text: &str);
    /// Append a `rows x cols` table. `fill` receives the empty table and
    /// writes its cells and merges before it is stored.
    fn add_table(&mut self, rows: usize, cols: usize, fill: &mut dyn FnMut(&mut TableBlock));
    fn add_page_break(&mut self);
}

impl DocumentSink for ReconstructedDocument {
    fn add_heading(&mut self, text: &str) {
        self.blocks.push(DocBlock::Heading {
            text: text.to_string(),
        });
    }

    fn add_paragraph(&mut self, text: &str) {
        self.blocks.push(DocBlock::Paragraph {
            text: text.to_string(),
        });
    }

    fn add_table(&mut self, rows: usize, cols: usize, fill: &mut dyn FnMut(&mut TableBlock)) {
        let mut table = TableBlock::new(rows, cols);
        fill(&mut table);
        self.blocks.push(DocBlock::Table(table));
    }

    fn add_page_break(&mut self) {
        self.blocks.push(DocBlock::PageBreak);
    }
}

/// Replay a finished document into another sink, block by block.
pub fn write_document(document: &ReconstructedDocument, sink: &mut dyn DocumentSink) {
    for block in &document.blocks {
        match block {
            DocBlock::Heading { text } => sink.add_heading(text),
            DocBlock::Paragraph { text } => sink.add_paragraph(text),
            DocBlock::Table(source) => {
                sink.add_table(source.row_count(), source.col_count(), &mut |table| {
                    for (r, row) in source.rows().iter().enumerate() {
                        for (c, text) in row.iter().enumerate() {
                            table.set_cell(r, c, text.as_str());
                        }
                    }
                    for region in source.merges() {
                        table.merge(region.top, region.left, region.bottom, region.right);
                    }
                });
            }
            DocBlock::PageBreak => sink.add_page_break(),
        }
    }
}

pub trait Exporter {
    fn export(&self, document: &ReconstructedDocument) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Docx,
    Json,
    Markdown,
    Text,
    Html,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Json => "json",
            Self::Markdown => "md",
            Self::Text => "txt",
            Self::Html => "html",
        }
    }

    /// Output path for this format: the requested path with the format's
    /// extension.
    pub fn output_path(self, output: &Path) -> PathBuf {
        output.with_extension(self.extension())
    }

    pub fn exporter(self, path: PathBuf, style: &DocxStyle) -> Box<dyn Exporter> {
        match self {
            Self::Docx => Box::new(DocxExporter::new(path, style.clone())),
            Self::Json => Box::new(JsonExporter::new(path)),
            Self::Markdown => Box::new(MarkdownExporter::new(path)),
            Self::Text => Box::new(TextExporter::new(path)),
            Self::Html => Box::new(HtmlExporter::new(path)),
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
