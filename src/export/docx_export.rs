use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use docx_rs::{
    BreakType, Docx, Paragraph, Run, RunFonts, Style, StyleType, Table, TableCell, TableRow,
    VMergeType,
};

use crate::core::model::{DocBlock, ReconstructedDocument, TableBlock};
use crate::export::{ensure_parent, Exporter};

const HEADING_STYLE: &str = "Heading1";

/// Document-wide font. The east-asian slot gets the same face so CJK text
/// renders in it too.
#[derive(Debug, Clone, PartialEq)]
pub struct DocxStyle {
    pub font_name: String,
    /// Points.
    pub font_size: f32,
}

impl Default for DocxStyle {
    fn default() -> Self {
        Self {
            font_name: "SimSun".to_string(),
            font_size: 11.0,
        }
    }
}

impl DocxStyle {
    fn half_points(&self) -> usize {
        (self.font_size * 2.0).round().max(2.0) as usize
    }
}

#[derive(Debug, Clone)]
pub struct DocxExporter {
    path: PathBuf,
    style: DocxStyle,
}

impl DocxExporter {
    pub fn new(path: PathBuf, style: DocxStyle) -> Self {
        Self { path, style }
    }

    fn build(&self, document: &ReconstructedDocument) -> Docx {
        let fonts = RunFonts::new()
            .ascii(&self.style.font_name)
            .hi_ansi(&self.style.font_name)
            .east_asia(&self.style.font_name);
        let heading = Style::new(HEADING_STYLE, StyleType::Paragraph)
            .name("Heading 1")
            .size(self.style.half_points() + 12)
            .bold();

        let mut docx = Docx::new()
            .default_fonts(fonts)
            .default_size(self.style.half_points())
            .add_style(heading);

        for block in &document.blocks {
            docx = match block {
                DocBlock::Heading { text } => docx.add_paragraph(
                    Paragraph::new()
                        .style(HEADING_STYLE)
                        .add_run(Run::new().add_text(text)),
                ),
                DocBlock::Paragraph { text } => docx.add_paragraph(text_paragraph(text)),
                // Word glues consecutive tables together without a spacer.
                DocBlock::Table(table) => docx
                    .add_table(table_to_docx(table))
                    .add_paragraph(Paragraph::new()),
                DocBlock::PageBreak => docx.add_paragraph(
                    Paragraph::new().add_run(Run::new().add_break(BreakType::Page)),
                ),
            };
        }
        docx
    }
}

/// Embedded newlines become line breaks inside one paragraph.
fn text_paragraph(text: &str) -> Paragraph {
    let mut run = Run::new();
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        run = run.add_text(line);
    }
    Paragraph::new().add_run(run)
}

fn table_to_docx(table: &TableBlock) -> Table {
    let rows = table
        .rows()
        .iter()
        .enumerate()
        .map(|(r, row)| {
            let mut cells = Vec::with_capacity(row.len());
            for (c, text) in row.iter().enumerate() {
                let Some(region) = table.merge_at(r, c) else {
                    cells.push(TableCell::new().add_paragraph(text_paragraph(text)));
                    continue;
                };
                if c != region.left {
                    continue;
                }
                let mut cell = if r == region.top {
                    TableCell::new().add_paragraph(text_paragraph(text))
                } else {
                    TableCell::new().add_paragraph(Paragraph::new())
                };
                if region.col_span() > 1 {
                    cell = cell.grid_span(region.col_span());
                }
                if region.row_span() > 1 {
                    let merge = if r == region.top {
                        VMergeType::Restart
                    } else {
                        VMergeType::Continue
                    };
                    cell = cell.vertical_merge(merge);
                }
                cells.push(cell);
            }
            TableRow::new(cells)
        })
        .collect();
    Table::new(rows)
}

impl Exporter for DocxExporter {
    fn export(&self, document: &ReconstructedDocument) -> Result<()> {
        ensure_parent(&self.path)?;
        let file = File::create(&self.path)
            .with_context(|| format!("failed to create {}", self.path.display()))?;
        self.build(document)
            .build()
            .pack(file)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}
