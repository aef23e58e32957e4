use crate::core::model::{BlockKind, LayoutElement, PageLayout, ReconstructedDocument};
use crate::export::DocumentSink;
use crate::rebuild::diagnostics::{Diagnostic, Diagnostics};
use crate::rebuild::line_grouper::{self, DEFAULT_Y_THRESHOLD};
use crate::rebuild::overrides::{OverrideRegistry, PageStrategy};
use crate::rebuild::segment::segment_paragraphs;
use crate::rebuild::table_grid::{build_grid, TableGrid, TableParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyMode {
    /// One input image rendered on its own: no headings, no page breaks.
    SingleImage,
    /// Several inputs: each page opens with a heading and pages are separated
    /// by page breaks.
    Batch,
}

#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    pub mode: AssemblyMode,
    pub y_threshold: f32,
    /// Rebuild pages without an HTML table as a table of geometric rows
    /// instead of paragraphs.
    pub geometric_tables: bool,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            mode: AssemblyMode::Batch,
            y_threshold: DEFAULT_Y_THRESHOLD,
            geometric_tables: false,
        }
    }
}

pub struct Assembler<'a> {
    registry: &'a OverrideRegistry,
    options: AssemblyOptions,
}

impl<'a> Assembler<'a> {
    pub fn new(registry: &'a OverrideRegistry, options: AssemblyOptions) -> Self {
        Self { registry, options }
    }

    pub fn assemble(
        &self,
        pages: &[PageLayout],
        diagnostics: &mut dyn Diagnostics,
    ) -> ReconstructedDocument {
        let mut document = ReconstructedDocument::new();
        self.write_pages(pages, &mut document, diagnostics);
        document
    }

    pub fn write_pages(
        &self,
        pages: &[PageLayout],
        sink: &mut dyn DocumentSink,
        diagnostics: &mut dyn Diagnostics,
    ) {
        let batch = self.options.mode == AssemblyMode::Batch;
        for (idx, page) in pages.iter().enumerate() {
            if batch {
                sink.add_heading(&format!("Content from {}", page.page_id));
            }
            self.write_page(page, sink, diagnostics);
            if batch && idx + 1 < pages.len() {
                sink.add_page_break();
            }
        }
    }

    fn write_page(
        &self,
        page: &PageLayout,
        sink: &mut dyn DocumentSink,
        diagnostics: &mut dyn Diagnostics,
    ) {
        if page.elements.is_empty() {
            diagnostics.report(Diagnostic::EmptyPage {
                page_id: page.page_id.clone(),
            });
            write_placeholder(page, sink);
            return;
        }

        match self.registry.strategy_for(&page.page_id) {
            PageStrategy::Override(entry) => {
                diagnostics.report(Diagnostic::OverrideApplied {
                    page_id: page.page_id.clone(),
                    name: entry.name,
                });
                (entry.apply)(page, sink, diagnostics);
            }
            PageStrategy::Generic => self.write_generic(page, sink, diagnostics),
        }
    }

    fn write_generic(
        &self,
        page: &PageLayout,
        sink: &mut dyn DocumentSink,
        diagnostics: &mut dyn Diagnostics,
    ) {
        let mut found_table = false;
        for element in &page.elements {
            let LayoutElement::Block(block) = element else {
                continue;
            };
            if block.kind != BlockKind::Table {
                continue;
            }
            let Some(html) = block.table_html.as_deref().filter(|html| !html.is_empty()) else {
                continue;
            };
            found_table = true;
            write_html_table(page, html, sink, diagnostics);
        }
        if found_table {
            return;
        }

        if self.options.geometric_tables && self.write_geometric_table(page, sink) {
            return;
        }

        if write_text(page, sink) == 0 {
            write_placeholder(page, sink);
        }
    }

    /// Bare text lines grouped into rows; needs at least two lines to be
    /// worth a table.
    fn write_geometric_table(&self, page: &PageLayout, sink: &mut dyn DocumentSink) -> bool {
        let lines: Vec<_> = page
            .elements
            .iter()
            .filter_map(|element| match element {
                LayoutElement::TextLine(line) => Some(line),
                LayoutElement::Block(_) => None,
            })
            .collect();
        if lines.len() < 2 {
            return false;
        }

        let rows = line_grouper::group_into_rows(lines, self.options.y_threshold);
        sink.add_table(rows.len(), line_grouper::table_width(&rows), &mut |table| {
            line_grouper::fill_table(&rows, table)
        });
        true
    }
}

/// Rebuild pages with the shipped overrides and default options.
pub fn assemble(pages: &[PageLayout], diagnostics: &mut dyn Diagnostics) -> ReconstructedDocument {
    let registry = OverrideRegistry::builtin();
    Assembler::new(&registry, AssemblyOptions::default()).assemble(pages, diagnostics)
}

fn write_placeholder(page: &PageLayout, sink: &mut dyn DocumentSink) {
    sink.add_paragraph(&format!(
        "[No content could be extracted from {}]",
        page.page_id
    ));
}

fn write_html_table(
    page: &PageLayout,
    html: &str,
    sink: &mut dyn DocumentSink,
    diagnostics: &mut dyn Diagnostics,
) {
    match build_grid(html) {
        Ok(grid) => {
            report_grid_repairs(page, &grid, diagnostics);
            sink.add_table(grid.rows(), grid.cols(), &mut |table| grid.fill(table));
        }
        Err(TableParseError::NoTableFound) => {
            diagnostics.report(Diagnostic::NoTableFound {
                page_id: page.page_id.clone(),
            });
            sink.add_paragraph("[Warning: Could not find table structure in provided HTML]");
        }
        Err(TableParseError::DegenerateZeroColumns { rows }) => {
            diagnostics.report(Diagnostic::DegenerateTable {
                page_id: page.page_id.clone(),
                rows,
            });
            if rows == 0 {
                sink.add_paragraph("[Empty Table]");
            }
            for row in 1..=rows {
                sink.add_paragraph(&format!("Row {row}:"));
            }
        }
    }
}

fn report_grid_repairs(page: &PageLayout, grid: &TableGrid, diagnostics: &mut dyn Diagnostics) {
    for clip in grid.clipped() {
        diagnostics.report(Diagnostic::MergeOverflow {
            page_id: page.page_id.clone(),
            row: clip.row,
            col: clip.col,
            requested: clip.requested,
            placed: clip.placed,
        });
    }
    for cell in grid.dropped() {
        diagnostics.report(Diagnostic::DroppedCell {
            page_id: page.page_id.clone(),
            row: cell.row,
            text: cell.text.clone(),
        });
    }
}

/// Every element as text, in emission order. Returns the number of
/// paragraphs written.
fn write_text(page: &PageLayout, sink: &mut dyn DocumentSink) -> usize {
    let mut written = 0;
    for element in &page.elements {
        let text = match element {
            LayoutElement::Block(block) if block.kind == BlockKind::Text => {
                if block.text_lines.is_empty() {
                    continue;
                }
                block
                    .text_lines
                    .iter()
                    .map(|line| line.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            LayoutElement::TextLine(line) if !line.text.trim().is_empty() => line.text.clone(),
            _ => continue,
        };
        for paragraph in segment_paragraphs(&text) {
            sink.add_paragraph(&paragraph);
            written += 1;
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::BBox;
    use crate::core::model::{DocBlock, TextLine, TypedBlock};
    use pretty_assertions::assert_eq;

    fn line(text: &str, x: f32, y: f32) -> LayoutElement {
        LayoutElement::TextLine(TextLine::new(
            BBox::new(x, y, x + 30.0, y + 10.0).to_polygon(),
            text,
            0.9,
        ))
    }

    fn table(html: &str) -> LayoutElement {
        LayoutElement::Block(TypedBlock {
            kind: BlockKind::Table,
            text_lines: Vec::new(),
            table_html: Some(html.to_string()),
        })
    }

    fn single() -> AssemblyOptions {
        AssemblyOptions {
            mode: AssemblyMode::SingleImage,
            ..AssemblyOptions::default()
        }
    }

    fn rebuild(pages: &[PageLayout], options: AssemblyOptions) -> (ReconstructedDocument, Vec<Diagnostic>) {
        let registry = OverrideRegistry::builtin();
        let mut diagnostics = Vec::new();
        let document = Assembler::new(&registry, options).assemble(pages, &mut diagnostics);
        (document, diagnostics)
    }

    #[test]
    fn empty_page_yields_one_placeholder() {
        let (document, diagnostics) = rebuild(&[PageLayout::new("3.jpg", Vec::new())], single());
        assert_eq!(
            document.blocks,
            vec![DocBlock::Paragraph {
                text: "[No content could be extracted from 3.jpg]".to_string()
            }]
        );
        assert_eq!(
            diagnostics,
            vec![Diagnostic::EmptyPage {
                page_id: "3.jpg".to_string()
            }]
        );
    }

    #[test]
    fn unparsable_table_yields_one_diagnostic_paragraph() {
        let page = PageLayout::new("1.jpg", vec![table("<div>not a table</div>")]);
        let (document, _) = rebuild(&[page], single());
        assert_eq!(
            document.blocks,
            vec![DocBlock::Paragraph {
                text: "[Warning: Could not find table structure in provided HTML]".to_string()
            }]
        );
    }

    #[test]
    fn tables_are_emitted_inline_and_suppress_text() {
        let page = PageLayout::new(
            "2.jpg",
            vec![
                line("caption", 0.0, 0.0),
                table("<table><tr><td>a</td></tr></table>"),
                table("<table><tr><td>b</td><td>c</td></tr></table>"),
            ],
        );
        let (document, _) = rebuild(&[page], single());
        assert_eq!(document.paragraphs().count(), 0);
        let shapes: Vec<_> = document
            .tables()
            .map(|t| (t.row_count(), t.col_count()))
            .collect();
        assert_eq!(shapes, vec![(1, 1), (1, 2)]);
    }

    #[test]
    fn text_blocks_and_lines_become_segmented_paragraphs() {
        let block = LayoutElement::Block(TypedBlock {
            kind: BlockKind::Text,
            text_lines: vec![
                TextLine::new(BBox::new(0.0, 0.0, 1.0, 1.0).to_polygon(), "first", 0.9),
                TextLine::new(BBox::new(0.0, 2.0, 1.0, 3.0).to_polygon(), "  ", 0.9),
                TextLine::new(BBox::new(0.0, 4.0, 1.0, 5.0).to_polygon(), "second", 0.9),
            ],
            table_html: None,
        });
        let page = PageLayout::new(
            "4.jpg",
            vec![
                block,
                line("   ", 0.0, 10.0),
                line(" third ", 0.0, 20.0),
                LayoutElement::Block(TypedBlock {
                    kind: BlockKind::Figure,
                    text_lines: Vec::new(),
                    table_html: None,
                }),
            ],
        );
        let (document, _) = rebuild(&[page], single());
        let paragraphs: Vec<_> = document.paragraphs().collect();
        assert_eq!(paragraphs, vec!["first", "second", "third"]);
    }

    #[test]
    fn figure_only_page_still_yields_a_block() {
        let page = PageLayout::new(
            "5.jpg",
            vec![LayoutElement::Block(TypedBlock {
                kind: BlockKind::Figure,
                text_lines: Vec::new(),
                table_html: None,
            })],
        );
        let (document, _) = rebuild(&[page], single());
        assert_eq!(document.paragraphs().count(), 1);
    }

    #[test]
    fn page_breaks_sit_strictly_between_pages() {
        let pages: Vec<_> = ["1.jpg", "2.jpg", "3.jpg"]
            .iter()
            .map(|id| PageLayout::new(*id, vec![line("text", 0.0, 0.0)]))
            .collect();
        let (document, _) = rebuild(&pages, AssemblyOptions::default());
        assert_eq!(document.page_break_count(), 2);
        assert!(matches!(document.blocks.first(), Some(DocBlock::Heading { .. })));
        assert!(!matches!(document.blocks.last(), Some(DocBlock::PageBreak)));
        let headings = document
            .blocks
            .iter()
            .filter(|b| matches!(b, DocBlock::Heading { .. }))
            .count();
        assert_eq!(headings, 3);
    }

    #[test]
    fn single_image_mode_has_no_markers() {
        let pages = vec![
            PageLayout::new("1.jpg", vec![line("a", 0.0, 0.0)]),
            PageLayout::new("2.jpg", vec![line("b", 0.0, 0.0)]),
        ];
        let (document, _) = rebuild(&pages, single());
        assert_eq!(document.page_break_count(), 0);
        assert_eq!(document.blocks.len(), 2);
    }

    #[test]
    fn degenerate_table_lists_rows() {
        let page = PageLayout::new("7.jpg", vec![table("<table><tr></tr><tr></tr></table>")]);
        let (document, diagnostics) = rebuild(&[page], single());
        let paragraphs: Vec<_> = document.paragraphs().collect();
        assert_eq!(paragraphs, vec!["Row 1:", "Row 2:"]);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn clipped_merges_are_reported() {
        let page = PageLayout::new(
            "8.jpg",
            vec![table("<table><tr><td rowspan='3'>a</td><td>b</td></tr></table>")],
        );
        let (document, diagnostics) = rebuild(&[page], single());
        assert_eq!(document.tables().count(), 1);
        assert!(matches!(diagnostics.as_slice(), [Diagnostic::MergeOverflow { row: 0, col: 0, .. }]));
    }

    #[test]
    fn geometric_tables_group_bare_lines() {
        let page = PageLayout::new(
            "9.jpg",
            vec![
                line("b", 100.0, 0.0),
                line("a", 0.0, 2.0),
                line("c", 0.0, 50.0),
            ],
        );
        let options = AssemblyOptions {
            geometric_tables: true,
            ..single()
        };
        let (document, _) = rebuild(&[page], options);
        let table = document.tables().next().expect("geometric table");
        assert_eq!(
            table.rows(),
            &[
                vec!["a".to_string(), "b".to_string()],
                vec!["c".to_string(), String::new()],
            ]
        );
    }

    #[test]
    fn registered_override_bypasses_generic_path() {
        let page = PageLayout::new(
            "6.jpg",
            vec![line("15.", 0.0, 0.0), table("<table><tr><td>ignored</td></tr></table>")],
        );
        let (document, diagnostics) = rebuild(&[page], single());
        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::OverrideApplied { .. })));
        let table = document.tables().next().expect("override table");
        assert_eq!(table.col_count(), 5);
    }

    #[test]
    fn shipped_defaults_rebuild_pages_as_a_batch() {
        let pages = vec![
            PageLayout::new("1.jpg", vec![line("plain", 0.0, 0.0)]),
            PageLayout::new("6.jpg", vec![line("15.", 0.0, 0.0)]),
        ];
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let document = assemble(&pages, &mut diagnostics);

        assert_eq!(document.page_break_count(), 1);
        assert_eq!(
            document.blocks.first(),
            Some(&DocBlock::Heading { text: "Content from 1.jpg".to_string() })
        );
        assert_eq!(document.paragraphs().next(), Some("plain"));
        assert_eq!(document.tables().count(), 1);
        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::OverrideApplied { .. })));
    }
}
