//! HTML table fragment -> materialized grid with merge geometry resolved.
//!
//! Cells are placed left-to-right, top-to-bottom. A cell skips grid positions
//! already claimed by an earlier row's rowspan, and a span that would run off
//! the grid (or into an already claimed position) is clipped rather than
//! rejected: OCR table recognizers regularly emit spans that do not add up.

use scraper::{ElementRef, Html};
use thiserror::Error;

use crate::core::model::TableBlock;

/// Largest spans honoured, the limits HTML itself places on the attributes.
const MAX_COLSPAN: usize = 1000;
const MAX_ROWSPAN: usize = 65534;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableParseError {
    #[error("no <table> element found in table HTML")]
    NoTableFound,
    #[error("table has {rows} row(s) but no columns")]
    DegenerateZeroColumns { rows: usize },
}

/// One `<td>`/`<th>` as written in the markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTableCell {
    pub text: String,
    pub colspan: usize,
    pub rowspan: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridCell {
    Empty,
    /// Top-left cell of a merge region (or a plain 1x1 cell). Spans are the
    /// placed, possibly clipped, extent.
    Owner {
        text: String,
        row_span: usize,
        col_span: usize,
    },
    MergedInto {
        row: usize,
        col: usize,
    },
}

/// A span that did not fit where its cell was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClippedMerge {
    pub row: usize,
    pub col: usize,
    pub requested: (usize, usize),
    pub placed: (usize, usize),
}

/// A cell pushed past the last column by earlier rowspans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedCell {
    pub row: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableGrid {
    cells: Vec<Vec<GridCell>>,
    cols: usize,
    clipped: Vec<ClippedMerge>,
    dropped: Vec<DroppedCell>,
}

impl TableGrid {
    fn empty(rows: usize, cols: usize) -> Self {
        Self {
            cells: vec![vec![GridCell::Empty; cols]; rows],
            cols,
            clipped: Vec::new(),
            dropped: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&GridCell> {
        self.cells.get(row)?.get(col)
    }

    pub fn clipped(&self) -> &[ClippedMerge] {
        &self.clipped
    }

    pub fn dropped(&self) -> &[DroppedCell] {
        &self.dropped
    }

    fn is_free(&self, row: usize, col: usize) -> bool {
        matches!(self.cell(row, col), Some(GridCell::Empty))
    }

    fn place(&mut self, row: usize, col: usize, cell: &HtmlTableCell) {
        let col_span = (col..(col + cell.colspan).min(self.cols))
            .take_while(|&c| self.is_free(row, c))
            .count();
        let row_span = (row..(row + cell.rowspan).min(self.rows()))
            .take_while(|&r| (col..col + col_span).all(|c| self.is_free(r, c)))
            .count();

        if (row_span, col_span) != (cell.rowspan, cell.colspan) {
            self.clipped.push(ClippedMerge {
                row,
                col,
                requested: (cell.rowspan, cell.colspan),
                placed: (row_span, col_span),
            });
        }

        for r in row..row + row_span {
            for c in col..col + col_span {
                self.cells[r][c] = GridCell::MergedInto { row, col };
            }
        }
        self.cells[row][col] = GridCell::Owner {
            text: cell.text.clone(),
            row_span,
            col_span,
        };
    }

    /// Replay the grid into a table handle: owner texts plus one merge per
    /// non-1x1 region.
    pub fn fill(&self, table: &mut TableBlock) {
        for (r, row) in self.cells.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if let GridCell::Owner {
                    text,
                    row_span,
                    col_span,
                } = cell
                {
                    table.set_cell(r, c, text.as_str());
                    if *row_span > 1 || *col_span > 1 {
                        table.merge(r, c, r + row_span - 1, c + col_span - 1);
                    }
                }
            }
        }
    }

    pub fn to_table_block(&self) -> TableBlock {
        let mut table = TableBlock::new(self.rows(), self.cols);
        self.fill(&mut table);
        table
    }
}

pub fn build_grid(html: &str) -> Result<TableGrid, TableParseError> {
    let fragment = Html::parse_fragment(html);
    let table = fragment
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "table")
        .ok_or(TableParseError::NoTableFound)?;

    let rows: Vec<Vec<HtmlTableCell>> = direct_rows(table)
        .into_iter()
        .map(row_cells)
        .collect();

    let max_cols = rows
        .iter()
        .map(|row| row.iter().map(|cell| cell.colspan).sum::<usize>())
        .max()
        .unwrap_or(0);
    if max_cols == 0 {
        return Err(TableParseError::DegenerateZeroColumns { rows: rows.len() });
    }

    let mut grid = TableGrid::empty(rows.len(), max_cols);
    for (r, row) in rows.iter().enumerate() {
        let mut col = 0;
        for cell in row {
            while col < max_cols && !grid.is_free(r, col) {
                col += 1;
            }
            if col >= max_cols {
                grid.dropped.push(DroppedCell {
                    row: r,
                    text: cell.text.clone(),
                });
                continue;
            }
            grid.place(r, col, cell);
            col += cell.colspan;
        }
    }

    Ok(grid)
}

/// `<tr>` children of the table, directly or through `thead`/`tbody`/`tfoot`.
/// Rows of nested tables are not included.
fn direct_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|inner| inner.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

fn row_cells(row: ElementRef<'_>) -> Vec<HtmlTableCell> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .map(|cell| HtmlTableCell {
            text: cell_text(cell),
            colspan: span_attr(cell, "colspan", MAX_COLSPAN),
            rowspan: span_attr(cell, "rowspan", MAX_ROWSPAN),
        })
        .collect()
}

/// Text nodes trimmed, blanks dropped, joined by newlines.
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Missing, non-numeric and zero spans count as 1.
fn span_attr(cell: ElementRef<'_>, name: &str, max: usize) -> usize {
    cell.value()
        .attr(name)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|&span| span >= 1)
        .map_or(1, |span| span.min(max))
}
