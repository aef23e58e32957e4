use serde::{Deserialize, Serialize};

use crate::core::geometry::Polygon;

fn default_confidence() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextLine {
    pub polygon: Polygon,
    pub text: String,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

impl TextLine {
    pub fn new(polygon: Polygon, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            polygon,
            text: text.into(),
            confidence,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Text,
    Table,
    Figure,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypedBlock {
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_lines: Vec<TextLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_html: Option<String>,
}

/// One detector output on a page. Order within a page is the detector's
/// emission order, which is not necessarily reading order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "element", rename_all = "snake_case")]
pub enum LayoutElement {
    TextLine(TextLine),
    Block(TypedBlock),
}

impl LayoutElement {
    /// Text lines carried by the element: the line itself, or the lines of a
    /// text block. Tables and figures carry none.
    pub fn text_lines(&self) -> &[TextLine] {
        match self {
            LayoutElement::TextLine(line) => std::slice::from_ref(line),
            LayoutElement::Block(block) if block.kind == BlockKind::Text => &block.text_lines,
            LayoutElement::Block(_) => &[],
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LayoutElement::TextLine(_) => "line",
            LayoutElement::Block(block) => match block.kind {
                BlockKind::Text => "text",
                BlockKind::Table => "table",
                BlockKind::Figure => "figure",
            },
        }
    }
}

/// Normalized layout of one input page, keyed by the input's identity
/// (its file name).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageLayout {
    pub page_id: String,
    pub elements: Vec<LayoutElement>,
}

impl PageLayout {
    pub fn new(page_id: impl Into<String>, elements: Vec<LayoutElement>) -> Self {
        Self {
            page_id: page_id.into(),
            elements,
        }
    }
}

/// Inclusive cell rectangle of a merged table region.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MergeRegion {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl MergeRegion {
    pub fn row_span(&self) -> usize {
        self.bottom - self.top + 1
    }

    pub fn col_span(&self) -> usize {
        self.right - self.left + 1
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.top..=self.bottom).contains(&row) && (self.left..=self.right).contains(&col)
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.top <= other.bottom
            && other.top <= self.bottom
            && self.left <= other.right
            && other.left <= self.right
    }
}

/// A rows x cols table under construction. This is the handle `add_table`
/// passes to its fill closure: writes outside the table are ignored and
/// merges are clipped to its bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableBlock {
    rows: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    merges: Vec<MergeRegion>,
}

impl TableBlock {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows: vec![vec![String::new(); cols]; rows],
            merges: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn merges(&self) -> &[MergeRegion] {
        &self.merges
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    pub fn set_cell(&mut self, row: usize, col: usize, text: impl Into<String>) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|cells| cells.get_mut(col)) {
            *cell = text.into();
        }
    }

    /// Merge the rectangle spanned by two corner cells. Corners may be given
    /// in any order. A region overlapping an earlier merge is ignored.
    pub fn merge(&mut self, r1: usize, c1: usize, r2: usize, c2: usize) {
        let (rows, cols) = (self.row_count(), self.col_count());
        let top = r1.min(r2);
        let left = c1.min(c2);
        if top >= rows || left >= cols {
            return;
        }

        let region = MergeRegion {
            top,
            left,
            bottom: r1.max(r2).min(rows - 1),
            right: c1.max(c2).min(cols - 1),
        };
        if region.row_span() == 1 && region.col_span() == 1 {
            return;
        }
        if self.merges.iter().any(|existing| existing.overlaps(&region)) {
            return;
        }
        self.merges.push(region);
    }

    /// The merge region covering a cell, if any.
    pub fn merge_at(&self, row: usize, col: usize) -> Option<&MergeRegion> {
        self.merges.iter().find(|region| region.contains(row, col))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocBlock {
    Heading { text: String },
    Paragraph { text: String },
    Table(TableBlock),
    PageBreak,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReconstructedDocument {
    pub blocks: Vec<DocBlock>,
}

impl ReconstructedDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|block| match block {
            DocBlock::Paragraph { text } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableBlock> {
        self.blocks.iter().filter_map(|block| match block {
            DocBlock::Table(table) => Some(table),
            _ => None,
        })
    }

    pub fn page_break_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|block| matches!(block, DocBlock::PageBreak))
            .count()
    }
}
