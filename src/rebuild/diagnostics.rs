use std::fmt;

use tracing::{info, warn};

/// Recoverable events raised while rebuilding a page. None of them stop
/// processing; they are handed to a [`Diagnostics`] observer supplied by the
/// caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    EmptyPage {
        page_id: String,
    },
    UnexpectedElementShape {
        page_id: String,
        index: usize,
        detail: String,
    },
    OverrideApplied {
        page_id: String,
        name: &'static str,
    },
    MissingAnchor {
        page_id: String,
        label: &'static str,
    },
    NoTableFound {
        page_id: String,
    },
    DegenerateTable {
        page_id: String,
        rows: usize,
    },
    MergeOverflow {
        page_id: String,
        row: usize,
        col: usize,
        requested: (usize, usize),
        placed: (usize, usize),
    },
    DroppedCell {
        page_id: String,
        row: usize,
        text: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::EmptyPage { page_id } => {
                write!(f, "{page_id}: no content elements extracted")
            }
            Diagnostic::UnexpectedElementShape {
                page_id,
                index,
                detail,
            } => write!(f, "{page_id}: skipped element #{index}: {detail}"),
            Diagnostic::OverrideApplied { page_id, name } => {
                write!(f, "{page_id}: rebuilt by override '{name}'")
            }
            Diagnostic::MissingAnchor { page_id, label } => {
                write!(f, "{page_id}: row label '{label}' not found")
            }
            Diagnostic::NoTableFound { page_id } => {
                write!(f, "{page_id}: table HTML has no <table> element")
            }
            Diagnostic::DegenerateTable { page_id, rows } => {
                write!(f, "{page_id}: table has {rows} row(s) but no columns")
            }
            Diagnostic::MergeOverflow {
                page_id,
                row,
                col,
                requested,
                placed,
            } => write!(
                f,
                "{page_id}: merge at ({row},{col}) clipped from {}x{} to {}x{}",
                requested.0, requested.1, placed.0, placed.1
            ),
            Diagnostic::DroppedCell { page_id, row, text } => {
                write!(f, "{page_id}: row {row} overflows the table, dropped cell '{text}'")
            }
        }
    }
}

pub trait Diagnostics {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Collects diagnostics in order, mostly for tests.
impl Diagnostics for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Forwards diagnostics to `tracing` and counts them for the run summary.
#[derive(Debug, Default)]
pub struct TracingDiagnostics {
    reported: usize,
}

impl TracingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reported(&self) -> usize {
        self.reported
    }
}

impl Diagnostics for TracingDiagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.reported += 1;
        match &diagnostic {
            Diagnostic::OverrideApplied { .. } => info!("{diagnostic}"),
            _ => warn!("{diagnostic}"),
        }
    }
}
