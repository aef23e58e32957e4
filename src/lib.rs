pub mod config;
pub mod core;
pub mod export;
pub mod ocr;
pub mod pipeline;
pub mod rebuild;

pub use core::model::{DocBlock, LayoutElement, PageLayout, ReconstructedDocument, TableBlock};
pub use export::{DocumentSink, ExportFormat, Exporter};
pub use rebuild::{assemble, Assembler, AssemblyMode, AssemblyOptions, Diagnostic, Diagnostics};
