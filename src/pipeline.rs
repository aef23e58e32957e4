use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{error, info};

use crate::core::model::{DocBlock, ReconstructedDocument};
use crate::core::natural_sort::sort_paths_naturally;
use crate::export::{DocxStyle, ExportFormat};
use crate::ocr::{normalize_page, OcrTrack, RawPage};
use crate::rebuild::{Assembler, AssemblyMode, AssemblyOptions, OverrideRegistry, TracingDiagnostics};

const PLACEHOLDER_PREFIX: &str = "[No content could be extracted from ";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub inputs: Vec<PathBuf>,
    pub options: AssemblyOptions,
    /// Recognize pages on the rayon pool. Output order is unaffected.
    pub parallel: bool,
}

impl PipelineConfig {
    pub fn new(inputs: Vec<PathBuf>, mode: AssemblyMode) -> Self {
        Self {
            inputs,
            options: AssemblyOptions {
                mode,
                ..AssemblyOptions::default()
            },
            parallel: false,
        }
    }
}

/// Counts logged at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pages: usize,
    pub tables: usize,
    pub placeholders: usize,
    pub diagnostics: usize,
}

impl RunSummary {
    fn from_document(pages: usize, document: &ReconstructedDocument, diagnostics: usize) -> Self {
        let placeholders = document
            .blocks
            .iter()
            .filter(|block| {
                matches!(block, DocBlock::Paragraph { text } if text.starts_with(PLACEHOLDER_PREFIX))
            })
            .count();
        Self {
            pages,
            tables: document.tables().count(),
            placeholders,
            diagnostics,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} page(s), {} table(s), {} placeholder(s), {} diagnostic(s)",
            self.pages, self.tables, self.placeholders, self.diagnostics
        )
    }
}

/// Image files directly inside `dir` whose extension is in `extensions`
/// (case-insensitive), in natural file-name order.
pub fn collect_inputs(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory: {}", dir.display()))?;

    let mut inputs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)));
        if matches && path.is_file() {
            inputs.push(path);
        }
    }
    sort_paths_naturally(&mut inputs);
    Ok(inputs)
}

/// Page identity: the input's file name.
pub fn page_id_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Run layout analysis on every input. A page whose recognition fails is
/// logged and comes back with no elements.
pub fn detect_pages(track: &dyn OcrTrack, inputs: &[PathBuf], parallel: bool) -> Vec<RawPage> {
    let analyze = |path: &PathBuf| {
        let page_id = page_id_for(path);
        info!(page = %page_id, "analyzing layout");
        track.analyze_page(path, &page_id).unwrap_or_else(|err| {
            error!(page = %page_id, "layout analysis failed: {err:#}");
            RawPage::new(page_id, Vec::new())
        })
    };

    if parallel {
        inputs.par_iter().map(analyze).collect()
    } else {
        inputs.iter().map(analyze).collect()
    }
}

/// Saved recognizer output, one JSON `RawPage` per file.
pub fn load_layouts(paths: &[PathBuf]) -> Result<Vec<RawPage>> {
    paths
        .iter()
        .map(|path| {
            let data = fs::read_to_string(path)
                .with_context(|| format!("Failed to read layout file: {}", path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("Failed to parse layout file: {}", path.display()))
        })
        .collect()
}

pub fn rebuild_pages(
    raw_pages: &[RawPage],
    registry: &OverrideRegistry,
    options: &AssemblyOptions,
) -> (ReconstructedDocument, RunSummary) {
    let mut diagnostics = TracingDiagnostics::new();
    let pages: Vec<_> = raw_pages
        .iter()
        .map(|raw| normalize_page(raw, &mut diagnostics))
        .collect();

    let document = Assembler::new(registry, options.clone()).assemble(&pages, &mut diagnostics);
    let summary = RunSummary::from_document(pages.len(), &document, diagnostics.reported());
    info!("rebuilt {summary}");
    (document, summary)
}

pub fn build_document(
    config: &PipelineConfig,
    track: &dyn OcrTrack,
    registry: &OverrideRegistry,
) -> Result<(ReconstructedDocument, RunSummary)> {
    if config.inputs.is_empty() {
        anyhow::bail!("No input images to process");
    }
    let raw_pages = detect_pages(track, &config.inputs, config.parallel);
    Ok(rebuild_pages(&raw_pages, registry, &config.options))
}

/// Write one file per format next to `output`, returning the written paths.
pub fn export_document(
    document: &ReconstructedDocument,
    output: &Path,
    formats: &[ExportFormat],
    style: &DocxStyle,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(formats.len());
    for &format in formats {
        let path = format.output_path(output);
        format
            .exporter(path.clone(), style)
            .export(document)
            .with_context(|| format!("Failed to export to: {}", path.display()))?;
        info!(path = %path.display(), "document saved");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct FixedTrack;

    impl OcrTrack for FixedTrack {
        fn analyze_page(&self, _image: &Path, page_id: &str) -> Result<RawPage> {
            if page_id.starts_with("broken") {
                anyhow::bail!("recognizer crashed");
            }
            Ok(RawPage::new(
                page_id,
                vec![json!([[[0, 0], [10, 0], [10, 5], [0, 5]], [page_id, 0.9]])],
            ))
        }
    }

    #[test]
    fn collect_inputs_filters_and_sorts_naturally() -> Result<()> {
        let dir = tempfile::tempdir()?;
        for name in ["10.jpg", "2.JPG", "1.jpg", "notes.txt"] {
            fs::write(dir.path().join(name), b"")?;
        }
        fs::create_dir(dir.path().join("3.jpg"))?;

        let inputs = collect_inputs(dir.path(), &["jpg".to_string()])?;
        let names: Vec<_> = inputs.iter().map(|p| page_id_for(p)).collect();
        assert_eq!(names, vec!["1.jpg", "2.JPG", "10.jpg"]);
        Ok(())
    }

    #[test]
    fn collect_inputs_reports_missing_directory() {
        let err = collect_inputs(Path::new("no/such/dir"), &["jpg".to_string()]).unwrap_err();
        assert!(err.to_string().contains("no/such/dir"));
    }

    #[test]
    fn detect_pages_keeps_order_and_tolerates_failures() {
        let inputs: Vec<PathBuf> = ["a.jpg", "broken.jpg", "c.jpg"]
            .iter()
            .map(PathBuf::from)
            .collect();
        for parallel in [false, true] {
            let pages = detect_pages(&FixedTrack, &inputs, parallel);
            let ids: Vec<_> = pages.iter().map(|p| p.page_id.as_str()).collect();
            assert_eq!(ids, vec!["a.jpg", "broken.jpg", "c.jpg"]);
            assert!(pages[1].elements.is_empty());
        }
    }

    #[test]
    fn build_document_counts_placeholders() -> Result<()> {
        let config = PipelineConfig::new(
            vec![PathBuf::from("a.jpg"), PathBuf::from("broken.jpg")],
            AssemblyMode::Batch,
        );
        let (document, summary) = build_document(&config, &FixedTrack, &OverrideRegistry::builtin())?;
        assert_eq!(
            summary,
            RunSummary {
                pages: 2,
                tables: 0,
                placeholders: 1,
                diagnostics: 1,
            }
        );
        assert_eq!(document.page_break_count(), 1);
        Ok(())
    }

    #[test]
    fn build_document_needs_inputs() {
        let config = PipelineConfig::new(Vec::new(), AssemblyMode::SingleImage);
        assert!(build_document(&config, &FixedTrack, &OverrideRegistry::empty()).is_err());
    }

    #[test]
    fn export_document_writes_every_format() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = PipelineConfig::new(vec![PathBuf::from("a.jpg")], AssemblyMode::SingleImage);
        let (document, _) = build_document(&config, &FixedTrack, &OverrideRegistry::builtin())?;

        let written = export_document(
            &document,
            &dir.path().join("out/extracted_text.docx"),
            &[ExportFormat::Docx, ExportFormat::Json, ExportFormat::Markdown],
            &DocxStyle::default(),
        )?;

        assert_eq!(written.len(), 3);
        for path in &written {
            assert!(path.exists(), "{} missing", path.display());
        }
        assert!(fs::read_to_string(dir.path().join("out/extracted_text.md"))?.contains("a.jpg"));
        Ok(())
    }
}
