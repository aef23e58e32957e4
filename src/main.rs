use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use pagerebuild::config::{load_config, AppConfig, DEFAULT_CONFIG_FILE};
use pagerebuild::core::model::LayoutElement;
use pagerebuild::export::ExportFormat;
use pagerebuild::ocr::bridge::OcrBridge;
use pagerebuild::ocr::layout_builder::OcrLayoutBuilder;
use pagerebuild::ocr::normalize_page;
use pagerebuild::pipeline::{
    build_document, collect_inputs, export_document, load_layouts, rebuild_pages, PipelineConfig,
    RunSummary,
};
use pagerebuild::rebuild::{AssemblyMode, AssemblyOptions, Diagnostic, OverrideRegistry, PageStrategy};
use pagerebuild::ReconstructedDocument;

#[derive(Parser, Debug)]
#[command(name = "pagerebuild")]
#[command(version, about = "Rebuild editable documents with merged-cell tables from OCR layout analysis", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug, Clone)]
struct OutputArgs {
    /// Output file; each format swaps in its own extension (default: from config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format(s) to generate
    #[arg(short, long, value_enum, default_values_t = vec![Format::Docx])]
    format: Vec<Format>,

    /// Lay out pages without an HTML table as tables of geometric rows
    #[arg(long)]
    geometric_tables: bool,

    /// Vertical center distance (pixels) under which lines share a row
    #[arg(long)]
    y_threshold: Option<f32>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rebuild a single image, without headings or page breaks
    Convert {
        /// Input image path
        input: PathBuf,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Rebuild several images into one document, one page each
    Batch {
        /// Input images, in order (default: scan the input directory)
        inputs: Vec<PathBuf>,

        /// Directory to scan when no inputs are given (default: from config)
        #[arg(short, long)]
        input_dir: Option<PathBuf>,

        /// Recognize pages in parallel
        #[arg(long)]
        parallel: bool,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Rebuild from saved layout JSON files, skipping OCR
    Rebuild {
        /// Layout files (`{"page_id": .., "elements": [..]}`)
        #[arg(required = true)]
        layouts: Vec<PathBuf>,

        /// Treat the layouts as one image: no headings or page breaks
        #[arg(long)]
        single: bool,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Show what the rebuild would see in a saved layout file
    Info {
        /// Layout JSON file
        layout: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Format {
    Docx,
    Json,
    Markdown,
    Text,
    Html,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Docx => ExportFormat::Docx,
            Format::Json => ExportFormat::Json,
            Format::Markdown => ExportFormat::Markdown,
            Format::Text => ExportFormat::Text,
            Format::Html => ExportFormat::Html,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let config = load_config(&cli.config);
    init_tracing(config.as_ref().ok().and_then(|c| c.log_file.as_deref()));

    if let Err(err) = config.and_then(|config| run(cli, config)) {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: AppConfig) -> Result<()> {
    if !cli.config.exists() {
        warn!(path = %cli.config.display(), "config file not found, using defaults");
    }

    match cli.command {
        Commands::Convert { input, out } => convert_single(input, out, &config),
        Commands::Batch {
            inputs,
            input_dir,
            parallel,
            out,
        } => convert_batch(inputs, input_dir, parallel, out, &config),
        Commands::Rebuild {
            layouts,
            single,
            out,
        } => rebuild_layouts(layouts, single, out, &config),
        Commands::Info { layout } => show_info(layout),
    }
}

fn init_tracing(log_file: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let (file_layer, open_error) = match log_file.map(File::create) {
        Some(Ok(file)) => (
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Arc::new(file)),
            ),
            None,
        ),
        Some(Err(err)) => (None, Some(err)),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr)
        .with(file_layer)
        .init();

    if let (Some(path), Some(err)) = (log_file, open_error) {
        warn!(path = %path.display(), "could not open log file, logging to stderr only: {err}");
    }
}

fn assembly_options(mode: AssemblyMode, out: &OutputArgs, config: &AppConfig) -> AssemblyOptions {
    AssemblyOptions {
        mode,
        y_threshold: out.y_threshold.unwrap_or(config.y_threshold),
        geometric_tables: out.geometric_tables || config.geometric_tables,
    }
}

fn ocr_track(config: &AppConfig) -> OcrLayoutBuilder {
    let bridge = OcrBridge::new(config.ocr.work_dir.clone())
        .with_script(config.ocr.script.clone())
        .with_lang(config.ocr.lang.clone())
        .with_python(config.ocr.python.clone());
    OcrLayoutBuilder::new(bridge)
}

fn convert_single(input: PathBuf, out: OutputArgs, config: &AppConfig) -> Result<()> {
    if !input.is_file() {
        anyhow::bail!("Input is not a file: {}", input.display());
    }

    println!("[*] Processing: {}", input.display());
    let pipeline = PipelineConfig {
        inputs: vec![input.clone()],
        options: assembly_options(AssemblyMode::SingleImage, &out, config),
        parallel: false,
    };
    let (document, summary) = build_document(&pipeline, &ocr_track(config), &OverrideRegistry::builtin())
        .with_context(|| format!("Failed to process image: {}", input.display()))?;

    finish(&document, summary, &out, config)
}

fn convert_batch(
    inputs: Vec<PathBuf>,
    input_dir: Option<PathBuf>,
    parallel: bool,
    out: OutputArgs,
    config: &AppConfig,
) -> Result<()> {
    let inputs = if inputs.is_empty() {
        let dir = input_dir.unwrap_or_else(|| config.input_directory.clone());
        println!("[*] Scanning: {}", dir.display());
        collect_inputs(&dir, &config.input_extensions)?
    } else {
        inputs
    };
    if inputs.is_empty() {
        anyhow::bail!("No input images found");
    }

    println!("[*] Batch processing {} image(s)", inputs.len());
    for (i, input) in inputs.iter().enumerate() {
        println!("  [{}/{}] {}", i + 1, inputs.len(), input.display());
    }

    let pipeline = PipelineConfig {
        inputs,
        options: assembly_options(AssemblyMode::Batch, &out, config),
        parallel: parallel || config.parallel,
    };
    let (document, summary) =
        build_document(&pipeline, &ocr_track(config), &OverrideRegistry::builtin())?;

    finish(&document, summary, &out, config)
}

fn rebuild_layouts(
    layouts: Vec<PathBuf>,
    single: bool,
    out: OutputArgs,
    config: &AppConfig,
) -> Result<()> {
    println!("[*] Rebuilding {} layout file(s)", layouts.len());
    let raw_pages = load_layouts(&layouts)?;

    let mode = if single {
        AssemblyMode::SingleImage
    } else {
        AssemblyMode::Batch
    };
    let (document, summary) = rebuild_pages(
        &raw_pages,
        &OverrideRegistry::builtin(),
        &assembly_options(mode, &out, config),
    );

    finish(&document, summary, &out, config)
}

fn finish(
    document: &ReconstructedDocument,
    summary: RunSummary,
    out: &OutputArgs,
    config: &AppConfig,
) -> Result<()> {
    let output = out
        .output
        .clone()
        .unwrap_or_else(|| config.output_filename.clone());
    let formats: Vec<ExportFormat> = out.format.iter().copied().map(ExportFormat::from).collect();

    println!("[+] Exporting results...");
    let written = export_document(document, &output, &formats, &config.docx_style())?;

    println!("\n[*] Summary: {summary}");
    for path in written {
        println!("[✓] Saved: {}", path.display());
    }
    Ok(())
}

fn show_info(layout: PathBuf) -> Result<()> {
    let raw_pages = load_layouts(std::slice::from_ref(&layout))?;
    let registry = OverrideRegistry::builtin();

    println!("Layout Information");
    println!("==================");
    println!("File: {}", layout.display());

    for raw in &raw_pages {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let page = normalize_page(raw, &mut diagnostics);

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for element in &page.elements {
            *counts.entry(element.kind()).or_default() += 1;
        }
        let html_tables = page
            .elements
            .iter()
            .filter(|element| {
                matches!(element, LayoutElement::Block(block) if block.table_html.as_deref().is_some_and(|html| !html.is_empty()))
            })
            .count();

        println!("Page: {}", page.page_id);
        println!("Elements: {}", page.elements.len());
        for (kind, count) in counts {
            println!("  {kind}: {count}");
        }
        println!("Tables with HTML: {html_tables}");
        match registry.strategy_for(&page.page_id) {
            PageStrategy::Override(entry) => println!("Strategy: override '{}'", entry.name),
            PageStrategy::Generic => println!("Strategy: generic"),
        }
        if !diagnostics.is_empty() {
            println!("Skipped elements: {}", diagnostics.len());
            for diagnostic in &diagnostics {
                println!("  {diagnostic}");
            }
        }
    }

    Ok(())
}
