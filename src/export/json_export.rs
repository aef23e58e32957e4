use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use crate::core::model::ReconstructedDocument;
use crate::export::{ensure_parent, Exporter};

#[derive(Debug, Clone)]
pub struct JsonExporter {
    path: PathBuf,
}

impl JsonExporter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Exporter for JsonExporter {
    fn export(&self, document: &ReconstructedDocument) -> Result<()> {
        ensure_parent(&self.path)?;
        let data = serde_json::to_string_pretty(document)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
