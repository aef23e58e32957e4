//! `pagerebuild.toml` loading. Every key is optional.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::export::DocxStyle;
use crate::rebuild::line_grouper::DEFAULT_Y_THRESHOLD;

pub const DEFAULT_CONFIG_FILE: &str = "pagerebuild.toml";

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub input_directory: PathBuf,
    /// Lowercase extensions, without the dot, picked up by directory scans.
    pub input_extensions: Vec<String>,
    pub output_filename: PathBuf,
    pub log_file: Option<PathBuf>,
    pub font_name: String,
    pub font_size: f32,
    pub y_threshold: f32,
    pub geometric_tables: bool,
    pub parallel: bool,
    pub ocr: OcrConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_directory: PathBuf::from("his_pic"),
            input_extensions: vec!["jpg".to_string()],
            output_filename: PathBuf::from("extracted_text.docx"),
            log_file: None,
            font_name: "SimSun".to_string(),
            font_size: 11.0,
            y_threshold: DEFAULT_Y_THRESHOLD,
            geometric_tables: false,
            parallel: false,
            ocr: OcrConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct OcrConfig {
    pub script: PathBuf,
    pub python: String,
    pub lang: String,
    pub work_dir: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            script: PathBuf::from("ocr/paddle_bridge.py"),
            python: "python3".to_string(),
            lang: "ch".to_string(),
            work_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    pub fn docx_style(&self) -> DocxStyle {
        DocxStyle {
            font_name: self.font_name.clone(),
            font_size: self.font_size,
        }
    }
}

/// Read the config at `path`. A missing file falls back to defaults.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file as TOML: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_gives_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = load_config(&dir.path().join(DEFAULT_CONFIG_FILE))?;
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.output_filename, PathBuf::from("extracted_text.docx"));
        Ok(())
    }

    #[test]
    fn partial_file_keeps_other_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(
            &path,
            "input_directory = \"scans\"\nfont_size = 12\ngeometric_tables = true\n\n[ocr]\nlang = \"en\"\n",
        )?;

        let config = load_config(&path)?;
        assert_eq!(config.input_directory, PathBuf::from("scans"));
        assert_eq!(config.font_size, 12.0);
        assert!(config.geometric_tables);
        assert_eq!(config.ocr.lang, "en");
        assert_eq!(config.ocr.python, "python3");
        assert_eq!(config.font_name, "SimSun");
        Ok(())
    }

    #[test]
    fn malformed_file_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "font_size = \"large\"")?;
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
        Ok(())
    }
}
