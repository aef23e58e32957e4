use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Runs the PaddleOCR layout script as a subprocess and reads its JSON from
/// stdout: an array of raw elements, or `null` when nothing was detected.
#[derive(Debug, Clone)]
pub struct OcrBridge {
    work_dir: PathBuf,
    python: String,
    script_path: PathBuf,
    lang: String,
}

impl OcrBridge {
    pub fn new(work_dir: PathBuf) -> Self {
        Self {
            work_dir,
            python: "python3".to_string(),
            script_path: PathBuf::from("ocr/paddle_bridge.py"),
            lang: "ch".to_string(),
        }
    }

    pub fn with_script(mut self, script_path: PathBuf) -> Self {
        self.script_path = script_path;
        self
    }

    pub fn with_lang(mut self, lang: String) -> Self {
        self.lang = lang;
        self
    }

    pub fn with_python(mut self, python: String) -> Self {
        self.python = python;
        self
    }

    pub fn run(&self, image_path: &Path) -> Result<Vec<Value>> {
        fs::create_dir_all(&self.work_dir)?;
        debug!(image = %image_path.display(), script = %self.script_path.display(), "running OCR bridge");
        let output = Command::new(&self.python)
            .arg(&self.script_path)
            .arg("--image")
            .arg(image_path)
            .arg("--lang")
            .arg(&self.lang)
            .output()
            .with_context(|| format!("failed to invoke {} for the OCR bridge", self.python))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("OCR bridge failed: {stderr}");
        }

        parse_response(&String::from_utf8_lossy(&output.stdout))
    }
}

fn parse_response(stdout: &str) -> Result<Vec<Value>> {
    let response: Value =
        serde_json::from_str(stdout.trim()).with_context(|| "failed to parse OCR JSON response")?;
    match response {
        Value::Null => Ok(Vec::new()),
        Value::Array(elements) => Ok(elements),
        other => anyhow::bail!("OCR bridge returned a JSON {} instead of an array", json_kind(&other)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_response_means_no_elements() -> Result<()> {
        assert!(parse_response("null\n")?.is_empty());
        assert_eq!(parse_response(r#"[{"type": "figure"}]"#)?.len(), 1);
        Ok(())
    }

    #[test]
    fn non_array_response_is_an_error() {
        let err = parse_response(r#"{"type": "text"}"#).unwrap_err();
        assert!(err.to_string().contains("object"));
        assert!(parse_response("not json").is_err());
    }

    #[test]
    fn missing_interpreter_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bridge = OcrBridge::new(dir.path().to_path_buf())
            .with_python("definitely-not-a-python-binary".to_string());
        let err = bridge.run(Path::new("1.jpg")).unwrap_err();
        assert!(err.to_string().contains("definitely-not-a-python-binary"));
    }

    #[cfg(unix)]
    #[test]
    fn relative_image_paths_resolve_against_the_caller() -> Result<()> {
        let scratch = tempfile::tempdir()?;
        let script = scratch.path().join("bridge.sh");
        fs::write(
            &script,
            "[ -f \"$2\" ] && echo null || { echo \"missing $2\" >&2; exit 1; }\n",
        )?;
        let work_dir = tempfile::tempdir()?;

        let bridge = OcrBridge::new(work_dir.path().to_path_buf())
            .with_python("sh".to_string())
            .with_script(script);
        // Test binaries run from the package root.
        assert!(bridge.run(Path::new("Cargo.toml"))?.is_empty());
        Ok(())
    }
}
