use anyhow::Result;
use std::path::Path;

use crate::ocr::bridge::OcrBridge;
use crate::ocr::normalize::RawPage;
use crate::ocr::OcrTrack;

/// [`OcrTrack`] backed by the PaddleOCR subprocess bridge.
#[derive(Debug, Clone)]
pub struct OcrLayoutBuilder {
    bridge: OcrBridge,
}

impl OcrLayoutBuilder {
    pub fn new(bridge: OcrBridge) -> Self {
        Self { bridge }
    }
}

impl OcrTrack for OcrLayoutBuilder {
    fn analyze_page(&self, image: &Path, page_id: &str) -> Result<RawPage> {
        let elements = self.bridge.run(image)?;
        Ok(RawPage::new(page_id, elements))
    }
}
