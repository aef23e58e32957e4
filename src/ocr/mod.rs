pub mod bridge;
pub mod layout_builder;
pub mod normalize;

use anyhow::Result;
use std::path::Path;

pub use normalize::{normalize_page, RawPage};

/// Layout analysis of one input image. Implementations must be shareable
/// across threads so pages can be recognized in parallel.
pub trait OcrTrack: Sync {
    fn analyze_page(&self, image: &Path, page_id: &str) -> Result<RawPage>;
}
