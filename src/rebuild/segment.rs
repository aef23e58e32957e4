/// Split recognized text into paragraphs: one per non-blank line, trimmed.
/// Text with no non-blank line comes back whole so nothing is silently lost.
pub fn segment_paragraphs(text: &str) -> Vec<String> {
    let paragraphs: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if paragraphs.is_empty() {
        vec![text.to_string()]
    } else {
        paragraphs
    }
}
