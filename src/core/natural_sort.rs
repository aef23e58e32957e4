use std::cmp::Ordering;
use std::path::{Path, PathBuf};

#[derive(Debug, PartialEq, Eq)]
enum Chunk {
    Number(String),
    Text(String),
}

/// Split into alternating digit and non-digit runs. Text runs are lowercased;
/// digit runs keep their leading zeros stripped so they compare by value
/// without overflowing on long runs.
fn chunks(name: &str) -> Vec<Chunk> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_digits = false;

    for ch in name.chars() {
        let is_digit = ch.is_ascii_digit();
        if !current.is_empty() && is_digit != in_digits {
            out.push(finish_chunk(&mut current, in_digits));
        }
        in_digits = is_digit;
        current.push(ch);
    }
    if !current.is_empty() {
        out.push(finish_chunk(&mut current, in_digits));
    }
    out
}

fn finish_chunk(current: &mut String, digits: bool) -> Chunk {
    let run = std::mem::take(current);
    if digits {
        let trimmed = run.trim_start_matches('0');
        Chunk::Number(if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() })
    } else {
        Chunk::Text(run.to_lowercase())
    }
}

fn compare_chunks(a: &Chunk, b: &Chunk) -> Ordering {
    match (a, b) {
        (Chunk::Number(x), Chunk::Number(y)) => x.len().cmp(&y.len()).then_with(|| x.cmp(y)),
        (Chunk::Text(x), Chunk::Text(y)) => x.cmp(y),
        // Digits sort before letters, as they do in ASCII.
        (Chunk::Number(_), Chunk::Text(_)) => Ordering::Less,
        (Chunk::Text(_), Chunk::Number(_)) => Ordering::Greater,
    }
}

/// Compare names with embedded numbers by value: `2.jpg` < `10.jpg`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = chunks(a);
    let right = chunks(b);
    for (x, y) in left.iter().zip(right.iter()) {
        let ordering = compare_chunks(x, y);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}

pub fn sort_paths_naturally(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
