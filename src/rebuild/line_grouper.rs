use crate::core::model::{TableBlock, TextLine};

/// Vertical distance, in image pixels, under which two line centers share a row.
pub const DEFAULT_Y_THRESHOLD: f32 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub text: String,
    pub x_center: f32,
}

struct Bucket {
    anchor_y: f32,
    items: Vec<PlacedText>,
}

/// Cluster lines into rows by vertical center, then order each row left to
/// right.
///
/// A line joins the first bucket whose *first* member's vertical center is
/// within `y_threshold`; the bucket's reference never moves as it grows. Rows
/// come out top to bottom.
pub fn group_into_rows<'a, I>(lines: I, y_threshold: f32) -> Vec<Vec<PlacedText>>
where
    I: IntoIterator<Item = &'a TextLine>,
{
    let mut buckets: Vec<Bucket> = Vec::new();

    for line in lines {
        let center = line.polygon.center();
        let placed = PlacedText {
            text: line.text.clone(),
            x_center: center.x,
        };
        match buckets
            .iter_mut()
            .find(|bucket| (center.y - bucket.anchor_y).abs() < y_threshold)
        {
            Some(bucket) => bucket.items.push(placed),
            None => buckets.push(Bucket {
                anchor_y: center.y,
                items: vec![placed],
            }),
        }
    }

    buckets.sort_by(|a, b| a.anchor_y.total_cmp(&b.anchor_y));
    buckets
        .into_iter()
        .map(|mut bucket| {
            bucket.items.sort_by(|a, b| a.x_center.total_cmp(&b.x_center));
            bucket.items
        })
        .collect()
}

/// Lay grouped rows into a merge-free table as wide as the longest row.
/// Shorter rows leave their trailing cells empty.
pub fn fill_table(rows: &[Vec<PlacedText>], table: &mut TableBlock) {
    for (r, row) in rows.iter().enumerate() {
        for (c, item) in row.iter().enumerate() {
            table.set_cell(r, c, item.text.as_str());
        }
    }
}

pub fn table_width(rows: &[Vec<PlacedText>]) -> usize {
    rows.iter().map(Vec::len).max().unwrap_or(0)
}
