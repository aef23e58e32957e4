//! PaddleOCR output -> [`PageLayout`].
//!
//! The recognizer speaks several dialects depending on mode and version:
//!
//! * a bare line, `[polygon, [text, confidence]]`
//! * a layout region, `{"type": "text" | "table" | "figure", "bbox": [x0, y0, x1, y1], "res": ..}`
//!   where a text `res` is a list of lines (bare lines, `[text, confidence]`
//!   pairs, `{"text", "confidence", "text_region"}` dicts or plain strings) or
//!   a single `[text, confidence]`,
//!   and a table `res` is `{"html": ..}`
//! * the crate's own tagged form, `{"element": "text_line" | "block", ..}`
//!
//! Anything else is skipped and reported.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use crate::core::geometry::{BBox, Point, Polygon};
use crate::core::model::{BlockKind, LayoutElement, PageLayout, TextLine, TypedBlock};
use crate::rebuild::diagnostics::{Diagnostic, Diagnostics};

/// Recognizer output for one input, before normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawPage {
    pub page_id: String,
    #[serde(default)]
    pub elements: Vec<Value>,
}

impl RawPage {
    pub fn new(page_id: impl Into<String>, elements: Vec<Value>) -> Self {
        Self {
            page_id: page_id.into(),
            elements,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
enum ShapeError {
    #[error("expected a line pair, a layout region or a tagged element, got {0}")]
    Unrecognized(&'static str),
    #[error("unsupported layout region type '{0}'")]
    UnknownRegion(String),
    #[error("polygon is not a list of at least 3 numeric points")]
    BadPolygon,
    #[error("line text is not a [text, confidence] pair")]
    BadLineText,
    #[error("text region entry #{0} is not a recognizable line")]
    BadTextEntry(usize),
    #[error("tagged element does not deserialize: {0}")]
    Tagged(String),
}

pub fn normalize_page(raw: &RawPage, diagnostics: &mut dyn Diagnostics) -> PageLayout {
    let mut elements = Vec::with_capacity(raw.elements.len());
    for (index, value) in raw.elements.iter().enumerate() {
        let mut skipped = Vec::new();
        match normalize_element(value, &mut skipped) {
            Ok(element) => elements.push(element),
            Err(err) => skipped.push(err),
        }
        for err in skipped {
            diagnostics.report(Diagnostic::UnexpectedElementShape {
                page_id: raw.page_id.clone(),
                index,
                detail: err.to_string(),
            });
        }
    }
    PageLayout::new(raw.page_id.clone(), elements)
}

/// `skipped` collects entries dropped from inside an otherwise usable element.
fn normalize_element(
    value: &Value,
    skipped: &mut Vec<ShapeError>,
) -> Result<LayoutElement, ShapeError> {
    match value {
        Value::Array(items) => bare_line(items).map(LayoutElement::TextLine),
        Value::Object(map) if map.contains_key("element") => {
            let mut element: LayoutElement = serde_json::from_value(value.clone())
                .map_err(|err| ShapeError::Tagged(err.to_string()))?;
            match &mut element {
                LayoutElement::TextLine(line) => line.text = nfc(&line.text),
                LayoutElement::Block(block) => {
                    for line in &mut block.text_lines {
                        line.text = nfc(&line.text);
                    }
                }
            }
            Ok(element)
        }
        Value::Object(map) => {
            let kind = map
                .get("type")
                .and_then(Value::as_str)
                .map(str::to_lowercase)
                .ok_or(ShapeError::Unrecognized("an object without 'type'"))?;
            let region = map.get("bbox").and_then(parse_bbox);
            let res = map.get("res").unwrap_or(&Value::Null);
            let block = match kind.as_str() {
                "text" => TypedBlock {
                    kind: BlockKind::Text,
                    text_lines: text_region_lines(res, region, skipped),
                    table_html: None,
                },
                "table" => TypedBlock {
                    kind: BlockKind::Table,
                    text_lines: Vec::new(),
                    table_html: res.get("html").and_then(Value::as_str).map(str::to_string),
                },
                "figure" => TypedBlock {
                    kind: BlockKind::Figure,
                    text_lines: Vec::new(),
                    table_html: None,
                },
                _ => return Err(ShapeError::UnknownRegion(kind)),
            };
            Ok(LayoutElement::Block(block))
        }
        Value::Null => Err(ShapeError::Unrecognized("null")),
        Value::Bool(_) => Err(ShapeError::Unrecognized("a boolean")),
        Value::Number(_) => Err(ShapeError::Unrecognized("a number")),
        Value::String(_) => Err(ShapeError::Unrecognized("a string")),
    }
}

/// `[polygon, [text, confidence]]`
fn bare_line(items: &[Value]) -> Result<TextLine, ShapeError> {
    let [polygon, text] = items else {
        return Err(ShapeError::Unrecognized("an array that is not a pair"));
    };
    let polygon = parse_polygon(polygon).ok_or(ShapeError::BadPolygon)?;
    let (text, confidence) = text_pair(text).ok_or(ShapeError::BadLineText)?;
    Ok(TextLine::new(polygon, text, confidence))
}

fn text_pair(value: &Value) -> Option<(String, f32)> {
    match value.as_array()?.as_slice() {
        [Value::String(text), Value::Number(confidence)] => {
            Some((nfc(text), confidence.as_f64().unwrap_or(1.0) as f32))
        }
        _ => None,
    }
}

/// Lines of a text region. Entries without their own polygon borrow the
/// region's box; unusable entries are skipped one by one.
fn text_region_lines(
    res: &Value,
    region: Option<BBox>,
    skipped: &mut Vec<ShapeError>,
) -> Vec<TextLine> {
    let fallback = region.unwrap_or_default().to_polygon();

    if let Some((text, confidence)) = text_pair(res) {
        return vec![TextLine::new(fallback, text, confidence)];
    }
    let Some(entries) = res.as_array() else {
        return Vec::new();
    };

    let mut lines = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        match text_entry(entry, &fallback) {
            Some(line) => lines.push(line),
            None => skipped.push(ShapeError::BadTextEntry(idx)),
        }
    }
    lines
}

fn text_entry(entry: &Value, fallback: &Polygon) -> Option<TextLine> {
    match entry {
        Value::Array(items) => match text_pair(entry) {
            Some((text, confidence)) => Some(TextLine::new(fallback.clone(), text, confidence)),
            None => bare_line(items).ok(),
        },
        Value::String(text) => Some(TextLine::new(fallback.clone(), nfc(text), 1.0)),
        Value::Object(map) => {
            let text = map.get("text").and_then(Value::as_str)?;
            let polygon = match map.get("text_region") {
                Some(region) => parse_polygon(region)?,
                None => fallback.clone(),
            };
            let confidence = map
                .get("confidence")
                .and_then(Value::as_f64)
                .unwrap_or(1.0) as f32;
            Some(TextLine::new(polygon, nfc(text), confidence))
        }
        _ => None,
    }
}

fn parse_polygon(value: &Value) -> Option<Polygon> {
    let points = value
        .as_array()?
        .iter()
        .map(|point| match point.as_array()?.as_slice() {
            [x, y] => Some(Point::new(x.as_f64()? as f32, y.as_f64()? as f32)),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Polygon::new(points)
}

fn parse_bbox(value: &Value) -> Option<BBox> {
    match value.as_array()?.as_slice() {
        [x0, y0, x1, y1] => Some(BBox::new(
            x0.as_f64()? as f32,
            y0.as_f64()? as f32,
            x1.as_f64()? as f32,
            y1.as_f64()? as f32,
        )),
        _ => None,
    }
}

fn nfc(text: &str) -> String {
    text.nfc().collect()
}
