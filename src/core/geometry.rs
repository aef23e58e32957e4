use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f32; 2] {
    fn from(point: Point) -> Self {
        [point.x, point.y]
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Corners clockwise from top-left, the order OCR detectors emit.
    pub fn to_polygon(&self) -> Polygon {
        Polygon {
            points: vec![
                Point::new(self.x0, self.y0),
                Point::new(self.x1, self.y0),
                Point::new(self.x1, self.y1),
                Point::new(self.x0, self.y1),
            ],
        }
    }
}

/// Bounding polygon of a detected text line. Always holds at least three points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    pub const MIN_POINTS: usize = 3;

    pub fn new(points: Vec<Point>) -> Option<Self> {
        (points.len() >= Self::MIN_POINTS).then_some(Self { points })
    }

    /// Mean of the vertex coordinates.
    pub fn center(&self) -> Point {
        let count = self.points.len() as f32;
        let (sum_x, sum_y) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point::new(sum_x / count, sum_y / count)
    }

    pub fn bounds(&self) -> BBox {
        let first = self.points[0];
        self.points.iter().skip(1).fold(
            BBox::new(first.x, first.y, first.x, first.y),
            |acc, p| acc.union(&BBox::new(p.x, p.y, p.x, p.y)),
        )
    }
}

impl TryFrom<Vec<Point>> for Polygon {
    type Error = String;

    fn try_from(points: Vec<Point>) -> Result<Self, Self::Error> {
        let count = points.len();
        Self::new(points).ok_or_else(|| {
            format!(
                "polygon needs at least {} points, got {count}",
                Self::MIN_POINTS
            )
        })
    }
}

impl From<Polygon> for Vec<Point> {
    fn from(polygon: Polygon) -> Self {
        polygon.points
    }
}
