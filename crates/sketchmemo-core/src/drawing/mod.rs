//! Strokes and drawings, plus their persisted JSON representation.
//!
//! The wire format of a drawing is:
//!
//! ```json
//! { "strokes": [ { "points": [x0, y0, x1, y1], "color": "#RRGGBB", "strokeWidth": 5 } ] }
//! ```

mod color;
mod points;

pub use color::{ColorParseError, StrokeColor};

use kurbo::{BezPath, Point, Rect};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Cardinal-spline tension used when strokes are drawn on the capture surface.
///
/// Points are stored unsmoothed; renderers must use this tension to reproduce
/// the path the user saw.
pub const DEFAULT_TENSION: f64 = 0.5;

/// Why a set of stroke fields does not form a valid stroke.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrokeDataError {
    #[error("stroke has no points")]
    NoPoints,
    #[error("stroke point is not finite: ({0}, {1})")]
    NonFinitePoint(f64, f64),
    #[error("stroke width must be positive and finite, got {0}")]
    InvalidWidth(f64),
}

/// One closed pen-down-to-pen-up path.
///
/// There are no mutators: once a stroke exists it is immutable. In-progress
/// paths are [`crate::recorder::OpenStroke`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawStroke")]
pub struct Stroke {
    #[serde(with = "points")]
    points: Vec<Point>,
    color: StrokeColor,
    stroke_width: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStroke {
    #[serde(with = "points")]
    points: Vec<Point>,
    color: StrokeColor,
    stroke_width: f64,
}

impl TryFrom<RawStroke> for Stroke {
    type Error = StrokeDataError;

    fn try_from(raw: RawStroke) -> Result<Self, Self::Error> {
        Stroke::new(raw.points, raw.color, raw.stroke_width)
    }
}

impl Stroke {
    /// Create a closed stroke, validating the invariants every stroke holds.
    pub fn new(points: Vec<Point>, color: StrokeColor, stroke_width: f64) -> Result<Self, StrokeDataError> {
        if points.is_empty() {
            return Err(StrokeDataError::NoPoints);
        }
        if let Some(p) = points.iter().find(|p| !p.is_finite()) {
            return Err(StrokeDataError::NonFinitePoint(p.x, p.y));
        }
        if !(stroke_width.is_finite() && stroke_width > 0.0) {
            return Err(StrokeDataError::InvalidWidth(stroke_width));
        }
        Ok(Self {
            points,
            color,
            stroke_width,
        })
    }

    /// Build a stroke from recorder state that already upholds the invariants
    /// (non-empty finite points, positive finite width).
    pub(crate) fn from_recorded(points: Vec<Point>, color: StrokeColor, stroke_width: f64) -> Self {
        debug_assert!(!points.is_empty());
        Self {
            points,
            color,
            stroke_width,
        }
    }

    /// Points in draw order; the first is the pen-down position.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn color(&self) -> StrokeColor {
        self.color
    }

    pub fn stroke_width(&self) -> f64 {
        self.stroke_width
    }

    /// Points flattened as `[x0, y0, x1, y1, ...]`.
    pub fn flat_points(&self) -> Vec<f64> {
        self.points.iter().flat_map(|p| [p.x, p.y]).collect()
    }

    /// Bounding box of the centerline (not including stroke width).
    pub fn bounds(&self) -> Rect {
        let first = self.points[0];
        self.points
            .iter()
            .skip(1)
            .fold(Rect::from_points(first, first), |r, p| r.union_pt(*p))
    }

    /// Build the rendered path as a cardinal spline through the points.
    ///
    /// A tension of `0.0` yields straight segments. A single-point stroke
    /// becomes a zero-length segment so round caps still draw a dot.
    pub fn to_path(&self, tension: f64) -> BezPath {
        spline_path(&self.points, tension)
    }
}

pub(crate) fn spline_path(points: &[Point], tension: f64) -> BezPath {
    let mut path = BezPath::new();
    let Some(&first) = points.first() else {
        return path;
    };
    path.move_to(first);

    if points.len() == 1 {
        path.line_to(first);
        return path;
    }

    if tension == 0.0 || points.len() == 2 {
        for p in &points[1..] {
            path.line_to(*p);
        }
        return path;
    }

    let last = points.len() - 1;
    for i in 0..last {
        let p0 = points[i.saturating_sub(1)];
        let p1 = points[i];
        let p2 = points[i + 1];
        let p3 = points[(i + 2).min(last)];

        let cp1 = Point::new(
            p1.x + (p2.x - p0.x) * tension / 3.0,
            p1.y + (p2.y - p0.y) * tension / 3.0,
        );
        let cp2 = Point::new(
            p2.x - (p3.x - p1.x) * tension / 3.0,
            p2.y - (p3.y - p1.y) * tension / 3.0,
        );
        path.curve_to(cp1, cp2, p2);
    }
    path
}

/// The full ordered set of closed strokes making up one artwork.
///
/// Drawings are values: cloning is cheap because strokes are shared, and
/// equality compares strokes element-wise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    strokes: Vec<Arc<Stroke>>,
}

impl Drawing {
    /// Create an empty (blank) drawing.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_strokes(strokes: impl IntoIterator<Item = Stroke>) -> Self {
        Self {
            strokes: strokes.into_iter().map(Arc::new).collect(),
        }
    }

    /// A new drawing equal to this one with `stroke` appended on top.
    pub fn with_stroke(&self, stroke: Stroke) -> Self {
        let mut strokes = Vec::with_capacity(self.strokes.len() + 1);
        strokes.extend(self.strokes.iter().cloned());
        strokes.push(Arc::new(stroke));
        Self { strokes }
    }

    /// Strokes back to front.
    pub fn strokes(&self) -> impl ExactSizeIterator<Item = &Stroke> {
        self.strokes.iter().map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Union of stroke bounds, or `None` for a blank drawing.
    pub fn bounds(&self) -> Option<Rect> {
        self.strokes().fold(None, |acc, s| {
            let b = s.bounds();
            Some(match acc {
                Some(r) => r.union(b),
                None => b,
            })
        })
    }

    /// Convert to the persisted representation.
    pub fn to_data(&self) -> Result<DrawingData, serde_json::Error> {
        serde_json::to_value(self).map(DrawingData)
    }

    /// Parse the persisted representation.
    pub fn from_data(data: &DrawingData) -> Result<Self, serde_json::Error> {
        Self::deserialize(&data.0)
    }

    /// Serialize the drawing to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a drawing from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// A drawing in its stored form, as kept in a memo row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawingData(serde_json::Value);

impl DrawingData {
    /// `{"strokes": []}`
    pub fn blank() -> Self {
        Self(serde_json::json!({ "strokes": [] }))
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for DrawingData {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}
