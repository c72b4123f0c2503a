//! Turns pointer samples into strokes.

use crate::drawing::{Stroke, StrokeColor, spline_path};
use kurbo::{BezPath, Point};
use thiserror::Error;

/// Stroke lifecycle misuse.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InvalidState {
    #[error("a stroke is already open")]
    StrokeAlreadyOpen,
    #[error("no stroke is open")]
    NoOpenStroke,
    #[error("point is not finite: ({0}, {1})")]
    NonFinitePoint(f64, f64),
    #[error("stroke width must be positive and finite, got {0}")]
    InvalidWidth(f64),
}

/// The stroke of the gesture in progress.
///
/// Owned exclusively by the recorder; becomes an immutable [`Stroke`] when
/// the gesture ends.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenStroke {
    points: Vec<Point>,
    color: StrokeColor,
    stroke_width: f64,
}

impl OpenStroke {
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn color(&self) -> StrokeColor {
        self.color
    }

    pub fn stroke_width(&self) -> f64 {
        self.stroke_width
    }

    /// Live preview path, drawn the same way the closed stroke will be.
    pub fn to_path(&self, tension: f64) -> BezPath {
        spline_path(&self.points, tension)
    }
}

/// Records at most one open stroke at a time.
///
/// Points are kept exactly as given: no smoothing, resampling or
/// simplification, and zero-distance repeats are appended like any other
/// sample.
#[derive(Debug, Clone, Default)]
pub struct StrokeRecorder {
    open: Option<OpenStroke>,
}

impl StrokeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new stroke at `point`.
    pub fn begin(&mut self, point: Point, color: StrokeColor, stroke_width: f64) -> Result<(), InvalidState> {
        if self.open.is_some() {
            return Err(InvalidState::StrokeAlreadyOpen);
        }
        check_finite(point)?;
        if !(stroke_width.is_finite() && stroke_width > 0.0) {
            return Err(InvalidState::InvalidWidth(stroke_width));
        }
        self.open = Some(OpenStroke {
            points: vec![point],
            color,
            stroke_width,
        });
        Ok(())
    }

    /// Append `point` to the open stroke.
    pub fn extend(&mut self, point: Point) -> Result<(), InvalidState> {
        let open = self.open.as_mut().ok_or(InvalidState::NoOpenStroke)?;
        check_finite(point)?;
        open.points.push(point);
        Ok(())
    }

    /// Close the open stroke and hand it over.
    pub fn end(&mut self) -> Result<Stroke, InvalidState> {
        let open = self.open.take().ok_or(InvalidState::NoOpenStroke)?;
        Ok(Stroke::from_recorded(open.points, open.color, open.stroke_width))
    }

    /// Drop the open stroke, if any, without producing a stroke.
    pub fn cancel(&mut self) -> Option<OpenStroke> {
        self.open.take()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn open_stroke(&self) -> Option<&OpenStroke> {
        self.open.as_ref()
    }
}

fn check_finite(point: Point) -> Result<(), InvalidState> {
    if point.is_finite() {
        Ok(())
    } else {
        Err(InvalidState::NonFinitePoint(point.x, point.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn begin(rec: &mut StrokeRecorder, x: f64, y: f64) -> Result<(), InvalidState> {
        rec.begin(Point::new(x, y), StrokeColor::BLACK, 5.0)
    }

    #[test]
    fn test_points_are_kept_verbatim() {
        let samples = [
            Point::new(3.0, 4.0),
            Point::new(3.0, 4.0),
            Point::new(-1.5, 200.25),
            Point::new(3.0, 4.0),
            Point::new(1e6, 0.0),
        ];
        let mut rec = StrokeRecorder::new();
        rec.begin(samples[0], StrokeColor::new(1, 2, 3), 2.0).unwrap();
        for p in &samples[1..] {
            rec.extend(*p).unwrap();
        }
        let stroke = rec.end().unwrap();

        assert_eq!(stroke.points(), &samples);
        assert_eq!(stroke.color(), StrokeColor::new(1, 2, 3));
        assert_eq!(stroke.stroke_width(), 2.0);
        assert!(!rec.is_open());
    }

    #[test]
    fn test_single_point_stroke() {
        let mut rec = StrokeRecorder::new();
        begin(&mut rec, 1.0, 1.0).unwrap();
        let stroke = rec.end().unwrap();
        assert_eq!(stroke.points(), &[Point::new(1.0, 1.0)]);
    }

    #[test]
    fn test_begin_while_open() {
        let mut rec = StrokeRecorder::new();
        begin(&mut rec, 0.0, 0.0).unwrap();
        assert_eq!(begin(&mut rec, 1.0, 1.0), Err(InvalidState::StrokeAlreadyOpen));
        // The original stroke is untouched.
        assert_eq!(rec.open_stroke().unwrap().points(), &[Point::ZERO]);
    }

    #[test]
    fn test_extend_and_end_while_closed() {
        let mut rec = StrokeRecorder::new();
        assert_eq!(rec.extend(Point::ZERO), Err(InvalidState::NoOpenStroke));
        assert_eq!(rec.end(), Err(InvalidState::NoOpenStroke));

        begin(&mut rec, 0.0, 0.0).unwrap();
        rec.end().unwrap();
        assert_eq!(rec.end(), Err(InvalidState::NoOpenStroke));
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut rec = StrokeRecorder::new();
        assert!(matches!(
            begin(&mut rec, f64::NAN, 0.0),
            Err(InvalidState::NonFinitePoint(..))
        ));
        assert!(!rec.is_open());

        begin(&mut rec, 0.0, 0.0).unwrap();
        assert!(rec.extend(Point::new(f64::INFINITY, 0.0)).is_err());
        assert_eq!(rec.end().unwrap().points().len(), 1);
    }

    #[test]
    fn test_rejects_bad_width() {
        let mut rec = StrokeRecorder::new();
        assert_eq!(
            rec.begin(Point::ZERO, StrokeColor::BLACK, 0.0),
            Err(InvalidState::InvalidWidth(0.0))
        );
        assert!(!rec.is_open());
    }

    #[test]
    fn test_cancel() {
        let mut rec = StrokeRecorder::new();
        begin(&mut rec, 0.0, 0.0).unwrap();
        assert!(rec.cancel().is_some());
        assert!(!rec.is_open());
        assert!(rec.cancel().is_none());
    }
}
