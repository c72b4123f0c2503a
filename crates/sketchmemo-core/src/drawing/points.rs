//! Serde adapter storing a point list as a flat `[x0, y0, x1, y1, ...]` array.

use kurbo::Point;
use serde::de::Error;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(points: &[Point], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut seq = serializer.serialize_seq(Some(points.len() * 2))?;
    for p in points {
        seq.serialize_element(&p.x)?;
        seq.serialize_element(&p.y)?;
    }
    seq.end()
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Point>, D::Error>
where
    D: Deserializer<'de>,
{
    let flat = Vec::<f64>::deserialize(deserializer)?;
    if flat.len() % 2 != 0 {
        return Err(D::Error::custom(format!(
            "points must alternate x,y; got {} values",
            flat.len()
        )));
    }
    Ok(flat
        .chunks_exact(2)
        .map(|xy| Point::new(xy[0], xy[1]))
        .collect())
}
