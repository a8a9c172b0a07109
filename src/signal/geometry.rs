//! Planar geometry on normalized image coordinates.

const MIN_SEGMENT_LENGTH: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Angle at `vertex` between the segments to `a` and `c`, in degrees `[0, 180]`.
///
/// `None` when either segment is degenerate.
pub fn angle_at(a: Point, vertex: Point, c: Point) -> Option<f64> {
    let (bax, bay) = (a.x - vertex.x, a.y - vertex.y);
    let (bcx, bcy) = (c.x - vertex.x, c.y - vertex.y);
    let norm_ba = (bax * bax + bay * bay).sqrt();
    let norm_bc = (bcx * bcx + bcy * bcy).sqrt();
    if norm_ba < MIN_SEGMENT_LENGTH || norm_bc < MIN_SEGMENT_LENGTH {
        return None;
    }

    let cosine = ((bax * bcx + bay * bcy) / (norm_ba * norm_bc)).clamp(-1.0, 1.0);
    Some(cosine.acos().to_degrees())
}

/// How upright the `top`-`bottom` segment is, as a percentage: 100 when `top`
/// is directly above `bottom` (image y grows downward), 0 when level or inverted.
pub fn verticality(top: Point, bottom: Point) -> Option<f64> {
    let length = top.distance_to(&bottom);
    if length < MIN_SEGMENT_LENGTH {
        return None;
    }
    Some(((bottom.y - top.y) / length).max(0.0) * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_angle_at() {
        let straight = angle_at(Point::new(0.5, 0.3), Point::new(0.5, 0.5), Point::new(0.5, 0.7));
        assert!(close(straight.unwrap(), 180.0));

        let right = angle_at(Point::new(0.5, 0.3), Point::new(0.5, 0.5), Point::new(0.7, 0.5));
        assert!(close(right.unwrap(), 90.0));

        let degenerate = angle_at(Point::new(0.5, 0.5), Point::new(0.5, 0.5), Point::new(0.7, 0.5));
        assert!(degenerate.is_none());
    }

    #[test]
    fn test_verticality() {
        assert!(close(verticality(Point::new(0.5, 0.2), Point::new(0.5, 0.9)).unwrap(), 100.0));
        assert!(close(verticality(Point::new(0.2, 0.8), Point::new(0.9, 0.8)).unwrap(), 0.0));
        assert!(close(verticality(Point::new(0.5, 0.9), Point::new(0.5, 0.2)).unwrap(), 0.0));
    }
}
