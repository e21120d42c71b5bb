//! Continuous torus geometry.
//!
//! Positions live in `[0, width) x [0, height)` and wrap around both axes.
//! Distances and midpoints use the shortest displacement across the seams.

use glam::DVec2;
use rand::Rng;

use crate::error::WorldError;
use crate::sampling;

/// A `width x height` torus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Torus {
    width: f64,
    height: f64,
}

impl Torus {
    /// Create a torus. Both extents must be finite and positive.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidGeometry`] for zero, negative, or
    /// non-finite dimensions.
    pub fn new(width: f64, height: f64) -> Result<Self, WorldError> {
        if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
            return Err(WorldError::InvalidGeometry {
                reason: format!("torus extents must be positive, got {width} x {height}"),
            });
        }
        Ok(Self { width, height })
    }

    /// Horizontal extent.
    pub const fn width(&self) -> f64 {
        self.width
    }

    /// Vertical extent.
    pub const fn height(&self) -> f64 {
        self.height
    }

    /// Wrap a position back onto the torus.
    pub fn wrap(&self, p: DVec2) -> DVec2 {
        DVec2::new(wrap_axis(p.x, self.width), wrap_axis(p.y, self.height))
    }

    /// Shortest displacement from `from` to `to`.
    pub fn delta(&self, from: DVec2, to: DVec2) -> DVec2 {
        DVec2::new(
            shortest(to.x - from.x, self.width),
            shortest(to.y - from.y, self.height),
        )
    }

    /// Squared shortest distance.
    pub fn distance_squared(&self, a: DVec2, b: DVec2) -> f64 {
        self.delta(a, b).length_squared()
    }

    /// Shortest distance.
    pub fn distance(&self, a: DVec2, b: DVec2) -> f64 {
        self.delta(a, b).length()
    }

    /// Midpoint along the shortest path from `a` to `b`.
    pub fn midpoint(&self, a: DVec2, b: DVec2) -> DVec2 {
        self.wrap(a + self.delta(a, b) * 0.5)
    }

    /// Whether a position lies inside `[0, width) x [0, height)`.
    pub fn contains(&self, p: DVec2) -> bool {
        (0.0..self.width).contains(&p.x) && (0.0..self.height).contains(&p.y)
    }

    /// Uniformly random position.
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> DVec2 {
        DVec2::new(
            sampling::uniform(rng, 0.0, self.width),
            sampling::uniform(rng, 0.0, self.height),
        )
    }
}

fn wrap_axis(value: f64, extent: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let wrapped = value.rem_euclid(extent);
    // rem_euclid can round up to `extent` for tiny negative inputs.
    if wrapped >= extent { 0.0 } else { wrapped }
}

fn shortest(d: f64, extent: f64) -> f64 {
    let half = extent * 0.5;
    let mut d = d.rem_euclid(extent);
    if d > half {
        d -= extent;
    }
    d
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn torus() -> Torus {
        Torus::new(100.0, 50.0).unwrap()
    }

    #[test]
    fn rejects_degenerate_extents() {
        assert!(Torus::new(0.0, 10.0).is_err());
        assert!(Torus::new(10.0, -1.0).is_err());
        assert!(Torus::new(f64::NAN, 10.0).is_err());
    }

    #[test]
    fn wrap_folds_both_axes() {
        let t = torus();
        let p = t.wrap(DVec2::new(-1.0, 51.0));
        assert!((p.x - 99.0).abs() < 1e-9);
        assert!((p.y - 1.0).abs() < 1e-9);
        assert!(t.contains(p));
    }

    #[test]
    fn wrap_never_returns_the_extent() {
        let t = torus();
        let p = t.wrap(DVec2::new(-1e-18, -1e-18));
        assert!(t.contains(p));
    }

    #[test]
    fn distance_uses_the_seam() {
        let t = torus();
        let d = t.distance(DVec2::new(1.0, 10.0), DVec2::new(99.0, 10.0));
        assert!((d - 2.0).abs() < 1e-9);
    }

    #[test]
    fn midpoint_across_the_seam() {
        let t = torus();
        let m = t.midpoint(DVec2::new(2.0, 10.0), DVec2::new(98.0, 10.0));
        assert!(m.x < 1e-9 || (m.x - 100.0).abs() < 1e-9);
        assert!((m.y - 10.0).abs() < 1e-9);
    }
}
