//! Midpoint circle rasterization

use crate::board::Point;
use std::collections::BTreeSet;

/// A rasterized circle outline
#[derive(Clone, Debug)]
pub struct Circle {
    pub center: Point,
    pub radius: i32,
    /// Outline pixels, ordered and without duplicates
    pub circumference: Vec<Point>,
}

impl Circle {
    /// Rasterize one octant and mirror it into the other seven
    pub fn bresenham(radius: i32, center: Point) -> Self {
        let mut pixels = BTreeSet::new();
        let (mut x, mut y) = (radius, 0);
        let mut err = 1 - radius;

        while x >= y {
            for (dx, dy) in [
                (x, y), (y, x), (-y, x), (-x, y),
                (-x, -y), (-y, -x), (y, -x), (x, -y),
            ] {
                pixels.insert(Point::new(center.x + dx, center.y + dy));
            }
            y += 1;
            if err < 0 {
                err += 2 * y + 1;
            } else {
                x -= 1;
                err += 2 * (y - x) + 1;
            }
        }

        Self { center, radius, circumference: pixels.into_iter().collect() }
    }

    /// Outline pixel nearest to the ideal point at `angle` radians,
    /// skipping pixels in `taken`. Angle zero points along +x, and a
    /// quarter turn points along +y.
    pub fn point_on_circle(&self, angle: f64, taken: &[Point]) -> Option<Point> {
        let r = self.radius as f64;
        let tx = self.center.x as f64 + r * angle.cos();
        let ty = self.center.y as f64 + r * angle.sin();

        self.circumference
            .iter()
            .filter(|p| !taken.contains(p))
            .map(|p| {
                let (dx, dy) = (p.x as f64 - tx, p.y as f64 - ty);
                (dx * dx + dy * dy, *p)
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, p)| p)
    }
}
