use macroquad::math::{vec2, Vec2};

use crate::geometry::index_mod;

/// Centripetal-style cubic blend of four control values at `t`.
fn blend(a: f32, b: f32, c: f32, d: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    let f1 = -0.5 * t3 + t2 - 0.5 * t;
    let f2 = 1.5 * t3 - 2.5 * t2 + 1.0;
    let f3 = -1.5 * t3 + 2.0 * t2 + 0.5 * t;
    let f4 = 0.5 * t3 - 0.5 * t2;
    a * f1 + b * f2 + c * f3 + d * f4
}

/// One subdivision round over a closed polygon: every vertex is kept and a
/// smoothed midpoint is inserted after it, using two neighbours on each side.
pub fn subdivide(points: &[Vec2]) -> Vec<Vec2> {
    let n = points.len();
    let mut curve = Vec::with_capacity(n * 2);
    for i in 0..n {
        let i = i as isize;
        let a = points[index_mod(i - 1, n)];
        let b = points[index_mod(i, n)];
        let c = points[index_mod(i + 1, n)];
        let d = points[index_mod(i + 2, n)];
        curve.push(b);
        curve.push(vec2(
            blend(a.x, b.x, c.x, d.x, 0.5),
            blend(a.y, b.y, c.y, d.y, 0.5),
        ));
    }
    curve
}

/// Smooth a closed polygon (no closing duplicate) with `rounds` subdivisions.
/// The result is also open: the last vertex connects back to the first.
pub fn smooth_closed(points: &[Vec2], rounds: usize) -> Vec<Vec2> {
    if points.len() < 3 {
        return points.to_vec();
    }
    (0..rounds).fold(points.to_vec(), |curve, _| subdivide(&curve))
}
