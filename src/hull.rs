//! Concave hull ("gift opening") over a small point cloud.
//!
//! Starts from the convex hull and repeatedly digs into edges longer than the
//! concavity threshold, splitting each at the inner point that keeps both new
//! base angles under 90 degrees and does not cross the current hull.

use macroquad::math::Vec2;

use crate::geometry::proper_segment_intersection;

/// Both base angles of a dug-in triangle must stay below 90 degrees.
const MAX_CONCAVE_ANGLE_COS: f32 = 0.0;

/// Closed hull (first vertex repeated last) of `points` at `concavity`.
/// Larger concavity approaches the convex hull. Returns `None` for an empty set.
pub fn concave_hull(points: &[Vec2], concavity: f32) -> Option<Vec<Vec2>> {
    let mut sorted = dedup_sorted(points);
    if sorted.is_empty() {
        return None;
    }
    if sorted.len() < 4 {
        let first = sorted[0];
        sorted.push(first);
        return Some(sorted);
    }

    let mut hull = convex_hull(&sorted);
    let mut inner: Vec<Vec2> = sorted
        .iter()
        .copied()
        .filter(|p| !hull.contains(p))
        .collect();

    let max_sq_edge = concavity * concavity;
    loop {
        let mut inserted = false;
        let mut i = 0;
        while i + 1 < hull.len() {
            let (a, b) = (hull[i], hull[i + 1]);
            if a.distance_squared(b) < max_sq_edge {
                i += 1;
                continue;
            }
            if let Some(k) = dig_point(a, b, &inner, &hull) {
                let p = inner.swap_remove(k);
                hull.insert(i + 1, p);
                inserted = true;
            }
            i += 1;
        }
        if !inserted {
            break;
        }
    }
    Some(hull)
}

/// Sort by x then y and drop exact duplicates.
fn dedup_sorted(points: &[Vec2]) -> Vec<Vec2> {
    let mut sorted: Vec<Vec2> = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();
    sorted
}

/// Andrew's monotone chain over x-sorted points. Output is closed.
fn convex_hull(sorted: &[Vec2]) -> Vec<Vec2> {
    fn cross(o: Vec2, a: Vec2, b: Vec2) -> f32 {
        (a - o).perp_dot(b - o)
    }

    let mut lower: Vec<Vec2> = Vec::with_capacity(sorted.len());
    for &p in sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Vec2> = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    let first = lower[0];
    lower.push(first);
    lower
}

fn cos_at(o: Vec2, a: Vec2, b: Vec2) -> f32 {
    let (oa, ob) = (a - o, b - o);
    let den = (oa.length_squared() * ob.length_squared()).sqrt();
    if den <= f32::EPSILON {
        return -1.0;
    }
    oa.dot(ob) / den
}

/// Index into `inner` of the best point to dig edge `a-b` towards.
fn dig_point(a: Vec2, b: Vec2, inner: &[Vec2], hull: &[Vec2]) -> Option<usize> {
    let mut best = None;
    let (mut best_a, mut best_b) = (MAX_CONCAVE_ANGLE_COS, MAX_CONCAVE_ANGLE_COS);
    for (k, &p) in inner.iter().enumerate() {
        let cos_a = cos_at(a, b, p);
        let cos_b = cos_at(b, a, p);
        if cos_a > best_a
            && cos_b > best_b
            && !crosses_hull(a, p, hull)
            && !crosses_hull(b, p, hull)
        {
            best_a = cos_a;
            best_b = cos_b;
            best = Some(k);
        }
    }
    best
}

fn crosses_hull(from: Vec2, to: Vec2, hull: &[Vec2]) -> bool {
    hull.windows(2)
        .any(|edge| proper_segment_intersection(from, to, edge[0], edge[1]).is_some())
}
