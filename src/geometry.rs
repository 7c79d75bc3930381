//! 2D vector helpers and segment intersection tests shared by the track
//! pipeline and the sensor rays.

use macroquad::math::{vec2, Vec2};

/// Rotate `v` by `angle` radians (positive = clockwise on a y-down canvas).
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    let (s, c) = angle.sin_cos();
    vec2(v.x * c - v.y * s, v.x * s + v.y * c)
}

/// Signed angle from `a` to `b` in `[-PI, PI]`.
pub fn signed_angle(a: Vec2, b: Vec2) -> f32 {
    a.perp_dot(b).atan2(a.dot(b))
}

/// Unsigned angle at `center` formed by `a` and `b`, in `[0, PI]`.
pub fn three_point_angle(center: Vec2, a: Vec2, b: Vec2) -> f32 {
    signed_angle(a - center, b - center).abs()
}

/// Wrap an index into `0..len`, accepting negative offsets.
pub fn index_mod(index: isize, len: usize) -> usize {
    index.rem_euclid(len as isize) as usize
}

/// Returns closest point on segment [a,b] to p.
pub fn closest_point_on_segment(a: Vec2, b: Vec2, p: Vec2) -> Vec2 {
    let ab = b - a;
    let ab_len_sq = ab.length_squared();
    if ab_len_sq <= f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / ab_len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Parameters `(ua, ub)` of the crossing of lines `a-b` and `c-d`, or `None`
/// when the lines are parallel.
fn crossing_params(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> Option<(f32, f32)> {
    let den = (d.y - c.y) * (b.x - a.x) - (d.x - c.x) * (b.y - a.y);
    if den.abs() <= f32::EPSILON {
        return None;
    }
    let ua = ((d.x - c.x) * (a.y - c.y) - (d.y - c.y) * (a.x - c.x)) / den;
    let ub = ((b.x - a.x) * (a.y - c.y) - (b.y - a.y) * (a.x - c.x)) / den;
    Some((ua, ub))
}

/// Intersection point of segments `a-b` and `c-d`, endpoints included.
pub fn segment_intersection(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> Option<Vec2> {
    let (ua, ub) = crossing_params(a, b, c, d)?;
    if (0.0..=1.0).contains(&ua) && (0.0..=1.0).contains(&ub) {
        Some(a + (b - a) * ua)
    } else {
        None
    }
}

/// Intersection strictly inside both segments; touching endpoints do not count.
pub fn proper_segment_intersection(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> Option<Vec2> {
    const EPS: f32 = 1e-4;
    let (ua, ub) = crossing_params(a, b, c, d)?;
    if ua > EPS && ua < 1.0 - EPS && ub > EPS && ub < 1.0 - EPS {
        Some(a + (b - a) * ua)
    } else {
        None
    }
}

pub fn segments_intersect(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> bool {
    segment_intersection(a, b, c, d).is_some()
}

/// Sum of consecutive-vertex distances of a closed polygon given without its
/// closing duplicate.
pub fn closed_length(points: &[Vec2]) -> f32 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.distance(*b))
        .sum()
}

/// True if any two non-adjacent edges of the closed polygon cross.
pub fn polygon_self_intersects(polygon: &[Vec2]) -> bool {
    let n = polygon.len();
    if n < 4 {
        return false;
    }
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[(i + 1) % n]);
        for j in (i + 1)..n {
            // Edges sharing a vertex always touch.
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let (c, d) = (polygon[j], polygon[(j + 1) % n]);
            if segments_intersect(a, b, c, d) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn rotate_quarter_turn_is_clockwise_on_screen() {
        let v = rotate(vec2(1.0, 0.0), FRAC_PI_2);
        assert!((v - vec2(0.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn crossing_segments_report_the_meeting_point() {
        let p = segment_intersection(
            vec2(0.0, 0.0),
            vec2(10.0, 10.0),
            vec2(0.0, 10.0),
            vec2(10.0, 0.0),
        )
        .unwrap();
        assert!((p - vec2(5.0, 5.0)).length() < 1e-5);
    }

    #[test]
    fn parallel_and_disjoint_segments_do_not_intersect() {
        assert!(!segments_intersect(
            vec2(0.0, 0.0),
            vec2(10.0, 0.0),
            vec2(0.0, 1.0),
            vec2(10.0, 1.0)
        ));
        assert!(!segments_intersect(
            vec2(0.0, 0.0),
            vec2(1.0, 1.0),
            vec2(5.0, 0.0),
            vec2(6.0, -3.0)
        ));
    }

    #[test]
    fn proper_intersection_ignores_shared_endpoints() {
        let a = vec2(0.0, 0.0);
        let b = vec2(5.0, 5.0);
        assert!(segment_intersection(a, b, b, vec2(10.0, 0.0)).is_some());
        assert!(proper_segment_intersection(a, b, b, vec2(10.0, 0.0)).is_none());
    }

    #[test]
    fn bow_tie_polygon_self_intersects_but_square_does_not() {
        let square = [
            vec2(0.0, 0.0),
            vec2(10.0, 0.0),
            vec2(10.0, 10.0),
            vec2(0.0, 10.0),
        ];
        let bow_tie = [
            vec2(0.0, 0.0),
            vec2(10.0, 10.0),
            vec2(10.0, 0.0),
            vec2(0.0, 10.0),
        ];
        assert!(!polygon_self_intersects(&square));
        assert!(polygon_self_intersects(&bow_tie));
    }

    #[test]
    fn closed_length_includes_the_wrap_edge() {
        let square = [
            vec2(0.0, 0.0),
            vec2(10.0, 0.0),
            vec2(10.0, 10.0),
            vec2(0.0, 10.0),
        ];
        assert!((closed_length(&square) - 40.0).abs() < 1e-5);
        assert_eq!(index_mod(-1, 4), 3);
        assert_eq!(index_mod(5, 4), 1);
    }

    #[test]
    fn three_point_angle_of_right_corner() {
        let angle = three_point_angle(vec2(0.0, 0.0), vec2(1.0, 0.0), vec2(0.0, 3.0));
        assert!((angle - FRAC_PI_2).abs() < 1e-6);
    }
}
