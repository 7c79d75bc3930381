//! Procedural racetrack generation.
//!
//! seed points -> push apart -> concave hull -> angle relaxation -> hull
//! intersection check -> smoothed centerline -> start pose -> borders ->
//! border repair -> cross-border check. The two intersection checks reject
//! the candidate and the whole pipeline reruns from fresh points.

use ::rand::Rng;
use macroquad::math::{vec2, Vec2};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::SimConfig;
use crate::curve::smooth_closed;
use crate::geometry::{
    closed_length, polygon_self_intersects, proper_segment_intersection, rotate, segments_intersect,
    signed_angle,
};
use crate::hull::concave_hull;
use crate::world::World;

#[derive(Debug, Error, PartialEq)]
pub enum TrackError {
    #[error("cannot build a hull from an empty point set")]
    EmptyPointSet,
    #[error("no valid track after {attempts} attempts; loosen margins, point count or path width")]
    AttemptsExhausted { attempts: usize },
}

/// Where cars spawn and which way they face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StartPose {
    pub pos: Vec2,
    /// Radians, measured from +x towards +y.
    pub heading: f32,
}

/// Residual defects accepted by the bounded relaxation loops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackQuality {
    pub push_apart_capped: bool,
    pub angle_fix_capped: bool,
    pub sharp_angles: usize,
    pub border_repairs: usize,
    pub attempts: usize,
}

/// A finished track. Replaced wholesale on regeneration, never edited.
#[derive(Clone, Debug)]
pub struct Track {
    pub points: Vec<Vec2>,
    /// Hull vertices in order, without the closing duplicate.
    pub hull: Vec<Vec2>,
    /// Smoothed closed curve without the closing duplicate; index 0 is the start.
    pub centerline: Vec<Vec2>,
    pub path_width: f32,
    /// Closed polylines, first vertex repeated last.
    pub left_border: Vec<Vec2>,
    pub right_border: Vec<Vec2>,
    pub length: f32,
    pub start: StartPose,
    pub quality: TrackQuality,
}

/// Outcome of one generation attempt.
pub enum Attempt<T> {
    Accepted(T),
    Rejected(&'static str),
}

/// Run `generate` until it accepts a candidate, at most `max_attempts` times.
pub fn attempt<T>(
    max_attempts: usize,
    mut generate: impl FnMut(usize) -> Result<Attempt<T>, TrackError>,
) -> Result<T, TrackError> {
    for n in 1..=max_attempts {
        match generate(n)? {
            Attempt::Accepted(value) => return Ok(value),
            Attempt::Rejected(reason) => debug!(attempt = n, reason, "discarding candidate track"),
        }
    }
    Err(TrackError::AttemptsExhausted {
        attempts: max_attempts,
    })
}

impl Track {
    pub fn generate(config: &SimConfig, rng: &mut impl Rng) -> Result<Self, TrackError> {
        let world = World::new(config.canvas_width, config.canvas_height);
        let margin = config.point_margin;
        let min_angle = config.min_hull_angle_deg.to_radians();

        attempt(config.max_track_attempts, |n| {
            let count = rng.gen_range(config.initial_point_count..=config.max_initial_point_count);
            let mut points = seed_points(count, &world, margin, rng);
            let push = push_apart(
                &mut points,
                config.min_point_separation,
                &world,
                margin,
                config.push_apart_max_iterations,
            );

            let mut hull =
                concave_hull(&points, config.hull_difficulty).ok_or(TrackError::EmptyPointSet)?;
            hull.pop();
            if hull.len() < 3 {
                return Ok(Attempt::Rejected("degenerate hull"));
            }

            let fix = fix_hull_angles(
                &mut hull,
                min_angle,
                &world,
                margin,
                config.angle_fix_max_iterations,
            );
            if fix.remaining > 0 {
                warn!(
                    remaining = fix.remaining,
                    passes = fix.passes,
                    "hull keeps sharp angles after relaxation"
                );
            }
            if polygon_self_intersects(&hull) {
                return Ok(Attempt::Rejected("hull self-intersection"));
            }

            let curve = smooth_closed(&hull, config.smoothing_rounds);
            let (centerline, start) = choose_start(&curve, rng);
            let length = closed_length(&centerline);
            let path_width = config.path_width.sample(rng);

            let (mut left, mut right) =
                offset_borders(&centerline, path_width, config.border_segments);
            let repairs = repair_border(
                &mut left,
                config.border_repair_window,
                config.border_repair_passes,
            ) + repair_border(
                &mut right,
                config.border_repair_window,
                config.border_repair_passes,
            );
            if borders_cross(&left, &right) {
                return Ok(Attempt::Rejected("left and right borders cross"));
            }

            debug!(attempt = n, vertices = centerline.len(), length, "track accepted");
            Ok(Attempt::Accepted(Track {
                points,
                hull,
                centerline,
                path_width,
                left_border: left,
                right_border: right,
                length,
                start,
                quality: TrackQuality {
                    push_apart_capped: push.capped,
                    angle_fix_capped: fix.remaining > 0,
                    sharp_angles: fix.remaining,
                    border_repairs: repairs,
                    attempts: n,
                },
            }))
        })
    }

    /// Hull with the first vertex repeated at the end.
    pub fn closed_hull(&self) -> Vec<Vec2> {
        let mut hull = self.hull.clone();
        if let Some(&first) = self.hull.first() {
            hull.push(first);
        }
        hull
    }

    /// Every wall segment of both borders.
    pub fn walls(&self) -> impl Iterator<Item = (Vec2, Vec2)> + Clone + '_ {
        self.left_border
            .windows(2)
            .chain(self.right_border.windows(2))
            .map(|w| (w[0], w[1]))
    }
}

/// Uniform random points inside the canvas inset by `margin`.
pub fn seed_points(count: usize, world: &World, margin: f32, rng: &mut impl Rng) -> Vec<Vec2> {
    (0..count)
        .map(|_| {
            vec2(
                rng.gen_range(margin..(world.width - margin)),
                rng.gen_range(margin..(world.height - margin)),
            )
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PushApartOutcome {
    pub passes: usize,
    pub moved: usize,
    pub capped: bool,
}

/// Repel every pair closer than `min_dist` by half the deficit each along
/// their connecting axis, until no pair violates or `max_passes` is hit.
pub fn push_apart(
    points: &mut [Vec2],
    min_dist: f32,
    world: &World,
    margin: f32,
    max_passes: usize,
) -> PushApartOutcome {
    let mut moved = 0;
    for pass in 0..max_passes {
        let pushed = push_apart_pass(points, min_dist, world, margin);
        if pushed == 0 {
            return PushApartOutcome {
                passes: pass,
                moved,
                capped: false,
            };
        }
        moved += pushed;
    }
    PushApartOutcome {
        passes: max_passes,
        moved,
        capped: true,
    }
}

fn push_apart_pass(points: &mut [Vec2], min_dist: f32, world: &World, margin: f32) -> usize {
    let mut pushed = 0;
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let delta = points[j] - points[i];
            let dist = delta.length();
            if dist >= min_dist {
                continue;
            }
            pushed += 1;
            let axis = if dist > f32::EPSILON {
                delta / dist
            } else {
                vec2(1.0, 0.0)
            };
            let half = axis * ((min_dist - dist) * 0.5);
            points[i] = world.clamp_inset(points[i] - half, margin);
            points[j] = world.clamp_inset(points[j] + half, margin);
        }
    }
    pushed
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AngleFixOutcome {
    pub passes: usize,
    /// Vertices still below the threshold once the loop stopped.
    pub remaining: usize,
}

/// Widen every hull angle below `min_angle` by swinging the next vertex
/// around the current one, keeping the edge length. `hull` is open.
pub fn fix_hull_angles(
    hull: &mut [Vec2],
    min_angle: f32,
    world: &World,
    margin: f32,
    max_passes: usize,
) -> AngleFixOutcome {
    let mut passes = 0;
    while passes < max_passes && fix_angles_pass(hull, min_angle, world, margin) > 0 {
        passes += 1;
    }
    AngleFixOutcome {
        passes,
        remaining: sharp_angle_count(hull, min_angle),
    }
}

fn fix_angles_pass(hull: &mut [Vec2], min_angle: f32, world: &World, margin: f32) -> usize {
    let n = hull.len();
    let mut fixed = 0;
    for i in 0..n {
        let prev = hull[(i + n - 1) % n];
        let current = hull[i];
        let next_idx = (i + 1) % n;

        let vp = prev - current;
        let vn = hull[next_idx] - current;
        let signed = signed_angle(vp, vn);
        let angle = signed.abs();
        if angle >= min_angle {
            continue;
        }
        fixed += 1;

        let direction = if signed < 0.0 { -1.0 } else { 1.0 };
        let swung = rotate(vn, direction * (min_angle - angle));
        hull[next_idx] = world.clamp_inset(current + swung, margin);
    }
    fixed
}

/// Interior angles below `min_angle` (with a small numerical tolerance).
pub fn sharp_angle_count(hull: &[Vec2], min_angle: f32) -> usize {
    let n = hull.len();
    (0..n)
        .filter(|&i| {
            let prev = hull[(i + n - 1) % n];
            let next = hull[(i + 1) % n];
            signed_angle(prev - hull[i], next - hull[i]).abs() < min_angle - 1e-3
        })
        .count()
}

/// Rotate `curve` so a random interior vertex becomes index 0, in a random
/// traversal direction, and derive the start pose from indices 0 and 1.
pub fn choose_start(curve: &[Vec2], rng: &mut impl Rng) -> (Vec<Vec2>, StartPose) {
    let n = curve.len();
    let mut centerline = curve.to_vec();
    if n >= 3 {
        let idx = rng.gen_range(1..n - 1);
        if rng.gen_bool(0.5) {
            centerline.rotate_left(idx);
        } else {
            centerline.reverse();
            centerline.rotate_left(n - 1 - idx);
        }
    }
    let pos = centerline.first().copied().unwrap_or(Vec2::ZERO);
    let towards = centerline.get(1).copied().unwrap_or(pos) - pos;
    let start = StartPose {
        pos,
        heading: towards.y.atan2(towards.x),
    };
    (centerline, start)
}

/// Left/right border polylines offset by `path_width / 2` from the
/// centerline, sampled `segments` times and closed.
pub fn offset_borders(
    centerline: &[Vec2],
    path_width: f32,
    segments: usize,
) -> (Vec<Vec2>, Vec<Vec2>) {
    let n = centerline.len();
    let half = path_width * 0.5;
    let samples = segments.min(n);
    let mut left = Vec::with_capacity(samples + 1);
    let mut right = Vec::with_capacity(samples + 1);
    for k in 0..samples {
        let idx = k * n / samples;
        let p = centerline[idx];
        let dir = (centerline[(idx + 1) % n] - p).normalize_or_zero();
        // perp() turns clockwise on a y-down canvas: the driver's right.
        let normal = dir.perp();
        left.push(p - normal * half);
        right.push(p + normal * half);
    }
    if let (Some(&l), Some(&r)) = (left.first(), right.first()) {
        left.push(l);
        right.push(r);
    }
    (left, right)
}

/// Cut small loops out of a border polyline. For each edge A-B, the next
/// `window` edges are searched for a crossing C-D; B snaps to the crossing and
/// everything after B up to and including C is dropped, so the border runs
/// A-P-D. The same edge is then rescanned. Returns the number of cuts made.
pub fn repair_border(border: &mut Vec<Vec2>, window: usize, max_passes: usize) -> usize {
    let mut repairs = 0;
    for _ in 0..max_passes {
        let mut repaired = false;
        let mut i = 0;
        let mut budget = border.len() * (window + 1);
        while i + 1 < border.len() && budget > 0 {
            budget -= 1;
            let (a, b) = (border[i], border[i + 1]);
            let last_edge = border.len() - 1;
            let hit = ((i + 2)..(i + 2 + window).min(last_edge)).find_map(|j| {
                proper_segment_intersection(a, b, border[j], border[j + 1]).map(|p| (j, p))
            });
            match hit {
                Some((j, p)) => {
                    border[i + 1] = p;
                    border.drain((i + 2)..=j);
                    repairs += 1;
                    repaired = true;
                }
                None => i += 1,
            }
        }
        if !repaired {
            break;
        }
    }
    repairs
}

/// True if any left-border edge touches any right-border edge.
pub fn borders_cross(left: &[Vec2], right: &[Vec2]) -> bool {
    left.windows(2).any(|l| {
        right
            .windows(2)
            .any(|r| segments_intersect(l[0], l[1], r[0], r[1]))
    })
}
