use macroquad::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::geometry::rotate;

/// Distance reported by a ray that hit no wall.
pub const NO_HIT: f32 = -1.0;

/// Fixed fan of sensor rays, relative to the car heading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorFan {
    /// -45..=+45 degrees in 15 degree steps.
    Seven,
    /// -45..=+35 degrees in 10 degree steps.
    Nine,
}

impl SensorFan {
    pub fn ray_count(self) -> usize {
        match self {
            SensorFan::Seven => 7,
            SensorFan::Nine => 9,
        }
    }

    /// Relative ray angles in radians, left-most first.
    pub fn offsets(self) -> Vec<f32> {
        let step = match self {
            SensorFan::Seven => 15.0f32,
            SensorFan::Nine => 10.0,
        };
        (0..self.ray_count())
            .map(|i| (-45.0 + step * i as f32).to_radians())
            .collect()
    }
}

/// Result of one sensor sweep.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SensorReading {
    /// One distance per ray, `NO_HIT` when nothing is in front of it.
    pub distances: Vec<f32>,
    /// Nearest hit point per ray, for debug drawing.
    pub hits: Vec<Option<Vec2>>,
}

/// Nearest point where the half-line from `origin` along `dir` meets the
/// wall `a-b`. Wall endpoints and the origin itself never count.
pub fn cast_ray(origin: Vec2, dir: Vec2, a: Vec2, b: Vec2) -> Option<Vec2> {
    let ray_end = origin + dir;
    let den = (a.x - b.x) * (origin.y - ray_end.y) - (a.y - b.y) * (origin.x - ray_end.x);
    if den == 0.0 {
        return None;
    }
    let t = ((a.x - origin.x) * (origin.y - ray_end.y) - (a.y - origin.y) * (origin.x - ray_end.x))
        / den;
    let u = -((a.x - b.x) * (a.y - origin.y) - (a.y - b.y) * (a.x - origin.x)) / den;
    if t > 0.0 && t < 1.0 && u > 0.0 {
        Some(a + (b - a) * t)
    } else {
        None
    }
}

/// Cast every ray of `fan` from `origin` against `walls` and keep the
/// nearest hit per ray.
pub fn sense(
    origin: Vec2,
    heading: f32,
    fan: SensorFan,
    walls: impl Iterator<Item = (Vec2, Vec2)> + Clone,
) -> SensorReading {
    let forward = Vec2::from_angle(heading);
    let mut reading = SensorReading {
        distances: Vec::with_capacity(fan.ray_count()),
        hits: Vec::with_capacity(fan.ray_count()),
    };
    for offset in fan.offsets() {
        let dir = rotate(forward, offset);
        let nearest = walls
            .clone()
            .filter_map(|(a, b)| cast_ray(origin, dir, a, b))
            .map(|p| (origin.distance(p), p))
            .min_by(|x, y| x.0.total_cmp(&y.0));
        match nearest {
            Some((dist, p)) => {
                reading.distances.push(dist);
                reading.hits.push(Some(p));
            }
            None => {
                reading.distances.push(NO_HIT);
                reading.hits.push(None);
            }
        }
    }
    reading
}
