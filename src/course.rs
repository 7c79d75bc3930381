use ::rand::Rng;
use macroquad::math::{vec2, Vec2};
use tracing::debug;

use crate::config::SimConfig;
use crate::mask::{RasterMask, Rasterizer};
use crate::track::{Track, TrackError};
use crate::world::World;

/// Progress in `[0, 1]` for every drivable pixel: the index of the nearest
/// centerline vertex divided by the last index.
#[derive(Clone, Debug)]
pub struct ScoringSurface {
    width: usize,
    values: Vec<Option<f32>>,
}

impl ScoringSurface {
    pub fn build(mask: &RasterMask, centerline: &[Vec2]) -> Self {
        let (width, height) = (mask.width(), mask.height());
        let last = centerline.len().saturating_sub(1).max(1) as f32;
        let mut values = vec![None; width * height];
        for y in 0..height {
            for x in 0..width {
                if !mask.is_drivable_pixel(x, y) {
                    continue;
                }
                let center = vec2(x as f32 + 0.5, y as f32 + 0.5);
                let nearest = centerline
                    .iter()
                    .enumerate()
                    .min_by(|a, b| {
                        a.1.distance_squared(center)
                            .total_cmp(&b.1.distance_squared(center))
                    })
                    .map(|(i, _)| i);
                values[y * width + x] = nearest.map(|i| i as f32 / last);
            }
        }
        Self { width, values }
    }

    /// `None` off the road or outside the canvas.
    pub fn sample(&self, pos: Vec2) -> Option<f32> {
        if pos.x < 0.0 || pos.y < 0.0 {
            return None;
        }
        let x = pos.x as usize;
        if x >= self.width {
            return None;
        }
        self.values
            .get(pos.y as usize * self.width + x)
            .copied()
            .flatten()
    }
}

/// A track together with the mask and scoring surface derived from it.
/// Built once per track and never edited.
#[derive(Clone, Debug)]
pub struct Course {
    pub track: Track,
    pub mask: RasterMask,
    pub surface: ScoringSurface,
}

impl Course {
    pub fn new(track: Track, rasterizer: &dyn Rasterizer, config: &SimConfig) -> Self {
        let width = config.canvas_width.ceil() as usize;
        let height = config.canvas_height.ceil() as usize;
        let rgba = rasterizer.rasterize(&track, width, height, config.off_track_color);
        let mask = RasterMask::from_rgba(width, height, &rgba, config.off_track_color);
        let surface = ScoringSurface::build(&mask, &track.centerline);
        debug!(
            drivable = mask.drivable_count(),
            length = track.length,
            "course rasterized"
        );
        Self {
            track,
            mask,
            surface,
        }
    }

    pub fn generate(
        config: &SimConfig,
        rasterizer: &dyn Rasterizer,
        rng: &mut impl Rng,
    ) -> Result<Self, TrackError> {
        let track = Track::generate(config, rng)?;
        Ok(Self::new(track, rasterizer, config))
    }

    pub fn world(&self) -> World {
        World::new(self.mask.width() as f32, self.mask.height() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::StrokeRasterizer;
    use ::rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn small_config() -> SimConfig {
        SimConfig {
            canvas_width: 300.0,
            canvas_height: 220.0,
            point_margin: 30.0,
            min_point_separation: 40.0,
            initial_point_count: 5,
            max_initial_point_count: 6,
            path_width: crate::config::PathWidth::Fixed(20.0),
            ..SimConfig::default()
        }
    }

    #[test]
    fn start_scores_near_zero_and_values_stay_in_unit_range() {
        let config = small_config();
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        let course = Course::generate(&config, &StrokeRasterizer, &mut rng).unwrap();

        let start = course.track.start.pos;
        assert!(course.mask.is_drivable(start));
        let at_start = course.surface.sample(start).unwrap();
        let n = course.track.centerline.len() as f32;
        assert!(at_start < 2.0 / n || at_start > 1.0 - 2.0 / n);

        let mid = course.track.centerline[course.track.centerline.len() / 2];
        let at_mid = course.surface.sample(mid).unwrap();
        assert!((at_mid - 0.5).abs() < 0.05);

        for y in (0..220).step_by(7) {
            for x in (0..300).step_by(7) {
                let p = vec2(x as f32 + 0.5, y as f32 + 0.5);
                match course.surface.sample(p) {
                    Some(v) => {
                        assert!((0.0..=1.0).contains(&v));
                        assert!(course.mask.is_drivable(p));
                    }
                    None => assert!(!course.mask.is_drivable(p)),
                }
            }
        }
    }

    #[test]
    fn outside_the_canvas_is_unscored() {
        let config = small_config();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let course = Course::generate(&config, &StrokeRasterizer, &mut rng).unwrap();
        assert_eq!(course.surface.sample(vec2(-1.0, 10.0)), None);
        assert_eq!(course.surface.sample(vec2(300.5, 10.0)), None);
        assert_eq!(course.surface.sample(vec2(10.0, 500.0)), None);
        assert_eq!(course.world(), World::new(300.0, 220.0));
    }
}
