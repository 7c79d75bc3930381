//! Drivable-area mask.
//!
//! Whatever draws the track hands back an RGBA buffer; every pixel that does
//! not carry the off-track color is road.

use macroquad::math::{vec2, Vec2};

use crate::config::ROAD_COLOR;
use crate::geometry::closest_point_on_segment;
use crate::track::Track;

/// Renders a track into a `width * height * 4` RGBA buffer.
pub trait Rasterizer {
    fn rasterize(&self, track: &Track, width: usize, height: usize, off_track: [u8; 3]) -> Vec<u8>;
}

/// Paints the off-track background and strokes the closed centerline at the
/// track's path width.
#[derive(Clone, Copy, Debug, Default)]
pub struct StrokeRasterizer;

impl Rasterizer for StrokeRasterizer {
    fn rasterize(&self, track: &Track, width: usize, height: usize, off_track: [u8; 3]) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(width * height * 4);
        for _ in 0..width * height {
            rgba.extend_from_slice(&[off_track[0], off_track[1], off_track[2], 255]);
        }

        let half = track.path_width * 0.5;
        let n = track.centerline.len();
        for i in 0..n {
            let a = track.centerline[i];
            let b = track.centerline[(i + 1) % n];
            let min = a.min(b) - Vec2::splat(half);
            let max = a.max(b) + Vec2::splat(half);
            let x0 = min.x.floor().max(0.0) as usize;
            let y0 = min.y.floor().max(0.0) as usize;
            let x1 = (max.x.ceil().max(0.0) as usize).min(width);
            let y1 = (max.y.ceil().max(0.0) as usize).min(height);
            for y in y0..y1 {
                for x in x0..x1 {
                    let center = vec2(x as f32 + 0.5, y as f32 + 0.5);
                    if closest_point_on_segment(a, b, center).distance(center) <= half {
                        let k = (y * width + x) * 4;
                        rgba[k..k + 3].copy_from_slice(&ROAD_COLOR);
                    }
                }
            }
        }
        rgba
    }
}

/// Per-pixel on/off classification of the canvas.
#[derive(Clone, Debug)]
pub struct RasterMask {
    width: usize,
    height: usize,
    drivable: Vec<bool>,
}

impl RasterMask {
    /// Classify an RGBA buffer against the off-track color. A buffer shorter
    /// than `width * height` pixels leaves the missing pixels off-track.
    pub fn from_rgba(width: usize, height: usize, rgba: &[u8], off_track: [u8; 3]) -> Self {
        let mut drivable = vec![false; width * height];
        for (cell, px) in drivable.iter_mut().zip(rgba.chunks_exact(4)) {
            *cell = px[..3] != off_track;
        }
        Self {
            width,
            height,
            drivable,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel index under `pos`, `None` outside the canvas.
    pub fn index(&self, pos: Vec2) -> Option<usize> {
        if pos.x < 0.0 || pos.y < 0.0 {
            return None;
        }
        let (x, y) = (pos.x as usize, pos.y as usize);
        (x < self.width && y < self.height).then_some(y * self.width + x)
    }

    pub fn is_drivable(&self, pos: Vec2) -> bool {
        self.index(pos).is_some_and(|i| self.drivable[i])
    }

    pub fn is_drivable_pixel(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.drivable[y * self.width + x]
    }

    pub fn drivable_count(&self) -> usize {
        self.drivable.iter().filter(|d| **d).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{StartPose, TrackQuality};

    fn ring_track() -> Track {
        let centerline: Vec<Vec2> = (0..64)
            .map(|i| {
                let a = i as f32 / 64.0 * std::f32::consts::TAU;
                vec2(100.0 + 60.0 * a.cos(), 100.0 + 60.0 * a.sin())
            })
            .collect();
        Track {
            points: Vec::new(),
            hull: Vec::new(),
            start: StartPose {
                pos: centerline[0],
                heading: std::f32::consts::FRAC_PI_2,
            },
            length: crate::geometry::closed_length(&centerline),
            centerline,
            path_width: 20.0,
            left_border: Vec::new(),
            right_border: Vec::new(),
            quality: TrackQuality::default(),
        }
    }

    #[test]
    fn stroke_marks_the_ring_and_leaves_the_middle_off_track() {
        let off = [10, 200, 10];
        let rgba = StrokeRasterizer.rasterize(&ring_track(), 200, 200, off);
        assert_eq!(rgba.len(), 200 * 200 * 4);
        let mask = RasterMask::from_rgba(200, 200, &rgba, off);

        assert!(mask.is_drivable(vec2(160.0, 100.0)));
        assert!(mask.is_drivable(vec2(100.0, 45.0)));
        assert!(!mask.is_drivable(vec2(100.0, 100.0)));
        assert!(!mask.is_drivable(vec2(5.0, 5.0)));
    }

    #[test]
    fn outside_the_canvas_is_never_drivable() {
        let mask = RasterMask::from_rgba(2, 2, &[0; 16], [255, 255, 255]);
        assert!(mask.is_drivable(vec2(1.5, 1.5)));
        assert!(!mask.is_drivable(vec2(-0.5, 1.0)));
        assert!(!mask.is_drivable(vec2(2.0, 1.0)));
        assert_eq!(mask.drivable_count(), 4);
    }

    #[test]
    fn short_buffer_leaves_missing_pixels_off_track() {
        let mask = RasterMask::from_rgba(2, 2, &[0; 8], [255, 255, 255]);
        assert_eq!(mask.drivable_count(), 2);
        assert!(!mask.is_drivable_pixel(1, 1));
    }
}
