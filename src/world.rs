use macroquad::math::{vec2, Vec2};

/// Rectangular canvas the track is drawn on. Positions outside it are off-track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct World {
    pub width: f32,
    pub height: f32,
}

impl World {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, pos: Vec2) -> bool {
        pos.x >= 0.0 && pos.x <= self.width && pos.y >= 0.0 && pos.y <= self.height
    }

    /// Clamp position into canvas bounds.
    pub fn clamp(&self, pos: Vec2) -> Vec2 {
        self.clamp_inset(pos, 0.0)
    }

    /// Clamp position into the canvas shrunk by `margin` on every side.
    pub fn clamp_inset(&self, pos: Vec2, margin: f32) -> Vec2 {
        vec2(
            pos.x.clamp(margin, (self.width - margin).max(margin)),
            pos.y.clamp(margin, (self.height - margin).max(margin)),
        )
    }

    pub fn diagonal(&self) -> f32 {
        vec2(self.width, self.height).length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_inset_keeps_points_off_the_edge() {
        let world = World::new(200.0, 100.0);
        let p = world.clamp_inset(vec2(-10.0, 150.0), 20.0);
        assert_eq!(p, vec2(20.0, 80.0));
        assert!(world.contains(p));
    }

    #[test]
    fn contains_is_inclusive_of_edges() {
        let world = World::new(10.0, 10.0);
        assert!(world.contains(vec2(0.0, 10.0)));
        assert!(!world.contains(vec2(10.01, 5.0)));
    }
}
