// All tunable simulation constants in one place.

use std::path::Path;

use ::rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sensory::SensorFan;

// Canvas
pub const CANVAS_WIDTH: f32 = 800.0;
pub const CANVAS_HEIGHT: f32 = 600.0;
pub const POINT_MARGIN: f32 = 50.0;

// Track geometry
pub const INITIAL_POINT_COUNT: usize = 8;
pub const MAX_INITIAL_POINT_COUNT: usize = 12;
pub const MIN_POINT_SEPARATION: f32 = 80.0;
pub const HULL_DIFFICULTY: f32 = 500.0; // smaller = more concave
pub const MIN_HULL_ANGLE_DEG: f32 = 60.0;
pub const PATH_WIDTH: f32 = 50.0;
pub const PUSH_APART_MAX_ITERATIONS: usize = 100;
pub const ANGLE_FIX_MAX_ITERATIONS: usize = 10;
pub const SMOOTHING_ROUNDS: usize = 5;
pub const BORDER_SEGMENTS: usize = 50;
pub const BORDER_REPAIR_WINDOW: usize = 10;
pub const BORDER_REPAIR_PASSES: usize = 100;
pub const MAX_TRACK_ATTEMPTS: usize = 500;
pub const OFF_TRACK_COLOR: [u8; 3] = [34, 120, 60];
pub const ROAD_COLOR: [u8; 3] = [34, 34, 38];

// Cars
pub const CAR_MIN_SPEED: f32 = 1.0;
pub const CAR_MAX_SPEED: f32 = 8.0;
pub const INITIAL_CAR_SPEED: f32 = 2.0;
pub const CAR_TIME_TO_LIVE: u32 = 1500;
pub const TRAIL_CAPACITY: usize = 200;
pub const TRAIL_STEP: f32 = 50.0;
pub const LAP_SPEED_BOOST: f32 = 1.0;
pub const BASIC_TURN_DEG: f32 = 8.0;
pub const NETWORK_TURN_DEG: f32 = 10.0;
pub const MAX_PERCENTAGE_TURN_DEG: f32 = 40.0;

// Evolution
pub const POPULATION_SIZE: usize = 100;
pub const GENERATIONS_PER_TRACK: u32 = 25;
pub const SELECTION_TOP_K: usize = 10;
pub const MUTATION_RATE: f32 = 0.1;
pub const NETWORK_MUTATION_SCALE: f32 = 0.1;
pub const NETWORK_MUTATION_PROBABILITY: f64 = 0.5;
pub const INITIAL_ANGLE_RANGE: f32 = 70.0;
pub const DEFAULT_RNG_SEED: u64 = 0x5241_4345_4C49_4E45;

/// Which genome variant a population evolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenomeKind {
    Angle,
    Network,
}

/// Track width, either fixed or drawn uniformly per generated track.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathWidth {
    Fixed(f32),
    Range { min: f32, max: f32 },
}

impl PathWidth {
    pub fn sample(&self, rng: &mut impl Rng) -> f32 {
        match *self {
            PathWidth::Fixed(w) => w,
            PathWidth::Range { min, max } if max > min => rng.gen_range(min..max),
            PathWidth::Range { min, .. } => min,
        }
    }

    /// Widest track this setting can produce.
    pub fn max(&self) -> f32 {
        match *self {
            PathWidth::Fixed(w) => w,
            PathWidth::Range { min, max } => min.max(max),
        }
    }

    fn min(&self) -> f32 {
        match *self {
            PathWidth::Fixed(w) => w,
            PathWidth::Range { min, max } => min.min(max),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Load-time configuration for track generation, cars and the evolutionary pool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimConfig {
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub point_margin: f32,

    pub initial_point_count: usize,
    pub max_initial_point_count: usize,
    pub min_point_separation: f32,
    pub hull_difficulty: f32,
    pub min_hull_angle_deg: f32,
    pub path_width: PathWidth,
    pub push_apart_max_iterations: usize,
    pub angle_fix_max_iterations: usize,
    pub smoothing_rounds: usize,
    pub border_segments: usize,
    pub border_repair_window: usize,
    pub border_repair_passes: usize,
    pub max_track_attempts: usize,
    pub off_track_color: [u8; 3],

    pub car_min_speed: f32,
    pub car_max_speed: f32,
    pub initial_car_speed: f32,
    pub car_time_to_live: u32,
    pub trail_capacity: usize,
    pub trail_step: f32,
    pub lap_speed_boost: f32,
    pub basic_turn_deg: f32,
    pub network_turn_deg: f32,
    pub max_percentage_turn_deg: f32,
    pub sensor_fan: SensorFan,

    pub genome_kind: GenomeKind,
    pub population_size: usize,
    pub generations_per_track: u32,
    pub selection_top_k: usize,
    pub mutation_rate: f32,
    pub network_mutation_scale: f32,
    pub network_mutation_probability: f64,
    pub initial_angle_range: f32,
    pub enable_reference_group: bool,
    /// Cars per hand-written policy (basic and percentage) spawned each
    /// generation. They are scored but never bred.
    pub heuristic_cars: usize,
    pub rng_seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            canvas_width: CANVAS_WIDTH,
            canvas_height: CANVAS_HEIGHT,
            point_margin: POINT_MARGIN,
            initial_point_count: INITIAL_POINT_COUNT,
            max_initial_point_count: MAX_INITIAL_POINT_COUNT,
            min_point_separation: MIN_POINT_SEPARATION,
            hull_difficulty: HULL_DIFFICULTY,
            min_hull_angle_deg: MIN_HULL_ANGLE_DEG,
            path_width: PathWidth::Fixed(PATH_WIDTH),
            push_apart_max_iterations: PUSH_APART_MAX_ITERATIONS,
            angle_fix_max_iterations: ANGLE_FIX_MAX_ITERATIONS,
            smoothing_rounds: SMOOTHING_ROUNDS,
            border_segments: BORDER_SEGMENTS,
            border_repair_window: BORDER_REPAIR_WINDOW,
            border_repair_passes: BORDER_REPAIR_PASSES,
            max_track_attempts: MAX_TRACK_ATTEMPTS,
            off_track_color: OFF_TRACK_COLOR,
            car_min_speed: CAR_MIN_SPEED,
            car_max_speed: CAR_MAX_SPEED,
            initial_car_speed: INITIAL_CAR_SPEED,
            car_time_to_live: CAR_TIME_TO_LIVE,
            trail_capacity: TRAIL_CAPACITY,
            trail_step: TRAIL_STEP,
            lap_speed_boost: LAP_SPEED_BOOST,
            basic_turn_deg: BASIC_TURN_DEG,
            network_turn_deg: NETWORK_TURN_DEG,
            max_percentage_turn_deg: MAX_PERCENTAGE_TURN_DEG,
            sensor_fan: SensorFan::Seven,
            genome_kind: GenomeKind::Network,
            population_size: POPULATION_SIZE,
            generations_per_track: GENERATIONS_PER_TRACK,
            selection_top_k: SELECTION_TOP_K,
            mutation_rate: MUTATION_RATE,
            network_mutation_scale: NETWORK_MUTATION_SCALE,
            network_mutation_probability: NETWORK_MUTATION_PROBABILITY,
            initial_angle_range: INITIAL_ANGLE_RANGE,
            enable_reference_group: false,
            heuristic_cars: 0,
            rng_seed: None,
        }
    }
}

impl SimConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let inner_w = self.canvas_width - 2.0 * self.point_margin;
        let inner_h = self.canvas_height - 2.0 * self.point_margin;
        if inner_w <= 0.0 || inner_h <= 0.0 {
            return invalid("canvas must be larger than twice the point margin");
        }
        if self.initial_point_count < 3 {
            return invalid("initialPointCount must be at least 3");
        }
        if self.max_initial_point_count < self.initial_point_count {
            return invalid("maxInitialPointCount must not be below initialPointCount");
        }
        if self.min_point_separation < 0.0 || self.hull_difficulty <= 0.0 {
            return invalid("minPointSeparation and hullDifficulty must be positive");
        }
        if !(0.0..180.0).contains(&self.min_hull_angle_deg) {
            return invalid("minHullAngleDeg must be within [0, 180)");
        }
        if self.path_width.min() <= 0.0 || self.path_width.max() >= inner_w.min(inner_h) {
            return invalid("pathWidth must be positive and fit inside the canvas");
        }
        if self.smoothing_rounds > 8 {
            return invalid("smoothingRounds above 8 produces unusably dense centerlines");
        }
        if self.border_segments < 3 || self.max_track_attempts == 0 {
            return invalid("borderSegments must be at least 3 and maxTrackAttempts non-zero");
        }
        if self.off_track_color == ROAD_COLOR {
            return invalid("offTrackColor must differ from the road color");
        }
        if self.car_min_speed < 0.0
            || self.car_min_speed > self.car_max_speed
            || !(self.car_min_speed..=self.car_max_speed).contains(&self.initial_car_speed)
        {
            return invalid("car speeds must satisfy 0 <= min <= initial <= max");
        }
        if self.car_time_to_live == 0 {
            return invalid("carTimeToLive must be non-zero");
        }
        if self.trail_capacity == 0 || self.trail_step <= 0.0 {
            return invalid("trail capacity and step must be positive");
        }
        if self.population_size == 0 || self.selection_top_k == 0 {
            return invalid("populationSize and selectionTopK must be non-zero");
        }
        if !(self.mutation_rate >= 0.0) || !(0.0..=1.0).contains(&self.network_mutation_probability) {
            return invalid("mutation rates must be non-negative probabilities");
        }
        if !(self.network_mutation_scale >= 0.0) {
            return invalid("networkMutationScale must be non-negative");
        }
        if !(self.initial_angle_range > 0.0) {
            return invalid("initialAngleRange must be positive");
        }
        if self.genome_kind == GenomeKind::Network
            && self.sensor_fan.ray_count() != crate::network::INPUT_SIZE
        {
            return invalid("network genomes need a sensor fan matching the network input width");
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid(reason.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn json_overrides_merge_with_defaults() {
        let config = SimConfig::from_json_str(
            r#"{ "canvasWidth": 1000, "pathWidth": { "min": 40, "max": 60 }, "genomeKind": "angle" }"#,
        )
        .unwrap();
        assert_eq!(config.canvas_width, 1000.0);
        assert_eq!(config.canvas_height, CANVAS_HEIGHT);
        assert_eq!(config.path_width, PathWidth::Range { min: 40.0, max: 60.0 });
        assert_eq!(config.genome_kind, GenomeKind::Angle);
    }

    #[test]
    fn network_population_rejects_nine_ray_fan() {
        let err = SimConfig::from_json_str(r#"{ "sensorFan": "nine", "genomeKind": "network" }"#);
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn margin_too_tight_is_rejected() {
        let config = SimConfig {
            canvas_width: 90.0,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_angle_range_is_rejected() {
        for range in [0.0, -5.0, f32::NAN] {
            let config = SimConfig {
                genome_kind: GenomeKind::Angle,
                initial_angle_range: range,
                ..SimConfig::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn negative_mutation_scale_is_rejected() {
        let config = SimConfig {
            network_mutation_scale: -0.1,
            ..SimConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        let config = SimConfig {
            network_mutation_scale: 0.0,
            ..SimConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
