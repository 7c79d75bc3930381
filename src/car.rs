use std::collections::VecDeque;

use macroquad::color::Color;
use macroquad::math::Vec2;
use thiserror::Error;

use crate::config::SimConfig;
use crate::course::Course;
use crate::genome::{AngleGenome, Genome, GenomeError, NetworkGenome};
use crate::network::OUTPUT_SIZE;
use crate::sensory::{sense, SensorFan, SensorReading, NO_HIT};

/// Speed change of one network throttle command.
const SPEED_STEP: f32 = 1.0;

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("turn percentage {0} is outside [-1, 1]")]
    PercentageOutOfRange(f32),
    #[error("network output has no unique maximum")]
    AmbiguousOutput,
    #[error("network produced {0} outputs, expected 6")]
    OutputWidth(usize),
    #[error(transparent)]
    Genome(#[from] GenomeError),
}

/// Why a car stopped. Crashing is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrashReason {
    OffTrack,
    TimeToLive,
    OutOfBounds,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    Basic,
    Percentage,
    GenomeAngle,
    GenomeNetwork,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 4] = [
        PolicyKind::Basic,
        PolicyKind::Percentage,
        PolicyKind::GenomeAngle,
        PolicyKind::GenomeNetwork,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PolicyKind::Basic => "basic",
            PolicyKind::Percentage => "percentage",
            PolicyKind::GenomeAngle => "angle genome",
            PolicyKind::GenomeNetwork => "network genome",
        }
    }
}

/// How a car turns sensor distances into steering and throttle.
#[derive(Clone, Debug, PartialEq)]
pub enum DrivePolicy {
    Basic,
    Percentage,
    GenomeAngle(AngleGenome),
    GenomeNetwork(NetworkGenome),
}

impl DrivePolicy {
    pub fn from_genome(genome: Genome) -> Self {
        match genome {
            Genome::Angle(g) => DrivePolicy::GenomeAngle(g),
            Genome::Network(g) => DrivePolicy::GenomeNetwork(g),
        }
    }

    pub fn genome(&self) -> Option<Genome> {
        match self {
            DrivePolicy::GenomeAngle(g) => Some(Genome::Angle(*g)),
            DrivePolicy::GenomeNetwork(g) => Some(Genome::Network(g.clone())),
            DrivePolicy::Basic | DrivePolicy::Percentage => None,
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            DrivePolicy::Basic => PolicyKind::Basic,
            DrivePolicy::Percentage => PolicyKind::Percentage,
            DrivePolicy::GenomeAngle(_) => PolicyKind::GenomeAngle,
            DrivePolicy::GenomeNetwork(_) => PolicyKind::GenomeNetwork,
        }
    }
}

/// Per-car tuning pulled out of `SimConfig` once.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CarParams {
    pub min_speed: f32,
    pub max_speed: f32,
    pub initial_speed: f32,
    pub time_to_live: u32,
    pub trail_capacity: usize,
    pub trail_step: f32,
    pub lap_speed_boost: f32,
    pub basic_turn: f32,
    pub network_turn: f32,
    pub max_percentage_turn: f32,
    pub fan: SensorFan,
}

impl CarParams {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            min_speed: config.car_min_speed,
            max_speed: config.car_max_speed,
            initial_speed: config.initial_car_speed,
            time_to_live: config.car_time_to_live,
            trail_capacity: config.trail_capacity,
            trail_step: config.trail_step,
            lap_speed_boost: config.lap_speed_boost,
            basic_turn: config.basic_turn_deg.to_radians(),
            network_turn: config.network_turn_deg.to_radians(),
            max_percentage_turn: config.max_percentage_turn_deg.to_radians(),
            fan: config.sensor_fan,
        }
    }
}

/// What the renderer needs to draw one car.
#[derive(Clone, Debug)]
pub struct CarTelemetry {
    pub pos: Vec2,
    pub heading: f32,
    pub crashed: bool,
    pub color: Color,
    pub sensor_points: Vec<Vec2>,
    pub trail: Vec<Vec2>,
    pub lap: u32,
    pub score: f32,
    pub speed: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Steer {
    Left,
    Neutral,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Throttle {
    Accelerate,
    Neutral,
    Decelerate,
}

#[derive(Clone, Debug)]
pub struct Car {
    pub pos: Vec2,
    /// Radians; positive turns are clockwise on screen.
    pub heading: f32,
    pub speed: f32,
    pub sensors: SensorReading,
    pub crashed: Option<CrashReason>,
    pub traveled_distance: f32,
    pub trail: VecDeque<Vec2>,
    last_trail_point: Vec2,
    pub lap: u32,
    pub fitness: f32,
    pub time_to_live: u32,
    pub policy: DrivePolicy,
    pub color: Color,
    params: CarParams,
}

impl Car {
    pub fn new(pos: Vec2, heading: f32, policy: DrivePolicy, color: Color, params: CarParams) -> Self {
        let mut trail = VecDeque::with_capacity(params.trail_capacity);
        trail.push_back(pos);
        Self {
            pos,
            heading,
            speed: params.initial_speed.clamp(params.min_speed, params.max_speed),
            sensors: SensorReading::default(),
            crashed: None,
            traveled_distance: 0.0,
            trail,
            last_trail_point: pos,
            lap: 0,
            fitness: 0.0,
            time_to_live: params.time_to_live,
            policy,
            color,
            params,
        }
    }

    pub fn is_crashed(&self) -> bool {
        self.crashed.is_some()
    }

    /// Advance one step. Crashed cars stay frozen.
    pub fn tick(&mut self, course: &Course) -> Result<(), DriveError> {
        if self.crashed.is_some() {
            return Ok(());
        }
        let world = course.world();

        let next = self.pos + Vec2::from_angle(self.heading) * self.speed;
        let left_canvas = !world.contains(next);
        self.pos = world.clamp(next);
        self.record_trail();

        self.time_to_live = self.time_to_live.saturating_sub(1);
        if self.time_to_live == 0 {
            self.crashed = Some(CrashReason::TimeToLive);
            return Ok(());
        }
        if left_canvas {
            self.crashed = Some(CrashReason::OutOfBounds);
            return Ok(());
        }
        if !course.mask.is_drivable(self.pos) {
            self.crashed = Some(CrashReason::OffTrack);
            return Ok(());
        }

        self.fitness += course.surface.sample(self.pos).unwrap_or(0.0);
        self.update_lap(course.track.length);
        self.sensors = sense(self.pos, self.heading, self.params.fan, course.track.walls());
        self.drive(world.diagonal())
    }

    fn record_trail(&mut self) {
        let step = self.pos.distance(self.last_trail_point);
        if step <= self.params.trail_step {
            return;
        }
        self.traveled_distance += step;
        self.last_trail_point = self.pos;
        if self.trail.len() == self.params.trail_capacity {
            self.trail.pop_front();
        }
        self.trail.push_back(self.pos);
    }

    fn update_lap(&mut self, track_length: f32) {
        if track_length <= 0.0 {
            return;
        }
        let lap = (self.traveled_distance / track_length).floor() as u32;
        if lap > self.lap {
            self.lap = lap;
            self.change_speed(self.params.lap_speed_boost);
        }
    }

    /// Rotate the heading; the sensor fan follows since rays are stored
    /// relative to it.
    pub fn turn(&mut self, angle: f32) {
        self.heading += angle;
    }

    /// Turn by `percentage` of the maximum percentage turn. Out-of-range
    /// input leaves the car untouched.
    pub fn turn_by_percentage(&mut self, percentage: f32) -> Result<(), DriveError> {
        if !(-1.0..=1.0).contains(&percentage) {
            return Err(DriveError::PercentageOutOfRange(percentage));
        }
        self.turn(percentage * self.params.max_percentage_turn);
        Ok(())
    }

    pub fn change_speed(&mut self, delta: f32) {
        self.speed = (self.speed + delta).clamp(self.params.min_speed, self.params.max_speed);
    }

    /// Summed left and right clearance. Rays left of the heading have negative
    /// offsets; the straight-ahead ray and rays without a hit are skipped.
    pub fn clearance(&self) -> (f32, f32) {
        let mut left = 0.0;
        let mut right = 0.0;
        for (offset, &d) in self.params.fan.offsets().iter().zip(&self.sensors.distances) {
            if d == NO_HIT {
                continue;
            }
            if *offset < 0.0 {
                left += d;
            } else if *offset > 0.0 {
                right += d;
            }
        }
        (left, right)
    }

    /// Run the active policy once against the current sensor distances.
    pub fn drive(&mut self, diagonal: f32) -> Result<(), DriveError> {
        match &self.policy {
            DrivePolicy::Basic => {
                let magnitude = self.params.basic_turn;
                self.steer_towards_clearance(magnitude);
                Ok(())
            }
            DrivePolicy::GenomeAngle(genome) => {
                let magnitude = genome.turn_angle.to_radians();
                self.steer_towards_clearance(magnitude);
                Ok(())
            }
            DrivePolicy::Percentage => {
                let (left, right) = self.clearance();
                let total = left + right;
                if total <= 0.0 {
                    return Ok(());
                }
                self.turn_by_percentage(right / total)?;
                self.turn_by_percentage(-left / total)
            }
            DrivePolicy::GenomeNetwork(genome) => {
                let width = genome.network.output_size();
                if width != OUTPUT_SIZE {
                    return Err(DriveError::OutputWidth(width));
                }
                let inputs = network_inputs(&self.sensors.distances, diagonal);
                let outputs = genome.evaluate(&inputs)?;
                let (steer, throttle) = decode_command(&outputs)?;
                self.apply_command(steer, throttle);
                Ok(())
            }
        }
    }

    fn steer_towards_clearance(&mut self, magnitude: f32) {
        let (left, right) = self.clearance();
        if right > left {
            self.turn(magnitude);
        } else if left > right {
            self.turn(-magnitude);
        }
    }

    fn apply_command(&mut self, steer: Steer, throttle: Throttle) {
        match steer {
            Steer::Left => self.turn(-self.params.network_turn),
            Steer::Right => self.turn(self.params.network_turn),
            Steer::Neutral => {}
        }
        match throttle {
            Throttle::Accelerate => self.change_speed(SPEED_STEP),
            Throttle::Decelerate => self.change_speed(-SPEED_STEP),
            Throttle::Neutral => {}
        }
    }

    pub fn telemetry(&self) -> CarTelemetry {
        CarTelemetry {
            pos: self.pos,
            heading: self.heading,
            crashed: self.is_crashed(),
            color: self.color,
            sensor_points: self.sensors.hits.iter().flatten().copied().collect(),
            trail: self.trail.iter().copied().collect(),
            lap: self.lap,
            score: self.fitness,
            speed: self.speed,
        }
    }
}

/// Distances scaled by the canvas diagonal; a ray without a hit reads as
/// fully clear.
fn network_inputs(distances: &[f32], diagonal: f32) -> Vec<f32> {
    distances
        .iter()
        .map(|&d| {
            if d == NO_HIT || diagonal <= 0.0 {
                1.0
            } else {
                (d / diagonal).min(1.0)
            }
        })
        .collect()
}

fn unique_argmax(values: &[f32]) -> Result<usize, DriveError> {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    let ties = values.iter().filter(|v| **v == values[best]).count();
    if ties != 1 || values[best].is_nan() {
        return Err(DriveError::AmbiguousOutput);
    }
    Ok(best)
}

/// `outputs` holds two triples: steering, then throttle.
fn decode_command(outputs: &[f32]) -> Result<(Steer, Throttle), DriveError> {
    let steer = match unique_argmax(&outputs[..3])? {
        0 => Steer::Left,
        1 => Steer::Neutral,
        _ => Steer::Right,
    };
    let throttle = match unique_argmax(&outputs[3..])? {
        0 => Throttle::Accelerate,
        1 => Throttle::Neutral,
        _ => Throttle::Decelerate,
    };
    Ok((steer, throttle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::StrokeRasterizer;
    use crate::network::{FeedForward, Layer, LEARNING_RATE};
    use crate::track::{StartPose, Track, TrackQuality};
    use macroquad::color::WHITE;
    use macroquad::math::vec2;
    use std::f32::consts::{FRAC_PI_2, PI, TAU};

    fn ring_config() -> SimConfig {
        SimConfig {
            canvas_width: 200.0,
            canvas_height: 200.0,
            ..SimConfig::default()
        }
    }

    fn ring_points(radius: f32, n: usize) -> Vec<Vec2> {
        (0..n)
            .map(|i| {
                let a = i as f32 / n as f32 * TAU;
                vec2(100.0 + radius * a.cos(), 100.0 + radius * a.sin())
            })
            .collect()
    }

    fn closed(mut points: Vec<Vec2>) -> Vec<Vec2> {
        points.push(points[0]);
        points
    }

    fn ring_course() -> Course {
        let centerline = ring_points(60.0, 64);
        let track = Track {
            points: Vec::new(),
            hull: Vec::new(),
            start: StartPose {
                pos: centerline[0],
                heading: FRAC_PI_2,
            },
            length: crate::geometry::closed_length(&centerline),
            left_border: closed(ring_points(80.0, 64)),
            right_border: closed(ring_points(40.0, 64)),
            centerline,
            path_width: 40.0,
            quality: TrackQuality::default(),
        };
        Course::new(track, &StrokeRasterizer, &ring_config())
    }

    fn car_at(pos: Vec2, heading: f32, policy: DrivePolicy) -> Car {
        Car::new(pos, heading, policy, WHITE, CarParams::from_config(&ring_config()))
    }

    fn with_distances(mut car: Car, distances: &[f32]) -> Car {
        car.sensors.distances = distances.to_vec();
        car
    }

    #[test]
    fn one_tick_of_life_ends_in_a_crash() {
        let course = ring_course();
        let mut car = car_at(vec2(160.0, 100.0), FRAC_PI_2, DrivePolicy::Basic);
        car.time_to_live = 1;
        car.tick(&course).unwrap();
        assert_eq!(car.crashed, Some(CrashReason::TimeToLive));
    }

    #[test]
    fn crashed_car_is_frozen() {
        let course = ring_course();
        let mut car = car_at(vec2(100.0, 100.0), 0.0, DrivePolicy::Basic);
        car.tick(&course).unwrap();
        assert_eq!(car.crashed, Some(CrashReason::OffTrack));
        let (pos, ttl) = (car.pos, car.time_to_live);
        car.tick(&course).unwrap();
        assert_eq!(car.pos, pos);
        assert_eq!(car.time_to_live, ttl);
    }

    #[test]
    fn leaving_the_canvas_crashes_and_clamps() {
        let course = ring_course();
        let mut car = car_at(vec2(199.0, 100.0), 0.0, DrivePolicy::Basic);
        car.tick(&course).unwrap();
        assert_eq!(car.crashed, Some(CrashReason::OutOfBounds));
        assert_eq!(car.pos.x, 200.0);
    }

    #[test]
    fn driving_on_track_scores_and_senses_walls() {
        let course = ring_course();
        let mut car = car_at(vec2(100.0, 160.0), PI, DrivePolicy::Basic);
        car.tick(&course).unwrap();
        assert!(car.crashed.is_none());
        assert!(car.fitness > 0.0);
        assert_eq!(car.sensors.distances.len(), 7);
        assert!(car.sensors.distances.iter().any(|d| *d > 0.0));
    }

    #[test]
    fn traveled_distance_never_decreases() {
        let course = ring_course();
        let mut car = car_at(vec2(160.0, 100.0), FRAC_PI_2, DrivePolicy::Percentage);
        let mut last = car.traveled_distance;
        for _ in 0..500 {
            car.tick(&course).unwrap();
            assert!(car.traveled_distance >= last);
            last = car.traveled_distance;
            if car.is_crashed() {
                break;
            }
        }
        assert!(car.trail.len() <= 200);
    }

    #[test]
    fn trail_samples_only_after_a_full_step() {
        let mut car = car_at(vec2(10.0, 10.0), 0.0, DrivePolicy::Basic);
        car.pos = vec2(40.0, 10.0);
        car.record_trail();
        assert_eq!(car.trail.len(), 1);
        assert_eq!(car.traveled_distance, 0.0);
        car.pos = vec2(70.0, 10.0);
        car.record_trail();
        assert_eq!(car.trail.len(), 2);
        assert!((car.traveled_distance - 60.0).abs() < 1e-4);
    }

    #[test]
    fn completing_a_lap_boosts_speed_once() {
        let mut car = car_at(vec2(10.0, 10.0), 0.0, DrivePolicy::Basic);
        let speed = car.speed;
        car.traveled_distance = 101.0;
        car.update_lap(100.0);
        assert_eq!(car.lap, 1);
        assert!((car.speed - (speed + 1.0)).abs() < 1e-6);
        car.update_lap(100.0);
        assert!((car.speed - (speed + 1.0)).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_percentage_is_refused_without_turning() {
        let mut car = car_at(vec2(10.0, 10.0), 0.3, DrivePolicy::Percentage);
        let err = car.turn_by_percentage(1.5);
        assert!(matches!(err, Err(DriveError::PercentageOutOfRange(p)) if p == 1.5));
        assert_eq!(car.heading, 0.3);
    }

    #[test]
    fn basic_turns_toward_the_clearer_side() {
        let car = car_at(vec2(10.0, 10.0), 0.0, DrivePolicy::Basic);
        let mut car = with_distances(car, &[10.0, 10.0, 10.0, 99.0, 50.0, 50.0, 50.0]);
        car.drive(100.0).unwrap();
        assert!((car.heading - 8f32.to_radians()).abs() < 1e-6);

        let car = car_at(vec2(10.0, 10.0), 0.0, DrivePolicy::Basic);
        let mut car = with_distances(car, &[50.0, 10.0, 10.0, 0.0, 5.0, 5.0, 5.0]);
        car.drive(100.0).unwrap();
        assert!((car.heading + 8f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn missing_hits_do_not_count_as_clearance() {
        let car = car_at(vec2(10.0, 10.0), 0.0, DrivePolicy::Basic);
        let car = with_distances(car, &[NO_HIT, NO_HIT, NO_HIT, 5.0, 1.0, NO_HIT, 2.0]);
        assert_eq!(car.clearance(), (0.0, 3.0));
    }

    #[test]
    fn balanced_sensors_keep_the_heading() {
        let car = car_at(vec2(10.0, 10.0), 1.0, DrivePolicy::GenomeAngle(AngleGenome::new(30.0)));
        let mut car = with_distances(car, &[5.0, 5.0, 5.0, 1.0, 5.0, 5.0, 5.0]);
        car.drive(100.0).unwrap();
        assert_eq!(car.heading, 1.0);
    }

    #[test]
    fn angle_genome_uses_its_own_turn() {
        let car = car_at(vec2(10.0, 10.0), 0.0, DrivePolicy::GenomeAngle(AngleGenome::new(30.0)));
        let mut car = with_distances(car, &[1.0, 1.0, 1.0, 0.0, 9.0, 9.0, 9.0]);
        car.drive(100.0).unwrap();
        assert!((car.heading - 30f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn percentage_applies_both_halves() {
        let car = car_at(vec2(10.0, 10.0), 0.0, DrivePolicy::Percentage);
        let mut car = with_distances(car, &[5.0, 5.0, 0.0, 0.0, 10.0, 10.0, 10.0]);
        car.drive(100.0).unwrap();
        // right 30 / 40, left 10 / 40, net (0.75 - 0.25) * 40 degrees.
        assert!((car.heading - 20f32.to_radians()).abs() < 1e-5);
    }

    fn constant_network(biases: [f32; 6]) -> NetworkGenome {
        NetworkGenome {
            network: FeedForward {
                layers: vec![Layer {
                    inputs: 7,
                    outputs: 6,
                    weights: vec![0.0; 42],
                    biases: biases.to_vec(),
                }],
                learning_rate: LEARNING_RATE,
            },
        }
    }

    #[test]
    fn network_command_turns_and_accelerates() {
        let genome = constant_network([0.0, 0.0, 2.0, 3.0, 0.0, -1.0]);
        let car = car_at(vec2(10.0, 10.0), 0.0, DrivePolicy::GenomeNetwork(genome));
        let mut car = with_distances(car, &[NO_HIT; 7]);
        let speed = car.speed;
        car.drive(100.0).unwrap();
        assert!((car.heading - 10f32.to_radians()).abs() < 1e-6);
        assert!((car.speed - (speed + 1.0)).abs() < 1e-6);
    }

    #[test]
    fn tied_network_outputs_are_fatal() {
        let genome = constant_network([0.0; 6]);
        let car = car_at(vec2(10.0, 10.0), 0.0, DrivePolicy::GenomeNetwork(genome));
        let mut car = with_distances(car, &[3.0; 7]);
        assert!(matches!(car.drive(100.0), Err(DriveError::AmbiguousOutput)));
        assert_eq!(car.heading, 0.0);
    }

    #[test]
    fn network_with_wrong_output_width_is_rejected() {
        let mut genome = constant_network([0.0, 0.0, 2.0, 3.0, 0.0, -1.0]);
        let layer = &mut genome.network.layers[0];
        layer.outputs = 4;
        layer.weights.truncate(28);
        layer.biases.truncate(4);
        let car = car_at(vec2(10.0, 10.0), 0.0, DrivePolicy::GenomeNetwork(genome));
        let mut car = with_distances(car, &[NO_HIT; 7]);
        assert!(matches!(car.drive(100.0), Err(DriveError::OutputWidth(4))));
        assert_eq!(car.heading, 0.0);
    }

    #[test]
    fn speed_stays_within_limits() {
        let mut car = car_at(vec2(10.0, 10.0), 0.0, DrivePolicy::Basic);
        car.change_speed(100.0);
        assert_eq!(car.speed, 8.0);
        car.change_speed(-100.0);
        assert_eq!(car.speed, 1.0);
    }

    #[test]
    fn network_inputs_treat_missing_hits_as_clear() {
        let inputs = network_inputs(&[NO_HIT, 50.0, 500.0], 100.0);
        assert_eq!(inputs, vec![1.0, 0.5, 1.0]);
    }

    #[test]
    fn genome_round_trips_through_the_policy() {
        let policy = DrivePolicy::from_genome(Genome::Angle(AngleGenome::new(4.0)));
        assert_eq!(policy.kind(), PolicyKind::GenomeAngle);
        assert_eq!(policy.genome(), Some(Genome::Angle(AngleGenome::new(4.0))));
        assert_eq!(DrivePolicy::Basic.genome(), None);
    }
}
