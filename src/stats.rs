//! Generation history and per-policy driving statistics for the HUD.

use std::collections::HashMap;

use crate::car::{Car, PolicyKind};

/// Fixed-capacity history of one metric, oldest sample dropped first.
pub struct RingBuffer {
    data: Vec<f32>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity.max(1)],
            head: 0,
            len: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn push(&mut self, value: f32) {
        let capacity = self.capacity();
        self.data[self.head] = value;
        self.head = (self.head + 1) % capacity;
        self.len = (self.len + 1).min(capacity);
    }

    /// Samples in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        let capacity = self.capacity();
        let start = if self.len < capacity { 0 } else { self.head };
        (0..self.len).map(move |i| self.data[(start + i) % capacity])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn last(&self) -> Option<f32> {
        if self.len == 0 {
            return None;
        }
        let capacity = self.capacity();
        Some(self.data[(self.head + capacity - 1) % capacity])
    }
}

/// Best and mean fitness of every finished generation.
pub struct GenerationStats {
    pub best_fitness: RingBuffer,
    pub mean_fitness: RingBuffer,
    pub best_laps: RingBuffer,
}

impl GenerationStats {
    pub fn new(capacity: usize) -> Self {
        Self {
            best_fitness: RingBuffer::new(capacity),
            mean_fitness: RingBuffer::new(capacity),
            best_laps: RingBuffer::new(capacity),
        }
    }

    pub fn record(&mut self, cars: &[Car]) {
        if cars.is_empty() {
            return;
        }
        let best = cars.iter().map(|c| c.fitness).fold(f32::MIN, f32::max);
        let mean = cars.iter().map(|c| c.fitness).sum::<f32>() / cars.len() as f32;
        let laps = cars.iter().map(|c| c.lap).max().unwrap_or(0);
        self.best_fitness.push(best);
        self.mean_fitness.push(mean);
        self.best_laps.push(laps as f32);
    }
}

/// Latest figures for the cars driving one policy.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PolicyStats {
    pub lap: u32,
    pub distance: f32,
    pub speed: f32,
    pub max_speed: f32,
    /// Speed of the most recent car seen crashed.
    pub last_crash_speed: f32,
    pub score: f32,
}

#[derive(Default)]
pub struct DrivingStats {
    pub by_policy: HashMap<PolicyKind, PolicyStats>,
}

impl DrivingStats {
    /// Fold the current state of `cars` in; later cars overwrite the
    /// current-value fields of earlier ones.
    pub fn update<'a>(&mut self, cars: impl IntoIterator<Item = &'a Car>) {
        for car in cars {
            let entry = self.by_policy.entry(car.policy.kind()).or_default();
            entry.max_speed = entry.max_speed.max(car.speed);
            if car.is_crashed() {
                entry.last_crash_speed = car.speed;
            }
            entry.lap = car.lap;
            entry.distance = car.traveled_distance;
            entry.speed = car.speed;
            entry.score = car.fitness;
        }
    }

    /// Policies in display order.
    pub fn rows(&self) -> impl Iterator<Item = (PolicyKind, &PolicyStats)> {
        PolicyKind::ALL
            .into_iter()
            .filter_map(|kind| self.by_policy.get(&kind).map(|s| (kind, s)))
    }

    pub fn clear(&mut self) {
        self.by_policy.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::car::{CarParams, DrivePolicy};
    use crate::config::SimConfig;
    use macroquad::color::WHITE;
    use macroquad::math::vec2;

    fn car(policy: DrivePolicy, fitness: f32, speed: f32) -> Car {
        let mut car = Car::new(
            vec2(0.0, 0.0),
            0.0,
            policy,
            WHITE,
            CarParams::from_config(&SimConfig::default()),
        );
        car.fitness = fitness;
        car.speed = speed;
        car
    }

    #[test]
    fn ring_buffer_iterates_in_insertion_order_after_wrap() {
        let mut buf = RingBuffer::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            buf.push(v);
        }
        assert_eq!(buf.iter().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
        assert_eq!(buf.last(), Some(4.0));
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn generation_stats_track_best_and_mean() {
        let mut stats = GenerationStats::new(4);
        stats.record(&[
            car(DrivePolicy::Basic, 10.0, 2.0),
            car(DrivePolicy::Basic, 30.0, 2.0),
        ]);
        assert_eq!(stats.best_fitness.last(), Some(30.0));
        assert_eq!(stats.mean_fitness.last(), Some(20.0));
        stats.record(&[]);
        assert_eq!(stats.best_fitness.len(), 1);
    }

    #[test]
    fn policy_stats_keep_max_speed_and_last_crash() {
        let mut stats = DrivingStats::default();
        let fast = car(DrivePolicy::Percentage, 1.0, 7.0);
        let mut crashed = car(DrivePolicy::Percentage, 2.0, 3.0);
        crashed.crashed = Some(crate::car::CrashReason::OffTrack);
        stats.update([&fast, &crashed]);

        let rows: Vec<_> = stats.rows().collect();
        assert_eq!(rows.len(), 1);
        let (kind, row) = rows[0];
        assert_eq!(kind, PolicyKind::Percentage);
        assert_eq!(row.max_speed, 7.0);
        assert_eq!(row.last_crash_speed, 3.0);
        assert_eq!(row.speed, 3.0);
        assert_eq!(row.score, 2.0);
    }
}
