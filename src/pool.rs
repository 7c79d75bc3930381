//! Evolutionary pool: spawns a generation of cars on the current course,
//! ticks them until every car has crashed, then breeds the next genome
//! population. Every `generations_per_track` generations the course is
//! thrown away and regenerated.

use ::rand::{Rng, SeedableRng};
use macroquad::color::Color;
use macroquad::math::Vec2;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::info;

use crate::car::{Car, CarParams, CarTelemetry, DriveError, DrivePolicy};
use crate::config::{ConfigError, SimConfig, DEFAULT_RNG_SEED};
use crate::course::Course;
use crate::genome::{AngleGenome, Genome, GenomeError};
use crate::mask::{Rasterizer, StrokeRasterizer};
use crate::stats::{DrivingStats, GenerationStats};
use crate::track::TrackError;

pub const EVOLVING_COLOR: Color = Color::new(0.95, 0.95, 0.95, 1.0);
/// #29ce2e
pub const REFERENCE_COLOR: Color = Color::new(0.161, 0.808, 0.180, 1.0);
pub const BASIC_COLOR: Color = Color::new(0.96, 0.65, 0.14, 1.0);
pub const PERCENTAGE_COLOR: Color = Color::new(0.29, 0.56, 0.89, 1.0);

const HISTORY_CAPACITY: usize = 200;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Track(#[from] TrackError),
    #[error(transparent)]
    Genome(#[from] GenomeError),
    #[error(transparent)]
    Drive(#[from] DriveError),
    #[error("no scored genomes to breed from")]
    EmptyPopulation,
}

/// What a call to `Pool::tick` did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PoolEvent {
    Running,
    GenerationEnded { generation: u32, best_fitness: f32 },
    TrackRegenerated { generation: u32, best_fitness: f32 },
}

/// Aggregate state for the HUD.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoolSnapshot {
    pub all_crashed: bool,
    pub generation: u32,
    pub generations_left: u32,
    pub alive: usize,
    pub population: usize,
    pub best_score: f32,
}

pub struct Pool {
    config: SimConfig,
    params: CarParams,
    rng: ChaCha8Rng,
    rasterizer: Box<dyn Rasterizer>,
    course: Course,
    cars: Vec<Car>,
    reference_cars: Vec<Car>,
    heuristic_cars: Vec<Car>,
    genomes: Vec<Genome>,
    generation: u32,
    generations_left: u32,
    pub history: GenerationStats,
    pub driving: DrivingStats,
}

impl Pool {
    pub fn new(config: SimConfig) -> Result<Self, PoolError> {
        Self::with_rasterizer(config, Box::new(StrokeRasterizer))
    }

    pub fn with_rasterizer(
        config: SimConfig,
        rasterizer: Box<dyn Rasterizer>,
    ) -> Result<Self, PoolError> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.rng_seed.unwrap_or(DEFAULT_RNG_SEED));
        let course = Course::generate(&config, rasterizer.as_ref(), &mut rng)?;
        let genomes = (0..config.population_size)
            .map(|_| Genome::random(&config, &mut rng))
            .collect();
        let mut pool = Self {
            params: CarParams::from_config(&config),
            generations_left: config.generations_per_track,
            rng,
            rasterizer,
            course,
            cars: Vec::new(),
            reference_cars: Vec::new(),
            heuristic_cars: Vec::new(),
            genomes,
            generation: 0,
            history: GenerationStats::new(HISTORY_CAPACITY),
            driving: DrivingStats::default(),
            config,
        };
        pool.reset();
        info!(
            population = pool.config.population_size,
            genome = ?pool.config.genome_kind,
            "pool ready"
        );
        Ok(pool)
    }

    /// Respawn every car: the genome population, then the reference group
    /// and the hand-written drivers when enabled.
    pub fn reset(&mut self) {
        let start = self.course.track.start;
        let jitter_radius = self.course.track.path_width * 0.5;
        let mut cars = Vec::with_capacity(self.genomes.len());
        for genome in &self.genomes {
            let pos = match genome {
                Genome::Angle(_) => jittered(start.pos, jitter_radius, &mut self.rng),
                Genome::Network(_) => start.pos,
            };
            cars.push(Car::new(
                pos,
                start.heading,
                DrivePolicy::from_genome(genome.clone()),
                EVOLVING_COLOR,
                self.params,
            ));
        }
        self.cars = cars;

        self.reference_cars.clear();
        if self.config.enable_reference_group {
            for _ in 0..self.config.population_size {
                let genome = AngleGenome::random(self.config.initial_angle_range, &mut self.rng);
                let pos = jittered(start.pos, jitter_radius, &mut self.rng);
                self.reference_cars.push(Car::new(
                    pos,
                    start.heading,
                    DrivePolicy::GenomeAngle(genome),
                    REFERENCE_COLOR,
                    self.params,
                ));
            }
        }

        self.heuristic_cars.clear();
        for _ in 0..self.config.heuristic_cars {
            for (policy, color) in [
                (DrivePolicy::Basic, BASIC_COLOR),
                (DrivePolicy::Percentage, PERCENTAGE_COLOR),
            ] {
                let pos = jittered(start.pos, jitter_radius, &mut self.rng);
                self.heuristic_cars
                    .push(Car::new(pos, start.heading, policy, color, self.params));
            }
        }
    }

    /// Every car on the course, bred or not.
    fn all_cars(&self) -> impl Iterator<Item = &Car> {
        self.cars
            .iter()
            .chain(self.reference_cars.iter())
            .chain(self.heuristic_cars.iter())
    }

    /// Advance every car one step. When the last car crashes the generation
    /// is scored, bred and respawned before returning.
    pub fn tick(&mut self) -> Result<PoolEvent, PoolError> {
        let cars = self
            .cars
            .iter_mut()
            .chain(self.reference_cars.iter_mut())
            .chain(self.heuristic_cars.iter_mut());
        for car in cars {
            car.tick(&self.course)?;
        }
        self.driving.update(
            self.cars
                .iter()
                .chain(self.reference_cars.iter())
                .chain(self.heuristic_cars.iter()),
        );

        if !self.all_crashed() {
            return Ok(PoolEvent::Running);
        }

        self.history.record(&self.cars);
        let best_fitness = self.best_score();
        self.end_of_generation()?;
        self.generation += 1;
        self.generations_left = self.generations_left.saturating_sub(1);
        info!(generation = self.generation, best_fitness, "generation finished");

        if self.generations_left == 0 {
            self.regenerate_track()?;
            Ok(PoolEvent::TrackRegenerated {
                generation: self.generation,
                best_fitness,
            })
        } else {
            self.reset();
            Ok(PoolEvent::GenerationEnded {
                generation: self.generation,
                best_fitness,
            })
        }
    }

    /// Rank the current cars and replace the genome population with their
    /// offspring.
    pub fn end_of_generation(&mut self) -> Result<(), PoolError> {
        let scored: Vec<(f32, Genome)> = self
            .cars
            .iter()
            .filter_map(|car| car.policy.genome().map(|g| (car.fitness, g)))
            .collect();
        self.genomes = next_generation(scored, &self.config, &mut self.rng)?;
        Ok(())
    }

    /// Replace the course and respawn the current genome population on it.
    pub fn regenerate_track(&mut self) -> Result<(), PoolError> {
        self.course = Course::generate(&self.config, self.rasterizer.as_ref(), &mut self.rng)?;
        self.generations_left = self.config.generations_per_track;
        info!(
            length = self.course.track.length,
            attempts = self.course.track.quality.attempts,
            "track regenerated"
        );
        self.driving.clear();
        self.reset();
        Ok(())
    }

    pub fn all_crashed(&self) -> bool {
        self.all_cars().all(Car::is_crashed)
    }

    fn best_score(&self) -> f32 {
        self.cars.iter().map(|c| c.fitness).fold(0.0, f32::max)
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            all_crashed: self.all_crashed(),
            generation: self.generation,
            generations_left: self.generations_left,
            alive: self.all_cars().filter(|c| !c.is_crashed()).count(),
            population: self.cars.len() + self.reference_cars.len() + self.heuristic_cars.len(),
            best_score: self.best_score(),
        }
    }

    pub fn telemetry(&self) -> impl Iterator<Item = CarTelemetry> + '_ {
        self.all_cars().map(Car::telemetry)
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    pub fn reference_cars(&self) -> &[Car] {
        &self.reference_cars
    }

    pub fn heuristic_cars(&self) -> &[Car] {
        &self.heuristic_cars
    }

    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

/// `center` moved in a random direction by a distance in `[1, radius)`.
fn jittered(center: Vec2, radius: f32, rng: &mut impl Rng) -> Vec2 {
    let distance = if radius > 1.0 {
        rng.gen_range(1.0..radius)
    } else {
        radius
    };
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    center + Vec2::from_angle(angle) * distance
}

/// Fitness-proportionate pick among the first `top_k` entries of `ranked`
/// (scores sorted high to low). Two independent draws, so both parents may
/// be the same car.
pub fn select_parents(ranked: &[f32], top_k: usize, rng: &mut impl Rng) -> (usize, usize) {
    let top = top_k.min(ranked.len()).max(1);
    let total: f32 = ranked.iter().take(top).sum();
    if total <= 0.0 {
        return (rng.gen_range(0..top), rng.gen_range(0..top));
    }
    let first = rng.gen::<f32>() * total;
    let second = rng.gen::<f32>() * total;
    (
        roulette(&ranked[..top], first),
        roulette(&ranked[..top], second),
    )
}

fn roulette(scores: &[f32], threshold: f32) -> usize {
    let mut cumulative = 0.0;
    for (i, score) in scores.iter().enumerate() {
        cumulative += score;
        if cumulative > threshold {
            return i;
        }
    }
    scores.len() - 1
}

/// Breed `config.population_size` genomes from scored parents. Angle genomes
/// are mixed and mutated; network genomes are cloned from the single best
/// and mutated.
pub fn next_generation(
    mut scored: Vec<(f32, Genome)>,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Result<Vec<Genome>, PoolError> {
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    let Some((_, best)) = scored.first() else {
        return Err(PoolError::EmptyPopulation);
    };

    let mut genomes = Vec::with_capacity(config.population_size);
    match best {
        Genome::Network(best) => {
            for _ in 0..config.population_size {
                let mut child = Genome::Network(best.copy()?);
                child.mutate(config, rng);
                genomes.push(child);
            }
        }
        Genome::Angle(_) => {
            let ranked: Vec<f32> = scored.iter().map(|(score, _)| *score).collect();
            for _ in 0..config.population_size {
                let (a, b) = select_parents(&ranked, config.selection_top_k, rng);
                let mut child = scored[a].1.mix(&scored[b].1)?;
                child.mutate(config, rng);
                genomes.push(child);
            }
        }
    }
    Ok(genomes)
}
