use ::rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{GenomeKind, SimConfig};
use crate::network::FeedForward;

#[derive(Debug, Error)]
pub enum GenomeError {
    #[error("network genomes have no crossover; clone the best performer instead")]
    CrossoverUnsupported,
    #[error("cannot combine a {0:?} genome with a {1:?} genome")]
    VariantMismatch(GenomeKind, GenomeKind),
    #[error("network expects {expected} inputs, sensors provide {actual}")]
    InputWidthMismatch { expected: usize, actual: usize },
    #[error("network round trip failed: {0}")]
    Codec(#[from] bincode::Error),
}

/// A single steering magnitude in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AngleGenome {
    pub turn_angle: f32,
}

impl AngleGenome {
    pub fn new(turn_angle: f32) -> Self {
        Self { turn_angle }
    }

    /// Uniform in `(-range, range)` degrees.
    pub fn random(range: f32, rng: &mut impl Rng) -> Self {
        Self::new(rng.gen_range(-range..range))
    }

    /// Child angle is the mean of both parents.
    pub fn mix(&self, other: &AngleGenome) -> AngleGenome {
        AngleGenome::new((self.turn_angle + other.turn_angle) / 2.0)
    }

    pub fn mutate(&mut self, rate: f32, rng: &mut impl Rng) {
        let factor = rng.gen_range(-rate..=rate);
        self.turn_angle += self.turn_angle * factor;
    }
}

/// Weights and biases of a fixed-topology driving network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkGenome {
    pub network: FeedForward,
}

impl NetworkGenome {
    pub fn random(rng: &mut impl Rng) -> Self {
        Self {
            network: FeedForward::driver(rng),
        }
    }

    /// Deep copy through the binary codec, so topology, weights and learning
    /// rate all have to survive serialization.
    pub fn copy(&self) -> Result<Self, GenomeError> {
        let bytes = bincode::serialize(self)?;
        Ok(bincode::deserialize(&bytes)?)
    }

    pub fn mutate(&mut self, scale: f32, probability: f64, rng: &mut impl Rng) {
        self.network.mutate_random(scale, probability, rng);
    }

    pub fn evaluate(&self, inputs: &[f32]) -> Result<Vec<f32>, GenomeError> {
        let expected = self.network.input_size();
        if inputs.len() != expected {
            return Err(GenomeError::InputWidthMismatch {
                expected,
                actual: inputs.len(),
            });
        }
        Ok(self.network.feed_forward(inputs))
    }
}

/// Evolving parameters of one car. A population never mixes variants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Genome {
    Angle(AngleGenome),
    Network(NetworkGenome),
}

impl Genome {
    pub fn random(config: &SimConfig, rng: &mut impl Rng) -> Self {
        match config.genome_kind {
            GenomeKind::Angle => Genome::Angle(AngleGenome::random(config.initial_angle_range, rng)),
            GenomeKind::Network => Genome::Network(NetworkGenome::random(rng)),
        }
    }

    pub fn kind(&self) -> GenomeKind {
        match self {
            Genome::Angle(_) => GenomeKind::Angle,
            Genome::Network(_) => GenomeKind::Network,
        }
    }

    pub fn mix(&self, other: &Genome) -> Result<Genome, GenomeError> {
        match (self, other) {
            (Genome::Angle(a), Genome::Angle(b)) => Ok(Genome::Angle(a.mix(b))),
            (Genome::Network(_), Genome::Network(_)) => Err(GenomeError::CrossoverUnsupported),
            (a, b) => Err(GenomeError::VariantMismatch(a.kind(), b.kind())),
        }
    }

    pub fn mutate(&mut self, config: &SimConfig, rng: &mut impl Rng) {
        match self {
            Genome::Angle(g) => g.mutate(config.mutation_rate, rng),
            Genome::Network(g) => g.mutate(
                config.network_mutation_scale,
                config.network_mutation_probability,
                rng,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn angle_mix_is_the_exact_mean() {
        let a = AngleGenome::new(12.5);
        let b = AngleGenome::new(-40.25);
        assert_eq!(a.mix(&b).turn_angle, (12.5 + -40.25) / 2.0);
    }

    #[test]
    fn angle_mutation_is_proportional_to_the_angle() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..100 {
            let mut g = AngleGenome::new(30.0);
            g.mutate(0.1, &mut rng);
            assert!(g.turn_angle >= 27.0 - 1e-4 && g.turn_angle <= 33.0 + 1e-4);
        }
        let mut zero = AngleGenome::new(0.0);
        zero.mutate(0.1, &mut rng);
        assert_eq!(zero.turn_angle, 0.0);
    }

    #[test]
    fn random_angles_stay_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        for _ in 0..200 {
            let g = AngleGenome::random(70.0, &mut rng);
            assert!(g.turn_angle > -70.0 && g.turn_angle < 70.0);
        }
    }

    #[test]
    fn network_crossover_is_refused() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let a = Genome::Network(NetworkGenome::random(&mut rng));
        let b = Genome::Network(NetworkGenome::random(&mut rng));
        assert!(matches!(a.mix(&b), Err(GenomeError::CrossoverUnsupported)));
    }

    #[test]
    fn mixed_variants_are_refused() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let a = Genome::Angle(AngleGenome::new(5.0));
        let b = Genome::Network(NetworkGenome::random(&mut rng));
        assert!(matches!(
            a.mix(&b),
            Err(GenomeError::VariantMismatch(GenomeKind::Angle, GenomeKind::Network))
        ));
    }

    #[test]
    fn copy_round_trips_exactly() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let genome = NetworkGenome::random(&mut rng);
        let copy = genome.copy().unwrap();
        assert_eq!(copy, genome);

        let mut mutated = copy.clone();
        mutated.mutate(0.1, 1.0, &mut rng);
        assert_ne!(mutated, genome);
    }

    #[test]
    fn evaluate_checks_input_width() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let genome = NetworkGenome::random(&mut rng);
        assert!(matches!(
            genome.evaluate(&[0.0; 9]),
            Err(GenomeError::InputWidthMismatch { expected: 7, actual: 9 })
        ));
        assert_eq!(genome.evaluate(&[0.5; 7]).unwrap().len(), 6);
    }
}
