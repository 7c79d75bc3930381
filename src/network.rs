use ::rand::Rng;
use serde::{Deserialize, Serialize};

/// One input per sensor ray of the seven-ray fan.
pub const INPUT_SIZE: usize = 7;
pub const HIDDEN_SIZE: usize = INPUT_SIZE * 3;
/// {left, neutral, right} steering followed by {accelerate, neutral, decelerate}.
pub const OUTPUT_SIZE: usize = 6;
pub const LEARNING_RATE: f32 = 0.0001;

/// Fully connected layer; `weights` is row-major `[output][input]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

impl Layer {
    fn random(inputs: usize, outputs: usize, rng: &mut impl Rng) -> Self {
        Self {
            inputs,
            outputs,
            weights: (0..inputs * outputs).map(|_| rng.gen_range(-1.0..1.0)).collect(),
            biases: (0..outputs).map(|_| rng.gen_range(-1.0..1.0)).collect(),
        }
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        (0..self.outputs)
            .map(|o| {
                let row = &self.weights[o * self.inputs..(o + 1) * self.inputs];
                let sum: f32 = row.iter().zip(input).map(|(w, x)| w * x).sum();
                sigmoid(sum + self.biases[o])
            })
            .collect()
    }
}

/// Feed-forward network with sigmoid activations on every layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedForward {
    pub layers: Vec<Layer>,
    /// Carried with the weights so clones stay complete; evolution never trains.
    pub learning_rate: f32,
}

impl FeedForward {
    /// Random network with the given layer widths, input first.
    pub fn random(sizes: &[usize], rng: &mut impl Rng) -> Self {
        let layers = sizes
            .windows(2)
            .map(|w| Layer::random(w[0], w[1], rng))
            .collect();
        Self {
            layers,
            learning_rate: LEARNING_RATE,
        }
    }

    /// The driving topology: 7 sensors, 21 hidden units, 6 outputs.
    pub fn driver(rng: &mut impl Rng) -> Self {
        Self::random(&[INPUT_SIZE, HIDDEN_SIZE, OUTPUT_SIZE], rng)
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.inputs)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.outputs)
    }

    /// `input` must be `input_size()` long.
    pub fn feed_forward(&self, input: &[f32]) -> Vec<f32> {
        self.layers
            .iter()
            .fold(input.to_vec(), |activations, layer| layer.forward(&activations))
    }

    /// Perturb each weight with probability `probability` by
    /// `weight * U(-scale, scale)`.
    pub fn mutate_random(&mut self, scale: f32, probability: f64, rng: &mut impl Rng) {
        for layer in &mut self.layers {
            for w in &mut layer.weights {
                if rng.gen_bool(probability) {
                    *w += *w * rng.gen_range(-scale..=scale);
                }
            }
        }
    }

    #[cfg(test)]
    fn weight_count(&self) -> usize {
        self.layers.iter().map(|l| l.weights.len()).sum()
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
