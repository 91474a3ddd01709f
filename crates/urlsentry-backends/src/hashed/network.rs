use candle_core::{DType, Module, Tensor, D};
use candle_nn::{linear, loss, ops, Linear, Optimizer, VarBuilder, VarMap, SGD};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::runtime::{dense_rows, pair_from, SparseRow};

/// One hidden tanh layer followed by a two-way softmax.
#[derive(Debug, Clone)]
pub struct TinyNetwork {
    inputs: usize,
    device: candle_core::Device,
    hidden: Linear,
    output: Linear,
}

#[derive(Debug, Clone, Copy)]
pub struct NetworkParams {
    pub hidden: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            hidden: 16,
            epochs: 300,
            learning_rate: 0.5,
            seed: 42,
        }
    }
}

impl TinyNetwork {
    pub fn new(
        inputs: usize,
        hidden: usize,
        seed: u64,
        device: &candle_core::Device,
    ) -> anyhow::Result<Self> {
        Ok(Self::with_vars(inputs, hidden, seed, device)?.0)
    }

    /// Builds the layers over a fresh `VarMap` and overwrites candle's random
    /// init with weights drawn from `seed`.
    fn with_vars(
        inputs: usize,
        hidden: usize,
        seed: u64,
        device: &candle_core::Device,
    ) -> anyhow::Result<(Self, VarMap)> {
        let mut varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let hidden_layer = linear(inputs, hidden, vb.pp("hidden"))?;
        let output_layer = linear(hidden, 2, vb.pp("output"))?;

        let mut rng = StdRng::seed_from_u64(seed);
        let scale = 1.0 / (inputs as f32).sqrt();
        let w1: Vec<f32> = (0..hidden * inputs)
            .map(|_| rng.gen_range(-scale..scale))
            .collect();
        let w2: Vec<f32> = (0..2 * hidden).map(|_| rng.gen_range(-0.5..0.5)).collect();
        varmap.set_one("hidden.weight", Tensor::from_vec(w1, (hidden, inputs), device)?)?;
        varmap.set_one("hidden.bias", Tensor::zeros(hidden, DType::F32, device)?)?;
        varmap.set_one("output.weight", Tensor::from_vec(w2, (2, hidden), device)?)?;
        varmap.set_one("output.bias", Tensor::zeros(2, DType::F32, device)?)?;

        let network = Self {
            inputs,
            device: device.clone(),
            hidden: hidden_layer,
            output: output_layer,
        };
        Ok((network, varmap))
    }

    /// Per-sample SGD over `epochs` passes of the training set.
    pub fn fit(
        samples: &[SparseRow],
        labels: &[u8],
        inputs: usize,
        params: NetworkParams,
        device: &candle_core::Device,
    ) -> anyhow::Result<Self> {
        if samples.is_empty() || samples.len() != labels.len() {
            anyhow::bail!(
                "training set mismatch: {} samples, {} labels",
                samples.len(),
                labels.len()
            );
        }
        let hidden = params.hidden.max(1);
        let (network, varmap) = Self::with_vars(inputs, hidden, params.seed, device)?;
        let xs = dense_rows(samples, inputs, device)?;
        let ys = Self::targets(labels, device)?;
        let mut sgd = SGD::new(varmap.all_vars(), params.learning_rate)?;

        for _ in 0..params.epochs {
            for index in 0..samples.len() {
                let logits = network.logits(&xs.narrow(0, index, 1)?)?;
                let objective = loss::cross_entropy(&logits, &ys.narrow(0, index, 1)?)?;
                sgd.backward_step(&objective)?;
            }
        }
        Ok(network)
    }

    /// Mean cross-entropy over a labelled set.
    pub fn loss(&self, samples: &[SparseRow], labels: &[u8]) -> anyhow::Result<f64> {
        let xs = dense_rows(samples, self.inputs, &self.device)?;
        let ys = Self::targets(labels, &self.device)?;
        let value = loss::cross_entropy(&self.logits(&xs)?, &ys)?.to_scalar::<f32>()?;
        Ok(f64::from(value))
    }

    pub fn predict_proba(&self, features: &[(usize, f64)]) -> anyhow::Result<[f64; 2]> {
        let xs = dense_rows(&[features.to_vec()], self.inputs, &self.device)?;
        pair_from(&ops::softmax(&self.logits(&xs)?, D::Minus1)?)
    }

    fn logits(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let hidden = self.hidden.forward(xs)?.tanh()?;
        self.output.forward(&hidden)
    }

    fn targets(labels: &[u8], device: &candle_core::Device) -> candle_core::Result<Tensor> {
        let ys: Vec<u32> = labels.iter().map(|&label| u32::from(label.min(1))).collect();
        Tensor::from_vec(ys, labels.len(), device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device::Cpu;

    fn toy() -> (Vec<SparseRow>, Vec<u8>) {
        (vec![vec![(0, 1.0)], vec![(1, 1.0)], vec![(2, 1.0)]], vec![0, 1, 1])
    }

    fn small() -> NetworkParams {
        NetworkParams {
            hidden: 4,
            seed: 7,
            ..NetworkParams::default()
        }
    }

    #[test]
    fn training_reduces_loss() {
        let (samples, labels) = toy();
        let untrained = TinyNetwork::new(3, 4, 7, &Cpu).unwrap();
        let trained = TinyNetwork::fit(&samples, &labels, 3, small(), &Cpu).unwrap();
        assert!(
            trained.loss(&samples, &labels).unwrap() < untrained.loss(&samples, &labels).unwrap()
        );
    }

    #[test]
    fn same_seed_same_weights() {
        let (samples, labels) = toy();
        let a = TinyNetwork::fit(&samples, &labels, 3, small(), &Cpu).unwrap();
        let b = TinyNetwork::fit(&samples, &labels, 3, small(), &Cpu).unwrap();
        assert_eq!(
            a.predict_proba(&[(1, 1.0)]).unwrap(),
            b.predict_proba(&[(1, 1.0)]).unwrap()
        );
    }

    #[test]
    fn output_is_a_distribution() {
        let network = TinyNetwork::new(3, 2, 1, &Cpu).unwrap();
        let [a, b] = network.predict_proba(&[(0, 1.0), (2, 0.5)]).unwrap();
        assert!((a + b - 1.0).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_feature_is_an_error() {
        let network = TinyNetwork::new(3, 2, 1, &Cpu).unwrap();
        assert!(network.predict_proba(&[(9, 1.0)]).is_err());
    }

    #[test]
    fn mismatched_training_set_is_rejected() {
        let (samples, _) = toy();
        assert!(TinyNetwork::fit(&samples, &[0, 1], 3, small(), &Cpu).is_err());
    }
}
