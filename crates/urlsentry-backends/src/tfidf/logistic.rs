use candle_core::{DType, Module, Tensor, D};
use candle_nn::{loss, ops, Init, Linear, Optimizer, VarBuilder, VarMap, SGD};

use crate::runtime::pair_from;

/// Two-class logistic regression (a single linear layer under softmax), fit by
/// full-batch gradient descent with an L2 penalty on the weights. Parameters
/// start at zero so fitting is deterministic.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    linear: Linear,
}

#[derive(Debug, Clone, Copy)]
pub struct TrainParams {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            epochs: 1000,
            learning_rate: 1.0,
            l2: 1e-4,
        }
    }
}

impl LogisticRegression {
    /// `inputs` is a `(samples, features)` matrix; `labels` holds 0 or 1 per row.
    pub fn fit(inputs: &Tensor, labels: &[u8], params: TrainParams) -> anyhow::Result<Self> {
        let (samples, dims) = inputs.dims2()?;
        if samples == 0 || samples != labels.len() {
            anyhow::bail!("training set mismatch: {samples} rows, {} labels", labels.len());
        }
        if !labels.contains(&0) || !labels.contains(&1) {
            anyhow::bail!("training set must contain both classes");
        }

        let device = inputs.device();
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let weight = vb.get_with_hints((2, dims), "weight", Init::Const(0.))?;
        let bias = vb.get_with_hints(2, "bias", Init::Const(0.))?;
        let linear = Linear::new(weight.clone(), Some(bias));

        let targets: Vec<u32> = labels.iter().map(|&label| u32::from(label)).collect();
        let targets = Tensor::from_vec(targets, samples, device)?;
        let mut sgd = SGD::new(varmap.all_vars(), params.learning_rate)?;

        for _ in 0..params.epochs {
            let logits = linear.forward(inputs)?;
            let penalty = weight.sqr()?.sum_all()?.affine(0.5 * params.l2, 0.)?;
            let objective = loss::cross_entropy(&logits, &targets)?.add(&penalty)?;
            sgd.backward_step(&objective)?;
        }

        Ok(Self { linear })
    }

    /// Class probabilities for a `(1, features)` row.
    pub fn predict_proba(&self, row: &Tensor) -> anyhow::Result<[f64; 2]> {
        let logits = self.linear.forward(row)?;
        pair_from(&ops::softmax(&logits, D::Minus1)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::dense_rows;

    fn disjoint() -> Tensor {
        dense_rows(&[vec![(0, 1.0)], vec![(1, 1.0)]], 2, &candle_core::Device::Cpu).unwrap()
    }

    fn row(values: &[(usize, f64)]) -> Tensor {
        dense_rows(&[values.to_vec()], 2, &candle_core::Device::Cpu).unwrap()
    }

    #[test]
    fn separates_disjoint_features() {
        let model = LogisticRegression::fit(&disjoint(), &[0, 1], TrainParams::default()).unwrap();
        assert!(model.predict_proba(&row(&[(0, 1.0)])).unwrap()[1] < 0.5);
        assert!(model.predict_proba(&row(&[(1, 1.0)])).unwrap()[1] > 0.5);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let model = LogisticRegression::fit(&disjoint(), &[0, 1], TrainParams::default()).unwrap();
        let [safe, malicious] = model.predict_proba(&row(&[(0, 0.5), (1, 0.5)])).unwrap();
        assert!((safe + malicious - 1.0).abs() < 1e-6);
    }

    #[test]
    fn untrained_weights_are_undecided() {
        let params = TrainParams {
            epochs: 0,
            ..TrainParams::default()
        };
        let model = LogisticRegression::fit(&disjoint(), &[0, 1], params).unwrap();
        assert_eq!(model.predict_proba(&row(&[(1, 1.0)])).unwrap(), [0.5, 0.5]);
    }

    #[test]
    fn rejects_single_class_training_set() {
        assert!(LogisticRegression::fit(&disjoint(), &[1, 1], TrainParams::default()).is_err());
    }

    #[test]
    fn rejects_label_count_mismatch() {
        assert!(LogisticRegression::fit(&disjoint(), &[0, 1, 1], TrainParams::default()).is_err());
    }
}
