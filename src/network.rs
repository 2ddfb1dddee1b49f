//! A two-layer perceptron regressing the membrane voltage from (PSD, time index) pairs.
//!
//! # Example
//! ```rust
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use rusty_hh::network::{pair_columns, column, NetworkConfig, RegressionNetwork};
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let config = NetworkConfig { iterations: 10, ..NetworkConfig::default() };
//! let mut network = RegressionNetwork::new(config.hidden_size, &mut rng).unwrap();
//!
//! let x = pair_columns(&[0.1, 0.2, 0.3], &[0.0, 1.0, 2.0]).unwrap();
//! let y = column(&[0.2, 0.4, 0.6]);
//! let record = network.train(&x, &y, &config).unwrap();
//!
//! assert_eq!(record.len(), 10);
//! ```
use itertools::Itertools;
use log::{debug, info, warn};
use nalgebra::DMatrix;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::error::HHError;

/// Number of input features, i.e., the PSD value and the time index.
pub const INPUT_SIZE: usize = 2;
/// Number of outputs, i.e., the predicted voltage.
pub const OUTPUT_SIZE: usize = 1;

/// Hyperparameters of the network and its training loop.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub hidden_size: usize,
    pub iterations: usize,
    pub learning_rate: f64,
    /// Number of gradient-descent updates performed before the cost of an iteration is recorded.
    pub updates_per_iteration: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            hidden_size: 12,
            iterations: 1000,
            learning_rate: 0.1,
            updates_per_iteration: 2,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<(), HHError> {
        if self.hidden_size == 0 {
            return Err(HHError::InvalidParameter(
                "The hidden layer must have at least one unit".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(HHError::InvalidParameter(format!(
                "The learning rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        if self.updates_per_iteration == 0 {
            return Err(HHError::InvalidParameter(
                "At least one update per iteration is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Combine two sequences of equal length into an N x 2 matrix.
/// The function returns an error if the lengths differ.
pub fn pair_columns(first: &[f64], second: &[f64]) -> Result<DMatrix<f64>, HHError> {
    if first.len() != second.len() {
        return Err(HHError::LengthMismatch {
            left: first.len(),
            right: second.len(),
        });
    }
    Ok(DMatrix::from_fn(first.len(), 2, |i, j| match j {
        0 => first[i],
        _ => second[i],
    }))
}

/// Returns the values as an N x 1 matrix.
pub fn column(values: &[f64]) -> DMatrix<f64> {
    DMatrix::from_column_slice(values.len(), 1, values)
}

pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Derivative of the sigmoid, written as s(z)(1 - s(z)) to stay finite for large |z|.
pub fn sigmoid_prime(z: f64) -> f64 {
    let s = sigmoid(z);
    s * (1.0 - s)
}

/// Returns a matrix with orthonormal rows or columns (whichever there are fewer of),
/// taken from the SVD of a standard Gaussian matrix.
pub fn orthogonal<R: Rng>(nrows: usize, ncols: usize, rng: &mut R) -> Result<DMatrix<f64>, HHError> {
    let a = DMatrix::from_fn(nrows, ncols, |_, _| rng.sample::<f64, _>(StandardNormal));
    let svd = a.svd(true, true);
    let u = svd
        .u
        .ok_or_else(|| HHError::DecompositionError("Missing left singular vectors".to_string()))?;
    if u.shape() == (nrows, ncols) {
        return Ok(u);
    }
    svd.v_t
        .ok_or_else(|| HHError::DecompositionError("Missing right singular vectors".to_string()))
}

/// The intermediate values of a forward pass.
#[derive(Debug, PartialEq, Clone)]
pub struct ForwardPass {
    pub z2: DMatrix<f64>,
    pub a2: DMatrix<f64>,
    pub z3: DMatrix<f64>,
    /// The network output.
    pub yhat: DMatrix<f64>,
}

/// Cost gradients with respect to the two weight matrices.
#[derive(Debug, PartialEq, Clone)]
pub struct Gradients {
    pub w1: DMatrix<f64>,
    pub w2: DMatrix<f64>,
}

/// The cost recorded at every training iteration.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct TrainingRecord {
    entries: Vec<(usize, f64)>,
}

impl TrainingRecord {
    pub fn push(&mut self, iteration: usize, cost: f64) {
        self.entries.push((iteration, cost));
    }

    /// Returns the (iteration, cost) pairs.
    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn costs(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, c)| *c).collect()
    }

    pub fn final_cost(&self) -> Option<f64> {
        self.entries.last().map(|(_, c)| *c)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of iterations whose cost did not decrease with respect to the previous one.
    pub fn non_decreasing_steps(&self) -> usize {
        self.entries
            .iter()
            .tuple_windows()
            .filter(|((_, c1), (_, c2))| c2 >= c1)
            .count()
    }
}

/// A 2 -> hidden -> 1 perceptron with sigmoid activations on both layers.
/// The output is bounded to (0, 1).
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct RegressionNetwork {
    w1: DMatrix<f64>,
    w2: DMatrix<f64>,
}

impl RegressionNetwork {
    /// Create a network with orthogonal initial weights.
    pub fn new<R: Rng>(hidden_size: usize, rng: &mut R) -> Result<Self, HHError> {
        if hidden_size == 0 {
            return Err(HHError::InvalidParameter(
                "The hidden layer must have at least one unit".to_string(),
            ));
        }
        let w1 = orthogonal(INPUT_SIZE, hidden_size, rng)?;
        let w2 = orthogonal(hidden_size, OUTPUT_SIZE, rng)?;
        Ok(RegressionNetwork { w1, w2 })
    }

    /// Create a network from given weights.
    /// The function returns an error if the weight shapes are incompatible.
    pub fn from_weights(w1: DMatrix<f64>, w2: DMatrix<f64>) -> Result<Self, HHError> {
        if w1.nrows() != INPUT_SIZE || w2.ncols() != OUTPUT_SIZE || w1.ncols() != w2.nrows() {
            return Err(HHError::InvalidParameter(format!(
                "Incompatible weight shapes {:?} and {:?}",
                w1.shape(),
                w2.shape()
            )));
        }
        Ok(RegressionNetwork { w1, w2 })
    }

    pub fn w1(&self) -> &DMatrix<f64> {
        &self.w1
    }

    pub fn w2(&self) -> &DMatrix<f64> {
        &self.w2
    }

    pub fn hidden_size(&self) -> usize {
        self.w1.ncols()
    }

    fn check_inputs(&self, x: &DMatrix<f64>) -> Result<(), HHError> {
        if x.ncols() != INPUT_SIZE {
            return Err(HHError::InvalidParameter(format!(
                "Expected {} input features, got {}",
                INPUT_SIZE,
                x.ncols()
            )));
        }
        Ok(())
    }

    fn check_targets(&self, x: &DMatrix<f64>, y: &DMatrix<f64>) -> Result<(), HHError> {
        self.check_inputs(x)?;
        if y.ncols() != OUTPUT_SIZE {
            return Err(HHError::InvalidParameter(format!(
                "Expected {} target column, got {}",
                OUTPUT_SIZE,
                y.ncols()
            )));
        }
        if x.nrows() != y.nrows() {
            return Err(HHError::LengthMismatch {
                left: x.nrows(),
                right: y.nrows(),
            });
        }
        Ok(())
    }

    /// Propagate the inputs (one sample per row) through the network.
    pub fn forward(&self, x: &DMatrix<f64>) -> Result<ForwardPass, HHError> {
        self.check_inputs(x)?;
        let z2 = x * &self.w1;
        let a2 = z2.map(sigmoid);
        let z3 = &a2 * &self.w2;
        let yhat = z3.map(sigmoid);
        Ok(ForwardPass { z2, a2, z3, yhat })
    }

    /// Returns the network output for every row of the inputs.
    pub fn predict(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>, HHError> {
        Ok(self.forward(x)?.yhat)
    }

    /// Returns half the sum of squared errors.
    pub fn cost(&self, x: &DMatrix<f64>, y: &DMatrix<f64>) -> Result<f64, HHError> {
        self.check_targets(x, y)?;
        let yhat = self.forward(x)?.yhat;
        Ok(0.5 * (y - yhat).map(|e| e * e).sum())
    }

    /// Returns the cost gradients by backpropagation.
    pub fn gradients(&self, x: &DMatrix<f64>, y: &DMatrix<f64>) -> Result<Gradients, HHError> {
        self.check_targets(x, y)?;
        let pass = self.forward(x)?;
        let delta3 = (&pass.yhat - y).component_mul(&pass.z3.map(sigmoid_prime));
        let w2 = pass.a2.transpose() * &delta3;
        let delta2 = (&delta3 * self.w2.transpose()).component_mul(&pass.z2.map(sigmoid_prime));
        let w1 = x.transpose() * delta2;
        Ok(Gradients { w1, w2 })
    }

    /// Perform one gradient-descent update of both weight matrices.
    pub fn step(&mut self, x: &DMatrix<f64>, y: &DMatrix<f64>, learning_rate: f64) -> Result<(), HHError> {
        let gradients = self.gradients(x, y)?;
        self.w1 -= learning_rate * gradients.w1;
        self.w2 -= learning_rate * gradients.w2;
        Ok(())
    }

    /// Train the network for a fixed number of iterations, without early stopping.
    /// Each iteration performs `updates_per_iteration` updates, then records the cost.
    /// A cost that fails to decrease is reported, not treated as an error.
    pub fn train(
        &mut self,
        x: &DMatrix<f64>,
        y: &DMatrix<f64>,
        config: &NetworkConfig,
    ) -> Result<TrainingRecord, HHError> {
        config.validate()?;
        self.check_targets(x, y)?;

        let mut record = TrainingRecord::default();
        for i in 0..config.iterations {
            for _ in 0..config.updates_per_iteration {
                self.step(x, y, config.learning_rate)?;
            }
            let cost = self.cost(x, y)?;
            debug!("Iteration {}: cost {}", i, cost);
            record.push(i, cost);
        }

        let stalled = record.non_decreasing_steps();
        if stalled > 0 {
            warn!(
                "The cost did not decrease on {} of {} iterations.",
                stalled,
                record.len()
            );
        }
        if let Some(cost) = record.final_cost() {
            info!(
                "Training done! The cost is {} after {} iterations.",
                cost,
                record.len()
            );
        }
        Ok(record)
    }
}
