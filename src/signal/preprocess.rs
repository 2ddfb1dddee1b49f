//! Standardization of the voltage trace before decomposition.
use serde::{Deserialize, Serialize};

use crate::error::HHError;

/// A zero-mean signal together with the sample indices it is aligned to.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct CenteredSignal {
    values: Vec<f64>,
    indices: Vec<usize>,
}

impl CenteredSignal {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns the indices 0..N-2 matching the values.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Returns the arithmetic mean of the samples.
pub fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Drop the first sample of the voltage trace and subtract the mean of the remaining ones.
/// The first sample is the initial condition; the remaining ones are those produced by the integrator.
pub fn center(voltages: &[f64]) -> Result<CenteredSignal, HHError> {
    if voltages.len() < 2 {
        return Err(HHError::InvalidParameter(format!(
            "At least two samples are required to center a trace, got {}",
            voltages.len()
        )));
    }

    let retained = &voltages[1..];
    let offset = mean(retained);
    let values: Vec<f64> = retained.iter().map(|v| v - offset).collect();
    let indices = (0..values.len()).collect();

    Ok(CenteredSignal { values, indices })
}
