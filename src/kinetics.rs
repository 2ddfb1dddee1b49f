//! Voltage-dependent gating kinetics of the Hodgkin-Huxley model.
//!
//! Voltages are in mV relative to the resting potential, so that the resting state sits at 0 mV.
//! All functions are pure: they only depend on the voltage (and gate state) they are given.
use serde::{Deserialize, Serialize};

/// Below this magnitude, the argument of `x / (exp(x / y) - 1)` is treated as the removable singularity.
pub const SINGULARITY_TOLERANCE: f64 = 1e-6;

/// Reversal potentials (mV) and maximal conductances of the sodium, potassium and leak channels.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct MembraneParams {
    /// Sodium reversal potential.
    pub ena: f64,
    /// Potassium reversal potential.
    pub ek: f64,
    /// Leak reversal potential.
    pub el: f64,
    /// Maximal sodium conductance.
    pub gna: f64,
    /// Maximal potassium conductance.
    pub gk: f64,
    /// Leak conductance.
    pub gl: f64,
}

impl Default for MembraneParams {
    fn default() -> Self {
        MembraneParams {
            ena: 115.0,
            ek: -12.0,
            el: 10.6,
            gna: 120.0,
            gk: 36.0,
            gl: 0.30,
        }
    }
}

impl MembraneParams {
    /// Returns the total ionic current flowing through the membrane.
    pub fn ionic_current(&self, v: f64, n: f64, m: f64, h: f64) -> f64 {
        self.gna * m.powi(3) * h * (v - self.ena)
            + self.gk * n.powi(4) * (v - self.ek)
            + self.gl * (v - self.el)
    }

    /// Returns the membrane voltage derivative for a unit capacitance, given the drive current.
    pub fn voltage_derivative(&self, v: f64, current: f64, n: f64, m: f64, h: f64) -> f64 {
        current - self.ionic_current(v, n, m, h)
    }
}

/// Evaluate `x / (exp(x / y) - 1)`, replacing the 0/0 limit at x = 0 by its first-order expansion.
fn vtrap(x: f64, y: f64) -> f64 {
    if (x / y).abs() < SINGULARITY_TOLERANCE {
        y * (1.0 - x / y / 2.0)
    } else {
        x / ((x / y).exp() - 1.0)
    }
}

/// Forward rate of the potassium activation gate.
pub fn alpha_n(v: f64) -> f64 {
    0.01 * vtrap(10.0 - v, 10.0)
}

/// Backward rate of the potassium activation gate.
pub fn beta_n(v: f64) -> f64 {
    0.125 * (-v / 80.0).exp()
}

/// Forward rate of the sodium activation gate.
pub fn alpha_m(v: f64) -> f64 {
    0.1 * vtrap(25.0 - v, 10.0)
}

/// Backward rate of the sodium activation gate.
pub fn beta_m(v: f64) -> f64 {
    4.0 * (-v / 18.0).exp()
}

/// Forward rate of the sodium inactivation gate.
pub fn alpha_h(v: f64) -> f64 {
    0.07 * (-v / 20.0).exp()
}

/// Backward rate of the sodium inactivation gate.
pub fn beta_h(v: f64) -> f64 {
    1.0 / (((30.0 - v) / 10.0).exp() + 1.0)
}

/// Right-hand side of a gating ODE.
pub fn gate_derivative(alpha: f64, beta: f64, gate: f64) -> f64 {
    alpha * (1.0 - gate) - beta * gate
}

/// Steady-state open probability of a gate.
pub fn steady_state(alpha: f64, beta: f64) -> f64 {
    alpha / (alpha + beta)
}

/// A pair of forward and backward rates.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Rates {
    pub alpha: f64,
    pub beta: f64,
}

impl Rates {
    pub fn derivative(&self, gate: f64) -> f64 {
        gate_derivative(self.alpha, self.beta, gate)
    }

    pub fn steady_state(&self) -> f64 {
        steady_state(self.alpha, self.beta)
    }
}

/// The rates of the three gates evaluated at one voltage.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct GateRates {
    pub n: Rates,
    pub m: Rates,
    pub h: Rates,
}

impl GateRates {
    pub fn at(v: f64) -> Self {
        GateRates {
            n: Rates {
                alpha: alpha_n(v),
                beta: beta_n(v),
            },
            m: Rates {
                alpha: alpha_m(v),
                beta: beta_m(v),
            },
            h: Rates {
                alpha: alpha_h(v),
                beta: beta_h(v),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_alpha_limits_at_singular_voltages() {
        assert_relative_eq!(alpha_n(10.0), 0.1);
        assert_relative_eq!(alpha_m(25.0), 1.0);
        assert!(alpha_n(10.0).is_finite());
        assert!(alpha_m(25.0).is_finite());
    }

    #[test]
    fn test_alpha_continuous_around_singularity() {
        for eps in [1e-3, 1e-5, 1e-7, 1e-9] {
            assert_relative_eq!(alpha_n(10.0 + eps), alpha_n(10.0), max_relative = 1e-3);
            assert_relative_eq!(alpha_n(10.0 - eps), alpha_n(10.0), max_relative = 1e-3);
            assert_relative_eq!(alpha_m(25.0 + eps), alpha_m(25.0), max_relative = 1e-3);
            assert_relative_eq!(alpha_m(25.0 - eps), alpha_m(25.0), max_relative = 1e-3);
        }
    }

    #[test]
    fn test_rates_positive_on_sweep() {
        let mut v = -100.0;
        while v <= 150.0 {
            assert!(alpha_n(v) + beta_n(v) > 0.0, "v = {}", v);
            assert!(alpha_m(v) + beta_m(v) > 0.0, "v = {}", v);
            assert!(alpha_h(v) + beta_h(v) > 0.0, "v = {}", v);
            v += 0.5;
        }
        assert!(alpha_n(10.0) + beta_n(10.0) > 0.0);
    }

    #[test]
    fn test_steady_state_at_rest() {
        let rates = GateRates::at(0.0);
        let n = rates.n.steady_state();
        let m = rates.m.steady_state();
        let h = rates.h.steady_state();
        assert_relative_eq!(n, 0.3177, epsilon = 1e-3);
        assert_relative_eq!(m, 0.0529, epsilon = 1e-3);
        assert_relative_eq!(h, 0.5961, epsilon = 1e-3);

        // at steady state, the gates do not move
        assert_relative_eq!(rates.n.derivative(n), 0.0, epsilon = 1e-12);
        assert_relative_eq!(rates.m.derivative(m), 0.0, epsilon = 1e-12);
        assert_relative_eq!(rates.h.derivative(h), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_steady_state_at_singular_voltages() {
        let n = GateRates::at(10.0).n.steady_state();
        let m = GateRates::at(25.0).m.steady_state();
        assert!(n > 0.0 && n < 1.0);
        assert!(m > 0.0 && m < 1.0);
    }

    #[test]
    fn test_gate_derivative() {
        assert_eq!(gate_derivative(1.0, 2.0, 0.0), 1.0);
        assert_eq!(gate_derivative(1.0, 2.0, 1.0), -2.0);
        assert_eq!(steady_state(1.0, 3.0), 0.25);
    }

    #[test]
    fn test_voltage_derivative() {
        let params = MembraneParams::default();
        // with closed gates only the leak current remains
        assert_relative_eq!(params.voltage_derivative(0.0, 0.0, 0.0, 0.0, 0.0), 0.30 * 10.6);
        assert_relative_eq!(
            params.voltage_derivative(10.6, 20.0, 0.0, 0.0, 0.0),
            20.0,
            epsilon = 1e-12
        );
    }
}
