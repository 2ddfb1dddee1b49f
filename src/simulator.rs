//! Explicit Euler integration of the Hodgkin-Huxley membrane.
//!
//! # Example
//! ```rust
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use rusty_hh::simulator::{SimulationConfig, simulate};
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let trace = simulate(&SimulationConfig::default(), &mut rng).unwrap();
//!
//! assert_eq!(trace.len(), 301);
//! assert_eq!(trace.first().unwrap().time, 0.0);
//! ```
use log::{debug, info};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::HHError;
use crate::kinetics::{GateRates, MembraneParams};

/// Tolerance on `max_t / dt` when rounding up to the number of steps.
pub const STEP_COUNT_TOLERANCE: f64 = 1e-9;
/// Upper bound on `max_t / dt`.
pub const MAX_STEPS: f64 = 1e9;

/// An open time interval during which the drive current is injected.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct ActivationWindow {
    pub start: f64,
    pub stop: f64,
}

impl ActivationWindow {
    /// Returns true if the time lies strictly inside the window.
    pub fn contains(&self, t: f64) -> bool {
        self.start < t && t < self.stop
    }
}

/// Parameters of one simulation run.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// The integration time step.
    pub dt: f64,
    /// The simulation duration.
    pub max_t: f64,
    /// The membrane voltage at time 0.
    pub initial_voltage: f64,
    pub window: ActivationWindow,
    /// The mean drive current injected inside the window.
    pub current_amplitude: f64,
    /// Mean of the Gaussian noise added to the drive current.
    pub noise_mean: f64,
    /// Standard deviation of the Gaussian noise added to the drive current.
    pub noise_std: f64,
    pub membrane: MembraneParams,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            dt: 0.01,
            max_t: 3.0,
            initial_voltage: 0.0,
            window: ActivationWindow {
                start: 0.0,
                stop: 3.0,
            },
            current_amplitude: 20.0,
            noise_mean: -1.0,
            noise_std: 1.0,
            membrane: MembraneParams::default(),
        }
    }
}

impl SimulationConfig {
    /// Check the configuration, returning an error for a non-positive time step or duration, or invalid noise.
    pub fn validate(&self) -> Result<(), HHError> {
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(HHError::InvalidParameter(format!(
                "The time step must be positive and finite, got {}",
                self.dt
            )));
        }
        if !(self.max_t > 0.0 && self.max_t.is_finite()) {
            return Err(HHError::InvalidParameter(format!(
                "The simulation duration must be positive and finite, got {}",
                self.max_t
            )));
        }
        if !(self.max_t / self.dt <= MAX_STEPS) {
            return Err(HHError::InvalidParameter(format!(
                "Too many steps: {} / {} exceeds {}",
                self.max_t, self.dt, MAX_STEPS
            )));
        }
        if !(self.noise_std >= 0.0 && self.noise_std.is_finite()) {
            return Err(HHError::InvalidParameter(format!(
                "The noise standard deviation must be non-negative and finite, got {}",
                self.noise_std
            )));
        }
        if !self.initial_voltage.is_finite() {
            return Err(HHError::InvalidParameter(
                "The initial voltage must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the number of Euler steps needed for the time to reach `max_t`.
    pub fn num_steps(&self) -> usize {
        (self.max_t / self.dt - STEP_COUNT_TOLERANCE).ceil() as usize
    }
}

/// The membrane state at one time step.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationState {
    pub time: f64,
    /// Membrane voltage (mV).
    pub voltage: f64,
    /// Potassium activation.
    pub n: f64,
    /// Sodium activation.
    pub m: f64,
    /// Sodium inactivation.
    pub h: f64,
    /// The drive current applied during the step that led to this state.
    pub drive_current: f64,
}

impl SimulationState {
    /// Returns the resting state at the given voltage, with every gate at its steady state.
    pub fn at_rest(voltage: f64) -> Self {
        let rates = GateRates::at(voltage);
        SimulationState {
            time: 0.0,
            voltage,
            n: rates.n.steady_state(),
            m: rates.m.steady_state(),
            h: rates.h.steady_state(),
            drive_current: 0.0,
        }
    }

    /// Advance the state by one explicit Euler step.
    /// Every derivative is evaluated at the current state, including the gate rates.
    pub fn step(&self, membrane: &MembraneParams, current: f64, dt: f64, time: f64) -> Self {
        let dv = membrane.voltage_derivative(self.voltage, current, self.n, self.m, self.h);
        let rates = GateRates::at(self.voltage);
        SimulationState {
            time,
            voltage: self.voltage + dt * dv,
            n: self.n + dt * rates.n.derivative(self.n),
            m: self.m + dt * rates.m.derivative(self.m),
            h: self.h + dt * rates.h.derivative(self.h),
            drive_current: current,
        }
    }
}

/// An append-only simulation trajectory.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Trace {
    states: Vec<SimulationState>,
}

impl Trace {
    /// Create a trajectory starting at the provided state.
    pub fn new(initial: SimulationState) -> Self {
        Trace {
            states: vec![initial],
        }
    }

    /// Append a new state. The function returns an error if time does not increase.
    pub fn push(&mut self, state: SimulationState) -> Result<(), HHError> {
        let last = self.last();
        if !(state.time > last.time) {
            return Err(HHError::InvalidParameter(format!(
                "Time must increase along a trace: {} follows {}",
                state.time, last.time
            )));
        }
        self.states.push(state);
        Ok(())
    }

    /// Returns the most recent state.
    pub fn last(&self) -> &SimulationState {
        // never empty, see Trace::new
        &self.states[self.states.len() - 1]
    }

    /// Returns the state before the most recent one, if any.
    pub fn previous(&self) -> Option<&SimulationState> {
        self.states.iter().rev().nth(1)
    }

    pub fn first(&self) -> Option<&SimulationState> {
        self.states.first()
    }

    pub fn states(&self) -> &[SimulationState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.states.iter().map(|s| s.time).collect()
    }

    pub fn voltages(&self) -> Vec<f64> {
        self.states.iter().map(|s| s.voltage).collect()
    }

    pub fn currents(&self) -> Vec<f64> {
        self.states.iter().map(|s| s.drive_current).collect()
    }

    /// Returns the (n, m, h) gate values of every state.
    pub fn gates(&self) -> Vec<(f64, f64, f64)> {
        self.states.iter().map(|s| (s.n, s.m, s.h)).collect()
    }
}

/// Simulate the membrane from rest until the time reaches `max_t`.
/// A noise sample is drawn at every step, whether or not the drive current is on.
pub fn simulate<R: Rng>(config: &SimulationConfig, rng: &mut R) -> Result<Trace, HHError> {
    config.validate()?;
    let noise = Normal::new(config.noise_mean, config.noise_std)
        .map_err(|e| HHError::InvalidParameter(format!("Invalid noise distribution: {}", e)))?;

    let num_steps = config.num_steps();
    let mut trace = Trace::new(SimulationState::at_rest(config.initial_voltage));
    debug!(
        "Initial gates: n={:.4}, m={:.4}, h={:.4}",
        trace.last().n,
        trace.last().m,
        trace.last().h
    );

    for k in 0..num_steps {
        let state = trace.last();
        let sample = noise.sample(rng);
        let current = match config.window.contains(state.time) {
            true => config.current_amplitude + sample,
            false => 0.0,
        };
        let time = (k + 1) as f64 * config.dt;
        let next = state.step(&config.membrane, current, config.dt, time);
        trace.push(next)?;
    }

    info!(
        "Simulation done! {} samples over [0, {}], final voltage {:.3} mV.",
        trace.len(),
        trace.last().time,
        trace.last().voltage
    );
    Ok(trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_default_sample_count() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let trace = simulate(&SimulationConfig::default(), &mut rng).unwrap();
        assert_eq!(trace.len(), 301);
        assert_eq!(trace.states()[0].time, 0.0);
        assert_eq!(trace.states()[0].drive_current, 0.0);
        assert_relative_eq!(trace.last().time, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_time_strictly_increases_by_step() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let config = SimulationConfig::default();
        let trace = simulate(&config, &mut rng).unwrap();
        for pair in trace.states().windows(2) {
            assert!(pair[1].time > pair[0].time);
            assert_relative_eq!(pair[1].time - pair[0].time, config.dt, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_gates_remain_probabilities() {
        for seed in 0..5 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let trace = simulate(&SimulationConfig::default(), &mut rng).unwrap();
            for (n, m, h) in trace.gates() {
                for gate in [n, m, h] {
                    assert!(gate >= -1e-9 && gate <= 1.0 + 1e-9, "gate = {}", gate);
                }
            }
            assert!(trace.voltages().iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_first_step_has_no_current() {
        // the window is open, so t = 0 is outside of it
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let trace = simulate(&SimulationConfig::default(), &mut rng).unwrap();
        assert_eq!(trace.states()[1].drive_current, 0.0);
        assert!(trace.states()[2..]
            .iter()
            .all(|s| s.drive_current != 0.0));
    }

    #[test]
    fn test_closed_window_keeps_rest() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let config = SimulationConfig {
            window: ActivationWindow {
                start: 5.0,
                stop: 6.0,
            },
            ..SimulationConfig::default()
        };
        let trace = simulate(&config, &mut rng).unwrap();
        assert!(trace.currents().iter().all(|&i| i == 0.0));
        // the resting state at 0 mV is close to an equilibrium
        assert!(trace.voltages().iter().all(|v| v.abs() < 1.0));
    }

    #[test]
    fn test_noiseless_current_is_constant() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let config = SimulationConfig {
            noise_mean: 0.0,
            noise_std: 0.0,
            ..SimulationConfig::default()
        };
        let trace = simulate(&config, &mut rng).unwrap();
        assert!(trace.currents()[2..].iter().all(|&i| i == 20.0));
        // a 20 uA/cm2 step current makes the neuron fire
        let vmax = trace
            .voltages()
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        assert!(vmax > 50.0, "vmax = {}", vmax);
    }

    #[test]
    fn test_same_seed_same_trace() {
        let config = SimulationConfig::default();
        let trace_1 = simulate(&config, &mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        let trace_2 = simulate(&config, &mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        assert_eq!(trace_1, trace_2);
    }

    #[test]
    fn test_invalid_config() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let config = SimulationConfig {
            dt: 0.0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            simulate(&config, &mut rng),
            Err(HHError::InvalidParameter(_))
        ));

        let config = SimulationConfig {
            noise_std: -1.0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            simulate(&config, &mut rng),
            Err(HHError::InvalidParameter(_))
        ));

        // rejected before any step is taken
        let config = SimulationConfig {
            dt: 0.01,
            max_t: 1e12,
            ..SimulationConfig::default()
        };
        assert!(matches!(config.validate(), Err(HHError::InvalidParameter(_))));
        assert!(matches!(
            simulate(&config, &mut rng),
            Err(HHError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_trace_accessors() {
        let mut trace = Trace::new(SimulationState::at_rest(0.0));
        assert!(trace.previous().is_none());
        let next = trace
            .last()
            .step(&MembraneParams::default(), 10.0, 0.01, 0.01);
        trace.push(next).unwrap();
        assert_eq!(trace.previous().unwrap().time, 0.0);
        assert_eq!(trace.last().time, 0.01);
        assert!(trace.push(next).is_err());
    }
}
