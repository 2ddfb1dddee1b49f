//! This crate simulates a Hodgkin-Huxley neuron and learns to approximate its voltage trace from spectral features.
//!
//! # Simulating a Neuron
//!
//! ```rust
//! use rusty_hh::simulator::{simulate, SimulationConfig};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! // Inject a noisy 20 uA/cm2 current for 3 time units
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let trace = simulate(&SimulationConfig::default(), &mut rng).unwrap();
//!
//! assert_eq!(trace.len(), 301);
//! ```
//!
//! # Extracting Spectral Features
//!
//! ```rust
//! use rusty_hh::signal::preprocess::center;
//! use rusty_hh::signal::spectrum::{low_pass_at_peak, threshold_psd, to_complex};
//! use rusty_hh::signal::wavelet::{wavedec, Wavelet};
//!
//! let voltages: Vec<f64> = (0..301).map(|i| (i as f64 * 0.2).sin() * 40.0).collect();
//! let centered = center(&voltages).unwrap();
//! let decomposition = wavedec(centered.values(), Wavelet::Db4, 5).unwrap();
//! let band = decomposition.band(1).unwrap();
//!
//! let filtered = low_pass_at_peak(&to_complex(band)).unwrap();
//! let spectrum = threshold_psd(&filtered.values, 0.01, 100.0).unwrap();
//!
//! assert_eq!(spectrum.power.len(), band.len());
//! ```
//!
//! # Running the Pipeline
//!
//! ```rust
//! use rusty_hh::network::NetworkConfig;
//! use rusty_hh::pipeline::{run, PipelineConfig};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let config = PipelineConfig {
//!     network: NetworkConfig { iterations: 20, ..NetworkConfig::default() },
//!     ..PipelineConfig::default()
//! };
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let output = run(&config, &mut rng).unwrap();
//!
//! assert_eq!(output.record.len(), 20);
//! ```

pub mod error;
pub mod kinetics;
pub mod network;
pub mod pipeline;
pub mod signal;
pub mod simulator;
