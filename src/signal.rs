//! Signal processing stages applied to the simulated voltage trace.
//!
//! - [`preprocess`]: centers the voltage trace and drops its first sample
//! - [`wavelet`]: multi-level discrete wavelet decomposition
//! - [`spectrum`]: peak-adaptive low-pass filtering, power spectral density thresholding and dominant frequency
pub mod preprocess;
pub mod spectrum;
pub mod wavelet;
