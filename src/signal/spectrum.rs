//! Frequency-domain stages: peak-adaptive low-pass filtering, thresholded power spectral density
//! and dominant frequency estimation.
use log::{debug, info};
use num_complex::Complex64;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

use crate::error::HHError;

/// Returns the discrete Fourier transform of the signal.
pub fn fft(signal: &[Complex64]) -> Vec<Complex64> {
    let mut buffer = signal.to_vec();
    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(buffer.len()).process(&mut buffer);
    buffer
}

/// Returns the inverse discrete Fourier transform of the spectrum, normalized by its length.
pub fn ifft(spectrum: &[Complex64]) -> Vec<Complex64> {
    let mut buffer = spectrum.to_vec();
    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_inverse(buffer.len()).process(&mut buffer);
    let scale = 1.0 / buffer.len() as f64;
    buffer.iter_mut().for_each(|c| *c *= scale);
    buffer
}

/// Returns the frequency of every bin of an `n`-point transform, in cycles per sample.
/// Bins past the middle hold the negative frequencies: `[0, 1, ..., (n-1)/2, -n/2, ..., -1] / n`.
pub fn fftfreq(n: usize) -> Vec<f64> {
    if n == 0 {
        return vec![];
    }
    let positive = (n - 1) / 2 + 1;
    (0..n)
        .map(|k| match k < positive {
            true => k as f64 / n as f64,
            false => (k as f64 - n as f64) / n as f64,
        })
        .collect()
}

/// Relative magnitude under which a bin counts as empty, compared with the strongest bin.
pub const EMPTY_BIN_TOLERANCE: f64 = 1e-9;

/// Returns the number of non-empty bins in the spectrum of the signal.
pub fn count_nonzero_bins(signal: &[Complex64]) -> usize {
    let spectrum = fft(signal);
    let max = spectrum.iter().map(|c| c.norm()).fold(0.0, f64::max);
    spectrum
        .iter()
        .filter(|c| c.norm() > EMPTY_BIN_TOLERANCE * max)
        .count()
}

/// Lift a real signal to the complex plane.
pub fn to_complex(signal: &[f64]) -> Vec<Complex64> {
    signal.iter().map(|&x| Complex64::new(x, 0.0)).collect()
}

/// Magnitudes within this relative distance of the running maximum do not replace it.
pub const PEAK_TIE_TOLERANCE: f64 = 1e-9;

// Position of the first maximum, NaN values being ignored.
// The bins of a conjugate-symmetric pair only differ by rounding, so the earliest one wins.
fn argmax(values: impl Iterator<Item = f64>) -> Option<usize> {
    values
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, f64)>, (i, v)| match best {
            Some((_, b)) if v <= b + PEAK_TIE_TOLERANCE * b.abs() => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// The output of the peak-adaptive low-pass filter.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FilteredSignal {
    /// The filtered signal, back in the time domain.
    pub values: Vec<Complex64>,
    /// The absolute frequency of the strongest bin (cycles per sample), used as cutoff.
    pub cutoff: f64,
    /// The number of bins whose absolute frequency does not exceed the cutoff.
    pub retained_bins: usize,
}

/// Keep the frequency bins up to the dominant one, i.e., the bin of largest magnitude in the input spectrum.
/// The cutoff is recomputed from every input; there is no user-defined cutoff.
/// The dominant bin always survives, even when it sits at a negative or Nyquist frequency.
pub fn low_pass_at_peak(signal: &[Complex64]) -> Result<FilteredSignal, HHError> {
    if signal.is_empty() {
        return Err(HHError::EmptySignal(
            "Cannot filter an empty signal".to_string(),
        ));
    }

    let mut spectrum = fft(signal);
    let freqs = fftfreq(signal.len());
    let peak = argmax(spectrum.iter().map(|c| c.norm())).ok_or_else(|| {
        HHError::InvalidParameter("The spectrum has no finite magnitude".to_string())
    })?;
    let cutoff = freqs[peak].abs();

    let mut retained_bins = 0;
    for (bin, f) in spectrum.iter_mut().zip(freqs.iter()) {
        if f.abs() > cutoff {
            *bin = Complex64::new(0.0, 0.0);
        } else {
            retained_bins += 1;
        }
    }
    debug!(
        "Low-pass at peak frequency {:.4}: {} of {} bins retained",
        cutoff,
        retained_bins,
        signal.len()
    );

    Ok(FilteredSignal {
        values: ifft(&spectrum),
        cutoff,
        retained_bins,
    })
}

/// The power spectral density with the weak bins removed.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SpectrumThresholdResult {
    /// Bin frequencies, `k / (dt * N)`.
    pub frequencies: Vec<f64>,
    /// The thresholded power of every bin.
    pub power: Vec<Complex64>,
}

/// Returns the power spectral density `F * conj(F) / N` of the signal.
pub fn power_spectral_density(signal: &[Complex64]) -> Vec<Complex64> {
    let n = signal.len() as f64;
    fft(signal).into_iter().map(|c| c * c.conj() / n).collect()
}

/// Compute the power spectral density and zero every bin whose power is below the threshold.
/// The remaining bins are left untouched.
pub fn threshold_psd(
    signal: &[Complex64],
    dt: f64,
    threshold: f64,
) -> Result<SpectrumThresholdResult, HHError> {
    if signal.is_empty() {
        return Err(HHError::EmptySignal(
            "Cannot compute the power spectral density of an empty signal".to_string(),
        ));
    }
    if !(dt > 0.0) {
        return Err(HHError::InvalidParameter(format!(
            "The sampling step must be positive, got {}",
            dt
        )));
    }

    let n = signal.len();
    let frequencies = (0..n).map(|k| k as f64 / (dt * n as f64)).collect();
    let power: Vec<Complex64> = power_spectral_density(signal)
        .into_iter()
        .map(|p| match p.norm() < threshold {
            true => Complex64::new(0.0, 0.0),
            false => p,
        })
        .collect();

    debug!(
        "PSD thresholded at {}: {} of {} bins kept",
        threshold,
        power.iter().filter(|p| p.norm() > 0.0).count(),
        n
    );
    Ok(SpectrumThresholdResult { frequencies, power })
}

/// Returns the frequency of the strongest bin among the first half of the spectrum, `k / (dt * N)`.
pub fn dominant_frequency(signal: &[Complex64], dt: f64) -> Result<f64, HHError> {
    let n = signal.len();
    if n < 2 {
        return Err(HHError::EmptySignal(format!(
            "At least two samples are required to estimate a frequency, got {}",
            n
        )));
    }
    if !(dt > 0.0) {
        return Err(HHError::InvalidParameter(format!(
            "The sampling step must be positive, got {}",
            dt
        )));
    }

    let spectrum = fft(signal);
    let peak = argmax(spectrum[..n / 2].iter().map(|c| c.norm())).ok_or_else(|| {
        HHError::InvalidParameter("The spectrum has no finite magnitude".to_string())
    })?;
    let frequency = peak as f64 / (dt * n as f64);
    info!("The frequency of the wave is {:.2} Hz", frequency);
    Ok(frequency)
}
