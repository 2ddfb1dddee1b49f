//! Multi-level discrete wavelet decomposition with symmetric boundary extension.
//!
//! The coefficient layout follows the usual convention of multi-level decompositions:
//! `[cA_L, cD_L, cD_(L-1), ..., cD_1]`, i.e., the approximation of the coarsest level first,
//! followed by the detail bands from the coarsest to the finest.
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::HHError;

// Decomposition low-pass filters, in convolution order.
const HAAR_DEC_LO: [f64; 2] = [std::f64::consts::FRAC_1_SQRT_2, std::f64::consts::FRAC_1_SQRT_2];
const DB2_DEC_LO: [f64; 4] = [
    -0.12940952255092145,
    0.22414386804185735,
    0.836516303737469,
    0.48296291314469025,
];
const DB4_DEC_LO: [f64; 8] = [
    -0.010597401784997278,
    0.032883011666982945,
    0.030841381835986965,
    -0.18703481171888114,
    -0.02798376941698385,
    0.6308807679295904,
    0.7148465705525415,
    0.23037781330885523,
];

/// Orthogonal wavelet families available for decomposition.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Wavelet {
    /// 2 taps.
    Haar,
    /// Daubechies with 2 vanishing moments, 4 taps.
    Db2,
    /// Daubechies with 4 vanishing moments, 8 taps.
    Db4,
}

impl Default for Wavelet {
    fn default() -> Self {
        Wavelet::Db4
    }
}

impl Wavelet {
    /// Returns the decomposition low-pass filter.
    pub fn dec_lo(&self) -> &'static [f64] {
        match self {
            Wavelet::Haar => &HAAR_DEC_LO,
            Wavelet::Db2 => &DB2_DEC_LO,
            Wavelet::Db4 => &DB4_DEC_LO,
        }
    }

    /// Returns the decomposition high-pass filter, i.e., the quadrature mirror of the low-pass one.
    pub fn dec_hi(&self) -> Vec<f64> {
        let lo = self.dec_lo();
        let len = lo.len();
        (0..len)
            .map(|k| match k % 2 {
                0 => -lo[len - 1 - k],
                _ => lo[len - 1 - k],
            })
            .collect()
    }

    pub fn filter_len(&self) -> usize {
        self.dec_lo().len()
    }
}

/// Returns the deepest level at which at least one coefficient is free of boundary effects.
pub fn max_level(data_len: usize, filter_len: usize) -> usize {
    if filter_len < 2 || data_len < filter_len - 1 {
        return 0;
    }
    (data_len as f64 / (filter_len - 1) as f64).log2().floor() as usize
}

// Half-sample symmetric extension: ... x1 x0 | x0 x1 ... x(N-1) | x(N-1) x(N-2) ...
fn symmetric_at(signal: &[f64], k: isize) -> f64 {
    let n = signal.len() as isize;
    let k = k.rem_euclid(2 * n);
    if k < n {
        signal[k as usize]
    } else {
        signal[(2 * n - 1 - k) as usize]
    }
}

// Convolve with the filter and keep every odd output sample.
fn downsampling_convolution(signal: &[f64], filter: &[f64]) -> Vec<f64> {
    let out_len = (signal.len() + filter.len() - 1) / 2;
    (0..out_len)
        .map(|i| {
            let o = (2 * i + 1) as isize;
            filter
                .iter()
                .enumerate()
                .map(|(j, f)| f * symmetric_at(signal, o - j as isize))
                .sum()
        })
        .collect()
}

/// Single-level discrete wavelet transform, returning the approximation and detail coefficients.
/// Both bands have length floor((N + F - 1) / 2) for a signal of length N and a filter of length F.
pub fn dwt(signal: &[f64], wavelet: Wavelet) -> Result<(Vec<f64>, Vec<f64>), HHError> {
    if signal.is_empty() {
        return Err(HHError::EmptySignal(
            "Cannot apply a wavelet transform to an empty signal".to_string(),
        ));
    }
    let approx = downsampling_convolution(signal, wavelet.dec_lo());
    let detail = downsampling_convolution(signal, &wavelet.dec_hi());
    Ok((approx, detail))
}

/// The coefficient bands of a multi-level decomposition.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Decomposition {
    bands: Vec<Vec<f64>>,
}

impl Decomposition {
    /// Returns the band at the given position, following the `[cA_L, cD_L, ..., cD_1]` layout.
    pub fn band(&self, index: usize) -> Result<&[f64], HHError> {
        self.bands.get(index).map(|b| b.as_slice()).ok_or_else(|| {
            HHError::InvalidParameter(format!(
                "Band index {} out of bounds for a decomposition with {} bands",
                index,
                self.bands.len()
            ))
        })
    }

    /// Returns the detail band of the given level, 1 being the finest.
    pub fn detail(&self, level: usize) -> Result<&[f64], HHError> {
        if level == 0 || level > self.level() {
            return Err(HHError::InvalidParameter(format!(
                "Detail level {} out of bounds for a decomposition of level {}",
                level,
                self.level()
            )));
        }
        self.band(self.bands.len() - level)
    }

    /// Returns the approximation band of the coarsest level.
    pub fn approximation(&self) -> &[f64] {
        &self.bands[0]
    }

    pub fn bands(&self) -> &[Vec<f64>] {
        &self.bands
    }

    /// Returns the number of decomposition levels.
    pub fn level(&self) -> usize {
        self.bands.len() - 1
    }
}

/// Multi-level discrete wavelet decomposition.
pub fn wavedec(signal: &[f64], wavelet: Wavelet, level: usize) -> Result<Decomposition, HHError> {
    if level == 0 {
        return Err(HHError::InvalidParameter(
            "The decomposition level must be at least 1".to_string(),
        ));
    }
    let deepest = max_level(signal.len(), wavelet.filter_len());
    if level > deepest {
        warn!(
            "Level value of {} is too high for a signal of length {}: all coefficients will experience boundary effects.",
            level,
            signal.len()
        );
    }

    let mut details = Vec::with_capacity(level);
    let mut approx = signal.to_vec();
    for _ in 0..level {
        let (a, d) = dwt(&approx, wavelet)?;
        approx = a;
        details.push(d);
    }

    let mut bands = vec![approx];
    bands.extend(details.into_iter().rev());
    debug!(
        "Wavelet decomposition ({:?}, level {}) band lengths: {:?}",
        wavelet,
        level,
        bands.iter().map(|b| b.len()).collect::<Vec<_>>()
    );
    Ok(Decomposition { bands })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_filters_are_normalized() {
        for wavelet in [Wavelet::Haar, Wavelet::Db2, Wavelet::Db4] {
            let lo = wavelet.dec_lo();
            let hi = wavelet.dec_hi();
            assert_abs_diff_eq!(lo.iter().sum::<f64>(), std::f64::consts::SQRT_2, epsilon = 1e-12);
            assert_abs_diff_eq!(hi.iter().sum::<f64>(), 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(lo.iter().map(|x| x * x).sum::<f64>(), 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(
                lo.iter().zip(hi.iter()).map(|(l, h)| l * h).sum::<f64>(),
                0.0,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_db4_dec_hi() {
        let hi = Wavelet::Db4.dec_hi();
        assert_abs_diff_eq!(hi[0], -0.23037781330885523);
        assert_abs_diff_eq!(hi[1], 0.7148465705525415);
        assert_abs_diff_eq!(hi[7], -0.010597401784997278);
    }

    #[test]
    fn test_band_lengths() {
        let signal: Vec<f64> = (0..300).map(|i| (i as f64 * 0.1).sin()).collect();
        let decomposition = wavedec(&signal, Wavelet::Db4, 5).unwrap();
        let lengths: Vec<usize> = decomposition.bands().iter().map(|b| b.len()).collect();
        assert_eq!(lengths, vec![16, 16, 25, 43, 80, 153]);
        assert_eq!(decomposition.level(), 5);
        assert_eq!(decomposition.band(1).unwrap().len(), 16);
        assert_eq!(decomposition.detail(1).unwrap().len(), 153);
        assert_eq!(decomposition.detail(5).unwrap(), decomposition.band(1).unwrap());
    }

    #[test]
    fn test_constant_signal_has_no_detail() {
        let signal = vec![3.0; 64];
        let decomposition = wavedec(&signal, Wavelet::Db4, 3).unwrap();
        for level in 1..=3 {
            for d in decomposition.detail(level).unwrap() {
                assert_abs_diff_eq!(*d, 0.0, epsilon = 1e-10);
            }
        }
        for a in decomposition.approximation() {
            assert_abs_diff_eq!(*a, 3.0 * 2f64.powf(1.5), epsilon = 1e-10);
        }
    }

    #[test]
    fn test_haar_dwt() {
        let (approx, detail) = dwt(&[1.0, 3.0, 5.0, 7.0], Wavelet::Haar).unwrap();
        let s = std::f64::consts::FRAC_1_SQRT_2;
        assert_eq!(approx.len(), 2);
        assert_abs_diff_eq!(approx[0], 4.0 * s, epsilon = 1e-12);
        assert_abs_diff_eq!(approx[1], 12.0 * s, epsilon = 1e-12);
        assert_abs_diff_eq!(detail[0], -2.0 * s, epsilon = 1e-12);
        assert_abs_diff_eq!(detail[1], -2.0 * s, epsilon = 1e-12);
    }

    #[test]
    fn test_max_level() {
        assert_eq!(max_level(300, 8), 5);
        assert_eq!(max_level(5, 8), 0);
        assert_eq!(max_level(64, 2), 6);
    }

    #[test]
    fn test_invalid_decompositions() {
        assert!(matches!(
            wavedec(&[1.0, 2.0], Wavelet::Db4, 0),
            Err(HHError::InvalidParameter(_))
        ));
        assert!(matches!(
            wavedec(&[], Wavelet::Db4, 1),
            Err(HHError::EmptySignal(_))
        ));
        let decomposition = wavedec(&[1.0; 32], Wavelet::Haar, 2).unwrap();
        assert!(decomposition.band(3).is_err());
        assert!(decomposition.detail(0).is_err());
        assert!(decomposition.detail(3).is_err());
    }

    #[test]
    fn test_short_signal_is_extended() {
        // the extension wraps around several times when the filter is longer than the signal
        let decomposition = wavedec(&[1.0, 2.0], Wavelet::Db4, 2).unwrap();
        assert_eq!(decomposition.bands().len(), 3);
        assert!(decomposition
            .bands()
            .iter()
            .flatten()
            .all(|c| c.is_finite()));
    }
}
