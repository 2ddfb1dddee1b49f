//! End-to-end pipeline: simulation, standardization, decomposition, filtering, PSD features and regression.
use log::info;
use num_complex::Complex64;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::HHError;
use crate::network::{column, pair_columns, NetworkConfig, RegressionNetwork, TrainingRecord};
use crate::signal::preprocess::{center, CenteredSignal};
use crate::signal::spectrum::{
    dominant_frequency, low_pass_at_peak, threshold_psd, to_complex, FilteredSignal,
    SpectrumThresholdResult,
};
use crate::signal::wavelet::{wavedec, Wavelet};
use crate::simulator::{simulate, SimulationConfig, Trace};

/// Parameters of the signal processing stages.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub wavelet: Wavelet,
    /// Number of decomposition levels.
    pub level: usize,
    /// Position of the band carried forward in the `[cA_L, cD_L, ..., cD_1]` layout.
    pub band: usize,
    /// Power below which a PSD bin is zeroed.
    pub psd_threshold: f64,
    /// Number of decimals kept in the network inputs and targets.
    pub decimals: i32,
}

impl Default for SignalConfig {
    fn default() -> Self {
        SignalConfig {
            wavelet: Wavelet::Db4,
            level: 5,
            band: 1,
            psd_threshold: 100.0,
            decimals: 3,
        }
    }
}

/// Parameters of a full pipeline run.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub simulation: SimulationConfig,
    pub signal: SignalConfig,
    pub network: NetworkConfig,
}

impl PipelineConfig {
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), HHError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, HHError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Round half to even at the given number of decimals.
pub fn round_to(x: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (x * scale).round_ties_even() / scale
}

/// Every intermediate product of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub trace: Trace,
    pub centered: CenteredSignal,
    /// The wavelet band carried forward.
    pub band: Vec<f64>,
    pub filtered: FilteredSignal,
    pub spectrum: SpectrumThresholdResult,
    /// The dominant frequency of the filtered band.
    pub dominant_frequency: f64,
    pub record: TrainingRecord,
    pub network: RegressionNetwork,
    /// Network output for every training sample.
    pub predicted: Vec<f64>,
    /// Voltage targets for every training sample.
    pub actual: Vec<f64>,
}

/// The serializable digest of a pipeline run.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub num_samples: usize,
    pub band_len: usize,
    pub dominant_frequency: f64,
    pub cutoff: f64,
    pub final_cost: Option<f64>,
    pub non_decreasing_steps: usize,
    pub costs: Vec<f64>,
    pub times: Vec<f64>,
    pub predicted: Vec<f64>,
    pub actual: Vec<f64>,
}

impl PipelineOutput {
    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            num_samples: self.trace.len(),
            band_len: self.band.len(),
            dominant_frequency: self.dominant_frequency,
            cutoff: self.filtered.cutoff,
            final_cost: self.record.final_cost(),
            non_decreasing_steps: self.record.non_decreasing_steps(),
            costs: self.record.costs(),
            times: self
                .trace
                .times()
                .into_iter()
                .take(self.predicted.len())
                .collect(),
            predicted: self.predicted.clone(),
            actual: self.actual.clone(),
        }
    }
}

impl PipelineSummary {
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), HHError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

/// Run every stage in order. The random number generator drives the current noise first, then the weight initialization.
/// Features and targets are truncated to the length of the PSD; the function returns an error if fewer time indices or voltage samples are available.
pub fn run<R: Rng>(config: &PipelineConfig, rng: &mut R) -> Result<PipelineOutput, HHError> {
    let trace = simulate(&config.simulation, rng)?;
    let voltages = trace.voltages();

    let centered = center(&voltages)?;
    info!("Signal standardization done! {} samples.", centered.len());

    let decomposition = wavedec(centered.values(), config.signal.wavelet, config.signal.level)?;
    let band = decomposition.band(config.signal.band)?.to_vec();
    info!(
        "Wavelet decomposition done! Band {} has {} coefficients.",
        config.signal.band,
        band.len()
    );

    let filtered = low_pass_at_peak(&to_complex(&band))?;
    let dt = config.simulation.dt;
    let spectrum = threshold_psd(&filtered.values, dt, config.signal.psd_threshold)?;
    let dominant_frequency = dominant_frequency(&filtered.values, dt)?;

    let decimals = config.signal.decimals;
    let num_features = spectrum.power.len();
    let psd: Vec<f64> = spectrum
        .power
        .iter()
        .map(|p: &Complex64| round_to(p.re, decimals))
        .collect();
    let times: Vec<f64> = centered
        .indices()
        .iter()
        .take(num_features)
        .map(|&i| round_to(i as f64, decimals))
        .collect();
    let actual: Vec<f64> = voltages
        .iter()
        .take(num_features)
        .map(|&v| round_to(v, decimals))
        .collect();

    let x = pair_columns(&psd, &times)?;
    let y = column(&actual);

    let mut network = RegressionNetwork::new(config.network.hidden_size, rng)?;
    let record = network.train(&x, &y, &config.network)?;
    let predicted = network.predict(&x)?.iter().cloned().collect();

    Ok(PipelineOutput {
        trace,
        centered,
        band,
        filtered,
        spectrum,
        dominant_frequency,
        record,
        network,
        predicted,
        actual,
    })
}
