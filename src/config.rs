//! Session configuration
//!
//! This module provides the session configuration object constructed once at
//! startup and handed into each execution unit; there are no ambient
//! globals. Values load from a JSON file so amplitude envelopes and timing
//! can be adjusted without recompilation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub audio: AudioConfig,
    pub synth: SynthConfig,
    pub calibration: CalibrationDefaults,
    pub shutdown: ShutdownConfig,
}

/// Audio output format parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Device buffer size in frames per write
    pub frames_per_buffer: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            frames_per_buffer: 1024,
        }
    }
}

/// Waveform synthesis parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    /// Background noise duration per loop iteration in seconds
    pub background_secs: f32,
    /// Linear onset/offset ramp duration in seconds
    pub ramp_secs: f32,
    /// Full Hann window length for the loop splice edges in seconds
    pub loop_window_secs: f32,
    /// Number of rise/plateau periods in one stimulus
    pub stimulus_periods: usize,
    /// Rising portion of each stimulus period in seconds
    pub rise_secs: f32,
    /// Plateau portion of each stimulus period in seconds
    pub plateau_secs: f32,
    /// Calibration test tone duration in seconds
    pub tone_secs: f32,
    /// Mean of the Gaussian noise modulator
    pub noise_mean: f32,
    /// Standard deviation of the Gaussian noise modulator
    pub noise_sd: f32,
    /// Seed for the noise generator; fixed so buffers are reproducible
    pub noise_seed: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            background_secs: 50.0,
            ramp_secs: 0.25,
            loop_window_secs: 0.5,
            stimulus_periods: 10,
            rise_secs: 0.4,
            plateau_secs: 0.6,
            tone_secs: 5.0,
            noise_mean: 0.5,
            noise_sd: 0.1,
            noise_seed: 42,
        }
    }
}

/// Starting amplitudes offered to the operator during calibration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationDefaults {
    /// Candidate background minimum amplitude
    pub background_min: f32,
    /// Candidate stimulus peak amplitude
    pub stimulus_peak: f32,
}

impl Default for CalibrationDefaults {
    fn default() -> Self {
        Self {
            background_min: 0.2,
            stimulus_peak: 0.7,
        }
    }
}

/// Cooperative shutdown parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// Bounded wait for each audio worker to observe the stop flag, in
    /// seconds. Must exceed one full stimulus write or orderly shutdown
    /// degrades to the logged forced-detach path.
    pub join_timeout_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            join_timeout_secs: 15,
        }
    }
}

impl Default for SessionConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            synth: SynthConfig::default(),
            calibration: CalibrationDefaults::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from a JSON file, falling back to defaults when the
    /// file is missing or malformed.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    tracing::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Number of samples in one stimulus buffer.
    pub fn stimulus_samples(&self) -> usize {
        let fs = self.audio.sample_rate as f32;
        let period = (fs * self.synth.rise_secs) as usize + (fs * self.synth.plateau_secs) as usize;
        period * self.synth.stimulus_periods
    }
}
