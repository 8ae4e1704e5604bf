//! Waveform synthesis for the background and stimulus buffers
//!
//! Pure functions producing fixed-length mono f32 sample buffers:
//! - Deterministic for a given seed (reproducible sessions and tests)
//! - No device I/O; buffers are synthesized once at session start
//! - Amplitudes parameterized by the operator-confirmed calibration levels

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;

use crate::config::SynthConfig;

/// Gaussian noise via the Box-Muller transform over uniform draws.
///
/// The modulator is centered at 0.5 with a small deviation, so the noise
/// floor stays positive and the envelope shape survives modulation.
fn gaussian_noise(rng: &mut StdRng, len: usize, mean: f32, sd: f32) -> Vec<f32> {
    let mut samples = Vec::with_capacity(len);
    while samples.len() < len {
        let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
        let u2: f32 = rng.gen_range(0.0..1.0);
        let radius = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;
        samples.push(mean + sd * radius * theta.cos());
        if samples.len() < len {
            samples.push(mean + sd * radius * theta.sin());
        }
    }
    samples
}

/// Linear amplitude ramp from 0 to `amplitude` over `len` samples.
fn linear_ramp(amplitude: f32, len: usize) -> Vec<f32> {
    if len <= 1 {
        return vec![amplitude; len];
    }
    (0..len)
        .map(|i| amplitude * i as f32 / (len - 1) as f32)
        .collect()
}

/// Symmetric Hann window of `len` samples.
fn hann_window(len: usize) -> Vec<f32> {
    if len <= 1 {
        return vec![0.0; len];
    }
    (0..len)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (len - 1) as f32).cos()))
        .collect()
}

/// Noise buffer with linear on/off ramps, modulated by its own noise.
///
/// This is the shared base shape for the background loop and the
/// calibration test tone: Gaussian noise scaled to `amplitude`, the first
/// and last `ramp_secs` replaced by linear onset/offset ramps, then the
/// whole buffer multiplied by the noise a second time.
fn ramped_noise(
    rng: &mut StdRng,
    amplitude: f32,
    duration_secs: f32,
    sample_rate: u32,
    config: &SynthConfig,
) -> Vec<f32> {
    let len = (duration_secs * sample_rate as f32) as usize;
    let noise = gaussian_noise(rng, len, config.noise_mean, config.noise_sd);

    let mut wave: Vec<f32> = noise.iter().map(|n| amplitude * n).collect();

    let window = ((sample_rate as f32 * config.ramp_secs) as usize).min(len / 2);
    let ramp = linear_ramp(amplitude, window);
    wave[..window].copy_from_slice(&ramp);
    for (dst, src) in wave[len - window..].iter_mut().zip(ramp.iter().rev()) {
        *dst = *src;
    }

    for (sample, n) in wave.iter_mut().zip(noise.iter()) {
        *sample *= n;
    }
    wave
}

/// Synthesize the looped background buffer.
///
/// On top of the ramped noise base, both ends are shaped by half of a Hann
/// window (`loop_window_secs` full length, one half per end): fade-in over
/// the head, fade-out over the tail. Both loop edges sit near zero, so
/// repeated playback splices without an audible click.
pub fn background_noise(amplitude: f32, sample_rate: u32, config: &SynthConfig) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(config.noise_seed);
    let mut wave = ramped_noise(
        &mut rng,
        amplitude,
        config.background_secs,
        sample_rate,
        config,
    );

    let len = wave.len();
    let hann = hann_window((sample_rate as f32 * config.loop_window_secs) as usize);
    let half = (hann.len() / 2).min(len / 2);
    for i in 0..half {
        wave[i] *= hann[i];
        wave[len - half + i] *= hann[hann.len() - half + i];
    }
    wave
}

/// Synthesize the 5 s calibration test tone at a candidate amplitude.
pub fn calibration_tone(amplitude: f32, sample_rate: u32, config: &SynthConfig) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(config.noise_seed);
    ramped_noise(&mut rng, amplitude, config.tone_secs, sample_rate, config)
}

/// One stimulus envelope period: linear rise from `base` to `peak` over
/// `rise_secs`, then a plateau back at `base` for `plateau_secs`.
///
/// The plateau sits at the base level, not the peak; the peak is the
/// instantaneous top of the rise. This matches the task's looming profile.
pub fn stimulus_period(base: f32, peak: f32, sample_rate: u32, config: &SynthConfig) -> Vec<f32> {
    let rise_len = (sample_rate as f32 * config.rise_secs) as usize;
    let plateau_len = (sample_rate as f32 * config.plateau_secs) as usize;

    let mut period = Vec::with_capacity(rise_len + plateau_len);
    if rise_len == 1 {
        period.push(base);
    } else {
        for i in 0..rise_len {
            period.push(base + (peak - base) * i as f32 / (rise_len - 1) as f32);
        }
    }
    period.extend(std::iter::repeat(base).take(plateau_len));
    period
}

/// Synthesize the one-shot stimulus buffer: `stimulus_periods` repetitions
/// of the rise/plateau envelope, modulated by Gaussian noise.
///
/// The sample count is fixed at synthesis time and never recomputed
/// mid-session: `stimulus_periods * (rise_secs + plateau_secs) * fs`.
pub fn stimulus_wave(base: f32, peak: f32, sample_rate: u32, config: &SynthConfig) -> Vec<f32> {
    let period = stimulus_period(base, peak, sample_rate, config);

    let mut wave = Vec::with_capacity(period.len() * config.stimulus_periods);
    for _ in 0..config.stimulus_periods {
        wave.extend_from_slice(&period);
    }

    let mut rng = StdRng::seed_from_u64(config.noise_seed);
    let noise = gaussian_noise(&mut rng, wave.len(), config.noise_mean, config.noise_sd);
    for (sample, n) in wave.iter_mut().zip(noise.iter()) {
        *sample *= n;
    }
    wave
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: u32 = 44_100;
    const SPLICE_EPSILON: f32 = 1e-3;

    fn config() -> SynthConfig {
        SynthConfig::default()
    }

    #[test]
    fn test_background_length() {
        let config = config();
        let wave = background_noise(0.2, FS, &config);
        assert_eq!(wave.len(), (FS as f32 * config.background_secs) as usize);
    }

    #[test]
    fn test_background_is_deterministic() {
        let config = config();
        let a = background_noise(0.2, FS, &config);
        let b = background_noise(0.2, FS, &config);
        assert_eq!(a, b, "fixed seed must reproduce the buffer exactly");
    }

    #[test]
    fn test_background_loop_splice_is_continuous() {
        // The windowed-ends property: both loop edges sit near zero, so the
        // splice point of buffer-concatenated-with-itself has no jump.
        let wave = background_noise(0.2, FS, &config());
        let first = wave[0];
        let last = wave[wave.len() - 1];
        assert!(first.abs() < SPLICE_EPSILON, "leading edge {} not windowed", first);
        assert!(last.abs() < SPLICE_EPSILON, "trailing edge {} not windowed", last);
        assert!((last - first).abs() < SPLICE_EPSILON);
    }

    #[test]
    fn test_background_interior_has_signal() {
        let wave = background_noise(0.2, FS, &config());
        let mid = wave.len() / 2;
        let rms: f32 = (wave[mid..mid + 4096]
            .iter()
            .map(|s| s * s)
            .sum::<f32>()
            / 4096.0)
            .sqrt();
        assert!(rms > 0.01, "interior rms {} unexpectedly silent", rms);
    }

    #[test]
    fn test_linear_ramp_is_linear() {
        let ramp = linear_ramp(0.8, 1000);
        assert_eq!(ramp[0], 0.0);
        assert!((ramp[999] - 0.8).abs() < 1e-6);
        // Constant first difference
        let step = ramp[1] - ramp[0];
        for pair in ramp.windows(2) {
            assert!((pair[1] - pair[0] - step).abs() < 1e-5);
        }
    }

    #[test]
    fn test_stimulus_sample_count_exact() {
        // 10 periods of 1.0 s at fs is exactly 10 * fs samples
        let config = config();
        let wave = stimulus_wave(0.2, 0.7, FS, &config);
        assert_eq!(wave.len(), 10 * FS as usize);
    }

    #[test]
    fn test_stimulus_period_envelope_shape() {
        let config = config();
        let period = stimulus_period(0.2, 0.7, FS, &config);
        let rise_len = (FS as f32 * config.rise_secs) as usize;

        // Monotonic rise over the first 0.4 * fs samples
        for pair in period[..rise_len].windows(2) {
            assert!(pair[1] >= pair[0], "rise not monotonic");
        }
        assert!((period[0] - 0.2).abs() < 1e-6);
        assert!((period[rise_len - 1] - 0.7).abs() < 1e-6);

        // Plateau at the base level for the remaining 0.6 * fs samples
        for &sample in &period[rise_len..] {
            assert!((sample - 0.2).abs() < 1e-6, "plateau must sit at base");
        }
    }

    #[test]
    fn test_stimulus_is_deterministic() {
        let config = config();
        let a = stimulus_wave(0.2, 0.7, FS, &config);
        let b = stimulus_wave(0.2, 0.7, FS, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_calibration_tone_length_and_ramp() {
        let config = config();
        let tone = calibration_tone(0.4, FS, &config);
        assert_eq!(tone.len(), (FS as f32 * config.tone_secs) as usize);
        // Ramps force silent edges even without the Hann loop windows
        assert_eq!(tone[0], 0.0);
        assert_eq!(tone[tone.len() - 1], 0.0);
    }

    #[test]
    fn test_gaussian_noise_statistics() {
        let mut rng = StdRng::seed_from_u64(7);
        let noise = gaussian_noise(&mut rng, 100_000, 0.5, 0.1);
        let mean: f32 = noise.iter().sum::<f32>() / noise.len() as f32;
        let var: f32 =
            noise.iter().map(|n| (n - mean) * (n - mean)).sum::<f32>() / noise.len() as f32;
        assert!((mean - 0.5).abs() < 0.01, "mean {} off target", mean);
        assert!((var.sqrt() - 0.1).abs() < 0.01, "sd {} off target", var.sqrt());
    }
}
