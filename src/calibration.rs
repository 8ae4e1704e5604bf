//! Amplitude calibration
//!
//! Pre-session operator workflow: play a looped test tone at a candidate
//! amplitude, read a replacement from the operator, resynthesize and
//! replay, until the input no longer parses as an amplitude - at which
//! point the last confirmed value is fixed for the session. Invoked twice,
//! once for the background minimum level and once for the stimulus peak,
//! before any worker starts.

use std::io::Write;

use crate::audio::OutputDevice;
use crate::config::SynthConfig;
use crate::error::AudioError;
use crate::synth::calibration_tone;

/// Operator input seam; console-backed in the CLI, scripted in tests.
pub trait Prompt {
    /// Display `prompt` and read one line. `None` reports end of input.
    fn read_line(&mut self, prompt: &str) -> Option<String>;
}

/// Stdin/stdout prompt for interactive sessions.
#[derive(Debug, Default)]
pub struct ConsolePrompt;

impl Prompt for ConsolePrompt {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        print!("{}", prompt);
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line),
            Err(_) => None,
        }
    }
}

/// Interpretation of one line of operator input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmplitudeInput {
    /// Parsed and within [0, 1]: becomes the new candidate.
    Accepted(f32),
    /// Parsed but outside [0, 1]: rejected, the loop continues.
    OutOfRange(f32),
    /// Not a number (or empty): the operator is done calibrating.
    Done,
}

/// Validate one line of operator input as a candidate amplitude.
pub fn parse_amplitude(input: &str) -> AmplitudeInput {
    match input.trim().parse::<f32>() {
        Ok(value) if (0.0..=1.0).contains(&value) => AmplitudeInput::Accepted(value),
        Ok(value) => AmplitudeInput::OutOfRange(value),
        Err(_) => AmplitudeInput::Done,
    }
}

/// Run one calibration loop and return the confirmed amplitude.
///
/// Each iteration blocks on a full test-tone playback, then prompts. An
/// accepted value resynthesizes the tone; an out-of-range value reprompts
/// without changing the candidate; anything unparseable confirms the
/// current candidate and ends the loop.
pub fn calibrate<D: OutputDevice, P: Prompt>(
    initial: f32,
    device: &mut D,
    prompt: &mut P,
    sample_rate: u32,
    config: &SynthConfig,
) -> Result<f32, AudioError> {
    let mut amplitude = initial;
    let mut tone = calibration_tone(amplitude, sample_rate, config);

    loop {
        device.write(&tone)?;

        let message = format!(
            "Previous Amplitude = {}\nEnter a new amplitude value (0-1): ",
            amplitude
        );
        let Some(line) = prompt.read_line(&message) else {
            break;
        };

        match parse_amplitude(&line) {
            AmplitudeInput::Accepted(value) => {
                tracing::info!("[Calibration] Amplitude updated to {}", value);
                amplitude = value;
                tone = calibration_tone(amplitude, sample_rate, config);
            }
            AmplitudeInput::OutOfRange(value) => {
                tracing::warn!(
                    "[Calibration] Rejected amplitude {} (must be within 0-1)",
                    value
                );
            }
            AmplitudeInput::Done => break,
        }
    }

    tracing::info!("[Calibration] Confirmed amplitude {}", amplitude);
    Ok(amplitude)
}
