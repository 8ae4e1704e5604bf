//! CPAL-based blocking output device
//!
//! Opens a mono f32 output stream at the session sample rate with a fixed
//! buffer size and adapts cpal's pull callback to the blocking-write
//! contract of [OutputDevice]: `write` submits a sample slice and parks the
//! caller until the callback has drained it. Multi-channel devices get the
//! mono signal replicated across channels.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use super::{OutputDevice, OutputFactory};
use crate::config::AudioConfig;
use crate::error::AudioError;

/// Samples pending consumption by the output callback.
#[derive(Default)]
struct PlaybackState {
    pending: Vec<f32>,
    cursor: usize,
}

struct SharedFeed {
    state: Mutex<PlaybackState>,
    drained: Condvar,
    stream_failed: AtomicBool,
}

impl SharedFeed {
    fn new() -> Self {
        Self {
            state: Mutex::new(PlaybackState::default()),
            drained: Condvar::new(),
            stream_failed: AtomicBool::new(false),
        }
    }
}

pub struct CpalOutput {
    stream: Option<cpal::Stream>,
    feed: Arc<SharedFeed>,
}

impl CpalOutput {
    /// Open the default output device with the session's fixed format.
    pub fn open(config: &AudioConfig) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::DeviceUnavailable)?;

        let default_config =
            device
                .default_output_config()
                .map_err(|e| AudioError::StreamOpenFailed {
                    reason: format!("Failed to get default output config: {:?}", e),
                })?;

        if default_config.sample_format() != cpal::SampleFormat::F32 {
            return Err(AudioError::UnsupportedFormat {
                format: format!("{:?}", default_config.sample_format()),
            });
        }

        let channels = default_config.channels() as usize;
        let stream_config = cpal::StreamConfig {
            channels: default_config.channels(),
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(config.frames_per_buffer),
        };

        let feed = Arc::new(SharedFeed::new());
        let callback_feed = Arc::clone(&feed);
        let err_feed = Arc::clone(&feed);

        let err_fn = move |err| {
            tracing::error!("[CpalOutput] Output stream error: {}", err);
            err_feed.stream_failed.store(true, Ordering::SeqCst);
            err_feed.drained.notify_all();
        };

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // Never block the audio callback: when the writer holds
                    // the lock, emit silence for this period instead.
                    let Ok(mut state) = callback_feed.state.try_lock() else {
                        data.fill(0.0);
                        return;
                    };
                    let frame_count = data.len() / channels;
                    for i in 0..frame_count {
                        let sample = if state.cursor < state.pending.len() {
                            let s = state.pending[state.cursor];
                            state.cursor += 1;
                            s
                        } else {
                            0.0
                        };
                        for ch in 0..channels {
                            data[i * channels + ch] = sample;
                        }
                    }
                    if state.cursor >= state.pending.len() && !state.pending.is_empty() {
                        callback_feed.drained.notify_all();
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("{:?}", e),
            })?;

        stream.play().map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Output start failed: {}", e),
        })?;

        Ok(Self {
            stream: Some(stream),
            feed,
        })
    }
}

impl OutputDevice for CpalOutput {
    fn write(&mut self, samples: &[f32]) -> Result<(), AudioError> {
        if self.stream.is_none() {
            return Err(AudioError::PlaybackFailed {
                reason: "device already released".to_string(),
            });
        }

        let mut state = self
            .feed
            .state
            .lock()
            .map_err(|_| AudioError::LockPoisoned {
                component: "playback feed".to_string(),
            })?;
        state.pending.clear();
        state.pending.extend_from_slice(samples);
        state.cursor = 0;

        // Park until the callback drains the submission. The periodic
        // timeout only re-checks for stream death; it is not a pacing
        // mechanism.
        while state.cursor < state.pending.len() {
            if self.feed.stream_failed.load(Ordering::SeqCst) {
                return Err(AudioError::PlaybackFailed {
                    reason: "output stream failed mid-write".to_string(),
                });
            }
            let (guard, _timeout) = self
                .feed
                .drained
                .wait_timeout(state, Duration::from_millis(100))
                .map_err(|_| AudioError::LockPoisoned {
                    component: "playback feed".to_string(),
                })?;
            state = guard;
        }
        state.pending.clear();
        state.cursor = 0;
        Ok(())
    }

    fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("[CpalOutput] Output stream released");
        }
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.release();
    }
}

/// Factory handing each audio worker its own cpal device.
#[derive(Debug, Clone)]
pub struct CpalOutputFactory {
    config: AudioConfig,
}

impl CpalOutputFactory {
    pub fn new(config: AudioConfig) -> Self {
        Self { config }
    }
}

impl OutputFactory for CpalOutputFactory {
    type Device = CpalOutput;

    fn open(&self) -> Result<CpalOutput, AudioError> {
        CpalOutput::open(&self.config)
    }
}
