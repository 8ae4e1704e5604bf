//! Stimulus audio worker
//!
//! Blocks on the trigger signal; on wake, plays the entire one-shot
//! stimulus buffer (the full ~10 s, not interruptible mid-playback), clears
//! the trigger, then checks the stop flag before returning to its wait.
//!
//! At most one playback is ever in flight. The trigger slot holds at most
//! one pending trigger: an edge raised during playback in the window after
//! the post-playback clear is dropped until the worker is back in its wait
//! state. This is the documented single-slot design, not a queue.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::{OutputDevice, OutputFactory};
use crate::error::log_audio_error;
use crate::signal::{SessionSignals, TriggerWait};

pub struct StimulusWorker<D: OutputDevice> {
    device: D,
    buffer: Arc<Vec<f32>>,
    signals: SessionSignals,
}

impl<D: OutputDevice> StimulusWorker<D> {
    pub fn new(device: D, buffer: Arc<Vec<f32>>, signals: SessionSignals) -> Self {
        Self {
            device,
            buffer,
            signals,
        }
    }

    pub fn run(mut self) {
        tracing::info!(
            "[StimulusWorker] Started, stimulus is {} samples",
            self.buffer.len()
        );

        loop {
            match self.signals.trigger.wait() {
                TriggerWait::Interrupted => break,
                TriggerWait::Raised => {}
            }

            tracing::info!("[StimulusWorker] Trigger observed, playing stimulus");
            if let Err(err) = self.device.write(&self.buffer) {
                log_audio_error(&err, "stimulus playback");
                break;
            }

            self.signals.trigger.clear();
            if self.signals.stop.is_raised() {
                break;
            }
        }

        self.device.release();
        tracing::info!("[StimulusWorker] Stopped, device released");
    }
}

/// Spawn the stimulus worker on its own thread; the device opens on the
/// worker thread, mirroring the background worker.
pub fn spawn_stimulus_worker<F: OutputFactory>(
    factory: F,
    buffer: Arc<Vec<f32>>,
    signals: SessionSignals,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let device = match factory.open() {
            Ok(device) => device,
            Err(err) => {
                log_audio_error(&err, "stimulus device open");
                return;
            }
        };
        StimulusWorker::new(device, buffer, signals).run();
    })
}
