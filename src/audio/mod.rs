//! Audio output
//!
//! Two independently clocked workers share this module: the background
//! loop and the one-shot stimulus player. Both talk to the output device
//! collaborator through [OutputDevice], whose blocking `write` is the only
//! timing source either worker has - there is no separate clock or sleep.

pub mod background;
mod device_cpal;
pub mod stimulus;

pub use background::{spawn_background_worker, BackgroundWorker};
pub use device_cpal::{CpalOutput, CpalOutputFactory};
pub use stimulus::{spawn_stimulus_worker, StimulusWorker};

use crate::error::AudioError;

/// Exclusive handle to one audio output stream.
///
/// `write` blocks the calling worker until the device has consumed every
/// submitted sample. Implementations must release the underlying stream on
/// `release` and again defensively on drop; a worker must never leave a
/// device open after observing the stop flag.
pub trait OutputDevice {
    fn write(&mut self, samples: &[f32]) -> Result<(), AudioError>;
    fn release(&mut self);
}

/// Opens one exclusive device instance per worker.
///
/// The factory crosses the thread boundary instead of the device itself:
/// each worker opens its stream on its own thread, which keeps
/// non-`Send` platform stream handles where they were created.
pub trait OutputFactory: Send + 'static {
    type Device: OutputDevice;
    fn open(&self) -> Result<Self::Device, AudioError>;
}
