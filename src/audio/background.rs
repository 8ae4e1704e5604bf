//! Background audio worker
//!
//! Loops the background buffer into its exclusive output device for the
//! lifetime of the session. The worker is unaffected by stimulus triggers;
//! its only input besides the immutable buffer is the sticky stop flag,
//! checked between writes so the in-flight write always completes.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::{OutputDevice, OutputFactory};
use crate::error::log_audio_error;
use crate::signal::StopFlag;

pub struct BackgroundWorker<D: OutputDevice> {
    device: D,
    buffer: Arc<Vec<f32>>,
    stop: Arc<StopFlag>,
}

impl<D: OutputDevice> BackgroundWorker<D> {
    pub fn new(device: D, buffer: Arc<Vec<f32>>, stop: Arc<StopFlag>) -> Self {
        Self {
            device,
            buffer,
            stop,
        }
    }

    pub fn run(mut self) {
        tracing::info!(
            "[BackgroundWorker] Started, looping {} samples",
            self.buffer.len()
        );

        while !self.stop.is_raised() {
            if let Err(err) = self.device.write(&self.buffer) {
                log_audio_error(&err, "background playback");
                break;
            }
        }

        self.device.release();
        tracing::info!("[BackgroundWorker] Stopped, device released");
    }
}

/// Spawn the background worker on its own thread. The device is opened on
/// the worker thread itself; an open failure ends that worker only and is
/// logged, never propagated across threads.
pub fn spawn_background_worker<F: OutputFactory>(
    factory: F,
    buffer: Arc<Vec<f32>>,
    stop: Arc<StopFlag>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let device = match factory.open() {
            Ok(device) => device,
            Err(err) => {
                log_audio_error(&err, "background device open");
                return;
            }
        };
        BackgroundWorker::new(device, buffer, stop).run();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubFactory, StubOutput};
    use std::time::Duration;

    #[test]
    fn test_background_loops_until_stopped() {
        let stop = Arc::new(StopFlag::new());
        let factory = StubFactory::new().with_write_delay(Duration::from_millis(5));
        let probe = factory.probe();
        let buffer = Arc::new(vec![0.1f32; 64]);

        let handle = spawn_background_worker(factory, buffer, Arc::clone(&stop));

        // Let a few loop iterations through, then stop
        std::thread::sleep(Duration::from_millis(40));
        stop.raise();
        handle.join().unwrap();

        let writes = probe.writes();
        assert!(writes.len() >= 2, "expected repeated writes, got {}", writes.len());
        assert!(writes.iter().all(|len| *len == 64));
        assert!(probe.released(), "device must be released on stop");
    }

    #[test]
    fn test_background_stops_immediately_when_flag_preraised() {
        let stop = Arc::new(StopFlag::new());
        stop.raise();
        let factory = StubFactory::new();
        let probe = factory.probe();

        let device = StubOutput::new(probe.clone(), None);
        BackgroundWorker::new(device, Arc::new(vec![0.0; 16]), stop).run();

        assert!(probe.writes().is_empty());
        assert!(probe.released());
    }
}
