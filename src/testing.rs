//! Deterministic test doubles
//!
//! Shared by unit and integration tests (and usable from dry-run tooling):
//! a recording output device that simulates write latency without any audio
//! hardware, and a scripted operator prompt. Kept in the crate proper so
//! `tests/` and doctests reach them through the public API.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::audio::{OutputDevice, OutputFactory};
use crate::calibration::Prompt;
use crate::error::AudioError;

/// Shared view into the recorded activity of every device a stub factory
/// has opened.
#[derive(Debug, Clone, Default)]
pub struct StubProbe {
    writes: Arc<Mutex<Vec<usize>>>,
    releases: Arc<AtomicUsize>,
}

impl StubProbe {
    /// Lengths of every completed write, in order.
    pub fn writes(&self) -> Vec<usize> {
        self.writes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of devices released so far.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> bool {
        self.releases() > 0
    }
}

/// Recording output device. Each write is logged and optionally delayed to
/// simulate the blocking consumption of a real device buffer.
pub struct StubOutput {
    probe: StubProbe,
    write_delay: Option<Duration>,
    released: bool,
}

impl StubOutput {
    pub fn new(probe: StubProbe, write_delay: Option<Duration>) -> Self {
        Self {
            probe,
            write_delay,
            released: false,
        }
    }
}

impl OutputDevice for StubOutput {
    fn write(&mut self, samples: &[f32]) -> Result<(), AudioError> {
        if let Some(delay) = self.write_delay {
            std::thread::sleep(delay);
        }
        self.probe
            .writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(samples.len());
        Ok(())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.probe.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Factory producing [StubOutput] devices that all report into one probe.
#[derive(Debug, Clone, Default)]
pub struct StubFactory {
    probe: StubProbe,
    write_delay: Option<Duration>,
}

impl StubFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    pub fn probe(&self) -> StubProbe {
        self.probe.clone()
    }
}

impl OutputFactory for StubFactory {
    type Device = StubOutput;

    fn open(&self) -> Result<StubOutput, AudioError> {
        Ok(StubOutput::new(self.probe.clone(), self.write_delay))
    }
}

/// Prompt replaying a scripted sequence of operator inputs; end of script
/// reads as end of input.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    lines: VecDeque<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn read_line(&mut self, _prompt: &str) -> Option<String> {
        self.lines.pop_front()
    }
}
