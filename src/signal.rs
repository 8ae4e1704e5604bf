//! Cross-thread coordination signals
//!
//! Exactly two signals connect the tracking loop to the audio workers: the
//! auto-resetting stimulus trigger and the sticky stop flag. There are no
//! buffered queues anywhere in the session; these two flags are the entire
//! cross-unit protocol.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct TriggerState {
    raised: bool,
    interrupted: bool,
}

/// Outcome of a blocking wait on the stimulus trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerWait {
    /// The trigger was raised; the caller should play the stimulus.
    Raised,
    /// The session stop path woke the waiter; the caller should exit.
    Interrupted,
}

/// Single-slot, auto-resetting trigger flag.
///
/// `raise` while already raised is a no-op: rapid consecutive triggers
/// coalesce into at most one pending playback. The stimulus worker observes
/// the flag with `wait`, plays the full buffer, then calls `clear`; a
/// trigger raised during playback before the clear coalesces into the slot
/// and is wiped by the clear, so it is dropped. This at-most-one-pending
/// design is intentional and documented; it is not a queue.
#[derive(Debug, Default)]
pub struct StimulusTrigger {
    state: Mutex<TriggerState>,
    signaled: Condvar,
}

impl StimulusTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TriggerState> {
        // A poisoned signal lock only means a peer panicked between store
        // and notify; the boolean state is still coherent.
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Raise the trigger. Idempotent: raising an already-raised trigger has
    /// the same observable effect as raising it once.
    pub fn raise(&self) {
        let mut state = self.lock();
        if !state.raised {
            state.raised = true;
            self.signaled.notify_all();
        }
    }

    /// Clear the pending trigger slot.
    pub fn clear(&self) {
        self.lock().raised = false;
    }

    pub fn is_raised(&self) -> bool {
        self.lock().raised
    }

    /// Sticky wake-up for the session stop path. A waiter parked in `wait`
    /// returns `Interrupted`; future waits return `Interrupted` immediately.
    pub fn interrupt(&self) {
        let mut state = self.lock();
        state.interrupted = true;
        self.signaled.notify_all();
    }

    /// Block until the trigger is raised or the session is interrupted.
    ///
    /// Does not consume the flag; the caller clears it after servicing,
    /// mirroring the wait/act/clear contract of the stimulus worker. A
    /// trigger already pending when the interrupt lands is still reported
    /// as `Raised`: a stimulus earned before shutdown is played out, and
    /// the worker observes the stop flag after its post-playback clear.
    pub fn wait(&self) -> TriggerWait {
        let mut state = self.lock();
        loop {
            if state.raised {
                return TriggerWait::Raised;
            }
            if state.interrupted {
                return TriggerWait::Interrupted;
            }
            state = self
                .signaled
                .wait(state)
                .unwrap_or_else(|err| err.into_inner());
        }
    }
}

/// Sticky end-session flag. Once raised it is never cleared.
#[derive(Debug, Default)]
pub struct StopFlag {
    raised: AtomicBool,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

/// The session's complete signal set, shared by the tracking loop and both
/// audio workers.
#[derive(Debug, Clone, Default)]
pub struct SessionSignals {
    pub trigger: Arc<StimulusTrigger>,
    pub stop: Arc<StopFlag>,
}

impl SessionSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin cooperative shutdown: raise the sticky stop flag and wake a
    /// stimulus worker parked on the trigger.
    pub fn request_stop(&self) {
        self.stop.raise();
        self.trigger.interrupt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_raise_is_idempotent() {
        let trigger = StimulusTrigger::new();
        trigger.raise();
        trigger.raise();
        trigger.raise();
        assert!(trigger.is_raised());

        // One clear drains everything the repeated raises produced
        trigger.clear();
        assert!(!trigger.is_raised());
    }

    #[test]
    fn test_wait_returns_raised() {
        let trigger = Arc::new(StimulusTrigger::new());
        let waiter = {
            let trigger = Arc::clone(&trigger);
            thread::spawn(move || trigger.wait())
        };

        thread::sleep(Duration::from_millis(20));
        trigger.raise();
        assert_eq!(waiter.join().unwrap(), TriggerWait::Raised);
        assert!(trigger.is_raised(), "wait must not consume the flag");
    }

    #[test]
    fn test_interrupt_wakes_parked_waiter() {
        let trigger = Arc::new(StimulusTrigger::new());
        let waiter = {
            let trigger = Arc::clone(&trigger);
            thread::spawn(move || trigger.wait())
        };

        thread::sleep(Duration::from_millis(20));
        trigger.interrupt();
        assert_eq!(waiter.join().unwrap(), TriggerWait::Interrupted);

        // Interrupt is sticky
        assert_eq!(trigger.wait(), TriggerWait::Interrupted);
    }

    #[test]
    fn test_pending_trigger_serviced_before_interrupt() {
        let trigger = StimulusTrigger::new();
        trigger.raise();
        trigger.interrupt();
        // A stimulus earned before shutdown still plays out
        assert_eq!(trigger.wait(), TriggerWait::Raised);
        trigger.clear();
        assert_eq!(trigger.wait(), TriggerWait::Interrupted);
    }

    #[test]
    fn test_stop_flag_is_sticky() {
        let stop = StopFlag::new();
        assert!(!stop.is_raised());
        stop.raise();
        assert!(stop.is_raised());
        stop.raise();
        assert!(stop.is_raised());
    }

    #[test]
    fn test_request_stop_wakes_and_marks() {
        let signals = SessionSignals::new();
        let waiter = {
            let trigger = Arc::clone(&signals.trigger);
            thread::spawn(move || trigger.wait())
        };

        thread::sleep(Duration::from_millis(20));
        signals.request_stop();
        assert_eq!(waiter.join().unwrap(), TriggerWait::Interrupted);
        assert!(signals.stop.is_raised());
    }
}
