//! Scope-exit trigger guard.

use crate::signal::Signal;

/// Triggers the wrapped signal when dropped.
///
/// Created by [`Signal::trigger_on_drop`]. Dropping the guard on any exit
/// path (normal return, early return, `?` propagation, unwinding) fires the
/// signal and waits for its callbacks to finish.
#[must_use = "the signal is triggered as soon as the guard is dropped"]
#[derive(Debug)]
pub struct TriggerOnDrop {
    signal: Signal,
}

impl TriggerOnDrop {
    pub(crate) fn new(signal: Signal) -> Self {
        Self { signal }
    }

    /// The guarded signal.
    pub fn signal(&self) -> &Signal {
        &self.signal
    }
}

impl Drop for TriggerOnDrop {
    fn drop(&mut self) {
        self.signal.trigger();
    }
}
