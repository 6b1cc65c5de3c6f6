//! The signal tree.

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

use crate::guard::TriggerOnDrop;

type Callback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Armed,
    Firing,
    Fired,
}

struct State {
    phase: Phase,
    callbacks: Vec<Callback>,
    children: Vec<Weak<Node>>,
}

struct Node {
    signaled: AtomicBool,
    state: Mutex<State>,
    fired: Condvar,
}

impl Node {
    fn new(phase: Phase) -> Self {
        Self {
            signaled: AtomicBool::new(phase != Phase::Armed),
            state: Mutex::new(State {
                phase,
                callbacks: Vec::new(),
                children: Vec::new(),
            }),
            fired: Condvar::new(),
        }
    }

    fn trigger(&self) {
        let (callbacks, children) = {
            let mut state = self.state.lock();
            match state.phase {
                Phase::Fired => return,
                Phase::Firing => {
                    // Another thread is running the callbacks; wait them out.
                    while state.phase != Phase::Fired {
                        self.fired.wait(&mut state);
                    }
                    return;
                }
                Phase::Armed => {
                    state.phase = Phase::Firing;
                    self.signaled.store(true, Ordering::Release);
                    (
                        std::mem::take(&mut state.callbacks),
                        std::mem::take(&mut state.children),
                    )
                }
            }
        };

        trace!(
            callbacks = callbacks.len(),
            children = children.len(),
            "signal triggered"
        );

        for callback in callbacks {
            callback();
        }

        for child in children.iter().filter_map(Weak::upgrade) {
            child.trigger();
        }

        let mut state = self.state.lock();
        state.phase = Phase::Fired;
        self.fired.notify_all();
    }
}

/// A hierarchical one-shot cancellation signal.
///
/// Cloning a `Signal` yields another handle to the same signal. Use
/// [`Signal::derive`] to create an independent child.
#[derive(Clone)]
pub struct Signal {
    node: Arc<Node>,
}

impl Signal {
    /// Create a new, armed root signal.
    pub fn new() -> Self {
        Self {
            node: Arc::new(Node::new(Phase::Armed)),
        }
    }

    /// Derive a child signal.
    ///
    /// The child is triggered when this signal is triggered. Triggering the
    /// child has no effect on this signal. A child derived from a signal that
    /// has already been triggered is born triggered.
    pub fn derive(&self) -> Signal {
        let mut state = self.node.state.lock();
        if state.phase != Phase::Armed {
            return Signal {
                node: Arc::new(Node::new(Phase::Fired)),
            };
        }

        let child = Arc::new(Node::new(Phase::Armed));
        state.children.retain(|weak| weak.strong_count() > 0);
        state.children.push(Arc::downgrade(&child));
        Signal { node: child }
    }

    /// Trigger the signal.
    ///
    /// Runs every registered callback, then triggers every derived signal.
    /// Triggering is idempotent; a call that races with an in-progress
    /// trigger returns once the callbacks have finished.
    ///
    /// Callbacks must not trigger the signal they were registered on.
    pub fn trigger(&self) {
        self.node.trigger();
    }

    /// Whether the signal has been triggered.
    pub fn is_signaled(&self) -> bool {
        self.node.signaled.load(Ordering::Acquire)
    }

    /// Register a callback to run exactly once when the signal is triggered.
    ///
    /// If the signal has already been triggered the callback runs
    /// immediately on the calling thread.
    pub fn then<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut state = self.node.state.lock();
            if state.phase == Phase::Armed {
                state.callbacks.push(Box::new(callback));
                return;
            }
        }
        callback();
    }

    /// Return a guard that triggers this signal when dropped.
    pub fn trigger_on_drop(&self) -> TriggerOnDrop {
        TriggerOnDrop::new(self.clone())
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("signaled", &self.is_signaled())
            .finish()
    }
}
