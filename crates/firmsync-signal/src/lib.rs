//! # firmsync-signal
//!
//! Hierarchical, one-shot cancellation for the firmware synchronizer.
//!
//! A [`Signal`] starts armed. Triggering it fires every callback registered
//! with [`Signal::then`] exactly once and then triggers every signal derived
//! from it with [`Signal::derive`]. A derived signal can be triggered on its
//! own without touching its parent.
//!
//! The synchronizer uses one root signal for the whole run (triggered by the
//! OS interrupt handler) and derives a short-lived child for every archive
//! stream it opens. The stream's close handle is registered on the child, and
//! a [`TriggerOnDrop`] guard fires the child when the stream scope ends, so
//! the stream is closed on every exit path and promptly on shutdown.
//!
//! ## Example
//!
//! ```rust
//! use firmsync_signal::Signal;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! let shutdown = Signal::new();
//! let stream_scope = shutdown.derive();
//!
//! let closed = Arc::new(AtomicBool::new(false));
//! let flag = Arc::clone(&closed);
//! stream_scope.then(move || flag.store(true, Ordering::SeqCst));
//!
//! shutdown.trigger();
//! assert!(stream_scope.is_signaled());
//! assert!(closed.load(Ordering::SeqCst));
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

mod guard;
mod signal;

pub use guard::TriggerOnDrop;
pub use signal::Signal;
