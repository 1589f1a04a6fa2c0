//! # Observer notification failure actions.
//!
//! A subject never lets an observer's failure escape directly. Each failure
//! is packaged as a [`FailureRecord`] and handed to the subject's
//! [`FailureAction`], which answers with a [`Verdict`]:
//!
//! ```text
//! notify_observers()
//!     │
//!     ├──► observer #0 ── Ok ──► next
//!     ├──► observer #1 ── Err ─► FailureAction::decide(record)
//!     │                              ├─ Continue   ──► next
//!     │                              └─ Abort(err) ──► Err(NotificationAborted)
//!     └──► observer #n ...
//! ```
//!
//! ## Built-in actions
//! - [`FailureAction::Rethrow`] abort with the observer's own error (default).
//! - [`FailureAction::Ignore`] swallow and continue.
//! - [`FailureAction::Collect`] store in a [`FailureCollector`] and continue.
//! - [`FailureAction::Log`] emit a `tracing` warning, then continue or abort.
//! - [`FailureAction::Custom`] delegate to a [`FailureHandler`].

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    collector::FailureCollector,
    error::{BoxError, FailureCause},
    observer::Observer,
    subject::ObserverHandle,
};

/// One observer failure within a notification pass.
pub struct FailureRecord<T> {
    /// Position of the observer in the pass snapshot.
    pub index: usize,
    /// Registration handle of the observer.
    pub handle: ObserverHandle,
    /// The failing observer.
    pub observer: Arc<dyn Observer<T>>,
    /// What went wrong.
    pub cause: FailureCause,
}

impl<T> fmt::Debug for FailureRecord<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureRecord")
            .field("index", &self.index)
            .field("handle", &self.handle)
            .field("observer", &self.observer.name())
            .field("cause", &self.cause)
            .finish()
    }
}

/// Decision taken for a failing observer.
#[derive(Debug)]
pub enum Verdict {
    /// The failure is handled; notify the next observer.
    Continue,
    /// Stop the pass and propagate this error to the caller.
    Abort(BoxError),
}

impl Verdict {
    /// Builds [`Verdict::Abort`] from anything convertible into a boxed error.
    pub fn abort(err: impl Into<BoxError>) -> Self {
        Self::Abort(err.into())
    }
}

/// User supplied failure handling.
pub trait FailureHandler<T>: Send + Sync {
    /// Decides what to do about one failing observer.
    fn observer_failed(&self, record: FailureRecord<T>) -> Verdict;
}

impl<T, F> FailureHandler<T> for F
where
    F: Fn(FailureRecord<T>) -> Verdict + Send + Sync,
{
    fn observer_failed(&self, record: FailureRecord<T>) -> Verdict {
        self(record)
    }
}

/// What to do once a failure has been logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AfterLogging {
    /// Continue with the next observer.
    #[default]
    Ignore,
    /// Abort the pass with the original failure.
    Rethrow,
}

/// Policy applied to observer failures during a notification pass.
pub enum FailureAction<T> {
    /// Abort the pass with the observer's error.
    Rethrow,
    /// Suppress the failure and continue.
    Ignore,
    /// Record the failure in a collector and continue.
    Collect(Arc<FailureCollector<T>>),
    /// Log the failure through `tracing`, then act as configured.
    Log(AfterLogging),
    /// Delegate to a custom handler.
    Custom(Arc<dyn FailureHandler<T>>),
}

impl<T> Default for FailureAction<T> {
    /// Returns [`FailureAction::Rethrow`].
    fn default() -> Self {
        Self::Rethrow
    }
}

impl<T> Clone for FailureAction<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Rethrow => Self::Rethrow,
            Self::Ignore => Self::Ignore,
            Self::Collect(collector) => Self::Collect(Arc::clone(collector)),
            Self::Log(after) => Self::Log(*after),
            Self::Custom(handler) => Self::Custom(Arc::clone(handler)),
        }
    }
}

impl<T> fmt::Debug for FailureAction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rethrow => f.write_str("Rethrow"),
            Self::Ignore => f.write_str("Ignore"),
            Self::Collect(collector) => f.debug_tuple("Collect").field(collector).finish(),
            Self::Log(after) => f.debug_tuple("Log").field(after).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl<T> FailureAction<T> {
    /// Wraps a handler into [`FailureAction::Custom`].
    pub fn custom(handler: impl FailureHandler<T> + 'static) -> Self {
        Self::Custom(Arc::new(handler))
    }

    /// Applies the action to one failure.
    pub fn decide(&self, record: FailureRecord<T>) -> Verdict {
        match self {
            Self::Rethrow => Verdict::Abort(record.cause.into_error()),
            Self::Ignore => Verdict::Continue,
            Self::Collect(collector) => {
                collector.record(record);
                Verdict::Continue
            }
            Self::Log(after) => {
                tracing::warn!(
                    observer = record.observer.name(),
                    index = record.index,
                    handle = record.handle.id(),
                    kind = record.cause.as_label(),
                    error = %record.cause,
                    "observer failed during notification"
                );
                match after {
                    AfterLogging::Ignore => Verdict::Continue,
                    AfterLogging::Rethrow => Verdict::Abort(record.cause.into_error()),
                }
            }
            Self::Custom(handler) => handler.observer_failed(record),
        }
    }
}
