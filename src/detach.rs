//! Detach hooks.
//!
//! When an observer leaves a subject its [`Observer::detached`] hook runs.
//! The subject's [`DetachPolicy`] decides what a failing hook means:
//!
//! - [`DetachPolicy::Propagate`] the failure is returned to the caller (default).
//! - [`DetachPolicy::Ignore`] the failure is discarded.
//! - [`DetachPolicy::Custom`] a [`DetachHandler`] is told about every detach,
//!   successful or not, and nothing is propagated.
//!
//! The observer is removed from the registry before the hook runs, so it
//! stays removed whatever the hook does.
//!
//! [`Observer::detached`]: crate::Observer::detached

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::error::{BoxError, SubjectError};

/// Which operation removed the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum DetachTrigger {
    /// A single observer was removed.
    Detach,
    /// Every observer was removed at once.
    DetachAll,
}

/// Outcome of a detach hook.
#[derive(Debug)]
pub enum PostDetach {
    /// The hook returned normally.
    Ok,
    /// The hook failed.
    Failed(BoxError),
}

/// Receives the outcome of every detach hook.
pub trait DetachHandler: Send + Sync {
    /// Called after `observer` was detached by `trigger`.
    fn post_detach(&self, trigger: DetachTrigger, observer: &str, outcome: &PostDetach);
}

impl<F> DetachHandler for F
where
    F: Fn(DetachTrigger, &str, &PostDetach) + Send + Sync,
{
    fn post_detach(&self, trigger: DetachTrigger, observer: &str, outcome: &PostDetach) {
        self(trigger, observer, outcome);
    }
}

/// What a subject does with detach hook outcomes.
#[derive(Clone, Default)]
pub enum DetachPolicy {
    /// Return hook failures as [`SubjectError::DetachFailed`].
    #[default]
    Propagate,
    /// Discard hook failures.
    Ignore,
    /// Report every outcome to a handler; never propagate.
    Custom(Arc<dyn DetachHandler>),
}

impl fmt::Debug for DetachPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Propagate => f.write_str("Propagate"),
            Self::Ignore => f.write_str("Ignore"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl DetachPolicy {
    /// Wraps a handler into [`DetachPolicy::Custom`].
    pub fn custom(handler: impl DetachHandler + 'static) -> Self {
        Self::Custom(Arc::new(handler))
    }

    /// Applies the policy to one hook outcome.
    pub(crate) fn settle(
        &self,
        trigger: DetachTrigger,
        observer: &str,
        outcome: PostDetach,
    ) -> Result<(), SubjectError> {
        match (self, outcome) {
            (Self::Custom(handler), outcome) => {
                handler.post_detach(trigger, observer, &outcome);
                Ok(())
            }
            (_, PostDetach::Ok) => Ok(()),
            (Self::Propagate, PostDetach::Failed(source)) => {
                Err(SubjectError::DetachFailed {
                    observer: observer.to_string(),
                    trigger,
                    source,
                })
            }
            (Self::Ignore, PostDetach::Failed(err)) => {
                tracing::debug!(observer, ?trigger, error = %err, "detach hook failure discarded");
                Ok(())
            }
        }
    }
}
