//! Error types raised by subjects and observers.
//!
//! - [`SubjectError`] is what callers of a [`Subject`](crate::Subject) see.
//! - [`FailureCause`] is what an observer produced during one notification
//!   pass; it only reaches the caller if the failure action aborts the pass.

use thiserror::Error;

use crate::detach::DetachTrigger;

/// Boxed error returned by observers and failure handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by subject operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SubjectError {
    /// A required argument was not supplied.
    #[error("invalid argument: {0} is required")]
    InvalidArgument(&'static str),

    /// The observer is already registered and the subject rejects duplicates.
    #[error("observer {observer} is already attached")]
    DuplicateObserver {
        /// Name of the rejected observer.
        observer: String,
    },

    /// The failure action aborted a notification pass.
    #[error("notification aborted at observer #{index} ({observer}): {source}")]
    NotificationAborted {
        /// Position of the failing observer within the pass.
        index: usize,
        /// Name of the failing observer.
        observer: String,
        /// The error chosen by the failure action.
        source: BoxError,
    },

    /// A detach hook failed and the subject propagates detach failures.
    #[error("detach hook of {observer} failed ({trigger:?}): {source}")]
    DetachFailed {
        /// Name of the detached observer.
        observer: String,
        /// Which operation removed the observer.
        trigger: DetachTrigger,
        /// The error returned by the hook.
        source: BoxError,
    },

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SubjectError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use observable_subject::SubjectError;
    ///
    /// let err = SubjectError::InvalidArgument("initial state");
    /// assert_eq!(err.as_label(), "subject_invalid_argument");
    /// ```
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "subject_invalid_argument",
            Self::DuplicateObserver { .. } => "subject_duplicate_observer",
            Self::NotificationAborted { .. } => "subject_notification_aborted",
            Self::DetachFailed { .. } => "subject_detach_failed",
            Self::Config(_) => "subject_config",
        }
    }
}

/// Why an observer failed while being notified.
#[derive(Error, Debug)]
pub enum FailureCause {
    /// `update` returned an error.
    #[error("{0}")]
    Error(BoxError),

    /// `update` panicked; the payload message is kept.
    #[error("observer panicked: {0}")]
    Panic(String),
}

impl FailureCause {
    /// Returns a short stable label (snake_case) for use in logs.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Error(_) => "observer_error",
            Self::Panic(_) => "observer_panic",
        }
    }

    /// Converts the cause into an error suitable for propagation.
    ///
    /// An error returned by the observer is handed back unchanged so callers
    /// can downcast it to the observer's own type.
    #[must_use]
    pub fn into_error(self) -> BoxError {
        match self {
            Self::Error(err) => err,
            panic @ Self::Panic(_) => Box::new(panic),
        }
    }

    /// Builds a cause from a `catch_unwind` payload.
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let msg = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        Self::Panic(msg)
    }
}
