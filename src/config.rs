//! # Subject configuration.
//!
//! [`SubjectConfig`] captures the policies a subject is built with. It can be
//! assembled in code or read from JSON:
//!
//! ```
//! use observable_subject::{DuplicatePolicy, FailurePolicy, SubjectConfig};
//!
//! let json = r#"{ "duplicates": "reject", "on_failure": "log_and_continue" }"#;
//! let cfg = SubjectConfig::from_json(json).unwrap();
//! assert_eq!(cfg.duplicates, DuplicatePolicy::Reject);
//! assert_eq!(cfg.on_failure, FailurePolicy::LogAndContinue);
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    detach::DetachPolicy,
    error::SubjectError,
    failure::{AfterLogging, FailureAction},
};

/// Whether the same observer may be registered more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Every registration gets its own slot and is notified independently (default).
    #[default]
    Allow,
    /// Registering an already attached observer fails.
    Reject,
}

/// Failure actions that can be named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// [`FailureAction::Rethrow`] (default).
    #[default]
    Rethrow,
    /// [`FailureAction::Ignore`].
    Ignore,
    /// [`FailureAction::Log`] with [`AfterLogging::Ignore`].
    LogAndContinue,
    /// [`FailureAction::Log`] with [`AfterLogging::Rethrow`].
    LogAndRethrow,
}

impl FailurePolicy {
    /// Builds the matching failure action.
    #[must_use]
    pub fn into_action<T>(self) -> FailureAction<T> {
        match self {
            Self::Rethrow => FailureAction::Rethrow,
            Self::Ignore => FailureAction::Ignore,
            Self::LogAndContinue => FailureAction::Log(AfterLogging::Ignore),
            Self::LogAndRethrow => FailureAction::Log(AfterLogging::Rethrow),
        }
    }
}

/// Detach policies that can be named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetachMode {
    /// [`DetachPolicy::Propagate`] (default).
    #[default]
    Propagate,
    /// [`DetachPolicy::Ignore`].
    Ignore,
}

impl DetachMode {
    /// Builds the matching detach policy.
    #[must_use]
    pub fn into_policy(self) -> DetachPolicy {
        match self {
            Self::Propagate => DetachPolicy::Propagate,
            Self::Ignore => DetachPolicy::Ignore,
        }
    }
}

/// Policies a subject is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SubjectConfig {
    /// Registration uniqueness.
    pub duplicates: DuplicatePolicy,
    /// What to do when an observer fails during notification.
    pub on_failure: FailurePolicy,
    /// What to do when a detach hook fails.
    pub on_detach_failure: DetachMode,
}

impl SubjectConfig {
    /// Parses a configuration from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SubjectError::Config`] if the document is not valid JSON or
    /// names an unknown policy.
    pub fn from_json(json: &str) -> Result<Self, SubjectError> {
        serde_json::from_str(json)
            .map_err(|e| SubjectError::Config(e.to_string()))
    }

    /// Serializes the configuration as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SubjectError::Config`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SubjectError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SubjectError::Config(e.to_string()))
    }
}
