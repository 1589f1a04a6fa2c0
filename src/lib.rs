//! Synchronous subject/observer notification.
//!
//! A [`Subject`] holds a value and an ordered list of [`Observer`]s. When the
//! subject is asked to notify, every observer registered at that moment is
//! called in registration order with the current value. Failures raised by
//! individual observers are isolated and handed to a [`FailureAction`] that
//! decides whether the pass continues or aborts.
//!
//! ## Modules
//! | Module | Contents |
//! |---|---|
//! | [`observer`] | The [`Observer`] capability and closure adapters. |
//! | [`subject`] | [`Subject`], [`SubjectBuilder`], [`ObserverHandle`], [`Observable`]. |
//! | [`failure`] | [`FailureAction`], [`FailureRecord`], [`Verdict`], [`FailureHandler`]. |
//! | [`collector`] | [`FailureCollector`] for collect-and-continue handling. |
//! | [`detach`] | Detach hooks and [`DetachPolicy`]. |
//! | [`config`] | [`SubjectConfig`] and the named policies. |
//! | [`cycle`] | Rejection sampling of a different member of a set. |
//! | [`routine`] | An example subject cycling through [`Activity`] values. |
//!
//! ## Example
//! ```
//! use std::sync::Arc;
//! use observable_subject::{FailureAction, FailureCollector, Subject, observer};
//!
//! let collector = Arc::new(FailureCollector::new());
//! let subject = Subject::builder()
//!     .initial_state("idle".to_string())
//!     .failure_action(FailureAction::Collect(Arc::clone(&collector)))
//!     .build()
//!     .unwrap();
//!
//! subject.add_observer(observer::named("strict", |s: &String| {
//!     if s == "busy" { Err("busy is not allowed".into()) } else { Ok(()) }
//! })).unwrap();
//! subject.add_observer(observer::named("echo", |s: &String| {
//!     println!("state: {s}");
//!     Ok(())
//! })).unwrap();
//!
//! subject.set_state("busy".to_string());
//! subject.notify_observers().unwrap();
//!
//! let failures = collector.drain();
//! assert_eq!(failures[&0].cause.to_string(), "busy is not allowed");
//! ```

pub mod collector;
pub mod config;
pub mod cycle;
pub mod detach;
pub mod error;
pub mod failure;
pub mod observer;
pub mod routine;
pub mod subject;

pub use collector::{CollectedFailures, Failure, FailureCollector};
pub use config::{DetachMode, DuplicatePolicy, FailurePolicy, SubjectConfig};
pub use cycle::{IndexSource, RandomIndex, next_distinct};
pub use detach::{DetachHandler, DetachPolicy, DetachTrigger, PostDetach};
pub use error::{BoxError, FailureCause, SubjectError};
pub use failure::{AfterLogging, FailureAction, FailureHandler, FailureRecord, Verdict};
pub use observer::{FnObserver, Observer};
pub use routine::{Activity, Routine};
pub use subject::{Observable, ObserverHandle, Subject, SubjectBuilder};
