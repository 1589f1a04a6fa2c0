//! Collect-and-continue failure store.
//!
//! [`FailureCollector`] keeps every failure reported to it, keyed by the
//! observer's index within its pass, until [`FailureCollector::drain`] takes
//! them out.
//!
//! ```
//! use std::sync::Arc;
//! use observable_subject::{FailureAction, FailureCollector, Subject, observer};
//!
//! let collector = Arc::new(FailureCollector::new());
//! let subject = Subject::builder()
//!     .initial_state(0_u8)
//!     .failure_action(FailureAction::Collect(Arc::clone(&collector)))
//!     .build()
//!     .unwrap();
//! subject.add_observer(observer::from_fn(|_: &u8| Err("boom".into()))).unwrap();
//!
//! subject.notify_observers().unwrap();
//! let drained = collector.drain();
//! assert_eq!(drained.len(), 1);
//! assert!(collector.drain().is_empty());
//! ```

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{
    error::FailureCause,
    failure::{FailureHandler, FailureRecord, Verdict},
    observer::Observer,
    subject::ObserverHandle,
};

/// A collected failure.
pub struct Failure<T> {
    /// Registration handle of the failing observer.
    pub handle: ObserverHandle,
    /// The failing observer.
    pub observer: Arc<dyn Observer<T>>,
    /// What went wrong.
    pub cause: FailureCause,
}

impl<T> fmt::Debug for Failure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("handle", &self.handle)
            .field("observer", &self.observer.name())
            .field("cause", &self.cause)
            .finish()
    }
}

/// Failures keyed by their index within a notification pass.
pub type CollectedFailures<T> = BTreeMap<usize, Failure<T>>;

/// Accumulates observer failures for later inspection.
pub struct FailureCollector<T> {
    /// Failures recorded since the last drain.
    collected: Mutex<CollectedFailures<T>>,
}

impl<T> Default for FailureCollector<T> {
    fn default() -> Self {
        Self {
            collected: Mutex::new(BTreeMap::new()),
        }
    }
}

impl<T> fmt::Debug for FailureCollector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureCollector")
            .field("pending", &self.len())
            .finish()
    }
}

impl<T> FailureCollector<T> {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a failure; a later failure at the same index replaces it.
    pub fn record(&self, record: FailureRecord<T>) {
        let FailureRecord {
            index,
            handle,
            observer,
            cause,
        } = record;
        self.lock().insert(
            index,
            Failure {
                handle,
                observer,
                cause,
            },
        );
    }

    /// Returns everything collected so far and leaves the collector empty.
    #[must_use]
    pub fn drain(&self) -> CollectedFailures<T> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of failures waiting to be drained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is waiting to be drained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Locks the store, recovering from poisoning.
    fn lock(&self) -> std::sync::MutexGuard<'_, CollectedFailures<T>> {
        self.collected.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> FailureHandler<T> for FailureCollector<T> {
    fn observer_failed(&self, record: FailureRecord<T>) -> Verdict {
        self.record(record);
        Verdict::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer;

    fn failure(index: usize, msg: &'static str) -> FailureRecord<()> {
        FailureRecord {
            index,
            handle: ObserverHandle::from_raw(index as u64),
            observer: observer::named("meter", |_: &()| Ok(())),
            cause: FailureCause::Error(msg.into()),
        }
    }

    #[test]
    fn test_drain_resets_store() {
        let collector = FailureCollector::new();
        collector.record(failure(0, "boom"));
        collector.record(failure(2, "bang"));
        assert_eq!(collector.len(), 2);

        let drained = collector.drain();
        let messages: Vec<(usize, String)> = drained
            .iter()
            .map(|(i, f)| (*i, f.cause.to_string()))
            .collect();
        assert_eq!(
            messages,
            vec![(0, "boom".to_string()), (2, "bang".to_string())]
        );
        assert!(collector.is_empty());
        assert!(collector.drain().is_empty());
    }

    #[test]
    fn test_same_index_overwrites() {
        let collector = FailureCollector::new();
        collector.record(failure(1, "first"));
        collector.record(failure(1, "second"));
        let drained = collector.drain();
        assert_eq!(drained.len(), 1);
        let cause = drained.get(&1).map(|f| f.cause.to_string());
        assert_eq!(cause.as_deref(), Some("second"));
    }

    #[test]
    fn test_handler_impl_continues() {
        let collector = FailureCollector::new();
        let verdict = collector.observer_failed(failure(0, "boom"));
        assert!(matches!(verdict, Verdict::Continue));
        assert_eq!(collector.len(), 1);
    }
}
