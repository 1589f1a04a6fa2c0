//! # The subject: observable state plus an ordered observer registry.
//!
//! [`Subject`] owns one value of type `T` and the list of observers that are
//! told about it. State changes and notification are separate steps: callers
//! mutate through [`Subject::set_state`] or [`Subject::modify`], then call
//! [`Subject::notify_observers`] once, which allows batching several changes
//! into a single pass.
//!
//! ## Notification pass
//! ```text
//! notify_observers()
//!     │
//!     ├─ lock ── clone (state, registry, failure action) ── unlock
//!     │
//!     ├─► #0 update(&state) ── ok
//!     ├─► #1 update(&state) ── err/panic ─► FailureAction ─► Continue
//!     ├─► #2 update(&state) ── err/panic ─► FailureAction ─► Abort ─► Err
//!     └─► #3 (never reached)
//! ```
//!
//! ## Rules
//! - Observers run in registration order, sequentially, on the caller's thread.
//! - The pass iterates a snapshot: observers added or removed while it runs
//!   do not change who is notified in that pass.
//! - The subject lock is not held while observers run, so an observer may
//!   touch the subject. A nested `notify_observers` starts its own pass over
//!   the live registry and current state.
//! - A failing observer never stops the pass by itself; only an
//!   [`Verdict::Abort`] from the failure action does.
//! - There is no timeout: an observer that never returns blocks the pass.

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{
    config::{DuplicatePolicy, SubjectConfig},
    detach::{DetachPolicy, DetachTrigger, PostDetach},
    error::{FailureCause, SubjectError},
    failure::{FailureAction, FailureRecord, Verdict},
    observer::Observer,
};

/// Identifies one registration of an observer.
///
/// Handles are never reused by the subject that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverHandle(u64);

impl ObserverHandle {
    /// Returns the raw registration id.
    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }

    /// Builds a handle from a raw id.
    #[cfg(test)]
    pub(crate) fn from_raw(id: u64) -> Self {
        Self(id)
    }
}

/// One registry slot.
struct Entry<T> {
    /// Handle returned when the slot was created.
    handle: ObserverHandle,
    /// The registered observer.
    observer: Arc<dyn Observer<T>>,
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle,
            observer: Arc::clone(&self.observer),
        }
    }
}

/// Everything guarded by the subject lock.
struct Inner<T> {
    /// Current state.
    state: T,
    /// Registered observers in notification order.
    entries: Vec<Entry<T>>,
    /// Id of the next handle to issue.
    next_id: u64,
    /// Action applied to observer failures.
    failure_action: FailureAction<T>,
}

/// Observable state with an ordered observer registry.
pub struct Subject<T> {
    /// State, registry and failure action, locked together.
    inner: Mutex<Inner<T>>,
    /// Registration uniqueness.
    duplicates: DuplicatePolicy,
    /// What to do with detach hook failures.
    detach_policy: DetachPolicy,
}

impl<T> Subject<T> {
    /// Locks the shared part of the subject, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: fmt::Debug> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Subject")
            .field("state", &inner.state)
            .field("observers_count", &inner.entries.len())
            .field("failure_action", &inner.failure_action)
            .field("duplicates", &self.duplicates)
            .field("detach_policy", &self.detach_policy)
            .finish()
    }
}

impl<T: Clone + Send + 'static> Subject<T> {
    /// Creates a subject with the default configuration.
    ///
    /// Defaults: duplicates allowed, [`FailureAction::Rethrow`],
    /// [`DetachPolicy::Propagate`].
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self::from_parts(
            initial,
            SubjectConfig::default().duplicates,
            FailureAction::default(),
            DetachPolicy::default(),
        )
    }

    /// Starts building a subject.
    #[must_use]
    pub fn builder() -> SubjectBuilder<T> {
        SubjectBuilder::new()
    }

    /// Assembles a subject from resolved parts.
    fn from_parts(
        initial: T,
        duplicates: DuplicatePolicy,
        failure_action: FailureAction<T>,
        detach_policy: DetachPolicy,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: initial,
                entries: Vec::new(),
                next_id: 0,
                failure_action,
            }),
            duplicates,
            detach_policy,
        }
    }

    /// Registers an observer at the end of the notification order.
    ///
    /// # Errors
    ///
    /// Returns [`SubjectError::DuplicateObserver`] if the subject rejects
    /// duplicates and this `Arc` is already registered.
    pub fn add_observer(
        &self,
        observer: Arc<dyn Observer<T>>,
    ) -> Result<ObserverHandle, SubjectError> {
        let mut inner = self.lock();
        if self.duplicates == DuplicatePolicy::Reject
            && inner.entries.iter().any(|e| Arc::ptr_eq(&e.observer, &observer))
        {
            return Err(SubjectError::DuplicateObserver {
                observer: observer.name().to_string(),
            });
        }
        let handle = ObserverHandle(inner.next_id);
        inner.next_id = inner.next_id.wrapping_add(1);
        inner.entries.push(Entry { handle, observer });
        Ok(handle)
    }

    /// Removes the registration identified by `handle`.
    ///
    /// Returns `Ok(false)` if the handle is not (or no longer) registered.
    /// The observer's detach hook runs after it left the registry.
    ///
    /// # Errors
    ///
    /// Returns [`SubjectError::DetachFailed`] if the detach hook failed and
    /// the detach policy propagates. The observer is removed regardless.
    pub fn remove_observer(&self, handle: ObserverHandle) -> Result<bool, SubjectError> {
        let removed = {
            let mut inner = self.lock();
            let pos = inner.entries.iter().position(|e| e.handle == handle);
            pos.map(|pos| inner.entries.remove(pos))
        };
        match removed {
            Some(entry) => {
                self.run_detach_hook(&entry, DetachTrigger::Detach)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes every registration of this observer instance.
    ///
    /// # Errors
    ///
    /// Returns the first [`SubjectError::DetachFailed`] if a detach hook
    /// failed and the detach policy propagates.
    pub fn remove_observer_instance(
        &self,
        observer: &Arc<dyn Observer<T>>,
    ) -> Result<bool, SubjectError> {
        let removed: Vec<Entry<T>> = {
            let mut inner = self.lock();
            let (gone, kept) = std::mem::take(&mut inner.entries)
                .into_iter()
                .partition(|e| Arc::ptr_eq(&e.observer, observer));
            inner.entries = kept;
            gone
        };
        let any = !removed.is_empty();
        self.detach_entries(removed, DetachTrigger::Detach)?;
        Ok(any)
    }

    /// Removes every observer, then runs every detach hook in registration order.
    ///
    /// # Errors
    ///
    /// Returns the first [`SubjectError::DetachFailed`] if a detach hook
    /// failed and the detach policy propagates.
    pub fn detach_all(&self) -> Result<(), SubjectError> {
        let removed = std::mem::take(&mut self.lock().entries);
        self.detach_entries(removed, DetachTrigger::DetachAll)
    }

    /// Runs detach hooks for removed entries, keeping the first failure.
    fn detach_entries(
        &self,
        removed: Vec<Entry<T>>,
        trigger: DetachTrigger,
    ) -> Result<(), SubjectError> {
        let mut first_err = None;
        for entry in removed {
            if let Err(err) = self.run_detach_hook(&entry, trigger) {
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Calls the observer's detach hook and settles the outcome.
    fn run_detach_hook(
        &self,
        entry: &Entry<T>,
        trigger: DetachTrigger,
    ) -> Result<(), SubjectError> {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| entry.observer.detached())) {
            Ok(Ok(())) => PostDetach::Ok,
            Ok(Err(err)) => PostDetach::Failed(err),
            Err(payload) => PostDetach::Failed(Box::new(FailureCause::from_panic(&*payload))),
        };
        self.detach_policy.settle(trigger, entry.observer.name(), outcome)
    }

    /// Whether this observer instance is registered at least once.
    #[must_use]
    pub fn is_observed_by(&self, observer: &Arc<dyn Observer<T>>) -> bool {
        self.lock()
            .entries
            .iter()
            .any(|e| Arc::ptr_eq(&e.observer, observer))
    }

    /// Whether any observer is registered.
    #[must_use]
    pub fn is_observed(&self) -> bool {
        !self.lock().entries.is_empty()
    }

    /// Number of registrations.
    #[must_use]
    pub fn count_observers(&self) -> usize {
        self.lock().entries.len()
    }

    /// Handles of all registrations in notification order.
    #[must_use]
    pub fn handles(&self) -> Vec<ObserverHandle> {
        self.lock().entries.iter().map(|e| e.handle).collect()
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn current_state(&self) -> T {
        self.lock().state.clone()
    }

    /// Reads the current state without cloning it.
    ///
    /// The subject lock is held while `f` runs; `f` must not call back into
    /// this subject.
    pub fn with_state<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock().state)
    }

    /// Replaces the state and returns the previous one. Does not notify.
    pub fn set_state(&self, state: T) -> T {
        std::mem::replace(&mut self.lock().state, state)
    }

    /// Mutates the state in place. Does not notify.
    ///
    /// The subject lock is held while `f` runs; `f` must not call back into
    /// this subject.
    pub fn modify<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.lock().state)
    }

    /// Returns the configured failure action.
    #[must_use]
    pub fn failure_action(&self) -> FailureAction<T> {
        self.lock().failure_action.clone()
    }

    /// Replaces the failure action used by later passes.
    pub fn set_failure_action(&self, action: FailureAction<T>) {
        self.lock().failure_action = action;
    }

    /// Notifies every registered observer using the configured failure action.
    ///
    /// # Errors
    ///
    /// Returns [`SubjectError::NotificationAborted`] if the failure action
    /// aborted the pass; observers after the failing one were not notified.
    pub fn notify_observers(&self) -> Result<(), SubjectError> {
        let (state, entries, action) = {
            let inner = self.lock();
            (
                inner.state.clone(),
                inner.entries.clone(),
                inner.failure_action.clone(),
            )
        };
        Self::run_pass(&state, &entries, &action)
    }

    /// Notifies every registered observer using `action` for this pass only.
    ///
    /// # Errors
    ///
    /// Returns [`SubjectError::NotificationAborted`] if `action` aborted the pass.
    pub fn notify_observers_with(&self, action: &FailureAction<T>) -> Result<(), SubjectError> {
        let (state, entries) = {
            let inner = self.lock();
            (inner.state.clone(), inner.entries.clone())
        };
        Self::run_pass(&state, &entries, action)
    }

    /// Delivers `state` to a snapshot of the registry.
    fn run_pass(
        state: &T,
        entries: &[Entry<T>],
        action: &FailureAction<T>,
    ) -> Result<(), SubjectError> {
        for (index, entry) in entries.iter().enumerate() {
            let Err(cause) = Self::deliver(&*entry.observer, state) else {
                continue;
            };
            let record = FailureRecord {
                index,
                handle: entry.handle,
                observer: Arc::clone(&entry.observer),
                cause,
            };
            if let Verdict::Abort(source) = action.decide(record) {
                return Err(SubjectError::NotificationAborted {
                    index,
                    observer: entry.observer.name().to_string(),
                    source,
                });
            }
        }
        Ok(())
    }

    /// Calls one observer, turning errors and panics into a failure cause.
    fn deliver(observer: &dyn Observer<T>, state: &T) -> Result<(), FailureCause> {
        match panic::catch_unwind(AssertUnwindSafe(|| observer.update(state))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(FailureCause::Error(err)),
            Err(payload) => Err(FailureCause::from_panic(&*payload)),
        }
    }
}

/// Builder for [`Subject`].
///
/// Policies set explicitly on the builder win over the ones from
/// [`SubjectBuilder::config`], whatever the call order.
#[derive(Debug)]
pub struct SubjectBuilder<T> {
    /// Initial state; required.
    initial: Option<T>,
    /// Baseline policies.
    config: SubjectConfig,
    /// Explicit registration uniqueness.
    duplicates: Option<DuplicatePolicy>,
    /// Explicit failure action.
    failure_action: Option<FailureAction<T>>,
    /// Explicit detach policy.
    detach_policy: Option<DetachPolicy>,
}

impl<T> Default for SubjectBuilder<T> {
    fn default() -> Self {
        Self {
            initial: None,
            config: SubjectConfig::default(),
            duplicates: None,
            failure_action: None,
            detach_policy: None,
        }
    }
}

impl<T: Clone + Send + 'static> SubjectBuilder<T> {
    /// Creates a builder with no initial state and default policies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial state.
    #[must_use]
    pub fn initial_state(mut self, state: T) -> Self {
        self.initial = Some(state);
        self
    }

    /// Sets the baseline policies.
    #[must_use]
    pub fn config(mut self, config: SubjectConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets registration uniqueness.
    #[must_use]
    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = Some(policy);
        self
    }

    /// Sets the failure action.
    #[must_use]
    pub fn failure_action(mut self, action: FailureAction<T>) -> Self {
        self.failure_action = Some(action);
        self
    }

    /// Sets the detach policy.
    #[must_use]
    pub fn detach_policy(mut self, policy: DetachPolicy) -> Self {
        self.detach_policy = Some(policy);
        self
    }

    /// Builds the subject.
    ///
    /// # Errors
    ///
    /// Returns [`SubjectError::InvalidArgument`] if no initial state was set.
    pub fn build(self) -> Result<Subject<T>, SubjectError> {
        let initial = self
            .initial
            .ok_or(SubjectError::InvalidArgument("initial state"))?;
        let failure_action = self
            .failure_action
            .unwrap_or_else(|| self.config.on_failure.into_action());
        let detach_policy = self
            .detach_policy
            .unwrap_or_else(|| self.config.on_detach_failure.into_policy());
        Ok(Subject::from_parts(
            initial,
            self.duplicates.unwrap_or(self.config.duplicates),
            failure_action,
            detach_policy,
        ))
    }
}

/// Types that expose an embedded [`Subject`].
///
/// Concrete subjects implement [`Observable::subject`] and get the
/// registration API for free, while keeping their own setters and deciding
/// when to notify.
pub trait Observable<T: Clone + Send + 'static> {
    /// The embedded subject.
    fn subject(&self) -> &Subject<T>;

    /// See [`Subject::add_observer`].
    ///
    /// # Errors
    ///
    /// See [`Subject::add_observer`].
    fn add_observer(
        &self,
        observer: Arc<dyn Observer<T>>,
    ) -> Result<ObserverHandle, SubjectError> {
        self.subject().add_observer(observer)
    }

    /// See [`Subject::remove_observer`].
    ///
    /// # Errors
    ///
    /// See [`Subject::remove_observer`].
    fn remove_observer(&self, handle: ObserverHandle) -> Result<bool, SubjectError> {
        self.subject().remove_observer(handle)
    }

    /// See [`Subject::remove_observer_instance`].
    ///
    /// # Errors
    ///
    /// See [`Subject::remove_observer_instance`].
    fn remove_observer_instance(
        &self,
        observer: &Arc<dyn Observer<T>>,
    ) -> Result<bool, SubjectError> {
        self.subject().remove_observer_instance(observer)
    }

    /// See [`Subject::detach_all`].
    ///
    /// # Errors
    ///
    /// See [`Subject::detach_all`].
    fn detach_all(&self) -> Result<(), SubjectError> {
        self.subject().detach_all()
    }

    /// See [`Subject::is_observed`].
    fn is_observed(&self) -> bool {
        self.subject().is_observed()
    }

    /// See [`Subject::is_observed_by`].
    fn is_observed_by(&self, observer: &Arc<dyn Observer<T>>) -> bool {
        self.subject().is_observed_by(observer)
    }

    /// See [`Subject::count_observers`].
    fn count_observers(&self) -> usize {
        self.subject().count_observers()
    }

    /// See [`Subject::current_state`].
    fn current_state(&self) -> T {
        self.subject().current_state()
    }

    /// See [`Subject::notify_observers`].
    ///
    /// # Errors
    ///
    /// See [`Subject::notify_observers`].
    fn notify_observers(&self) -> Result<(), SubjectError> {
        self.subject().notify_observers()
    }
}
