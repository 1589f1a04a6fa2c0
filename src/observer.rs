//! The observer capability.
//!
//! An [`Observer`] receives the subject's state every time the subject runs a
//! notification pass. Observers are shared with the subject as
//! `Arc<dyn Observer<T>>`; the `Arc` pointer is the observer's identity.
//!
//! ## Example
//! ```
//! use std::sync::Arc;
//! use observable_subject::{Observer, Subject, observer};
//!
//! struct Printer;
//!
//! impl Observer<u32> for Printer {
//!     fn update(&self, value: &u32) -> Result<(), observable_subject::BoxError> {
//!         println!("value is now {value}");
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &str { "printer" }
//! }
//!
//! let subject = Subject::new(1_u32);
//! subject.add_observer(Arc::new(Printer)).unwrap();
//! subject.add_observer(observer::from_fn(|v: &u32| {
//!     assert!(*v > 0);
//!     Ok(())
//! })).unwrap();
//! subject.notify_observers().unwrap();
//! ```

use std::{fmt, sync::Arc};

use crate::error::BoxError;

/// Receives updates of type `T` from a subject.
pub trait Observer<T>: Send + Sync {
    /// Called once per notification pass with the subject's state.
    ///
    /// Returning an error (or panicking) does not stop the pass by itself;
    /// the subject's failure action decides what happens next.
    ///
    /// # Errors
    ///
    /// Any error the observer wants reported to the failure action.
    fn update(&self, value: &T) -> Result<(), BoxError>;

    /// Returns the observer name used in logs and errors.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called after the observer has been removed from a subject.
    ///
    /// # Errors
    ///
    /// A failure is routed through the subject's detach policy.
    fn detached(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Observer backed by a closure.
pub struct FnObserver<F> {
    /// Name reported by [`Observer::name`].
    name: &'static str,
    /// The update callback.
    f: F,
}

impl<F> fmt::Debug for FnObserver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnObserver")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<T, F> Observer<T> for FnObserver<F>
where
    F: Fn(&T) -> Result<(), BoxError> + Send + Sync,
{
    fn update(&self, value: &T) -> Result<(), BoxError> {
        (self.f)(value)
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Wraps a closure into a shareable observer named `"fn"`.
pub fn from_fn<T, F>(f: F) -> Arc<dyn Observer<T>>
where
    T: 'static,
    F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
{
    named("fn", f)
}

/// Wraps a closure into a shareable observer with the given name.
pub fn named<T, F>(name: &'static str, f: F) -> Arc<dyn Observer<T>>
where
    T: 'static,
    F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
{
    Arc::new(FnObserver { name, f })
}
