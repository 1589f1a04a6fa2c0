//! Example subject: a routine that hops between activities at random.
//!
//! [`Routine`] embeds a [`Subject<Activity>`] and exposes it through
//! [`Observable`]. Each [`Routine::cycle`] moves to a uniformly random
//! activity other than the current one and notifies the observers.

use std::{
    fmt,
    sync::{Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};

use crate::{
    cycle::{IndexSource, RandomIndex, next_distinct},
    error::SubjectError,
    subject::{Observable, Subject},
};

/// What the routine is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    /// Busy at work.
    Working,
    /// Taking a break.
    Resting,
    /// Cooling down.
    Cooling,
    /// Stretching.
    Bending,
}

impl Activity {
    /// Every activity, in declaration order.
    pub const ALL: [Self; 4] = [Self::Working, Self::Resting, Self::Cooling, Self::Bending];

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Working => "Working hard",
            Self::Resting => "Resting a bit",
            Self::Cooling => "Cooling down",
            Self::Bending => "Bending over backwards",
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A subject whose state cycles through [`Activity`] values.
pub struct Routine {
    /// The embedded subject.
    subject: Subject<Activity>,
    /// Source of random draws; only locked while the subject lock is held.
    source: Mutex<Box<dyn IndexSource>>,
}

impl fmt::Debug for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routine")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

impl Routine {
    /// Creates a routine drawing from OS entropy, with a default subject.
    #[must_use]
    pub fn new(initial: Activity) -> Self {
        Self::with_parts(Subject::new(initial), Box::new(RandomIndex::from_entropy()))
    }

    /// Creates a routine from a configured subject and an index source.
    #[must_use]
    pub fn with_parts(subject: Subject<Activity>, source: Box<dyn IndexSource>) -> Self {
        Self {
            subject,
            source: Mutex::new(source),
        }
    }

    /// What the routine is doing now.
    #[must_use]
    pub fn activity(&self) -> Activity {
        self.subject.current_state()
    }

    /// Moves to a different random activity without notifying.
    ///
    /// The read, the draw and the write happen as one step under the subject
    /// lock, so concurrent callers each move away from the activity the
    /// previous step left behind. Returns the new activity.
    pub fn advance(&self) -> Activity {
        self.subject.modify(|state| {
            let mut source = self.source.lock().unwrap_or_else(PoisonError::into_inner);
            let next = next_distinct(state, &Activity::ALL, &mut **source);
            let next = next.unwrap_or(*state);
            *state = next;
            next
        })
    }

    /// Advances and notifies the observers.
    ///
    /// # Errors
    ///
    /// Returns [`SubjectError::NotificationAborted`] if the subject's failure
    /// action aborted the pass.
    pub fn cycle(&self) -> Result<Activity, SubjectError> {
        let next = self.advance();
        self.subject.notify_observers()?;
        Ok(next)
    }
}

impl Observable<Activity> for Routine {
    fn subject(&self) -> &Subject<Activity> {
        &self.subject
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::{sync::Arc, thread, time::Duration};

    use super::*;
    use crate::{cycle::Scripted, failure::FailureAction, observer};

    /// Routine with scripted draws plus a shared log of delivered activities.
    fn scripted(initial: Activity, draws: Vec<usize>) -> (Routine, Arc<Mutex<Vec<Activity>>>) {
        let routine = Routine::with_parts(Subject::new(initial), Box::new(Scripted::new(draws)));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        routine
            .add_observer(observer::named("watcher", move |a: &Activity| {
                sink.lock().unwrap().push(*a);
                Ok(())
            }))
            .unwrap();
        (routine, seen)
    }

    /// Scripted source that stalls on its first draw.
    #[derive(Debug)]
    struct Stalling {
        /// Draws to replay.
        draws: Scripted,
        /// Whether the stall already happened.
        stalled: bool,
    }

    impl IndexSource for Stalling {
        fn next_index(&mut self, bound: usize) -> usize {
            if !self.stalled {
                self.stalled = true;
                thread::sleep(Duration::from_millis(100));
            }
            self.draws.next_index(bound)
        }
    }

    #[test]
    fn test_labels_are_distinct() {
        let mut labels: Vec<&str> = Activity::ALL.iter().map(|a| a.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), Activity::ALL.len());
        assert_eq!(Activity::Resting.to_string(), "Resting a bit");
    }

    #[test]
    fn test_cycle_from_working_to_resting() {
        // First draw hits the current activity and is rejected.
        let (routine, seen) = scripted(Activity::Working, vec![0, 1]);
        let second = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&second);
        routine
            .add_observer(observer::named("second", move |a: &Activity| {
                *sink.lock().unwrap() = Some(*a);
                Ok(())
            }))
            .unwrap();

        assert_eq!(routine.cycle().unwrap(), Activity::Resting);
        assert_eq!(*seen.lock().unwrap(), vec![Activity::Resting]);
        assert_eq!(*second.lock().unwrap(), Some(Activity::Resting));
        assert_eq!(routine.current_state(), Activity::Resting);
        assert_eq!(routine.count_observers(), 2);
    }

    #[test]
    fn test_advance_does_not_notify() {
        let (routine, seen) = scripted(Activity::Cooling, vec![3]);
        assert_eq!(routine.advance(), Activity::Bending);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(routine.activity(), Activity::Bending);
    }

    #[test]
    fn test_concurrent_steps_move_away_from_each_other() {
        // Whichever step runs second sees Resting, rejects the next draw of 1
        // and lands on Cooling.
        let source = Stalling {
            draws: Scripted::new(vec![1, 1, 2]),
            stalled: false,
        };
        let routine = Arc::new(Routine::with_parts(
            Subject::new(Activity::Working),
            Box::new(source),
        ));

        let first = {
            let routine = Arc::clone(&routine);
            thread::spawn(move || routine.advance())
        };
        thread::sleep(Duration::from_millis(20));
        let second = {
            let routine = Arc::clone(&routine);
            thread::spawn(move || routine.advance())
        };

        let mut steps = vec![first.join().unwrap(), second.join().unwrap()];
        steps.sort_by_key(|a| a.label());
        assert_eq!(steps, vec![Activity::Cooling, Activity::Resting]);
        assert_eq!(routine.activity(), Activity::Cooling);
    }

    #[test]
    fn test_seeded_cycles_never_repeat() {
        let routine = Routine::with_parts(
            Subject::new(Activity::Working),
            Box::new(RandomIndex::seeded(2024)),
        );
        let watched = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&watched);
        routine
            .add_observer(observer::named("watcher", move |a: &Activity| {
                sink.lock().unwrap().push(*a);
                Ok(())
            }))
            .unwrap();

        let mut previous = routine.activity();
        for _ in 0..8 {
            let next = routine.cycle().unwrap();
            assert_ne!(next, previous);
            previous = next;
        }
        assert_eq!(watched.lock().unwrap().len(), 8);
    }

    #[test]
    fn test_observer_failure_surfaces_from_cycle() {
        let routine = Routine::with_parts(
            Subject::new(Activity::Working),
            Box::new(Scripted::new(vec![2, 3])),
        );
        routine
            .add_observer(observer::named("grumpy", |_: &Activity| {
                Err("not today".into())
            }))
            .unwrap();

        assert!(matches!(
            routine.cycle(),
            Err(SubjectError::NotificationAborted { .. })
        ));
        assert_eq!(routine.activity(), Activity::Cooling);

        routine.subject().set_failure_action(FailureAction::Ignore);
        assert_eq!(routine.cycle().unwrap(), Activity::Bending);
    }

    #[test]
    fn test_embedding_exposes_registry_api() {
        let (routine, seen) = scripted(Activity::Working, vec![1]);
        let extra = observer::named("extra", |_: &Activity| Ok(()));
        routine.add_observer(Arc::clone(&extra)).unwrap();
        assert!(routine.is_observed());
        assert!(routine.is_observed_by(&extra));

        routine.notify_observers().unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![Activity::Working]);

        assert!(routine.remove_observer_instance(&extra).unwrap());
        assert_eq!(routine.count_observers(), 1);
        routine.detach_all().unwrap();
        assert!(!routine.is_observed());
    }
}
