//! Picking a different member of a finite set at random.
//!
//! [`next_distinct`] uses rejection sampling: it draws indices from an
//! [`IndexSource`] until the drawn member differs from the current one.
//! The source is injected so tests can script the draws.

use std::fmt;

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Supplies uniformly distributed indices.
pub trait IndexSource: Send {
    /// Returns an index in `0..bound`; `bound` is never zero.
    fn next_index(&mut self, bound: usize) -> usize;
}

/// [`IndexSource`] backed by a `rand` generator.
pub struct RandomIndex<R>(pub R);

impl<R> fmt::Debug for RandomIndex<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RandomIndex(..)")
    }
}

impl RandomIndex<StdRng> {
    /// Seeds from operating system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self(StdRng::from_os_rng())
    }

    /// Seeds deterministically.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> IndexSource for RandomIndex<R> {
    fn next_index(&mut self, bound: usize) -> usize {
        self.0.random_range(0..bound)
    }
}

/// Returns a member of `all` different from `current`, drawn by rejection sampling.
///
/// Returns `None` when `all` holds no member other than `current`.
pub fn next_distinct<T>(current: &T, all: &[T], source: &mut dyn IndexSource) -> Option<T>
where
    T: PartialEq + Clone,
{
    if !all.iter().any(|candidate| candidate != current) {
        return None;
    }
    loop {
        let candidate = all.get(source.next_index(all.len()))?;
        if candidate != current {
            return Some(candidate.clone());
        }
    }
}

/// Scripted index source for tests; cycles through the given draws.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct Scripted {
    /// Draws to replay.
    draws: Vec<usize>,
    /// Position of the next draw.
    pos: usize,
}

#[cfg(test)]
impl Scripted {
    /// Creates a source replaying `draws` in a loop.
    pub(crate) fn new(draws: Vec<usize>) -> Self {
        Self { draws, pos: 0 }
    }
}

#[cfg(test)]
impl IndexSource for Scripted {
    fn next_index(&mut self, bound: usize) -> usize {
        let slot = self.pos.checked_rem(self.draws.len()).unwrap_or(0);
        self.pos = self.pos.wrapping_add(1);
        let draw = self.draws.get(slot).copied().unwrap_or(0);
        draw.checked_rem(bound).unwrap_or(0)
    }
}
