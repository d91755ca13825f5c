use std::collections::BTreeMap;

use rand::Rng;

use crate::error::{Error, Result};

/// Source of uniformly distributed integers.
pub trait UniformSource {
    /// A value in `[0, bound)`. `bound` is never 0.
    fn next_below(&mut self, bound: u64) -> u64;
}

/// Adapts any `rand` generator into a [`UniformSource`].
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl<R: Rng> UniformSource for RngSource<R> {
    fn next_below(&mut self, bound: u64) -> u64 {
        self.0.gen_range(0..bound)
    }
}

/// A set of values drawn at random in proportion to their weights.
///
/// Each value occupies the range `[offset, offset + weight)` of the total
/// weight, keyed by its offset. A draw picks a point in `[0, total)` and
/// returns the value owning the greatest offset at or below it.
#[derive(Debug, Clone)]
pub struct WeightedDistribution<T> {
    offsets: BTreeMap<u64, T>,
    total: u64,
}

impl<T> WeightedDistribution<T> {
    pub fn new() -> Self {
        Self {
            offsets: BTreeMap::new(),
            total: 0,
        }
    }

    /// Add `value` with `weight` relative to the rest of the distribution.
    ///
    /// A zero weight leaves the distribution unchanged: such a value can never
    /// be drawn.
    pub fn add(&mut self, value: T, weight: u64) -> Result<&mut Self> {
        if weight == 0 {
            return Ok(self);
        }
        let total = self.total.checked_add(weight).ok_or(Error::WeightOverflow {
            total: self.total,
            weight,
        })?;
        self.offsets.insert(self.total, value);
        self.total = total;
        Ok(self)
    }

    /// Draw a value using the thread-local generator.
    pub fn get(&self) -> Result<&T> {
        self.get_with(&mut RngSource(rand::thread_rng()))
    }

    /// Draw a value using `source`.
    pub fn get_with<S: UniformSource>(&self, source: &mut S) -> Result<&T> {
        if self.total == 0 {
            return Err(Error::EmptyDistribution);
        }
        let point = source.next_below(self.total);
        self.offsets
            .range(..=point)
            .next_back()
            .map(|(_, value)| value)
            .ok_or(Error::EmptyDistribution)
    }

    pub fn total_weight(&self) -> u64 {
        self.total
    }

    /// Number of drawable values.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

impl<T> Default for WeightedDistribution<T> {
    fn default() -> Self {
        Self::new()
    }
}
