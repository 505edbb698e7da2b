//! Reproducible randomness for `random()`, `randint` and `randintnorep`.
//!
//! Random nodes carry a seed slot assigned during projection. The first
//! draw for a slot is cached for the rest of the evaluation, so two
//! references to the same node agree while distinct nodes draw
//! independently. Nodes without a slot (seed 0) are cached by position.

use crate::Vec;
use crate::interrupt::{Aborted, Budget};
use hashbrown::HashMap;
use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SlotKey {
    Seed(u32),
    Node(usize, usize),
}

#[derive(Debug, Clone)]
pub struct RandomContext {
    rng: ChaCha8Rng,
    slots: HashMap<SlotKey, f64>,
    draws: HashMap<SlotKey, Draws>,
}

impl RandomContext {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            slots: HashMap::new(),
            draws: HashMap::new(),
        }
    }

    fn key(seed: u8, node: usize, element: usize) -> SlotKey {
        if seed == 0 {
            SlotKey::Node(node, element)
        } else {
            SlotKey::Seed(seed as u32 + element as u32)
        }
    }

    /// Uniform in `[0, 1)` with 53 random bits.
    fn uniform(&mut self) -> f64 {
        (self.rng.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform integer in `[a, b]`; `a <= b` is the caller's business.
    fn integer(&mut self, a: i64, b: i64) -> i64 {
        let span = (b as i128 - a as i128 + 1) as u128;
        let offset = (self.rng.next_u64() as u128 % span) as i128;
        (a as i128 + offset) as i64
    }

    fn cached(&mut self, key: SlotKey, draw: impl FnOnce(&mut Self) -> f64) -> f64 {
        if let Some(value) = self.slots.get(&key) {
            return *value;
        }
        let value = draw(self);
        trace!(?key, value, "random slot drawn");
        self.slots.insert(key, value);
        value
    }

    pub fn random(&mut self, seed: u8, node: usize) -> f64 {
        self.cached(Self::key(seed, node, 0), Self::uniform)
    }

    /// `randint(a, b)`: `None` for non-finite, non-integer or reversed bounds.
    pub fn rand_int(&mut self, seed: u8, node: usize, a: f64, b: f64) -> Option<f64> {
        let (a, b) = integer_bounds(a, b)?;
        Some(self.cached(Self::key(seed, node, 0), |ctx| ctx.integer(a, b) as f64))
    }

    /// Element `index` of `randintnorep(a, b, n)`.
    ///
    /// Draws of one node are kept in draw order, with a sorted copy next to
    /// them. Draw `j` picks a rank among the `b - a + 1 - j` values still
    /// free and the sorted copy maps it to the value, which keeps the draws
    /// distinct and uniform. Each new draw costs one iteration of `budget`.
    #[allow(clippy::too_many_arguments)]
    pub fn rand_int_no_rep(
        &mut self,
        budget: &mut Budget,
        seed: u8,
        node: usize,
        a: f64,
        b: f64,
        count: usize,
        index: usize,
    ) -> Result<Option<f64>, Aborted> {
        let Some((a, b)) = integer_bounds(a, b) else {
            return Ok(None);
        };
        if index >= count || count as i128 > b as i128 - a as i128 + 1 {
            return Ok(None);
        }
        let key = Self::key(seed, node, 0);
        let mut draws = self.draws.remove(&key).unwrap_or_default();
        while draws.ordered.len() <= index {
            if let Err(aborted) = budget.poll() {
                self.draws.insert(key, draws);
                return Err(aborted);
            }
            let rank = self.integer(a, b - draws.ordered.len() as i64) - a;
            let value = draws.free_value(a, rank);
            trace!(?key, value, "distinct draw");
            draws.push(value);
        }
        let value = draws.ordered[index];
        self.draws.insert(key, draws);
        Ok(Some(value as f64))
    }
}

/// Distinct integers drawn so far by one `randintnorep` node.
#[derive(Debug, Clone, Default)]
struct Draws {
    ordered: Vec<i64>,
    sorted: Vec<i64>,
}

impl Draws {
    /// The free value of 0-based `rank` in `[a, ...)`, skipping drawn values.
    fn free_value(&self, a: i64, rank: i64) -> i64 {
        // Free values below sorted[i] number sorted[i] - a - i, which never
        // decreases with i.
        let (mut low, mut high) = (0, self.sorted.len());
        while low < high {
            let middle = low + (high - low) / 2;
            if self.sorted[middle] - a - middle as i64 <= rank {
                low = middle + 1;
            } else {
                high = middle;
            }
        }
        a + rank + low as i64
    }

    fn push(&mut self, value: i64) {
        let position = self.sorted.binary_search(&value).unwrap_or_else(|p| p);
        self.sorted.insert(position, value);
        self.ordered.push(value);
    }
}

fn integer_bounds(a: f64, b: f64) -> Option<(i64, i64)> {
    if !a.is_finite() || !b.is_finite() || a != a.round() || b != b.round() || a > b {
        return None;
    }
    if a.abs() > 9.0e15 || b.abs() > 9.0e15 {
        return None;
    }
    Some((a as i64, b as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::{AbortReason, CancellationToken};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_same_slot_is_cached() {
        let mut random = RandomContext::new(7);
        let first = random.rand_int(1, 0, 1.0, 1000.0);
        assert_eq!(random.rand_int(1, 0, 1.0, 1000.0), first);
        let value = random.random(2, 0);
        assert!((0.0..1.0).contains(&value));
        assert_eq!(random.random(2, 0), value);
    }

    #[test]
    fn test_rand_int_bounds() {
        let mut random = RandomContext::new(1);
        assert_eq!(random.rand_int(1, 0, 5.0, 5.0), Some(5.0));
        assert_eq!(random.rand_int(2, 0, 5.0, 4.0), None);
        assert_eq!(random.rand_int(3, 0, 0.5, 4.0), None);
        assert_eq!(random.rand_int(4, 0, f64::NEG_INFINITY, 4.0), None);
    }

    fn no_rep(random: &mut RandomContext, b: f64, count: usize, index: usize) -> Option<f64> {
        let mut budget = Budget::unlimited();
        random
            .rand_int_no_rep(&mut budget, 1, 0, 1.0, b, count, index)
            .unwrap()
    }

    #[test]
    fn test_no_repetition() {
        let mut random = RandomContext::new(42);
        let mut values: Vec<i64> = (0..10)
            .map(|i| no_rep(&mut random, 10.0, 10, i).unwrap() as i64)
            .collect();
        values.sort_unstable();
        assert_eq!(values, (1..=10).collect::<Vec<_>>());
        assert_eq!(no_rep(&mut RandomContext::new(42), 3.0, 4, 0), None);
    }

    #[test]
    fn test_free_value_skips_drawn_values() {
        let mut draws = Draws::default();
        for value in [3, 7, 4] {
            draws.push(value);
        }
        assert_eq!(draws.sorted, vec![3, 4, 7]);
        let free: Vec<i64> = (0..5).map(|rank| draws.free_value(1, rank)).collect();
        assert_eq!(free, vec![1, 2, 5, 6, 8]);
    }

    #[test]
    fn test_draws_are_kept_per_node() {
        let mut random = RandomContext::new(5);
        let late = no_rep(&mut random, 1000.0, 100, 99);
        let early: Vec<Option<f64>> = (0..100)
            .map(|i| no_rep(&mut random, 1000.0, 100, i))
            .collect();
        assert_eq!(early[99], late);
        let mut distinct: Vec<i64> = early.iter().map(|v| v.unwrap() as i64).collect();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len(), 100);
    }

    #[test]
    fn test_large_draw_counts_stop_at_the_budget() {
        let mut random = RandomContext::new(9);
        let mut budget = Budget::new(CancellationToken::new(), 1000, usize::MAX);
        let aborted = random
            .rand_int_no_rep(&mut budget, 1, 0, 1.0, 1.0e15, 1_000_000_000_000, 999_999_999_999)
            .unwrap_err();
        assert_eq!(aborted.reason, AbortReason::IterationLimit { limit: 1000 });
    }

    #[test]
    fn test_reseeding_reproduces() {
        let draw = |seed| RandomContext::new(seed).rand_int(1, 0, 1.0, 1_000_000.0);
        assert_eq!(draw(3), draw(3));
    }
}
