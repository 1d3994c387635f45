//! Number calling without replacement.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Highest number that can be called
pub const MAX_NUMBER: u8 = 75;

/// Call numbers of one game, in call order.
///
/// Append-only: a value is accepted at most once and never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawnNumbers {
    order: Vec<u8>,
    /// Bit `n` is set once `n` has been called
    seen: u128,
}

impl DrawnNumbers {
    pub fn new() -> Self {
        Self {
            order: Vec::with_capacity(MAX_NUMBER as usize),
            seen: 0,
        }
    }

    /// Append `number`. Returns false for duplicates and values outside `1..=75`.
    pub fn push(&mut self, number: u8) -> bool {
        if !(1..=MAX_NUMBER).contains(&number) || self.contains(number) {
            return false;
        }
        self.seen |= 1u128 << number;
        self.order.push(number);
        true
    }

    pub fn contains(&self, number: u8) -> bool {
        number <= MAX_NUMBER && self.seen & (1u128 << number) != 0
    }

    /// Like [`contains`](Self::contains) for untrusted client input
    pub fn contains_value(&self, value: i64) -> bool {
        u8::try_from(value).is_ok_and(|n| self.contains(n))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All 75 numbers have been called
    pub fn is_exhausted(&self) -> bool {
        self.order.len() >= MAX_NUMBER as usize
    }

    pub fn last(&self) -> Option<u8> {
        self.order.last().copied()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.order
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.order.clone()
    }
}

/// Pick a uniformly random number in `1..=75` not yet in `drawn`.
///
/// Returns `None` once the deck is exhausted.
pub fn draw_next<R: Rng + ?Sized>(drawn: &DrawnNumbers, rng: &mut R) -> Option<u8> {
    if drawn.is_exhausted() {
        return None;
    }

    loop {
        let candidate = rng.random_range(1..=MAX_NUMBER);
        if !drawn.contains(candidate) {
            return Some(candidate);
        }
    }
}

/// Where a game's call numbers come from
pub trait DrawSource: Send {
    /// Next number not yet in `drawn`, or `None` once all 75 are called
    fn next_number(&mut self, drawn: &DrawnNumbers) -> Option<u8>;
}

/// Uniform random draws seeded from the OS
pub struct RandomDraws {
    rng: StdRng,
}

impl RandomDraws {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible sequence for benchmarks and tests
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomDraws {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawSource for RandomDraws {
    fn next_number(&mut self, drawn: &DrawnNumbers) -> Option<u8> {
        draw_next(drawn, &mut self.rng)
    }
}

/// Calls a fixed sequence, then the lowest numbers not yet called.
///
/// Entries already called or outside `1..=75` are skipped.
pub struct ScriptedDraws {
    script: VecDeque<u8>,
}

impl ScriptedDraws {
    pub fn new(script: impl IntoIterator<Item = u8>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl DrawSource for ScriptedDraws {
    fn next_number(&mut self, drawn: &DrawnNumbers) -> Option<u8> {
        while let Some(candidate) = self.script.pop_front() {
            if (1..=MAX_NUMBER).contains(&candidate) && !drawn.contains(candidate) {
                return Some(candidate);
            }
        }
        (1..=MAX_NUMBER).find(|&n| !drawn.contains(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_push_rejects_duplicates_and_out_of_range() {
        let mut drawn = DrawnNumbers::new();
        assert!(drawn.push(5));
        assert!(!drawn.push(5));
        assert!(!drawn.push(0));
        assert!(!drawn.push(76));
        assert_eq!(drawn.as_slice(), &[5]);
        assert_eq!(drawn.last(), Some(5));
    }

    #[test]
    fn test_preserves_call_order() {
        let mut drawn = DrawnNumbers::new();
        for n in [40, 3, 75, 1] {
            assert!(drawn.push(n));
        }
        assert_eq!(drawn.to_vec(), vec![40, 3, 75, 1]);
        assert!(drawn.contains(75));
        assert!(!drawn.contains(2));
    }

    #[test]
    fn test_contains_value_handles_untrusted_input() {
        let mut drawn = DrawnNumbers::new();
        drawn.push(12);
        assert!(drawn.contains_value(12));
        assert!(!drawn.contains_value(-12));
        assert!(!drawn.contains_value(268));
        assert!(!drawn.contains_value(1_000_000));
    }

    #[test]
    fn test_draws_full_deck_without_repeats() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut drawn = DrawnNumbers::new();

        while let Some(n) = draw_next(&drawn, &mut rng) {
            assert!(drawn.push(n), "draw_next returned duplicate {}", n);
        }

        assert!(drawn.is_exhausted());
        let unique: HashSet<u8> = drawn.as_slice().iter().copied().collect();
        assert_eq!(unique.len(), 75);
        assert!(unique.iter().all(|n| (1..=75).contains(n)));
        assert_eq!(draw_next(&drawn, &mut rng), None);
    }

    #[test]
    fn test_scripted_draws_skip_called_numbers() {
        let mut source = ScriptedDraws::new([9, 9, 0, 80, 4]);
        let mut drawn = DrawnNumbers::new();

        let mut calls = Vec::new();
        for _ in 0..4 {
            let n = source.next_number(&drawn).unwrap();
            drawn.push(n);
            calls.push(n);
        }
        assert_eq!(calls, vec![9, 4, 1, 2]);
    }

    #[test]
    fn test_seeded_random_draws_are_reproducible() {
        let drawn = DrawnNumbers::new();
        let a = RandomDraws::seeded(11).next_number(&drawn);
        let b = RandomDraws::seeded(11).next_number(&drawn);
        assert_eq!(a, b);
    }
}
