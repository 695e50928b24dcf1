//! Random sources for glitch injection.
//!
//! The engine only needs "looks random" values, so the default source is a
//! xorshift64* generator. [`ScriptedRng`] replays a fixed list of values and
//! is what tests and reproducible demos plug in.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use teletype_common::traits::RandomSource;

/// Characters a glitch may put on screen.
pub const CORRUPTION_ALPHABET: &[char] = &[
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '!', '@',
    '#', '$', '%', '^', '&', '*', '(', ')', '_', '+', '-', '=',
];

static SEED_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Draw one character from [`CORRUPTION_ALPHABET`].
pub fn corrupt_char<R: RandomSource + ?Sized>(rng: &mut R) -> char {
    CORRUPTION_ALPHABET[rng.pick_index(CORRUPTION_ALPHABET.len())]
}

/// xorshift64* generator.
#[derive(Debug, Clone)]
pub struct XorShiftRng {
    state: u64,
}

impl XorShiftRng {
    pub fn seeded(seed: u64) -> Self {
        // splitmix64 scramble so small seeds still give a busy state
        let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        Self {
            state: if z == 0 { 0x2545_F491_4F6C_DD1D } else { z },
        }
    }

    /// Seed from the clock and a process-wide counter so terminals created
    /// in the same instant still diverge.
    pub fn from_entropy() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        let salt = SEED_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::seeded(nanos ^ salt.rotate_left(32))
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }
}

impl Default for XorShiftRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RandomSource for XorShiftRng {
    fn next_f64(&mut self) -> f64 {
        // top 53 bits -> [0, 1)
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Replays a fixed list of values, then a fallback forever.
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    values: VecDeque<f64>,
    fallback: f64,
    draws: usize,
}

impl ScriptedRng {
    pub fn new<I: IntoIterator<Item = f64>>(values: I) -> Self {
        Self {
            values: values.into_iter().collect(),
            fallback: 0.999,
            draws: 0,
        }
    }

    /// Source that always returns `value`.
    pub fn constant(value: f64) -> Self {
        Self::new([]).with_fallback(value)
    }

    pub fn with_fallback(mut self, value: f64) -> Self {
        self.fallback = value;
        self
    }

    /// How many values have been drawn so far.
    pub fn draws(&self) -> usize {
        self.draws
    }
}

impl RandomSource for ScriptedRng {
    fn next_f64(&mut self) -> f64 {
        self.draws += 1;
        self.values.pop_front().unwrap_or(self.fallback)
    }
}
