//! Injectable randomness for sequence padding and attack variants.
use std::cell::{RefCell, RefMut};
use std::collections::VecDeque;

use hmac::{Hmac, Mac};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sha2::Sha256;

/// The two random decisions the engine ever makes.
pub trait RandomSource {
    /// Uniform index in `0..len`; `0` when `len` is zero.
    fn index(&mut self, len: usize) -> usize;

    /// Fair coin; `true` selects the second attack variant.
    fn coin_flip(&mut self) -> bool;
}

/// Deterministic bundle of RNG streams segregated by concern.
#[derive(Debug, Clone)]
pub struct RngBundle {
    padding: RefCell<CountingRng<SmallRng>>,
    combat: RefCell<CountingRng<SmallRng>>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        let padding = CountingRng::new(derive_stream_seed(seed, b"padding"));
        let combat = CountingRng::new(derive_stream_seed(seed, b"combat"));
        Self {
            padding: RefCell::new(padding),
            combat: RefCell::new(combat),
        }
    }

    /// Access the sequence padding stream.
    #[must_use]
    pub fn padding(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.padding.borrow_mut()
    }

    /// Access the combat (attack variant) stream.
    #[must_use]
    pub fn combat(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.combat.borrow_mut()
    }

    /// Hand the combat stream to a session that will own it.
    #[must_use]
    pub fn into_combat(self) -> CountingRng<SmallRng> {
        self.combat.into_inner()
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

impl<R: rand::RngCore> RandomSource for CountingRng<R> {
    fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.gen_range(0..len)
    }

    fn coin_flip(&mut self) -> bool {
        self.gen_bool(0.5)
    }
}

/// Replays a fixed script of draws; exhausted scripts yield `0` and the fallback flip.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    indices: VecDeque<usize>,
    flips: VecDeque<bool>,
    fallback_flip: bool,
}

impl ScriptedSource {
    #[must_use]
    pub fn new(indices: &[usize], flips: &[bool]) -> Self {
        Self {
            indices: indices.iter().copied().collect(),
            flips: flips.iter().copied().collect(),
            fallback_flip: false,
        }
    }

    /// A source whose every coin flip lands on `flip`.
    #[must_use]
    pub fn always(flip: bool) -> Self {
        Self {
            fallback_flip: flip,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn remaining_indices(&self) -> usize {
        self.indices.len()
    }
}

impl RandomSource for ScriptedSource {
    fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.indices.pop_front().unwrap_or(0) % len
    }

    fn coin_flip(&mut self) -> bool {
        self.flips.pop_front().unwrap_or(self.fallback_flip)
    }
}

pub(crate) fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
