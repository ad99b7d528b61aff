//! Reproducible shuffling.
//!
//! Seeds are strings. They are hashed with BLAKE3 and the first eight bytes
//! (little-endian) feed a SplitMix64-expanded `xoroshiro128+` generator, so a
//! given seed yields the same permutation on every run and every platform.

/// Stable 64-bit digest of a seed string.
pub fn seed_hash(seed: &str) -> u64 {
    let hash = blake3::hash(seed.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(head)
}

/// Fisher–Yates shuffle of `items` driven by `seed`.
pub fn permute<T: Clone>(items: &[T], seed: &str) -> Vec<T> {
    let mut out = items.to_vec();
    let mut rng = Prng::from_seed_u64(seed_hash(seed));
    for i in (1..out.len()).rev() {
        let j = rng.below(i as u64 + 1) as usize;
        out.swap(i, j);
    }
    out
}

/// `xoroshiro128+`; not cryptographically secure.
#[derive(Debug, Clone, Copy)]
struct Prng {
    state: [u64; 2],
}

impl Prng {
    fn from_seed_u64(seed: u64) -> Self {
        fn splitmix64(state: &mut u64) -> u64 {
            *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
            let mut z = *state;
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
            z ^ (z >> 31)
        }

        let mut sm_state = seed;
        let mut state = [splitmix64(&mut sm_state), splitmix64(&mut sm_state)];
        if state == [0, 0] {
            state[0] = 0x9e37_79b9_7f4a_7c15;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(55) ^ s1 ^ (s1 << 14);
        self.state[1] = s1.rotate_left(36);

        result
    }

    /// Uniform value in `[0, bound)`; rejection sampling avoids modulo bias.
    fn below(&mut self, bound: u64) -> u64 {
        debug_assert!(bound > 0);
        if bound.is_power_of_two() {
            return self.next_u64() & (bound - 1);
        }
        let zone = u64::MAX - u64::MAX % bound;
        loop {
            let candidate = self.next_u64();
            if candidate < zone {
                return candidate % bound;
            }
        }
    }
}
