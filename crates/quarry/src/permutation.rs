/// Number of Feistel rounds. Four rounds give a permutation that is
/// indistinguishable from random for the purposes of sampling.
const ROUNDS: usize = 4;

/// A keyed bijection over `[0, len)` that is computed on demand.
///
/// The permutation is a balanced Feistel network over the smallest even bit
/// width that covers `len`, with cycle walking to stay inside the domain. It
/// stores only its round keys, so memory use is constant no matter how large
/// the domain is, and the same `(seed_a, seed_b)` pair always yields the same
/// order.
///
/// # Example
/// ```
/// use quarry::Permutation;
///
/// let perm = Permutation::new(10, 42, 52);
/// let mut seen: Vec<u64> = (0..10).map(|i| perm.apply(i)).collect();
/// seen.sort_unstable();
/// assert_eq!(seen, (0..10).collect::<Vec<_>>());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permutation {
    len: u64,
    half_bits: u32,
    half_mask: u64,
    keys: [u64; ROUNDS],
}

impl Permutation {
    /// Builds the permutation of `[0, len)` keyed by two seed words.
    ///
    /// Leaves seed it with their own bounds so a rebuilt leaf proposes the
    /// same order it did before a restart.
    pub fn new(len: u64, seed_a: u64, seed_b: u64) -> Self {
        let width = if len <= 1 {
            2
        } else {
            (u64::BITS - (len - 1).leading_zeros()).max(2)
        };
        let width = width + (width & 1);
        let half_bits = width / 2;
        let half_mask = (1_u64 << half_bits) - 1;

        let mut state = mix(seed_a, seed_b);
        let mut keys = [0; ROUNDS];
        for key in &mut keys {
            state = state.wrapping_add(GOLDEN_GAMMA);
            *key = finalize(state);
        }

        Self {
            len,
            half_bits,
            half_mask,
            keys,
        }
    }

    /// Size of the permuted domain.
    pub const fn len(&self) -> u64 {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maps position `index` of the shuffled order to its value.
    ///
    /// `index` must be in `[0, len)`; every value in `[0, len)` is produced
    /// exactly once across all indices.
    pub fn apply(&self, index: u64) -> u64 {
        debug_assert!(index < self.len, "index {index} >= len {}", self.len);
        // Cycle walking: the network permutes a power-of-four domain that is
        // at most four times `len`, so a handful of steps lands back inside.
        let mut value = self.encrypt(index);
        while value >= self.len {
            value = self.encrypt(value);
        }
        value
    }

    fn encrypt(&self, value: u64) -> u64 {
        let mut left = value >> self.half_bits;
        let mut right = value & self.half_mask;
        for key in self.keys {
            let next = left ^ (finalize(right ^ key) & self.half_mask);
            left = right;
            right = next;
        }
        (left << self.half_bits) | right
    }
}

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Combines two words into a well-distributed seed.
const fn mix(a: u64, b: u64) -> u64 {
    finalize(a.wrapping_add(b.wrapping_mul(GOLDEN_GAMMA)))
}

/// splitmix64 finalizer.
const fn finalize(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn collect(perm: &Permutation) -> Vec<u64> {
        (0..perm.len()).map(|i| perm.apply(i)).collect()
    }

    #[test]
    fn covers_domain_exactly_once() {
        for len in [1, 2, 3, 4, 5, 7, 16, 17, 100, 1000, 4097] {
            let perm = Permutation::new(len, 7, 7 + len);
            let values = collect(&perm);
            let unique: HashSet<u64> = values.iter().copied().collect();
            assert_eq!(unique.len() as u64, len, "len {len}");
            assert!(values.iter().all(|&v| v < len));
        }
    }

    #[test]
    fn same_seed_same_order() {
        let a = Permutation::new(500, 1_000, 1_500);
        let b = Permutation::new(500, 1_000, 1_500);
        assert_eq!(a, b);
        assert_eq!(collect(&a), collect(&b));
    }

    #[test]
    fn different_seed_different_order() {
        let a = Permutation::new(500, 1_000, 1_500);
        let b = Permutation::new(500, 2_000, 2_500);
        assert_ne!(collect(&a), collect(&b));
    }

    #[test]
    fn order_is_shuffled() {
        let perm = Permutation::new(1_000, 0, 1_000);
        let values = collect(&perm);
        let identity = values.iter().enumerate().filter(|(i, v)| *i as u64 == **v);
        assert!(identity.count() < 50);
    }

    #[test]
    fn wide_domains_stay_in_bounds() {
        let len = u64::MAX - 3;
        let perm = Permutation::new(len, 3, u64::MAX);
        for index in [0, 1, 2, len / 2, len - 1] {
            assert!(perm.apply(index) < len);
        }
    }
}
