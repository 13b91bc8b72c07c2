//! Exact factorials and the factorial quotients used by the Zernike radial expansion.

/// Largest `n` for which `n!` fits in a [u128].
pub const MAX_FACTORIAL: u8 = 34;

const ENTRIES: usize = MAX_FACTORIAL as usize + 1;

/// Table of `0!` through `34!`, built at compile time.
pub struct Factorials {
    entries: [u128; ENTRIES],
}
impl Factorials {
    pub const fn new() -> Self {
        let mut entries = [1u128; ENTRIES];
        let mut i = 2;
        while i < ENTRIES {
            entries[i] = i as u128 * entries[i - 1];
            i += 1;
        }
        Self { entries }
    }

    #[inline]
    pub fn get(&self, n: u8) -> u128 {
        assert!(n <= MAX_FACTORIAL, "{n}! overflows");
        self.entries[n as usize]
    }

    /// `n! / (d_0! · d_1! · …)`, dividing one factor at a time so that no intermediate
    /// product overflows. The result is exact only when the quotient is an integer.
    pub fn quotient(&self, n: u8, denominators: &[u8]) -> u128 {
        denominators
            .iter()
            .fold(self.get(n), |quotient, &d| quotient / self.get(d))
    }

    /// Binomial coefficient `C(n, r)`.
    pub fn combinations(&self, n: u8, r: u8) -> u128 {
        assert!(n >= r, "n ({n}) < r ({r})");
        self.quotient(n, &[r, n - r])
    }
}

impl Default for Factorials {
    fn default() -> Self {
        Self::new()
    }
}

pub static FACTORIALS: Factorials = Factorials::new();
