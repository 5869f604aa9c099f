// wyrand mixing constants (Wang Yi, "wyhash" final version).
const INC: u64 = 0xa0761d6478bd642f;
const XOR: u64 = 0xe7037ed1a0b428db;

/// Seeded 64-bit generator. Two instances built from the same seed produce the same infinite
/// sequence on every platform: all arithmetic is fixed-width and wraps explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn from_seed(seed: u64) -> Rng {
        Rng { state: seed }
    }

    /// Draws the next raw 64-bit value and advances the internal state.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(INC);
        let product = u128::from(self.state) * u128::from(self.state ^ XOR);
        ((product >> 64) as u64) ^ (product as u64)
    }

    /// One fair coin flip, taken from the top bit of a single draw.
    pub fn boolean(&mut self) -> bool {
        self.next_u64() >> 63 == 1
    }

    /// Picks a value uniformly distributed between `0.0` (inclusive) and `1.0` (exclusive).
    pub fn rnd(&mut self) -> f64 {
        2.0f64.powi(-53) * (self.next_u64() >> 11) as f64
    }

    /// Picks a value uniformly distributed between `min` (inclusive) and `max` (exclusive).
    pub fn uniform(&mut self, min: f64, max: f64) -> f64 {
        self.rnd() * (max - min) + min
    }

    /// Picks an integer uniformly distributed between `lo` and `hi`, both inclusive.
    ///
    /// Uses Lemire's multiply-and-reject method, so there is no modulo bias. Most calls consume
    /// exactly one draw; a rejection consumes another.
    ///
    /// ```
    /// use imagen::rand::Rng;
    /// let mut rng = Rng::from_seed(42);
    /// let rolls: [u64; 10] = std::array::from_fn(|_| rng.int_in_range(1, 6));
    /// assert_eq!(rolls, [5, 6, 5, 6, 3, 6, 2, 1, 6, 3]);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `hi < lo`.
    pub fn int_in_range(&mut self, lo: u64, hi: u64) -> u64 {
        assert!(lo <= hi, "empty range {}..={}", lo, hi);
        let span = (hi - lo).wrapping_add(1);
        if span == 0 {
            // The range covers every u64.
            return self.next_u64();
        }
        let mut m = u128::from(self.next_u64()) * u128::from(span);
        if (m as u64) < span {
            let threshold = span.wrapping_neg() % span;
            while (m as u64) < threshold {
                m = u128::from(self.next_u64()) * u128::from(span);
            }
        }
        lo + (m >> 64) as u64
    }
}
