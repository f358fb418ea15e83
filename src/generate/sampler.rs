use rand::rngs::ThreadRng;
use rand::{CryptoRng, Rng};

use crate::foundation::error::{DuckgenError, DuckgenResult};

/// Weighted and uniform draws over a cryptographically strong random source.
///
/// The source must implement [`CryptoRng`]. Production code uses
/// [`WeightedSampler::from_entropy`]; tests pass a seeded `StdRng`.
pub struct WeightedSampler<R> {
    rng: R,
}

impl WeightedSampler<ThreadRng> {
    /// Sampler backed by the thread-local CSPRNG.
    pub fn from_entropy() -> Self {
        Self::new(rand::thread_rng())
    }
}

impl<R: Rng + CryptoRng> WeightedSampler<R> {
    /// Wrap an explicit random source.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Pick one item with probability proportional to `weight(item)`.
    ///
    /// Zero-weight items are never returned. Weights are accumulated as integers: a uniform draw
    /// `r` in `[0, total)` selects the first item whose running sum exceeds `r`.
    pub fn pick<'a, T>(
        &mut self,
        items: &'a [T],
        weight: impl Fn(&T) -> u32,
    ) -> DuckgenResult<&'a T> {
        let total: u64 = items.iter().map(|it| u64::from(weight(it))).sum();
        if total == 0 {
            return Err(DuckgenError::EmptyCandidateSet);
        }

        let r = self.rng.gen_range(0..total);
        let mut acc = 0u64;
        for it in items {
            let w = u64::from(weight(it));
            if w == 0 {
                continue;
            }
            acc += w;
            if r < acc {
                return Ok(it);
            }
        }
        // `r < total` and `acc` reaches `total` on the last non-zero item.
        Err(DuckgenError::EmptyCandidateSet)
    }

    /// Return `true` with probability `percent / 100` (values above 100 always pass).
    pub fn chance_percent(&mut self, percent: u32) -> bool {
        self.rng.gen_range(0..100u32) < percent
    }

    /// Choose `amount` distinct indices from `0..len`, uniformly without replacement.
    pub fn distinct_indices(&mut self, len: usize, amount: usize) -> DuckgenResult<Vec<usize>> {
        if amount > len {
            return Err(DuckgenError::InvalidGoldenMarkerCount {
                requested: amount,
                available: len,
                partial: None,
            });
        }
        Ok(rand::seq::index::sample(&mut self.rng, len, amount).into_vec())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/generate/sampler.rs"]
mod tests;
