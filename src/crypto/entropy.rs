//! Entropy sources backed by `rand`.

use rand::RngCore;
use rand::rngs::OsRng;

use crate::core::{EntropyError, EntropySource};

/// Operating system randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| EntropyError(e.to_string()))
    }
}

/// Adapter for any [`RngCore`], e.g. a seeded generator in tests.
#[derive(Debug, Clone)]
pub struct RngEntropy<R>(pub R);

impl<R: RngCore> RngEntropy<R> {
    /// Wrap a generator.
    pub fn new(rng: R) -> Self {
        Self(rng)
    }
}

impl<R: RngCore> EntropySource for RngEntropy<R> {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
        self.0
            .try_fill_bytes(dest)
            .map_err(|e| EntropyError(e.to_string()))
    }
}
