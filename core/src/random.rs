//! Sources of uniformly distributed draws.

use crate::Error;
use rand::{rngs::OsRng, Rng, RngCore};
use std::collections::VecDeque;

pub trait RandomSource {
    /// Draws uniformly from `[low, high_exclusive)`.
    fn next(&mut self, low: u32, high_exclusive: u32) -> Result<u32, Error>;
}

/// Draws straight from the operating system's entropy source, which on
/// supported hardware is backed by its true random number generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl RandomSource for OsEntropy {
    fn next(&mut self, low: u32, high_exclusive: u32) -> Result<u32, Error> {
        if high_exclusive <= low {
            return Err(Error::DegenerateBound);
        }
        let mut rng = Checked::new(OsRng);
        let value = rng.gen_range(low..high_exclusive);
        match rng.failure {
            Some(err) => Err(Error::EntropyUnavailable(err.to_string())),
            None => Ok(value),
        }
    }
}

/// Turns the panicking `RngCore` calls that `gen_range` makes into a
/// recorded failure.
struct Checked<R> {
    inner: R,
    failure: Option<rand::Error>,
}

impl<R: RngCore> Checked<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            failure: None,
        }
    }
}

impl<R: RngCore> RngCore for Checked<R> {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0; 4];
        self.fill_bytes(&mut bytes);
        u32::from_le_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0; 8];
        self.fill_bytes(&mut bytes);
        u64::from_le_bytes(bytes)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        if let Err(err) = self.try_fill_bytes(dest) {
            // zeroes are always accepted by the rejection sampler
            dest.fill(0);
            self.failure.get_or_insert(err);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        if self.failure.is_some() {
            dest.fill(0);
            return Ok(());
        }
        self.inner.try_fill_bytes(dest)
    }
}

/// Replays a fixed sequence of draws, for deterministic sessions.
///
/// Each value is reduced into the requested range. An exhausted script
/// behaves like an unavailable entropy source.
#[derive(Debug, Clone, Default)]
pub struct Scripted {
    values: VecDeque<u32>,
}

impl Scripted {
    pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

impl RandomSource for Scripted {
    fn next(&mut self, low: u32, high_exclusive: u32) -> Result<u32, Error> {
        if high_exclusive <= low {
            return Err(Error::DegenerateBound);
        }
        let value = self
            .values
            .pop_front()
            .ok_or_else(|| Error::EntropyUnavailable("script exhausted".into()))?;
        Ok(low + value % (high_exclusive - low))
    }
}

/// A source whose hardware never came up.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

impl RandomSource for Unavailable {
    fn next(&mut self, _low: u32, _high_exclusive: u32) -> Result<u32, Error> {
        Err(Error::EntropyUnavailable("no entropy device".into()))
    }
}
