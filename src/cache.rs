//! Synthesis cache
//!
//! Firmware tends to ask for the same few PLL rates over and over. A small
//! ring of the last `N` successful syntheses saves the search.

use crate::errors::PllError;
use crate::pll::{synthesize, PllSetup};

/// Synthesis request
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Key {
    input_hz: u32,
    output_hz: u32,
    feedback_div2: bool,
    spread_spectrum: bool,
}

/// Bounded FIFO of synthesis results, capacity `N`.
/// `N = 0` disables caching.
#[derive(Debug, Clone)]
pub struct SynthesisCache<const N: usize> {
    entries: [Option<(Key, PllSetup)>; N],
    cursor: usize,
}

impl<const N: usize> Default for SynthesisCache<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SynthesisCache<N> {
    /// Empty cache
    pub const fn new() -> Self {
        SynthesisCache {
            entries: [None; N],
            cursor: 0,
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    fn lookup(&self, key: &Key) -> Option<PllSetup> {
        self.entries
            .iter()
            .flatten()
            .find(|(k, _)| k == key)
            .map(|(_, setup)| *setup)
    }

    fn store(&mut self, key: Key, setup: PllSetup) {
        if N == 0 {
            return;
        }
        self.entries[self.cursor] = Some((key, setup));
        self.cursor = (self.cursor + 1) % N;
    }

    /// Cached setup for the request, synthesised and stored on a miss.
    /// Failed syntheses are not stored.
    pub fn get_or_compute(
        &mut self,
        input_hz: u32,
        output_hz: u32,
        use_feedback_div2: bool,
        use_ss: bool,
    ) -> Result<PllSetup, PllError> {
        let key = Key {
            input_hz,
            output_hz,
            feedback_div2: use_feedback_div2,
            spread_spectrum: use_ss,
        };

        if let Some(setup) = self.lookup(&key) {
            trace!("pll cache hit: {} -> {}", input_hz, output_hz);
            return Ok(setup);
        }

        let setup = synthesize(input_hz, output_hz, use_feedback_div2, use_ss)?;
        self.store(key, setup);
        Ok(setup)
    }

    #[cfg(test)]
    fn contains(
        &self,
        input_hz: u32,
        output_hz: u32,
        feedback_div2: bool,
        spread_spectrum: bool,
    ) -> bool {
        self.lookup(&Key { input_hz, output_hz, feedback_div2, spread_spectrum }).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IN: u32 = 12_000_000;

    #[test]
    fn test_transparent() {
        let mut cache = SynthesisCache::<4>::new();
        for out in [100_000_000, 48_000_000, 100_000_000, 96_000_000, 48_000_000] {
            let expected = synthesize(IN, out, false, false);
            assert_eq!(cache.get_or_compute(IN, out, false, false), expected);
        }
        assert_eq!(cache.len(), 3);

        // same rates, different flags are different entries
        let expected = synthesize(IN, 100_000_000, false, true);
        assert_eq!(cache.get_or_compute(IN, 100_000_000, false, true), expected);
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn test_errors_not_stored() {
        let mut cache = SynthesisCache::<4>::new();
        let res = cache.get_or_compute(IN, 200_000_000, false, false);
        assert_eq!(res, Err(PllError::OutputTooHigh));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_fifo_eviction() {
        let mut cache = SynthesisCache::<3>::new();
        let outs = [80_000_000, 90_000_000, 100_000_000, 110_000_000];
        for out in outs {
            cache.get_or_compute(IN, out, false, false).unwrap();
        }
        assert_eq!(cache.len(), 3);
        // the first key was overwritten by the fourth
        assert!(!cache.contains(IN, outs[0], false, false));
        for out in &outs[1..] {
            assert!(cache.contains(IN, *out, false, false));
        }

        // a hit does not refresh an entry, the oldest goes next
        cache.get_or_compute(IN, outs[1], false, false).unwrap();
        cache.get_or_compute(IN, 120_000_000, false, false).unwrap();
        assert!(!cache.contains(IN, outs[1], false, false));
        assert!(cache.contains(IN, outs[2], false, false));
    }

    #[test]
    fn test_zero_capacity() {
        let mut cache = SynthesisCache::<0>::new();
        let expected = synthesize(IN, 100_000_000, false, false);
        assert_eq!(cache.get_or_compute(IN, 100_000_000, false, false), expected);
        assert!(cache.is_empty());

        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
