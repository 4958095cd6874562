// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Atomic Float
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use std::sync::atomic::{AtomicU64, Ordering};

/// `f64` cell with lock-free add, stored as its bit pattern.
#[derive(Debug, Default)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        AtomicF64(AtomicU64::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Add `delta`, returning the previous value.
    #[inline]
    pub fn fetch_add(&self, delta: f64) -> f64 {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(prev) => return f64::from_bits(prev),
                Err(actual) => current = actual,
            }
        }
    }
}

impl Clone for AtomicF64 {
    fn clone(&self) -> Self {
        AtomicF64::new(self.load())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_fetch_add_returns_previous() {
        let cell = AtomicF64::new(1.5);
        assert_eq!(cell.fetch_add(2.0), 1.5);
        assert_eq!(cell.load(), 3.5);
        cell.store(-1.0);
        assert_eq!(cell.clone().load(), -1.0);
    }

    #[test]
    fn test_concurrent_adds_are_not_lost() {
        let cell = AtomicF64::new(0.0);
        (0..10_000).into_par_iter().for_each(|_| {
            cell.fetch_add(1.0);
        });
        assert_eq!(cell.load(), 10_000.0);
    }
}
