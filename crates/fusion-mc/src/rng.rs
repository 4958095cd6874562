// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Random Streams
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Seeded random streams.
//!
//! Every sampling routine takes an explicit `&mut R where R: Rng`; parallel
//! loops derive one independent stream per work item so results do not
//! depend on the thread count.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Stream for work item `stream_id` of a run seeded with `seed`.
///
/// Both inputs occupy separate words of the 256-bit seed, so distinct
/// `(seed, stream_id)` pairs never share a stream.
pub fn stream(seed: u64, stream_id: u64) -> StdRng {
    let mut key = [0u8; 32];
    key[..8].copy_from_slice(&seed.to_le_bytes());
    key[8..16].copy_from_slice(&stream_id.to_le_bytes());
    StdRng::from_seed(key)
}

/// Uniform draw in `(0, 1]`, safe as a logarithm argument.
#[inline]
pub fn open_unit<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    1.0 - rng.gen::<f64>()
}

/// Random sign, ±1 with equal probability.
#[inline]
pub fn sign<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    if rng.gen::<f64>() < 0.5 {
        -1.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streams_are_reproducible() {
        let draw = |mut rng: StdRng| -> Vec<f64> { (0..5).map(|_| rng.gen()).collect() };
        assert_eq!(draw(stream(7, 3)), draw(stream(7, 3)));
        assert_ne!(draw(stream(7, 3)), draw(stream(7, 4)));
    }

    #[test]
    fn test_adjacent_seeds_do_not_share_shifted_streams() {
        let draw = |mut rng: StdRng| -> Vec<u64> { (0..4).map(|_| rng.gen()).collect() };
        for k in 1..64 {
            assert_ne!(draw(stream(10, k)), draw(stream(11, k - 1)));
        }
    }

    #[test]
    fn test_open_unit_and_sign_ranges() {
        let mut rng = stream(1, 0);
        let mut negatives = 0;
        for _ in 0..1000 {
            let u = open_unit(&mut rng);
            assert!(u > 0.0 && u <= 1.0);
            if sign(&mut rng) < 0.0 {
                negatives += 1;
            }
        }
        assert!((400..600).contains(&negatives));
    }
}
