//! Random draws shared by the generation stages.
//!
//! Ranges tolerate inverted bounds so a sloppy preset still yields a dungeon.

use rand::Rng;

use crate::constants::PERCENT;

/// Uniform integer in `lo..=hi`, or `lo` when the range is empty.
pub fn range_inclusive<R: Rng + ?Sized>(rng: &mut R, lo: i32, hi: i32) -> i32 {
    if hi <= lo {
        lo
    } else {
        rng.gen_range(lo..=hi)
    }
}

/// Uniform float in `lo..=hi`, or `lo` when the range is empty.
pub fn range_f64<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        lo
    } else {
        rng.gen_range(lo..=hi)
    }
}

/// `true` with probability `chance / 100`.
pub fn percent_roll<R: Rng + ?Sized>(rng: &mut R, chance: i32) -> bool {
    rng.gen_range(0..PERCENT) < chance
}

/// Uniform index into a slice of `len` elements.
pub fn pick_index<R: Rng + ?Sized>(rng: &mut R, len: usize) -> usize {
    rng.gen_range(0..len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_range_inclusive_bounds() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        for _ in 0..500 {
            let v = range_inclusive(&mut rng, 3, 5);
            assert!((3..=5).contains(&v));
        }
        assert_eq!(range_inclusive(&mut rng, 9, 2), 9, "inverted range yields lo");
        assert_eq!(range_inclusive(&mut rng, 4, 4), 4);
    }

    #[test]
    fn test_percent_roll_extremes() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        assert!((0..200).all(|_| !percent_roll(&mut rng, 0)));
        assert!((0..200).all(|_| percent_roll(&mut rng, 100)));
    }

    #[test]
    fn test_range_f64_degenerate() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        assert_eq!(range_f64(&mut rng, 35.0, 20.0), 35.0);
    }
}
