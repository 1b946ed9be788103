//! Playlist shuffling

use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};

/// In-place Fisher-Yates shuffle with the given RNG
///
/// Every permutation is equally likely.
pub fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    items.shuffle(rng);
}

/// Shuffle with the thread-local RNG
pub fn shuffle<T>(items: &mut [T]) {
    fisher_yates(items, &mut thread_rng());
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn shuffle_keeps_every_item() {
        let mut items: Vec<u32> = (0..50).collect();
        shuffle(&mut items);

        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let mut a: Vec<u32> = (0..20).collect();
        let mut b = a.clone();
        fisher_yates(&mut a, &mut StdRng::seed_from_u64(42));
        fisher_yates(&mut b, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
        assert_ne!(a, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn tiny_lists_are_fine() {
        let mut empty: Vec<u8> = Vec::new();
        shuffle(&mut empty);
        assert!(empty.is_empty());

        let mut one = vec![7];
        shuffle(&mut one);
        assert_eq!(one, vec![7]);
    }

    #[test]
    fn every_position_is_reachable() {
        // Over many runs the first element should land in every slot
        let mut seen = [false; 5];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let mut items = [0, 1, 2, 3, 4];
            fisher_yates(&mut items, &mut rng);
            let pos = items.iter().position(|&x| x == 0).unwrap();
            seen[pos] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
