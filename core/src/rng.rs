use rand::rngs::StdRng;
use rand::SeedableRng;

/// SplitMix64 finalizer used to spread structured seeds over the whole state space.
pub fn mix_seed(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Seed for the autoencoder owned by `(slot, action)` under `base`.
pub fn autoencoder_seed(base: u64, slot: u64, action: usize) -> u64 {
    mix_seed(mix_seed(base ^ mix_seed(slot)) ^ action as u64)
}

pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_slots_get_distinct_seeds() {
        let mut seen = std::collections::HashSet::new();
        for slot in 0..64 {
            for action in 0..6 {
                assert!(seen.insert(autoencoder_seed(1, slot, action)));
            }
        }
        assert_eq!(autoencoder_seed(7, 3, 2), autoencoder_seed(7, 3, 2));
    }
}
