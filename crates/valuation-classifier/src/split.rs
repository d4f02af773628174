use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Row indices of a shuffled train/test partition.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Number of test rows for `n` samples: ceil(fraction * n), kept inside
/// 1..n so neither side is empty when n >= 2.
pub fn test_size(n: usize, test_fraction: f64) -> usize {
    if n < 2 {
        return 0;
    }
    let raw = (test_fraction * n as f64).ceil() as usize;
    raw.clamp(1, n - 1)
}

/// Shuffle `0..n` and cut off the test share. Without a seed the
/// permutation comes from OS entropy.
pub fn train_test_split(n: usize, test_fraction: f64, seed: Option<u64>) -> SplitIndices {
    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);

    let n_test = test_size(n, test_fraction);
    let train = indices.split_off(n_test);
    SplitIndices { train, test: indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_rounds_up() {
        assert_eq!(test_size(10, 0.25), 3);
        assert_eq!(test_size(8, 0.25), 2);
        assert_eq!(test_size(2, 0.25), 1);
        assert_eq!(test_size(4, 0.99), 3);
        assert_eq!(test_size(1, 0.25), 0);
    }

    #[test]
    fn test_split_is_a_partition() {
        let split = train_test_split(37, 0.25, Some(11));
        assert_eq!(split.test.len(), 10);
        assert_eq!(split.train.len(), 27);

        let mut all: Vec<usize> = split.train.iter().chain(split.test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..37).collect::<Vec<_>>());
    }

    #[test]
    fn test_seeded_split_is_reproducible() {
        assert_eq!(
            train_test_split(50, 0.25, Some(3)),
            train_test_split(50, 0.25, Some(3))
        );
        assert_ne!(
            train_test_split(50, 0.25, Some(3)),
            train_test_split(50, 0.25, Some(4))
        );
    }
}
