//! Entity pairs compared between a scalee and a scaler

use rand::Rng;

/// Unordered index pairs over `n` common entities
///
/// Every pair when `n <= fully_compare_max`, otherwise `sample_max` pairs
/// drawn uniformly with replacement.
pub fn entity_pairs<R: Rng>(n: usize, fully_compare_max: usize, sample_max: usize, rng: &mut R) -> Vec<(usize, usize)> {
    if n < 2 {
        return Vec::new();
    }
    if n <= fully_compare_max {
        return (0..n).flat_map(|i| (i + 1..n).map(move |j| (i, j))).collect();
    }
    (0..sample_max)
        .map(|_| {
            let i = rng.gen_range(0..n);
            let mut j = rng.gen_range(0..n - 1);
            if j >= i {
                j += 1;
            }
            (i.min(j), i.max(j))
        })
        .collect()
}
