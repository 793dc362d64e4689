//! Stable per-task seeds
//!
//! Random choices (coordinate order, pair sampling) are seeded from the run
//! seed mixed with a hash of the task's keys, so they do not depend on which
//! worker runs the task or in which order.

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a hash of the parts, separated by a 0xff byte
pub fn fnv1a(parts: &[&str]) -> u64 {
    let mut hash = FNV_OFFSET;
    for part in parts {
        for byte in part.bytes().chain(std::iter::once(0xff)) {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Seed of a task identified by `parts`
///
/// # Examples
///
/// ```
/// use concord_domain::seed::task_seed;
///
/// assert_eq!(task_seed(7, &["alice", "importance"]), task_seed(7, &["alice", "importance"]));
/// assert_ne!(task_seed(7, &["alice", "importance"]), task_seed(8, &["alice", "importance"]));
/// ```
pub fn task_seed(seed: u64, parts: &[&str]) -> u64 {
    fnv1a(parts) ^ seed.wrapping_mul(FNV_PRIME).rotate_left(17)
}
