//! Batch distribution for parallel simulation.
//!
//! Boundaries depend only on the amount of work, never on the thread count,
//! which is what keeps seeded runs reproducible. Trial batches and optimizer
//! progress batches both use them.

/// Split `total` items into up to `num_batches` ranges `[start, end)`.
/// Batches are as equal in size as possible; later batches may be smaller.
///
/// # Example
/// ```
/// # use warroom::parallel::batch_ranges;
/// let ranges = batch_ranges(100, 4);
/// assert_eq!(ranges, vec![(0, 25), (25, 50), (50, 75), (75, 100)]);
/// ```
pub fn batch_ranges(total: usize, num_batches: usize) -> Vec<(usize, usize)> {
    if total == 0 || num_batches == 0 {
        return Vec::new();
    }
    let num_batches = num_batches.min(total);
    let base = total / num_batches;
    let remainder = total % num_batches;
    let mut ranges = Vec::with_capacity(num_batches);
    let mut start = 0;
    for i in 0..num_batches {
        let size = base + usize::from(i < remainder);
        let end = start + size;
        ranges.push((start, end));
        start = end;
    }
    ranges
}

/// Number of batches needed so that no batch exceeds `batch_size` items.
pub fn batch_count(total: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return usize::from(total > 0);
    }
    total.div_ceil(batch_size)
}
