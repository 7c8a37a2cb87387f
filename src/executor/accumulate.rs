//! Chunked parallel summation on a [`ThreadPool`].

use super::thread_pool::ThreadPool;
use crate::error::Result;
use std::sync::Arc;

/// Inputs shorter than this are summed on the calling thread.
pub const MIN_PARALLEL_LEN: usize = 1000;

/// Sums `nums` by splitting it into one contiguous chunk per worker.
///
/// The first chunk absorbs the remainder of an uneven split. A panicking
/// chunk (e.g. overflow in debug builds) surfaces as
/// [`Error::TaskFailed`](crate::Error::TaskFailed).
pub fn accumulate(pool: &ThreadPool, nums: &[i64]) -> Result<i64> {
    if nums.len() < MIN_PARALLEL_LEN {
        return Ok(nums.iter().sum());
    }

    let data: Arc<[i64]> = Arc::from(nums);
    let handles: Vec<_> = chunk_bounds(data.len(), pool.num_threads())
        .into_iter()
        .map(|(start, end)| {
            let data = data.clone();
            pool.submit(move || data[start..end].iter().sum::<i64>())
        })
        .collect();

    let mut total = 0i64;
    for handle in handles {
        total += handle.get()?;
    }
    Ok(total)
}

fn chunk_bounds(len: usize, parts: usize) -> Vec<(usize, usize)> {
    let parts = parts.clamp(1, len.max(1));
    let part_len = len / parts;
    let remainder = len - part_len * parts;

    let mut bounds = Vec::with_capacity(parts);
    let mut start = 0;
    for i in 0..parts {
        let end = start + part_len + if i == 0 { remainder } else { 0 };
        bounds.push((start, end));
        start = end;
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_bounds_cover_input() {
        let bounds = chunk_bounds(1003, 4);
        assert_eq!(bounds.len(), 4);
        assert_eq!(bounds[0], (0, 253));
        assert_eq!(bounds.last().unwrap().1, 1003);
        for pair in bounds.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
    }

    #[test]
    fn test_more_parts_than_items() {
        assert_eq!(chunk_bounds(3, 8), vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_small_input_is_sequential() {
        let pool = ThreadPool::new(2).unwrap();
        assert_eq!(accumulate(&pool, &[1, 2, 3]).unwrap(), 6);
        assert_eq!(accumulate(&pool, &[]).unwrap(), 0);
        assert_eq!(pool.metrics().submitted, 0);
    }

    #[test]
    fn test_parallel_sum() {
        let pool = ThreadPool::new(4).unwrap();
        let nums: Vec<i64> = (1..=10_001).collect();
        assert_eq!(accumulate(&pool, &nums).unwrap(), 10_001 * 10_002 / 2);
        assert_eq!(pool.metrics().submitted, 4);
    }
}
