//! Proptest strategies for chunking properties.

use proptest::prelude::*;

/// `(record_count, page_size, chunk_size)` with small independent sizes
pub fn sizing_strategy() -> impl Strategy<Value = (usize, usize, usize)> {
    (0usize..400, 1usize..60, 1usize..80)
}

pub fn shuffled_ids_strategy() -> impl Strategy<Value = Vec<i64>> {
    (0usize..200).prop_flat_map(|count| {
        Just((1..=count as i64).collect::<Vec<i64>>()).prop_shuffle()
    })
}
