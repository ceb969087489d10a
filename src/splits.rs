//! Deterministic dataset splitting and patch-index expansion.

use crate::types::{DatasetResult, SlidesDatasetError, SplitRatios};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Seed for the split permutation. Every worker process in a distributed run
/// must derive identical partitions from the same manifest, so this is a
/// fixed constant rather than a configuration knob.
pub const SPLIT_SEED: u64 = 42;

/// Slide-index partitions before patch expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub val: Vec<usize>,
    pub test: Vec<usize>,
}

/// Partition `0..total` into train/val/test using a Fisher-Yates shuffle
/// seeded with [`SPLIT_SEED`].
///
/// Train and val counts floor their fractions; test takes the remainder, so
/// the partitions always cover every index exactly once. Ratios that request
/// more than `total` indices are rejected.
pub fn split_indices(total: usize, ratios: SplitRatios) -> DatasetResult<SplitIndices> {
    let train_count = (ratios.train * total as f64) as usize;
    let val_count = (ratios.val * total as f64) as usize;
    total.checked_sub(train_count + val_count).ok_or_else(|| {
        SlidesDatasetError::Other(format!(
            "split ratios ({}, {}, {}) request more than {total} slides",
            ratios.train, ratios.val, ratios.test
        ))
    })?;

    let mut order: Vec<usize> = (0..total).collect();
    let mut rng = StdRng::seed_from_u64(SPLIT_SEED);
    order.shuffle(&mut rng);

    let val_end = train_count + val_count;
    Ok(SplitIndices {
        train: order[..train_count].to_vec(),
        val: order[train_count..val_end].to_vec(),
        test: order[val_end..].to_vec(),
    })
}

/// Fan a slide-index list out to its per-slide patches: slide index `i`
/// becomes `i*P + j` for every patch offset `j` in `0..P`.
///
/// Offset-major ordering: all slides at offset 0, then all at offset 1, and
/// so on.
pub fn expand_indices(indices: &[usize], patch_per_slide: usize) -> Vec<usize> {
    let mut expanded = Vec::with_capacity(indices.len() * patch_per_slide);
    for j in 0..patch_per_slide {
        for &i in indices {
            expanded.push(i * patch_per_slide + j);
        }
    }
    expanded
}
