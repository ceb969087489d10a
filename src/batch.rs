//! Partition views and Burn-compatible batch iteration.

use crate::slides::SlidesDataset;
use crate::splits::expand_indices;
use crate::types::{DatasetResult, PatchSample};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use std::sync::Arc;

/// A read-only slice of the dataset: expanded patch indices plus the
/// replication factor needed to map them back to (slide, offset) pairs.
///
/// Views share one dataset instance but never mutate it; the replication
/// factor is fixed at construction.
#[derive(Debug, Clone)]
pub struct PartitionView {
    dataset: Arc<SlidesDataset>,
    indices: Vec<usize>,
    patch_per_slide: usize,
}

impl PartitionView {
    pub fn new(
        dataset: Arc<SlidesDataset>,
        slide_indices: &[usize],
        patch_per_slide: usize,
    ) -> Self {
        let patch_per_slide = patch_per_slide.max(1);
        let indices = expand_indices(slide_indices, patch_per_slide);
        Self {
            dataset,
            indices,
            patch_per_slide,
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Expanded patch indices, in partition order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn patch_size(&self) -> u32 {
        self.dataset.patch_size()
    }

    /// Fetch the sample at position `pos` within this view.
    pub fn get(&self, pos: usize) -> DatasetResult<PatchSample> {
        let expanded = self.indices[pos];
        let slide = expanded / self.patch_per_slide;
        let offset = expanded % self.patch_per_slide;
        self.dataset.patch(slide, offset)
    }
}

/// One collated batch of slide patches.
pub struct SlideBatch<B: burn::tensor::backend::Backend> {
    /// Patch pixels, shape [batch, 3, patch_size, patch_size].
    pub images: burn::tensor::Tensor<B, 4>,
    /// Binary labels as floats, shape [batch].
    pub labels: burn::tensor::Tensor<B, 1>,
    /// Originating slide index per sample, shape [batch].
    pub slide_ids: burn::tensor::Tensor<B, 1>,
}

/// Lazy, finite batch endpoint over one partition.
///
/// Construct a fresh iterator per epoch; non-shuffled iterators replay the
/// partition in identical order every time, shuffled ones draw a new order
/// at construction.
pub struct BatchIter {
    view: PartitionView,
    order: Vec<usize>,
    cursor: usize,
    batch_size: usize,
    num_workers: usize,
    /// Loader hint for backends with pinned staging buffers; the ndarray
    /// backend ignores it.
    pub pin_memory: bool,
}

impl BatchIter {
    pub fn new(
        view: PartitionView,
        batch_size: usize,
        num_workers: usize,
        pin_memory: bool,
        shuffle: bool,
    ) -> Self {
        let mut order: Vec<usize> = (0..view.len()).collect();
        if shuffle {
            // Fresh order every epoch; the split itself is already pinned by
            // SPLIT_SEED, so train shuffling need not be reproducible.
            let mut rng = StdRng::from_rng(&mut rand::rng());
            order.shuffle(&mut rng);
        }
        Self {
            view,
            order,
            cursor: 0,
            batch_size: batch_size.max(1),
            num_workers,
            pin_memory,
        }
    }

    /// Total samples this endpoint will yield.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn num_batches(&self) -> usize {
        self.order.len().div_ceil(self.batch_size)
    }

    fn fetch(&self, positions: &[usize]) -> DatasetResult<Vec<PatchSample>> {
        if self.num_workers > 0 && positions.len() > 1 {
            positions.par_iter().map(|&p| self.view.get(p)).collect()
        } else {
            positions.iter().map(|&p| self.view.get(p)).collect()
        }
    }

    /// Assemble the next batch, or `None` once the partition is exhausted.
    /// The final batch may hold fewer than `batch_size` samples.
    pub fn next_batch<B: burn::tensor::backend::Backend>(
        &mut self,
        device: &B::Device,
    ) -> DatasetResult<Option<SlideBatch<B>>> {
        if self.cursor >= self.order.len() {
            return Ok(None);
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let positions = self.order[self.cursor..end].to_vec();
        self.cursor = end;

        let samples = self.fetch(&positions)?;
        let batch_len = samples.len();
        let side = self.view.patch_size() as usize;

        let mut images = Vec::with_capacity(batch_len * 3 * side * side);
        let mut labels = Vec::with_capacity(batch_len);
        let mut slide_ids = Vec::with_capacity(batch_len);
        for sample in &samples {
            images.extend_from_slice(&sample.image_chw);
            labels.push(sample.label as f32);
            slide_ids.push(sample.slide_id as f32);
        }

        let images = burn::tensor::Tensor::<B, 1>::from_floats(images.as_slice(), device)
            .reshape([batch_len, 3, side, side]);
        let labels = burn::tensor::Tensor::<B, 1>::from_floats(labels.as_slice(), device)
            .reshape([batch_len]);
        let slide_ids = burn::tensor::Tensor::<B, 1>::from_floats(slide_ids.as_slice(), device)
            .reshape([batch_len]);

        Ok(Some(SlideBatch {
            images,
            labels,
            slide_ids,
        }))
    }
}
