//! Slide dataset splitting and Burn-compatible batch loading.
//!
//! This crate provides:
//! - Slide manifest parsing and per-patch access
//! - Deterministic train/val/test splitting with patch-index expansion
//! - Burn-compatible batch iteration per partition
//! - The lifecycle hooks a training loop drives (setup, loaders, checkpoint)

pub mod batch;
pub mod datamodule;
pub mod slides;
pub mod splits;
pub mod types;

pub use batch::{BatchIter, PartitionView, SlideBatch};
pub use datamodule::{DataModule, SlidesDataModule, SlidesDataModuleConfig};
pub use slides::SlidesDataset;
pub use splits::{expand_indices, split_indices, SplitIndices, SPLIT_SEED};
pub use types::*;
