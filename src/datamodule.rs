//! Lifecycle glue: split-once setup and loader construction.

use crate::batch::{BatchIter, PartitionView};
use crate::slides::SlidesDataset;
use crate::splits::split_indices;
use crate::types::{DatasetResult, SlidesDatasetError, SplitRatios, Stage, NUM_CLASSES};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Construction-time configuration. Every field is carried verbatim to the
/// collaborator that consumes it; values are validated only by downstream
/// failure.
#[derive(Debug, Clone)]
pub struct SlidesDataModuleConfig {
    pub slides_file: PathBuf,
    /// Patches extracted per slide; each partition index fans out this many
    /// times.
    pub patch_per_slide: usize,
    pub crop_size: u32,
    pub patch_size: u32,
    pub split_ratios: SplitRatios,
    pub batch_size: usize,
    pub num_workers: usize,
    pub pin_memory: bool,
    /// Randomized crop sampling for DINO-style pretraining input.
    pub dino: bool,
}

impl Default for SlidesDataModuleConfig {
    fn default() -> Self {
        Self {
            slides_file: PathBuf::from("data/slides.json"),
            patch_per_slide: 1,
            crop_size: 300,
            patch_size: 224,
            split_ratios: SplitRatios::default(),
            batch_size: 64,
            num_workers: 0,
            pin_memory: false,
            dino: false,
        }
    }
}

/// Lifecycle contract the training loop drives.
///
/// `setup` may be called once per phase (fit, validate, test) and from every
/// worker process in a distributed run, so implementations must be idempotent
/// and derive identical partitions from identical configuration.
pub trait DataModule {
    /// One-time preparation (downloads, cache staging). Must not assign
    /// partition state.
    fn prepare(&mut self) -> DatasetResult<()>;
    /// Per-process setup: load the dataset and populate partitions.
    fn setup(&mut self, stage: Option<Stage>) -> DatasetResult<()>;
    fn train_loader(&self) -> DatasetResult<BatchIter>;
    fn val_loader(&self) -> DatasetResult<BatchIter>;
    fn test_loader(&self) -> DatasetResult<BatchIter>;
    fn teardown(&mut self, stage: Option<Stage>);
    /// Extra state to persist with a checkpoint.
    fn state_dict(&self) -> HashMap<String, Value>;
    /// Restore extra checkpoint state.
    fn load_state_dict(&mut self, state: HashMap<String, Value>);
    fn num_classes(&self) -> usize;
}

/// Dataset partitioner and loader factory for slide-derived patches.
pub struct SlidesDataModule {
    cfg: SlidesDataModuleConfig,
    train: Option<PartitionView>,
    val: Option<PartitionView>,
    test: Option<PartitionView>,
}

impl SlidesDataModule {
    pub fn new(cfg: SlidesDataModuleConfig) -> Self {
        Self {
            cfg,
            train: None,
            val: None,
            test: None,
        }
    }

    pub fn config(&self) -> &SlidesDataModuleConfig {
        &self.cfg
    }

    /// Partition views in (train, val, test) order; populated after `setup`.
    pub fn partitions(
        &self,
    ) -> (
        Option<&PartitionView>,
        Option<&PartitionView>,
        Option<&PartitionView>,
    ) {
        (self.train.as_ref(), self.val.as_ref(), self.test.as_ref())
    }

    fn loader(
        &self,
        view: &Option<PartitionView>,
        name: &str,
        shuffle: bool,
    ) -> DatasetResult<BatchIter> {
        let view = view.as_ref().ok_or_else(|| {
            SlidesDatasetError::Other(format!("{name} loader requested before setup"))
        })?;
        Ok(BatchIter::new(
            view.clone(),
            self.cfg.batch_size,
            self.cfg.num_workers,
            self.cfg.pin_memory,
            shuffle,
        ))
    }
}

impl DataModule for SlidesDataModule {
    fn prepare(&mut self) -> DatasetResult<()> {
        // Slides are read in place; nothing to stage.
        Ok(())
    }

    fn setup(&mut self, _stage: Option<Stage>) -> DatasetResult<()> {
        // The trainer calls setup for both fit and test; only the first call
        // splits, so repeated invocations never re-randomize.
        if self.train.is_some() && self.val.is_some() && self.test.is_some() {
            return Ok(());
        }

        let dataset = Arc::new(SlidesDataset::from_manifest(
            &self.cfg.slides_file,
            self.cfg.crop_size,
            self.cfg.patch_size,
            self.cfg.dino,
        )?);
        let total = dataset.len();
        let split = split_indices(total, self.cfg.split_ratios)?;
        println!(
            "[datamodule] split {total} slides into train={} val={} test={} (patch_per_slide={})",
            split.train.len(),
            split.val.len(),
            split.test.len(),
            self.cfg.patch_per_slide
        );

        let p = self.cfg.patch_per_slide;
        self.train = Some(PartitionView::new(dataset.clone(), &split.train, p));
        self.val = Some(PartitionView::new(dataset.clone(), &split.val, p));
        self.test = Some(PartitionView::new(dataset, &split.test, p));
        Ok(())
    }

    fn train_loader(&self) -> DatasetResult<BatchIter> {
        self.loader(&self.train, "train", true)
    }

    fn val_loader(&self) -> DatasetResult<BatchIter> {
        self.loader(&self.val, "val", false)
    }

    fn test_loader(&self) -> DatasetResult<BatchIter> {
        self.loader(&self.test, "test", false)
    }

    fn teardown(&mut self, _stage: Option<Stage>) {}

    fn state_dict(&self) -> HashMap<String, Value> {
        // The configuration rides with the checkpoint already; nothing extra.
        HashMap::new()
    }

    fn load_state_dict(&mut self, _state: HashMap<String, Value>) {}

    fn num_classes(&self) -> usize {
        NUM_CLASSES
    }
}
