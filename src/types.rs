//! Core types and error definitions for the slides datamodule.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, SlidesDatasetError>;

/// Size of the label space (benign/malignant slide classification).
pub const NUM_CLASSES: usize = 2;

#[derive(Debug, Error)]
pub enum SlidesDatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json parse error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("slide record invalid in {path}: {msg}")]
    Validation { path: PathBuf, msg: String },
    #[error("slide image missing for manifest {path}: {image}")]
    MissingImageFile { path: PathBuf, image: PathBuf },
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{0}")]
    Other(String),
}

/// One manifest entry: a slide image with its binary label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideRecord {
    /// Image path relative to the manifest file.
    pub image: String,
    pub label: u8,
}

/// One extracted patch: CHW f32 pixels in [0, 1] plus the slide's label.
#[derive(Debug, Clone)]
pub struct PatchSample {
    pub slide_id: usize,
    pub image_chw: Vec<f32>,
    pub patch_size: u32,
    pub label: u8,
}

/// Train/val/test fractions, ordered. Expected to sum to ~1.0; not enforced
/// here — malformed ratios surface as split-count errors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SplitRatios {
    pub train: f64,
    pub val: f64,
    pub test: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.5,
            val: 0.3,
            test: 0.2,
        }
    }
}

/// Trainer phase handed to the lifecycle hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fit,
    Validate,
    Test,
}
