//! Slide manifest parsing and per-patch access.

use crate::types::{DatasetResult, PatchSample, SlideRecord, SlidesDatasetError, NUM_CLASSES};
use image::imageops::FilterType;
use image::RgbImage;
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};

fn validate_record(rec: &SlideRecord, path: &Path, idx: usize) -> DatasetResult<()> {
    if rec.image.trim().is_empty() {
        return Err(SlidesDatasetError::Validation {
            path: path.to_path_buf(),
            msg: format!("record {idx} has an empty image path"),
        });
    }
    if usize::from(rec.label) >= NUM_CLASSES {
        return Err(SlidesDatasetError::Validation {
            path: path.to_path_buf(),
            msg: format!(
                "record {idx} label {} outside the binary label space",
                rec.label
            ),
        });
    }
    Ok(())
}

/// Read-only slide collection backing all three partitions.
///
/// `len()` counts slides; a partition view fans each slide out to its
/// per-slide patch variants through [`SlidesDataset::patch`].
#[derive(Debug)]
pub struct SlidesDataset {
    manifest: PathBuf,
    root: PathBuf,
    records: Vec<SlideRecord>,
    crop_size: u32,
    patch_size: u32,
    dino: bool,
}

impl SlidesDataset {
    /// Parse the manifest (a JSON array of slide records) and validate every
    /// record. Slide images are opened lazily at patch-access time.
    pub fn from_manifest(
        slides_file: &Path,
        crop_size: u32,
        patch_size: u32,
        dino: bool,
    ) -> DatasetResult<Self> {
        let raw = fs::read(slides_file).map_err(|e| SlidesDatasetError::Io {
            path: slides_file.to_path_buf(),
            source: e,
        })?;
        let records: Vec<SlideRecord> =
            serde_json::from_slice(&raw).map_err(|e| SlidesDatasetError::Json {
                path: slides_file.to_path_buf(),
                source: e,
            })?;
        for (i, rec) in records.iter().enumerate() {
            validate_record(rec, slides_file, i)?;
        }
        let root = slides_file
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        Ok(Self {
            manifest: slides_file.to_path_buf(),
            root,
            records,
            crop_size,
            patch_size,
            dino,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SlideRecord] {
        &self.records
    }

    pub fn patch_size(&self) -> u32 {
        self.patch_size
    }

    /// Extract patch `offset` of slide `slide`.
    ///
    /// The crop window walks a fixed grid over the slide, so a given
    /// (slide, offset) pair always maps to the same pixels. With `dino` the
    /// window position is sampled randomly instead.
    pub fn patch(&self, slide: usize, offset: usize) -> DatasetResult<PatchSample> {
        let rec = self.records.get(slide).ok_or_else(|| {
            SlidesDatasetError::Other(format!(
                "slide index {slide} out of range ({} slides)",
                self.records.len()
            ))
        })?;
        let img_path = self.root.join(&rec.image);
        if !img_path.exists() {
            return Err(SlidesDatasetError::MissingImageFile {
                path: self.manifest.clone(),
                image: img_path,
            });
        }
        let img = image::open(&img_path)
            .map_err(|e| SlidesDatasetError::Image {
                path: img_path.clone(),
                source: e,
            })?
            .to_rgb8();
        let (w, h) = img.dimensions();
        let crop = self.crop_size.min(w).min(h).max(1);
        let (x, y) = if self.dino {
            let mut rng = rand::rng();
            (
                rng.random_range(0..=w - crop),
                rng.random_range(0..=h - crop),
            )
        } else {
            grid_position(w, h, crop, offset)
        };
        let window = image::imageops::crop_imm(&img, x, y, crop, crop).to_image();
        let patch = image::imageops::resize(
            &window,
            self.patch_size,
            self.patch_size,
            FilterType::Triangle,
        );
        Ok(PatchSample {
            slide_id: slide,
            image_chw: chw_from_rgb(&patch),
            patch_size: self.patch_size,
            label: rec.label,
        })
    }
}

/// Deterministic crop origin for a patch offset: walk the slide in crop-sized
/// steps, row-major, wrapping when the offset exceeds the grid.
fn grid_position(w: u32, h: u32, crop: u32, offset: usize) -> (u32, u32) {
    let cols = (w / crop).max(1);
    let rows = (h / crop).max(1);
    let cell = offset as u32 % (cols * rows);
    let x = (cell % cols) * crop;
    let y = (cell / cols) * crop;
    (x.min(w - crop), y.min(h - crop))
}

fn chw_from_rgb(img: &RgbImage) -> Vec<f32> {
    let (w, h) = img.dimensions();
    let plane = (w * h) as usize;
    let mut chw = vec![0.0f32; plane * 3];
    for (x, y, pixel) in img.enumerate_pixels() {
        let base = (y * w + x) as usize;
        chw[base] = pixel[0] as f32 / 255.0;
        chw[plane + base] = pixel[1] as f32 / 255.0;
        chw[2 * plane + base] = pixel[2] as f32 / 255.0;
    }
    chw
}
