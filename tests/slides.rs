use image::{Rgb, RgbImage};
use slides_datamodule::{SlidesDataset, SlidesDatasetError};
use std::fs;
use std::path::{Path, PathBuf};

/// Write a horizontal-gradient slide so different crop windows hold
/// different pixel values.
fn write_gradient_slide(dir: &Path, name: &str, w: u32, h: u32) {
    let mut img = RgbImage::new(w, h);
    for (x, _y, pixel) in img.enumerate_pixels_mut() {
        *pixel = Rgb([(x * 255 / w.max(1)) as u8, 0, 0]);
    }
    img.save(dir.join(name)).unwrap();
}

fn write_manifest(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("slides.json");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn rejects_label_outside_binary_space() {
    let tmp = tempfile::tempdir().unwrap();
    let manifest = write_manifest(tmp.path(), r#"[{"image": "a.png", "label": 5}]"#);
    let err = SlidesDataset::from_manifest(&manifest, 8, 4, false).unwrap_err();
    assert!(matches!(err, SlidesDatasetError::Validation { .. }));
}

#[test]
fn rejects_empty_image_path() {
    let tmp = tempfile::tempdir().unwrap();
    let manifest = write_manifest(tmp.path(), r#"[{"image": "  ", "label": 0}]"#);
    let err = SlidesDataset::from_manifest(&manifest, 8, 4, false).unwrap_err();
    assert!(matches!(err, SlidesDatasetError::Validation { .. }));
}

#[test]
fn missing_slide_image_surfaces_at_patch_access() {
    let tmp = tempfile::tempdir().unwrap();
    let manifest = write_manifest(tmp.path(), r#"[{"image": "absent.png", "label": 0}]"#);
    // Manifest parses; the missing file only matters once a patch is read.
    let ds = SlidesDataset::from_manifest(&manifest, 8, 4, false).unwrap();
    assert_eq!(ds.len(), 1);
    let err = ds.patch(0, 0).unwrap_err();
    assert!(matches!(err, SlidesDatasetError::MissingImageFile { .. }));
}

#[test]
fn patch_access_is_deterministic_per_offset() {
    let tmp = tempfile::tempdir().unwrap();
    write_gradient_slide(tmp.path(), "s0.png", 16, 8);
    let manifest = write_manifest(tmp.path(), r#"[{"image": "s0.png", "label": 1}]"#);
    let ds = SlidesDataset::from_manifest(&manifest, 8, 4, false).unwrap();

    let a = ds.patch(0, 0).unwrap();
    let b = ds.patch(0, 0).unwrap();
    assert_eq!(a.image_chw, b.image_chw);
    assert_eq!(a.label, 1);
    assert_eq!(a.image_chw.len(), 3 * 4 * 4);

    // Offset 1 lands on the right half of the gradient.
    let c = ds.patch(0, 1).unwrap();
    assert_ne!(a.image_chw, c.image_chw);
}

#[test]
fn offsets_wrap_around_the_crop_grid() {
    let tmp = tempfile::tempdir().unwrap();
    write_gradient_slide(tmp.path(), "s0.png", 16, 8);
    let manifest = write_manifest(tmp.path(), r#"[{"image": "s0.png", "label": 0}]"#);
    let ds = SlidesDataset::from_manifest(&manifest, 8, 4, false).unwrap();

    // 16x8 with crop 8 gives a 2x1 grid; offset 2 wraps back to cell 0.
    let a = ds.patch(0, 0).unwrap();
    let c = ds.patch(0, 2).unwrap();
    assert_eq!(a.image_chw, c.image_chw);
}

#[test]
fn crop_clamps_to_small_slides() {
    let tmp = tempfile::tempdir().unwrap();
    write_gradient_slide(tmp.path(), "tiny.png", 4, 4);
    let manifest = write_manifest(tmp.path(), r#"[{"image": "tiny.png", "label": 0}]"#);
    // crop_size larger than the slide: the window clamps to the image.
    let ds = SlidesDataset::from_manifest(&manifest, 300, 4, false).unwrap();
    let sample = ds.patch(0, 0).unwrap();
    assert_eq!(sample.image_chw.len(), 3 * 4 * 4);
}

#[test]
fn dino_mode_yields_well_formed_patches() {
    let tmp = tempfile::tempdir().unwrap();
    write_gradient_slide(tmp.path(), "s0.png", 32, 32);
    let manifest = write_manifest(tmp.path(), r#"[{"image": "s0.png", "label": 1}]"#);
    let ds = SlidesDataset::from_manifest(&manifest, 8, 4, true).unwrap();
    let sample = ds.patch(0, 0).unwrap();
    assert_eq!(sample.image_chw.len(), 3 * 4 * 4);
    assert!(sample.image_chw.iter().all(|v| (0.0..=1.0).contains(v)));
}
