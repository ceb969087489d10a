use anyhow::Context;
use clap::Parser;
use slides_datamodule::{
    DataModule, SlidesDataModule, SlidesDataModuleConfig, SplitRatios,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "inspect",
    about = "Split a slide manifest and report partition sizes"
)]
struct Args {
    /// Slide manifest (JSON array of {image, label} records).
    #[arg(long, default_value = "data/slides.json")]
    slides_file: PathBuf,
    /// Patches extracted per slide.
    #[arg(long, default_value_t = 1)]
    patch_per_slide: usize,
    #[arg(long, default_value_t = 300)]
    crop_size: u32,
    #[arg(long, default_value_t = 224)]
    patch_size: u32,
    #[arg(long, default_value_t = 0.5)]
    train_ratio: f64,
    #[arg(long, default_value_t = 0.3)]
    val_ratio: f64,
    #[arg(long, default_value_t = 0.2)]
    test_ratio: f64,
    #[arg(long, default_value_t = 64)]
    batch_size: usize,
    #[arg(long, default_value_t = 0)]
    num_workers: usize,
    #[arg(long)]
    pin_memory: bool,
    /// Use randomized crop sampling (DINO-style pretraining input).
    #[arg(long)]
    dino: bool,
    /// Pull the first training batch and print its shape.
    #[arg(long)]
    first_batch: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = SlidesDataModuleConfig {
        slides_file: args.slides_file.clone(),
        patch_per_slide: args.patch_per_slide,
        crop_size: args.crop_size,
        patch_size: args.patch_size,
        split_ratios: SplitRatios {
            train: args.train_ratio,
            val: args.val_ratio,
            test: args.test_ratio,
        },
        batch_size: args.batch_size,
        num_workers: args.num_workers,
        pin_memory: args.pin_memory,
        dino: args.dino,
    };

    let mut dm = SlidesDataModule::new(cfg);
    dm.prepare()?;
    dm.setup(None).with_context(|| {
        format!(
            "failed to set up datamodule from {}",
            args.slides_file.display()
        )
    })?;

    let train = dm.train_loader()?;
    let val = dm.val_loader()?;
    let test = dm.test_loader()?;
    println!(
        "train={} val={} test={} patches ({} train batches of {})",
        train.len(),
        val.len(),
        test.len(),
        train.num_batches(),
        args.batch_size
    );

    if args.first_batch {
        type B = burn_ndarray::NdArray<f32>;
        let device = <B as burn::tensor::backend::Backend>::Device::default();
        let mut train = train;
        if let Some(batch) = train.next_batch::<B>(&device)? {
            println!(
                "first train batch: images {:?} labels {:?}",
                batch.images.dims(),
                batch.labels.dims()
            );
        }
    }
    Ok(())
}
