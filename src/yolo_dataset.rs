use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::coco::{Annotation, Image};
use crate::config::ExportArgs;
use crate::conversion::process_images_in_parallel;
use crate::error::{CleanError, Result};
use crate::io::{create_dataset_yaml, load_coco, setup_output_directories};
use crate::types::{OutputDirs, ProcessingStats, SplitData};
use crate::utils::create_progress_bar;

/// Split the images into training, validation, and testing sets.
///
/// The shuffle is seeded, so the same input order and seed always give the same
/// split. Test and validation take `ceil(n * size)` images each, test first.
pub fn split_images(images: &[Image], val_size: f32, test_size: f32, seed: u64) -> SplitData<'_> {
    let mut shuffled: Vec<&Image> = images.iter().collect();
    let mut rng = StdRng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);

    let total = shuffled.len();
    let test_count = ((total as f32 * test_size).ceil() as usize).min(total);
    let val_count = ((total as f32 * val_size).ceil() as usize).min(total - test_count);

    let test_images = shuffled.drain(0..test_count).collect();
    let val_images = shuffled.drain(0..val_count).collect();

    SplitData {
        train_images: shuffled,
        val_images,
        test_images,
    }
}

/// Group annotations by the image they reference
pub fn index_annotations(annotations: &[Annotation]) -> HashMap<i64, Vec<&Annotation>> {
    let mut by_image: HashMap<i64, Vec<&Annotation>> = HashMap::new();
    for ann in annotations {
        by_image.entry(ann.image_id).or_default().push(ann);
    }
    by_image
}

/// Export every split, one split at a time, images within a split in parallel
pub fn process_all_splits(
    split_data: &SplitData,
    output_dirs: &OutputDirs,
    annotations_by_image: &HashMap<i64, Vec<&Annotation>>,
    source_dir: &Path,
) -> ProcessingStats {
    let mut splits = vec![
        (
            "Train",
            &split_data.train_images,
            &output_dirs.train_labels_dir,
            &output_dirs.train_images_dir,
        ),
        (
            "Val",
            &split_data.val_images,
            &output_dirs.val_labels_dir,
            &output_dirs.val_images_dir,
        ),
    ];
    if let (Some(test_labels_dir), Some(test_images_dir)) =
        (&output_dirs.test_labels_dir, &output_dirs.test_images_dir)
    {
        splits.push((
            "Test",
            &split_data.test_images,
            test_labels_dir,
            test_images_dir,
        ));
    }

    let mut stats = ProcessingStats::new();
    for (label, images, labels_dir, images_dir) in splits {
        info!("{}: {} images", label, images.len());
        if images.is_empty() {
            continue;
        }
        let pb = create_progress_bar(images.len() as u64, label);
        let split_stats = process_images_in_parallel(
            images,
            annotations_by_image,
            source_dir,
            labels_dir,
            images_dir,
            &pb,
        );
        pb.finish_with_message(format!("{} processing complete", label));
        stats.merge(&split_stats);
    }
    stats
}

/// Fail when `images_dir` is, or sits under, a directory the export recreates.
///
/// `output_dir/images` and `output_dir/labels` are wiped before writing, which
/// would delete the source images along with them.
pub fn check_output_overlap(images_dir: &Path, output_dir: &Path) -> Result<()> {
    let Ok(output_dir) = fs::canonicalize(output_dir) else {
        return Ok(());
    };
    let source = fs::canonicalize(images_dir)?;
    for sub in ["images", "labels"] {
        let target = output_dir.join(sub);
        let target = fs::canonicalize(&target).unwrap_or(target);
        if source.starts_with(&target) {
            return Err(CleanError::Config(format!(
                "images_dir {} lies inside {}, which the export deletes and recreates",
                images_dir.display(),
                target.display()
            )));
        }
    }
    Ok(())
}

/// Main YOLO export pipeline
pub fn process_dataset(args: &ExportArgs) -> Result<ProcessingStats> {
    if args.val_size + args.test_size > 1.0 {
        return Err(CleanError::Config(format!(
            "val_size ({}) + test_size ({}) must not exceed 1.0",
            args.val_size, args.test_size
        )));
    }
    if !args.images_dir.is_dir() {
        return Err(CleanError::not_found(&args.images_dir));
    }
    check_output_overlap(&args.images_dir, &args.output_dir)?;

    let dataset = load_coco(&args.json)?;
    info!(
        "Read {} images and {} annotations.",
        dataset.images.len(),
        dataset.annotations.len()
    );

    let split_data = split_images(&dataset.images, args.val_size, args.test_size, args.seed);
    let annotations_by_image = index_annotations(&dataset.annotations);

    let with_test = args.test_size > 0.0;
    let output_dirs = setup_output_directories(&args.output_dir, with_test)?;
    let stats = process_all_splits(
        &split_data,
        &output_dirs,
        &annotations_by_image,
        &args.images_dir,
    );

    info!("Creating dataset.yaml file...");
    create_dataset_yaml(&args.output_dir, with_test, &dataset.categories)?;
    stats.print_summary();

    Ok(stats)
}
