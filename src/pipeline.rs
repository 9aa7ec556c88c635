use log::info;

use crate::checker::unannotated_files_on_disk;
use crate::cleaner::{clean_dataset, CleanReport};
use crate::config::CleanOptions;
use crate::error::Result;
use crate::explorer::DatasetSummary;
use crate::io::{load_coco, save_coco};
use crate::utils::log_findings;

/// Load, optionally explore, check, clean and save a COCO dataset
pub fn run_clean_pipeline(options: &CleanOptions) -> Result<CleanReport> {
    let dataset = load_coco(&options.json_path)?;
    info!(
        "Loaded {}: {} images, {} annotations, {} categories",
        options.json_path.display(),
        dataset.images.len(),
        dataset.annotations.len(),
        dataset.categories.len()
    );

    if options.explore {
        DatasetSummary::collect(&dataset, options.images_dir.as_deref())?.log();
    }

    // Record/folder drift is reported by the cleaner, which acts on it
    if let Some(dir) = &options.images_dir {
        log_findings(
            "Image files on disk without annotations",
            &unannotated_files_on_disk(dir, &dataset)?,
        );
    }

    let (cleaned, report) = clean_dataset(dataset, options)?;
    report.print_summary();

    if options.dry_run {
        info!(
            "Dry run: not writing {} ({} images, {} annotations)",
            options.output_path.display(),
            cleaned.images.len(),
            cleaned.annotations.len()
        );
    } else {
        save_coco(&cleaned, &options.output_path)?;
        info!(
            "Cleaned dataset: {} images, {} annotations",
            cleaned.images.len(),
            cleaned.annotations.len()
        );
    }

    Ok(report)
}
