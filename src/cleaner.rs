//! Applies the consistency checks to produce a cleaned dataset
//!
//! Steps run in a fixed order, each on the output of the previous one:
//! drop images whose file is missing (disk-backed runs only), drop degenerate
//! boxes, drop annotations whose image is gone, then optionally prune images left
//! without annotations and delete their files.

use log::{error, info};
use std::collections::HashSet;
use std::path::Path;

use crate::checker::filesystem_drift;
use crate::coco::{Annotation, CocoDataset, Image};
use crate::config::CleanOptions;
use crate::error::Result;
use crate::io::{remove_image_file, DeleteOutcome};
use crate::utils::log_findings;

/// Everything a cleaning run removed, by image/annotation id or file name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub dry_run: bool,
    pub images_missing_file: Vec<i64>,
    pub degenerate_annotations: Vec<i64>,
    pub orphan_annotations: Vec<i64>,
    pub pruned_images: Vec<i64>,
    /// Files removed from disk, or that would be removed in a dry run
    pub deleted_files: Vec<String>,
    pub already_absent_files: Vec<String>,
    pub failed_deletions: Vec<String>,
}

impl CleanReport {
    /// True when the run found nothing to remove
    pub fn is_clean(&self) -> bool {
        self.images_missing_file.is_empty()
            && self.degenerate_annotations.is_empty()
            && self.orphan_annotations.is_empty()
            && self.pruned_images.is_empty()
    }

    pub fn removed_annotations(&self) -> usize {
        self.degenerate_annotations.len() + self.orphan_annotations.len()
    }

    pub fn removed_images(&self) -> usize {
        self.images_missing_file.len() + self.pruned_images.len()
    }

    pub fn print_summary(&self) {
        info!("=== Cleaning Summary ===");
        log_findings("Images dropped (file missing from folder)", &self.images_missing_file);
        log_findings("Annotations dropped (degenerate bbox)", &self.degenerate_annotations);
        log_findings("Annotations dropped (image not found)", &self.orphan_annotations);
        log_findings("Images dropped (no annotations)", &self.pruned_images);
        if self.dry_run {
            log_findings("Files that would be deleted", &self.deleted_files);
        } else {
            log_findings("Files deleted", &self.deleted_files);
        }
        if !self.already_absent_files.is_empty() {
            log_findings("Files already absent", &self.already_absent_files);
        }
        if !self.failed_deletions.is_empty() {
            error!(
                "Failed to delete {} files: {:?}",
                self.failed_deletions.len(),
                self.failed_deletions
            );
        }
        info!(
            "Removed {} images and {} annotations",
            self.removed_images(),
            self.removed_annotations()
        );
    }
}

/// Remove annotations with degenerate boxes, then annotations whose image is not
/// in `images`.
///
/// The orphan check runs against `images` as given, so dropping a box never
/// orphans anything.
pub fn clean_annotations(annotations: &[Annotation], images: &[Image]) -> Result<Vec<Annotation>> {
    let mut report = CleanReport::default();
    remove_bad_annotations(annotations.to_vec(), images, &mut report)
}

fn remove_bad_annotations(
    annotations: Vec<Annotation>,
    images: &[Image],
    report: &mut CleanReport,
) -> Result<Vec<Annotation>> {
    let mut well_formed = Vec::with_capacity(annotations.len());
    for ann in annotations {
        if ann.has_degenerate_bbox()? {
            report.degenerate_annotations.push(ann.id);
        } else {
            well_formed.push(ann);
        }
    }
    if !report.degenerate_annotations.is_empty() {
        info!(
            "Removing {} degenerate bboxes",
            report.degenerate_annotations.len()
        );
    }

    let image_ids: HashSet<i64> = images.iter().map(|image| image.id).collect();
    let (kept, orphans): (Vec<Annotation>, Vec<Annotation>) = well_formed
        .into_iter()
        .partition(|ann| image_ids.contains(&ann.image_id));
    report.orphan_annotations = orphans.iter().map(|ann| ann.id).collect();
    if !orphans.is_empty() {
        info!("Removing {} annotations without image", orphans.len());
    }

    Ok(kept)
}

/// Clean a whole dataset. Categories pass through unchanged.
///
/// With `images_dir` set, the drift between records and folder is logged and
/// image records whose file is not in the folder are dropped first. With `prune_images`, images left without annotations are
/// dropped last and, when `images_dir` is set and this is not a dry run, their
/// files are deleted from disk. Deletion is irreversible and not rolled back if
/// writing the JSON later fails.
pub fn clean_dataset(dataset: CocoDataset, options: &CleanOptions) -> Result<(CocoDataset, CleanReport)> {
    let CocoDataset {
        mut images,
        annotations,
        categories,
    } = dataset;
    let mut report = CleanReport {
        dry_run: options.dry_run,
        ..CleanReport::default()
    };

    if let Some(dir) = &options.images_dir {
        info!("Checking {} against the image records...", dir.display());
        let drift = filesystem_drift(&images, dir)?;
        drift.log();
        if !drift.missing_from_folder.is_empty() {
            let missing: HashSet<&str> = drift
                .missing_from_folder
                .iter()
                .map(String::as_str)
                .collect();
            let (kept, dropped): (Vec<Image>, Vec<Image>) = images
                .into_iter()
                .partition(|image| !missing.contains(image.file_name.as_str()));
            report.images_missing_file = dropped.iter().map(|image| image.id).collect();
            info!(
                "Removing {} images whose file is missing from {}",
                dropped.len(),
                dir.display()
            );
            images = kept;
        }
    }

    let annotations = remove_bad_annotations(annotations, &images, &mut report)?;

    if options.prune_images {
        let annotated: HashSet<i64> = annotations.iter().map(|ann| ann.image_id).collect();
        let (kept, pruned): (Vec<Image>, Vec<Image>) = images
            .into_iter()
            .partition(|image| annotated.contains(&image.id));
        report.pruned_images = pruned.iter().map(|image| image.id).collect();
        if !pruned.is_empty() {
            info!("Removing {} images without annotations", pruned.len());
        }
        if let Some(dir) = &options.images_dir {
            delete_pruned_files(dir, &pruned, &kept, &mut report);
        }
        images = kept;
    }

    Ok((CocoDataset::new(images, annotations, categories), report))
}

// A file still referenced by a retained image is never deleted.
fn delete_pruned_files(dir: &Path, pruned: &[Image], kept: &[Image], report: &mut CleanReport) {
    let retained: HashSet<&str> = kept.iter().map(|image| image.file_name.as_str()).collect();
    let mut seen = HashSet::new();

    for image in pruned {
        let name = image.file_name.as_str();
        if retained.contains(name) || !seen.insert(name) {
            continue;
        }
        if report.dry_run {
            info!("Dry run: would delete {}", dir.join(name).display());
            report.deleted_files.push(name.to_string());
            continue;
        }
        match remove_image_file(dir, name) {
            Ok(DeleteOutcome::Deleted) => report.deleted_files.push(name.to_string()),
            Ok(DeleteOutcome::AlreadyAbsent) => report.already_absent_files.push(name.to_string()),
            Err(e) => {
                error!("Failed to delete {}: {}", dir.join(name).display(), e);
                report.failed_deletions.push(name.to_string());
            }
        }
    }
}
