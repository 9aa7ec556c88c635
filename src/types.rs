use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::coco::Image;

// Image formats recognized on disk
pub const IMG_FORMATS: &[&str] = &["bmp", "jpeg", "jpg", "png", "tif", "tiff"];

// Precomputed HashSet of image extensions for fast lookup
pub static IMAGE_EXTENSIONS_SET: OnceLock<HashSet<String>> = OnceLock::new();

/// Get the image extensions set
pub fn get_image_extensions_set() -> &'static HashSet<String> {
    IMAGE_EXTENSIONS_SET.get_or_init(|| IMG_FORMATS.iter().map(|ext| ext.to_lowercase()).collect())
}

/// Whether a file name carries a recognized image extension (case-insensitive)
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| get_image_extensions_set().contains(&ext))
}

// Struct to hold the paths to the output directories for train/val/test splits
pub struct OutputDirs {
    pub train_labels_dir: PathBuf,
    pub val_labels_dir: PathBuf,
    pub train_images_dir: PathBuf,
    pub val_images_dir: PathBuf,
    pub test_labels_dir: Option<PathBuf>,
    pub test_images_dir: Option<PathBuf>,
}

// Struct to hold the split image records for training, validation, and testing
#[derive(Debug, Default)]
pub struct SplitData<'a> {
    pub train_images: Vec<&'a Image>,
    pub val_images: Vec<&'a Image>,
    pub test_images: Vec<&'a Image>,
}

/// Outcome of exporting a single image and its label file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    Exported { labels: usize },
    MissingImage,
    Failed,
}

// Struct to hold export statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingStats {
    pub total_images_processed: usize,
    pub successful_exports: usize,
    pub labels_written: usize,
    pub skipped_missing_image: usize,
    pub failed_exports: usize,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: ExportOutcome) {
        self.total_images_processed += 1;
        match outcome {
            ExportOutcome::Exported { labels } => {
                self.successful_exports += 1;
                self.labels_written += labels;
            }
            ExportOutcome::MissingImage => self.skipped_missing_image += 1,
            ExportOutcome::Failed => self.failed_exports += 1,
        }
    }

    pub fn merge(&mut self, other: &ProcessingStats) {
        self.total_images_processed += other.total_images_processed;
        self.successful_exports += other.successful_exports;
        self.labels_written += other.labels_written;
        self.skipped_missing_image += other.skipped_missing_image;
        self.failed_exports += other.failed_exports;
    }

    pub fn print_summary(&self) {
        log::info!("=== Export Summary ===");
        log::info!("Total images processed: {}", self.total_images_processed);
        log::info!("Successful exports: {}", self.successful_exports);
        log::info!("Label lines written: {}", self.labels_written);
        log::info!(
            "Skipped (missing image file): {}",
            self.skipped_missing_image
        );
        log::info!("Failed exports: {}", self.failed_exports);

        if self.skipped_missing_image + self.failed_exports > 0 {
            log::warn!(
                "{} images were not exported (missing image file: {}, failed: {})",
                self.skipped_missing_image + self.failed_exports,
                self.skipped_missing_image,
                self.failed_exports
            );
        }
    }
}
