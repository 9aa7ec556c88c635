use clap::Parser;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Check a COCO annotation file for inconsistencies and write a cleaned copy.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct CleanArgs {
    /// COCO JSON annotation file to clean
    #[arg(short = 'j', long = "json")]
    pub json: PathBuf,

    /// Folder holding the image files referenced by `file_name`
    #[arg(short = 'd', long = "images_dir")]
    pub images_dir: Option<PathBuf>,

    /// Where to write the cleaned JSON (default: `<input stem>_clean.coco.json`)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Remove images left without annotations, and their files when images_dir is set
    #[arg(long = "prune_images")]
    pub prune_images: bool,

    /// Report what would be removed without deleting files or writing JSON
    #[arg(long = "dry_run")]
    pub dry_run: bool,

    /// Log dataset statistics before cleaning
    #[arg(long = "explore")]
    pub explore: bool,
}

impl CleanArgs {
    pub fn to_clean_options(&self) -> CleanOptions {
        CleanOptions {
            json_path: self.json.clone(),
            images_dir: self.images_dir.clone(),
            output_path: self
                .output
                .clone()
                .unwrap_or_else(|| default_output_path(&self.json)),
            prune_images: self.prune_images,
            dry_run: self.dry_run,
            explore: self.explore,
        }
    }
}

/// Options driving a single cleaning run
#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    pub json_path: PathBuf,
    pub images_dir: Option<PathBuf>,
    pub output_path: PathBuf,
    pub prune_images: bool,
    pub dry_run: bool,
    pub explore: bool,
}

/// `data/_annotations.coco.json` becomes `data/_annotations_clean.coco.json`,
/// `train.json` becomes `train_clean.json`.
pub fn default_output_path(json: &Path) -> PathBuf {
    let file_name = json
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "annotations.json".to_string());

    let cleaned = match file_name.strip_suffix(".coco.json") {
        Some(stem) => format!("{}_clean.coco.json", stem),
        None => match file_name.rsplit_once('.') {
            Some((stem, ext)) => format!("{}_clean.{}", stem, ext),
            None => format!("{}_clean", file_name),
        },
    };
    json.with_file_name(cleaned)
}

/// Convert a COCO annotation file to a YOLO dataset split into train/val/test.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct ExportArgs {
    /// COCO JSON annotation file (ideally already cleaned)
    #[arg(short = 'j', long = "json")]
    pub json: PathBuf,

    /// Folder holding the image files referenced by `file_name`
    #[arg(short = 'd', long = "images_dir")]
    pub images_dir: PathBuf,

    /// Output folder for the YOLO dataset
    #[arg(short = 'o', long = "output_dir", default_value = "YOLODataset")]
    pub output_dir: PathBuf,

    /// Proportion of the dataset to use for validation
    #[arg(long = "val_size", default_value_t = 0.2, value_parser = validate_size)]
    pub val_size: f32,

    /// Proportion of the dataset to use for testing
    #[arg(long = "test_size", default_value_t = 0.1, value_parser = validate_size)]
    pub test_size: f32,

    /// Seed for random shuffling
    #[arg(long = "seed", default_value_t = 42)]
    pub seed: u64,
}

// Validate that the size is between 0.0 and 1.0
pub fn validate_size(s: &str) -> Result<f32, String> {
    match f32::from_str(s) {
        Ok(val) if (0.0..=1.0).contains(&val) => Ok(val),
        _ => Err("SIZE must be between 0.0 and 1.0".to_string()),
    }
}
