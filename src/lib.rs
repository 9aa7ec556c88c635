//! COCO dataset cleaner
//!
//! This library loads a COCO JSON annotation file into typed record sets, checks
//! them for inconsistencies (images missing from disk, annotations pointing at
//! missing images, degenerate bounding boxes), writes a cleaned copy, and can
//! export the result as a YOLO dataset split into train/val/test.

pub mod checker;
pub mod cleaner;
pub mod coco;
pub mod config;
pub mod conversion;
pub mod error;
pub mod explorer;
pub mod io;
pub mod pipeline;
pub mod types;
pub mod utils;
pub mod yolo_dataset;

// Re-export commonly used types and functions
pub use checker::{
    annotations_without_image, degenerate_bboxes, filesystem_drift, images_without_annotations,
    FilesystemDrift,
};
pub use cleaner::{clean_annotations, clean_dataset, CleanReport};
pub use coco::{Annotation, Bbox, Category, CocoDataset, Image};
pub use config::{CleanArgs, CleanOptions, ExportArgs};
pub use error::{CleanError, Result};
pub use io::{load_coco, save_coco};
pub use pipeline::run_clean_pipeline;
pub use yolo_dataset::process_dataset;
