use indicatif::ProgressBar;
use log::{debug, error, warn};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs::{copy, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::coco::{Annotation, Bbox, Image};
use crate::error::Result;
use crate::types::{is_image_file, ExportOutcome, ProcessingStats};

// Roboflow exports append `_rf.<hash>` to file names
const ROBOFLOW_HASH_MARKER: &str = "_rf.";

/// A box in YOLO's normalized center format
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloBox {
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

/// Convert a COCO `[x, y, w, h]` pixel box to normalized center format
pub fn coco_bbox_to_yolo(bbox: &Bbox, image_width: u32, image_height: u32) -> YoloBox {
    let img_w = image_width as f64;
    let img_h = image_height as f64;
    YoloBox {
        x_center: (bbox.x + bbox.w / 2.0) / img_w,
        y_center: (bbox.y + bbox.h / 2.0) / img_h,
        width: bbox.w / img_w,
        height: bbox.h / img_h,
    }
}

/// Render the label file for one image: `class x_center y_center width height`
/// per annotation, six decimal digits, class taken from `category_id`.
pub fn convert_to_yolo_format(image: &Image, annotations: &[&Annotation]) -> Result<String> {
    let (width, height) = image.dimensions()?;
    let mut yolo_data = String::with_capacity(annotations.len() * 48);

    for ann in annotations {
        let class_id = ann.category()?;
        let yolo = coco_bbox_to_yolo(&ann.bbox()?, width, height);
        yolo_data.push_str(&format!(
            "{} {:.6} {:.6} {:.6} {:.6}\n",
            class_id, yolo.x_center, yolo.y_center, yolo.width, yolo.height
        ));
    }

    Ok(yolo_data)
}

/// Find the file backing `file_name` inside `images_dir`.
///
/// Tries the exact name first. Only a name carrying a Roboflow `_rf.` hash falls
/// back to any image file containing the part before the hash; other names must
/// match exactly.
pub fn locate_image(images_dir: &Path, file_name: &str) -> Option<PathBuf> {
    let exact = images_dir.join(file_name);
    if exact.is_file() {
        return Some(exact);
    }

    let (base_name, _) = file_name.split_once(ROBOFLOW_HASH_MARKER)?;
    if base_name.is_empty() {
        return None;
    }

    let pattern = format!(
        "{}/*{}*",
        glob::Pattern::escape(&images_dir.to_string_lossy()),
        glob::Pattern::escape(base_name)
    );
    let mut matches: Vec<PathBuf> = glob::glob(&pattern)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file() && is_image_file(path))
        .collect();
    matches.sort();
    let found = matches.into_iter().next();
    if let Some(path) = &found {
        debug!("Matched {} to {}", file_name, path.display());
    }
    found
}

/// Output file stem for every image in a batch, keyed by image id.
///
/// Stems come from the record's `file_name`, sanitized. Records whose stems would
/// collide within the batch (`a.jpg` and `a.png`) get `_<image id>` appended so
/// no label file overwrites another.
pub fn output_stems(images: &[&Image]) -> HashMap<i64, String> {
    let stems: Vec<(i64, String)> = images
        .iter()
        .map(|image| {
            let stem = Path::new(&image.file_name)
                .file_stem()
                .map(|s| sanitize_filename::sanitize(s.to_string_lossy()))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| image.id.to_string());
            (image.id, stem)
        })
        .collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (_, stem) in &stems {
        *counts.entry(stem.as_str()).or_insert(0) += 1;
    }
    let clashing: HashSet<String> = counts
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|(stem, _)| stem.to_string())
        .collect();

    stems
        .into_iter()
        .map(|(id, stem)| {
            if clashing.contains(&stem) {
                let renamed = format!("{}_{}", stem, id);
                warn!(
                    "Output name {} is shared by several images, writing image {} as {}",
                    stem, id, renamed
                );
                (id, renamed)
            } else {
                (id, stem)
            }
        })
        .collect()
}

/// Copy one image into the split and write its label file as `<output_stem>.txt`
pub fn process_image(
    image: &Image,
    annotations: &[&Annotation],
    output_stem: &str,
    source_dir: &Path,
    labels_dir: &Path,
    images_dir: &Path,
) -> Result<ExportOutcome> {
    let Some(image_path) = locate_image(source_dir, &image.file_name) else {
        warn!("Image file not found for: {}", image.file_name);
        return Ok(ExportOutcome::MissingImage);
    };

    // Build the labels before touching the output so a bad record leaves nothing behind
    let yolo_data = convert_to_yolo_format(image, annotations)?;

    // Stems may contain dots (Roboflow names), so extensions are appended, never swapped
    let image_output_path = match image_path.extension() {
        Some(ext) => images_dir.join(format!("{}.{}", output_stem, ext.to_string_lossy())),
        None => images_dir.join(output_stem),
    };
    copy(&image_path, &image_output_path)?;

    let label_output_path = labels_dir.join(format!("{}.txt", output_stem));
    let mut writer = BufWriter::new(File::create(&label_output_path)?);
    writer.write_all(yolo_data.as_bytes())?;
    writer.flush()?;

    Ok(ExportOutcome::Exported {
        labels: annotations.len(),
    })
}

/// Process a batch of images in parallel
pub fn process_images_in_parallel(
    images: &[&Image],
    annotations_by_image: &HashMap<i64, Vec<&Annotation>>,
    source_dir: &Path,
    labels_dir: &Path,
    images_dir: &Path,
    pb: &ProgressBar,
) -> ProcessingStats {
    let stems = output_stems(images);
    let outcomes: Vec<ExportOutcome> = images
        .par_iter()
        .map(|image| {
            let annotations = annotations_by_image
                .get(&image.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let stem = stems
                .get(&image.id)
                .map(String::as_str)
                .unwrap_or_default();
            let outcome = match process_image(
                image,
                annotations,
                stem,
                source_dir,
                labels_dir,
                images_dir,
            ) {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Failed to export image {}: {}", image.file_name, e);
                    ExportOutcome::Failed
                }
            };
            pb.inc(1);
            outcome
        })
        .collect();

    let mut stats = ProcessingStats::new();
    for outcome in outcomes {
        stats.record(outcome);
    }
    stats
}
