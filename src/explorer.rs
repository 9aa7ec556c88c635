//! Read-only dataset statistics, logged before cleaning when requested.

use log::info;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::checker::{annotations_without_image, images_without_annotations, out_of_bounds_bboxes};
use crate::coco::{Annotation, Category, CocoDataset};
use crate::error::{CleanError, Result};
use crate::utils::log_findings;

/// Number of annotations per referenced image id
pub fn annotations_per_image(annotations: &[Annotation]) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for ann in annotations {
        *counts.entry(ann.image_id).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: String,
    pub num_images: usize,
}

/// Distinct images per category name, most populated first.
///
/// Annotations whose `category_id` matches no category are not counted.
pub fn images_per_category(annotations: &[Annotation], categories: &[Category]) -> Vec<CategoryCount> {
    let names: HashMap<i64, &str> = categories
        .iter()
        .map(|category| (category.id, category.name.as_str()))
        .collect();

    let mut images_by_name: HashMap<&str, HashSet<i64>> = HashMap::new();
    for ann in annotations {
        if let Some(name) = ann.category_id.and_then(|id| names.get(&id).copied()) {
            images_by_name.entry(name).or_default().insert(ann.image_id);
        }
    }

    let mut counts: Vec<CategoryCount> = images_by_name
        .into_iter()
        .map(|(name, images)| CategoryCount {
            category: name.to_string(),
            num_images: images.len(),
        })
        .collect();
    counts.sort_by(|a, b| {
        b.num_images
            .cmp(&a.num_images)
            .then_with(|| a.category.cmp(&b.category))
    });
    counts
}

/// Summary statistics for one numeric column
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl ColumnStats {
    /// Sample standard deviation (n - 1), zero for fewer than two values.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            var.sqrt()
        } else {
            0.0
        };
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            count,
            mean,
            std,
            min,
            max,
        }
    }
}

/// Box width, height and area statistics
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BboxStats {
    pub width: ColumnStats,
    pub height: ColumnStats,
    pub area: ColumnStats,
}

pub fn bbox_stats(annotations: &[Annotation]) -> Result<BboxStats> {
    let mut widths = Vec::with_capacity(annotations.len());
    let mut heights = Vec::with_capacity(annotations.len());
    let mut areas = Vec::with_capacity(annotations.len());
    for ann in annotations {
        let bbox = ann.bbox()?;
        widths.push(bbox.w);
        heights.push(bbox.h);
        areas.push(bbox.area());
    }
    Ok(BboxStats {
        width: ColumnStats::from_values(&widths),
        height: ColumnStats::from_values(&heights),
        area: ColumnStats::from_values(&areas),
    })
}

/// Count of regular files per lower-cased extension, directly inside `folder`.
///
/// Files without an extension are counted under the empty string.
pub fn file_extensions(folder: &Path) -> Result<BTreeMap<String, usize>> {
    if !folder.is_dir() {
        return Err(CleanError::not_found(folder));
    }
    let mut counts = BTreeMap::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        let ext = entry
            .path()
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        *counts.entry(ext).or_insert(0) += 1;
    }
    Ok(counts)
}

/// Records lacking fields that later stages need
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MissingFields {
    pub images_without_size: usize,
    pub annotations_with_bad_bbox: usize,
    pub annotations_without_category: usize,
}

pub fn missing_fields(dataset: &CocoDataset) -> MissingFields {
    MissingFields {
        images_without_size: dataset
            .images
            .iter()
            .filter(|image| image.width.is_none() || image.height.is_none())
            .count(),
        annotations_with_bad_bbox: dataset
            .annotations
            .iter()
            .filter(|ann| ann.bbox().is_err())
            .count(),
        annotations_without_category: dataset
            .annotations
            .iter()
            .filter(|ann| ann.category_id.is_none())
            .count(),
    }
}

/// Everything the explore step reports, gathered up front so it can be tested
#[derive(Debug, Clone)]
pub struct DatasetSummary {
    pub num_images: usize,
    pub num_annotations: usize,
    pub category_names: Vec<String>,
    pub images_per_category: Vec<CategoryCount>,
    pub annotations_per_image: ColumnStats,
    pub images_without_annotations: Vec<i64>,
    pub orphan_annotations: Vec<i64>,
    pub bbox_stats: Option<BboxStats>,
    pub out_of_bounds: Option<Vec<i64>>,
    pub missing_fields: MissingFields,
    pub file_extensions: Option<BTreeMap<String, usize>>,
}

impl DatasetSummary {
    /// Gather statistics. Box statistics that need well-formed records are left
    /// out (`None`) when a record is malformed, since malformed records are
    /// reported through `missing_fields` instead.
    pub fn collect(dataset: &CocoDataset, images_dir: Option<&Path>) -> Result<Self> {
        let per_image: Vec<f64> = annotations_per_image(&dataset.annotations)
            .values()
            .map(|&count| count as f64)
            .collect();

        let file_extensions = match images_dir {
            Some(dir) => Some(file_extensions(dir)?),
            None => None,
        };

        Ok(Self {
            num_images: dataset.images.len(),
            num_annotations: dataset.annotations.len(),
            category_names: dataset.categories.iter().map(|c| c.name.clone()).collect(),
            images_per_category: images_per_category(&dataset.annotations, &dataset.categories),
            annotations_per_image: ColumnStats::from_values(&per_image),
            images_without_annotations: images_without_annotations(
                &dataset.images,
                &dataset.annotations,
            )
            .iter()
            .map(|image| image.id)
            .collect(),
            orphan_annotations: annotations_without_image(&dataset.annotations, &dataset.images)
                .iter()
                .map(|ann| ann.id)
                .collect(),
            bbox_stats: bbox_stats(&dataset.annotations).ok(),
            out_of_bounds: out_of_bounds_bboxes(&dataset.annotations, &dataset.images)
                .ok()
                .map(|anns| anns.iter().map(|ann| ann.id).collect()),
            missing_fields: missing_fields(dataset),
            file_extensions,
        })
    }

    pub fn log(&self) {
        info!("--- Dataset exploration ---");
        info!("Total images: {}", self.num_images);
        info!("Total annotations: {}", self.num_annotations);
        info!("Categories: {:?}", self.category_names);

        info!("Images per category:");
        for count in &self.images_per_category {
            info!("    {}: {}", count.category, count.num_images);
        }

        let per_image = &self.annotations_per_image;
        info!(
            "Annotations per image: count={} mean={:.2} std={:.2} min={} max={}",
            per_image.count, per_image.mean, per_image.std, per_image.min, per_image.max
        );

        log_findings("Images without annotations", &self.images_without_annotations);
        log_findings("Annotations without image", &self.orphan_annotations);

        match &self.bbox_stats {
            Some(stats) => {
                for (name, column) in [
                    ("width", &stats.width),
                    ("height", &stats.height),
                    ("area", &stats.area),
                ] {
                    info!(
                        "BBox {}: mean={:.2} std={:.2} min={:.2} max={:.2}",
                        name, column.mean, column.std, column.min, column.max
                    );
                }
            }
            None => info!("BBox statistics unavailable: malformed bbox records present"),
        }

        match &self.out_of_bounds {
            Some(ids) => log_findings("BBoxes out of bounds or with zero area", ids),
            None => info!("Out-of-bounds check unavailable: malformed records present"),
        }

        let missing = &self.missing_fields;
        info!(
            "Missing values: {} images without size, {} malformed bboxes, {} annotations without category",
            missing.images_without_size,
            missing.annotations_with_bad_bbox,
            missing.annotations_without_category
        );

        if let Some(extensions) = &self.file_extensions {
            info!("File extensions in images folder: {:?}", extensions);
        }
    }
}
