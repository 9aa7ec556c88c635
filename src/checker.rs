//! Consistency checks over the COCO record sets
//!
//! Every query is read-only and returns references into its input collection, in
//! input order, so a result is always a subset of what was passed in.

use log::debug;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use crate::coco::{Annotation, CocoDataset, Image};
use crate::error::Result;
use crate::io::list_folder_files;
use crate::types::is_image_file;
use crate::utils::log_findings;

/// Images whose `id` is not referenced by any annotation
pub fn images_without_annotations<'a>(
    images: &'a [Image],
    annotations: &[Annotation],
) -> Vec<&'a Image> {
    let annotated: HashSet<i64> = annotations.iter().map(|ann| ann.image_id).collect();
    images
        .iter()
        .filter(|image| !annotated.contains(&image.id))
        .collect()
}

/// Annotations whose `image_id` matches no image `id`
pub fn annotations_without_image<'a>(
    annotations: &'a [Annotation],
    images: &[Image],
) -> Vec<&'a Annotation> {
    let image_ids: HashSet<i64> = images.iter().map(|image| image.id).collect();
    annotations
        .iter()
        .filter(|ann| !image_ids.contains(&ann.image_id))
        .collect()
}

/// Annotations whose box has a zero or negative width or height.
///
/// Fails on the first annotation whose `bbox` is not four numbers.
pub fn degenerate_bboxes(annotations: &[Annotation]) -> Result<Vec<&Annotation>> {
    let mut degenerate = Vec::new();
    for ann in annotations {
        if ann.has_degenerate_bbox()? {
            degenerate.push(ann);
        }
    }
    Ok(degenerate)
}

/// Annotations whose box is degenerate or does not fit inside its image.
///
/// Annotations without a matching image are skipped; they are reported by
/// [`annotations_without_image`]. So are annotations on an image with no usable
/// width or height, which leave the rest of the report intact.
pub fn out_of_bounds_bboxes<'a>(
    annotations: &'a [Annotation],
    images: &[Image],
) -> Result<Vec<&'a Annotation>> {
    let by_id: HashMap<i64, &Image> = images.iter().map(|image| (image.id, image)).collect();
    let mut invalid = Vec::new();
    for ann in annotations {
        let Some(image) = by_id.get(&ann.image_id) else {
            continue;
        };
        let Ok((width, height)) = image.dimensions() else {
            debug!(
                "Skipping bounds check of annotation {}: image {} has no size",
                ann.id, image.id
            );
            continue;
        };
        let bbox = ann.bbox()?;
        if bbox.is_degenerate() || bbox.exceeds(width, height) {
            invalid.push(ann);
        }
    }
    Ok(invalid)
}

/// Difference between the file names the image records declare and the files on disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilesystemDrift {
    /// Declared by an image record but absent from the folder
    pub missing_from_folder: Vec<String>,
    /// Image files in the folder that no record declares
    pub missing_from_records: Vec<String>,
}

impl FilesystemDrift {
    pub fn is_empty(&self) -> bool {
        self.missing_from_folder.is_empty() && self.missing_from_records.is_empty()
    }

    pub fn log(&self) {
        log_findings("Images in JSON but missing from folder", &self.missing_from_folder);
        log_findings("Images in folder but missing from JSON", &self.missing_from_records);
    }
}

/// Compare image records against the files directly inside `folder`.
///
/// Any declared name without a matching regular file counts as missing from the
/// folder. Only files with a recognized image extension count as missing from the
/// records, so the annotation file itself and other stray files are not reported.
/// Both lists are sorted and free of duplicates.
pub fn filesystem_drift(images: &[Image], folder: &Path) -> Result<FilesystemDrift> {
    let on_disk = list_folder_files(folder)?;
    let declared: BTreeSet<&str> = images.iter().map(|image| image.file_name.as_str()).collect();

    let missing_from_folder = declared
        .iter()
        .filter(|name| !on_disk.contains(**name))
        .map(|name| name.to_string())
        .collect();
    let missing_from_records = on_disk
        .iter()
        .filter(|name| is_image_file(Path::new(name)))
        .filter(|name| !declared.contains(name.as_str()))
        .cloned()
        .collect();

    Ok(FilesystemDrift {
        missing_from_folder,
        missing_from_records,
    })
}

/// Image files in `folder` that do not belong to an annotated image record.
///
/// A file counts as annotated when some image record with that `file_name` is
/// referenced by at least one annotation. The result is sorted.
pub fn unannotated_files_on_disk(folder: &Path, dataset: &CocoDataset) -> Result<Vec<String>> {
    let on_disk = list_folder_files(folder)?;
    let annotated_ids: HashSet<i64> = dataset.annotations.iter().map(|ann| ann.image_id).collect();
    let annotated_names: HashSet<&str> = dataset
        .images
        .iter()
        .filter(|image| annotated_ids.contains(&image.id))
        .map(|image| image.file_name.as_str())
        .collect();

    Ok(on_disk
        .into_iter()
        .filter(|name| is_image_file(Path::new(name)))
        .filter(|name| !annotated_names.contains(name.as_str()))
        .collect())
}
