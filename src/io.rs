use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::coco::{Category, CocoDataset};
use crate::error::{CleanError, Result};
use crate::types::OutputDirs;
use crate::utils::create_output_directory;

/// Read and parse a COCO JSON document.
///
/// Parses straight from a buffered file stream. Missing `images`, `annotations` or
/// `categories` keys load as empty sets.
pub fn load_coco(path: &Path) -> Result<CocoDataset> {
    if !path.is_file() {
        return Err(CleanError::not_found(path));
    }
    let reader = BufReader::new(File::open(path)?);
    let dataset: CocoDataset = serde_json::from_reader(reader)?;
    debug!(
        "Parsed {}: {} images, {} annotations, {} categories",
        path.display(),
        dataset.images.len(),
        dataset.annotations.len(),
        dataset.categories.len()
    );
    Ok(dataset)
}

/// Write a COCO document as four-space indented UTF-8 JSON.
///
/// Non-ASCII characters are written literally, never escaped.
pub fn save_coco(dataset: &CocoDataset, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    dataset.serialize(&mut serializer)?;
    writer.flush()?;
    info!("JSON saved: {}", path.display());
    Ok(())
}

/// Names of the regular files directly inside `folder` (no recursion).
pub fn list_folder_files(folder: &Path) -> Result<BTreeSet<String>> {
    if !folder.is_dir() {
        return Err(CleanError::not_found(folder));
    }
    let mut names = BTreeSet::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => {
                names.insert(name);
            }
            Err(raw) => debug!("Skipping non UTF-8 file name {:?}", raw),
        }
    }
    Ok(names)
}

/// What happened when an image file was targeted for deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
}

/// Remove `folder/file_name` from disk. A file that is already gone is not an error.
pub fn remove_image_file(folder: &Path, file_name: &str) -> std::io::Result<DeleteOutcome> {
    let path = folder.join(file_name);
    match fs::remove_file(&path) {
        Ok(()) => {
            info!("File deleted: {}", path.display());
            Ok(DeleteOutcome::Deleted)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("File not found, nothing to delete: {}", path.display());
            Ok(DeleteOutcome::AlreadyAbsent)
        }
        Err(e) => Err(e),
    }
}

/// Set up the directory structure for YOLO dataset output
pub fn setup_output_directories(output_dir: &Path, with_test: bool) -> std::io::Result<OutputDirs> {
    let labels_dir = create_output_directory(&output_dir.join("labels"))?;
    let images_dir = create_output_directory(&output_dir.join("images"))?;

    let train_labels_dir = create_output_directory(&labels_dir.join("train"))?;
    let val_labels_dir = create_output_directory(&labels_dir.join("val"))?;
    let train_images_dir = create_output_directory(&images_dir.join("train"))?;
    let val_images_dir = create_output_directory(&images_dir.join("val"))?;

    let (test_labels_dir, test_images_dir) = if with_test {
        (
            Some(create_output_directory(&labels_dir.join("test"))?),
            Some(create_output_directory(&images_dir.join("test"))?),
        )
    } else {
        (None, None)
    };

    Ok(OutputDirs {
        train_labels_dir,
        val_labels_dir,
        train_images_dir,
        val_images_dir,
        test_labels_dir,
        test_images_dir,
    })
}

/// Create the dataset.yaml file for YOLO training
///
/// Class ids are the COCO `category_id` values, so `names` is keyed by them.
pub fn create_dataset_yaml(
    output_dir: &Path,
    with_test: bool,
    categories: &[Category],
) -> std::io::Result<()> {
    let dataset_yaml_path = output_dir.join("dataset.yaml");
    let mut dataset_yaml = BufWriter::new(File::create(&dataset_yaml_path)?);
    let absolute_path = fs::canonicalize(output_dir)?;
    let mut yaml_content = format!(
        "path: {}\ntrain: images/train\nval: images/val\n",
        absolute_path.to_string_lossy()
    );
    if with_test {
        yaml_content.push_str("test: images/test\n");
    } else {
        yaml_content.push_str("test:\n");
    }
    yaml_content.push_str("\nnames:\n");

    let mut sorted: Vec<&Category> = categories.iter().collect();
    sorted.sort_by_key(|category| category.id);
    for category in sorted {
        yaml_content.push_str(&format!("    {}: {}\n", category.id, category.name));
    }
    dataset_yaml.write_all(yaml_content.as_bytes())?;
    dataset_yaml.flush()
}
