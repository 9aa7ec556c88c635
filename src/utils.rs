use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

/// Result sets up to this size are enumerated in diagnostics, larger ones only counted
pub const ENUMERATE_LIMIT: usize = 10;

/// Log a detected inconsistency or removal as a count, listing the items when few.
pub fn log_findings<T: Display>(what: &str, items: &[T]) {
    if items.is_empty() {
        log::info!("{}: none", what);
    } else if items.len() <= ENUMERATE_LIMIT {
        let listed: Vec<String> = items.iter().map(|item| item.to_string()).collect();
        log::warn!("{}: {} [{}]", what, items.len(), listed.join(", "));
    } else {
        log::warn!("{}: {}", what, items.len());
    }
}

/// Create a progress bar with the given length and label
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
                label
            ))
            .progress_chars("#>-"),
    );
    pb
}

/// Safely create output directories and return their paths
pub fn create_output_directory(path: &Path) -> std::io::Result<PathBuf> {
    if path.exists() {
        log::warn!(
            "Directory {:?} already exists. Deleting and recreating it.",
            path
        );
        fs::remove_dir_all(path).and_then(|_| fs::create_dir_all(path))?;
    } else {
        fs::create_dir_all(path)?;
    }
    Ok(path.to_path_buf())
}
