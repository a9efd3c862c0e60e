use indicatif::{ProgressBar, ProgressStyle};
use std::error::Error;
use std::fs;
use std::path::Path;

use crate::types::ClassMap;

/// Read a pixel-to-class mapping from a JSON object file.
pub fn read_class_map_json(path: &Path) -> Result<ClassMap, Box<dyn Error>> {
    let file = fs::File::open(path)
        .map_err(|e| format!("failed to open class map {}: {}", path.display(), e))?;
    let class_map: ClassMap = serde_json::from_reader(file)
        .map_err(|e| format!("failed to parse class map {}: {}", path.display(), e))?;
    Ok(class_map)
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
pub fn create_output_directory(path: &Path) -> std::io::Result<std::path::PathBuf> {
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
