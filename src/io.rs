use glob::glob;
use std::io;
use std::path::{Path, PathBuf};

use crate::types::{OutputDirs, Split, MASK_SUFFIX, OVERLAY_IMG_FORMATS};
use crate::utils::create_output_directory;

/// Set up the per-split labels/ and images/ output tree.
pub fn setup_output_directories(output_root: &Path) -> io::Result<OutputDirs> {
    let (train_labels_dir, train_images_dir) = split_dirs(output_root, Split::Train)?;
    let (test_labels_dir, test_images_dir) = split_dirs(output_root, Split::Test)?;
    let (valid_labels_dir, valid_images_dir) = split_dirs(output_root, Split::Valid)?;

    Ok(OutputDirs {
        train_labels_dir,
        train_images_dir,
        test_labels_dir,
        test_images_dir,
        valid_labels_dir,
        valid_images_dir,
    })
}

fn split_dirs(output_root: &Path, split: Split) -> io::Result<(PathBuf, PathBuf)> {
    let split_dir = output_root.join(split.as_str());
    let labels_dir = create_output_directory(&split_dir.join("labels"))?;
    let images_dir = create_output_directory(&split_dir.join("images"))?;
    Ok((labels_dir, images_dir))
}

/// Enumerate the `*_mask.png` files in one split directory, sorted.
pub fn list_mask_files(split_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let pattern = format!("{}/*{}", split_dir.display(), MASK_SUFFIX);
    let mut files = glob_paths(&pattern)?;
    files.sort();
    Ok(files)
}

/// Enumerate the images in a VOC `JPEGImages` directory, sorted.
pub fn list_voc_images(image_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for ext in OVERLAY_IMG_FORMATS {
        let pattern = format!("{}/*.{}", image_dir.display(), ext);
        files.extend(glob_paths(&pattern)?);
    }
    files.sort();
    Ok(files)
}

fn glob_paths(pattern: &str) -> io::Result<Vec<PathBuf>> {
    let entries = glob(pattern)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    Ok(entries.filter_map(|entry| entry.ok()).collect())
}
