use dashmap::DashMap;
use indicatif::ProgressBar;
use log::debug;
use rayon::prelude::*;
use std::fs::{copy, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::config::Format;
use crate::rle::Rle;
use crate::types::{BinaryMask, ClassMap, MaskStats, MASK_SUFFIX};

/// Process one split's mask files in parallel.
///
/// The first error aborts the whole batch; there is no per-file recovery
/// in the mask converter.
#[allow(clippy::too_many_arguments)]
pub fn process_masks_in_parallel(
    mask_files: &[std::path::PathBuf],
    split_dir: &Path,
    labels_dir: &Path,
    images_dir: &Path,
    class_map: &ClassMap,
    format: Format,
    class_counts: &DashMap<u32, usize>,
    stats: &MaskStats,
    pb: &ProgressBar,
) -> io::Result<()> {
    mask_files.par_iter().try_for_each(|mask_path| {
        process_mask_file(
            mask_path,
            split_dir,
            labels_dir,
            images_dir,
            class_map,
            format,
            class_counts,
            stats,
        )?;
        pb.inc(1);
        Ok(())
    })
}

/// Convert one mask image and copy its paired photo into the output tree.
#[allow(clippy::too_many_arguments)]
fn process_mask_file(
    mask_path: &Path,
    split_dir: &Path,
    labels_dir: &Path,
    images_dir: &Path,
    class_map: &ClassMap,
    format: Format,
    class_counts: &DashMap<u32, usize>,
    stats: &MaskStats,
) -> io::Result<()> {
    let file_name = mask_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid mask file name: {}", mask_path.display()),
            )
        })?;
    let stem = file_name.strip_suffix(MASK_SUFFIX).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a mask file: {}", mask_path.display()),
        )
    })?;
    let sanitized_stem = sanitize_filename::sanitize(stem);

    let label_path = labels_dir.join(&sanitized_stem).with_extension("txt");
    convert_mask_to_labels(mask_path, &label_path, class_map, format, class_counts, stats)?;
    stats.increment_masks_processed();

    // Copy the paired photo if it sits next to the mask
    let image_path = split_dir.join(format!("{}.jpg", stem));
    if image_path.exists() {
        let image_output_path = images_dir.join(&sanitized_stem).with_extension("jpg");
        copy(&image_path, &image_output_path)?;
        stats.increment_images_copied();
    } else {
        debug!("No paired image for mask: {}", mask_path.display());
    }

    Ok(())
}

/// Convert a single mask image into label lines.
///
/// One line per mapped class with at least one matching pixel, in
/// ascending pixel-value order. The label file is created even when no
/// class matches.
pub fn convert_mask_to_labels(
    mask_path: &Path,
    label_path: &Path,
    class_map: &ClassMap,
    format: Format,
    class_counts: &DashMap<u32, usize>,
    stats: &MaskStats,
) -> io::Result<()> {
    let mask_image = image::open(mask_path)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        .to_luma8();
    let (width, height) = mask_image.dimensions();

    let mut writer = BufWriter::new(File::create(label_path)?);
    for (pixel_value, class_id) in class_map.iter() {
        let binary_mask = BinaryMask::from_fn(width, height, |x, y| {
            mask_image.get_pixel(x, y)[0] == pixel_value
        });
        if binary_mask.is_empty() {
            stats.increment_classes_skipped_empty();
            continue;
        }

        let rle = Rle::encode(&binary_mask);
        writer.write_all(format_label_line(class_id, &rle.to_bbox(), format).as_bytes())?;
        stats.increment_labels_written();
        *class_counts.entry(class_id).or_insert(0) += 1;
    }

    Ok(())
}

/// Format one label line from a `[x, y, w, h]` box, newline-terminated.
pub fn format_label_line(class_id: u32, bbox: &[f64; 4], format: Format) -> String {
    let [x, y, w, h] = *bbox;
    match format {
        Format::Bbox => format!("{} {} {} {} {}\n", class_id, x, y, w, h),
        Format::Polygon => format!(
            "{} {} {} {} {} {} {} {} {}\n",
            class_id,
            x,
            y,
            x + w,
            y,
            x + w,
            y + h,
            x,
            y + h
        ),
    }
}
