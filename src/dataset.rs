use dashmap::DashMap;
use log::{info, warn};
use std::error::Error;
use std::path::Path;

use crate::config::MaskArgs;
use crate::conversion::process_masks_in_parallel;
use crate::io::list_mask_files;
use crate::types::{MaskStats, OutputDirs, Split};
use crate::utils::create_progress_bar;

/// Main mask-conversion pipeline over the fixed train/test/valid splits.
pub fn process_dataset(
    args: &MaskArgs,
    root: &Path,
    output_dirs: &OutputDirs,
) -> Result<(), Box<dyn Error>> {
    let class_map = args.to_class_map()?;
    if class_map.is_empty() {
        return Err("class mapping is empty; pass --class_map or --class_map_json".into());
    }
    info!("Class mapping has {} entries.", class_map.len());

    let stats = MaskStats::default();
    let class_counts: DashMap<u32, usize> = DashMap::new();

    for split in Split::ALL {
        let split_dir = root.join(split.as_str());
        if !split_dir.is_dir() {
            warn!(
                "Split directory not found, skipping: {}",
                split_dir.display()
            );
            continue;
        }

        let mask_files = list_mask_files(&split_dir)?;
        if mask_files.is_empty() {
            info!("No mask files in {}", split_dir.display());
            continue;
        }

        let (labels_dir, images_dir) = output_dirs.for_split(split);
        let pb = create_progress_bar(mask_files.len() as u64, split.as_str());
        process_masks_in_parallel(
            &mask_files,
            &split_dir,
            labels_dir,
            images_dir,
            &class_map,
            args.output_format,
            &class_counts,
            &stats,
            &pb,
        )?;
        pb.finish_with_message(format!("{} processing complete", split.as_str()));
    }

    stats.print_summary();

    // Per-class instance counts, ordered by class id
    let mut counts: Vec<_> = class_counts
        .iter()
        .map(|entry| (*entry.key(), *entry.value()))
        .collect();
    counts.sort_by_key(|&(class_id, _)| class_id);
    for (class_id, instances) in counts {
        info!("class {}: {} instances", class_id, instances);
    }

    Ok(())
}
