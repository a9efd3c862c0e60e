use image::{Rgb, RgbImage};
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::error::Error;
use std::fs;
use std::path::Path;

use crate::config::OverlayArgs;
use crate::io::list_voc_images;
use crate::segment::{BoxSegmenter, SegmentResult};
use crate::types::{BinaryMask, BoundingBox, OverlayStats};
use crate::utils::create_progress_bar;
use crate::voc;

/// 50/50 mix of the original pixel and the overlay color, truncated to u8.
pub fn blend_pixel(original: Rgb<u8>, color: [u8; 3]) -> Rgb<u8> {
    let mut blended = [0u8; 3];
    for c in 0..3 {
        blended[c] = (original[c] as f32 * 0.5 + color[c] as f32 * 0.5) as u8;
    }
    Rgb(blended)
}

/// Blend `color` into the image at every set mask pixel.
pub fn apply_mask(image: &mut RgbImage, mask: &BinaryMask, color: [u8; 3]) {
    for y in 0..image.height().min(mask.height()) {
        for x in 0..image.width().min(mask.width()) {
            if mask.get(x, y) {
                let blended = blend_pixel(*image.get_pixel(x, y), color);
                image.put_pixel(x, y, blended);
            }
        }
    }
}

/// Render the overlay for one image.
///
/// Out-of-bounds boxes, empty masks, and per-box prediction failures are
/// logged, counted, and skipped; the remaining boxes still run.
pub fn render_overlay(
    segmenter: &mut dyn BoxSegmenter,
    image: &RgbImage,
    boxes: &[BoundingBox],
    rng: &mut StdRng,
    stats: &mut OverlayStats,
) -> SegmentResult<RgbImage> {
    let (width, height) = image.dimensions();
    let mut overlay = image.clone();
    segmenter.set_image(image)?;

    for bbox in boxes {
        if !bbox.contained_in(width, height) {
            warn!("Invalid bounding box skipped: {:?}", bbox);
            stats.increment_boxes_skipped_out_of_bounds();
            continue;
        }

        match segmenter.predict_box(bbox) {
            Ok(mask) if mask.is_empty() => {
                warn!("No mask found for bounding box: {:?}", bbox);
                stats.increment_boxes_skipped_empty_mask();
            }
            Ok(mask) => {
                let color: [u8; 3] = rng.gen();
                apply_mask(&mut overlay, &mask, color);
                stats.increment_boxes_rendered();
            }
            Err(e) => {
                error!("Segmentation failed for bounding box {:?}: {}", bbox, e);
                stats.increment_boxes_failed();
            }
        }
    }

    Ok(overlay)
}

/// Process one image/annotation pair and write the composited overlay.
pub fn process_image(
    segmenter: &mut dyn BoxSegmenter,
    image_path: &Path,
    xml_path: &Path,
    output_path: &Path,
    rng: &mut StdRng,
    stats: &mut OverlayStats,
) -> SegmentResult<()> {
    let boxes = voc::read_boxes(xml_path)?;
    let image = image::open(image_path)?.to_rgb8();
    let overlay = render_overlay(segmenter, &image, &boxes, rng, stats)?;
    overlay.save(output_path)?;
    info!("Segmentation result saved: {}", output_path.display());
    Ok(())
}

/// Walk a VOC dataset folder and render an overlay per annotated image.
///
/// Per-file failures are logged and the batch continues.
pub fn process_voc_folder(
    args: &OverlayArgs,
    segmenter: &mut dyn BoxSegmenter,
) -> Result<OverlayStats, Box<dyn Error>> {
    let dataset_dir = Path::new(&args.dataset_dir);
    let image_dir = dataset_dir.join("JPEGImages");
    let annotation_dir = dataset_dir.join("Annotations");
    let output_dir = Path::new(&args.output_dir);
    fs::create_dir_all(output_dir)?;

    let images = list_voc_images(&image_dir)?;
    info!("Found {} images in {}", images.len(), image_dir.display());

    let mut stats = OverlayStats::default();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let pb = create_progress_bar(images.len() as u64, "Overlay");

    for image_path in &images {
        let Some(stem) = image_path.file_stem().and_then(|s| s.to_str()) else {
            warn!("Skipping image with unreadable name: {}", image_path.display());
            stats.increment_files_failed();
            pb.inc(1);
            continue;
        };
        let xml_path = annotation_dir.join(stem).with_extension("xml");
        if !xml_path.exists() {
            warn!("Label file not found: {}, skipping.", xml_path.display());
            stats.increment_files_skipped_missing_annotation();
            pb.inc(1);
            continue;
        }

        let file_name = image_path.file_name().unwrap_or_default();
        let output_path = output_dir.join(file_name);
        match process_image(
            segmenter,
            image_path,
            &xml_path,
            &output_path,
            &mut rng,
            &mut stats,
        ) {
            Ok(()) => stats.increment_files_processed(),
            Err(e) => {
                error!("Error occurred ({}): {}", image_path.display(), e);
                stats.increment_files_failed();
            }
        }
        pb.inc(1);
    }

    pb.finish_with_message("Overlay processing complete");
    stats.print_summary();
    Ok(stats)
}
