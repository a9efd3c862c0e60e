use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};

// File name suffix that marks a semantic mask image.
pub const MASK_SUFFIX: &str = "_mask.png";

// Image formats accepted by the overlay tool's folder walker.
pub const OVERLAY_IMG_FORMATS: &[&str] = &["jpg", "png"];

/// Axis-aligned bounding box in pixel space, Pascal-VOC corner convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    /// Whether every coordinate lies within an image of the given size.
    pub fn contained_in(&self, width: u32, height: u32) -> bool {
        self.xmin >= 0.0
            && self.ymin >= 0.0
            && self.xmax <= width as f64
            && self.ymax <= height as f64
    }
}

/// Row-major boolean raster, one per mask-image class or predicted box.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl BinaryMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; (width * height) as usize],
        }
    }

    /// Build a mask by evaluating `f` at every `(x, y)`.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut mask = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    mask.set(x, y, true);
                }
            }
        }
        mask
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        self.data[(y * self.width + x) as usize] = value;
    }

    pub fn count_ones(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// True when no pixel is set.
    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }
}

/// Ordered mapping from mask pixel intensity to class id.
///
/// Iteration is in ascending pixel order so label files come out
/// deterministic regardless of how the mapping was supplied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ClassMap {
    entries: BTreeMap<u8, u32>,
}

impl ClassMap {
    pub fn from_pairs(pairs: &[(u8, u32)]) -> Self {
        Self {
            entries: pairs.iter().copied().collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.entries.iter().map(|(&pixel, &class_id)| (pixel, class_id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Dataset split folders processed by the mask converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
    Valid,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Test, Split::Valid];

    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
            Split::Valid => "valid",
        }
    }
}

// Struct to hold the paths to the output directories for the fixed splits
pub struct OutputDirs {
    pub train_labels_dir: PathBuf,
    pub train_images_dir: PathBuf,
    pub test_labels_dir: PathBuf,
    pub test_images_dir: PathBuf,
    pub valid_labels_dir: PathBuf,
    pub valid_images_dir: PathBuf,
}

impl OutputDirs {
    /// Label and image directories for one split.
    pub fn for_split(&self, split: Split) -> (&Path, &Path) {
        match split {
            Split::Train => (&self.train_labels_dir, &self.train_images_dir),
            Split::Test => (&self.test_labels_dir, &self.test_images_dir),
            Split::Valid => (&self.valid_labels_dir, &self.valid_images_dir),
        }
    }
}

/// Counters for one mask-conversion run, shared across rayon workers.
#[derive(Debug, Default)]
pub struct MaskStats {
    masks_processed: AtomicUsize,
    labels_written: AtomicUsize,
    classes_skipped_empty: AtomicUsize,
    images_copied: AtomicUsize,
}

impl MaskStats {
    pub fn increment_masks_processed(&self) {
        self.masks_processed.fetch_add(1, Relaxed);
    }

    pub fn increment_labels_written(&self) {
        self.labels_written.fetch_add(1, Relaxed);
    }

    pub fn increment_classes_skipped_empty(&self) {
        self.classes_skipped_empty.fetch_add(1, Relaxed);
    }

    pub fn increment_images_copied(&self) {
        self.images_copied.fetch_add(1, Relaxed);
    }

    pub fn masks_processed(&self) -> usize {
        self.masks_processed.load(Relaxed)
    }

    pub fn labels_written(&self) -> usize {
        self.labels_written.load(Relaxed)
    }

    pub fn classes_skipped_empty(&self) -> usize {
        self.classes_skipped_empty.load(Relaxed)
    }

    pub fn images_copied(&self) -> usize {
        self.images_copied.load(Relaxed)
    }

    pub fn print_summary(&self) {
        log::info!("=== Mask Conversion Summary ===");
        log::info!("Mask images processed: {}", self.masks_processed());
        log::info!("Label lines written: {}", self.labels_written());
        log::info!("Paired images copied: {}", self.images_copied());
        log::info!(
            "Classes skipped (no matching pixels): {}",
            self.classes_skipped_empty()
        );
    }
}

/// Counters for one overlay run.
#[derive(Debug, Default, Clone)]
pub struct OverlayStats {
    pub files_processed: usize,
    pub files_skipped_missing_annotation: usize,
    pub files_failed: usize,
    pub boxes_rendered: usize,
    pub boxes_skipped_out_of_bounds: usize,
    pub boxes_skipped_empty_mask: usize,
    pub boxes_failed: usize,
}

impl OverlayStats {
    pub fn increment_files_processed(&mut self) {
        self.files_processed += 1;
    }

    pub fn increment_files_skipped_missing_annotation(&mut self) {
        self.files_skipped_missing_annotation += 1;
    }

    pub fn increment_files_failed(&mut self) {
        self.files_failed += 1;
    }

    pub fn increment_boxes_rendered(&mut self) {
        self.boxes_rendered += 1;
    }

    pub fn increment_boxes_skipped_out_of_bounds(&mut self) {
        self.boxes_skipped_out_of_bounds += 1;
    }

    pub fn increment_boxes_skipped_empty_mask(&mut self) {
        self.boxes_skipped_empty_mask += 1;
    }

    pub fn increment_boxes_failed(&mut self) {
        self.boxes_failed += 1;
    }

    pub fn print_summary(&self) {
        log::info!("=== Overlay Summary ===");
        log::info!("Images processed: {}", self.files_processed);
        log::info!(
            "Images skipped (missing annotation): {}",
            self.files_skipped_missing_annotation
        );
        log::info!("Images failed: {}", self.files_failed);
        log::info!("Boxes rendered: {}", self.boxes_rendered);
        log::info!(
            "Boxes skipped (out of bounds): {}",
            self.boxes_skipped_out_of_bounds
        );
        log::info!(
            "Boxes skipped (empty mask): {}",
            self.boxes_skipped_empty_mask
        );
        log::info!("Boxes failed: {}", self.boxes_failed);

        let total_skipped = self.boxes_skipped_out_of_bounds + self.boxes_skipped_empty_mask;
        if total_skipped > 0 {
            log::warn!(
                "Total skipped boxes: {} (out of bounds: {}, empty mask: {})",
                total_skipped,
                self.boxes_skipped_out_of_bounds,
                self.boxes_skipped_empty_mask
            );
        }
    }
}
