use clap::{Parser, ValueEnum};
use std::error::Error;
use std::path::Path;

use crate::types::ClassMap;
use crate::utils::read_class_map_json;

/// Command-line arguments for converting semantic mask images to YOLO labels.
#[derive(Parser, Debug, Clone)]
#[command(name = "mask2yolo", version, long_about = None)]
pub struct MaskArgs {
    /// Directory containing the train/test/valid mask folders
    #[arg(short = 'r', long = "root_dir")]
    pub root_dir: String,

    /// Directory to write the per-split labels/ and images/ trees into
    #[arg(short = 'o', long = "output_dir")]
    pub output_dir: String,

    /// Inline pixel-to-class pairs, e.g. '0:0,1:1'
    #[arg(
        long = "class_map",
        use_value_delimiter = true,
        value_parser = parse_class_pair,
        conflicts_with = "class_map_json"
    )]
    pub class_map: Vec<(u8, u32)>,

    /// JSON file mapping pixel values to class ids, e.g. {"0": 0, "1": 1}
    #[arg(long = "class_map_json")]
    pub class_map_json: Option<String>,

    /// Output geometry for label lines: 'bbox' or 'polygon'
    #[arg(
        long = "output_format",
        visible_alias = "format",
        value_enum,
        default_value = "bbox"
    )]
    pub output_format: Format,
}

impl MaskArgs {
    /// Resolve the class mapping from inline pairs or the JSON file.
    pub fn to_class_map(&self) -> Result<ClassMap, Box<dyn Error>> {
        if let Some(path) = &self.class_map_json {
            read_class_map_json(Path::new(path))
        } else {
            Ok(ClassMap::from_pairs(&self.class_map))
        }
    }
}

/// Command-line arguments for rendering SAM overlays from VOC bounding boxes.
#[derive(Parser, Debug, Clone)]
#[command(name = "voc2overlay", version, long_about = None)]
pub struct OverlayArgs {
    /// Dataset directory containing JPEGImages/ and Annotations/
    #[arg(short = 'd', long = "dataset_dir")]
    pub dataset_dir: String,

    /// Directory to write overlay images into
    #[arg(short = 'o', long = "output_dir")]
    pub output_dir: String,

    /// Path to the SAM image encoder ONNX model
    #[arg(long = "encoder")]
    pub encoder: String,

    /// Path to the SAM mask decoder ONNX model
    #[arg(long = "decoder")]
    pub decoder: String,

    /// Intra-op thread count for the ONNX Runtime sessions
    #[arg(long = "threads", default_value_t = 4)]
    pub threads: usize,

    /// Seed for the overlay color generator
    #[arg(long = "seed", default_value_t = 42)]
    pub seed: u64,
}

// Enumeration for the label geometry format
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum Format {
    Polygon,
    Bbox,
}

// Parse one 'PIXEL:CLASS' mapping entry
pub fn parse_class_pair(s: &str) -> Result<(u8, u32), String> {
    let (pixel, class_id) = s
        .split_once(':')
        .ok_or_else(|| format!("expected PIXEL:CLASS, got '{}'", s))?;
    let pixel = pixel
        .trim()
        .parse::<u8>()
        .map_err(|e| format!("invalid pixel value '{}': {}", pixel, e))?;
    let class_id = class_id
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid class id '{}': {}", class_id, e))?;
    Ok((pixel, class_id))
}
