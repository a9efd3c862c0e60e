//! Pascal-VOC annotation reading.

use std::error::Error;
use std::fs;
use std::path::Path;

use crate::types::BoundingBox;

/// Read the `object/bndbox` boxes from a VOC XML annotation file.
///
/// Objects without a `bndbox` child are skipped. A missing or unparsable
/// coordinate is an error so the caller can drop the whole image.
pub fn read_boxes(xml_path: &Path) -> Result<Vec<BoundingBox>, Box<dyn Error>> {
    let text = fs::read_to_string(xml_path)?;
    let doc = roxmltree::Document::parse(&text)?;

    let mut boxes = Vec::new();
    for object in doc
        .root_element()
        .children()
        .filter(|n| n.has_tag_name("object"))
    {
        let Some(bndbox) = object.children().find(|n| n.has_tag_name("bndbox")) else {
            continue;
        };
        boxes.push(BoundingBox {
            xmin: read_coord(bndbox, "xmin")?,
            ymin: read_coord(bndbox, "ymin")?,
            xmax: read_coord(bndbox, "xmax")?,
            ymax: read_coord(bndbox, "ymax")?,
        });
    }
    Ok(boxes)
}

fn read_coord(bndbox: roxmltree::Node, name: &str) -> Result<f64, Box<dyn Error>> {
    let text = bndbox
        .children()
        .find(|n| n.has_tag_name(name))
        .and_then(|n| n.text())
        .ok_or_else(|| format!("missing {} in bndbox", name))?;
    let value = text
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid {} '{}': {}", name, text.trim(), e))?;
    Ok(value)
}
