//! Box-prompted segmentation through ONNX Runtime.

use image::RgbImage;
use ndarray::{Array1, Array2, Array3, Array4};
use ort::session::Session;
use ort::value::TensorRef;
use std::error::Error;
use std::path::Path;

use crate::types::{BinaryMask, BoundingBox};

pub type SegmentResult<T> = Result<T, Box<dyn Error>>;

// SAM pixel normalization constants.
const PIXEL_MEAN: [f32; 3] = [123.675, 116.28, 103.53];
const PIXEL_STD: [f32; 3] = [58.395, 57.12, 57.375];

// Encoder input resolution; the longest image side is scaled to this.
const INPUT_SIZE: usize = 1024;

/// Seam between the overlay pipeline and the segmentation backend.
///
/// `set_image` runs the per-image work once; `predict_box` is then called
/// per bounding box in original image coordinates.
pub trait BoxSegmenter {
    fn set_image(&mut self, image: &RgbImage) -> SegmentResult<()>;
    fn predict_box(&mut self, bbox: &BoundingBox) -> SegmentResult<BinaryMask>;
}

/// A SAM encoder/decoder ONNX pair, loaded once and reused across images.
///
/// Tensor names follow the samexporter-style SAM exports: the encoder
/// takes `input_image` and yields `image_embeddings`; the decoder takes
/// the embeddings plus a point prompt and yields `masks` upsampled to the
/// original image size.
pub struct SamSession {
    encoder: Session,
    decoder: Session,
    embeddings: Option<Array4<f32>>,
    scale: f32,
    image_size: (u32, u32),
}

impl SamSession {
    /// Load both sessions from ONNX files.
    pub fn from_files(encoder: &Path, decoder: &Path, threads: usize) -> SegmentResult<Self> {
        Ok(Self {
            encoder: load_session(encoder, threads)?,
            decoder: load_session(decoder, threads)?,
            embeddings: None,
            scale: 1.0,
            image_size: (0, 0),
        })
    }
}

fn load_session(path: &Path, threads: usize) -> SegmentResult<Session> {
    let session = Session::builder()?
        .with_intra_threads(threads)?
        .commit_from_file(path)?;
    Ok(session)
}

impl BoxSegmenter for SamSession {
    fn set_image(&mut self, image: &RgbImage) -> SegmentResult<()> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err("cannot embed an empty image".into());
        }
        let scale = INPUT_SIZE as f32 / width.max(height) as f32;
        let scaled_w = (width as f32 * scale).round().max(1.0) as u32;
        let scaled_h = (height as f32 * scale).round().max(1.0) as u32;
        let resized = image::imageops::resize(
            image,
            scaled_w,
            scaled_h,
            image::imageops::FilterType::Triangle,
        );

        // Normalized CHW input, zero-padded to the square encoder size
        let mut input = Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                input[[0, c, y as usize, x as usize]] =
                    (pixel[c] as f32 - PIXEL_MEAN[c]) / PIXEL_STD[c];
            }
        }

        let input_tensor = TensorRef::from_array_view(&input)?;
        let outputs = self.encoder.run(ort::inputs!["input_image" => input_tensor])?;
        let (shape, data) = outputs["image_embeddings"].try_extract_tensor::<f32>()?;
        if shape.len() != 4 {
            return Err(format!("unexpected embedding shape {:?}", shape).into());
        }
        let dims = (
            shape[0] as usize,
            shape[1] as usize,
            shape[2] as usize,
            shape[3] as usize,
        );
        self.embeddings = Some(Array4::from_shape_vec(dims, data.to_vec())?);
        self.scale = scale;
        self.image_size = (width, height);
        Ok(())
    }

    fn predict_box(&mut self, bbox: &BoundingBox) -> SegmentResult<BinaryMask> {
        let embeddings = self
            .embeddings
            .as_ref()
            .ok_or("set_image must be called before predict_box")?;
        let (width, height) = self.image_size;

        // Box prompt: top-left and bottom-right corners, SAM labels 2 and 3
        let coords = Array3::from_shape_vec(
            (1, 2, 2),
            vec![
                bbox.xmin as f32 * self.scale,
                bbox.ymin as f32 * self.scale,
                bbox.xmax as f32 * self.scale,
                bbox.ymax as f32 * self.scale,
            ],
        )?;
        let labels = Array2::from_shape_vec((1, 2), vec![2.0f32, 3.0])?;
        let mask_input = Array4::<f32>::zeros((1, 1, 256, 256));
        let has_mask_input = Array1::<f32>::zeros(1);
        let orig_im_size = Array1::from_vec(vec![height as f32, width as f32]);

        let outputs = self.decoder.run(ort::inputs![
            "image_embeddings" => TensorRef::from_array_view(embeddings)?,
            "point_coords" => TensorRef::from_array_view(&coords)?,
            "point_labels" => TensorRef::from_array_view(&labels)?,
            "mask_input" => TensorRef::from_array_view(&mask_input)?,
            "has_mask_input" => TensorRef::from_array_view(&has_mask_input)?,
            "orig_im_size" => TensorRef::from_array_view(&orig_im_size)?
        ])?;

        let (shape, data) = outputs["masks"].try_extract_tensor::<f32>()?;
        if shape.len() != 4 || shape[2] as u32 != height || shape[3] as u32 != width {
            return Err(format!("unexpected decoder output shape {:?}", shape).into());
        }

        // Logits above zero are mask pixels
        let mask_width = shape[3] as usize;
        let mask = BinaryMask::from_fn(width, height, |x, y| {
            data[y as usize * mask_width + x as usize] > 0.0
        });
        Ok(mask)
    }
}
