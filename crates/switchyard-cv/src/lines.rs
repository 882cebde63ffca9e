//! Straight-segment probes backed by the probabilistic Hough transform

use crate::detection::LineConfig;
use crate::utils::ImageUtils;
use crate::Result;
use image::GrayImage;
use opencv::{
    core::{Mat, Vec4i, Vector},
    imgproc,
    prelude::*,
};
use std::f64::consts::PI;
use switchyard_core::LineProbe;

/// Whether `image` holds at least one segment matching `config`
pub fn has_segment(image: &Mat, config: &LineConfig) -> Result<bool> {
    let mut segments = Vector::<Vec4i>::new();
    imgproc::hough_lines_p(
        image,
        &mut segments,
        1.0,
        PI / 180.0,
        config.threshold,
        config.min_length,
        config.max_gap,
    )?;
    Ok(!segments.is_empty())
}

/// Edge map of a grayscale crop followed by a segment search
pub fn has_edge_segment(image: &Mat, canny: (f64, f64), config: &LineConfig) -> Result<bool> {
    let mut edges = Mat::default();
    imgproc::canny(image, &mut edges, canny.0, canny.1, 3, false)?;
    has_segment(&edges, config)
}

/// Line probe over the binary track mask around a gate
pub struct HoughLineProbe {
    config: LineConfig,
}

impl HoughLineProbe {
    pub fn new(config: LineConfig) -> Self {
        Self { config }
    }
}

impl LineProbe for HoughLineProbe {
    fn has_line(&self, crop: &GrayImage) -> anyhow::Result<bool> {
        if crop.width() == 0 || crop.height() == 0 {
            return Ok(false);
        }
        let mat = ImageUtils::gray_to_mat(crop)?;
        has_segment(&mat, &self.config)
    }
}
