//! Image processing utilities using opencv-match conversions

use crate::Result;
use anyhow::Context;
use image::{GrayImage, RgbImage};
use opencv::{core::Mat, prelude::*};
use opencv_match::prelude::*;
use std::path::Path;

/// Image utility functions leveraging opencv-match conversions
pub struct ImageUtils;

impl ImageUtils {
    /// Load an image file as RGB
    pub fn load_rgb<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
        Ok(image::open(&path)
            .with_context(|| format!("Failed to open image: {:?}", path.as_ref()))?
            .to_rgb8())
    }

    /// Convert image::RgbImage to a BGR Mat using opencv-match
    pub fn rgb_to_mat(rgb_image: &RgbImage) -> Result<Mat> {
        rgb_image
            .try_into_cv()
            .context("Failed to convert RGB image to OpenCV Mat")
    }

    /// Convert a BGR Mat back to image::RgbImage using opencv-match
    pub fn mat_to_rgb(mat: &Mat) -> Result<RgbImage> {
        mat.try_into_cv()
            .context("Failed to convert OpenCV Mat to RGB image")
    }

    /// Grayscale Mat of an RGB frame
    pub fn rgb_to_gray_mat(rgb_image: &RgbImage) -> Result<Mat> {
        let color = Self::rgb_to_mat(rgb_image)?;
        opencv_match::convert::mat_to_grayscale(&color, true)
            .context("Failed to convert image to grayscale")
    }

    /// Copy a single-channel image into an owned 8-bit Mat
    pub fn gray_to_mat(gray: &GrayImage) -> Result<Mat> {
        let (width, height) = gray.dimensions();
        let view = Mat::new_rows_cols_with_data(height as i32, width as i32, gray.as_raw().as_slice())
            .context("Failed to wrap grayscale buffer")?;
        view.try_clone().context("Failed to copy grayscale Mat")
    }

    /// Row-major bytes of a continuous single-channel Mat
    pub fn gray_bytes(mat: &Mat) -> Result<&[u8]> {
        mat.data_bytes().context("Mat is not a continuous 8-bit buffer")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn test_image_conversions() -> Result<()> {
        let rgb_img = RgbImage::from_pixel(100, 60, Rgb([10, 20, 30]));

        let mat = ImageUtils::rgb_to_mat(&rgb_img)?;
        let rgb_back = ImageUtils::mat_to_rgb(&mat)?;

        assert_eq!(rgb_img.dimensions(), rgb_back.dimensions());
        assert_eq!(rgb_back.get_pixel(5, 5), &Rgb([10, 20, 30]));
        Ok(())
    }

    #[test]
    fn test_gray_mat_keeps_layout() -> Result<()> {
        let gray = GrayImage::from_fn(40, 30, |x, y| Luma([(x + y) as u8]));
        let mat = ImageUtils::gray_to_mat(&gray)?;

        assert_eq!(mat.rows(), 30);
        assert_eq!(mat.cols(), 40);
        assert_eq!(ImageUtils::gray_bytes(&mat)?, gray.as_raw().as_slice());
        Ok(())
    }
}
