//! Marker detector: stations and trains from bright blobs, gates from circles

use super::config::DetectionConfig;
use crate::color;
use crate::lines;
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::Context;
use image::{imageops, Rgb, RgbImage};
use opencv::{
    core::{self, Mat, Scalar, Size, Vec3f, Vector},
    imgproc,
    prelude::*,
};
use switchyard_core::{Color, Detector, LayoutScan, Marker, Position, TrainScan, TrainSighting};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlobKind {
    Station,
    Train,
}

/// A classified bright blob
#[derive(Debug, Clone)]
struct Blob {
    kind: BlobKind,
    position: Position,
    color: Option<Color>,
}

/// Main marker detector
pub struct MarkerDetector {
    config: DetectionConfig,
}

impl MarkerDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Stations in the frame, plus the count of station-sized blobs
    pub fn find_stations(&self, frame: &RgbImage) -> Result<(Vec<Marker>, usize)> {
        let (blobs, station_count) = self.scan_blobs(frame, BlobKind::Station)?;
        let stations = blobs
            .into_iter()
            .filter_map(|blob| match blob.color {
                Some(color) => Some(Marker::station(blob.position.x, blob.position.y, color)),
                None => {
                    warn!("Station at {} has no recognizable color", blob.position);
                    None
                }
            })
            .collect();
        Ok((stations, station_count))
    }

    /// Trains in the frame, plus the count of station-sized blobs
    pub fn find_trains(&self, frame: &RgbImage) -> Result<(Vec<TrainSighting>, usize)> {
        let (blobs, station_count) = self.scan_blobs(frame, BlobKind::Train)?;
        let trains = blobs
            .into_iter()
            .map(|blob| TrainSighting {
                position: blob.position,
                color: blob.color,
            })
            .collect();
        Ok((trains, station_count))
    }

    /// Gate centres from Hough circles on the blurred grayscale frame
    pub fn find_gates(&self, frame: &RgbImage) -> Result<Vec<Marker>> {
        let params = &self.config.gates;
        let gray = ImageUtils::rgb_to_gray_mat(frame)?;
        let mut blurred = Mat::default();
        imgproc::blur_def(&gray, &mut blurred, Size::new(params.blur, params.blur))?;

        let mut circles = Vector::<Vec3f>::new();
        imgproc::hough_circles(
            &blurred,
            &mut circles,
            imgproc::HOUGH_GRADIENT,
            params.dp,
            params.min_distance,
            params.param1,
            params.param2,
            params.radius_range.0,
            params.radius_range.1,
        )
        .context("Circle detection failed")?;

        let gates: Vec<Marker> = circles
            .iter()
            .map(|circle| Marker::gate(circle[0].round() as i32, circle[1].round() as i32))
            .collect();
        debug!("Found {} gates", gates.len());
        Ok(gates)
    }

    /// Threshold, find external contours and classify those of `wanted` kind.
    ///
    /// Every station-sized blob is counted, whatever `wanted` is.
    fn scan_blobs(&self, frame: &RgbImage, wanted: BlobKind) -> Result<(Vec<Blob>, usize)> {
        let (width, height) = frame.dimensions();
        let frame_area = (width as f64) * (height as f64);
        if frame_area == 0.0 {
            return Ok((Vec::new(), 0));
        }

        let gray = ImageUtils::rgb_to_gray_mat(frame)?;
        let mut binary = Mat::default();
        imgproc::threshold(
            &gray,
            &mut binary,
            self.config.binary_threshold,
            255.0,
            imgproc::THRESH_BINARY,
        )?;

        let mut contours = Vector::<Vector<core::Point>>::new();
        imgproc::find_contours(
            &binary,
            &mut contours,
            imgproc::RETR_EXTERNAL,
            imgproc::CHAIN_APPROX_SIMPLE,
            core::Point::default(),
        )
        .context("Contour search failed")?;

        let masked = self.whiten_background(frame, &contours)?;
        let mut blobs = Vec::new();
        let mut station_count = 0;

        for contour in contours.iter() {
            let fraction = imgproc::contour_area(&contour, false)? / frame_area;
            if fraction < self.config.noise_fraction {
                continue;
            }
            let (kind, divisor) = if fraction < self.config.train_fraction {
                (BlobKind::Train, self.config.train_padding_divisor)
            } else {
                station_count += 1;
                (BlobKind::Station, self.config.station_padding_divisor)
            };
            if kind != wanted {
                continue;
            }

            let moments = imgproc::moments(&contour, false)?;
            if moments.m00 == 0.0 {
                continue;
            }
            let position = Position::new(
                (moments.m10 / moments.m00) as i32,
                (moments.m01 / moments.m00) as i32,
            );
            let crop = crop_around(&masked, position, width / divisor.max(1));
            let color = color::classify(&crop);

            if kind == BlobKind::Train && color == Some(Color::White) && self.is_track(&crop)? {
                debug!("Dropping white blob at {}: it is a piece of track", position);
                continue;
            }
            blobs.push(Blob { kind, position, color });
        }

        Ok((blobs, station_count))
    }

    /// Frame copy keeping contour interiors and painting the rest white
    fn whiten_background(
        &self,
        frame: &RgbImage,
        contours: &Vector<Vector<core::Point>>,
    ) -> Result<RgbImage> {
        let (width, height) = frame.dimensions();
        let mut mask = Mat::new_rows_cols_with_default(
            height as i32,
            width as i32,
            core::CV_8UC1,
            Scalar::all(0.0),
        )?;
        imgproc::fill_poly(
            &mut mask,
            contours,
            Scalar::all(255.0),
            imgproc::LINE_8,
            0,
            core::Point::default(),
        )?;
        let inside = ImageUtils::gray_bytes(&mask)?;

        Ok(RgbImage::from_fn(width, height, |x, y| {
            if inside[(y * width + x) as usize] != 0 {
                *frame.get_pixel(x, y)
            } else {
                Rgb([255, 255, 255])
            }
        }))
    }

    /// Straight edges inside a white blob mean track, not a train
    fn is_track(&self, crop: &RgbImage) -> Result<bool> {
        if crop.width() == 0 || crop.height() == 0 {
            return Ok(false);
        }
        let gray = ImageUtils::gray_to_mat(&imageops::grayscale(crop))?;
        lines::has_edge_segment(&gray, self.config.canny, &self.config.train_lines)
    }
}

/// Square crop of half-size `padding` around `center`, clamped to the image
fn crop_around(image: &RgbImage, center: Position, padding: u32) -> RgbImage {
    let padding = padding as i64;
    let clamp = |v: i64, limit: u32| v.clamp(0, limit as i64) as u32;
    let x0 = clamp(center.x as i64 - padding, image.width());
    let y0 = clamp(center.y as i64 - padding, image.height());
    let x1 = clamp(center.x as i64 + padding, image.width());
    let y1 = clamp(center.y as i64 + padding, image.height());
    imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image()
}

impl Detector for MarkerDetector {
    fn detect_layout(&self, frame: &RgbImage) -> anyhow::Result<LayoutScan> {
        let (mut markers, station_count) = self.find_stations(frame)?;
        markers.extend(self.find_gates(frame)?);
        Ok(LayoutScan {
            markers,
            station_count,
        })
    }

    fn detect_trains(&self, frame: &RgbImage) -> anyhow::Result<TrainScan> {
        let (trains, station_count) = self.find_trains(frame)?;
        Ok(TrainScan {
            trains,
            station_count,
        })
    }
}
