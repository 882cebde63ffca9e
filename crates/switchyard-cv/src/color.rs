//! Marker color classification over HSV statistics
//!
//! Hue uses OpenCV's 8-bit convention (0..180), saturation and value 0..255.

use image::RgbImage;
use switchyard_core::Color;

/// Hue bands for the single-hue palette, in tie-break order
const HUE_BANDS: [(Color, u8, u8); 5] = [
    (Color::Red, 161, 170),
    (Color::Green, 55, 65),
    (Color::Blue, 95, 105),
    (Color::Yellow, 20, 30),
    (Color::Violet, 140, 150),
];

const PALE_SATURATION: f64 = 50.0;
const WHITE_VALUE: f64 = 200.0;
const STRIPED_SATURATION: f64 = 150.0;
const STRIPED_SATURATION_SPREAD: f64 = 95.0;
const STRIPED_VALUE_SPREAD: f64 = 40.0;
/// Dominant hue must be less than this many times the runner-up for a two-tone marker
const TWO_TONE_RATIO: f64 = 4.0;
const DARK_BAND_VALUE_SPREAD: f64 = 55.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let (rf, gf, bf) = (r as f64, g as f64, b as f64);
        let max = rf.max(gf).max(bf);
        let min = rf.min(gf).min(bf);
        let diff = max - min;

        let s = if max > 0.0 { diff / max * 255.0 } else { 0.0 };
        let mut h = if diff == 0.0 {
            0.0
        } else if max == rf {
            60.0 * (gf - bf) / diff
        } else if max == gf {
            120.0 + 60.0 * (bf - rf) / diff
        } else {
            240.0 + 60.0 * (rf - gf) / diff
        };
        if h < 0.0 {
            h += 360.0;
        }
        let h = (h / 2.0).round() as u32 % 180;

        Self {
            h: h as u8,
            s: s.round() as u8,
            v: max as u8,
        }
    }
}

fn mean_and_spread(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Classify a marker crop; pure-white pixels are treated as background.
///
/// Returns `None` when the crop holds no usable pixels or none falls in a
/// known hue band.
pub fn classify(crop: &RgbImage) -> Option<Color> {
    let pixels: Vec<Hsv> = crop
        .pixels()
        .filter(|p| p.0 != [255, 255, 255])
        .map(|p| Hsv::from_rgb(p.0[0], p.0[1], p.0[2]))
        .collect();
    if pixels.is_empty() {
        return None;
    }

    let saturation: Vec<f64> = pixels.iter().map(|p| p.s as f64).collect();
    let value: Vec<f64> = pixels.iter().map(|p| p.v as f64).collect();
    let (mean_s, spread_s) = mean_and_spread(&saturation);
    let (mean_v, spread_v) = mean_and_spread(&value);

    if mean_s < PALE_SATURATION {
        return Some(if mean_v > WHITE_VALUE { Color::White } else { Color::Black });
    }
    if mean_s < STRIPED_SATURATION
        && spread_s > STRIPED_SATURATION_SPREAD
        && spread_v < STRIPED_VALUE_SPREAD
    {
        return Some(Color::RedWhite);
    }

    let mut ranked: Vec<(Color, usize)> = HUE_BANDS
        .iter()
        .map(|&(color, lo, hi)| {
            let count = pixels.iter().filter(|p| p.h >= lo && p.h < hi).count();
            (color, count)
        })
        .collect();
    // stable, so ties keep band order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let (first, first_count) = ranked[0];
    let (second, second_count) = ranked[1];
    if first_count == 0 {
        return None;
    }

    if second_count != 0 && (first_count as f64 / second_count as f64) < TWO_TONE_RATIO {
        if let Some(two_tone) = first.combined(second) {
            return Some(two_tone);
        }
    }

    if spread_v > DARK_BAND_VALUE_SPREAD {
        if let Some(dark) = first.with_black() {
            return Some(dark);
        }
    }

    Some(first)
}
