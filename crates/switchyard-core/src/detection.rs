//! Records produced by a frame detector

use crate::graph::{Color, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Station(Color),
    Gate,
}

/// A station or gate found in the calibration frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub position: Position,
    pub kind: MarkerKind,
}

impl Marker {
    pub fn station(x: i32, y: i32, color: Color) -> Self {
        Self {
            position: Position::new(x, y),
            kind: MarkerKind::Station(color),
        }
    }

    pub fn gate(x: i32, y: i32) -> Self {
        Self {
            position: Position::new(x, y),
            kind: MarkerKind::Gate,
        }
    }
}

/// Static board contents detected once at startup
#[derive(Debug, Clone, Default)]
pub struct LayoutScan {
    pub markers: Vec<Marker>,
    /// Every station-sized blob, including ones whose color was unusable
    pub station_count: usize,
}

/// A train seen in one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainSighting {
    pub position: Position,
    /// `None` when the detector could not resolve the color
    pub color: Option<Color>,
}

/// Moving contents of one frame
#[derive(Debug, Clone, Default)]
pub struct TrainScan {
    pub trains: Vec<TrainSighting>,
    pub station_count: usize,
}
