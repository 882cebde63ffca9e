use serde::{Deserialize, Serialize};
use std::fmt;

use super::color::Color;

/// Pixel coordinates of a marker in the captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the four grid-adjacent directions around a cell.
///
/// The declaration order doubles as the order in which neighbors are
/// examined and outgoing directions are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Heading {
    Up,
    Down,
    Left,
    Right,
}

impl Heading {
    pub const ALL: [Heading; 4] = [Heading::Up, Heading::Down, Heading::Left, Heading::Right];

    pub fn index(self) -> usize {
        match self {
            Heading::Up => 0,
            Heading::Down => 1,
            Heading::Left => 2,
            Heading::Right => 3,
        }
    }

    /// The other member of this heading's axis pair
    pub fn opposite(self) -> Heading {
        match self {
            Heading::Up => Heading::Down,
            Heading::Down => Heading::Up,
            Heading::Left => Heading::Right,
            Heading::Right => Heading::Left,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Heading::Up | Heading::Down)
    }

    /// Row/column step for this heading
    pub fn offset(self) -> (isize, isize) {
        match self {
            Heading::Up => (-1, 0),
            Heading::Down => (1, 0),
            Heading::Left => (0, -1),
            Heading::Right => (0, 1),
        }
    }
}

/// A track switch with two selectable outgoing edges
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gate {
    pub directions: Vec<usize>,
    /// Currently desired outgoing node
    pub state: Option<usize>,
    /// Last physically actuated outgoing node
    pub ostate: Option<usize>,
    pub incoming: Option<Heading>,
    pub distance: Option<u32>,
}

impl Gate {
    /// A gate whose directions are populated has been reached by discovery
    pub fn is_discovered(&self) -> bool {
        !self.directions.is_empty()
    }

    pub fn is_pending(&self) -> bool {
        self.state != self.ostate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Station {
    pub color: Color,
}

/// Synthetic cell of the entry run, outside the detected board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackCell {
    pub distance: u32,
    pub incoming: Heading,
    pub next: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointKind {
    Gate(Gate),
    Station(Station),
    TrackCell(TrackCell),
}

/// A node of the routing graph
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub index: usize,
    pub position: Option<Position>,
    pub kind: PointKind,
}

impl Point {
    pub fn gate(index: usize, position: Position) -> Self {
        Self {
            index,
            position: Some(position),
            kind: PointKind::Gate(Gate::default()),
        }
    }

    pub fn station(index: usize, position: Position, color: Color) -> Self {
        Self {
            index,
            position: Some(position),
            kind: PointKind::Station(Station { color }),
        }
    }

    pub fn track_cell(index: usize, cell: TrackCell) -> Self {
        Self {
            index,
            position: None,
            kind: PointKind::TrackCell(cell),
        }
    }

    pub fn is_gate(&self) -> bool {
        matches!(self.kind, PointKind::Gate(_))
    }

    pub fn is_station(&self) -> bool {
        matches!(self.kind, PointKind::Station(_))
    }

    pub fn as_gate(&self) -> Option<&Gate> {
        match &self.kind {
            PointKind::Gate(gate) => Some(gate),
            _ => None,
        }
    }

    pub fn as_gate_mut(&mut self) -> Option<&mut Gate> {
        match &mut self.kind {
            PointKind::Gate(gate) => Some(gate),
            _ => None,
        }
    }

    pub fn station_color(&self) -> Option<Color> {
        match &self.kind {
            PointKind::Station(station) => Some(station.color),
            _ => None,
        }
    }

    /// Outgoing edges of the static direction graph
    pub fn directions(&self) -> &[usize] {
        match &self.kind {
            PointKind::Gate(gate) => &gate.directions,
            PointKind::TrackCell(cell) => std::slice::from_ref(&cell.next),
            PointKind::Station(_) => &[],
        }
    }

    /// Hop count from the entry, when discovery assigned one
    pub fn distance(&self) -> Option<u32> {
        match &self.kind {
            PointKind::Gate(gate) => gate.distance,
            PointKind::TrackCell(cell) => Some(cell.distance),
            PointKind::Station(_) => None,
        }
    }

    pub fn incoming(&self) -> Option<Heading> {
        match &self.kind {
            PointKind::Gate(gate) => gate.incoming,
            PointKind::TrackCell(cell) => Some(cell.incoming),
            PointKind::Station(_) => None,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = self
            .position
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        match &self.kind {
            PointKind::Gate(gate) => write!(
                f,
                "#{} gate at {} dirs={:?} state={:?} ostate={:?} incoming={:?} distance={:?}",
                self.index, at, gate.directions, gate.state, gate.ostate, gate.incoming, gate.distance
            ),
            PointKind::Station(station) => {
                write!(f, "#{} station at {} color={}", self.index, at, station.color)
            }
            PointKind::TrackCell(cell) => write!(
                f,
                "#{} track distance={} next={} incoming={:?}",
                self.index, cell.distance, cell.next, cell.incoming
            ),
        }
    }
}
