//! Routing graph: indexed points laid out on the board grid

pub mod color;
pub mod discovery;
pub mod grid;
pub mod point;

pub use color::Color;
pub use discovery::{DirectionResolver, Entry};
pub use grid::{Cell, Grid, GridBuilder, GridLayout, COLS, ROWS};
pub use point::{Gate, Heading, Point, PointKind, Position, Station, TrackCell};

use std::fmt;

use crate::error::{GraphError, Result};
use grid::rounded_mean;

/// Result of looking up the grid node under a pixel position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellLookup {
    Node(usize),
    /// Inside the grid but no node occupies the cell
    Empty,
    OutOfRange,
}

/// A gate whose desired state differs from the actuated one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Toggle {
    pub gate: usize,
    pub from: Option<usize>,
    pub to: usize,
    pub position: Position,
}

/// Points, grid and layout for one calibrated board.
///
/// Points are appended while the graph is built and never removed; after
/// discovery only gate state fields change.
#[derive(Debug, Clone)]
pub struct Graph {
    points: Vec<Point>,
    grid: Grid,
    layout: GridLayout,
    entry: Option<Entry>,
}

impl Graph {
    pub(crate) fn new(points: Vec<Point>, grid: Grid, layout: GridLayout) -> Self {
        Self {
            points,
            grid,
            layout,
            entry: None,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }

    pub(crate) fn point_mut(&mut self, index: usize) -> Result<&mut Point> {
        self.points
            .get_mut(index)
            .ok_or(GraphError::UnknownPoint(index))
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub(crate) fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn entry(&self) -> Option<&Entry> {
        self.entry.as_ref()
    }

    pub(crate) fn set_entry(&mut self, entry: Entry) {
        self.entry = Some(entry);
    }

    pub(crate) fn push_point(&mut self, point: Point) -> usize {
        debug_assert_eq!(point.index, self.points.len());
        let index = point.index;
        self.points.push(point);
        index
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Grid node containing a pixel position
    pub fn node_at(&self, position: Position) -> CellLookup {
        match self.layout.cell_of(position) {
            None => CellLookup::OutOfRange,
            Some(cell) => match self.grid.get(cell) {
                Some(index) => CellLookup::Node(index),
                None => CellLookup::Empty,
            },
        }
    }

    pub fn gates(&self) -> impl Iterator<Item = (usize, &Gate)> + '_ {
        self.points
            .iter()
            .filter_map(|point| point.as_gate().map(|gate| (point.index, gate)))
    }

    /// Destination for a color; with duplicates the last station wins
    pub fn station_for(&self, color: Color) -> Option<usize> {
        self.points
            .iter()
            .rev()
            .find(|point| point.station_color() == Some(color))
            .map(|point| point.index)
    }

    /// Select the outgoing node of a gate; non-gates are left alone
    pub fn set_state(&mut self, index: usize, next: usize) -> bool {
        match self.points.get_mut(index).and_then(Point::as_gate_mut) {
            Some(gate) => {
                gate.state = Some(next);
                true
            }
            None => false,
        }
    }

    /// Gates with a pending physical toggle, in index order
    pub fn pending_toggles(&self) -> Vec<Toggle> {
        self.points
            .iter()
            .filter_map(|point| {
                let gate = point.as_gate()?;
                let to = gate.state?;
                if !gate.is_pending() {
                    return None;
                }
                Some(Toggle {
                    gate: point.index,
                    from: gate.ostate,
                    to,
                    position: point.position?,
                })
            })
            .collect()
    }

    /// Record that a gate has been physically switched to `to`
    pub fn commit(&mut self, index: usize, to: usize) {
        if let Some(gate) = self.points.get_mut(index).and_then(Point::as_gate_mut) {
            gate.ostate = Some(to);
        }
    }

    /// Snap each row's `y` and each column's `x` to the members' rounded mean
    pub fn align_positions(&mut self) {
        for row in 0..ROWS {
            let members: Vec<usize> = self.grid.row(row).collect();
            let ys: Vec<i32> = members
                .iter()
                .filter_map(|&idx| self.points[idx].position.map(|p| p.y))
                .collect();
            if let Some(mean) = rounded_mean(&ys) {
                for idx in members {
                    if let Some(position) = self.points[idx].position.as_mut() {
                        position.y = mean;
                    }
                }
            }
        }

        for col in 0..COLS {
            let members: Vec<usize> = self.grid.column(col).collect();
            let xs: Vec<i32> = members
                .iter()
                .filter_map(|&idx| self.points[idx].position.map(|p| p.x))
                .collect();
            if let Some(mean) = rounded_mean(&xs) {
                for idx in members {
                    if let Some(position) = self.points[idx].position.as_mut() {
                        position.x = mean;
                    }
                }
            }
        }
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.grid)?;
        for point in &self.points {
            writeln!(f, "{}", point)?;
        }
        Ok(())
    }
}
