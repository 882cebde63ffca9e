//! Discrete board grid and its calibration from detected markers

use std::fmt;
use tracing::{debug, warn};

use super::point::{Heading, Point, Position};
use super::Graph;
use crate::config::GridConfig;
use crate::detection::{Marker, MarkerKind};
use crate::error::{GraphError, Result};

pub const ROWS: usize = 7;
pub const COLS: usize = 5;

/// Row/column address of a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Adjacent cell, or `None` past the outer boundary
    pub fn step(self, heading: Heading) -> Option<Cell> {
        let (dr, dc) = heading.offset();
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        (row < ROWS && col < COLS).then_some(Cell { row, col })
    }

    /// Heading that leaves the grid from this cell, if it sits on the boundary
    pub fn outward(self) -> Option<Heading> {
        if self.row == 0 {
            Some(Heading::Up)
        } else if self.row == ROWS - 1 {
            Some(Heading::Down)
        } else if self.col == 0 {
            Some(Heading::Left)
        } else if self.col == COLS - 1 {
            Some(Heading::Right)
        } else {
            None
        }
    }
}

/// Fixed-size matrix of point indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    cells: [[Option<usize>; COLS]; ROWS],
}

impl Grid {
    pub fn new() -> Self {
        Self {
            cells: [[None; COLS]; ROWS],
        }
    }

    pub fn get(&self, cell: Cell) -> Option<usize> {
        self.cells[cell.row][cell.col]
    }

    pub fn set(&mut self, cell: Cell, index: usize) -> Option<usize> {
        self.cells[cell.row][cell.col].replace(index)
    }

    pub fn is_empty_at(&self, cell: Cell) -> bool {
        self.get(cell).is_none()
    }

    /// Cell holding `index`
    pub fn locate(&self, index: usize) -> Option<Cell> {
        self.occupied()
            .find(|&(_, idx)| idx == index)
            .map(|(cell, _)| cell)
    }

    pub fn row(&self, row: usize) -> impl Iterator<Item = usize> + '_ {
        self.cells[row].iter().flatten().copied()
    }

    pub fn column(&self, col: usize) -> impl Iterator<Item = usize> + '_ {
        self.cells.iter().filter_map(move |row| row[col])
    }

    pub fn occupied(&self) -> impl Iterator<Item = (Cell, usize)> + '_ {
        self.cells.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(c, idx)| idx.map(|idx| (Cell::new(r, c), idx)))
        })
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            let line: Vec<String> = row
                .iter()
                .map(|idx| match idx {
                    Some(idx) => format!("{:>3}", idx),
                    None => "  .".to_string(),
                })
                .collect();
            writeln!(f, "[{} ]", line.join(""))?;
        }
        Ok(())
    }
}

/// Calibrated bounding box and cell size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub min_x: i32,
    pub min_y: i32,
    pub cell_width: i32,
    pub cell_height: i32,
}

impl GridLayout {
    /// Cell containing a pixel position, `None` outside the 7x5 extent
    pub fn cell_of(&self, position: Position) -> Option<Cell> {
        let col = (position.x - self.min_x).div_euclid(self.cell_width);
        let row = (position.y - self.min_y).div_euclid(self.cell_height);
        if row < 0 || col < 0 || row >= ROWS as i32 || col >= COLS as i32 {
            return None;
        }
        Some(Cell::new(row as usize, col as usize))
    }
}

/// Builds the point list and grid from the calibration markers
pub struct GridBuilder {
    padding: i32,
}

impl GridBuilder {
    pub fn new(config: &GridConfig) -> Self {
        Self {
            padding: config.padding,
        }
    }

    /// Index stations first, then gates, each in detector order
    pub fn build(&self, markers: &[Marker]) -> Result<Graph> {
        let layout = self.calibrate(markers)?;

        let stations = markers
            .iter()
            .filter(|m| matches!(m.kind, MarkerKind::Station(_)));
        let gates = markers.iter().filter(|m| m.kind == MarkerKind::Gate);

        let mut points = Vec::with_capacity(markers.len() + 3);
        let mut grid = Grid::new();

        for marker in stations.chain(gates) {
            let index = points.len();
            points.push(match marker.kind {
                MarkerKind::Station(color) => Point::station(index, marker.position, color),
                MarkerKind::Gate => Point::gate(index, marker.position),
            });

            match layout.cell_of(marker.position) {
                Some(cell) => {
                    if let Some(previous) = grid.set(cell, index) {
                        warn!(
                            "Cell ({}, {}) shared by #{} and #{}, keeping #{}",
                            cell.row, cell.col, previous, index, index
                        );
                    }
                }
                None => warn!("Marker #{} at {} falls outside the grid", index, marker.position),
            }
        }

        debug!(
            "Grid calibrated: origin=({}, {}) cell={}x{} points={}",
            layout.min_x,
            layout.min_y,
            layout.cell_width,
            layout.cell_height,
            points.len()
        );

        let mut graph = Graph::new(points, grid, layout);
        graph.align_positions();
        Ok(graph)
    }

    fn calibrate(&self, markers: &[Marker]) -> Result<GridLayout> {
        let first = markers.first().ok_or(GraphError::EmptyLayout)?.position;
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
        for marker in markers {
            min_x = min_x.min(marker.position.x);
            max_x = max_x.max(marker.position.x);
            min_y = min_y.min(marker.position.y);
            max_y = max_y.max(marker.position.y);
        }

        min_x -= self.padding;
        max_x += self.padding;
        min_y -= self.padding;
        max_y += self.padding;

        let cell_width = (max_x - min_x) / COLS as i32;
        let cell_height = (max_y - min_y) / ROWS as i32;
        if cell_width <= 0 || cell_height <= 0 {
            return Err(GraphError::DegenerateLayout {
                rows: ROWS,
                cols: COLS,
                cell_width,
                cell_height,
            });
        }

        Ok(GridLayout {
            min_x,
            min_y,
            cell_width,
            cell_height,
        })
    }
}

/// Rounded mean of a set of coordinates, `None` when empty
pub(crate) fn rounded_mean(values: &[i32]) -> Option<i32> {
    if values.is_empty() {
        return None;
    }
    let sum: i64 = values.iter().map(|&v| v as i64).sum();
    Some((sum as f64 / values.len() as f64).round_ties_even() as i32)
}
