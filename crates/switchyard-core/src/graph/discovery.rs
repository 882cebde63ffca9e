//! Entry detection and gate direction discovery.
//!
//! Starting from the synthetic entry run, every reachable gate is classified
//! into an incoming edge, a dead-end and two switchable outgoing directions.
//! The walk uses an explicit stack so that board size never touches the call
//! stack, and a visited set so a cyclic layout cannot loop forever.

use image::{GrayImage, imageops};
use std::collections::HashSet;
use std::ops::Range;
use tracing::{debug, info, warn};

use super::grid::{Cell, COLS, ROWS};
use super::point::{Heading, Point, PointKind, Position, TrackCell};
use super::Graph;
use crate::config::DiscoveryConfig;
use crate::error::{GraphError, Result};
use crate::traits::LineProbe;

/// Hop distance of the innermost synthetic entry cell
const ENTRY_DEPTH: u32 = 2;

/// The synthetic run of track cells through which trains enter the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub column: usize,
    /// Side the trains come from (`Up` for the top edge)
    pub incoming: Heading,
    /// Point indices, outermost first
    pub cells: [usize; 3],
    pub gate: usize,
}

impl Entry {
    /// The innermost entry cell, adjacent to the entry gate
    pub fn inner(&self) -> usize {
        self.cells[2]
    }
}

/// Outcome of classifying a single gate
#[derive(Debug, Clone, PartialEq)]
struct Classification {
    incoming: Heading,
    dead_end: Heading,
    directions: Vec<usize>,
    state: Option<usize>,
}

/// Classifies gates using the grid plus local image heuristics
pub struct DirectionResolver<'a> {
    config: &'a DiscoveryConfig,
    frame: &'a GrayImage,
    probe: &'a dyn LineProbe,
}

impl<'a> DirectionResolver<'a> {
    pub fn new(config: &'a DiscoveryConfig, frame: &'a GrayImage, probe: &'a dyn LineProbe) -> Self {
        Self { config, frame, probe }
    }

    /// Locate the entry and classify every gate reachable from it
    pub fn resolve(&self, graph: &mut Graph) -> Result<Entry> {
        let entry = self.find_entry(graph)?;
        let discovered = self.discover(graph, &entry)?;
        info!(
            "Entry at column {} from {:?}, first gate #{}, {} gates discovered",
            entry.column, entry.incoming, entry.gate, discovered
        );
        Ok(entry)
    }

    /// Claim the entry run and append its synthetic track cells.
    ///
    /// A column qualifies through its top three cells when they are empty,
    /// otherwise through its bottom three. Columns are scanned left to right
    /// and the last qualifying column that borders a gate wins.
    pub fn find_entry(&self, graph: &mut Graph) -> Result<Entry> {
        let top = (Heading::Up, [0, 1, 2], 3);
        let bottom = (Heading::Down, [ROWS - 1, ROWS - 2, ROWS - 3], ROWS - 4);

        let mut chosen = None;
        for column in 0..COLS {
            let grid = graph.grid();
            let Some((incoming, rows, beyond)) = [top, bottom]
                .into_iter()
                .find(|(_, rows, _)| rows.iter().all(|&row| grid.is_empty_at(Cell::new(row, column))))
            else {
                continue;
            };

            let inner = rows[2];
            let mut candidates = vec![Cell::new(beyond, column)];
            if column > 0 {
                candidates.push(Cell::new(inner, column - 1));
            }
            if column + 1 < COLS {
                candidates.push(Cell::new(inner, column + 1));
            }

            let gate = candidates
                .into_iter()
                .filter_map(|cell| grid.get(cell))
                .find(|&idx| graph.point(idx).is_some_and(Point::is_gate));

            match gate {
                Some(gate) => {
                    debug!("Column {} can enter from {:?} at gate #{}", column, incoming, gate);
                    chosen = Some((column, incoming, rows, gate));
                }
                None => debug!("Column {} has an empty run but no adjacent gate", column),
            }
        }

        let Some((column, incoming, rows, gate)) = chosen else {
            return Err(GraphError::NoEntry);
        };

        let base = graph.len();
        let cells = [base, base + 1, base + 2];
        for (depth, (&row, &index)) in rows.iter().zip(cells.iter()).enumerate() {
            let next = if depth + 1 < cells.len() { cells[depth + 1] } else { gate };
            graph.push_point(Point::track_cell(
                index,
                TrackCell {
                    distance: depth as u32,
                    incoming,
                    next,
                },
            ));
            graph.grid_mut().set(Cell::new(row, column), index);
        }

        let entry = Entry {
            column,
            incoming,
            cells,
            gate,
        };
        graph.set_entry(entry);
        Ok(entry)
    }

    /// Depth-first walk from the entry gate; returns the number of gates
    /// classified
    pub fn discover(&self, graph: &mut Graph, entry: &Entry) -> Result<usize> {
        let mut stack = vec![(entry.inner(), entry.gate, ENTRY_DEPTH + 1)];
        let mut visited = HashSet::new();

        while let Some((prev, index, distance)) = stack.pop() {
            if !visited.insert(index) {
                continue;
            }

            let Some(found) = self.classify(graph, prev, index) else {
                continue;
            };

            debug!(
                "Gate #{}: incoming={:?} dead-end={:?} directions={:?} state={:?} distance={}",
                index, found.incoming, found.dead_end, found.directions, found.state, distance
            );
            if found.directions.len() != 2 {
                warn!("Gate #{} has {} outgoing directions", index, found.directions.len());
            }

            let point = graph.point_mut(index)?;
            let PointKind::Gate(gate) = &mut point.kind else {
                continue;
            };
            gate.directions = found.directions.clone();
            gate.state = found.state;
            gate.ostate = found.state;
            gate.incoming = Some(found.incoming);
            gate.distance = Some(distance);

            // reversed so the first direction is explored first
            for &next in found.directions.iter().rev() {
                let undiscovered = graph
                    .point(next)
                    .and_then(Point::as_gate)
                    .is_some_and(|gate| !gate.is_discovered());
                if undiscovered && !visited.contains(&next) {
                    stack.push((index, next, distance + 1));
                }
            }
        }

        Ok(visited.len())
    }

    fn classify(&self, graph: &Graph, prev: usize, index: usize) -> Option<Classification> {
        let grid = graph.grid();
        let Some(cell) = grid.locate(index) else {
            warn!("Gate #{} is not on the grid", index);
            return None;
        };
        let position = graph.point(index)?.position?;

        let neighbors = Heading::ALL.map(|heading| cell.step(heading).and_then(|c| grid.get(c)));
        let Some(incoming) = Heading::ALL
            .into_iter()
            .find(|h| neighbors[h.index()] == Some(prev))
        else {
            warn!("Gate #{} is not adjacent to #{}", index, prev);
            return None;
        };

        let crop = self.track_mask(position);
        let dead_end = self.dead_end(cell, incoming, &neighbors, &crop);
        let has_line = match self.probe.has_line(&crop) {
            Ok(found) => found,
            Err(err) => {
                warn!("Line probe failed for gate #{}: {:#}", index, err);
                false
            }
        };
        let selected = default_heading(incoming, dead_end, has_line);

        let directions = Heading::ALL
            .into_iter()
            .filter(|&h| h != incoming && h != dead_end)
            .filter_map(|h| neighbors[h.index()])
            .collect();

        Some(Classification {
            incoming,
            dead_end,
            directions,
            state: neighbors[selected.index()],
        })
    }

    /// The neighbor direction that is not connected to the gate
    fn dead_end(
        &self,
        cell: Cell,
        incoming: Heading,
        neighbors: &[Option<usize>; 4],
        crop: &GrayImage,
    ) -> Heading {
        if let Some(outward) = cell.outward().filter(|&h| h != incoming) {
            return outward;
        }

        let candidates = Heading::ALL.into_iter().filter(|&h| h != incoming);
        if let Some(open) = candidates.clone().find(|h| neighbors[h.index()].is_none()) {
            return open;
        }

        let mass = edge_mass(crop, self.config.edge_band);
        let mut best = Heading::ALL[0];
        let mut least = u64::MAX;
        for heading in candidates {
            if mass[heading.index()] < least {
                least = mass[heading.index()];
                best = heading;
            }
        }
        best
    }

    /// Square crop around a gate with dark track pixels set to 255
    fn track_mask(&self, center: Position) -> GrayImage {
        let (width, height) = self.frame.dimensions();
        let radius = self.config.crop_radius as i64;
        let clamp = |v: i64, max: u32| v.clamp(0, max as i64) as u32;

        let x0 = clamp(center.x as i64 - radius, width);
        let x1 = clamp(center.x as i64 + radius, width);
        let y0 = clamp(center.y as i64 - radius, height);
        let y1 = clamp(center.y as i64 + radius, height);

        let mut crop = imageops::crop_imm(self.frame, x0, y0, x1 - x0, y1 - y0).to_image();
        let threshold = self.config.track_threshold;
        for pixel in crop.pixels_mut() {
            pixel.0[0] = if pixel.0[0] > threshold { 0 } else { 255 };
        }
        crop
    }
}

/// Straight through when a line was seen, otherwise the perpendicular branch
fn default_heading(incoming: Heading, dead_end: Heading, has_line: bool) -> Heading {
    let straight = incoming.opposite();
    if has_line && straight != dead_end {
        return straight;
    }
    let (first, second) = if incoming.is_vertical() {
        (Heading::Left, Heading::Right)
    } else {
        (Heading::Up, Heading::Down)
    };
    if first == dead_end { second } else { first }
}

/// Bright-pixel mass along the top, bottom, left and right crop edges
fn edge_mass(mask: &GrayImage, band: u32) -> [u64; 4] {
    let (width, height) = mask.dimensions();
    let all_rows = 0..height;
    let all_cols = 0..width;
    let near = |len: u32| 0..band.min(len);
    // last `band` lines, excluding the final one
    let far = |len: u32| len.saturating_sub(band + 1)..len.saturating_sub(1);

    [
        band_sum(mask, near(height), all_cols.clone()),
        band_sum(mask, far(height), all_cols),
        band_sum(mask, all_rows.clone(), near(width)),
        band_sum(mask, all_rows, far(width)),
    ]
}

fn band_sum(mask: &GrayImage, rows: Range<u32>, cols: Range<u32>) -> u64 {
    rows.flat_map(|y| cols.clone().map(move |x| (x, y)))
        .map(|(x, y)| mask.get_pixel(x, y).0[0] as u64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::{graph_from, station};
    use crate::graph::{Color, Gate};
    use image::Luma;
    use std::cell::RefCell;

    struct FixedProbe(bool);

    impl LineProbe for FixedProbe {
        fn has_line(&self, _crop: &GrayImage) -> anyhow::Result<bool> {
            Ok(self.0)
        }
    }

    /// Remembers the size of every crop it is shown
    struct RecordingProbe(RefCell<Vec<(u32, u32)>>);

    impl LineProbe for RecordingProbe {
        fn has_line(&self, crop: &GrayImage) -> anyhow::Result<bool> {
            self.0.borrow_mut().push(crop.dimensions());
            Ok(false)
        }
    }

    fn white_frame() -> GrayImage {
        GrayImage::from_pixel(500, 700, Luma([255]))
    }

    /// Gate #3 at cell (3, 2) with stations on its left, right and below
    fn crossing() -> Graph {
        graph_from(
            vec![
                station(0, 3, 1, Color::Red),
                station(1, 3, 3, Color::Blue),
                station(2, 4, 2, Color::Green),
                Point::gate(3, Position::new(250, 350)),
            ],
            &[(3, 1, 0), (3, 3, 1), (4, 2, 2), (3, 2, 3)],
        )
    }

    /// Dark track running vertically through the gate and off to the right
    fn tee_frame() -> GrayImage {
        let mut frame = white_frame();
        for y in 0..700 {
            for x in 245..255 {
                frame.put_pixel(x, y, Luma([0]));
            }
        }
        for y in 345..355 {
            for x in 250..400 {
                frame.put_pixel(x, y, Luma([0]));
            }
        }
        frame
    }

    #[test]
    fn test_entry_run_from_top() -> Result<()> {
        let mut graph = crossing();
        let frame = white_frame();
        let config = DiscoveryConfig::default();
        let probe = FixedProbe(false);
        let entry = DirectionResolver::new(&config, &frame, &probe).find_entry(&mut graph)?;

        assert_eq!(entry.column, 2);
        assert_eq!(entry.incoming, Heading::Up);
        assert_eq!(entry.cells, [4, 5, 6]);
        assert_eq!(entry.gate, 3);
        assert_eq!(graph.len(), 7);
        assert_eq!(graph.grid().get(Cell::new(0, 2)), Some(4));
        assert_eq!(graph.grid().get(Cell::new(2, 2)), Some(6));
        for (depth, &idx) in entry.cells.iter().enumerate() {
            assert_eq!(graph.point(idx).unwrap().distance(), Some(depth as u32));
        }
        assert_eq!(graph.point(6).unwrap().directions(), &[3]);
        Ok(())
    }

    /// Undiscovered gate at the centre of cell `(row, col)`
    fn fresh_gate(index: usize, row: usize, col: usize) -> Point {
        Point::gate(index, Position::new(col as i32 * 100 + 50, row as i32 * 100 + 50))
    }

    fn gate_of(graph: &Graph, index: usize) -> Gate {
        graph.point(index).and_then(Point::as_gate).cloned().expect("gate")
    }

    #[test]
    fn test_last_qualifying_column_is_entry() -> Result<()> {
        let mut graph = graph_from(
            vec![fresh_gate(0, 3, 0), fresh_gate(1, 3, 3)],
            &[(3, 0, 0), (3, 3, 1)],
        );
        let frame = white_frame();
        let config = DiscoveryConfig::default();
        let probe = FixedProbe(false);
        let entry = DirectionResolver::new(&config, &frame, &probe).find_entry(&mut graph)?;

        assert_eq!(entry.column, 3);
        assert_eq!(entry.gate, 1);
        assert_eq!(entry.cells, [2, 3, 4]);
        assert_eq!(graph.grid().get(Cell::new(0, 3)), Some(2));
        assert!(graph.grid().is_empty_at(Cell::new(0, 0)));
        Ok(())
    }

    /// ```text
    ///        c0      c1      c2      c3
    ///   r3   red     Gb(5)   Ga(4)   .
    ///   r4   violet  Gd(7)   Gc(6)   .
    ///   r5   .       green   blue    .
    /// ```
    /// Gd is reachable from both Gb and Gc.
    fn branching() -> Graph {
        graph_from(
            vec![
                station(0, 3, 0, Color::Red),
                station(1, 5, 2, Color::Blue),
                station(2, 5, 1, Color::Green),
                station(3, 4, 0, Color::Violet),
                fresh_gate(4, 3, 2),
                fresh_gate(5, 3, 1),
                fresh_gate(6, 4, 2),
                fresh_gate(7, 4, 1),
            ],
            &[
                (3, 0, 0),
                (5, 2, 1),
                (5, 1, 2),
                (4, 0, 3),
                (3, 2, 4),
                (3, 1, 5),
                (4, 2, 6),
                (4, 1, 7),
            ],
        )
    }

    #[test]
    fn test_branching_discovery_visits_shared_gate_once() -> Result<()> {
        let mut graph = branching();
        let frame = white_frame();
        let config = DiscoveryConfig::default();
        let probe = RecordingProbe(RefCell::new(Vec::new()));
        let resolver = DirectionResolver::new(&config, &frame, &probe);

        let entry = resolver.find_entry(&mut graph)?;
        assert_eq!(entry.column, 2);
        assert_eq!(entry.gate, 4);
        assert_eq!(resolver.discover(&mut graph, &entry)?, 4);
        assert_eq!(probe.0.borrow().len(), 4);

        let ga = gate_of(&graph, 4);
        assert_eq!(ga.distance, Some(3));
        assert_eq!(ga.directions, vec![6, 5]);

        // the first direction is walked first, so Gd is reached through Gc
        let gc = gate_of(&graph, 6);
        assert_eq!(gc.distance, Some(4));
        assert_eq!(gc.directions, vec![1, 7]);
        let gd = gate_of(&graph, 7);
        assert_eq!(gd.distance, Some(5));
        assert_eq!(gd.incoming, Some(Heading::Right));
        assert_eq!(gd.directions, vec![2, 3]);

        let gb = gate_of(&graph, 5);
        assert_eq!(gb.distance, Some(4));
        assert_eq!(gb.incoming, Some(Heading::Right));
        assert_eq!(gb.directions, vec![7, 0]);
        Ok(())
    }

    #[test]
    fn test_gate_cycle_terminates() -> Result<()> {
        // 2x2 block of gates: Ga(3) Gb(4) over Gc(5) Gd(6)
        let mut graph = graph_from(
            vec![
                station(0, 4, 4, Color::Red),
                station(1, 5, 2, Color::Blue),
                station(2, 3, 1, Color::Green),
                fresh_gate(3, 3, 2),
                fresh_gate(4, 3, 3),
                fresh_gate(5, 4, 2),
                fresh_gate(6, 4, 3),
            ],
            &[
                (4, 4, 0),
                (5, 2, 1),
                (3, 1, 2),
                (3, 2, 3),
                (3, 3, 4),
                (4, 2, 5),
                (4, 3, 6),
            ],
        );
        let frame = white_frame();
        let config = DiscoveryConfig::default();
        let probe = RecordingProbe(RefCell::new(Vec::new()));
        let entry = DirectionResolver::new(&config, &frame, &probe).resolve(&mut graph)?;

        assert_eq!(entry.column, 3);
        assert_eq!(entry.gate, 4);
        assert_eq!(probe.0.borrow().len(), 4);

        // Gb -> Gd -> Gc -> Ga, and Ga points back at Gb
        for (idx, distance, incoming, directions) in [
            (4, 3, Heading::Up, vec![6, 3]),
            (6, 4, Heading::Up, vec![5, 0]),
            (5, 5, Heading::Right, vec![3, 1]),
            (3, 6, Heading::Down, vec![2, 4]),
        ] {
            let gate = gate_of(&graph, idx);
            assert_eq!(gate.distance, Some(distance), "gate #{}", idx);
            assert_eq!(gate.incoming, Some(incoming), "gate #{}", idx);
            assert_eq!(gate.directions, directions, "gate #{}", idx);
            assert!(gate.state.is_some_and(|s| gate.directions.contains(&s)));
            assert_eq!(gate.state, gate.ostate);
        }
        Ok(())
    }

    #[test]
    fn test_no_entry_without_gate() {
        let mut graph = graph_from(vec![station(0, 3, 1, Color::Red)], &[(3, 1, 0)]);
        let frame = white_frame();
        let config = DiscoveryConfig::default();
        let probe = FixedProbe(false);
        let resolver = DirectionResolver::new(&config, &frame, &probe);
        assert!(matches!(resolver.find_entry(&mut graph), Err(GraphError::NoEntry)));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_dead_end_from_edge_mass() -> Result<()> {
        let mut graph = crossing();
        let frame = tee_frame();
        let config = DiscoveryConfig::default();
        let probe = FixedProbe(true);
        DirectionResolver::new(&config, &frame, &probe).resolve(&mut graph)?;

        let gate = graph.point(3).unwrap().as_gate().unwrap();
        // left is the unlit edge; down then right remain
        assert_eq!(gate.directions, vec![2, 1]);
        assert_eq!(gate.incoming, Some(Heading::Up));
        assert_eq!(gate.state, Some(2));
        assert_eq!(gate.ostate, Some(2));
        assert_eq!(gate.distance, Some(3));
        Ok(())
    }

    #[test]
    fn test_perpendicular_default_without_line() -> Result<()> {
        let mut graph = crossing();
        let frame = tee_frame();
        let config = DiscoveryConfig::default();
        let probe = RecordingProbe(RefCell::new(Vec::new()));
        DirectionResolver::new(&config, &frame, &probe).resolve(&mut graph)?;

        let gate = graph.point(3).unwrap().as_gate().unwrap();
        // left is the dead-end, so the perpendicular default falls to the right
        assert_eq!(gate.state, Some(1));
        assert_eq!(probe.0.borrow().as_slice(), &[(90, 90)]);
        Ok(())
    }

    #[test]
    fn test_default_heading_rules() {
        assert_eq!(default_heading(Heading::Up, Heading::Left, true), Heading::Down);
        assert_eq!(default_heading(Heading::Up, Heading::Down, true), Heading::Left);
        assert_eq!(default_heading(Heading::Up, Heading::Left, false), Heading::Right);
        assert_eq!(default_heading(Heading::Left, Heading::Down, false), Heading::Up);
        assert_eq!(default_heading(Heading::Right, Heading::Up, false), Heading::Down);
        assert_eq!(default_heading(Heading::Right, Heading::Up, true), Heading::Left);
    }

    #[test]
    fn test_edge_mass_bands() {
        let mut mask = GrayImage::new(90, 90);
        for y in 0..90 {
            mask.put_pixel(45, y, Luma([255]));
        }
        let mass = edge_mass(&mask, 20);
        assert_eq!(mass[0], 20 * 255);
        assert_eq!(mass[1], 20 * 255);
        assert_eq!(mass[2], 0);
        assert_eq!(mass[3], 0);
    }
}
