//! Per-frame gate decisions

use tracing::{debug, info, warn};

use crate::config::{BotConfig, RoutingConfig, ScreenTransform};
use crate::detection::TrainScan;
use crate::graph::{CellLookup, Color, Graph, Point};
use crate::routing::{DistanceEstimator, PathPlanner, Route};

/// A train placed on the graph for this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedTrain {
    pub node: usize,
    pub distance: f64,
    pub color: Color,
}

impl TrackedTrain {
    /// How far the train has moved through its current node
    pub fn progress(&self) -> f64 {
        self.distance.fract()
    }
}

/// A click required to bring a gate to its desired state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Actuation {
    pub gate: usize,
    pub from: Option<usize>,
    pub to: usize,
    /// Real screen coordinates of the gate
    pub screen: (f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Stations missing or extra: the frame is likely mid-animation or occluded
    StationCountMismatch { expected: usize, found: usize },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub trains: Vec<TrackedTrain>,
    pub routes: Vec<Route>,
    pub actuations: Vec<Actuation>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Skipped(SkipReason),
    Routed(FrameReport),
}

impl FrameOutcome {
    pub fn actuations(&self) -> &[Actuation] {
        match self {
            FrameOutcome::Skipped(_) => &[],
            FrameOutcome::Routed(report) => &report.actuations,
        }
    }
}

/// Owns the calibrated graph and decides which gates to switch each frame
pub struct GateController {
    graph: Graph,
    baseline_stations: usize,
    routing: RoutingConfig,
    screen: ScreenTransform,
    estimator: DistanceEstimator,
}

impl GateController {
    pub fn new(graph: Graph, baseline_stations: usize, config: &BotConfig) -> Self {
        Self {
            graph,
            baseline_stations,
            routing: config.routing.clone(),
            screen: config.screen,
            estimator: DistanceEstimator::new(&config.routing),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Process one frame of detections
    pub fn step(&mut self, scan: &TrainScan) -> FrameOutcome {
        if scan.station_count != self.baseline_stations {
            warn!(
                "Wrong number of stations detected: expected {}, found {}",
                self.baseline_stations, scan.station_count
            );
            return FrameOutcome::Skipped(SkipReason::StationCountMismatch {
                expected: self.baseline_stations,
                found: scan.station_count,
            });
        }

        let trains = self.track(scan);
        let routes = self.route(&trains);
        let actuations = self.actuate();

        FrameOutcome::Routed(FrameReport {
            trains,
            routes,
            actuations,
        })
    }

    /// Place routable trains on the graph, nearest to the entry first
    pub fn track(&self, scan: &TrainScan) -> Vec<TrackedTrain> {
        let holding_cell = self.graph.entry().map(|entry| entry.cells[1]);

        let mut trains: Vec<TrackedTrain> = scan
            .trains
            .iter()
            .filter_map(|sighting| {
                let CellLookup::Node(node) = self.graph.node_at(sighting.position) else {
                    return None;
                };
                let color = sighting.color?;
                if self.graph.point(node).is_none_or(Point::is_station) || holding_cell == Some(node) {
                    return None;
                }
                Some(TrackedTrain {
                    node,
                    distance: self.estimator.estimate(&self.graph, sighting.position),
                    color,
                })
            })
            .collect();

        trains.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        trains
    }

    /// Point every gate on each train's route at the route's next node.
    /// Trains later in the order overwrite earlier ones on shared gates.
    fn route(&mut self, trains: &[TrackedTrain]) -> Vec<Route> {
        let mut routes = Vec::with_capacity(trains.len());
        for train in trains {
            let planner = PathPlanner::new(&self.graph, &self.routing);
            let Some(route) = planner.plan_route(train.node, train.color, train.progress()) else {
                debug!("No route for {} train at #{}", train.color, train.node);
                continue;
            };
            debug!(
                "{} train at #{} (distance {:.2}) -> {:?} then #{}",
                train.color, train.node, train.distance, route.nodes, route.goal
            );
            for (node, next) in route.hops() {
                self.graph.set_state(node, next);
            }
            routes.push(route);
        }
        routes
    }

    /// One actuation per gate whose desired state differs from its switched one.
    ///
    /// Nothing is committed here: a toggle stays pending until [`confirm`]
    /// records that the click went through.
    ///
    /// [`confirm`]: GateController::confirm
    fn actuate(&self) -> Vec<Actuation> {
        self.graph
            .pending_toggles()
            .into_iter()
            .map(|toggle| {
                info!("Switch gate #{} from {:?} to #{}", toggle.gate, toggle.from, toggle.to);
                Actuation {
                    gate: toggle.gate,
                    from: toggle.from,
                    to: toggle.to,
                    screen: self.screen.apply(toggle.position.x, toggle.position.y),
                }
            })
            .collect()
    }

    /// Record a performed click as the gate's physical state
    pub fn confirm(&mut self, actuation: &Actuation) {
        self.graph.commit(actuation.gate, actuation.to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::TrainSighting;
    use crate::graph::fixtures::{gate, graph_from, station};
    use crate::graph::{Heading, Position};

    /// Two gates in column 2:
    ///
    /// ```text
    ///   row 3:        G1(#2) -> S_red(#0)
    ///                  |
    ///   row 4:        G2(#3) -> S_blue(#1)
    ///                  |
    ///   row 5:        S_green(#4)
    /// ```
    fn board() -> Graph {
        graph_from(
            vec![
                station(0, 3, 3, Color::Red),
                station(1, 4, 3, Color::Blue),
                gate(2, 3, 2, vec![3, 0], 3, Heading::Up),
                gate(3, 4, 2, vec![4, 1], 4, Heading::Up),
                station(4, 5, 2, Color::Green),
            ],
            &[(3, 3, 0), (4, 3, 1), (3, 2, 2), (4, 2, 3), (5, 2, 4)],
        )
    }

    fn controller() -> GateController {
        let mut config = BotConfig::default();
        config.screen = ScreenTransform {
            origin_x: 1000.0,
            origin_y: 10.0,
            scale: 0.5,
        };
        GateController::new(board(), 3, &config)
    }

    fn sighting(x: i32, y: i32, color: Color) -> TrainSighting {
        TrainSighting {
            position: Position::new(x, y),
            color: Some(color),
        }
    }

    fn scan(trains: Vec<TrainSighting>) -> TrainScan {
        TrainScan {
            trains,
            station_count: 3,
        }
    }

    #[test]
    fn test_switches_gate_toward_goal() {
        let mut controller = controller();
        let outcome = controller.step(&scan(vec![sighting(250, 320, Color::Blue)]));

        let actuations = outcome.actuations();
        assert_eq!(actuations.len(), 1);
        assert_eq!(actuations[0].gate, 3);
        assert_eq!(actuations[0].from, Some(4));
        assert_eq!(actuations[0].to, 1);
        assert_eq!(actuations[0].screen, (1000.0 + 125.0, 10.0 + 225.0));

        let gate = controller.graph().point(3).unwrap().as_gate().unwrap();
        assert_eq!(gate.state, Some(1));
        // not switched until the click is confirmed
        assert_eq!(gate.ostate, Some(4));

        let actuation = actuations[0];
        controller.confirm(&actuation);
        let gate = controller.graph().point(3).unwrap().as_gate().unwrap();
        assert_eq!(gate.ostate, Some(1));
    }

    #[test]
    fn test_repeated_frame_is_idempotent() {
        let mut controller = controller();
        let frame = scan(vec![sighting(250, 320, Color::Red), sighting(250, 420, Color::Blue)]);
        let first = controller.step(&frame);
        assert!(!first.actuations().is_empty());
        for actuation in first.actuations() {
            controller.confirm(actuation);
        }
        assert!(controller.step(&frame).actuations().is_empty());
    }

    #[test]
    fn test_unconfirmed_switch_is_requested_again() {
        let mut controller = controller();
        let frame = scan(vec![sighting(250, 320, Color::Blue)]);

        let first = controller.step(&frame);
        assert_eq!(first.actuations().len(), 1);

        let again = controller.step(&frame);
        assert_eq!(again.actuations(), first.actuations());
    }

    #[test]
    fn test_station_count_mismatch_skips_frame() {
        let mut controller = controller();
        let mut frame = scan(vec![sighting(250, 320, Color::Blue)]);
        frame.station_count = 2;

        let outcome = controller.step(&frame);
        assert_eq!(
            outcome,
            FrameOutcome::Skipped(SkipReason::StationCountMismatch { expected: 3, found: 2 })
        );
        let gate = controller.graph().point(3).unwrap().as_gate().unwrap();
        assert_eq!(gate.state, Some(4));
    }

    #[test]
    fn test_unroutable_trains_are_ignored() {
        let controller = controller();
        let frame = scan(vec![
            // off the board
            sighting(-100, 320, Color::Red),
            // empty cell
            sighting(50, 50, Color::Red),
            // arrived at a station
            sighting(350, 350, Color::Red),
            TrainSighting {
                position: Position::new(250, 320),
                color: None,
            },
        ]);
        assert!(controller.track(&frame).is_empty());
    }

    #[test]
    fn test_trains_sorted_by_distance() {
        let controller = controller();
        let frame = scan(vec![sighting(250, 430, Color::Green), sighting(250, 330, Color::Red)]);
        let trains = controller.track(&frame);
        assert_eq!(trains.len(), 2);
        assert_eq!(trains[0].node, 2);
        assert_eq!(trains[1].node, 3);
        assert!(trains[0].distance < trains[1].distance);
    }

    #[test]
    fn test_farther_train_wins_shared_gate() {
        let mut controller = controller();
        // green at G1 wants G2 -> S_green, blue further along at G2 wants G2 -> S_blue
        let frame = scan(vec![
            sighting(250, 320, Color::Green),
            sighting(250, 420, Color::Blue),
        ]);
        controller.step(&frame);

        let g2 = controller.graph().point(3).unwrap().as_gate().unwrap();
        assert_eq!(g2.state, Some(1));
    }

    #[test]
    fn test_progress_is_fractional_part() {
        let train = TrackedTrain {
            node: 2,
            distance: 3.45,
            color: Color::Red,
        };
        assert!((train.progress() - 0.45).abs() < 1e-9);
    }
}
