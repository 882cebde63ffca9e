use crate::config::RoutingConfig;
use crate::graph::{CellLookup, Graph, Heading, Position};

/// Continuous progress of a train from the entry, in hops
pub struct DistanceEstimator {
    marker_bias: f64,
    scale: f64,
}

impl DistanceEstimator {
    pub fn new(config: &RoutingConfig) -> Self {
        Self {
            marker_bias: config.marker_bias,
            scale: config.distance_scale,
        }
    }

    /// Hop distance of the containing node plus the biased pixel offset from
    /// it; 0 for positions outside the modelled part of the board.
    pub fn estimate(&self, graph: &Graph, train: Position) -> f64 {
        let CellLookup::Node(index) = graph.node_at(train) else {
            return 0.0;
        };
        let Some(point) = graph.point(index) else {
            return 0.0;
        };
        let Some(hops) = point.distance() else {
            return 0.0;
        };
        let Some(anchor) = point.position else {
            return hops as f64;
        };

        let mut dx = (train.x - anchor.x) as f64;
        let mut dy = (train.y - anchor.y) as f64;
        match point.incoming() {
            Some(Heading::Up) => dy += self.marker_bias,
            Some(Heading::Down) => dy -= self.marker_bias,
            Some(Heading::Left) => dx += self.marker_bias,
            Some(Heading::Right) => dx -= self.marker_bias,
            None => {}
        }

        hops as f64 + dx.hypot(dy) / self.scale
    }
}

impl Graph {
    /// Progress distance for a train at `position`, with default tuning
    pub fn distance_of(&self, position: Position) -> f64 {
        DistanceEstimator::new(&RoutingConfig::default()).estimate(self, position)
    }
}
