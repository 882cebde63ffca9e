//! Bounded route search over the static direction graph

use crate::config::RoutingConfig;
use crate::graph::{Color, Graph};

/// A planned route for one train
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Nodes still to be crossed, excluding the goal
    pub nodes: Vec<usize>,
    pub goal: usize,
}

impl Route {
    /// `(node, next)` pairs: every node on the route and where it should lead
    pub fn hops(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let nexts = self.nodes.iter().skip(1).copied().chain(std::iter::once(self.goal));
        self.nodes.iter().copied().zip(nexts)
    }
}

enum Visit {
    Arrived,
    Blocked,
    Expand,
}

pub struct PathPlanner<'a> {
    graph: &'a Graph,
    max_depth: usize,
    trim_fraction: f64,
}

impl<'a> PathPlanner<'a> {
    pub fn new(graph: &'a Graph, config: &RoutingConfig) -> Self {
        Self {
            graph,
            max_depth: config.max_depth,
            trim_fraction: config.trim_fraction,
        }
    }

    /// Depth-first backtracking from `start` toward `goal`, trying each
    /// node's directions in order.
    ///
    /// Returns the nodes crossed before reaching the goal (empty when
    /// `start == goal`), or `None` when every branch is blocked or deeper
    /// than the depth budget.
    pub fn find_path(&self, start: usize, goal: usize) -> Option<Vec<usize>> {
        let mut path: Vec<usize> = Vec::new();
        let mut cursors: Vec<usize> = Vec::new();
        let mut candidate = Some(start);

        loop {
            if let Some(node) = candidate.take() {
                match self.visit(node, goal, &path) {
                    Visit::Arrived => return Some(path),
                    Visit::Blocked => {}
                    Visit::Expand => {
                        path.push(node);
                        cursors.push(0);
                    }
                }
            }

            let &top = path.last()?;
            let directions = self.graph.point(top).map(|p| p.directions()).unwrap_or(&[]);
            let cursor = cursors.last_mut()?;
            if let Some(&next) = directions.get(*cursor) {
                *cursor += 1;
                candidate = Some(next);
            } else {
                path.pop();
                cursors.pop();
            }
        }
    }

    fn visit(&self, node: usize, goal: usize, path: &[usize]) -> Visit {
        if path.len() > self.max_depth {
            return Visit::Blocked;
        }
        if node == goal {
            return Visit::Arrived;
        }
        match self.graph.point(node) {
            None => Visit::Blocked,
            Some(point) if point.is_station() => Visit::Blocked,
            Some(_) if path.contains(&node) => Visit::Blocked,
            Some(_) => Visit::Expand,
        }
    }

    /// Route a train from its node to the station of its color.
    ///
    /// A train already more than `trim_fraction` through its node has
    /// effectively left it, so that node is dropped from the route.
    pub fn plan_route(&self, node: usize, color: Color, progress: f64) -> Option<Route> {
        let goal = self.graph.station_for(color)?;
        let mut nodes = self.find_path(node, goal)?;
        if progress > self.trim_fraction && !nodes.is_empty() {
            nodes.remove(0);
        }
        Some(Route { nodes, goal })
    }
}
