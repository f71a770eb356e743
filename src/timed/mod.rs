//! Time-expanded network.
//!
//! Every original vertex is replicated at the discrete times at which it can
//! be reached from the source; every original edge yields one timed edge per
//! feasible departure time.

pub mod graph;
pub mod router;

pub use graph::TimeExpandedGraph;
pub use router::{ExtensionRule, RouteSearch, Router, SearchLimits, Trail, VertexSet};

use crate::instance::{EdgeId, Instance, VertexId};
use crate::pricing::costs::EdgeCost;
use serde::{Deserialize, Serialize};

/// An original vertex at a discrete time. Ordered by time first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimedVertex {
    pub time: u32,
    pub vertex: VertexId,
}

impl TimedVertex {
    pub fn new(vertex: VertexId, time: u32) -> Self {
        TimedVertex { time, vertex }
    }
}

/// One departure-time instance of an original edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimedEdge {
    pub edge: EdgeId,
    pub source: TimedVertex,
    pub target: TimedVertex,
}

impl TimedEdge {
    #[inline]
    pub fn travel_time(&self) -> u32 {
        self.target.time - self.source.time
    }
}

/// Optional window on arrival times
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBounds {
    /// The source may not be reached again before this time
    pub lower: Option<u32>,
    /// No vertex may be reached after this time
    pub upper: Option<u32>,
}

impl TimeBounds {
    pub fn new(lower: Option<u32>, upper: Option<u32>) -> Self {
        TimeBounds { lower, upper }
    }

    /// Whether an arrival at `vertex` at `time` respects the window
    #[inline]
    pub fn admits(&self, vertex: VertexId, time: u32, source: VertexId) -> bool {
        if self.upper.is_some_and(|ub| time > ub) {
            return false;
        }
        vertex != source || self.lower.map_or(true, |lb| time >= lb)
    }
}

/// A connected walk through the time-expanded network
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimedPath {
    pub edges: Vec<TimedEdge>,
}

impl TimedPath {
    pub fn new(edges: Vec<TimedEdge>) -> Self {
        TimedPath { edges }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Time at which the walk ends
    pub fn arrival(&self) -> u32 {
        self.edges.last().map_or(0, |e| e.target.time)
    }

    /// Sum of travel times, i.e. the objective contribution of the path
    pub fn travel_time(&self) -> u32 {
        self.edges.iter().map(TimedEdge::travel_time).sum()
    }

    /// Cost of the path under an edge cost function
    pub fn cost(&self, costs: &dyn EdgeCost) -> f64 {
        self.edges.iter().map(|e| costs.cost(e.edge)).sum()
    }

    /// Original vertices in visiting order, starting with the first tail
    pub fn vertices(&self) -> Vec<VertexId> {
        let mut vertices = Vec::with_capacity(self.edges.len() + 1);
        if let Some(first) = self.edges.first() {
            vertices.push(first.source.vertex);
        }
        vertices.extend(self.edges.iter().map(|e| e.target.vertex));
        vertices
    }

    /// Each edge leaves where the previous one arrived
    pub fn is_connected(&self) -> bool {
        self.edges.windows(2).all(|w| w[0].target == w[1].source)
    }

    /// Whether the path is a complete tour: it leaves the source at time zero,
    /// visits every original vertex exactly once and returns to the source.
    pub fn is_tour(&self, instance: &Instance) -> bool {
        if self.edges.len() != instance.dimension || !self.is_connected() {
            return false;
        }
        let start = TimedVertex::new(instance.source, 0);
        if self.edges[0].source != start || self.edges[self.edges.len() - 1].target.vertex != instance.source {
            return false;
        }

        let mut seen = vec![false; instance.dimension];
        for e in &self.edges {
            let v = e.target.vertex;
            if seen[v] {
                return false;
            }
            seen[v] = true;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::pentagon;

    fn edge(instance: &Instance, from: VertexId, to: VertexId, departure: u32) -> TimedEdge {
        let id = instance.find_edge(from, to).unwrap();
        let arrival = departure + instance.edge(id).travel_time;
        TimedEdge { edge: id, source: TimedVertex::new(from, departure), target: TimedVertex::new(to, arrival) }
    }

    #[test]
    fn test_tour_detection() {
        let instance = pentagon();
        let mut edges = Vec::new();
        let mut time = 0;
        for i in 0..5 {
            let e = edge(&instance, i, (i + 1) % 5, time);
            time = e.target.time;
            edges.push(e);
        }
        let path = TimedPath::new(edges);

        assert!(path.is_connected());
        assert!(path.is_tour(&instance));
        assert_eq!(path.travel_time(), 10);
        assert_eq!(path.vertices(), vec![0, 1, 2, 3, 4, 0]);
    }

    #[test]
    fn test_short_cycle_is_not_a_tour() {
        let instance = pentagon();
        let a = edge(&instance, 0, 1, 0);
        let b = edge(&instance, 1, 0, a.target.time);
        let path = TimedPath::new(vec![a, b]);

        assert!(path.is_connected());
        assert!(!path.is_tour(&instance));
    }

    #[test]
    fn test_time_bounds() {
        let bounds = TimeBounds::new(Some(5), Some(10));
        assert!(bounds.admits(1, 3, 0));
        assert!(!bounds.admits(0, 3, 0));
        assert!(bounds.admits(0, 7, 0));
        assert!(!bounds.admits(2, 11, 0));
    }
}
