use super::{TimedEdge, TimedVertex};
use crate::instance::{EdgeId, Instance, VertexId};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Implicit time expansion of an [`Instance`].
///
/// Only departure times reachable from `(source, 0)` are kept. The source
/// itself is left only at time zero: any later copy of the source is the end
/// of a walk.
#[derive(Debug, Clone)]
pub struct TimeExpandedGraph {
    instance: Arc<Instance>,
    horizon: u32,
    /// Sorted departure times per original vertex
    departures: Vec<Vec<u32>>,
    num_timed_vertices: usize,
    num_timed_edges: usize,
}

impl TimeExpandedGraph {
    pub fn new(instance: Arc<Instance>, horizon: u32) -> Self {
        let n = instance.dimension;
        let mut departures = vec![Vec::new(); n];
        let mut num_timed_vertices = 0;
        let mut num_timed_edges = 0;

        // Travel times are positive, so the frontier pops in time order and a
        // popped timed vertex is never reached again.
        let mut frontier: BTreeSet<(u32, VertexId)> = BTreeSet::new();
        frontier.insert((0, instance.source));
        while let Some((t, v)) = frontier.pop_first() {
            num_timed_vertices += 1;
            if v == instance.source && t > 0 {
                continue;
            }
            departures[v].push(t);
            for &e in instance.out_edges(v) {
                let edge = instance.edge(e);
                let arrival = t + edge.travel_time;
                if arrival <= horizon {
                    frontier.insert((arrival, edge.target));
                    num_timed_edges += 1;
                }
            }
        }

        TimeExpandedGraph { instance, horizon, departures, num_timed_vertices, num_timed_edges }
    }

    /// Expand up to the instance's own horizon
    pub fn from_instance(instance: Arc<Instance>) -> Self {
        let horizon = instance.horizon;
        Self::new(instance, horizon)
    }

    #[inline]
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    #[inline]
    pub fn source(&self) -> VertexId {
        self.instance.source
    }

    #[inline]
    pub fn horizon(&self) -> u32 {
        self.horizon
    }

    /// The time-expanded source `(source, 0)`
    pub fn start(&self) -> TimedVertex {
        TimedVertex::new(self.instance.source, 0)
    }

    pub fn num_timed_vertices(&self) -> usize {
        self.num_timed_vertices
    }

    pub fn num_timed_edges(&self) -> usize {
        self.num_timed_edges
    }

    /// Times at which `vertex` can be left
    pub fn departures(&self, vertex: VertexId) -> &[u32] {
        &self.departures[vertex]
    }

    /// The timed instance of `edge` departing at `departure`
    pub fn timed_edge(&self, edge: EdgeId, departure: u32) -> TimedEdge {
        let e = self.instance.edge(edge);
        TimedEdge {
            edge,
            source: TimedVertex::new(e.source, departure),
            target: TimedVertex::new(e.target, departure + e.travel_time),
        }
    }

    /// Timed edges leaving a timed vertex
    pub fn outgoing(&self, from: TimedVertex) -> impl Iterator<Item = TimedEdge> + '_ {
        let terminal = from.vertex == self.instance.source && from.time > 0;
        let edges: &[EdgeId] = if terminal { &[] } else { self.instance.out_edges(from.vertex) };
        edges
            .iter()
            .map(move |&e| self.timed_edge(e, from.time))
            .filter(move |te| te.target.time <= self.horizon)
    }

    /// All timed instances of an original edge, by increasing departure
    pub fn instances(&self, edge: EdgeId) -> impl Iterator<Item = TimedEdge> + '_ {
        let e = self.instance.edge(edge);
        let last_departure = self.horizon.checked_sub(e.travel_time);
        self.departures[e.source]
            .iter()
            .take_while(move |&&t| last_departure.is_some_and(|last| t <= last))
            .map(move |&t| self.timed_edge(edge, t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reachable_departures() {
        // 0 -> 1 (2), 1 -> 2 (3), 2 -> 0 (1), 1 -> 0 (4)
        let instance = Instance::from_edges("chain", 3, 0, &[(0, 1, 2), (1, 2, 3), (2, 0, 1), (1, 0, 4)], Some(10)).unwrap();
        let graph = TimeExpandedGraph::from_instance(Arc::new(instance));

        assert_eq!(graph.departures(0), &[0]);
        assert_eq!(graph.departures(1), &[2]);
        assert_eq!(graph.departures(2), &[5]);
        // (0,0) (1,2) (2,5) (0,6); both returns land on (0,6)
        assert_eq!(graph.num_timed_vertices(), 4);
        assert_eq!(graph.num_timed_edges(), 4);
    }

    #[test]
    fn test_long_horizon_keeps_only_reachable_times() {
        let instance = Instance::from_edges("chain", 3, 0, &[(0, 1, 2), (1, 2, 3), (2, 0, 1), (1, 0, 4)], Some(50_000_000)).unwrap();
        let graph = TimeExpandedGraph::from_instance(Arc::new(instance));

        assert_eq!(graph.horizon(), 50_000_000);
        assert_eq!(graph.num_timed_vertices(), 4);
        assert_eq!(graph.departures(2), &[5]);
    }

    #[test]
    fn test_source_copies_are_terminal() {
        let instance = Instance::from_edges("pair", 2, 0, &[(0, 1, 1), (1, 0, 1)], Some(10)).unwrap();
        let graph = TimeExpandedGraph::from_instance(Arc::new(instance));

        assert_eq!(graph.outgoing(TimedVertex::new(0, 0)).count(), 1);
        assert_eq!(graph.outgoing(TimedVertex::new(0, 2)).count(), 0);
        assert_eq!(graph.instances(0).count(), 1);
    }

    #[test]
    fn test_instances_respect_horizon() {
        let instance = Instance::from_edges("late", 2, 0, &[(0, 1, 4), (1, 0, 7)], Some(10)).unwrap();
        let graph = TimeExpandedGraph::from_instance(Arc::new(instance));

        assert_eq!(graph.instances(0).count(), 1);
        // departing 1 at time 4 would arrive at 11
        assert_eq!(graph.instances(1).count(), 0);
    }
}
