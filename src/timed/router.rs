//! Label-correcting shortest path search over the time-expanded network.
//!
//! Labels are settled in time order. Since every timed edge moves strictly
//! forward in time, a timed vertex is complete once all earlier times have
//! been processed, and no label is ever revisited.

use super::{TimeBounds, TimeExpandedGraph, TimedEdge, TimedPath, TimedVertex};
use crate::instance::{EdgeId, VertexId};
use crate::pricing::costs::EdgeCost;
use ordered_float::OrderedFloat;
use std::collections::{BTreeMap, HashSet};

/// Fixed-size bitset over original vertices
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexSet {
    words: Vec<u64>,
}

impl VertexSet {
    pub fn new(num_vertices: usize) -> Self {
        VertexSet { words: vec![0; num_vertices.div_ceil(64)] }
    }

    #[inline]
    pub fn insert(&mut self, v: VertexId) {
        self.words[v / 64] |= 1u64 << (v % 64);
    }

    #[inline]
    pub fn contains(&self, v: VertexId) -> bool {
        self.words[v / 64] & (1u64 << (v % 64)) != 0
    }

    pub fn is_subset(&self, other: &VertexSet) -> bool {
        self.words.iter().zip(&other.words).all(|(a, b)| a & !b == 0)
    }
}

/// What a partial path remembers about the original vertices it visited
#[derive(Debug, Clone, Copy)]
pub struct Trail<'a> {
    /// Last visited vertices, oldest first, current vertex last
    pub recent: &'a [VertexId],
    /// Every vertex visited so far
    pub visited: &'a VertexSet,
}

/// Feasibility predicate deciding which original vertex a path may enter next.
///
/// The closing edge back to the source is not subject to the rule.
pub trait ExtensionRule {
    /// Number of trailing vertices a label must keep in [`Trail::recent`]
    fn lookback(&self) -> usize;

    fn admits(&self, trail: &Trail<'_>, next: VertexId) -> bool;

    /// Whether every extension admitted for `b` is also admitted for `a`
    fn dominates(&self, a: &Trail<'_>, b: &Trail<'_>) -> bool;
}

/// Effort limits of a search
#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    /// Complete paths to return at most
    pub max_paths: usize,
    /// Labels kept per timed vertex; the costliest are dropped beyond this
    pub label_limit: usize,
    /// Only paths cheaper than this are returned
    pub cost_threshold: f64,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits { max_paths: 10, label_limit: 64, cost_threshold: -1e-6 }
    }
}

/// Outcome of a search
#[derive(Debug, Clone, Default)]
pub struct RouteSearch {
    /// Complete source-to-source paths, cheapest first
    pub paths: Vec<(f64, TimedPath)>,
    /// Smallest cost of any edge the search considered (`+inf` if none)
    pub min_edge_cost: f64,
    /// False if labels were dropped by the label limit
    pub exhaustive: bool,
}

struct Label {
    cost: f64,
    parent: Option<(usize, TimedEdge)>,
    recent: Vec<VertexId>,
    visited: VertexSet,
}

impl Label {
    fn trail(&self) -> Trail<'_> {
        Trail { recent: &self.recent, visited: &self.visited }
    }
}

pub struct Router<'g> {
    graph: &'g TimeExpandedGraph,
}

impl<'g> Router<'g> {
    pub fn new(graph: &'g TimeExpandedGraph) -> Self {
        Router { graph }
    }

    /// Search cheap walks from `(source, 0)` back to the source.
    pub fn find_shortest_paths(
        &self,
        costs: &dyn EdgeCost,
        forbidden: &HashSet<EdgeId>,
        bounds: TimeBounds,
        rule: &dyn ExtensionRule,
        limits: SearchLimits,
    ) -> RouteSearch {
        let source = self.graph.source();
        let n = self.graph.instance().dimension;
        let lookback = rule.lookback().max(1);

        let mut labels: Vec<Label> = Vec::new();
        let mut pending: BTreeMap<TimedVertex, Vec<usize>> = BTreeMap::new();
        let mut finished: Vec<usize> = Vec::new();
        let mut min_edge_cost = f64::INFINITY;
        let mut exhaustive = true;

        let mut visited = VertexSet::new(n);
        visited.insert(source);
        labels.push(Label {
            cost: 0.0,
            parent: None,
            recent: vec![source],
            visited,
        });
        pending.insert(self.graph.start(), vec![0]);

        while let Some((at, bucket)) = pending.pop_first() {
            if at.vertex == source && at.time > 0 {
                finished.extend(bucket);
                continue;
            }

            for id in bucket {
                for te in self.graph.outgoing(at) {
                    if forbidden.contains(&te.edge) {
                        continue;
                    }
                    let next = te.target.vertex;
                    if !bounds.admits(next, te.target.time, source) {
                        continue;
                    }
                    let edge_cost = costs.cost(te.edge);
                    min_edge_cost = min_edge_cost.min(edge_cost);

                    let label = &labels[id];
                    if next != source && !rule.admits(&label.trail(), next) {
                        continue;
                    }

                    let mut recent = label.recent.clone();
                    recent.push(next);
                    if recent.len() > lookback {
                        recent.remove(0);
                    }
                    let mut visited = label.visited.clone();
                    visited.insert(next);
                    let candidate = Label {
                        cost: label.cost + edge_cost,
                        parent: Some((id, te)),
                        recent,
                        visited,
                    };

                    let target_bucket = pending.entry(te.target).or_default();
                    if next == source {
                        // completed walks are ranked, not dominated
                        labels.push(candidate);
                        target_bucket.push(labels.len() - 1);
                    } else if Self::insert_label(&mut labels, target_bucket, candidate, rule, limits.label_limit) {
                        exhaustive = false;
                    }
                }
            }
        }

        finished.sort_by_key(|&id| OrderedFloat(labels[id].cost));
        let paths = finished
            .into_iter()
            .filter(|&id| labels[id].cost < limits.cost_threshold)
            .take(limits.max_paths)
            .map(|id| (labels[id].cost, Self::backtrack(&labels, id)))
            .collect();

        RouteSearch { paths, min_edge_cost, exhaustive }
    }

    /// Insert `candidate` into a bucket unless dominated, evicting the labels
    /// it dominates. Returns true when the label limit discarded a label.
    fn insert_label(
        labels: &mut Vec<Label>,
        bucket: &mut Vec<usize>,
        candidate: Label,
        rule: &dyn ExtensionRule,
        label_limit: usize,
    ) -> bool {
        let dominated = bucket.iter().any(|&other| {
            let existing = &labels[other];
            existing.cost <= candidate.cost && rule.dominates(&existing.trail(), &candidate.trail())
        });
        if dominated {
            return false;
        }

        bucket.retain(|&other| {
            let existing = &labels[other];
            !(candidate.cost <= existing.cost && rule.dominates(&candidate.trail(), &existing.trail()))
        });
        labels.push(candidate);
        bucket.push(labels.len() - 1);

        if bucket.len() > label_limit.max(1) {
            let worst = bucket
                .iter()
                .enumerate()
                .max_by_key(|&(_, &id)| OrderedFloat(labels[id].cost))
                .map(|(pos, _)| pos);
            if let Some(pos) = worst {
                bucket.swap_remove(pos);
            }
            return true;
        }
        false
    }

    fn backtrack(labels: &[Label], mut id: usize) -> TimedPath {
        let mut edges = Vec::new();
        while let Some((parent, edge)) = labels[id].parent {
            edges.push(edge);
            id = parent;
        }
        edges.reverse();
        TimedPath::new(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Instance;
    use std::sync::Arc;

    struct Unrestricted;

    impl ExtensionRule for Unrestricted {
        fn lookback(&self) -> usize {
            1
        }

        fn admits(&self, _trail: &Trail<'_>, _next: VertexId) -> bool {
            true
        }

        fn dominates(&self, a: &Trail<'_>, b: &Trail<'_>) -> bool {
            a.recent == b.recent
        }
    }

    struct UnitCosts(f64);

    impl EdgeCost for UnitCosts {
        fn cost(&self, _edge: EdgeId) -> f64 {
            self.0
        }
    }

    fn triangle() -> TimeExpandedGraph {
        let instance = Instance::from_edges(
            "triangle",
            3,
            0,
            &[(0, 1, 1), (1, 2, 1), (2, 0, 1), (1, 0, 1), (0, 2, 2)],
            Some(10),
        )
        .unwrap();
        TimeExpandedGraph::from_instance(Arc::new(instance))
    }

    #[test]
    fn test_vertex_set() {
        let mut a = VertexSet::new(130);
        let mut b = VertexSet::new(130);
        a.insert(3);
        b.insert(3);
        b.insert(129);

        assert!(a.contains(3));
        assert!(!a.contains(129));
        assert!(a.is_subset(&b));
        assert!(!b.is_subset(&a));
    }

    #[test]
    fn test_finds_negative_cycles_through_source() {
        let graph = triangle();
        let router = Router::new(&graph);
        let search = router.find_shortest_paths(&UnitCosts(-1.0), &HashSet::new(), TimeBounds::default(), &Unrestricted, SearchLimits::default());

        assert!(!search.paths.is_empty());
        assert_eq!(search.min_edge_cost, -1.0);
        for (cost, path) in &search.paths {
            assert!(*cost < 0.0);
            assert!(path.is_connected());
            assert_eq!(path.edges[0].source, graph.start());
            assert_eq!(path.edges.last().unwrap().target.vertex, 0);
        }
        // cheapest first
        assert!(search.paths.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn test_positive_costs_yield_no_path() {
        let graph = triangle();
        let router = Router::new(&graph);
        let search = router.find_shortest_paths(&UnitCosts(1.0), &HashSet::new(), TimeBounds::default(), &Unrestricted, SearchLimits::default());

        assert!(search.paths.is_empty());
        assert_eq!(search.min_edge_cost, 1.0);
    }

    #[test]
    fn test_forbidden_edges_are_avoided() {
        let graph = triangle();
        let router = Router::new(&graph);
        let forbidden: HashSet<EdgeId> = [0].into_iter().collect();
        let search = router.find_shortest_paths(&UnitCosts(-1.0), &forbidden, TimeBounds::default(), &Unrestricted, SearchLimits::default());

        assert!(!search.paths.is_empty());
        for (_, path) in &search.paths {
            assert!(path.edges.iter().all(|e| e.edge != 0));
        }
    }

    #[test]
    fn test_lower_bound_on_return() {
        let graph = triangle();
        let router = Router::new(&graph);
        let bounds = TimeBounds::new(Some(3), None);
        let search = router.find_shortest_paths(&UnitCosts(-1.0), &HashSet::new(), bounds, &Unrestricted, SearchLimits::default());

        assert!(!search.paths.is_empty());
        assert!(search.paths.iter().all(|(_, p)| p.arrival() >= 3));
    }
}
