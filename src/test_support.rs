//! Small fixed networks shared by the unit tests.

use crate::instance::{EdgeId, Instance};
use crate::pricing::costs::EdgeCost;
use crate::timed::TimeExpandedGraph;
use crate::tour::Tour;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::sync::Arc;

/// Complete digraph on 5 vertices, source 0, horizon 20. Ring edges
/// `i -> i + 1 (mod 5)` take 2, every other edge takes 3.
pub(crate) fn pentagon() -> Instance {
    let mut arcs = Vec::new();
    for i in 0..5 {
        for j in 0..5 {
            if i != j {
                let time = if j == (i + 1) % 5 { 2 } else { 3 };
                arcs.push((i, j, time));
            }
        }
    }
    Instance::from_edges("pentagon", 5, 0, &arcs, Some(20)).unwrap()
}

pub(crate) fn pentagon_graph() -> Arc<TimeExpandedGraph> {
    Arc::new(TimeExpandedGraph::from_instance(Arc::new(pentagon())))
}

/// Complete digraph with travel times in `1..=5`, default horizon
pub(crate) fn random_instance(seed: u64, n: usize) -> Instance {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut arcs = Vec::new();
    for i in 0..n {
        for j in 0..n {
            if i != j {
                arcs.push((i, j, rng.gen_range(1..=5)));
            }
        }
    }
    Instance::from_edges("random", n, 0, &arcs, None).unwrap()
}

pub(crate) fn random_graph(seed: u64, n: usize) -> Arc<TimeExpandedGraph> {
    Arc::new(TimeExpandedGraph::from_instance(Arc::new(random_instance(seed, n))))
}

/// Every permutation of `items`
pub(crate) fn permutations(items: &[usize]) -> Vec<Vec<usize>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut result = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head);
            result.push(tail);
        }
    }
    result
}

/// Cheapest feasible tour under `costs` by full enumeration, if any
pub(crate) fn brute_force_min_tour(graph: &TimeExpandedGraph, costs: &dyn EdgeCost, forbidden: &HashSet<EdgeId>) -> Option<f64> {
    let instance = graph.instance();
    let others: Vec<usize> = (1..instance.dimension).collect();
    permutations(&others)
        .into_iter()
        .filter_map(|order| {
            let mut vertices = vec![0];
            vertices.extend(order);
            let tour = Tour::from_vertices(instance, vertices, "enumeration");
            let edges = tour.edges(instance).ok()?;
            if !tour.feasible || edges.iter().any(|e| forbidden.contains(e)) {
                return None;
            }
            Some(edges.iter().map(|&e| costs.cost(e)).sum::<f64>())
        })
        .min_by(|a, b| a.total_cmp(b))
}
