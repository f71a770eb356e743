//! Path pricing: resource-constrained shortest paths from the source back to
//! the source in the time-expanded network.
//!
//! The variants only differ in the [`ExtensionRule`] handed to the router:
//!
//! - `Acyclic` never re-enters one of the last `lookback` original vertices
//! - `HoleFree` never re-enters any original vertex already on the path
//! - `TwoCycleFree` only forbids going straight back where it came from

use super::costs::{CostFunction, EdgeCost};
use super::{lagrangian_bound, CostType, Pricer, PricingContext, PricingResult, PRICING_EPS};
use crate::error::PricingError;
use crate::instance::{EdgeId, VertexId};
use crate::timed::{ExtensionRule, Router, SearchLimits, TimeBounds, TimeExpandedGraph, TimedPath, Trail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathRestriction {
    Acyclic { lookback: usize },
    HoleFree,
    TwoCycleFree,
}

impl Default for PathRestriction {
    fn default() -> Self {
        PathRestriction::Acyclic { lookback: 3 }
    }
}

impl ExtensionRule for PathRestriction {
    fn lookback(&self) -> usize {
        match *self {
            PathRestriction::Acyclic { lookback } => lookback.max(1),
            PathRestriction::HoleFree => 1,
            PathRestriction::TwoCycleFree => 2,
        }
    }

    fn admits(&self, trail: &Trail<'_>, next: VertexId) -> bool {
        match self {
            PathRestriction::Acyclic { .. } => !trail.recent.contains(&next),
            PathRestriction::HoleFree => !trail.visited.contains(next),
            PathRestriction::TwoCycleFree => {
                let n = trail.recent.len();
                trail.recent[n - 1] != next && (n < 2 || trail.recent[n - 2] != next)
            }
        }
    }

    fn dominates(&self, a: &Trail<'_>, b: &Trail<'_>) -> bool {
        match self {
            PathRestriction::HoleFree => a.visited.is_subset(b.visited),
            _ => a.recent == b.recent,
        }
    }
}

/// Path pricer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathPricerConfig {
    pub restriction: PathRestriction,
    /// Paths returned per round at most
    pub max_paths: usize,
    /// Labels kept per timed vertex
    pub label_limit: usize,
}

impl Default for PathPricerConfig {
    fn default() -> Self {
        PathPricerConfig {
            restriction: PathRestriction::default(),
            max_paths: 10,
            label_limit: 64,
        }
    }
}

/// Result of [`PathPricer::find_paths`]
#[derive(Debug, Clone)]
pub struct PathSearch {
    /// Negative-cost source-to-source paths, cheapest first
    pub paths: Vec<(f64, TimedPath)>,
    /// Minimum cost of any edge considered, even when no path was found
    pub min_reduced_cost: f64,
    /// Whether the search kept every non-dominated label
    pub exhaustive: bool,
}

pub struct PathPricer {
    graph: Arc<TimeExpandedGraph>,
    config: PathPricerConfig,
}

impl PathPricer {
    pub fn new(graph: Arc<TimeExpandedGraph>, config: PathPricerConfig) -> Self {
        PathPricer { graph, config }
    }

    pub fn graph(&self) -> &TimeExpandedGraph {
        &self.graph
    }

    pub fn config(&self) -> &PathPricerConfig {
        &self.config
    }

    /// Search up to `max_paths` negative-cost complete paths avoiding
    /// `forbidden` and respecting `bounds`.
    pub fn find_paths(&self, costs: &dyn EdgeCost, forbidden: &HashSet<EdgeId>, bounds: TimeBounds) -> PathSearch {
        let limits = SearchLimits {
            max_paths: self.config.max_paths,
            label_limit: self.config.label_limit,
            cost_threshold: -PRICING_EPS,
        };
        let search = Router::new(&self.graph).find_shortest_paths(costs, forbidden, bounds, &self.config.restriction, limits);

        PathSearch {
            paths: search.paths,
            min_reduced_cost: search.min_edge_cost,
            exhaustive: search.exhaustive,
        }
    }

    /// Minimum cost over every admissible edge of the network, whether or not
    /// a search reached it
    pub fn min_edge_cost(&self, costs: &dyn EdgeCost, forbidden: &HashSet<EdgeId>, bounds: TimeBounds) -> f64 {
        let source = self.graph.source();
        (0..self.graph.instance().num_edges())
            .filter(|e| !forbidden.contains(e))
            .filter(|&e| {
                self.graph
                    .instances(e)
                    .any(|te| bounds.admits(te.target.vertex, te.target.time, source))
            })
            .map(|e| costs.cost(e))
            .fold(f64::INFINITY, f64::min)
    }

    /// Dual bound of a search: exact edge minimum when the search was
    /// exhaustive, full scan otherwise
    pub fn bound_from_search(
        &self,
        search: &PathSearch,
        costs: &dyn EdgeCost,
        forbidden: &HashSet<EdgeId>,
        bounds: TimeBounds,
        lp_objective: f64,
    ) -> f64 {
        let min = if search.exhaustive {
            search.min_reduced_cost
        } else {
            self.min_edge_cost(costs, forbidden, bounds)
        };
        lagrangian_bound(lp_objective, min, self.graph.instance().dimension)
    }
}

impl Pricer for PathPricer {
    fn perform_pricing(&mut self, ctx: &PricingContext<'_>, cost_type: CostType) -> Result<PricingResult, PricingError> {
        let duals = ctx.lp.dual_values(cost_type)?;
        let costs = CostFunction::new(cost_type, self.graph.instance(), &duals);
        let forbidden = ctx.lp.forbidden_edges();
        let bounds = ctx.lp.time_bounds();

        let search = self.find_paths(&costs, &forbidden, bounds);
        let lower_bound = match cost_type {
            CostType::Simple => Some(self.bound_from_search(&search, &costs, &forbidden, bounds, ctx.lp.lp_objective()?)),
            CostType::Farkas => None,
        };

        log::debug!(
            "{}: {} paths, min edge cost {:.4}",
            self.name(),
            search.paths.len(),
            search.min_reduced_cost
        );

        Ok(PricingResult {
            edges: Vec::new(),
            paths: search.paths.into_iter().map(|(_, p)| p).collect(),
            lower_bound,
        })
    }

    fn name(&self) -> &str {
        match self.config.restriction {
            PathRestriction::Acyclic { .. } => "AcyclicPathPricer",
            PathRestriction::HoleFree => "HoleFreePathPricer",
            PathRestriction::TwoCycleFree => "TwoCycleFreePathPricer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master::{InMemoryMaster, LpState};
    use crate::pricing::costs::{DualValues, ReducedCosts};
    use crate::test_support::{brute_force_min_tour, pentagon_graph, random_graph};
    use proptest::prelude::*;

    fn respects_restriction(vertices: &[VertexId], restriction: PathRestriction) -> bool {
        // every vertex but the closing source is subject to the rule
        let inner = &vertices[..vertices.len() - 1];
        match restriction {
            PathRestriction::HoleFree => {
                let unique: HashSet<_> = inner.iter().collect();
                unique.len() == inner.len()
            }
            PathRestriction::TwoCycleFree => inner.windows(3).all(|w| w[0] != w[2]),
            PathRestriction::Acyclic { lookback } => {
                (1..inner.len()).all(|j| !inner[j.saturating_sub(lookback)..j].contains(&inner[j]))
            }
        }
    }

    fn generous_duals(num_edges: usize, value: f64) -> DualValues {
        DualValues::new(vec![value; num_edges])
    }

    #[test]
    fn test_restriction_predicates() {
        let visited = crate::timed::VertexSet::new(8);
        let trail = Trail { recent: &[4, 2, 7], visited: &visited };

        assert!(!PathRestriction::Acyclic { lookback: 3 }.admits(&trail, 4));
        assert!(PathRestriction::Acyclic { lookback: 3 }.admits(&trail, 5));
        assert!(!PathRestriction::TwoCycleFree.admits(&trail, 2));
        assert!(PathRestriction::TwoCycleFree.admits(&trail, 4));
    }

    #[test]
    fn test_finds_improving_path_with_large_duals() {
        let graph = pentagon_graph();
        let master = InMemoryMaster::new(graph.instance().num_edges())
            .with_duals(generous_duals(graph.instance().num_edges(), 4.0));
        let mut pricer = PathPricer::new(graph.clone(), PathPricerConfig::default());

        let result = pricer.perform_pricing(&PricingContext::new(&master), CostType::Simple).unwrap();

        assert!(!result.paths.is_empty());
        let duals = master.dual_values(CostType::Simple).unwrap();
        let costs = ReducedCosts::new(graph.instance(), &duals);
        for path in &result.paths {
            assert!(path.cost(&costs) < 0.0);
        }
        // every edge costs at most 3 - 4 = -1, five vertices
        let bound = result.lower_bound.unwrap();
        assert!(bound <= -5.0 + 1e-9);
    }

    #[test]
    fn test_zero_duals_yield_nothing() {
        let graph = pentagon_graph();
        let master = InMemoryMaster::new(graph.instance().num_edges());
        let mut pricer = PathPricer::new(graph, PathPricerConfig::default());

        let result = pricer.perform_pricing(&PricingContext::new(&master), CostType::Simple).unwrap();

        assert!(result.is_empty());
        assert_eq!(result.lower_bound, Some(0.0));
    }

    #[test]
    fn test_farkas_reports_no_bound() {
        let graph = pentagon_graph();
        let mut master = InMemoryMaster::new(graph.instance().num_edges());
        master.set_farkas_duals(generous_duals(graph.instance().num_edges(), 1.0));
        let mut pricer = PathPricer::new(graph, PathPricerConfig::default());

        let result = pricer.perform_pricing(&PricingContext::new(&master), CostType::Farkas).unwrap();

        assert!(!result.paths.is_empty());
        assert_eq!(result.lower_bound, None);
    }

    #[test]
    fn test_hole_free_finds_the_full_tour() {
        let graph = pentagon_graph();
        let config = PathPricerConfig { restriction: PathRestriction::HoleFree, ..Default::default() };
        let pricer = PathPricer::new(graph.clone(), config);
        // only ring edges are attractive
        let mut duals = DualValues::zeros(graph.instance().num_edges());
        for i in 0..5 {
            duals.set(graph.instance().find_edge(i, (i + 1) % 5).unwrap(), 3.0);
        }
        let costs = ReducedCosts::new(graph.instance(), &duals);

        let search = pricer.find_paths(&costs, &HashSet::new(), TimeBounds::default());

        let (cost, best) = &search.paths[0];
        assert!((cost + 5.0).abs() < 1e-9);
        assert!(best.is_tour(graph.instance()));
    }

    #[test]
    fn test_truncated_search_bounds_with_full_scan() {
        let graph = pentagon_graph();
        let instance = graph.instance();
        let mut duals = DualValues::zeros(instance.num_edges());
        duals.set(instance.find_edge(3, 4).unwrap(), 9.0);
        let master = InMemoryMaster::new(instance.num_edges()).with_duals(duals.clone());
        let config = PathPricerConfig { restriction: PathRestriction::HoleFree, label_limit: 1, ..Default::default() };
        let mut pricer = PathPricer::new(graph.clone(), config);
        let costs = ReducedCosts::new(instance, &duals);

        // (2, 6) is reached through 3 and through 4, neither dominating
        let search = pricer.find_paths(&costs, &HashSet::new(), TimeBounds::default());
        assert!(!search.exhaustive);

        let result = pricer.perform_pricing(&PricingContext::new(&master), CostType::Simple).unwrap();
        assert_eq!(result.lower_bound, Some(-35.0));
        let best = brute_force_min_tour(&graph, &costs, &HashSet::new()).unwrap();
        assert!(result.lower_bound.unwrap() <= best);
    }

    proptest! {
        #[test]
        fn prop_truncated_bound_never_exceeds_best_tour(
            seed in 0u64..1000,
            duals in proptest::collection::vec(-2.0f64..8.0, 20),
        ) {
            let graph = random_graph(seed, 5);
            let instance = graph.instance();
            let duals = DualValues::new(duals);
            let master = InMemoryMaster::new(instance.num_edges()).with_duals(duals.clone());
            let config = PathPricerConfig { restriction: PathRestriction::HoleFree, label_limit: 1, ..Default::default() };
            let mut pricer = PathPricer::new(graph.clone(), config);

            let result = pricer.perform_pricing(&PricingContext::new(&master), CostType::Simple).unwrap();

            let costs = ReducedCosts::new(instance, &duals);
            if let Some(best) = brute_force_min_tour(&graph, &costs, &HashSet::new()) {
                prop_assert!(result.lower_bound.unwrap() <= best + 1e-9);
            }
        }

        #[test]
        fn prop_paths_are_feasible(
            seed in 0u64..500,
            dual in 0.0f64..8.0,
            forbid in 0usize..12,
            upper in 6u32..30,
            lower in 0u32..10,
            variant in 0usize..3,
        ) {
            let graph = random_graph(seed, 5);
            let instance = graph.instance();
            let restriction = match variant {
                0 => PathRestriction::Acyclic { lookback: 3 },
                1 => PathRestriction::HoleFree,
                _ => PathRestriction::TwoCycleFree,
            };
            let pricer = PathPricer::new(graph.clone(), PathPricerConfig { restriction, ..Default::default() });
            let duals = generous_duals(instance.num_edges(), dual);
            let costs = ReducedCosts::new(instance, &duals);
            let forbidden: HashSet<EdgeId> = [forbid % instance.num_edges()].into_iter().collect();
            let bounds = TimeBounds::new(Some(lower), Some(upper));

            let search = pricer.find_paths(&costs, &forbidden, bounds);

            for (cost, path) in &search.paths {
                prop_assert!(*cost < 0.0);
                prop_assert!((path.cost(&costs) - cost).abs() < 1e-9);
                prop_assert!(path.is_connected());
                prop_assert_eq!(path.edges[0].source, graph.start());
                prop_assert_eq!(path.edges.last().unwrap().target.vertex, instance.source);
                prop_assert!(path.arrival() >= lower);
                prop_assert!(path.edges.iter().all(|e| e.target.time <= upper));
                prop_assert!(path.edges.iter().all(|e| !forbidden.contains(&e.edge)));
                let vertices = path.vertices();
                prop_assert!(vertices[1..vertices.len() - 1].iter().all(|&v| v != instance.source));
                prop_assert!(respects_restriction(&vertices, restriction));
            }
        }
    }
}
