//! Edge pricing: negative reduced-cost timed instances of single original
//! edges, scanned edge by edge in parallel.

use super::costs::{CostFunction, EdgeCost};
use super::{lagrangian_bound, CostType, Pricer, PricingContext, PricingResult, PRICING_EPS};
use crate::error::PricingError;
use crate::instance::EdgeId;
use crate::timed::{TimeBounds, TimeExpandedGraph, TimedEdge};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Edge pricer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgePricerConfig {
    /// Timed instances kept per original edge and round
    pub num_edges: usize,
    /// Ignore the upper time bound (unconstrained relaxation)
    pub relaxed: bool,
}

impl Default for EdgePricerConfig {
    fn default() -> Self {
        EdgePricerConfig { num_edges: 20, relaxed: false }
    }
}

/// Result of scanning one original edge
struct EdgeScan {
    /// Reduced cost, if any instance was admissible
    considered: Option<f64>,
    candidates: Vec<(OrderedFloat<f64>, TimedEdge)>,
}

/// Cheap pricing: per original edge, the best few timed instances with
/// negative reduced cost, without any path search.
pub struct EdgePricer {
    graph: Arc<TimeExpandedGraph>,
    config: EdgePricerConfig,
}

impl EdgePricer {
    pub fn new(graph: Arc<TimeExpandedGraph>, config: EdgePricerConfig) -> Self {
        EdgePricer { graph, config }
    }

    pub fn graph(&self) -> &TimeExpandedGraph {
        &self.graph
    }

    /// Negative timed edges, grouped by original edge, and the minimum
    /// reduced cost over every admissible instance.
    pub fn find_edges(&self, costs: &dyn EdgeCost, forbidden: &HashSet<EdgeId>, bounds: TimeBounds) -> (Vec<TimedEdge>, f64) {
        let scans: Vec<EdgeScan> = (0..self.graph.instance().num_edges())
            .into_par_iter()
            .filter(|e| !forbidden.contains(e))
            .map(|e| self.scan_edge(e, costs, bounds))
            .collect();

        let mut min_reduced_cost = f64::INFINITY;
        let mut edges = Vec::new();
        for scan in scans {
            if let Some(cost) = scan.considered {
                min_reduced_cost = min_reduced_cost.min(cost);
            }
            edges.extend(scan.candidates.into_iter().map(|(_, te)| te));
        }
        (edges, min_reduced_cost)
    }

    fn scan_edge(&self, edge: EdgeId, costs: &dyn EdgeCost, bounds: TimeBounds) -> EdgeScan {
        let source = self.graph.source();
        let bounds = if self.config.relaxed { TimeBounds { upper: None, ..bounds } } else { bounds };
        let cost = costs.cost(edge);

        let admissible: Vec<TimedEdge> = self
            .graph
            .instances(edge)
            .filter(|te| bounds.admits(te.target.vertex, te.target.time, source))
            .collect();
        if admissible.is_empty() {
            return EdgeScan { considered: None, candidates: Vec::new() };
        }

        let mut candidates: Vec<(OrderedFloat<f64>, TimedEdge)> = if cost < -PRICING_EPS {
            admissible.into_iter().map(|te| (OrderedFloat(cost), te)).collect()
        } else {
            Vec::new()
        };
        candidates.sort();
        candidates.truncate(self.config.num_edges);

        EdgeScan { considered: Some(cost), candidates }
    }
}

impl Pricer for EdgePricer {
    fn perform_pricing(&mut self, ctx: &PricingContext<'_>, cost_type: CostType) -> Result<PricingResult, PricingError> {
        let duals = ctx.lp.dual_values(cost_type)?;
        let costs = CostFunction::new(cost_type, self.graph.instance(), &duals);
        let forbidden = ctx.lp.forbidden_edges();

        let (edges, min_reduced_cost) = self.find_edges(&costs, &forbidden, ctx.lp.time_bounds());
        let lower_bound = match cost_type {
            CostType::Simple => Some(lagrangian_bound(
                ctx.lp.lp_objective()?,
                min_reduced_cost,
                self.graph.instance().dimension,
            )),
            CostType::Farkas => None,
        };

        log::debug!("{}: {} edges, min reduced cost {:.4}", self.name(), edges.len(), min_reduced_cost);

        Ok(PricingResult { edges, paths: Vec::new(), lower_bound })
    }

    fn name(&self) -> &str {
        "EdgePricer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master::InMemoryMaster;
    use crate::master::LpState;
    use crate::pricing::costs::{DualValues, ReducedCosts};
    use crate::test_support::{brute_force_min_tour, pentagon_graph, random_graph};
    use proptest::prelude::*;

    #[test]
    fn test_returns_only_negative_edges() {
        let graph = pentagon_graph();
        let instance = graph.instance();
        let mut duals = DualValues::zeros(instance.num_edges());
        let cheap = instance.find_edge(1, 2).unwrap();
        let neutral = instance.find_edge(2, 3).unwrap();
        duals.set(cheap, 5.0);
        duals.set(neutral, 2.0);
        let master = InMemoryMaster::new(instance.num_edges()).with_duals(duals.clone());
        let mut pricer = EdgePricer::new(graph.clone(), EdgePricerConfig::default());

        let result = pricer.perform_pricing(&PricingContext::new(&master), CostType::Simple).unwrap();

        assert!(!result.edges.is_empty());
        let costs = ReducedCosts::new(instance, &duals);
        assert!(result.edges.iter().all(|te| te.edge == cheap));
        assert!(result.edges.iter().all(|te| costs.cost(te.edge) < 0.0));
        // 2 - 5 = -3 on five vertices
        assert_eq!(result.lower_bound, Some(-15.0));
    }

    #[test]
    fn test_respects_instance_time_window() {
        let mut instance = crate::test_support::pentagon();
        instance.lower_bound = Some(10);
        let graph = Arc::new(TimeExpandedGraph::from_instance(Arc::new(instance.clone())));
        let master = InMemoryMaster::for_instance(&instance)
            .with_duals(DualValues::new(vec![10.0; instance.num_edges()]));
        assert_eq!(master.time_bounds(), TimeBounds::new(Some(10), Some(20)));
        let mut pricer = EdgePricer::new(graph, EdgePricerConfig { num_edges: 100, relaxed: false });

        let result = pricer.perform_pricing(&PricingContext::new(&master), CostType::Simple).unwrap();

        let returns: Vec<_> = result.edges.iter().filter(|te| te.target.vertex == instance.source).collect();
        assert!(!returns.is_empty());
        assert!(returns.iter().all(|te| te.target.time >= 10));
    }

    #[test]
    fn test_caps_instances_per_edge() {
        let graph = pentagon_graph();
        let instance = graph.instance();
        let master = InMemoryMaster::new(instance.num_edges())
            .with_duals(DualValues::new(vec![10.0; instance.num_edges()]));
        let config = EdgePricerConfig { num_edges: 2, relaxed: false };
        let mut pricer = EdgePricer::new(graph.clone(), config);

        let result = pricer.perform_pricing(&PricingContext::new(&master), CostType::Simple).unwrap();

        for e in 0..instance.num_edges() {
            assert!(result.edges.iter().filter(|te| te.edge == e).count() <= 2);
        }
    }

    #[test]
    fn test_upper_bound_and_relaxation() {
        let graph = pentagon_graph();
        let instance = graph.instance();
        let mut master = InMemoryMaster::new(instance.num_edges())
            .with_duals(DualValues::new(vec![10.0; instance.num_edges()]));
        master.set_time_bounds(TimeBounds::new(None, Some(6)));

        let strict = EdgePricer::new(graph.clone(), EdgePricerConfig { num_edges: 100, relaxed: false })
            .perform_pricing(&PricingContext::new(&master), CostType::Simple)
            .unwrap();
        let relaxed = EdgePricer::new(graph.clone(), EdgePricerConfig { num_edges: 100, relaxed: true })
            .perform_pricing(&PricingContext::new(&master), CostType::Simple)
            .unwrap();

        assert!(strict.edges.iter().all(|te| te.target.time <= 6));
        assert!(relaxed.edges.iter().any(|te| te.target.time > 6));
    }

    #[test]
    fn test_farkas_sign() {
        let graph = pentagon_graph();
        let instance = graph.instance();
        let mut master = InMemoryMaster::new(instance.num_edges());
        let mut farkas = DualValues::zeros(instance.num_edges());
        farkas.set(0, 1.0);
        farkas.set(1, -1.0);
        master.set_farkas_duals(farkas.clone());
        let mut pricer = EdgePricer::new(graph.clone(), EdgePricerConfig::default());

        let result = pricer.perform_pricing(&PricingContext::new(&master), CostType::Farkas).unwrap();

        assert!(!result.edges.is_empty());
        assert!(result.edges.iter().all(|te| -farkas.get(te.edge) < 0.0));
        assert_eq!(result.lower_bound, None);
    }

    /// Minimum reduced cost of any feasible tour, by enumeration
    proptest! {
        #[test]
        fn prop_bound_never_exceeds_best_tour(
            seed in 0u64..1000,
            duals in proptest::collection::vec(-2.0f64..8.0, 20),
            forbid in proptest::option::of(0usize..20),
        ) {
            let graph = random_graph(seed, 5);
            let instance = graph.instance();
            let duals = DualValues::new(duals);
            let mut master = InMemoryMaster::new(instance.num_edges()).with_duals(duals.clone());
            if let Some(e) = forbid {
                master.forbid(e);
            }
            let mut pricer = EdgePricer::new(graph.clone(), EdgePricerConfig::default());

            let result = pricer.perform_pricing(&PricingContext::new(&master), CostType::Simple).unwrap();

            let costs = ReducedCosts::new(instance, &duals);
            if let Some(best) = brute_force_min_tour(&graph, &costs, &master.forbidden_edges()) {
                prop_assert!(result.lower_bound.unwrap() <= best + 1e-9);
            }
            for te in &result.edges {
                prop_assert!(costs.cost(te.edge) < 0.0);
                prop_assert!(forbid != Some(te.edge));
            }
        }
    }
}
