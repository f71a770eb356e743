//! Pricing: discovering time-expanded edges and paths with negative reduced
//! cost, and handing them to the master LP.

pub mod costs;
pub mod edge;
pub mod manager;
pub mod path;
pub mod stabilization;

pub use costs::{CostFunction, DualValues, EdgeCost, FarkasCosts, ReducedCosts};
pub use edge::{EdgePricer, EdgePricerConfig};
pub use manager::{ManagerConfig, PricingManager, PricingOutcome};
pub use path::{PathPricer, PathPricerConfig, PathRestriction, PathSearch};
pub use stabilization::{StabilizationConfig, StabilizingPricer};

use crate::error::PricingError;
use crate::master::LpState;
use crate::timed::{TimeExpandedGraph, TimedEdge, TimedPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Tolerance below which a reduced cost counts as negative
pub const PRICING_EPS: f64 = 1e-6;

/// Which duals drive the pricing round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostType {
    /// Reduced-cost pricing on a feasible LP
    Simple,
    /// Farkas pricing on an infeasible LP
    Farkas,
}

/// Fragments found by one pricing round
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingResult {
    pub edges: Vec<TimedEdge>,
    pub paths: Vec<TimedPath>,
    /// Valid lower bound on the master LP objective, if one could be derived
    pub lower_bound: Option<f64>,
}

impl PricingResult {
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty() && self.paths.is_empty()
    }
}

/// What a pricer may know about the master beyond its duals
#[derive(Clone, Copy)]
pub struct PricingContext<'a> {
    pub lp: &'a dyn LpState,
    /// Value of the best accepted solution
    pub incumbent: Option<f64>,
    /// Best lower bound reported so far
    pub best_bound: Option<f64>,
}

impl<'a> PricingContext<'a> {
    pub fn new(lp: &'a dyn LpState) -> Self {
        PricingContext { lp, incumbent: None, best_bound: None }
    }
}

/// A pricing strategy
pub trait Pricer {
    fn perform_pricing(&mut self, ctx: &PricingContext<'_>, cost_type: CostType) -> Result<PricingResult, PricingError>;

    fn name(&self) -> &str;
}

/// `lp_objective + min(0, min_reduced_cost) * num_vertices`: every tour
/// uses exactly one edge per vertex, and each edge's reduced cost is at
/// least the minimum.
pub fn lagrangian_bound(lp_objective: f64, min_reduced_cost: f64, num_vertices: usize) -> f64 {
    let step = if min_reduced_cost.is_finite() { min_reduced_cost.min(0.0) } else { 0.0 };
    lp_objective + step * num_vertices as f64
}

/// Pricing strategy selected at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PricerKind {
    Path,
    Edge,
    Stabilized,
}

/// All pricing knobs, loadable from JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub path: PathPricerConfig,
    pub edge: EdgePricerConfig,
    pub stabilization: StabilizationConfig,
    pub manager: ManagerConfig,
}

impl PricingConfig {
    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| format!("Invalid pricing configuration: {}", e))
    }
}

/// Build the pricer of the requested kind over a shared graph
pub fn build_pricer(kind: PricerKind, graph: Arc<TimeExpandedGraph>, config: &PricingConfig) -> Box<dyn Pricer> {
    match kind {
        PricerKind::Path => Box::new(PathPricer::new(graph, config.path.clone())),
        PricerKind::Edge => Box::new(EdgePricer::new(graph, config.edge.clone())),
        PricerKind::Stabilized => Box::new(StabilizingPricer::new(
            PathPricer::new(graph, config.path.clone()),
            config.stabilization.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lagrangian_bound() {
        assert_eq!(lagrangian_bound(10.0, -0.5, 4), 8.0);
        assert_eq!(lagrangian_bound(10.0, 2.0, 4), 10.0);
        assert_eq!(lagrangian_bound(10.0, f64::INFINITY, 4), 10.0);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config = PricingConfig::from_json(r#"{ "edge": { "num_edges": 5, "relaxed": true } }"#).unwrap();

        assert_eq!(config.edge.num_edges, 5);
        assert!(config.edge.relaxed);
        assert_eq!(config.path.max_paths, PathPricerConfig::default().max_paths);
    }
}
