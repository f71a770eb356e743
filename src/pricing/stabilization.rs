//! Wentges dual smoothing around a path pricer.
//!
//! Each reduced-cost round prices against `alpha * center + (1 - alpha) * duals`
//! where the center is the dual point with the best Lagrangian bound seen so
//! far. Paths are accepted only if they are still improving under the true
//! duals; a round that finds none re-prices once with the true duals, so no
//! improving column is ever masked.

use super::costs::{DualValues, ReducedCosts};
use super::path::PathPricer;
use super::{lagrangian_bound, CostType, Pricer, PricingContext, PricingResult, PRICING_EPS};
use crate::error::PricingError;
use crate::timed::TimedPath;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizationConfig {
    /// Delegate straight to the path pricer when false
    pub enabled: bool,
    pub initial_alpha: f64,
    pub max_alpha: f64,
    pub alpha_step_up: f64,
    pub alpha_step_down: f64,
    /// Consecutive misprices before the center is dropped
    pub max_misprices: usize,
    /// Relative incumbent gap below which the center is reset
    pub initial_prove_gap: f64,
    /// Applied to the prove gap every time it triggers
    pub prove_gap_factor: f64,
    pub tolerance: f64,
}

impl Default for StabilizationConfig {
    fn default() -> Self {
        StabilizationConfig {
            enabled: true,
            initial_alpha: 0.5,
            max_alpha: 0.9,
            alpha_step_up: 0.1,
            alpha_step_down: 0.3,
            max_misprices: 5,
            initial_prove_gap: 0.05,
            prove_gap_factor: 0.5,
            tolerance: 1e-6,
        }
    }
}

/// The dual point with the best bound so far
#[derive(Debug, Clone)]
struct StabilityCenter {
    duals: DualValues,
    objective: f64,
    bound: f64,
}

/// Smoothed duals of a single round
#[derive(Debug, Clone)]
pub struct CenteredDuals {
    pub duals: DualValues,
    /// Dual objective of the smoothed point
    pub offset: f64,
    pub lagrangian_bound: Option<f64>,
}

impl CenteredDuals {
    fn new(center: &StabilityCenter, alpha: f64, duals: &DualValues, lp_objective: f64) -> Self {
        CenteredDuals {
            duals: center.duals.interpolate(alpha, duals),
            offset: alpha * center.objective + (1.0 - alpha) * lp_objective,
            lagrangian_bound: None,
        }
    }
}

/// Fails when a bound claims more than the best known solution allows
pub fn check_upper_bound(bound: f64, incumbent: Option<f64>, tolerance: f64) -> Result<(), PricingError> {
    match incumbent {
        Some(incumbent) if bound > incumbent + tolerance * incumbent.abs().max(1.0) => {
            Err(PricingError::InconsistentBound { bound, incumbent })
        }
        _ => Ok(()),
    }
}

/// The bound if it can be reported upstream: finite and not above the LP
/// objective it is supposed to bound
pub fn check_dual_feasibility(bound: f64, lp_objective: f64, tolerance: f64) -> Option<f64> {
    if !bound.is_finite() {
        log::warn!("Dropping non-finite stabilized bound");
        return None;
    }
    if bound > lp_objective + tolerance * lp_objective.abs().max(1.0) {
        log::warn!("Dropping stabilized bound {:.4} above LP objective {:.4}", bound, lp_objective);
        return None;
    }
    Some(bound)
}

pub struct StabilizingPricer {
    inner: PathPricer,
    config: StabilizationConfig,
    center: Option<StabilityCenter>,
    alpha: f64,
    misprices: usize,
    prove_gap: f64,
}

impl StabilizingPricer {
    pub fn new(inner: PathPricer, config: StabilizationConfig) -> Self {
        StabilizingPricer {
            inner,
            alpha: config.initial_alpha,
            prove_gap: config.initial_prove_gap,
            config,
            center: None,
            misprices: 0,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn prove_gap(&self) -> f64 {
        self.prove_gap
    }

    pub fn has_center(&self) -> bool {
        self.center.is_some()
    }

    fn reset_center(&mut self) {
        self.center = None;
        self.alpha = self.config.initial_alpha;
        self.misprices = 0;
    }

    /// Relative gap between incumbent and best bound dropped below the prove gap
    fn gap_closed(&self, ctx: &PricingContext<'_>) -> bool {
        match (ctx.incumbent, ctx.best_bound) {
            (Some(incumbent), Some(bound)) => (incumbent - bound) / incumbent.abs().max(1.0) < self.prove_gap,
            _ => false,
        }
    }

    fn move_center(&mut self, duals: DualValues, objective: f64, bound: f64) {
        if self.center.as_ref().map_or(true, |c| bound > c.bound) {
            self.center = Some(StabilityCenter { duals, objective, bound });
        }
    }

    /// One round against the true duals; seeds or moves the center
    fn price_true(&mut self, ctx: &PricingContext<'_>, duals: DualValues, lp_objective: f64) -> Result<PricingResult, PricingError> {
        let forbidden = ctx.lp.forbidden_edges();
        let bounds = ctx.lp.time_bounds();
        let graph = self.inner.graph();
        let costs = ReducedCosts::new(graph.instance(), &duals);

        let search = self.inner.find_paths(&costs, &forbidden, bounds);
        let bound = self.inner.bound_from_search(&search, &costs, &forbidden, bounds, lp_objective);
        let paths: Vec<TimedPath> = search.paths.into_iter().map(|(_, p)| p).collect();

        check_upper_bound(bound, ctx.incumbent, self.config.tolerance)?;
        let lower_bound = check_dual_feasibility(bound, lp_objective, self.config.tolerance);
        if let Some(bound) = lower_bound {
            self.move_center(duals, lp_objective, bound);
        }

        Ok(PricingResult { edges: Vec::new(), paths, lower_bound })
    }

    fn price_centered(&mut self, ctx: &PricingContext<'_>, duals: DualValues, lp_objective: f64) -> Result<PricingResult, PricingError> {
        let Some(center) = self.center.as_ref() else {
            return self.price_true(ctx, duals, lp_objective);
        };
        let mut centered = CenteredDuals::new(center, self.alpha, &duals, lp_objective);

        let forbidden = ctx.lp.forbidden_edges();
        let bounds = ctx.lp.time_bounds();
        let graph = self.inner.graph();
        let n = graph.instance().dimension;
        let smoothed = ReducedCosts::new(graph.instance(), &centered.duals);
        let search = self.inner.find_paths(&smoothed, &forbidden, bounds);
        let min_reduced_cost = if search.exhaustive {
            search.min_reduced_cost
        } else {
            self.inner.min_edge_cost(&smoothed, &forbidden, bounds)
        };

        let bound = lagrangian_bound(centered.offset, min_reduced_cost, n);
        check_upper_bound(bound, ctx.incumbent, self.config.tolerance)?;
        centered.lagrangian_bound = check_dual_feasibility(bound, lp_objective, self.config.tolerance);

        let real = ReducedCosts::new(graph.instance(), &duals);
        let improving: Vec<TimedPath> = search
            .paths
            .into_iter()
            .map(|(_, p)| p)
            .filter(|p| p.cost(&real) < -PRICING_EPS)
            .collect();

        if let Some(bound) = centered.lagrangian_bound {
            self.move_center(centered.duals.clone(), centered.offset, bound);
        }

        if !improving.is_empty() {
            self.alpha = (self.alpha + self.config.alpha_step_up).min(self.config.max_alpha);
            self.misprices = 0;
            return Ok(PricingResult { edges: Vec::new(), paths: improving, lower_bound: centered.lagrangian_bound });
        }

        self.misprices += 1;
        self.alpha = (self.alpha - self.config.alpha_step_down).max(0.0);
        log::debug!("Misprice {} (alpha now {:.2})", self.misprices, self.alpha);
        if self.misprices >= self.config.max_misprices {
            log::debug!("Resetting stability center after {} misprices", self.misprices);
            self.reset_center();
        }

        let mut fallback = self.price_true(ctx, duals, lp_objective)?;
        fallback.lower_bound = match (fallback.lower_bound, centered.lagrangian_bound) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        Ok(fallback)
    }
}

impl Pricer for StabilizingPricer {
    fn perform_pricing(&mut self, ctx: &PricingContext<'_>, cost_type: CostType) -> Result<PricingResult, PricingError> {
        if cost_type == CostType::Farkas || !self.config.enabled {
            return self.inner.perform_pricing(ctx, cost_type);
        }

        let duals = ctx.lp.dual_values(CostType::Simple)?;
        let lp_objective = ctx.lp.lp_objective()?;

        if self.gap_closed(ctx) {
            self.prove_gap *= self.config.prove_gap_factor;
            log::info!("Incumbent gap closed, prove gap tightened to {:.2e}", self.prove_gap);
            self.reset_center();
            return self.price_true(ctx, duals, lp_objective);
        }

        self.price_centered(ctx, duals, lp_objective)
    }

    fn name(&self) -> &str {
        "StabilizingPricer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master::InMemoryMaster;
    use crate::pricing::path::PathPricerConfig;
    use crate::test_support::{pentagon_graph, random_graph};

    fn stabilized(graph: std::sync::Arc<crate::timed::TimeExpandedGraph>) -> StabilizingPricer {
        StabilizingPricer::new(PathPricer::new(graph, PathPricerConfig::default()), StabilizationConfig::default())
    }

    #[test]
    fn test_bound_checks() {
        assert!(check_upper_bound(5.0, Some(3.0), 1e-6).is_err());
        assert!(check_upper_bound(3.0, Some(3.0), 1e-6).is_ok());
        assert!(check_upper_bound(100.0, None, 1e-6).is_ok());

        assert_eq!(check_dual_feasibility(f64::NAN, 0.0, 1e-6), None);
        assert_eq!(check_dual_feasibility(2.0, 1.0, 1e-6), None);
        assert_eq!(check_dual_feasibility(-3.0, 1.0, 1e-6), Some(-3.0));
    }

    #[test]
    fn test_first_round_seeds_center() {
        let graph = pentagon_graph();
        let n = graph.instance().num_edges();
        let master = InMemoryMaster::new(n).with_duals(DualValues::new(vec![4.0; n]));
        let mut pricer = stabilized(graph);

        let result = pricer.perform_pricing(&PricingContext::new(&master), CostType::Simple).unwrap();

        assert!(!result.paths.is_empty());
        assert!(pricer.has_center());
    }

    #[test]
    fn test_misprice_falls_back_to_true_duals() {
        let graph = pentagon_graph();
        let n = graph.instance().num_edges();
        let mut master = InMemoryMaster::new(n).with_duals(DualValues::new(vec![10.0; n]));
        let mut pricer = stabilized(graph);
        pricer.perform_pricing(&PricingContext::new(&master), CostType::Simple).unwrap();

        // nothing improves under the true duals, the smoothed ones still look attractive
        master.set_duals(DualValues::zeros(n));
        let result = pricer.perform_pricing(&PricingContext::new(&master), CostType::Simple).unwrap();

        assert!(result.paths.is_empty());
        assert!(pricer.alpha() < StabilizationConfig::default().initial_alpha);
        assert_eq!(result.lower_bound, Some(0.0));
    }

    #[test]
    fn test_gap_tightens_prove_gap() {
        let graph = pentagon_graph();
        let n = graph.instance().num_edges();
        let master = InMemoryMaster::new(n);
        let mut pricer = stabilized(graph);
        let ctx = PricingContext { lp: &master, incumbent: Some(10.0), best_bound: Some(9.99) };

        pricer.perform_pricing(&ctx, CostType::Simple).unwrap();

        assert!((pricer.prove_gap() - 0.025).abs() < 1e-12);
    }

    #[test]
    fn test_inconsistent_bound_is_fatal() {
        let graph = pentagon_graph();
        let n = graph.instance().num_edges();
        let mut master = InMemoryMaster::new(n);
        master.set_objective(50.0);
        let mut pricer = stabilized(graph);
        // a solution of value 1 cannot coexist with a bound of 50
        let ctx = PricingContext { lp: &master, incumbent: Some(1.0), best_bound: None };

        let err = pricer.perform_pricing(&ctx, CostType::Simple).unwrap_err();

        assert!(matches!(err, PricingError::InconsistentBound { .. }));
    }

    #[test]
    fn test_never_masks_improving_columns() {
        let graph = random_graph(7, 5);
        let n = graph.instance().num_edges();
        let mut master = InMemoryMaster::new(n);
        let mut raw = PathPricer::new(graph.clone(), PathPricerConfig::default());
        let mut smooth = stabilized(graph.clone());

        let (mut raw_rounds, mut smooth_rounds) = (0, 0);
        for round in 0..30u64 {
            let duals: Vec<f64> = (0..n as u64).map(|e| ((e * 7 + round * 13) % 11) as f64 * 0.6).collect();
            let duals = DualValues::new(duals);
            master.set_duals(duals.clone());

            let a = raw.perform_pricing(&PricingContext::new(&master), CostType::Simple).unwrap();
            let b = smooth.perform_pricing(&PricingContext::new(&master), CostType::Simple).unwrap();

            let real = ReducedCosts::new(graph.instance(), &duals);
            assert!(b.paths.iter().all(|p| p.cost(&real) < 0.0));
            if !a.paths.is_empty() {
                raw_rounds += 1;
                assert!(!b.paths.is_empty(), "round {} masked an improving column", round);
            }
            if !b.paths.is_empty() {
                smooth_rounds += 1;
            }
        }
        assert!(smooth_rounds >= raw_rounds);
    }
}
