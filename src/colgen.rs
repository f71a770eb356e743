//! Root-node column generation loop.
//!
//! Alternates between re-optimizing the restricted master and calling the
//! pricing manager until pricing stops producing new variables, the reported
//! bound closes on the LP objective, or the round limit is hit.

use crate::error::PricingError;
use crate::master::{LpState, LpStatus, RestrictedMaster};
use crate::pricing::PricingManager;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnGenerationConfig {
    pub max_rounds: usize,
    /// Relative tolerance when comparing bound and LP objective
    pub gap_tolerance: f64,
}

impl Default for ColumnGenerationConfig {
    fn default() -> Self {
        ColumnGenerationConfig { max_rounds: 500, gap_tolerance: 1e-6 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnGenerationReport {
    pub rounds: usize,
    pub farkas_rounds: usize,
    /// Variables added over the whole run, initial tour included
    pub columns: usize,
    /// LP objective after the last optimization
    pub objective: Option<f64>,
    pub lower_bound: Option<f64>,
    pub incumbent: Option<f64>,
    /// The master was still infeasible when the loop stopped
    pub infeasible: bool,
    /// The bound met the LP objective
    pub converged: bool,
    pub computation_time: f64,
}

impl std::fmt::Display for ColumnGenerationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Column generation")?;
        writeln!(f, "  Rounds: {} ({} Farkas)", self.rounds, self.farkas_rounds)?;
        writeln!(f, "  Columns: {}", self.columns)?;
        writeln!(f, "  LP objective: {:?}", self.objective)?;
        writeln!(f, "  Lower bound: {:?}", self.lower_bound)?;
        writeln!(f, "  Incumbent: {:?}", self.incumbent)?;
        writeln!(f, "  Infeasible: {}, converged: {}", self.infeasible, self.converged)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)
    }
}

pub struct ColumnGeneration {
    config: ColumnGenerationConfig,
}

impl ColumnGeneration {
    pub fn new(config: ColumnGenerationConfig) -> Self {
        ColumnGeneration { config }
    }

    pub fn run<M: RestrictedMaster>(&self, manager: &mut PricingManager<M>) -> Result<ColumnGenerationReport, PricingError> {
        let start = Instant::now();
        let mut report = ColumnGenerationReport::default();

        while report.rounds < self.config.max_rounds {
            let status = manager.master_mut().optimize()?;
            report.rounds += 1;

            let outcome = match status {
                LpStatus::Infeasible => {
                    report.infeasible = true;
                    report.farkas_rounds += 1;
                    manager.farkas_pricing()?
                }
                LpStatus::Optimal => {
                    report.infeasible = false;
                    report.objective = Some(manager.master().lp_objective()?);
                    manager.reduced_cost_pricing()?
                }
            };
            report.columns += outcome.new_variables;

            log::info!(
                "Round {}: {:?}, {} new variables, objective {:?}, bound {:?}",
                report.rounds,
                status,
                outcome.new_variables,
                report.objective,
                manager.best_bound()
            );

            if outcome.new_variables == 0 {
                break;
            }
            if let (Some(objective), Some(bound)) = (report.objective, manager.best_bound()) {
                if bound >= objective - self.config.gap_tolerance * objective.abs().max(1.0) {
                    report.converged = true;
                    break;
                }
            }
        }

        if let (Some(objective), Some(bound)) = (report.objective, manager.best_bound()) {
            report.converged |= bound >= objective - self.config.gap_tolerance * objective.abs().max(1.0);
        }
        report.lower_bound = manager.best_bound();
        report.incumbent = manager.incumbent();
        report.computation_time = start.elapsed().as_secs_f64();
        Ok(report)
    }
}
