//! Arc-flow restricted master on Gurobi.
//!
//! The model holds:
//! - continuous variables y[e] in [0, 1] for original edges
//! - in/out degree constraints over y
//! - linking constraints `sum x[e, t] - y[e] = 0`, one per original edge
//! - the timed-edge variables x and flow constraints created by the pricing
//!   manager
//!
//! The LP is kept continuous so duals exist; `solve_root` can switch the
//! timed variables to binary once column generation is over.

use super::{GurobiConfig, RootResult};
use crate::colgen::{ColumnGeneration, ColumnGenerationConfig};
use crate::error::MasterError;
use crate::heuristics::{ConstructionHeuristic, MultiStartConstruction};
use crate::instance::{EdgeId, Instance};
use crate::master::{LpState, LpStatus, MasterLp, RestrictedMaster, VarDomain};
use crate::pricing::costs::DualValues;
use crate::pricing::{build_pricer, CostType, PricerKind, PricingConfig, PricingManager};
use crate::timed::{TimeBounds, TimeExpandedGraph};
use grb::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

fn backend(e: grb::Error) -> MasterError {
    MasterError::Backend(e.to_string())
}

pub struct GurobiMaster {
    model: Model,
    linking: Vec<Constr>,
    /// Timed-edge variables and the domain they were requested with
    columns: Vec<(Var, VarDomain)>,
    forbidden: HashSet<EdgeId>,
    bounds: TimeBounds,
    best_submitted: Option<f64>,
}

impl GurobiMaster {
    pub fn new(instance: &Instance, config: &GurobiConfig) -> Result<Self, MasterError> {
        let env = Env::new("").map_err(backend)?;
        let mut model = Model::with_env(&format!("master_{}", instance.name), env).map_err(backend)?;

        model.set_param(param::TimeLimit, config.time_limit).map_err(backend)?;
        model.set_param(param::Threads, config.threads).map_err(backend)?;
        model.set_param(param::InfUnbdInfo, 1).map_err(backend)?;
        model.set_param(param::Method, 0).map_err(backend)?;
        if !config.verbose {
            model.set_param(param::OutputFlag, 0).map_err(backend)?;
        }

        let mut y = Vec::with_capacity(instance.num_edges());
        for edge in &instance.edges {
            let var = add_ctsvar!(model, name: &format!("y_{}_{}", edge.source, edge.target), bounds: 0.0..1.0)
                .map_err(backend)?;
            y.push(var);
        }
        model.update().map_err(backend)?;

        for v in 0..instance.dimension {
            let out: Expr = instance.out_edges(v).iter().map(|&e| y[e]).grb_sum();
            model.add_constr(&format!("out_{}", v), c!(out == 1.0)).map_err(backend)?;

            let incoming: Expr = instance.edges.iter().filter(|e| e.target == v).map(|e| y[e.id]).grb_sum();
            model.add_constr(&format!("in_{}", v), c!(incoming == 1.0)).map_err(backend)?;
        }

        let mut linking = Vec::with_capacity(instance.num_edges());
        for (e, &var) in y.iter().enumerate() {
            let lhs = -1.0 * var;
            linking.push(model.add_constr(&format!("link_{}", e), c!(lhs == 0.0)).map_err(backend)?);
        }
        model.update().map_err(backend)?;

        Ok(GurobiMaster {
            model,
            linking,
            columns: Vec::new(),
            forbidden: HashSet::new(),
            bounds: TimeBounds::new(instance.lower_bound, Some(instance.horizon)),
            best_submitted: None,
        })
    }

    pub fn forbid(&mut self, edge: EdgeId) {
        self.forbidden.insert(edge);
    }

    /// Switch every requested binary column to binary and re-solve
    pub fn solve_integer(&mut self) -> Result<Option<f64>, MasterError> {
        for &(var, domain) in &self.columns {
            if domain == VarDomain::Binary {
                self.model.set_obj_attr(attr::VType, &var, VarType::Binary).map_err(backend)?;
            }
        }
        self.model.optimize().map_err(backend)?;
        match self.model.status().map_err(backend)? {
            Status::Optimal | Status::TimeLimit | Status::SolutionLimit => {
                Ok(self.model.get_attr(attr::ObjVal).ok())
            }
            _ => Ok(None),
        }
    }
}

impl LpState for GurobiMaster {
    fn dual_values(&self, cost_type: CostType) -> Result<DualValues, MasterError> {
        let mut values = Vec::with_capacity(self.linking.len());
        for cons in &self.linking {
            let value = match cost_type {
                CostType::Simple => self.model.get_obj_attr(attr::Pi, cons),
                CostType::Farkas => self.model.get_obj_attr(attr::FarkasDual, cons),
            };
            values.push(value.map_err(|e| MasterError::DualsUnavailable(e.to_string()))?);
        }
        Ok(DualValues::new(values))
    }

    fn forbidden_edges(&self) -> HashSet<EdgeId> {
        self.forbidden.clone()
    }

    fn time_bounds(&self) -> TimeBounds {
        self.bounds
    }

    fn lp_objective(&self) -> Result<f64, MasterError> {
        self.model.get_attr(attr::ObjVal).map_err(backend)
    }
}

impl MasterLp for GurobiMaster {
    type Var = Var;
    type Cons = Constr;

    fn linking_constraint(&self, edge: EdgeId) -> Result<Constr, MasterError> {
        self.linking.get(edge).copied().ok_or(MasterError::MissingLinkingConstraint(edge))
    }

    fn add_variable(&mut self, name: &str, objective: f64, domain: VarDomain) -> Result<Var, MasterError> {
        let var = add_ctsvar!(self.model, name: name, obj: objective, bounds: 0.0..1.0).map_err(backend)?;
        self.columns.push((var, domain));
        Ok(var)
    }

    fn add_constraint(&mut self, name: &str, rhs: f64) -> Result<Constr, MasterError> {
        let lhs = Expr::Constant(0.0);
        self.model.add_constr(name, c!(lhs == rhs)).map_err(backend)
    }

    fn add_coefficient(&mut self, cons: Constr, var: Var, value: f64) -> Result<(), MasterError> {
        self.model.update().map_err(backend)?;
        self.model.set_coeff(&var, &cons, value).map_err(backend)
    }

    fn submit_solution(&mut self, assignment: &[(Var, f64)]) -> Result<bool, MasterError> {
        let mut objective = 0.0;
        for &(var, value) in assignment {
            objective += self.model.get_obj_attr(attr::Obj, &var).map_err(backend)? * value;
            self.model.set_obj_attr(attr::Start, &var, value).map_err(backend)?;
        }
        let accepted = !assignment.is_empty() && self.best_submitted.map_or(true, |best| objective < best);
        if accepted {
            self.best_submitted = Some(objective);
        }
        Ok(accepted)
    }

    fn release_variable(&mut self, var: Var) -> Result<(), MasterError> {
        self.columns.retain(|&(v, _)| v != var);
        self.model.remove(var).map_err(backend)
    }

    fn release_constraint(&mut self, cons: Constr) -> Result<(), MasterError> {
        self.model.remove(cons).map_err(backend)
    }
}

impl RestrictedMaster for GurobiMaster {
    fn optimize(&mut self) -> Result<LpStatus, MasterError> {
        self.model.optimize().map_err(backend)?;
        match self.model.status().map_err(backend)? {
            Status::Optimal => Ok(LpStatus::Optimal),
            Status::Infeasible | Status::InfOrUnbd => Ok(LpStatus::Infeasible),
            status => Err(MasterError::Backend(format!("unexpected LP status {:?}", status))),
        }
    }
}

/// Column generation at the root node, followed by an integer solve of the
/// restricted master
pub fn solve_root(
    instance: &Instance,
    gurobi: &GurobiConfig,
    kind: PricerKind,
    pricing: &PricingConfig,
    colgen: &ColumnGenerationConfig,
) -> Result<RootResult, String> {
    let initial = MultiStartConstruction::default().construct(instance);
    if !initial.feasible {
        return Err(format!("No feasible initial tour found for {}", instance.name));
    }

    let instance = Arc::new(instance.clone());
    let graph = Arc::new(TimeExpandedGraph::from_instance(instance.clone()));
    log::info!(
        "Time-expanded network: {} timed vertices, {} timed edges",
        graph.num_timed_vertices(),
        graph.num_timed_edges()
    );

    let master = GurobiMaster::new(&instance, gurobi).map_err(|e| e.to_string())?;
    let pricer = build_pricer(kind, graph.clone(), pricing);
    let mut manager = PricingManager::new(master, graph, pricer, initial, pricing.manager.clone());
    manager.init().map_err(|e| e.to_string())?;

    let report = ColumnGeneration::new(colgen.clone()).run(&mut manager).map_err(|e| e.to_string())?;

    let integer_objective = if gurobi.integer && !report.infeasible {
        manager.master_mut().solve_integer().map_err(|e| e.to_string())?
    } else {
        None
    };

    Ok(RootResult {
        incumbent: manager.incumbent(),
        report,
        integer_objective,
    })
}
