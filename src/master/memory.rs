//! A master that records what the pricing core asks of it.
//!
//! It never solves an LP: duals, objective and bounds are whatever the caller
//! configured. This is enough to run single pricing rounds from the command
//! line and to observe the materialization performed by the manager.

use super::{LpState, LpStatus, MasterLp, RestrictedMaster, VarDomain};
use crate::error::MasterError;
use crate::instance::{EdgeId, Instance};
use crate::pricing::costs::DualValues;
use crate::pricing::CostType;
use crate::timed::TimeBounds;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsId(pub usize);

#[derive(Debug, Clone)]
pub struct VariableRecord {
    pub name: String,
    pub objective: f64,
    pub domain: VarDomain,
    pub released: bool,
}

#[derive(Debug, Clone)]
pub struct ConstraintRecord {
    pub name: String,
    pub rhs: f64,
    pub coefficients: Vec<(VarId, f64)>,
    pub released: bool,
}

/// An accepted or rejected solution offer
#[derive(Debug, Clone)]
pub struct Submission {
    pub assignment: Vec<(VarId, f64)>,
    pub objective: f64,
    pub accepted: bool,
}

#[derive(Debug, Clone)]
pub struct InMemoryMaster {
    variables: Vec<VariableRecord>,
    constraints: Vec<ConstraintRecord>,
    linking: Vec<ConsId>,
    duals: DualValues,
    farkas_duals: DualValues,
    forbidden: HashSet<EdgeId>,
    bounds: TimeBounds,
    objective: f64,
    submissions: Vec<Submission>,
    best_accepted: Option<f64>,
}

impl InMemoryMaster {
    /// Create a master with one linking constraint per original edge
    pub fn new(num_edges: usize) -> Self {
        let constraints = (0..num_edges)
            .map(|e| ConstraintRecord {
                name: format!("link_{}", e),
                rhs: 0.0,
                coefficients: Vec::new(),
                released: false,
            })
            .collect();

        InMemoryMaster {
            variables: Vec::new(),
            constraints,
            linking: (0..num_edges).map(ConsId).collect(),
            duals: DualValues::zeros(num_edges),
            farkas_duals: DualValues::zeros(num_edges),
            forbidden: HashSet::new(),
            bounds: TimeBounds::default(),
            objective: 0.0,
            submissions: Vec::new(),
            best_accepted: None,
        }
    }

    /// Master over the edges of an instance, restricted to its time window
    pub fn for_instance(instance: &Instance) -> Self {
        let mut master = Self::new(instance.num_edges());
        master.bounds = TimeBounds::new(instance.lower_bound, Some(instance.horizon));
        master
    }

    pub fn with_duals(mut self, duals: DualValues) -> Self {
        self.duals = duals;
        self
    }

    pub fn set_duals(&mut self, duals: DualValues) {
        self.duals = duals;
    }

    pub fn set_farkas_duals(&mut self, duals: DualValues) {
        self.farkas_duals = duals;
    }

    pub fn set_objective(&mut self, objective: f64) {
        self.objective = objective;
    }

    pub fn set_time_bounds(&mut self, bounds: TimeBounds) {
        self.bounds = bounds;
    }

    pub fn forbid(&mut self, edge: EdgeId) {
        self.forbidden.insert(edge);
    }

    pub fn variables(&self) -> &[VariableRecord] {
        &self.variables
    }

    pub fn constraints(&self) -> &[ConstraintRecord] {
        &self.constraints
    }

    pub fn constraint(&self, cons: ConsId) -> &ConstraintRecord {
        &self.constraints[cons.0]
    }

    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    pub fn best_accepted(&self) -> Option<f64> {
        self.best_accepted
    }

    /// Live variables
    pub fn num_variables(&self) -> usize {
        self.variables.iter().filter(|v| !v.released).count()
    }

    /// Live constraints, linking constraints included
    pub fn num_constraints(&self) -> usize {
        self.constraints.iter().filter(|c| !c.released).count()
    }

    /// Total number of non-zero coefficients
    pub fn num_coefficients(&self) -> usize {
        self.constraints.iter().map(|c| c.coefficients.len()).sum()
    }

    fn variable(&self, var: VarId) -> Result<&VariableRecord, MasterError> {
        match self.variables.get(var.0) {
            Some(record) if !record.released => Ok(record),
            _ => Err(MasterError::Backend(format!("unknown variable {:?}", var))),
        }
    }
}

impl LpState for InMemoryMaster {
    fn dual_values(&self, cost_type: CostType) -> Result<DualValues, MasterError> {
        Ok(match cost_type {
            CostType::Simple => self.duals.clone(),
            CostType::Farkas => self.farkas_duals.clone(),
        })
    }

    fn forbidden_edges(&self) -> HashSet<EdgeId> {
        self.forbidden.clone()
    }

    fn time_bounds(&self) -> TimeBounds {
        self.bounds
    }

    fn lp_objective(&self) -> Result<f64, MasterError> {
        Ok(self.objective)
    }
}

impl MasterLp for InMemoryMaster {
    type Var = VarId;
    type Cons = ConsId;

    fn linking_constraint(&self, edge: EdgeId) -> Result<ConsId, MasterError> {
        self.linking.get(edge).copied().ok_or(MasterError::MissingLinkingConstraint(edge))
    }

    fn add_variable(&mut self, name: &str, objective: f64, domain: VarDomain) -> Result<VarId, MasterError> {
        self.variables.push(VariableRecord { name: name.to_string(), objective, domain, released: false });
        Ok(VarId(self.variables.len() - 1))
    }

    fn add_constraint(&mut self, name: &str, rhs: f64) -> Result<ConsId, MasterError> {
        self.constraints.push(ConstraintRecord {
            name: name.to_string(),
            rhs,
            coefficients: Vec::new(),
            released: false,
        });
        Ok(ConsId(self.constraints.len() - 1))
    }

    fn add_coefficient(&mut self, cons: ConsId, var: VarId, value: f64) -> Result<(), MasterError> {
        self.variable(var)?;
        match self.constraints.get_mut(cons.0) {
            Some(record) if !record.released => {
                record.coefficients.push((var, value));
                Ok(())
            }
            _ => Err(MasterError::Backend(format!("unknown constraint {:?}", cons))),
        }
    }

    fn submit_solution(&mut self, assignment: &[(VarId, f64)]) -> Result<bool, MasterError> {
        let mut objective = 0.0;
        for &(var, value) in assignment {
            objective += self.variable(var)?.objective * value;
        }

        let accepted = !assignment.is_empty() && self.best_accepted.map_or(true, |best| objective < best);
        if accepted {
            self.best_accepted = Some(objective);
        }
        self.submissions.push(Submission { assignment: assignment.to_vec(), objective, accepted });
        Ok(accepted)
    }

    fn release_variable(&mut self, var: VarId) -> Result<(), MasterError> {
        self.variable(var)?;
        self.variables[var.0].released = true;
        for cons in &mut self.constraints {
            cons.coefficients.retain(|&(v, _)| v != var);
        }
        Ok(())
    }

    fn release_constraint(&mut self, cons: ConsId) -> Result<(), MasterError> {
        match self.constraints.get_mut(cons.0) {
            Some(record) if !record.released => {
                record.released = true;
                Ok(())
            }
            _ => Err(MasterError::Backend(format!("unknown constraint {:?}", cons))),
        }
    }
}

impl RestrictedMaster for InMemoryMaster {
    /// Infeasible until a column exists, optimal afterwards
    fn optimize(&mut self) -> Result<LpStatus, MasterError> {
        if self.num_variables() == 0 {
            Ok(LpStatus::Infeasible)
        } else {
            Ok(LpStatus::Optimal)
        }
    }
}
