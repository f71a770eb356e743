//! Interface to the master LP/MIP solver.
//!
//! The pricing core never solves an LP itself. It reads the current duals,
//! bounds and branching state through [`LpState`], and creates variables,
//! constraints and coefficients through [`MasterLp`].

pub mod memory;

pub use memory::InMemoryMaster;

use crate::error::MasterError;
use crate::instance::EdgeId;
use crate::pricing::costs::DualValues;
use crate::pricing::CostType;
use crate::timed::TimeBounds;
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

/// Read-only view of the master LP used by the pricers
pub trait LpState {
    /// Dual prices of the linking constraints, or their Farkas multipliers
    fn dual_values(&self, cost_type: CostType) -> Result<DualValues, MasterError>;

    /// Original edges excluded at the current node (e.g. by branching)
    fn forbidden_edges(&self) -> HashSet<EdgeId>;

    /// Current feasible time window
    fn time_bounds(&self) -> TimeBounds;

    /// Objective value of the current LP relaxation
    fn lp_objective(&self) -> Result<f64, MasterError>;
}

/// Domain of a decision variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarDomain {
    Binary,
    Continuous,
}

/// Mutating side of the master problem
pub trait MasterLp: LpState {
    type Var: Copy + Eq + Hash + Debug;
    type Cons: Copy + Eq + Hash + Debug;

    /// The externally provided linking constraint of an original edge
    fn linking_constraint(&self, edge: EdgeId) -> Result<Self::Cons, MasterError>;

    fn add_variable(&mut self, name: &str, objective: f64, domain: VarDomain) -> Result<Self::Var, MasterError>;

    /// Add an equality constraint with an empty left-hand side
    fn add_constraint(&mut self, name: &str, rhs: f64) -> Result<Self::Cons, MasterError>;

    fn add_coefficient(&mut self, cons: Self::Cons, var: Self::Var, value: f64) -> Result<(), MasterError>;

    /// Offer an assignment (unlisted variables are zero). Returns whether the
    /// solver accepted it.
    fn submit_solution(&mut self, assignment: &[(Self::Var, f64)]) -> Result<bool, MasterError>;

    fn release_variable(&mut self, var: Self::Var) -> Result<(), MasterError>;

    fn release_constraint(&mut self, cons: Self::Cons) -> Result<(), MasterError>;
}

/// Outcome of re-optimizing the restricted master
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpStatus {
    Optimal,
    Infeasible,
}

/// A master that can re-optimize its LP relaxation
pub trait RestrictedMaster: MasterLp {
    fn optimize(&mut self) -> Result<LpStatus, MasterError>;
}
