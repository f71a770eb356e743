//! Orchestration between the pricers and the master LP.
//!
//! The manager owns the lazily grown part of the arc-flow model: one flow
//! conservation constraint per touched timed vertex (never for copies of the
//! source) and one variable per materialized timed edge.

use super::{CostType, Pricer, PricingContext, PricingResult};
use crate::error::{MasterError, PricingError};
use crate::master::{MasterLp, VarDomain};
use crate::timed::{TimeExpandedGraph, TimedEdge, TimedPath, TimedVertex};
use crate::tour::Tour;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Create continuous instead of binary variables
    pub relaxed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ManagerState {
    Uninitialized,
    Active,
    TornDown,
}

impl ManagerState {
    fn describe(self) -> &'static str {
        match self {
            ManagerState::Uninitialized => "not initialized",
            ManagerState::Active => "already active",
            ManagerState::TornDown => "torn down",
        }
    }
}

/// What a pricing callback did to the master
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PricingOutcome {
    pub new_variables: usize,
    pub lower_bound: Option<f64>,
    /// Whether the pricer returned anything, new or not
    pub found_columns: bool,
}

pub struct PricingManager<M: MasterLp> {
    master: M,
    graph: Arc<TimeExpandedGraph>,
    pricer: Box<dyn Pricer>,
    initial_tour: Tour,
    config: ManagerConfig,
    state: ManagerState,
    linking: Vec<M::Cons>,
    flow: HashMap<TimedVertex, M::Cons>,
    variables: HashMap<TimedEdge, M::Var>,
    seeded: bool,
    incumbent: Option<f64>,
    best_bound: Option<f64>,
}

impl<M: MasterLp> PricingManager<M> {
    pub fn new(master: M, graph: Arc<TimeExpandedGraph>, pricer: Box<dyn Pricer>, initial_tour: Tour, config: ManagerConfig) -> Self {
        PricingManager {
            master,
            graph,
            pricer,
            initial_tour,
            config,
            state: ManagerState::Uninitialized,
            linking: Vec::new(),
            flow: HashMap::new(),
            variables: HashMap::new(),
            seeded: false,
            incumbent: None,
            best_bound: None,
        }
    }

    /// Bind the linking constraints of the current LP relaxation
    pub fn init(&mut self) -> Result<(), PricingError> {
        if self.state != ManagerState::Uninitialized {
            return Err(PricingError::InvalidState(self.state.describe()));
        }

        self.linking = (0..self.graph.instance().num_edges())
            .map(|e| self.master.linking_constraint(e))
            .collect::<Result<_, _>>()?;
        self.state = ManagerState::Active;
        log::info!("Pricing manager active with {} ({})", self.pricer.name(), self.graph.instance().name);
        Ok(())
    }

    /// Release every owned variable and constraint
    pub fn exit(&mut self) -> Result<(), PricingError> {
        self.ensure_active()?;

        for (_, var) in self.variables.drain() {
            self.master.release_variable(var)?;
        }
        for (_, cons) in self.flow.drain() {
            self.master.release_constraint(cons)?;
        }
        self.linking.clear();
        self.state = ManagerState::TornDown;
        log::info!("Pricing manager torn down");
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), PricingError> {
        match self.state {
            ManagerState::Active => Ok(()),
            state => Err(PricingError::InvalidState(state.describe())),
        }
    }

    pub fn master(&self) -> &M {
        &self.master
    }

    pub fn master_mut(&mut self) -> &mut M {
        &mut self.master
    }

    pub fn graph(&self) -> &TimeExpandedGraph {
        &self.graph
    }

    /// Value of the best solution the master accepted
    pub fn incumbent(&self) -> Option<f64> {
        self.incumbent
    }

    /// Best lower bound reported by a pricer
    pub fn best_bound(&self) -> Option<f64> {
        self.best_bound
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_flow_constraints(&self) -> usize {
        self.flow.len()
    }

    /// Variable of a timed edge, if already materialized
    pub fn variable(&self, edge: &TimedEdge) -> Option<M::Var> {
        self.variables.get(edge).copied()
    }

    /// Follow a tour through the time-expanded network, departing at time zero
    pub fn trace_tour(&self, tour: &Tour) -> Result<TimedPath, PricingError> {
        let edges = tour.edges(self.graph.instance())?;
        let mut time = 0;
        let mut path = Vec::with_capacity(edges.len());
        for e in edges {
            let te = self.graph.timed_edge(e, time);
            if te.target.time > self.graph.horizon() {
                return Err(PricingError::UntraceableTour(format!(
                    "arrival {} at vertex {} exceeds horizon {}",
                    te.target.time,
                    te.target.vertex,
                    self.graph.horizon()
                )));
            }
            time = te.target.time;
            path.push(te);
        }
        Ok(TimedPath::new(path))
    }

    /// Materialize a tour and offer it to the master
    pub fn add_tour(&mut self, tour: &Tour) -> Result<bool, PricingError> {
        self.ensure_active()?;
        let path = self.trace_tour(tour)?;
        self.add_path(&path)
    }

    /// Materialize every edge of a path; complete tours are also offered to
    /// the master as solutions
    pub fn add_path(&mut self, path: &TimedPath) -> Result<bool, PricingError> {
        self.ensure_active()?;

        let mut assignment = Vec::with_capacity(path.len());
        for te in &path.edges {
            assignment.push((self.materialize_edge(te)?, 1.0));
        }

        if !path.is_tour(self.graph.instance()) {
            return Ok(false);
        }

        let accepted = self.master.submit_solution(&assignment)?;
        if accepted {
            let value = path.travel_time() as f64;
            if self.incumbent.map_or(true, |best| value < best) {
                self.incumbent = Some(value);
            }
            log::debug!("Accepted tour of cost {}", value);
        }
        Ok(accepted)
    }

    fn flow_constraint(&mut self, at: TimedVertex) -> Result<M::Cons, PricingError> {
        if let Some(&cons) = self.flow.get(&at) {
            return Ok(cons);
        }
        let cons = self.master.add_constraint(&format!("flow_{}_{}", at.vertex, at.time), 0.0)?;
        self.flow.insert(at, cons);
        Ok(cons)
    }

    /// Variable of a timed edge, created with its constraints on first use
    pub fn materialize_edge(&mut self, te: &TimedEdge) -> Result<M::Var, PricingError> {
        self.ensure_active()?;
        if let Some(&var) = self.variables.get(te) {
            return Ok(var);
        }

        let source = self.graph.source();
        let tail = if te.source.vertex != source { Some(self.flow_constraint(te.source)?) } else { None };
        let head = if te.target.vertex != source { Some(self.flow_constraint(te.target)?) } else { None };
        let link = *self.linking.get(te.edge).ok_or(MasterError::MissingLinkingConstraint(te.edge))?;

        let domain = if self.config.relaxed { VarDomain::Continuous } else { VarDomain::Binary };
        let name = format!("x_{}_{}", te.edge, te.source.time);
        let var = self.master.add_variable(&name, te.travel_time() as f64, domain)?;

        // a column with missing coefficients never stays in the master
        if let Err(err) = self.link_variable(var, tail, head, link) {
            self.master.release_variable(var)?;
            return Err(err.into());
        }

        self.variables.insert(*te, var);
        Ok(var)
    }

    fn link_variable(
        &mut self,
        var: M::Var,
        tail: Option<M::Cons>,
        head: Option<M::Cons>,
        link: M::Cons,
    ) -> Result<(), MasterError> {
        if let Some(cons) = tail {
            self.master.add_coefficient(cons, var, 1.0)?;
        }
        if let Some(cons) = head {
            self.master.add_coefficient(cons, var, -1.0)?;
        }
        self.master.add_coefficient(link, var, 1.0)
    }

    /// Farkas callback. The first call injects the initial tour, later calls
    /// delegate to the pricer.
    pub fn farkas_pricing(&mut self) -> Result<PricingOutcome, PricingError> {
        self.ensure_active()?;

        if !self.seeded {
            let before = self.variables.len();
            let tour = self.initial_tour.clone();
            self.add_tour(&tour)?;
            self.seeded = true;
            let new_variables = self.variables.len() - before;
            log::debug!("Farkas: injected initial tour ({} new variables)", new_variables);
            return Ok(PricingOutcome { new_variables, lower_bound: None, found_columns: true });
        }

        self.price(CostType::Farkas)
    }

    /// Reduced-cost callback
    pub fn reduced_cost_pricing(&mut self) -> Result<PricingOutcome, PricingError> {
        self.ensure_active()?;
        let outcome = self.price(CostType::Simple)?;

        if let Some(bound) = outcome.lower_bound {
            if self.best_bound.map_or(true, |best| bound > best) {
                self.best_bound = Some(bound);
            }
        }
        Ok(outcome)
    }

    fn price(&mut self, cost_type: CostType) -> Result<PricingOutcome, PricingError> {
        let ctx = PricingContext { lp: &self.master, incumbent: self.incumbent, best_bound: self.best_bound };
        let result = self.pricer.perform_pricing(&ctx, cost_type)?;
        let found_columns = !result.is_empty();
        let lower_bound = result.lower_bound;

        let new_variables = self.materialize(result)?;
        log::debug!(
            "{:?} pricing with {}: {} new variables, bound {:?}",
            cost_type,
            self.pricer.name(),
            new_variables,
            lower_bound
        );

        Ok(PricingOutcome { new_variables, lower_bound, found_columns })
    }

    fn materialize(&mut self, result: PricingResult) -> Result<usize, PricingError> {
        let before = self.variables.len();
        for te in &result.edges {
            self.materialize_edge(te)?;
        }
        for path in &result.paths {
            self.add_path(path)?;
        }
        Ok(self.variables.len() - before)
    }
}
