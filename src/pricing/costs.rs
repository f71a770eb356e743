//! Reduced-cost functors.
//!
//! Costs depend on the original edge only, so every timed instance of an edge
//! is scored identically.

use super::CostType;
use crate::instance::{EdgeId, Instance};
use serde::{Deserialize, Serialize};

/// Maps an original edge to a scalar cost
pub trait EdgeCost: Sync {
    fn cost(&self, edge: EdgeId) -> f64;
}

/// Dense vector of dual prices indexed by original edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualValues {
    values: Vec<f64>,
}

impl DualValues {
    pub fn new(values: Vec<f64>) -> Self {
        DualValues { values }
    }

    pub fn zeros(num_edges: usize) -> Self {
        DualValues { values: vec![0.0; num_edges] }
    }

    #[inline]
    pub fn get(&self, edge: EdgeId) -> f64 {
        self.values.get(edge).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, edge: EdgeId, value: f64) {
        if edge >= self.values.len() {
            self.values.resize(edge + 1, 0.0);
        }
        self.values[edge] = value;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// `alpha * self + (1 - alpha) * other`, entry by entry
    pub fn interpolate(&self, alpha: f64, other: &DualValues) -> DualValues {
        let len = self.values.len().max(other.values.len());
        let values = (0..len)
            .map(|e| alpha * self.get(e) + (1.0 - alpha) * other.get(e))
            .collect();
        DualValues { values }
    }
}

/// `travel_time(edge) - dual(edge)`
#[derive(Debug, Clone, Copy)]
pub struct ReducedCosts<'a> {
    instance: &'a Instance,
    duals: &'a DualValues,
}

impl<'a> ReducedCosts<'a> {
    pub fn new(instance: &'a Instance, duals: &'a DualValues) -> Self {
        ReducedCosts { instance, duals }
    }
}

impl EdgeCost for ReducedCosts<'_> {
    #[inline]
    fn cost(&self, edge: EdgeId) -> f64 {
        self.instance.edge(edge).travel_time as f64 - self.duals.get(edge)
    }
}

/// `-dual(edge)`
#[derive(Debug, Clone, Copy)]
pub struct FarkasCosts<'a> {
    duals: &'a DualValues,
}

impl<'a> FarkasCosts<'a> {
    pub fn new(duals: &'a DualValues) -> Self {
        FarkasCosts { duals }
    }
}

impl EdgeCost for FarkasCosts<'_> {
    #[inline]
    fn cost(&self, edge: EdgeId) -> f64 {
        -self.duals.get(edge)
    }
}

/// The cost functor matching a [`CostType`]
#[derive(Debug, Clone, Copy)]
pub enum CostFunction<'a> {
    Reduced(ReducedCosts<'a>),
    Farkas(FarkasCosts<'a>),
}

impl<'a> CostFunction<'a> {
    pub fn new(cost_type: CostType, instance: &'a Instance, duals: &'a DualValues) -> Self {
        match cost_type {
            CostType::Simple => CostFunction::Reduced(ReducedCosts::new(instance, duals)),
            CostType::Farkas => CostFunction::Farkas(FarkasCosts::new(duals)),
        }
    }
}

impl EdgeCost for CostFunction<'_> {
    #[inline]
    fn cost(&self, edge: EdgeId) -> f64 {
        match self {
            CostFunction::Reduced(c) => c.cost(edge),
            CostFunction::Farkas(c) => c.cost(edge),
        }
    }
}
