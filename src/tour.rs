//! Tour representation for the time-constrained TSP.
//!
//! A tour lists original vertices starting at the source; the return edge to
//! the source is implicit, as in the constructive heuristics that produce it.

use crate::error::PricingError;
use crate::instance::{EdgeId, Instance, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Represents a tour on the original network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tour {
    /// Visiting order, starting at the source, return implicit
    pub vertices: Vec<VertexId>,
    /// Total travel time (the objective)
    pub cost: f64,
    /// Arrival time back at the source
    pub duration: u32,
    /// Whether every edge exists and the tour fits the time window
    pub feasible: bool,
    /// Algorithm that generated this tour
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
}

impl Tour {
    /// Create a tour from a vertex sequence and evaluate it
    pub fn from_vertices(instance: &Instance, vertices: Vec<VertexId>, algorithm: &str) -> Self {
        let mut tour = Tour {
            vertices,
            cost: f64::INFINITY,
            duration: 0,
            feasible: false,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
        };
        tour.validate(instance);
        tour
    }

    /// Recompute cost, duration and feasibility
    pub fn validate(&mut self, instance: &Instance) {
        match self.edges(instance) {
            Ok(edges) => {
                let duration: u32 = edges.iter().map(|&e| instance.edge(e).travel_time).sum();
                self.duration = duration;
                self.cost = duration as f64;
                self.feasible = self.is_complete(instance)
                    && duration <= instance.horizon
                    && instance.lower_bound.map_or(true, |lb| duration >= lb);
            }
            Err(_) => {
                self.duration = 0;
                self.cost = f64::INFINITY;
                self.feasible = false;
            }
        }
    }

    /// Check if all vertices are visited exactly once, starting at the source
    pub fn is_complete(&self, instance: &Instance) -> bool {
        if self.vertices.len() != instance.dimension || self.vertices.first() != Some(&instance.source) {
            return false;
        }

        let unique: HashSet<VertexId> = self.vertices.iter().copied().collect();
        unique.len() == instance.dimension
    }

    /// Original edges of the tour, including the closing edge to the source
    pub fn edges(&self, instance: &Instance) -> Result<Vec<EdgeId>, PricingError> {
        if self.vertices.first() != Some(&instance.source) {
            return Err(PricingError::UntraceableTour(format!(
                "tour must start at source {}",
                instance.source
            )));
        }

        let n = self.vertices.len();
        let mut edges = Vec::with_capacity(n);
        for i in 0..n {
            let from = self.vertices[i];
            let to = self.vertices[(i + 1) % n];
            let edge = instance.find_edge(from, to).ok_or_else(|| {
                PricingError::UntraceableTour(format!("no edge {} -> {}", from, to))
            })?;
            edges.push(edge);
        }
        Ok(edges)
    }

    /// Get the position of a vertex in the tour
    pub fn position(&self, vertex: VertexId) -> Option<usize> {
        self.vertices.iter().position(|&v| v == vertex)
    }
}

impl std::fmt::Display for Tour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Tour ({})", self.algorithm)?;
        writeln!(f, "  Cost: {:.2}", self.cost)?;
        writeln!(f, "  Duration: {}", self.duration)?;
        writeln!(f, "  Feasible: {}", self.feasible)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        writeln!(f, "  Vertices: {:?}", self.vertices)
    }
}
