//! TC-TSP Solver Library
//!
//! Pricing and dual stabilization for a branch-and-price solver of the
//! time-constrained Traveling Salesman Problem, where the master LP is an
//! arc-flow formulation over a time-expanded network.
//!
//! # Features
//!
//! - Time-expanded network and a label-correcting router
//! - Path pricers (acyclic, hole-free, two-cycle-free) and an edge pricer
//! - Wentges dual smoothing around the path pricer
//! - A pricing manager that lazily materializes variables and constraints
//! - Root-node column generation, with a Gurobi master behind the `gurobi` feature
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tc_tsp_solver::heuristics::{ConstructionHeuristic, NearestNeighborHeuristic};
//! use tc_tsp_solver::instance::Instance;
//! use tc_tsp_solver::master::InMemoryMaster;
//! use tc_tsp_solver::pricing::{build_pricer, ManagerConfig, PricerKind, PricingConfig, PricingManager};
//! use tc_tsp_solver::timed::TimeExpandedGraph;
//!
//! let instance = Arc::new(Instance::from_file("instance.tctsp").unwrap());
//! let tour = NearestNeighborHeuristic::new().construct(&instance);
//! let graph = Arc::new(TimeExpandedGraph::from_instance(instance.clone()));
//!
//! let pricer = build_pricer(PricerKind::Stabilized, graph.clone(), &PricingConfig::default());
//! let master = InMemoryMaster::new(instance.num_edges());
//! let mut manager = PricingManager::new(master, graph, pricer, tour, ManagerConfig::default());
//!
//! manager.init().unwrap();
//! let seeded = manager.farkas_pricing().unwrap();
//! println!("Initial tour added {} variables", seeded.new_variables);
//! ```

pub mod instance;
pub mod error;
pub mod tour;
pub mod timed;
pub mod pricing;
pub mod master;
pub mod colgen;
pub mod heuristics;
pub mod exact;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{MasterError, PricingError};
pub use instance::Instance;
pub use tour::Tour;
