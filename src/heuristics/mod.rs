//! Heuristics producing the initial tour.
//!
//! The tour seeds the first Farkas round of the pricing manager.

pub mod construction;

pub use construction::*;
