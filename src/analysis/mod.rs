//! Per-measure analysis passes: tuplets, beams, rests
//!
//! Once measure boundaries are fixed these passes are independent: they
//! share no mutable state and only read their measure's note slice.

pub mod beams;
pub mod rests;
pub mod tuplets;

pub use beams::{BeamGrouper, MeterClass};
pub use rests::{RestOptimizer, RestOptimizerConfig};
pub use tuplets::{TupletDetector, TupletDetectorConfig};
