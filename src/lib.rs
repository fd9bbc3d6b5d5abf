//! Notation Timing Engine
//!
//! Converts a stream of absolute-tick performed notes (as captured from a
//! MIDI-like source) into notated musical structure suitable for score
//! engraving: measures, ties across measure boundaries, tuplets, beam
//! groups, and optimally-notated rests.
//!
//! # Pipeline
//!
//! ```text
//! TimedNotes + TimeSignatureEvents
//!   → OnsetGridQuantizer (optional)
//!   → MeasureBoundaryDetector (splits + ties)
//!   → per measure: TupletDetector / BeamGrouper / RestOptimizer
//!   → NotatedScore (consumed by the serialization layer)
//! ```
//!
//! The engine is synchronous, single-threaded, and side-effect-free apart
//! from its own output allocations. Byte-level source parsing and
//! MusicXML/container serialization are external collaborators.

pub mod analysis;
pub mod engine;
pub mod error;
pub mod ir;
pub mod models;
pub mod rhythm;

// Re-export commonly used types
pub use engine::{EngineConfig, MeasureAnnotations, NotatedScore, NotationEngine};
pub use error::{NotationError, Result};
pub use models::core::*;
pub use models::notation::*;
pub use rhythm::{DurationQuantizer, NoteTypeConverter, OnsetGridQuantizer};
