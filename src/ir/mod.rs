//! Measure-level intermediate representation

pub mod measurization;

pub use measurization::{
    split_note_at_boundary, ticks_per_measure, MeasureBoundaryDetector,
};
