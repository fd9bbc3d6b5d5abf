//! Data model for the notation timing engine

pub mod core;
pub mod notation;

pub use self::core::{
    Gap, Measure, TiedNotePair, TimeSignatureEvent, TimedNote, DEFAULT_PPQ,
};
pub use self::notation::{
    BeamGroup, BeamState, BeamedNote, NoteType, NoteTypeResult, Rest, TiePosition, TiedUnit,
    Tuplet, TupletType,
};
