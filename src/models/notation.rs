//! Notation models: note values, tuplets, beams, rests
//!
//! Closed enumerations with exhaustive dispatch. Invalid instances are
//! unconstructable: the `from_*` parse functions return `Option` instead of
//! decoding an out-of-range tag.

use num_rational::Ratio;
use serde::{Deserialize, Serialize};

/// A notated note value, whole note down to 256th
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NoteType {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    SixtyFourth,
    HundredTwentyEighth,
    TwoFiftySixth,
}

impl NoteType {
    /// All note values, longest first
    pub const ALL: [NoteType; 9] = [
        NoteType::Whole,
        NoteType::Half,
        NoteType::Quarter,
        NoteType::Eighth,
        NoteType::Sixteenth,
        NoteType::ThirtySecond,
        NoteType::SixtyFourth,
        NoteType::HundredTwentyEighth,
        NoteType::TwoFiftySixth,
    ];

    /// Divisor relative to a whole note (quarter = 4, eighth = 8, ...)
    pub fn divisor(&self) -> u32 {
        match self {
            NoteType::Whole => 1,
            NoteType::Half => 2,
            NoteType::Quarter => 4,
            NoteType::Eighth => 8,
            NoteType::Sixteenth => 16,
            NoteType::ThirtySecond => 32,
            NoteType::SixtyFourth => 64,
            NoteType::HundredTwentyEighth => 128,
            NoteType::TwoFiftySixth => 256,
        }
    }

    /// Fraction of a whole note occupied by this value
    pub fn fraction(&self) -> Ratio<u64> {
        Ratio::new(1, self.divisor() as u64)
    }

    /// Undotted duration in ticks at the given resolution
    pub fn ticks(&self, ppq: u32) -> u32 {
        (ppq as u64 * 4 / self.divisor() as u64) as u32
    }

    /// Number of beam levels this value carries (eighth = 1 ... 256th = 6,
    /// quarter and longer = 0, i.e. not beamable)
    pub fn beam_levels(&self) -> u8 {
        match self {
            NoteType::Whole | NoteType::Half | NoteType::Quarter => 0,
            NoteType::Eighth => 1,
            NoteType::Sixteenth => 2,
            NoteType::ThirtySecond => 3,
            NoteType::SixtyFourth => 4,
            NoteType::HundredTwentyEighth => 5,
            NoteType::TwoFiftySixth => 6,
        }
    }

    /// MusicXML `<type>` spelling
    pub fn name(&self) -> &'static str {
        match self {
            NoteType::Whole => "whole",
            NoteType::Half => "half",
            NoteType::Quarter => "quarter",
            NoteType::Eighth => "eighth",
            NoteType::Sixteenth => "16th",
            NoteType::ThirtySecond => "32nd",
            NoteType::SixtyFourth => "64th",
            NoteType::HundredTwentyEighth => "128th",
            NoteType::TwoFiftySixth => "256th",
        }
    }

    /// Parse a MusicXML `<type>` spelling
    pub fn from_name(name: &str) -> Option<NoteType> {
        NoteType::ALL.iter().copied().find(|t| t.name() == name)
    }
}

/// A note value with augmentation dots
///
/// Total duration is the base duration times the geometric dot series
/// (1 + 1/2 + 1/4 + ...), kept exact with rational arithmetic.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NoteTypeResult {
    pub note_type: NoteType,
    pub dots: u8,
}

impl NoteTypeResult {
    pub fn new(note_type: NoteType, dots: u8) -> Self {
        NoteTypeResult { note_type, dots }
    }

    /// Fraction of a whole note including dots:
    /// `base * (2^(dots+1) - 1) / 2^dots`
    pub fn whole_fraction(&self) -> Ratio<u64> {
        let pow = 1u64 << self.dots;
        self.note_type.fraction() * Ratio::new(2 * pow - 1, pow)
    }

    /// Total duration in ticks at the given resolution
    pub fn total_duration(&self, ppq: u32) -> u32 {
        let whole_ticks = Ratio::from_integer(ppq as u64 * 4);
        (self.whole_fraction() * whole_ticks).to_integer() as u32
    }
}

/// Position of a note inside a tied-note decomposition chain
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TiePosition {
    Start,
    Middle,
    Stop,
}

/// One emitted note of a tied-note decomposition
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TiedUnit {
    pub result: NoteTypeResult,
    /// Exact tick duration this unit covers
    pub duration: u32,
    /// None when the decomposition produced a single untied note
    pub tie: Option<TiePosition>,
}

/// An irregular grouping: N notes in the time normally occupied by M
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TupletType {
    Duplet,
    Triplet,
    Quadruplet,
    Quintuplet,
    Sextuplet,
    Septuplet,
}

impl TupletType {
    /// Number of notes actually played
    pub fn actual_count(&self) -> usize {
        match self {
            TupletType::Duplet => 2,
            TupletType::Triplet => 3,
            TupletType::Quadruplet => 4,
            TupletType::Quintuplet => 5,
            TupletType::Sextuplet => 6,
            TupletType::Septuplet => 7,
        }
    }

    /// Number of notes the group occupies the time of (the `normal-notes`
    /// side of the MusicXML time-modification ratio)
    pub fn normal_count(&self) -> usize {
        match self {
            TupletType::Duplet => 3,
            TupletType::Triplet => 2,
            TupletType::Quadruplet => 3,
            TupletType::Quintuplet => 4,
            TupletType::Sextuplet => 4,
            TupletType::Septuplet => 4,
        }
    }

    /// Detection preference multiplier: common groupings are boosted,
    /// rarer ones discounted
    pub fn preference(&self) -> f64 {
        match self {
            TupletType::Triplet => 1.2,
            TupletType::Duplet => 0.9,
            TupletType::Quintuplet => 0.85,
            TupletType::Sextuplet => 0.8,
            TupletType::Quadruplet => 0.75,
            TupletType::Septuplet => 0.7,
        }
    }

    /// Look up the tuplet type matching a played-note count
    pub fn from_actual_count(count: usize) -> Option<TupletType> {
        match count {
            2 => Some(TupletType::Duplet),
            3 => Some(TupletType::Triplet),
            4 => Some(TupletType::Quadruplet),
            5 => Some(TupletType::Quintuplet),
            6 => Some(TupletType::Sextuplet),
            7 => Some(TupletType::Septuplet),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TupletType::Duplet => "duplet",
            TupletType::Triplet => "triplet",
            TupletType::Quadruplet => "quadruplet",
            TupletType::Quintuplet => "quintuplet",
            TupletType::Sextuplet => "sextuplet",
            TupletType::Septuplet => "septuplet",
        }
    }
}

/// A detected tuplet annotation over a beat window
///
/// `note_indices` reference the owning measure's note list; the tuplet does
/// not own the notes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Tuplet {
    pub tuplet_type: TupletType,
    pub start_tick: u32,
    pub end_tick: u32,
    pub note_indices: Vec<usize>,
    /// Note value of the beat the tuplet subdivides
    pub beat_unit: NoteType,
    /// Detection confidence in [0, 1]
    pub confidence: f64,
}

/// Beam state at one beam level, MusicXML `<beam>` element content
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BeamState {
    Begin,
    Continue,
    End,
}

impl BeamState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BeamState::Begin => "begin",
            BeamState::Continue => "continue",
            BeamState::End => "end",
        }
    }
}

/// Per-note beam assignment: one state per beam level, level 1 first
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BeamedNote {
    /// Index into the owning measure's note list
    pub note_index: usize,
    /// States for levels 1..=N where N derives from the note's value
    pub levels: Vec<BeamState>,
}

/// A group of consecutive beamed notes
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BeamGroup {
    pub notes: Vec<BeamedNote>,
    pub start_tick: u32,
    /// Exclusive end: last note's onset plus its duration
    pub end_tick: u32,
}

/// An optimized rest filling part of a gap
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Rest {
    pub start_tick: u32,
    pub duration: u32,
    pub note_type: NoteType,
    pub dots: u8,
    /// Heuristic score this rest achieved during optimization
    pub alignment_score: f64,
    pub measure_number: u32,
}
