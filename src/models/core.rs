//! Core timing models: performed notes, time signatures, measures, gaps
//!
//! These are the value types that flow through the engine. Everything is
//! created fresh per conversion run from immutable input slices; notes are
//! never mutated in place; splitting produces two new notes.

use serde::{Deserialize, Serialize};

/// Default pulses-per-quarter-note resolution of the source timing
pub const DEFAULT_PPQ: u32 = 480;

/// A single performed note at absolute-tick resolution
///
/// `note == 0` marks an explicit rest span supplied by the upstream parser;
/// the rest optimizer treats such spans as uncovered time.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimedNote {
    /// MIDI-style pitch number (0 = rest marker)
    pub note: u8,
    pub channel: u8,
    pub velocity: u8,
    /// Absolute onset in ticks
    pub start_tick: u32,
    /// Duration in ticks, always > 0
    pub duration: u32,
    /// Continues into the following note (set by boundary splitting)
    pub tied_to_next: bool,
    /// Continues from the preceding note (set by boundary splitting)
    pub tied_from_previous: bool,
    pub track: u8,
    pub voice: u8,
}

impl TimedNote {
    /// Create a note with default channel/track/voice metadata
    pub fn new(note: u8, start_tick: u32, duration: u32) -> Self {
        TimedNote {
            note,
            channel: 0,
            velocity: 64,
            start_tick,
            duration,
            tied_to_next: false,
            tied_from_previous: false,
            track: 0,
            voice: 1,
        }
    }

    /// Exclusive end tick, widened to avoid overflow at the top of the range
    pub fn end_tick(&self) -> u64 {
        self.start_tick as u64 + self.duration as u64
    }

    /// Whether this entry is an explicit rest span rather than a pitch
    pub fn is_rest_marker(&self) -> bool {
        self.note == 0
    }
}

/// A time signature effective from a given tick
///
/// The denominator is stored as a power of two (MIDI meta convention):
/// `denominator = 1 << denominator_pow2`. Valid events have `numerator > 0`
/// and `denominator_pow2 <= 7`; measure detection validates this.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeSignatureEvent {
    /// Absolute tick this signature takes effect
    pub tick: u32,
    pub numerator: u8,
    pub denominator_pow2: u8,
}

impl TimeSignatureEvent {
    pub fn new(tick: u32, numerator: u8, denominator_pow2: u8) -> Self {
        TimeSignatureEvent {
            tick,
            numerator,
            denominator_pow2,
        }
    }

    /// Common time (4/4) effective from `tick`
    pub fn common_time(tick: u32) -> Self {
        TimeSignatureEvent::new(tick, 4, 2)
    }

    /// The notated denominator (4 = quarter, 8 = eighth, ...)
    pub fn denominator(&self) -> u32 {
        1u32 << self.denominator_pow2
    }

    /// Tick length of one denominator beat at the given resolution
    ///
    /// Formula: `ppq * 4 / denominator` (a quarter-note beat equals `ppq`).
    pub fn beat_ticks(&self, ppq: u32) -> u32 {
        (ppq as u64 * 4 / self.denominator() as u64) as u32
    }
}

/// A notated measure with resolved boundary splits
///
/// Invariants (confirmed by a validation pass after detection):
/// `start_tick < end_tick`, numbers start at 1 and increase by one, and
/// consecutive measures are contiguous (`end_tick[i] == start_tick[i+1]`).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Measure {
    /// 1-based measure number
    pub number: u32,
    pub start_tick: u32,
    /// Exclusive end tick
    pub end_tick: u32,
    /// Signature active for this measure
    pub time_signature: TimeSignatureEvent,
    /// Notes whose onset falls inside this measure, in onset order
    pub notes: Vec<TimedNote>,
}

impl Measure {
    /// Measure length in ticks
    pub fn duration_ticks(&self) -> u32 {
        self.end_tick - self.start_tick
    }

    /// Whether the measure contains no notes at all
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn contains_tick(&self, tick: u32) -> bool {
        tick >= self.start_tick && tick < self.end_tick
    }
}

/// The two halves produced by splitting a note at a measure boundary
///
/// Both halves copy the original note's static fields;
/// `first.duration + second.duration == original.duration`,
/// `first.tied_to_next` and `second.tied_from_previous` are set.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TiedNotePair {
    pub first: TimedNote,
    pub second: TimedNote,
}

/// An uncovered time span inside one measure, input to rest optimization
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Gap {
    pub start_tick: u32,
    pub duration: u32,
    /// Measure this gap belongs to
    pub measure_number: u32,
}
