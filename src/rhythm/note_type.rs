//! Tick-duration to note-value classification
//!
//! Maps a performed duration to a canonical (note type, dots) pair within a
//! tolerance, or decomposes it into a tied-note sequence when no single
//! value fits. All arithmetic is over integer ticks; the dotted series is
//! computed exactly (see `NoteTypeResult::whole_fraction`).

use crate::models::{NoteType, NoteTypeResult, TiePosition, TiedUnit};

/// Default matching tolerance as a percentage of the candidate's base duration
pub const DEFAULT_TOLERANCE_PERCENT: f64 = 10.0;

/// Maximum augmentation dots considered during matching
pub const MAX_DOTS: u8 = 4;

/// Converts tick durations to notated note values
#[derive(Clone, Copy, Debug)]
pub struct NoteTypeConverter {
    ppq: u32,
    tolerance_percent: f64,
}

impl NoteTypeConverter {
    pub fn new(ppq: u32) -> Self {
        NoteTypeConverter {
            ppq,
            tolerance_percent: DEFAULT_TOLERANCE_PERCENT,
        }
    }

    pub fn with_tolerance(ppq: u32, tolerance_percent: f64) -> Self {
        NoteTypeConverter {
            ppq,
            tolerance_percent,
        }
    }

    pub fn ppq(&self) -> u32 {
        self.ppq
    }

    /// Map a duration to the first (type, dots) pair whose total duration is
    /// within tolerance. Candidates are scanned longest type first, dots
    /// 0..=4 per type; the tolerance is relative to the *type's* undotted
    /// base duration. Returns `None` when nothing matches.
    pub fn convert_duration_to_note_type(&self, duration: u32) -> Option<NoteTypeResult> {
        for note_type in NoteType::ALL {
            let base = note_type.ticks(self.ppq);
            if base == 0 {
                continue;
            }
            let tolerance = base as f64 * self.tolerance_percent / 100.0;
            for dots in 0..=MAX_DOTS {
                let candidate = NoteTypeResult::new(note_type, dots);
                let total = candidate.total_duration(self.ppq);
                if (duration as f64 - total as f64).abs() <= tolerance {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Decompose a duration that matches no single note value into a
    /// sequence of tied notes.
    ///
    /// While ticks remain, the remainder is first offered to
    /// [`convert_duration_to_note_type`](Self::convert_duration_to_note_type);
    /// a match absorbs the rest of the duration. Otherwise the largest
    /// undotted value that fits is subtracted. A residue smaller than the
    /// shortest representable value is dropped as noise.
    ///
    /// Chains of two or more notes are tagged Start / Middle / Stop; a
    /// single-note result carries no tie.
    pub fn decompose_into_tied_notes(&self, duration: u32) -> Vec<TiedUnit> {
        let mut units: Vec<TiedUnit> = Vec::new();
        let mut remaining = duration;

        while remaining > 0 {
            if let Some(result) = self.convert_duration_to_note_type(remaining) {
                units.push(TiedUnit {
                    result,
                    duration: remaining,
                    tie: None,
                });
                break;
            }

            // Largest undotted value that fits the remainder
            let fit = NoteType::ALL
                .iter()
                .copied()
                .map(|t| (t, t.ticks(self.ppq)))
                .find(|&(_, ticks)| ticks > 0 && ticks <= remaining);

            match fit {
                Some((note_type, ticks)) => {
                    units.push(TiedUnit {
                        result: NoteTypeResult::new(note_type, 0),
                        duration: ticks,
                        tie: None,
                    });
                    remaining -= ticks;
                }
                None => {
                    log::trace!(
                        "dropping {} residual ticks below shortest note value",
                        remaining
                    );
                    break;
                }
            }
        }

        let count = units.len();
        if count >= 2 {
            for (i, unit) in units.iter_mut().enumerate() {
                unit.tie = Some(if i == 0 {
                    TiePosition::Start
                } else if i == count - 1 {
                    TiePosition::Stop
                } else {
                    TiePosition::Middle
                });
            }
        }

        units
    }
}
