//! Measurization Layer
//!
//! This module segments a flat, absolute-tick note stream into measures
//! according to a (possibly changing) sequence of time signatures.
//!
//! # Architecture
//!
//! ```text
//! TimedNotes + TimeSignatureEvents → MEASURIZATION → Vec<Measure>
//! ```
//!
//! # Key Features
//!
//! - Walks forward in measure-sized steps from the first signature
//! - Shortens a measure when a signature change falls inside its span
//!   (signature changes never span a partial old measure)
//! - Splits boundary-crossing notes into tied pairs; the second half is
//!   reprocessed as the first note of the next measure
//! - Validates contiguity and strict 1-based numbering before returning
//!
//! All tick arithmetic is widened to `u64` and overflow surfaces as
//! `NotationError::TickOverflow` instead of wrapping.

use std::collections::VecDeque;

use crate::error::{NotationError, Result};
use crate::models::{Measure, TiedNotePair, TimeSignatureEvent, TimedNote};

/// Tick length of one full measure under a signature:
/// `numerator * ppq * 4 / denominator`
pub fn ticks_per_measure(signature: &TimeSignatureEvent, ppq: u32) -> Result<u32> {
    if signature.numerator == 0 {
        return Err(NotationError::InvalidTimeSignature {
            numerator: signature.numerator,
            denominator: signature.denominator(),
            reason: "numerator must be positive".to_string(),
        });
    }
    if signature.denominator_pow2 > 7 {
        return Err(NotationError::InvalidTimeSignature {
            numerator: signature.numerator,
            denominator: 1u32 << (signature.denominator_pow2.min(31)),
            reason: format!(
                "denominator power {} exceeds maximum of 7",
                signature.denominator_pow2
            ),
        });
    }

    let ticks = signature.numerator as u64 * ppq as u64 * 4 / signature.denominator() as u64;
    if ticks == 0 {
        return Err(NotationError::InvalidTimeSignature {
            numerator: signature.numerator,
            denominator: signature.denominator(),
            reason: "derived measure length is zero".to_string(),
        });
    }
    u32::try_from(ticks).map_err(|_| NotationError::TickOverflow("ticks_per_measure"))
}

/// Split a note at a measure boundary into a tied pair
///
/// The boundary must lie strictly inside the note's span; both halves keep
/// every static field of the original, durations sum to the original, and
/// `first.tied_to_next` / `second.tied_from_previous` are set. Any existing
/// tie flags on the outer edges of the original are preserved.
pub fn split_note_at_boundary(note: &TimedNote, boundary: u32) -> Result<TiedNotePair> {
    let start = note.start_tick;
    let end = note.end_tick();

    if (boundary as u64) <= (start as u64) || (boundary as u64) >= end {
        return Err(NotationError::InvalidNote {
            start,
            end: end.min(u32::MAX as u64) as u32,
            boundary,
        });
    }

    let first_duration = boundary - start;
    let second_duration = (end - boundary as u64) as u32;
    if first_duration == 0 || second_duration == 0 {
        return Err(NotationError::InvalidNote {
            start,
            end: end.min(u32::MAX as u64) as u32,
            boundary,
        });
    }

    let mut first = *note;
    first.duration = first_duration;
    first.tied_to_next = true;

    let mut second = *note;
    second.start_tick = boundary;
    second.duration = second_duration;
    second.tied_from_previous = true;

    Ok(TiedNotePair { first, second })
}

/// Segments note streams into measures
#[derive(Clone, Copy, Debug)]
pub struct MeasureBoundaryDetector {
    ppq: u32,
}

impl MeasureBoundaryDetector {
    pub fn new(ppq: u32) -> Self {
        MeasureBoundaryDetector { ppq }
    }

    /// Main entry point: segment `notes` into contiguous measures
    ///
    /// Fails with `NoTimeSignature` when `signatures` is empty and with
    /// `InvalidTimeSignature` when any active signature is unusable. Notes
    /// need not be pre-sorted. An empty note stream yields an empty measure
    /// list.
    ///
    /// The measure grid starts at the first signature's tick. A note whose
    /// onset precedes that tick is kept and lands in measure 1 with its
    /// onset unchanged; gap computation clamps such a note's span to the
    /// measure.
    pub fn detect_measure_boundaries(
        &self,
        notes: &[TimedNote],
        signatures: &[TimeSignatureEvent],
    ) -> Result<Vec<Measure>> {
        if signatures.is_empty() {
            return Err(NotationError::NoTimeSignature);
        }

        let mut signatures = signatures.to_vec();
        signatures.sort_by_key(|s| s.tick);

        let mut queue: VecDeque<TimedNote> = {
            let mut sorted = notes.to_vec();
            sorted.sort_by_key(|n| n.start_tick);
            sorted.into()
        };

        let mut measures: Vec<Measure> = Vec::new();
        let mut current_tick = signatures[0].tick;
        let mut sig_index = 0usize;
        let mut number = 1u32;

        while !queue.is_empty() {
            // Advance to the signature active at the measure start
            while sig_index + 1 < signatures.len()
                && signatures[sig_index + 1].tick <= current_tick
            {
                sig_index += 1;
            }
            let active = signatures[sig_index];

            let span = ticks_per_measure(&active, self.ppq)?;
            let full_end = current_tick as u64 + span as u64;
            if full_end > u32::MAX as u64 {
                return Err(NotationError::TickOverflow("measure end"));
            }
            let mut measure_end = full_end as u32;

            // A signature change inside the span shortens this measure to
            // end exactly at the change
            if let Some(next) = signatures.get(sig_index + 1) {
                if next.tick > current_tick && next.tick < measure_end {
                    measure_end = next.tick;
                }
            }

            let mut measure_notes: Vec<TimedNote> = Vec::new();
            let mut carried: Vec<TimedNote> = Vec::new();

            while let Some(note) = queue.front().copied() {
                if note.start_tick >= measure_end {
                    break;
                }
                queue.pop_front();

                if note.end_tick() > measure_end as u64 {
                    let pair = split_note_at_boundary(&note, measure_end)?;
                    measure_notes.push(pair.first);
                    carried.push(pair.second);
                } else {
                    measure_notes.push(note);
                }
            }

            // Second halves start exactly at measure_end, ahead of every
            // remaining queued note
            for second in carried.into_iter().rev() {
                queue.push_front(second);
            }

            measures.push(Measure {
                number,
                start_tick: current_tick,
                end_tick: measure_end,
                time_signature: active,
                notes: measure_notes,
            });

            current_tick = measure_end;
            number += 1;
        }

        validate_measures(&measures)?;
        log::debug!(
            "measurization: {} notes into {} measures",
            notes.len(),
            measures.len()
        );
        Ok(measures)
    }
}

/// Confirm contiguity, strict numbering, and positive spans
fn validate_measures(measures: &[Measure]) -> Result<()> {
    for (i, measure) in measures.iter().enumerate() {
        if measure.number != i as u32 + 1 {
            return Err(NotationError::Internal(format!(
                "measure at index {} numbered {}",
                i, measure.number
            )));
        }
        if measure.start_tick >= measure.end_tick {
            return Err(NotationError::Internal(format!(
                "measure {} has non-positive span [{}, {})",
                measure.number, measure.start_tick, measure.end_tick
            )));
        }
        if i > 0 && measures[i - 1].end_tick != measure.start_tick {
            return Err(NotationError::Internal(format!(
                "measure {} not contiguous with its predecessor",
                measure.number
            )));
        }
    }
    Ok(())
}
