//! Statistical tuplet detection
//!
//! Tests whether a beat-scoped note group fits an irregular grouping
//! (triplet, quintuplet, ...) and assigns a confidence score. Power-of-two
//! counts are standard subdivisions and never produce a tuplet. A candidate
//! below the confidence threshold is simply omitted and the notes fall back to
//! plain notation.

use serde::{Deserialize, Serialize};

use crate::models::{Measure, NoteType, TimedNote, Tuplet, TupletType};

/// Detection priority: common groupings are tried first
const TYPE_PRIORITY: [TupletType; 6] = [
    TupletType::Triplet,
    TupletType::Quintuplet,
    TupletType::Sextuplet,
    TupletType::Duplet,
    TupletType::Septuplet,
    TupletType::Quadruplet,
];

/// Weight applied to the error-variance penalty
const VARIANCE_WEIGHT: f64 = 0.1;

/// Scale of the penalty for relative timing error beyond the tolerance
const EXCESS_ERROR_WEIGHT: f64 = 5.0;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct TupletDetectorConfig {
    /// Maximum relative timing error before confidence is penalized
    pub max_timing_error: f64,
    /// Threshold a candidate must reach to be reported
    pub min_confidence: f64,
}

impl Default for TupletDetectorConfig {
    fn default() -> Self {
        TupletDetectorConfig {
            max_timing_error: 0.10,
            min_confidence: 0.70,
        }
    }
}

/// Detects tuplets in beat-scoped note groups
#[derive(Clone, Copy, Debug)]
pub struct TupletDetector {
    ppq: u32,
    config: TupletDetectorConfig,
}

impl TupletDetector {
    pub fn new(ppq: u32) -> Self {
        TupletDetector {
            ppq,
            config: TupletDetectorConfig::default(),
        }
    }

    pub fn with_config(ppq: u32, config: TupletDetectorConfig) -> Self {
        TupletDetector { ppq, config }
    }

    /// Test a single beat-scoped group. Returned `note_indices` are local
    /// to the given slice.
    pub fn detect_in_group(
        &self,
        notes: &[TimedNote],
        beat_start: u32,
        beat_length: u32,
    ) -> Option<Tuplet> {
        let count = notes.len();
        if count < 2 || beat_length == 0 {
            return None;
        }
        // Standard subdivision: nothing to annotate
        if count.is_power_of_two() {
            return None;
        }

        for tuplet_type in TYPE_PRIORITY {
            if tuplet_type.actual_count() != count {
                continue;
            }

            let confidence = self.score_group(notes, beat_length, tuplet_type);
            if confidence >= self.config.min_confidence {
                return Some(Tuplet {
                    tuplet_type,
                    start_tick: beat_start,
                    end_tick: beat_start.saturating_add(beat_length),
                    note_indices: (0..count).collect(),
                    beat_unit: beat_unit_for(beat_length, self.ppq),
                    confidence,
                });
            }
            log::trace!(
                "rejected {} candidate at tick {}: confidence {:.3} below {:.2}",
                tuplet_type.name(),
                beat_start,
                confidence,
                self.config.min_confidence
            );
        }

        None
    }

    /// Repeat detection per beat window across a whole measure. Returned
    /// `note_indices` reference the measure's note list.
    pub fn detect_in_measure(&self, measure: &Measure) -> Vec<Tuplet> {
        let beat = measure.time_signature.beat_ticks(self.ppq);
        if beat == 0 {
            return Vec::new();
        }

        let mut tuplets = Vec::new();
        let mut window_start = measure.start_tick;

        while window_start < measure.end_tick {
            let window_end = window_start.saturating_add(beat).min(measure.end_tick);

            // Measure notes are in onset order, so a window is a contiguous
            // index range
            let first = measure
                .notes
                .partition_point(|n| n.start_tick < window_start);
            let last = measure.notes.partition_point(|n| n.start_tick < window_end);

            if last > first {
                let window_len = window_end - window_start;
                if let Some(mut tuplet) =
                    self.detect_in_group(&measure.notes[first..last], window_start, window_len)
                {
                    for index in tuplet.note_indices.iter_mut() {
                        *index += first;
                    }
                    tuplets.push(tuplet);
                }
            }

            window_start = window_end;
        }

        tuplets
    }

    /// Confidence for a group under a tuplet hypothesis: perfect spacing
    /// scores 1.0; timing error beyond the tolerance and error variance
    /// reduce it; the type preference multiplier scales the result.
    fn score_group(&self, notes: &[TimedNote], beat_length: u32, tuplet_type: TupletType) -> f64 {
        let expected_spacing = beat_length as f64 / tuplet_type.actual_count() as f64;

        let errors: Vec<f64> = notes
            .windows(2)
            .map(|pair| {
                let spacing = pair[1].start_tick as f64 - pair[0].start_tick as f64;
                (spacing - expected_spacing).abs()
            })
            .collect();
        if errors.is_empty() {
            return 0.0;
        }

        let mean_error = errors.iter().sum::<f64>() / errors.len() as f64;
        let relative_error = mean_error / beat_length as f64;
        let variance = errors
            .iter()
            .map(|e| (e - mean_error) * (e - mean_error))
            .sum::<f64>()
            / errors.len() as f64;
        let normalized_variance = variance / (expected_spacing * expected_spacing);

        let mut confidence = 1.0;
        if relative_error > self.config.max_timing_error {
            confidence -= (relative_error - self.config.max_timing_error) * EXCESS_ERROR_WEIGHT;
        }
        confidence -= normalized_variance * VARIANCE_WEIGHT;
        confidence *= tuplet_type.preference();
        confidence.clamp(0.0, 1.0)
    }
}

/// Label the beat unit by comparing the window length against the
/// quarter-note resolution
fn beat_unit_for(beat_length: u32, ppq: u32) -> NoteType {
    if beat_length >= ppq {
        NoteType::Quarter
    } else if beat_length >= ppq / 2 {
        NoteType::Eighth
    } else if beat_length >= ppq / 4 {
        NoteType::Sixteenth
    } else {
        NoteType::ThirtySecond
    }
}
