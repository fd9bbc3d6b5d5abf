//! Pipeline orchestrator
//!
//! Runs the full conversion: optional onset quantization, measurization,
//! then per-measure tuplet detection, beam grouping, and rest-gap
//! optimization. Output durations pass through the strict output-facing
//! quantizer, clamped so no note extends past its measure; notes floored to
//! zero are absorbed as noise and dropped, with any tie onto a dropped
//! split half cleared.
//!
//! The engine is synchronous and free of shared state: every call allocates
//! its own collections and nothing survives across calls.

use serde::{Deserialize, Serialize};

use crate::analysis::{
    BeamGrouper, RestOptimizer, RestOptimizerConfig, TupletDetector, TupletDetectorConfig,
};
use crate::error::Result;
use crate::ir::MeasureBoundaryDetector;
use crate::models::{
    BeamGroup, Gap, Measure, Rest, TimeSignatureEvent, TimedNote, Tuplet, DEFAULT_PPQ,
};
use crate::rhythm::{DurationQuantizer, GridResolution, OnsetGridQuantizer};

/// Engine configuration; one instance per conversion cycle
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig {
    /// Pulses per quarter note of the source timing
    pub ppq: u32,
    /// Onset grid quantization strength in [0, 1]; `None` leaves onsets
    /// untouched. The grid is auto-selected from the note group's spacing.
    pub quantize_strength: Option<f64>,
    pub tuplets: TupletDetectorConfig,
    pub rests: RestOptimizerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            ppq: DEFAULT_PPQ,
            quantize_strength: None,
            tuplets: TupletDetectorConfig::default(),
            rests: RestOptimizerConfig::default(),
        }
    }
}

/// Annotations produced for one measure
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MeasureAnnotations {
    pub measure_number: u32,
    pub tuplets: Vec<Tuplet>,
    pub beam_groups: Vec<BeamGroup>,
    pub rests: Vec<Rest>,
}

/// Complete engine output for the serialization layer
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NotatedScore {
    pub ppq: u32,
    pub measures: Vec<Measure>,
    /// One entry per measure, in measure order
    pub annotations: Vec<MeasureAnnotations>,
}

/// The notation timing engine
#[derive(Clone, Copy, Debug, Default)]
pub struct NotationEngine {
    config: EngineConfig,
}

impl NotationEngine {
    pub fn new(config: EngineConfig) -> Self {
        NotationEngine { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Main entry point: convert performed notes into notated structure
    ///
    /// Returns either a fully valid, contiguous measure/annotation
    /// structure or a specific error, never a half-populated result.
    pub fn process(
        &self,
        notes: &[TimedNote],
        signatures: &[TimeSignatureEvent],
    ) -> Result<NotatedScore> {
        let ppq = self.config.ppq;

        // Step 1: optional onset quantization
        let quantized: Vec<TimedNote>;
        let notes = match self.config.quantize_strength {
            Some(strength) => {
                let grid = GridResolution::select(notes, ppq);
                let quantizer = OnsetGridQuantizer::with_resolution(grid, ppq);
                quantized = quantizer.quantize_notes(notes, strength);
                &quantized[..]
            }
            None => notes,
        };

        // Step 2: measurization (sequential, must complete first)
        let detector = MeasureBoundaryDetector::new(ppq);
        let mut measures = detector.detect_measure_boundaries(notes, signatures)?;

        // Step 3: output-facing duration quantization. A quantized duration
        // is clamped to the measure span so a snap never pushes a resolved
        // split back across its boundary. Zero-floored notes are dropped
        // before the annotation passes see them; ties onto a dropped half
        // are cleared afterwards.
        let duration_quantizer = DurationQuantizer::new(ppq);
        let mut absorbed: Vec<TimedNote> = Vec::new();
        for measure in measures.iter_mut() {
            let measure_end = measure.end_tick;
            measure.notes.retain_mut(|note| {
                let quantized = duration_quantizer.quantize(note.duration);
                if quantized == 0 {
                    log::trace!(
                        "absorbing {}-tick note at {} as noise",
                        note.duration,
                        note.start_tick
                    );
                    absorbed.push(*note);
                    return false;
                }
                note.duration = quantized.min(measure_end - note.start_tick);
                true
            });
        }
        repair_broken_ties(&mut measures, &absorbed);

        // Step 4: per-measure annotation (independent per measure)
        let tuplet_detector = TupletDetector::with_config(ppq, self.config.tuplets);
        let beam_grouper = BeamGrouper::new(ppq);
        let rest_optimizer = RestOptimizer::with_config(ppq, self.config.rests);

        let annotations = measures
            .iter()
            .map(|measure| {
                let tuplets = tuplet_detector.detect_in_measure(measure);
                let beam_groups = beam_grouper.group_measure(measure);
                let rests = compute_gaps(measure)
                    .iter()
                    .flat_map(|gap| rest_optimizer.optimize_with_beams(gap, measure, &beam_groups))
                    .collect();
                MeasureAnnotations {
                    measure_number: measure.number,
                    tuplets,
                    beam_groups,
                    rests,
                }
            })
            .collect();

        log::debug!(
            "engine: {} input notes -> {} measures",
            notes.len(),
            measures.len()
        );

        Ok(NotatedScore {
            ppq,
            measures,
            annotations,
        })
    }
}

/// Clear tie flags pointing at an absorbed split half
///
/// A dropped second half leaves its predecessor's `tied_to_next` dangling
/// across the barline; a dropped first half leaves its successor's
/// `tied_from_previous` dangling. Partners are matched by the shared
/// boundary tick plus pitch and voice.
fn repair_broken_ties(measures: &mut [Measure], absorbed: &[TimedNote]) {
    for gone in absorbed {
        if gone.tied_from_previous {
            // The predecessor ended exactly where the dropped half began
            let boundary = gone.start_tick;
            if let Some(measure) = measures.iter_mut().find(|m| m.end_tick == boundary) {
                if let Some(prev) = measure.notes.iter_mut().rev().find(|n| {
                    n.tied_to_next && n.note == gone.note && n.voice == gone.voice
                }) {
                    prev.tied_to_next = false;
                }
            }
        }
        if gone.tied_to_next {
            let boundary = gone.end_tick();
            if let Some(measure) = measures
                .iter_mut()
                .find(|m| m.start_tick as u64 == boundary)
            {
                if let Some(next) = measure.notes.iter_mut().find(|n| {
                    n.tied_from_previous
                        && n.note == gone.note
                        && n.voice == gone.voice
                        && n.start_tick as u64 == boundary
                }) {
                    next.tied_from_previous = false;
                }
            }
        }
    }
}

/// Uncovered spans within a measure
///
/// Rest-marker notes (pitch 0) represent silence and count as uncovered;
/// overlapping pitched notes merge their coverage.
pub fn compute_gaps(measure: &Measure) -> Vec<Gap> {
    let mut intervals: Vec<(u32, u32)> = measure
        .notes
        .iter()
        .filter(|note| !note.is_rest_marker())
        .map(|note| {
            let start = note.start_tick.max(measure.start_tick);
            let end = note.end_tick().min(measure.end_tick as u64) as u32;
            (start, end)
        })
        .filter(|(start, end)| end > start)
        .collect();
    intervals.sort_unstable();

    let mut gaps = Vec::new();
    let mut cursor = measure.start_tick;

    for (start, end) in intervals {
        if start > cursor {
            gaps.push(Gap {
                start_tick: cursor,
                duration: start - cursor,
                measure_number: measure.number,
            });
        }
        cursor = cursor.max(end);
    }
    if cursor < measure.end_tick {
        gaps.push(Gap {
            start_tick: cursor,
            duration: measure.end_tick - cursor,
            measure_number: measure.number,
        });
    }

    gaps
}
