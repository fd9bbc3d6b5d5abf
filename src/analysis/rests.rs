//! Rest-gap optimization
//!
//! Fills uncovered time spans with a minimal, convention-respecting set of
//! (possibly dotted) rests. Gaps below a minimum threshold are measurement
//! noise and dropped entirely. Selection is greedy: at the current position
//! the highest-scoring rest that fits the remaining duration wins. A merge
//! pass then combines adjacent rests when the merged rest scores at least as
//! well as the discounted sum of its parts.

use serde::{Deserialize, Serialize};

use crate::models::{BeamGroup, Gap, Measure, NoteType, NoteTypeResult, Rest};

/// Rest values considered during optimization, longest first
const REST_TYPES: [NoteType; 7] = [
    NoteType::Whole,
    NoteType::Half,
    NoteType::Quarter,
    NoteType::Eighth,
    NoteType::Sixteenth,
    NoteType::ThirtySecond,
    NoteType::SixtyFourth,
];

/// Score weights for rest placement
const ON_BEAT_BONUS: f64 = 4.0;
const HALF_BEAT_BONUS: f64 = 2.0;
const END_ON_BEAT_BONUS: f64 = 1.5;
const DOT_PENALTY: f64 = 0.25;
const METER_IDIOM_BONUS: f64 = 2.0;
const EMPTY_MEASURE_BONUS: f64 = 6.0;
const SUBDIVISION_BONUS: f64 = 0.75;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct RestOptimizerConfig {
    /// Gaps shorter than this are dropped as noise
    /// (60 ticks is 12.5% of a quarter at 480 PPQ)
    pub min_gap_ticks: u32,
    /// Maximum augmentation dots on an emitted rest
    pub max_dots: u8,
    /// Merge acceptance: merged score must be at least the sum of the
    /// replaced scores times this factor
    pub merge_discount: f64,
}

impl Default for RestOptimizerConfig {
    fn default() -> Self {
        RestOptimizerConfig {
            min_gap_ticks: 60,
            max_dots: 2,
            merge_discount: 0.5,
        }
    }
}

/// Fills gaps with optimally-notated rests
#[derive(Clone, Copy, Debug)]
pub struct RestOptimizer {
    ppq: u32,
    config: RestOptimizerConfig,
}

impl RestOptimizer {
    pub fn new(ppq: u32) -> Self {
        RestOptimizer {
            ppq,
            config: RestOptimizerConfig::default(),
        }
    }

    pub fn with_config(ppq: u32, config: RestOptimizerConfig) -> Self {
        RestOptimizer { ppq, config }
    }

    /// Fill one gap with rests
    pub fn optimize(&self, gap: &Gap, measure: &Measure) -> Vec<Rest> {
        self.optimize_inner(gap, measure, None)
    }

    /// Beam-aware variant: rests never overlap an already-fixed beam
    /// group's tick span, and boundaries landing on eighth/sixteenth
    /// subdivisions earn a bonus
    pub fn optimize_with_beams(
        &self,
        gap: &Gap,
        measure: &Measure,
        beam_groups: &[BeamGroup],
    ) -> Vec<Rest> {
        self.optimize_inner(gap, measure, Some(beam_groups))
    }

    fn optimize_inner(
        &self,
        gap: &Gap,
        measure: &Measure,
        beams: Option<&[BeamGroup]>,
    ) -> Vec<Rest> {
        if gap.duration < self.config.min_gap_ticks {
            if gap.duration > 0 {
                log::trace!(
                    "dropping {}-tick gap at {} (below {}-tick threshold)",
                    gap.duration,
                    gap.start_tick,
                    self.config.min_gap_ticks
                );
            }
            return Vec::new();
        }

        // An entirely empty measure gets exactly one whole rest, whatever
        // the signature says
        if measure.is_empty()
            && gap.start_tick == measure.start_tick
            && gap.duration == measure.duration_ticks()
        {
            let score = self.score(gap.start_tick, gap.duration, NoteType::Whole, 0, measure, beams)
                + EMPTY_MEASURE_BONUS;
            return vec![Rest {
                start_tick: gap.start_tick,
                duration: gap.duration,
                note_type: NoteType::Whole,
                dots: 0,
                alignment_score: score,
                measure_number: gap.measure_number,
            }];
        }

        let mut rests = self.fill_greedy(gap, measure, beams);
        self.merge_adjacent(&mut rests, measure, beams);
        rests
    }

    fn fill_greedy(&self, gap: &Gap, measure: &Measure, beams: Option<&[BeamGroup]>) -> Vec<Rest> {
        let mut rests = Vec::new();
        let gap_end = gap.start_tick + gap.duration;
        let mut position = gap.start_tick;

        while position < gap_end {
            let remaining = gap_end - position;
            let mut best: Option<(f64, NoteTypeResult, u32)> = None;

            for note_type in REST_TYPES {
                for dots in 0..=self.config.max_dots {
                    let candidate = NoteTypeResult::new(note_type, dots);
                    let duration = candidate.total_duration(self.ppq);
                    if duration == 0 || duration > remaining {
                        continue;
                    }
                    if let Some(groups) = beams {
                        if overlaps_beam_group(position, position + duration, groups) {
                            continue;
                        }
                    }
                    let score = self.score(position, duration, note_type, dots, measure, beams);
                    let better = match &best {
                        None => true,
                        Some((best_score, _, _)) => score > *best_score,
                    };
                    if better {
                        best = Some((score, candidate, duration));
                    }
                }
            }

            match best {
                Some((score, candidate, duration)) => {
                    rests.push(Rest {
                        start_tick: position,
                        duration,
                        note_type: candidate.note_type,
                        dots: candidate.dots,
                        alignment_score: score,
                        measure_number: gap.measure_number,
                    });
                    position += duration;
                }
                None => {
                    log::trace!(
                        "dropping {}-tick unfillable remainder at {}",
                        remaining,
                        position
                    );
                    break;
                }
            }
        }

        rests
    }

    /// Placement heuristic: beat-aligned starts score highest, half-beat
    /// starts partially, a beat-aligned end adds credit, simpler values
    /// beat shorter ones, dots cost a little, and a few meter idioms get a
    /// dedicated bonus.
    fn score(
        &self,
        start: u32,
        duration: u32,
        note_type: NoteType,
        dots: u8,
        measure: &Measure,
        beams: Option<&[BeamGroup]>,
    ) -> f64 {
        let beat = measure.time_signature.beat_ticks(self.ppq).max(1);
        let rel = start.saturating_sub(measure.start_tick);
        let mut score = 0.0;

        if rel % beat == 0 {
            score += ON_BEAT_BONUS;
        } else if beat / 2 > 0 && rel % (beat / 2) == 0 {
            score += HALF_BEAT_BONUS;
        }
        if (rel + duration) % beat == 0 {
            score += END_ON_BEAT_BONUS;
        }

        score += simplicity(note_type);
        score -= DOT_PENALTY * dots as f64;

        let signature = &measure.time_signature;
        match (signature.numerator, signature.denominator()) {
            // 3/4: a dotted half covering the whole measure is idiomatic
            (3, 4) => {
                if rel == 0 && note_type == NoteType::Half && dots == 1 {
                    score += METER_IDIOM_BONUS;
                }
            }
            // Compound meters favor dotted quarters on compound beats
            (n, 8) if n % 3 == 0 => {
                let compound_beat = beat * 3;
                if note_type == NoteType::Quarter && dots == 1 && rel % compound_beat == 0 {
                    score += METER_IDIOM_BONUS;
                }
            }
            _ => {}
        }

        if beams.is_some() {
            let sixteenth = (self.ppq / 4).max(1);
            if rel % sixteenth == 0 {
                score += SUBDIVISION_BONUS;
            }
            if (rel + duration) % sixteenth == 0 {
                score += SUBDIVISION_BONUS;
            }
        }

        score
    }

    /// Combine adjacent rests when the merged rest's score is at least the
    /// discounted sum of the replaced scores. Merges spanning a beat
    /// boundary are only allowed to produce a half or whole rest.
    fn merge_adjacent(&self, rests: &mut Vec<Rest>, measure: &Measure, beams: Option<&[BeamGroup]>) {
        let beat = measure.time_signature.beat_ticks(self.ppq).max(1);
        let mut i = 0;

        while i + 1 < rests.len() {
            let a = rests[i];
            let b = rests[i + 1];

            // Only physically adjacent rests merge
            if a.start_tick + a.duration != b.start_tick {
                i += 1;
                continue;
            }

            let merged_duration = a.duration + b.duration;
            let candidate = self.exact_value_for(merged_duration);

            let merged = candidate.and_then(|result| {
                let rel = a.start_tick.saturating_sub(measure.start_tick);
                let crosses_beat = rel / beat != (rel + merged_duration - 1) / beat;
                if crosses_beat
                    && !matches!(result.note_type, NoteType::Half | NoteType::Whole)
                {
                    return None;
                }
                if let Some(groups) = beams {
                    if overlaps_beam_group(a.start_tick, a.start_tick + merged_duration, groups) {
                        return None;
                    }
                }
                let score = self.score(
                    a.start_tick,
                    merged_duration,
                    result.note_type,
                    result.dots,
                    measure,
                    beams,
                );
                let threshold = (a.alignment_score + b.alignment_score) * self.config.merge_discount;
                (score >= threshold).then_some((result, score))
            });

            match merged {
                Some((result, score)) => {
                    rests[i] = Rest {
                        start_tick: a.start_tick,
                        duration: merged_duration,
                        note_type: result.note_type,
                        dots: result.dots,
                        alignment_score: score,
                        measure_number: a.measure_number,
                    };
                    rests.remove(i + 1);
                    // Stay at i: the merged rest may absorb its next neighbor
                }
                None => i += 1,
            }
        }
    }

    /// The simplest (longest type, fewest dots) rest value exactly equal to
    /// a duration, if any
    fn exact_value_for(&self, duration: u32) -> Option<NoteTypeResult> {
        for note_type in REST_TYPES {
            for dots in 0..=self.config.max_dots {
                let candidate = NoteTypeResult::new(note_type, dots);
                if candidate.total_duration(self.ppq) == duration {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

/// Relative simplicity bonus: longer values are easier to read
fn simplicity(note_type: NoteType) -> f64 {
    match note_type {
        NoteType::Whole => 3.0,
        NoteType::Half => 2.5,
        NoteType::Quarter => 2.0,
        NoteType::Eighth => 1.5,
        NoteType::Sixteenth => 1.0,
        NoteType::ThirtySecond => 0.5,
        _ => 0.25,
    }
}

/// Whether the span [start, end) overlaps any beam group's tick span
fn overlaps_beam_group(start: u32, end: u32, groups: &[BeamGroup]) -> bool {
    groups
        .iter()
        .any(|group| start < group.end_tick && group.start_tick < end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BeamState, BeamedNote, TimeSignatureEvent};

    fn empty_measure(signature: TimeSignatureEvent, end: u32) -> Measure {
        Measure {
            number: 1,
            start_tick: 0,
            end_tick: end,
            time_signature: signature,
            notes: Vec::new(),
        }
    }

    fn gap(start: u32, duration: u32) -> Gap {
        Gap {
            start_tick: start,
            duration,
            measure_number: 1,
        }
    }

    #[test]
    fn test_tiny_gap_dropped() {
        let optimizer = RestOptimizer::new(480);
        let measure = empty_measure(TimeSignatureEvent::common_time(0), 1920);
        assert!(optimizer.optimize(&gap(0, 4), &measure).is_empty());
        assert!(optimizer.optimize(&gap(100, 59), &measure).is_empty());
    }

    #[test]
    fn test_empty_measure_single_whole_rest() {
        let optimizer = RestOptimizer::new(480);
        let measure = empty_measure(TimeSignatureEvent::common_time(0), 1920);
        let rests = optimizer.optimize(&gap(0, 1920), &measure);
        assert_eq!(rests.len(), 1);
        assert_eq!(rests[0].note_type, NoteType::Whole);
        assert_eq!(rests[0].dots, 0);
        assert_eq!(rests[0].duration, 1920);
    }

    #[test]
    fn test_empty_three_four_measure_whole_rest() {
        // whole rest regardless of signature
        let optimizer = RestOptimizer::new(480);
        let measure = empty_measure(TimeSignatureEvent::new(0, 3, 2), 1440);
        let rests = optimizer.optimize(&gap(0, 1440), &measure);
        assert_eq!(rests.len(), 1);
        assert_eq!(rests[0].note_type, NoteType::Whole);
    }

    #[test]
    fn test_quarter_gap_on_beat() {
        let optimizer = RestOptimizer::new(480);
        let mut measure = empty_measure(TimeSignatureEvent::common_time(0), 1920);
        measure.notes.push(crate::models::TimedNote::new(60, 0, 480));
        let rests = optimizer.optimize(&gap(480, 480), &measure);
        assert_eq!(rests.len(), 1);
        assert_eq!(rests[0].note_type, NoteType::Quarter);
        assert_eq!(rests[0].dots, 0);
    }

    #[test]
    fn test_half_gap_merges_or_selects_half() {
        let optimizer = RestOptimizer::new(480);
        let mut measure = empty_measure(TimeSignatureEvent::common_time(0), 1920);
        measure.notes.push(crate::models::TimedNote::new(60, 0, 960));
        let rests = optimizer.optimize(&gap(960, 960), &measure);
        assert_eq!(rests.len(), 1);
        assert_eq!(rests[0].note_type, NoteType::Half);
    }

    #[test]
    fn test_off_beat_remainder_smaller_values() {
        let optimizer = RestOptimizer::new(480);
        let mut measure = empty_measure(TimeSignatureEvent::common_time(0), 1920);
        measure.notes.push(crate::models::TimedNote::new(60, 0, 240));
        // gap from the off-beat eighth position to the end of beat one
        let rests = optimizer.optimize(&gap(240, 240), &measure);
        assert_eq!(rests.len(), 1);
        assert_eq!(rests[0].note_type, NoteType::Eighth);
    }

    #[test]
    fn test_total_coverage_preserved() {
        let optimizer = RestOptimizer::new(480);
        let mut measure = empty_measure(TimeSignatureEvent::common_time(0), 1920);
        measure.notes.push(crate::models::TimedNote::new(60, 0, 120));
        let rests = optimizer.optimize(&gap(120, 1800), &measure);
        let covered: u32 = rests.iter().map(|r| r.duration).sum();
        assert_eq!(covered, 1800);
        // contiguous
        for pair in rests.windows(2) {
            assert_eq!(pair[0].start_tick + pair[0].duration, pair[1].start_tick);
        }
    }

    #[test]
    fn test_beam_aware_avoids_group_span() {
        let optimizer = RestOptimizer::new(480);
        let mut measure = empty_measure(TimeSignatureEvent::common_time(0), 1920);
        measure.notes.push(crate::models::TimedNote::new(60, 480, 240));
        measure.notes.push(crate::models::TimedNote::new(62, 720, 240));
        let beam_group = BeamGroup {
            notes: vec![
                BeamedNote {
                    note_index: 0,
                    levels: vec![BeamState::Begin],
                },
                BeamedNote {
                    note_index: 1,
                    levels: vec![BeamState::End],
                },
            ],
            start_tick: 480,
            end_tick: 960,
        };
        // the gap sits entirely before the beamed span
        let rests = optimizer.optimize_with_beams(&gap(0, 480), &measure, &[beam_group]);
        assert_eq!(rests.len(), 1);
        for rest in &rests {
            assert!(rest.start_tick + rest.duration <= 480);
        }
    }

    #[test]
    fn test_merge_respects_discounted_sum() {
        let optimizer = RestOptimizer::new(480);
        let mut measure = empty_measure(TimeSignatureEvent::common_time(0), 1920);
        measure.notes.push(crate::models::TimedNote::new(60, 1920 - 480, 480));
        // a three-beat gap: greedy emits per-beat rests, the merge pass may
        // combine the first two into a half
        let rests = optimizer.optimize(&gap(0, 1440), &measure);
        let covered: u32 = rests.iter().map(|r| r.duration).sum();
        assert_eq!(covered, 1440);
        assert!(rests.len() <= 3);
        // no rest crosses a beat boundary with a small value
        let beat = 480;
        for rest in &rests {
            let crosses = rest.start_tick / beat != (rest.start_tick + rest.duration - 1) / beat;
            if crosses {
                assert!(matches!(rest.note_type, NoteType::Half | NoteType::Whole));
            }
        }
    }
}
