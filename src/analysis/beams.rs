//! Time-signature-aware beam grouping
//!
//! Walks a measure's notes in onset order and groups beamable notes
//! (eighth or shorter) according to the beat hierarchy of the active meter,
//! then assigns per-level begin/continue/end beam states.
//!
//! Boundary semantics: a note whose onset lands *exactly* on a beat-window
//! boundary starts a new group (inclusive comparison). A note that itself
//! straddles a window boundary always ends its group.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::models::{BeamGroup, BeamState, BeamedNote, Measure, TimeSignatureEvent, TimedNote};
use crate::rhythm::NoteTypeConverter;

/// Meter family governing beam grouping rules
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeterClass {
    SimpleDuple,
    SimpleTriple,
    SimpleQuadruple,
    Compound,
    CutTime,
    Irregular,
}

impl MeterClass {
    pub fn classify(signature: &TimeSignatureEvent) -> MeterClass {
        match (signature.numerator, signature.denominator()) {
            (2, 4) => MeterClass::SimpleDuple,
            (3, 4) => MeterClass::SimpleTriple,
            (4, 4) => MeterClass::SimpleQuadruple,
            (6, 8) | (9, 8) | (12, 8) => MeterClass::Compound,
            (2, 2) => MeterClass::CutTime,
            _ => MeterClass::Irregular,
        }
    }
}

/// Grouping rule for one meter class
#[derive(Clone, Copy, Debug)]
struct BeamRule {
    /// Grouping window as a fraction of a quarter note (numerator, denominator)
    window_quarters: (u32, u32),
    /// Maximum number of notes in one group
    max_run: usize,
    /// Whether groups may never span the measure's midpoint
    break_at_midpoint: bool,
}

impl BeamRule {
    fn window_ticks(&self, ppq: u32) -> u32 {
        let (num, den) = self.window_quarters;
        (ppq as u64 * num as u64 / den as u64) as u32
    }
}

/// Rule applied when a meter class has no table entry: per-beat windows,
/// short runs. Also the `Irregular` entry.
const FALLBACK_RULE: BeamRule = BeamRule {
    window_quarters: (1, 1),
    max_run: 4,
    break_at_midpoint: false,
};

static BEAM_RULES: Lazy<HashMap<MeterClass, BeamRule>> = Lazy::new(|| {
    let mut rules = HashMap::new();
    rules.insert(
        MeterClass::SimpleQuadruple,
        BeamRule {
            window_quarters: (1, 1),
            max_run: 4,
            break_at_midpoint: true,
        },
    );
    rules.insert(
        MeterClass::SimpleTriple,
        BeamRule {
            window_quarters: (1, 1),
            max_run: 3,
            break_at_midpoint: false,
        },
    );
    rules.insert(
        MeterClass::SimpleDuple,
        BeamRule {
            window_quarters: (1, 1),
            max_run: 4,
            break_at_midpoint: false,
        },
    );
    // Compound meters beam in dotted-quarter units (three eighths)
    rules.insert(
        MeterClass::Compound,
        BeamRule {
            window_quarters: (3, 2),
            max_run: 6,
            break_at_midpoint: false,
        },
    );
    // Cut time is permissive: half-note windows, long runs allowed
    rules.insert(
        MeterClass::CutTime,
        BeamRule {
            window_quarters: (2, 1),
            max_run: 8,
            break_at_midpoint: false,
        },
    );
    rules.insert(MeterClass::Irregular, FALLBACK_RULE);
    rules
});

/// Groups beamable notes and assigns beam states per measure
#[derive(Clone, Copy, Debug)]
pub struct BeamGrouper {
    ppq: u32,
}

struct OpenGroup {
    /// (note index, beam level count) per member
    members: Vec<(usize, u8)>,
    start_tick: u32,
    end_tick: u32,
    window: u32,
}

impl BeamGrouper {
    pub fn new(ppq: u32) -> Self {
        BeamGrouper { ppq }
    }

    /// Group a measure's notes and assign per-level beam states.
    /// Deterministic: identical input yields identical assignments.
    pub fn group_measure(&self, measure: &Measure) -> Vec<BeamGroup> {
        let rule = BEAM_RULES
            .get(&MeterClass::classify(&measure.time_signature))
            .copied()
            .unwrap_or(FALLBACK_RULE);
        let window_ticks = rule.window_ticks(self.ppq).max(1);
        let midpoint = measure.start_tick + measure.duration_ticks() / 2;
        let converter = NoteTypeConverter::new(self.ppq);

        let mut groups: Vec<BeamGroup> = Vec::new();
        let mut open: Option<OpenGroup> = None;

        for (index, note) in measure.notes.iter().enumerate() {
            let levels = beam_level_count(&converter, note);
            if levels == 0 {
                // Non-beamable notes close any open group
                if let Some(group) = open.take() {
                    close_group(group, &mut groups);
                }
                continue;
            }

            let rel = note.start_tick.saturating_sub(measure.start_tick);
            let window = rel / window_ticks;
            let note_end = note.start_tick as u64 + note.duration as u64;
            let window_boundary =
                measure.start_tick as u64 + (window as u64 + 1) * window_ticks as u64;

            let extend = match &open {
                None => false,
                Some(group) => {
                    group.window == window
                        && group.members.len() < rule.max_run
                        && !(rule.break_at_midpoint
                            && group.start_tick < midpoint
                            && note.start_tick >= midpoint)
                }
            };

            if let (true, Some(group)) = (extend, open.as_mut()) {
                group.members.push((index, levels));
                group.end_tick = note_end.min(u32::MAX as u64) as u32;
            } else {
                if let Some(group) = open.take() {
                    close_group(group, &mut groups);
                }
                open = Some(OpenGroup {
                    members: vec![(index, levels)],
                    start_tick: note.start_tick,
                    end_tick: note_end.min(u32::MAX as u64) as u32,
                    window,
                });
            }

            // A note straddling a window boundary forces its group to end
            if note_end > window_boundary {
                if let Some(group) = open.take() {
                    close_group(group, &mut groups);
                }
            }
        }

        if let Some(group) = open.take() {
            close_group(group, &mut groups);
        }

        groups
    }
}

/// Beam level count of a note: 0 for unclassifiable or quarter-and-longer
/// durations, 1..=6 for eighth down to 256th
fn beam_level_count(converter: &NoteTypeConverter, note: &TimedNote) -> u8 {
    if note.is_rest_marker() {
        return 0;
    }
    converter
        .convert_duration_to_note_type(note.duration)
        .map(|result| result.note_type.beam_levels())
        .unwrap_or(0)
}

/// Emit a finished group: first member begins, last ends, interior members
/// continue, on every level the member's note value carries. Runs shorter
/// than two notes carry no beam markings.
fn close_group(group: OpenGroup, groups: &mut Vec<BeamGroup>) {
    if group.members.len() < 2 {
        return;
    }

    let last = group.members.len() - 1;
    let notes = group
        .members
        .iter()
        .enumerate()
        .map(|(position, &(note_index, levels))| {
            let state = if position == 0 {
                BeamState::Begin
            } else if position == last {
                BeamState::End
            } else {
                BeamState::Continue
            };
            BeamedNote {
                note_index,
                levels: vec![state; levels as usize],
            }
        })
        .collect();

    groups.push(BeamGroup {
        notes,
        start_tick: group.start_tick,
        end_tick: group.end_tick,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeSignatureEvent;

    fn eighths(start: u32, count: usize) -> Vec<TimedNote> {
        (0..count)
            .map(|i| TimedNote::new(60, start + i as u32 * 240, 240))
            .collect()
    }

    fn measure(signature: TimeSignatureEvent, end: u32, notes: Vec<TimedNote>) -> Measure {
        Measure {
            number: 1,
            start_tick: 0,
            end_tick: end,
            time_signature: signature,
            notes,
        }
    }

    #[test]
    fn test_four_four_breaks_at_beats() {
        let grouper = BeamGrouper::new(480);
        // eight straight eighths: grouped two per beat
        let m = measure(TimeSignatureEvent::common_time(0), 1920, eighths(0, 8));
        let groups = grouper.group_measure(&m);
        assert_eq!(groups.len(), 4);
        for group in &groups {
            assert_eq!(group.notes.len(), 2);
            assert_eq!(group.notes[0].levels, vec![BeamState::Begin]);
            assert_eq!(group.notes[1].levels, vec![BeamState::End]);
        }
    }

    #[test]
    fn test_quarter_notes_not_beamed() {
        let grouper = BeamGrouper::new(480);
        let notes: Vec<TimedNote> = (0..4).map(|i| TimedNote::new(60, i * 480, 480)).collect();
        let m = measure(TimeSignatureEvent::common_time(0), 1920, notes);
        assert!(grouper.group_measure(&m).is_empty());
    }

    #[test]
    fn test_nonbeamable_note_closes_group() {
        let grouper = BeamGrouper::new(480);
        // two eighths, a quarter in the middle, two eighths at beat three
        let notes = vec![
            TimedNote::new(60, 0, 240),
            TimedNote::new(62, 240, 240),
            TimedNote::new(64, 480, 480),
            TimedNote::new(65, 960, 240),
            TimedNote::new(67, 1200, 240),
        ];
        let m = measure(TimeSignatureEvent::common_time(0), 1920, notes);
        let groups = grouper.group_measure(&m);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].start_tick, 0);
        assert_eq!(groups[1].start_tick, 960);
    }

    #[test]
    fn test_single_beamable_note_unmarked() {
        let grouper = BeamGrouper::new(480);
        let m = measure(
            TimeSignatureEvent::common_time(0),
            1920,
            vec![TimedNote::new(60, 0, 240)],
        );
        assert!(grouper.group_measure(&m).is_empty());
    }

    #[test]
    fn test_sixteenths_carry_two_levels() {
        let grouper = BeamGrouper::new(480);
        let notes: Vec<TimedNote> = (0..4).map(|i| TimedNote::new(60, i * 120, 120)).collect();
        let m = measure(TimeSignatureEvent::common_time(0), 1920, notes);
        let groups = grouper.group_measure(&m);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].notes.len(), 4);
        assert_eq!(
            groups[0].notes[0].levels,
            vec![BeamState::Begin, BeamState::Begin]
        );
        assert_eq!(
            groups[0].notes[1].levels,
            vec![BeamState::Continue, BeamState::Continue]
        );
        assert_eq!(
            groups[0].notes[3].levels,
            vec![BeamState::End, BeamState::End]
        );
    }

    #[test]
    fn test_compound_meter_three_eighth_windows() {
        let grouper = BeamGrouper::new(480);
        let m = measure(TimeSignatureEvent::new(0, 6, 3), 1440, eighths(0, 6));
        let groups = grouper.group_measure(&m);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].notes.len(), 3);
        assert_eq!(groups[1].notes.len(), 3);
        assert_eq!(groups[1].start_tick, 720);
    }

    #[test]
    fn test_cut_time_permissive() {
        let grouper = BeamGrouper::new(480);
        let m = measure(TimeSignatureEvent::new(0, 2, 1), 1920, eighths(0, 8));
        let groups = grouper.group_measure(&m);
        // half-note windows: two groups of four
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].notes.len(), 4);
        assert_eq!(groups[1].notes.len(), 4);
    }

    #[test]
    fn test_note_on_exact_boundary_starts_new_group() {
        let grouper = BeamGrouper::new(480);
        // eighth at 240, then one exactly on the beat boundary at 480
        let notes = vec![TimedNote::new(60, 240, 240), TimedNote::new(62, 480, 240)];
        let m = measure(TimeSignatureEvent::common_time(0), 1920, notes);
        let groups = grouper.group_measure(&m);
        // both runs have length one, so no beams at all
        assert!(groups.is_empty());
    }

    #[test]
    fn test_straddling_note_ends_group() {
        let grouper = BeamGrouper::new(480);
        // second eighth starts at 360 and crosses the beat boundary at 480
        let notes = vec![
            TimedNote::new(60, 120, 240),
            TimedNote::new(62, 360, 240),
            TimedNote::new(64, 600, 240),
            TimedNote::new(65, 840, 240),
        ];
        let m = measure(TimeSignatureEvent::common_time(0), 1920, notes);
        let groups = grouper.group_measure(&m);
        // the straddler closes the first group; notes at 600/840 share beat 2
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].notes.len(), 2);
        assert_eq!(groups[1].notes.len(), 2);
    }

    #[test]
    fn test_unlisted_meter_grouped_by_fallback_rule() {
        let grouper = BeamGrouper::new(480);
        // 5/4 classifies as irregular: per-beat windows, pairs of eighths
        let m = measure(TimeSignatureEvent::new(0, 5, 2), 2400, eighths(0, 10));
        let groups = grouper.group_measure(&m);
        assert_eq!(groups.len(), 5);
        for group in &groups {
            assert_eq!(group.notes.len(), 2);
        }
    }

    #[test]
    fn test_deterministic_reruns() {
        let grouper = BeamGrouper::new(480);
        let m = measure(TimeSignatureEvent::common_time(0), 1920, eighths(0, 8));
        let first = grouper.group_measure(&m);
        let second = grouper.group_measure(&m);
        assert_eq!(first, second);
    }
}
