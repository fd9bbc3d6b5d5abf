// Test rest-gap optimization: thresholds, whole-rest measures, merging

use notation_engine::analysis::{RestOptimizer, RestOptimizerConfig};
use notation_engine::{Gap, Measure, NoteType, TimeSignatureEvent, TimedNote};

const PPQ: u32 = 480;

fn measure_with(signature: TimeSignatureEvent, end_tick: u32, notes: Vec<TimedNote>) -> Measure {
    Measure {
        number: 1,
        start_tick: 0,
        end_tick,
        time_signature: signature,
        notes,
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
fn test_four_tick_gap_yields_nothing() {
    let optimizer = RestOptimizer::new(PPQ);
    let measure = measure_with(
        TimeSignatureEvent::common_time(0),
        1920,
        vec![TimedNote::new(60, 4, 1916)],
    );
    assert!(optimizer.optimize(&gap(0, 4), &measure).is_empty());
}

#[test]
fn test_empty_four_four_measure_exactly_one_whole_rest() {
    let optimizer = RestOptimizer::new(PPQ);
    let measure = measure_with(TimeSignatureEvent::common_time(0), 1920, Vec::new());
    let rests = optimizer.optimize(&gap(0, 1920), &measure);
    assert_eq!(rests.len(), 1);
    assert_eq!(rests[0].note_type, NoteType::Whole);
    assert_eq!(rests[0].dots, 0);
    assert_eq!(rests[0].start_tick, 0);
    assert_eq!(rests[0].duration, 1920);
}

#[test]
fn test_empty_six_eight_measure_whole_rest_regardless_of_meter() {
    let optimizer = RestOptimizer::new(PPQ);
    let measure = measure_with(TimeSignatureEvent::new(0, 6, 3), 1440, Vec::new());
    let rests = optimizer.optimize(&gap(0, 1440), &measure);
    assert_eq!(rests.len(), 1);
    assert_eq!(rests[0].note_type, NoteType::Whole);
}

#[test]
fn test_gap_fully_covered_and_contiguous() {
    let optimizer = RestOptimizer::new(PPQ);
    let measure = measure_with(
        TimeSignatureEvent::common_time(0),
        1920,
        vec![TimedNote::new(60, 0, 480)],
    );
    let rests = optimizer.optimize(&gap(480, 1440), &measure);
    let covered: u32 = rests.iter().map(|r| r.duration).sum();
    assert_eq!(covered, 1440);
    for pair in rests.windows(2) {
        assert_eq!(pair[0].start_tick + pair[0].duration, pair[1].start_tick);
    }
    // every emitted rest carries a consistent type/duration pairing
    for rest in &rests {
        let expected = notation_engine::NoteTypeResult::new(rest.note_type, rest.dots)
            .total_duration(PPQ);
        assert_eq!(rest.duration, expected);
    }
}

#[test]
fn test_merge_discount_is_configurable() {
    // an impossible discount forbids every merge
    let no_merge = RestOptimizer::with_config(
        PPQ,
        RestOptimizerConfig {
            merge_discount: 100.0,
            ..RestOptimizerConfig::default()
        },
    );
    let default = RestOptimizer::new(PPQ);

    let measure = measure_with(
        TimeSignatureEvent::common_time(0),
        1920,
        vec![TimedNote::new(60, 1440, 480)],
    );
    let strict = no_merge.optimize(&gap(0, 1440), &measure);
    let merged = default.optimize(&gap(0, 1440), &measure);
    assert!(merged.len() <= strict.len());
}

#[test]
fn test_small_rests_never_cross_beats_after_merge() {
    let optimizer = RestOptimizer::new(PPQ);
    let measure = measure_with(
        TimeSignatureEvent::common_time(0),
        1920,
        vec![TimedNote::new(60, 0, 240)],
    );
    let rests = optimizer.optimize(&gap(240, 1680), &measure);
    for rest in &rests {
        let crosses = rest.start_tick / PPQ != (rest.start_tick + rest.duration - 1) / PPQ;
        if crosses {
            assert!(
                matches!(rest.note_type, NoteType::Half | NoteType::Whole),
                "small {:?} rest crosses a beat",
                rest.note_type
            );
        }
    }
}

#[test]
fn test_beam_aware_never_overlaps_groups() {
    use notation_engine::{BeamGroup, BeamState, BeamedNote};

    let optimizer = RestOptimizer::new(PPQ);
    let measure = measure_with(
        TimeSignatureEvent::common_time(0),
        1920,
        vec![
            TimedNote::new(60, 960, 240),
            TimedNote::new(62, 1200, 240),
        ],
    );
    let groups = vec![BeamGroup {
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
        start_tick: 960,
        end_tick: 1440,
    }];

    let rests = optimizer.optimize_with_beams(&gap(0, 960), &measure, &groups);
    let covered: u32 = rests.iter().map(|r| r.duration).sum();
    assert_eq!(covered, 960);
    for rest in &rests {
        let end = rest.start_tick + rest.duration;
        assert!(
            end <= 960 || rest.start_tick >= 1440,
            "rest [{}, {}) overlaps the beam span",
            rest.start_tick,
            end
        );
    }
}
