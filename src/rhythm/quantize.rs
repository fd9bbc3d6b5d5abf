//! Onset grid quantization and output-facing duration quantization
//!
//! The onset quantizer snaps note starts to a rhythmic grid with adjustable
//! strength; the duration quantizer is the stricter variant applied right
//! before durations are handed to the serialization layer.

use serde::{Deserialize, Serialize};

use crate::models::{NoteType, NoteTypeResult, TimedNote};
use crate::rhythm::note_type::MAX_DOTS;

/// Rhythmic subdivision used for onset snapping
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridResolution {
    Quarter,
    Eighth,
    Sixteenth,
}

impl GridResolution {
    /// Grid spacing in ticks at the given resolution
    pub fn ticks(&self, ppq: u32) -> u32 {
        match self {
            GridResolution::Quarter => ppq,
            GridResolution::Eighth => ppq / 2,
            GridResolution::Sixteenth => ppq / 4,
        }
    }

    /// Pick a grid from a note group's mean inter-onset interval:
    /// wide spacing gets a coarse grid, dense playing a fine one.
    /// Fewer than two notes defaults to sixteenth.
    pub fn select(notes: &[TimedNote], ppq: u32) -> GridResolution {
        if notes.len() < 2 {
            return GridResolution::Sixteenth;
        }

        let mut onsets: Vec<u32> = notes.iter().map(|n| n.start_tick).collect();
        onsets.sort_unstable();
        let total: u64 = onsets
            .windows(2)
            .map(|w| (w[1] - w[0]) as u64)
            .sum();
        let mean_interval = total / (onsets.len() as u64 - 1);

        if mean_interval >= 2 * ppq as u64 {
            GridResolution::Quarter
        } else if mean_interval >= ppq as u64 {
            GridResolution::Eighth
        } else {
            GridResolution::Sixteenth
        }
    }
}

/// Snaps note onsets to a rhythmic grid
#[derive(Clone, Copy, Debug)]
pub struct OnsetGridQuantizer {
    grid: u32,
}

impl OnsetGridQuantizer {
    /// Create a quantizer with an explicit grid spacing in ticks
    pub fn new(grid: u32) -> Self {
        OnsetGridQuantizer { grid: grid.max(1) }
    }

    pub fn with_resolution(resolution: GridResolution, ppq: u32) -> Self {
        OnsetGridQuantizer::new(resolution.ticks(ppq))
    }

    pub fn grid(&self) -> u32 {
        self.grid
    }

    /// Integer round-half-up snap: `((tick + grid/2) / grid) * grid`
    pub fn snap_to_grid(&self, tick: u32) -> u32 {
        let grid = self.grid as u64;
        let snapped = (tick as u64 + grid / 2) / grid * grid;
        snapped.min(u32::MAX as u64) as u32
    }

    /// Snap with adjustable strength: 1.0 is the full snap, 0.0 leaves the
    /// input unchanged, intermediate values interpolate linearly and round
    /// to the nearest tick.
    pub fn quantize(&self, tick: u32, strength: f64) -> u32 {
        let strength = strength.clamp(0.0, 1.0);
        if strength <= 0.0 {
            return tick;
        }
        let snapped = self.snap_to_grid(tick);
        if strength >= 1.0 {
            return snapped;
        }
        let delta = snapped as i64 - tick as i64;
        let moved = tick as i64 + (delta as f64 * strength).round() as i64;
        moved.clamp(0, u32::MAX as i64) as u32
    }

    /// Quantize every onset in a note group, leaving durations untouched
    pub fn quantize_notes(&self, notes: &[TimedNote], strength: f64) -> Vec<TimedNote> {
        notes
            .iter()
            .map(|note| {
                let mut quantized = *note;
                quantized.start_tick = self.quantize(note.start_tick, strength);
                quantized
            })
            .collect()
    }
}

/// Strict tolerance of the output-facing duration quantizer, as a
/// percentage of the candidate's base duration
pub const OUTPUT_TOLERANCE_PERCENT: f64 = 2.0;

/// Fraction of a quarter note under which a duration is measurement noise
const NOISE_FLOOR_RATIO: f64 = 0.05;

/// Output-facing duration snapping, applied when durations are handed to
/// the serialization layer
///
/// Durations under 5% of a quarter note are floored to zero (the caller
/// emits no note) rather than ever being quantized up to a spuriously short
/// value. Durations within 2% of a standard (possibly dotted) value snap to
/// it; everything else passes through unchanged.
#[derive(Clone, Copy, Debug)]
pub struct DurationQuantizer {
    ppq: u32,
    tolerance_percent: f64,
}

impl DurationQuantizer {
    pub fn new(ppq: u32) -> Self {
        DurationQuantizer {
            ppq,
            tolerance_percent: OUTPUT_TOLERANCE_PERCENT,
        }
    }

    /// Tick count below which a duration is floored to zero
    pub fn noise_floor(&self) -> u32 {
        (self.ppq as f64 * NOISE_FLOOR_RATIO) as u32
    }

    pub fn quantize(&self, duration: u32) -> u32 {
        if duration < self.noise_floor() {
            if duration > 0 {
                log::trace!("flooring {}-tick duration to zero (noise)", duration);
            }
            return 0;
        }

        for note_type in NoteType::ALL {
            let base = note_type.ticks(self.ppq);
            if base == 0 {
                continue;
            }
            let tolerance = base as f64 * self.tolerance_percent / 100.0;
            for dots in 0..=MAX_DOTS {
                let total = NoteTypeResult::new(note_type, dots).total_duration(self.ppq);
                if (duration as f64 - total as f64).abs() <= tolerance {
                    return total;
                }
            }
        }

        duration
    }
}
