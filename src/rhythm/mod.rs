//! Duration and onset quantization

pub mod note_type;
pub mod quantize;

pub use note_type::{NoteTypeConverter, DEFAULT_TOLERANCE_PERCENT, MAX_DOTS};
pub use quantize::{DurationQuantizer, GridResolution, OnsetGridQuantizer};
