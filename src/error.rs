//! Error types for the notation timing engine
//!
//! Every fallible operation returns [`Result`]. Input problems map to the
//! specific variants; `Internal` marks a broken pipeline invariant and is
//! always a bug, never a user error.

use thiserror::Error;

#[derive(Error, Clone, Debug, PartialEq)]
pub enum NotationError {
    #[error("invalid time signature {numerator}/{denominator}: {reason}")]
    InvalidTimeSignature {
        numerator: u8,
        denominator: u32,
        reason: String,
    },

    #[error("cannot split note [{start}, {end}) at boundary {boundary}")]
    InvalidNote { start: u32, end: u32, boundary: u32 },

    #[error("no time signature events provided")]
    NoTimeSignature,

    #[error("tick arithmetic overflow in {0}")]
    TickOverflow(&'static str),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, NotationError>;
