//! Error types for input validation, the post-run self-check, and run failures.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    InvalidDimension,
    InvalidQuantity,
    DuplicateId,
    TooManyUnits,
    InvalidSheet,
}

/// Input rejected before any run starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("piece '{piece_id}' has invalid dimensions {width}x{height}")]
    InvalidDimension {
        piece_id: String,
        width: u32,
        height: u32,
    },

    #[error("piece '{piece_id}' has invalid quantity {quantity}")]
    InvalidQuantity { piece_id: String, quantity: u32 },

    #[error("piece id '{0}' is used more than once")]
    DuplicateId(String),

    #[error("piece list expands to {total} units, limit is {limit}")]
    TooManyUnits { total: u64, limit: u64 },

    #[error("sheet {width}x{height} with cut width {cut_width} is not usable")]
    InvalidSheet {
        width: u32,
        height: u32,
        cut_width: u32,
    },
}

impl ValidationError {
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            Self::InvalidDimension { .. } => ValidationErrorKind::InvalidDimension,
            Self::InvalidQuantity { .. } => ValidationErrorKind::InvalidQuantity,
            Self::DuplicateId(_) => ValidationErrorKind::DuplicateId,
            Self::TooManyUnits { .. } => ValidationErrorKind::TooManyUnits,
            Self::InvalidSheet { .. } => ValidationErrorKind::InvalidSheet,
        }
    }

    /// The offending piece, when the error is about a single piece.
    pub fn piece_id(&self) -> Option<&str> {
        match self {
            Self::InvalidDimension { piece_id, .. } | Self::InvalidQuantity { piece_id, .. } => {
                Some(piece_id)
            }
            Self::DuplicateId(id) => Some(id),
            Self::TooManyUnits { .. } | Self::InvalidSheet { .. } => None,
        }
    }
}

/// A broken layout invariant found by [`crate::verify::check`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("sheet {sheet_index}: '{a}' and '{b}' are closer than the cut width")]
    Overlap {
        sheet_index: usize,
        a: String,
        b: String,
    },

    #[error("sheet {sheet_index}: '{piece_id}' at ({x}, {y}) leaves the sheet")]
    OutOfBounds {
        sheet_index: usize,
        piece_id: String,
        x: u32,
        y: u32,
    },

    #[error("piece '{piece_id}' placed {placed} times, only {quantity} requested")]
    QuantityExceeded {
        piece_id: String,
        placed: u32,
        quantity: u32,
    },

    #[error("piece '{piece_id}': {accounted} of {quantity} units accounted for")]
    UnitsLost {
        piece_id: String,
        accounted: u32,
        quantity: u32,
    },

    #[error("piece '{piece_id}' placed as {width}x{height}, which is not its shape")]
    ShapeMismatch {
        piece_id: String,
        width: u32,
        height: u32,
    },

    #[error("piece '{piece_id}' orientation breaks the sheet grain")]
    GrainViolated { piece_id: String },

    #[error("placement references unknown piece '{0}'")]
    UnknownPiece(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimizeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("layout failed self-check: {0}")]
    InvariantViolation(#[from] Violation),

    #[error("optimization worker panicked")]
    WorkerPanicked,
}
