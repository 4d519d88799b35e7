//! Guillotine cutting-stock optimizer for rectangular panels.
//!
//! Pieces are packed onto identical stock sheets by a greedy guillotine packer.
//! [`controller`] runs the packer under a time budget with several heuristics
//! and keeps the best layout. Every layout is checked by [`verify`] before it
//! is returned.

pub mod controller;
pub mod engine;
pub mod error;
pub mod guillotine;
pub mod heuristic;
pub mod inventory;
pub mod sheet;
pub mod stats;
pub mod types;
pub mod verify;

pub use controller::{
    OptimizationController, OptimizationResult, OptimizationRun, OptimizeOptions, RunHandle,
    RunMeta, RunOutcome, RunState, RunStatus, SharedPolicy, cancel, run,
};
pub use engine::{Unplaceable, UnplaceableReason};
pub use error::{OptimizeError, ValidationError, ValidationErrorKind, Violation};
pub use heuristic::{Heuristic, PlacementPolicy};
pub use stats::SheetStats;
pub use types::{GrainDirection, Piece, PieceGrain, PlacedPiece, Rect, Sheet};
