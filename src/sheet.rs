use crate::error::ValidationError;
use crate::inventory::MAX_UNITS;
use crate::types::{GrainDirection, Piece, PieceGrain, Rect, Sheet};

const UNROTATED: &[bool] = &[false];
const ROTATED: &[bool] = &[true];
const EITHER: &[bool] = &[false, true];

/// Largest kerf-inflated sheet area accepted. A run opens at most one sheet per
/// unit, so area totals over a whole run stay within `u64`.
pub const MAX_SHEET_AREA: u64 = u64::MAX / MAX_UNITS;

/// Validated stock sheet plus the grain policy that decides piece orientations.
#[derive(Debug, Clone)]
pub struct SheetModel {
    sheet: Sheet,
}

impl SheetModel {
    pub fn new(sheet: Sheet) -> Result<Self, ValidationError> {
        let inflated = sheet
            .width
            .checked_add(sheet.cut_width)
            .zip(sheet.height.checked_add(sheet.cut_width));
        let usable = sheet.width > 0
            && sheet.height > 0
            && inflated.is_some_and(|(w, h)| w as u64 * h as u64 <= MAX_SHEET_AREA);
        if !usable {
            return Err(ValidationError::InvalidSheet {
                width: sheet.width,
                height: sheet.height,
                cut_width: sheet.cut_width,
            });
        }
        Ok(Self { sheet })
    }

    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    pub fn stock(&self) -> Rect {
        self.sheet.rect()
    }

    pub fn kerf(&self) -> u32 {
        self.sheet.cut_width
    }

    /// Rotated flags the piece may be placed with. Sheet grain overrides the
    /// piece's own `can_rotate` preference in both directions: a grained piece
    /// lying across the sheet grain is always rotated, even with
    /// `can_rotate = false`.
    pub fn allowed_orientations(&self, piece: &Piece) -> &'static [bool] {
        let free = if piece.can_rotate { EITHER } else { UNROTATED };
        let Some(sheet_grain) = self.sheet.grain_direction else {
            return free;
        };
        match (piece.grain, sheet_grain) {
            (PieceGrain::Ignore, _) => free,
            (PieceGrain::Auto, _) => UNROTATED,
            (PieceGrain::Width, GrainDirection::Width)
            | (PieceGrain::Height, GrainDirection::Height) => UNROTATED,
            (PieceGrain::Width, GrainDirection::Height)
            | (PieceGrain::Height, GrainDirection::Width) => ROTATED,
        }
    }

    pub fn effective_rotation_allowed(&self, piece: &Piece) -> bool {
        self.allowed_orientations(piece).contains(&true)
    }

    pub fn orientation_allowed(&self, piece: &Piece, rotated: bool) -> bool {
        // A square piece laid either way covers the same cells, but grain still counts.
        self.allowed_orientations(piece).contains(&rotated)
    }
}
