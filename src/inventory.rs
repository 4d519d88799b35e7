use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{Piece, Rect};

/// Upper bound on expanded units per run.
pub const MAX_UNITS: u64 = 100_000;

/// One physical instance of a requested piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit {
    /// Index of the source piece in [`PieceInventory::pieces`].
    pub piece: usize,
    /// Ordinal within the source piece's quantity.
    pub instance: u32,
    pub rect: Rect,
}

/// Validated copy of the caller's piece list, expanded into placeable units.
#[derive(Debug, Clone)]
pub struct PieceInventory {
    pieces: Vec<Piece>,
    units: Vec<Unit>,
}

impl PieceInventory {
    pub fn new(pieces: &[Piece]) -> Result<Self, ValidationError> {
        let mut seen = HashSet::new();
        let mut total: u64 = 0;
        for piece in pieces {
            if piece.width == 0 || piece.height == 0 {
                return Err(ValidationError::InvalidDimension {
                    piece_id: piece.id.clone(),
                    width: piece.width,
                    height: piece.height,
                });
            }
            if piece.quantity == 0 {
                return Err(ValidationError::InvalidQuantity {
                    piece_id: piece.id.clone(),
                    quantity: piece.quantity,
                });
            }
            if !seen.insert(piece.id.as_str()) {
                return Err(ValidationError::DuplicateId(piece.id.clone()));
            }
            total += piece.quantity as u64;
        }
        if total > MAX_UNITS {
            return Err(ValidationError::TooManyUnits {
                total,
                limit: MAX_UNITS,
            });
        }

        let mut units = Vec::with_capacity(total as usize);
        for (idx, piece) in pieces.iter().enumerate() {
            for instance in 0..piece.quantity {
                units.push(Unit {
                    piece: idx,
                    instance,
                    rect: piece.rect(),
                });
            }
        }

        Ok(Self {
            pieces: pieces.to_vec(),
            units,
        })
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn piece(&self, unit: &Unit) -> &Piece {
        &self.pieces[unit.piece]
    }

    /// Units in input order; heuristics reorder their own copy.
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Saturates: piece sizes are not bounded by the sheet.
    pub fn total_area(&self) -> u64 {
        self.units
            .iter()
            .map(|u| u.rect.area())
            .fold(0u64, u64::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationErrorKind;

    #[test]
    fn test_expands_quantity() {
        let inv = PieceInventory::new(&[Piece::new("a", 400, 500, 2), Piece::new("b", 10, 20, 1)])
            .unwrap();
        assert_eq!(inv.unit_count(), 3);
        let instances: Vec<(usize, u32)> =
            inv.units().iter().map(|u| (u.piece, u.instance)).collect();
        assert_eq!(instances, vec![(0, 0), (0, 1), (1, 0)]);
        assert_eq!(inv.total_area(), 2 * 400 * 500 + 10 * 20);
    }

    #[test]
    fn test_zero_dimension_names_piece() {
        let err = PieceInventory::new(&[Piece::new("ok", 1, 1, 1), Piece::new("shelf", 0, 300, 1)])
            .unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::InvalidDimension);
        assert_eq!(err.piece_id(), Some("shelf"));
    }

    #[test]
    fn test_zero_quantity() {
        let err = PieceInventory::new(&[Piece::new("door", 300, 700, 0)]).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::InvalidQuantity);
        assert_eq!(err.piece_id(), Some("door"));
    }

    #[test]
    fn test_duplicate_id() {
        let err = PieceInventory::new(&[Piece::new("a", 1, 1, 1), Piece::new("a", 2, 2, 1)])
            .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateId("a".into()));
    }

    #[test]
    fn test_too_many_units() {
        let err = PieceInventory::new(&[Piece::new("a", 1, 1, u32::MAX)]).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::TooManyUnits);
    }

    #[test]
    fn test_total_area_saturates() {
        let inv = PieceInventory::new(&[Piece::new("slab", u32::MAX, u32::MAX, 2)]).unwrap();
        assert_eq!(inv.total_area(), u64::MAX);
    }

    #[test]
    fn test_empty_list_is_valid() {
        let inv = PieceInventory::new(&[]).unwrap();
        assert!(inv.is_empty());
    }
}
