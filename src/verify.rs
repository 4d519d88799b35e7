//! Post-run self-check of a layout against the sheet and the requested pieces.
//!
//! Any failure here is a defect in the packer, never a property of the input:
//! the controller discards the layout and reports the run as failed.

use std::collections::{BTreeMap, HashMap};

use crate::engine::Unplaceable;
use crate::error::Violation;
use crate::inventory::PieceInventory;
use crate::sheet::SheetModel;
use crate::types::PlacedPiece;

pub fn check(
    sheet: &SheetModel,
    inventory: &PieceInventory,
    placed: &[PlacedPiece],
    unplaceable: &[Unplaceable],
) -> Result<(), Violation> {
    let index: HashMap<&str, usize> = inventory
        .pieces()
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), i))
        .collect();
    let lookup = |id: &str| {
        index
            .get(id)
            .copied()
            .ok_or_else(|| Violation::UnknownPiece(id.to_string()))
    };

    let mut placed_counts = vec![0u32; inventory.pieces().len()];
    for p in placed {
        let idx = lookup(p.piece_id.as_str())?;
        let piece = &inventory.pieces()[idx];
        placed_counts[idx] += 1;

        if p.rect() != piece.rect().oriented(p.rotated) {
            return Err(Violation::ShapeMismatch {
                piece_id: p.piece_id.clone(),
                width: p.width,
                height: p.height,
            });
        }
        if !sheet.orientation_allowed(piece, p.rotated) {
            return Err(Violation::GrainViolated {
                piece_id: p.piece_id.clone(),
            });
        }
        let stock = sheet.stock();
        if p.x as u64 + p.width as u64 > stock.w as u64
            || p.y as u64 + p.height as u64 > stock.h as u64
        {
            return Err(Violation::OutOfBounds {
                sheet_index: p.sheet_index,
                piece_id: p.piece_id.clone(),
                x: p.x,
                y: p.y,
            });
        }
    }

    let mut accounted = placed_counts.clone();
    for u in unplaceable {
        accounted[lookup(u.piece_id.as_str())?] += 1;
    }
    for (idx, piece) in inventory.pieces().iter().enumerate() {
        if placed_counts[idx] > piece.quantity {
            return Err(Violation::QuantityExceeded {
                piece_id: piece.id.clone(),
                placed: placed_counts[idx],
                quantity: piece.quantity,
            });
        }
        if accounted[idx] != piece.quantity {
            return Err(Violation::UnitsLost {
                piece_id: piece.id.clone(),
                accounted: accounted[idx],
                quantity: piece.quantity,
            });
        }
    }

    check_spacing(sheet.kerf(), placed)
}

/// Pieces sharing a sheet must be at least `kerf` apart along x or along y.
fn check_spacing(kerf: u32, placed: &[PlacedPiece]) -> Result<(), Violation> {
    let kerf = kerf as u64;
    let mut sheets: BTreeMap<usize, Vec<&PlacedPiece>> = BTreeMap::new();
    for p in placed {
        sheets.entry(p.sheet_index).or_default().push(p);
    }

    for (sheet_index, mut items) in sheets {
        items.sort_by_key(|p| (p.x, p.y));
        for (i, a) in items.iter().enumerate() {
            let a_reach_x = a.x as u64 + a.width as u64 + kerf;
            for b in &items[i + 1..] {
                // Sorted by x: nothing further right can come within reach.
                if b.x as u64 >= a_reach_x {
                    break;
                }
                let close_y = (a.y as u64) < b.y as u64 + b.height as u64 + kerf
                    && (b.y as u64) < a.y as u64 + a.height as u64 + kerf;
                if close_y {
                    return Err(Violation::Overlap {
                        sheet_index,
                        a: format!("{}#{}", a.piece_id, a.instance),
                        b: format!("{}#{}", b.piece_id, b.instance),
                    });
                }
            }
        }
    }
    Ok(())
}
