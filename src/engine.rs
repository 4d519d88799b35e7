use serde::{Deserialize, Serialize};

use crate::guillotine::{GuillotineBin, ScoredPlacement};
use crate::heuristic::PlacementPolicy;
use crate::inventory::PieceInventory;
use crate::sheet::SheetModel;
use crate::types::PlacedPiece;

/// Why a pass stopped before every unit was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interrupt {
    TimeLimit,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnplaceableReason {
    /// Larger than an empty sheet in every allowed orientation.
    ExceedsSheet,
    /// Never attempted: the time budget ran out first.
    TimeLimit,
    /// Never attempted: the run was cancelled first.
    Cancelled,
}

impl From<Interrupt> for UnplaceableReason {
    fn from(interrupt: Interrupt) -> Self {
        match interrupt {
            Interrupt::TimeLimit => UnplaceableReason::TimeLimit,
            Interrupt::Cancelled => UnplaceableReason::Cancelled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unplaceable {
    pub piece_id: String,
    pub instance: u32,
    pub reason: UnplaceableReason,
}

/// Result of a single packing pass.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub placed: Vec<PlacedPiece>,
    pub unplaceable: Vec<Unplaceable>,
    pub sheets_used: usize,
    pub used_area: u64,
    /// Set when the pass was cut short; the remaining units carry the reason.
    pub interrupted: Option<Interrupt>,
}

impl PassOutcome {
    pub fn is_complete(&self) -> bool {
        self.interrupted.is_none()
    }

    /// Placed area over the area of all sheets opened, in percent.
    pub fn efficiency(&self, sheet_area: u64) -> f64 {
        let total = sheet_area.saturating_mul(self.sheets_used as u64);
        if total == 0 {
            return 0.0;
        }
        (self.used_area as f64 / total as f64 * 100.0).min(100.0)
    }
}

/// Greedy guillotine packer: one deterministic pass per policy.
pub struct PackingEngine<'a> {
    sheet: &'a SheetModel,
    inventory: &'a PieceInventory,
}

impl<'a> PackingEngine<'a> {
    pub fn new(sheet: &'a SheetModel, inventory: &'a PieceInventory) -> Self {
        Self { sheet, inventory }
    }

    pub fn pack<P: PlacementPolicy + ?Sized>(&self, policy: &P) -> PassOutcome {
        self.pack_until(policy, || None)
    }

    /// Runs one pass, asking `interrupt` before each unit whether to stop.
    pub fn pack_until<P, F>(&self, policy: &P, mut interrupt: F) -> PassOutcome
    where
        P: PlacementPolicy + ?Sized,
        F: FnMut() -> Option<Interrupt>,
    {
        let mut units = self.inventory.units().to_vec();
        policy.order(&mut units);

        let stock = self.sheet.stock();
        let kerf = self.sheet.kerf();
        let mut bins: Vec<GuillotineBin> = Vec::new();
        let mut placed = Vec::with_capacity(units.len());
        let mut unplaceable = Vec::new();
        let mut interrupted = None;

        for (pos, unit) in units.iter().enumerate() {
            if let Some(reason) = interrupt() {
                unplaceable.extend(units[pos..].iter().map(|u| Unplaceable {
                    piece_id: self.inventory.piece(u).id.clone(),
                    instance: u.instance,
                    reason: reason.into(),
                }));
                interrupted = Some(reason);
                break;
            }

            let piece = self.inventory.piece(unit);
            let orientations = self.sheet.allowed_orientations(piece);

            // Global best across every open sheet; earlier sheets win ties.
            let mut best: Option<(usize, ScoredPlacement)> = None;
            for (bi, bin) in bins.iter().enumerate() {
                if let Some(scored) = bin.find_best(unit.rect, orientations, policy)
                    && best.is_none_or(|(_, b)| scored.score < b.score)
                {
                    best = Some((bi, scored));
                }
            }

            let (bi, scored) = match best {
                Some(found) => found,
                None => {
                    let bin = GuillotineBin::new(stock, kerf);
                    match bin.find_best(unit.rect, orientations, policy) {
                        Some(scored) => {
                            bins.push(bin);
                            (bins.len() - 1, scored)
                        }
                        None => {
                            tracing::trace!(
                                piece = %piece.id,
                                size = %unit.rect,
                                stock = %stock,
                                "piece does not fit an empty sheet"
                            );
                            unplaceable.push(Unplaceable {
                                piece_id: piece.id.clone(),
                                instance: unit.instance,
                                reason: UnplaceableReason::ExceedsSheet,
                            });
                            continue;
                        }
                    }
                }
            };

            let p = bins[bi].place(scored, unit.rect, policy);
            placed.push(PlacedPiece {
                piece_id: piece.id.clone(),
                instance: unit.instance,
                width: p.rect.w,
                height: p.rect.h,
                x: p.x,
                y: p.y,
                rotated: p.rotated,
                sheet_index: bi,
            });
        }

        let used_area = bins.iter().map(|b| b.used_area()).sum();
        PassOutcome {
            placed,
            unplaceable,
            sheets_used: bins.len(),
            used_area,
            interrupted,
        }
    }
}
