use serde::{Deserialize, Serialize};

use crate::types::{PlacedPiece, Sheet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetStats {
    pub sheet_index: usize,
    pub used_area: u64,
    /// Sheet area not covered by pieces, kerf included.
    pub waste_area: u64,
    /// Percentage in `0.0..=100.0`.
    pub efficiency: f64,
    pub sheet_count: usize,
}

/// Highest sheet index used plus one, or 0 for an empty layout.
pub fn sheet_count(placed: &[PlacedPiece]) -> usize {
    placed
        .iter()
        .map(|p| p.sheet_index + 1)
        .max()
        .unwrap_or(0)
}

pub fn sheet_stats(sheet: &Sheet, placed: &[PlacedPiece], sheet_index: usize) -> SheetStats {
    let used_area = placed
        .iter()
        .filter(|p| p.sheet_index == sheet_index)
        .map(|p| p.area())
        .fold(0u64, u64::saturating_add);
    let area = sheet.area();

    SheetStats {
        sheet_index,
        used_area,
        waste_area: area.saturating_sub(used_area),
        efficiency: percent(used_area, area),
        sheet_count: sheet_count(placed),
    }
}

pub fn all_sheet_stats(sheet: &Sheet, placed: &[PlacedPiece]) -> Vec<SheetStats> {
    (0..sheet_count(placed))
        .map(|i| sheet_stats(sheet, placed, i))
        .collect()
}

/// Placed area over the area of every sheet used, in percent.
pub fn aggregate_efficiency(sheet: &Sheet, placed: &[PlacedPiece]) -> f64 {
    let used = placed
        .iter()
        .map(|p| p.area())
        .fold(0u64, u64::saturating_add);
    percent(used, sheet.area().saturating_mul(sheet_count(placed) as u64))
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (used as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}
