use slotmap::{SlotMap, new_key_type};

use crate::heuristic::{PlacementPolicy, Score, SplitAxis};
use crate::types::Rect;

new_key_type! {
    /// Handle of a free rectangle inside one [`GuillotineBin`].
    pub struct FreeKey;
}

/// Unallocated region of a sheet. Every free rectangle carries `kerf` of slack past
/// its far edges, so a piece fits when `piece + kerf` fits the rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeRect {
    pub x: u32,
    pub y: u32,
    pub rect: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub rect: Rect,
    pub x: u32,
    pub y: u32,
    pub rotated: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ScoredPlacement {
    pub key: FreeKey,
    pub rotated: bool,
    pub score: Score,
}

#[derive(Debug, Clone)]
pub struct GuillotineBin {
    kerf: u32,
    free_rects: SlotMap<FreeKey, FreeRect>,
    used_area: u64,
}

impl GuillotineBin {
    pub fn new(stock: Rect, kerf: u32) -> Self {
        let mut free_rects = SlotMap::with_key();
        free_rects.insert(FreeRect {
            x: 0,
            y: 0,
            rect: stock.inflated(kerf),
        });
        Self {
            kerf,
            free_rects,
            used_area: 0,
        }
    }

    pub fn used_area(&self) -> u64 {
        self.used_area
    }

    pub fn free_rects(&self) -> impl Iterator<Item = &FreeRect> {
        self.free_rects.values()
    }

    pub fn free_count(&self) -> usize {
        self.free_rects.len()
    }

    /// Best free rectangle and orientation for `piece`, trying each rotated flag in
    /// `orientations`. Ties keep the first candidate seen.
    pub fn find_best<P: PlacementPolicy + ?Sized>(
        &self,
        piece: Rect,
        orientations: &[bool],
        policy: &P,
    ) -> Option<ScoredPlacement> {
        let mut best: Option<ScoredPlacement> = None;

        for (key, free) in self.free_rects.iter() {
            for &rotated in orientations {
                // Same footprint as the unrotated try.
                if rotated && piece.is_square() && orientations.contains(&false) {
                    continue;
                }
                let reserved = piece.oriented(rotated).inflated(self.kerf);
                if !reserved.fits_in(&free.rect) {
                    continue;
                }
                let score = policy.score(reserved, free.rect);
                if best.is_none_or(|b| score < b.score) {
                    best = Some(ScoredPlacement {
                        key,
                        rotated,
                        score,
                    });
                }
            }
        }

        best
    }

    pub fn place<P: PlacementPolicy + ?Sized>(
        &mut self,
        scored: ScoredPlacement,
        piece: Rect,
        policy: &P,
    ) -> Placement {
        let free = self.free_rects[scored.key];
        let placed = piece.oriented(scored.rotated);

        self.free_rects.remove(scored.key);
        let reserved = placed.inflated(self.kerf);
        let axis = policy.split(free.rect, reserved);
        self.split(free, reserved, axis);
        self.used_area += placed.area();

        Placement {
            rect: placed,
            x: free.x,
            y: free.y,
            rotated: scored.rotated,
        }
    }

    fn split(&mut self, free: FreeRect, reserved: Rect, axis: SplitAxis) {
        let right_w = free.rect.w - reserved.w;
        let bottom_h = free.rect.h - reserved.h;

        let (right, bottom) = match axis {
            SplitAxis::Horizontal => (
                Rect::new(right_w, reserved.h),
                Rect::new(free.rect.w, bottom_h),
            ),
            SplitAxis::Vertical => (
                Rect::new(right_w, free.rect.h),
                Rect::new(reserved.w, bottom_h),
            ),
        };

        self.push_free(FreeRect {
            x: free.x + reserved.w,
            y: free.y,
            rect: right,
        });
        self.push_free(FreeRect {
            x: free.x,
            y: free.y + reserved.h,
            rect: bottom,
        });
    }

    fn push_free(&mut self, free: FreeRect) {
        // Anything no wider than the kerf slack cannot hold a piece.
        if free.rect.w > self.kerf && free.rect.h > self.kerf {
            self.free_rects.insert(free);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristic::{Heuristic, ScoreStrategy, SortOrder, SplitRule};

    const BOTH: &[bool] = &[false, true];
    const FIXED: &[bool] = &[false];

    #[test]
    fn test_place_single_piece() {
        let h = Heuristic::default();
        let mut bin = GuillotineBin::new(Rect::new(100, 100), 0);
        let piece = Rect::new(50, 30);
        let scored = bin.find_best(piece, FIXED, &h).unwrap();
        let p = bin.place(scored, piece, &h);
        assert_eq!(p.x, 0);
        assert_eq!(p.y, 0);
        assert_eq!(p.rect, Rect::new(50, 30));
        assert_eq!(bin.free_count(), 2);
        assert_eq!(bin.used_area(), 1500);
    }

    #[test]
    fn test_piece_too_large() {
        let bin = GuillotineBin::new(Rect::new(100, 100), 0);
        assert!(
            bin.find_best(Rect::new(200, 50), BOTH, &Heuristic::default())
                .is_none()
        );
    }

    #[test]
    fn test_rotation_fit() {
        let h = Heuristic::default();
        let bin = GuillotineBin::new(Rect::new(100, 50), 0);
        let piece = Rect::new(50, 100);
        assert!(bin.find_best(piece, FIXED, &h).is_none());
        let scored = bin.find_best(piece, BOTH, &h).unwrap();
        assert!(scored.rotated);
    }

    #[test]
    fn test_forced_rotation_only() {
        let h = Heuristic::default();
        let bin = GuillotineBin::new(Rect::new(100, 100), 0);
        let scored = bin.find_best(Rect::new(30, 60), &[true], &h).unwrap();
        assert!(scored.rotated);
    }

    #[test]
    fn test_kerf() {
        let h = Heuristic::default();
        let mut bin = GuillotineBin::new(Rect::new(100, 100), 5);
        let piece = Rect::new(50, 100);
        let scored = bin.find_best(piece, FIXED, &h).unwrap();
        bin.place(scored, piece, &h);
        // Usable width left is 100 - 50 - 5 = 45, plus the kerf slack.
        assert!(bin.free_rects().any(|f| f.rect.w == 45 + 5 && f.x == 55));
    }

    #[test]
    fn test_fill_exact() {
        let h = Heuristic::default();
        let mut bin = GuillotineBin::new(Rect::new(100, 100), 0);
        let piece = Rect::new(100, 100);
        let scored = bin.find_best(piece, FIXED, &h).unwrap();
        bin.place(scored, piece, &h);
        assert_eq!(bin.free_count(), 0);
    }

    #[test]
    fn test_full_size_piece_fits_with_kerf() {
        let h = Heuristic::default();
        let mut bin = GuillotineBin::new(Rect::new(100, 100), 3);
        let piece = Rect::new(100, 100);
        let scored = bin.find_best(piece, FIXED, &h).unwrap();
        let p = bin.place(scored, piece, &h);
        assert_eq!((p.x, p.y), (0, 0));
        assert_eq!(bin.free_count(), 0);
    }

    #[test]
    fn test_degenerate_leftovers_dropped() {
        let h = Heuristic::default();
        let mut bin = GuillotineBin::new(Rect::new(100, 100), 4);
        // Leaves 3 mm beside the piece, less than one kerf.
        let piece = Rect::new(97, 40);
        let scored = bin.find_best(piece, FIXED, &h).unwrap();
        bin.place(scored, piece, &h);
        assert!(bin.free_rects().all(|f| f.rect.w > 4 && f.rect.h > 4));
        assert_eq!(bin.free_count(), 1);
    }

    #[test]
    fn test_split_rule_changes_leftovers() {
        let stock = Rect::new(100, 100);
        let piece = Rect::new(20, 90);
        let horizontal = Heuristic::new(
            SortOrder::AreaDesc,
            ScoreStrategy::BestAreaFit,
            SplitRule::LongerLeftoverAxis,
        );
        let vertical = Heuristic::default();

        let mut a = GuillotineBin::new(stock, 0);
        let s = a.find_best(piece, FIXED, &horizontal).unwrap();
        a.place(s, piece, &horizontal);
        assert!(a.free_rects().any(|f| f.rect == Rect::new(100, 10)));

        let mut b = GuillotineBin::new(stock, 0);
        let s = b.find_best(piece, FIXED, &vertical).unwrap();
        b.place(s, piece, &vertical);
        assert!(b.free_rects().any(|f| f.rect == Rect::new(80, 100)));
    }

    #[test]
    fn test_best_area_fit_prefers_tight_rect() {
        let h = Heuristic::default();
        let mut bin = GuillotineBin::new(Rect::new(100, 100), 0);
        let first = Rect::new(60, 100);
        let s = bin.find_best(first, FIXED, &h).unwrap();
        bin.place(s, first, &h);
        // Only a 40x100 strip is left; a 40x40 piece lands at its top.
        let small = Rect::new(40, 40);
        let s = bin.find_best(small, FIXED, &h).unwrap();
        let p = bin.place(s, small, &h);
        assert_eq!((p.x, p.y), (60, 0));
    }
}
