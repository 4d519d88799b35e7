//! Pluggable placement heuristics.
//!
//! A pass is driven by a [`PlacementPolicy`]: it orders the units, scores every
//! candidate free rectangle, and picks the guillotine split axis after a
//! placement. [`Heuristic`] is the built-in policy, a combination of a
//! [`SortOrder`], a [`ScoreStrategy`] and a [`SplitRule`]. The controller walks
//! [`Heuristic::schedule`] and keeps the best pass.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::inventory::Unit;
use crate::types::Rect;

/// Candidate score, compared lexicographically. Lower is better.
pub type Score = (u64, u64);

/// How the L-shaped leftover of a free rectangle is cut after a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitAxis {
    /// Cut along the full width below the piece: the bottom rectangle spans the
    /// whole free width, the right one is as tall as the piece.
    Horizontal,
    /// Cut along the full height beside the piece: the right rectangle spans the
    /// whole free height, the bottom one is as wide as the piece.
    Vertical,
}

pub trait PlacementPolicy {
    fn name(&self) -> String;

    /// Reorders units in place before a pass. Must be deterministic.
    fn order(&self, units: &mut [Unit]);

    /// Scores placing `reserved` (the piece plus trailing kerf) into `free`.
    /// Only called when `reserved` fits.
    fn score(&self, reserved: Rect, free: Rect) -> Score;

    fn split(&self, free: Rect, reserved: Rect) -> SplitAxis;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Area descending, ties by longest side descending.
    #[default]
    AreaDesc,
    LongestSideDesc,
    PerimeterDesc,
    HeightDesc,
    WidthDesc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[allow(clippy::enum_variant_names)]
pub enum ScoreStrategy {
    #[default]
    BestAreaFit,
    BestShortSideFit,
    BestLongSideFit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitRule {
    /// Keep the larger contiguous leftover rectangle.
    #[default]
    MaxArea,
    ShorterLeftoverAxis,
    LongerLeftoverAxis,
}

impl SortOrder {
    pub const ALL: [SortOrder; 5] = [
        SortOrder::AreaDesc,
        SortOrder::LongestSideDesc,
        SortOrder::PerimeterDesc,
        SortOrder::HeightDesc,
        SortOrder::WidthDesc,
    ];

    fn key(&self, r: Rect) -> (u64, u64) {
        let long = r.w.max(r.h) as u64;
        let short = r.w.min(r.h) as u64;
        match self {
            SortOrder::AreaDesc => (r.area(), long),
            SortOrder::LongestSideDesc => (long, short),
            SortOrder::PerimeterDesc => (r.w as u64 + r.h as u64, long),
            SortOrder::HeightDesc => (r.h as u64, r.w as u64),
            SortOrder::WidthDesc => (r.w as u64, r.h as u64),
        }
    }
}

impl ScoreStrategy {
    pub const ALL: [ScoreStrategy; 3] = [
        ScoreStrategy::BestAreaFit,
        ScoreStrategy::BestShortSideFit,
        ScoreStrategy::BestLongSideFit,
    ];

    pub fn score(&self, reserved: Rect, free: Rect) -> Score {
        let leftover_w = (free.w - reserved.w) as u64;
        let leftover_h = (free.h - reserved.h) as u64;
        let short = leftover_w.min(leftover_h);
        let long = leftover_w.max(leftover_h);
        match self {
            ScoreStrategy::BestAreaFit => (free.area() - reserved.area(), short),
            ScoreStrategy::BestShortSideFit => (short, long),
            ScoreStrategy::BestLongSideFit => (long, short),
        }
    }
}

impl SplitRule {
    pub const ALL: [SplitRule; 3] = [
        SplitRule::MaxArea,
        SplitRule::ShorterLeftoverAxis,
        SplitRule::LongerLeftoverAxis,
    ];

    pub fn axis(&self, free: Rect, reserved: Rect) -> SplitAxis {
        let right_w = (free.w - reserved.w) as u64;
        let bottom_h = (free.h - reserved.h) as u64;
        match self {
            SplitRule::MaxArea => {
                let horizontal = (right_w * reserved.h as u64).max(free.w as u64 * bottom_h);
                let vertical = (right_w * free.h as u64).max(reserved.w as u64 * bottom_h);
                if vertical > horizontal {
                    SplitAxis::Vertical
                } else {
                    SplitAxis::Horizontal
                }
            }
            SplitRule::ShorterLeftoverAxis => {
                if right_w < bottom_h {
                    SplitAxis::Horizontal
                } else {
                    SplitAxis::Vertical
                }
            }
            SplitRule::LongerLeftoverAxis => {
                if right_w >= bottom_h {
                    SplitAxis::Horizontal
                } else {
                    SplitAxis::Vertical
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Heuristic {
    pub sort: SortOrder,
    pub score: ScoreStrategy,
    pub split: SplitRule,
}

impl Heuristic {
    pub fn new(sort: SortOrder, score: ScoreStrategy, split: SplitRule) -> Self {
        Self { sort, score, split }
    }

    /// Every combination, the default heuristic first.
    pub fn schedule() -> Vec<Heuristic> {
        let default = Heuristic::default();
        let mut out = vec![default];
        for sort in SortOrder::ALL {
            for score in ScoreStrategy::ALL {
                for split in SplitRule::ALL {
                    let h = Heuristic::new(sort, score, split);
                    if h != default {
                        out.push(h);
                    }
                }
            }
        }
        out
    }
}

impl PlacementPolicy for Heuristic {
    fn name(&self) -> String {
        self.to_string()
    }

    fn order(&self, units: &mut [Unit]) {
        // Stable, so equal keys keep input order.
        units.sort_by(|a, b| self.sort.key(b.rect).cmp(&self.sort.key(a.rect)));
    }

    fn score(&self, reserved: Rect, free: Rect) -> Score {
        self.score.score(reserved, free)
    }

    fn split(&self, free: Rect, reserved: Rect) -> SplitAxis {
        self.split.axis(free, reserved)
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortOrder::AreaDesc => "area-desc",
            SortOrder::LongestSideDesc => "longest-side-desc",
            SortOrder::PerimeterDesc => "perimeter-desc",
            SortOrder::HeightDesc => "height-desc",
            SortOrder::WidthDesc => "width-desc",
        };
        f.write_str(s)
    }
}

impl fmt::Display for ScoreStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScoreStrategy::BestAreaFit => "best-area-fit",
            ScoreStrategy::BestShortSideFit => "best-short-side-fit",
            ScoreStrategy::BestLongSideFit => "best-long-side-fit",
        };
        f.write_str(s)
    }
}

impl fmt::Display for SplitRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SplitRule::MaxArea => "max-area",
            SplitRule::ShorterLeftoverAxis => "shorter-leftover-axis",
            SplitRule::LongerLeftoverAxis => "longer-leftover-axis",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.sort, self.score, self.split)
    }
}
