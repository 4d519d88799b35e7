use serde::{Deserialize, Deserializer, Serialize, de::Error as _};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub w: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub h: u32,
}

impl Rect {
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    pub fn rotated(&self) -> Self {
        Self {
            w: self.h,
            h: self.w,
        }
    }

    /// The rectangle as laid on the sheet for the given rotated flag.
    pub fn oriented(&self, rotated: bool) -> Self {
        if rotated { self.rotated() } else { *self }
    }

    pub fn is_square(&self) -> bool {
        self.w == self.h
    }

    pub fn fits_in(&self, other: &Rect) -> bool {
        self.w <= other.w && self.h <= other.h
    }

    /// Grows both sides by `by`, e.g. to reserve kerf on the trailing edges.
    pub fn inflated(&self, by: u32) -> Self {
        Self {
            w: self.w.saturating_add(by),
            h: self.h.saturating_add(by),
        }
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// Sheet axis the material fibers run along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrainDirection {
    Width,
    Height,
}

/// Which of the piece's own sides the fibers must follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceGrain {
    /// Drawn already aligned with the sheet grain.
    #[default]
    Auto,
    Width,
    Height,
    /// No fiber requirement (painted or hidden parts).
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub id: String,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub width: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub height: u32,
    #[serde(default = "default_quantity", deserialize_with = "deserialize_u32_from_number")]
    pub quantity: u32,
    #[serde(default = "default_true")]
    pub can_rotate: bool,
    #[serde(default)]
    pub material_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub grain: PieceGrain,
}

impl Piece {
    pub fn new(id: impl Into<String>, width: u32, height: u32, quantity: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            quantity,
            can_rotate: true,
            material_id: None,
            name: String::new(),
            color: None,
            grain: PieceGrain::Auto,
        }
    }

    pub fn with_rotation(mut self, can_rotate: bool) -> Self {
        self.can_rotate = can_rotate;
        self
    }

    pub fn with_grain(mut self, grain: PieceGrain) -> Self {
        self.grain = grain;
        self
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sheet {
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub width: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub height: u32,
    #[serde(default, deserialize_with = "deserialize_u32_from_number")]
    pub cut_width: u32,
    #[serde(default)]
    pub grain_direction: Option<GrainDirection>,
    #[serde(default)]
    pub material_id: Option<String>,
}

impl Sheet {
    pub fn new(width: u32, height: u32, cut_width: u32) -> Self {
        Self {
            width,
            height,
            cut_width,
            grain_direction: None,
            material_id: None,
        }
    }

    pub fn with_grain(mut self, grain: GrainDirection) -> Self {
        self.grain_direction = Some(grain);
        self
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.width, self.height)
    }

    pub fn area(&self) -> u64 {
        self.rect().area()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedPiece {
    pub piece_id: String,
    pub instance: u32,
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
    pub rotated: bool,
    pub sheet_index: usize,
}

impl PlacedPiece {
    pub fn rect(&self) -> Rect {
        Rect::new(self.width, self.height)
    }

    pub fn area(&self) -> u64 {
        self.rect().area()
    }
}

fn default_quantity() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// Accepts any JSON number that is a whole, non-negative value fitting in `u32`,
/// so clients sending `400.0` are not rejected.
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(D::Error::custom(format!(
            "expected a whole non-negative number, got {value}"
        )));
    }
    Ok(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oriented() {
        let r = Rect::new(40, 10);
        assert_eq!(r.oriented(false), r);
        assert_eq!(r.oriented(true), Rect::new(10, 40));
    }

    #[test]
    fn test_inflated_saturates() {
        assert_eq!(Rect::new(10, 20).inflated(4), Rect::new(14, 24));
        assert_eq!(Rect::new(u32::MAX, 1).inflated(4).w, u32::MAX);
    }

    #[test]
    fn test_piece_defaults_from_json() {
        let piece: Piece =
            serde_json::from_str(r#"{"id": "door", "width": 400.0, "height": 500}"#).unwrap();
        assert_eq!(piece.width, 400);
        assert_eq!(piece.quantity, 1);
        assert!(piece.can_rotate);
        assert_eq!(piece.grain, PieceGrain::Auto);
    }

    #[test]
    fn test_rejects_fractional_and_negative() {
        assert!(serde_json::from_str::<Rect>(r#"{"w": 1.5, "h": 2}"#).is_err());
        assert!(serde_json::from_str::<Rect>(r#"{"w": -1, "h": 2}"#).is_err());
    }

    #[test]
    fn test_sheet_grain_lowercase() {
        let sheet: Sheet = serde_json::from_str(
            r#"{"width": 1220, "height": 2440, "cut_width": 4, "grain_direction": "height"}"#,
        )
        .unwrap();
        assert_eq!(sheet.grain_direction, Some(GrainDirection::Height));
    }
}
