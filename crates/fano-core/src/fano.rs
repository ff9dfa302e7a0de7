//! The static Fano point table: eight named anchors with a fixed hue each.

use serde::Serialize;

/// Number of Fano points.
pub const POINT_COUNT: usize = 8;

const NAMES: [&str; POINT_COUNT] = [
    "Metatron",
    "Solomon",
    "Solon",
    "Asabiyyah",
    "Enoch",
    "Speaker",
    "Genesis",
    "Observer",
];

const HUES: [u16; POINT_COUNT] = [0, 30, 60, 120, 240, 150, 44, 0];

/// One row of the table. `point` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FanoPoint {
    pub point: u8,
    pub name: &'static str,
    pub hue: u16,
}

impl FanoPoint {
    /// Hue as a fraction of the colour wheel.
    pub fn ratio(&self) -> f32 {
        f32::from(self.hue) / 360.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FanoError {
    #[error("fano point {0} out of range 1..=8")]
    OutOfRange(u8),
}

/// Look up a 1-based point.
pub fn lookup(point: u8) -> Result<FanoPoint, FanoError> {
    if !(1..=POINT_COUNT as u8).contains(&point) {
        return Err(FanoError::OutOfRange(point));
    }
    let i = usize::from(point - 1);
    Ok(FanoPoint {
        point,
        name: NAMES[i],
        hue: HUES[i],
    })
}

/// Look up a 0-based table index, as used by the control surface.
pub fn by_index(index: usize) -> Option<FanoPoint> {
    if index >= POINT_COUNT {
        return None;
    }
    lookup(index as u8 + 1).ok()
}

/// `hue / 360` for a 1-based point.
pub fn ratio(point: u8) -> Result<f32, FanoError> {
    lookup(point).map(|p| p.ratio())
}

/// Every entry in table order.
pub fn all() -> impl Iterator<Item = FanoPoint> {
    (0..POINT_COUNT).filter_map(by_index)
}
