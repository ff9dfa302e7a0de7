//! Quadrant matrices, the seed transform and the state exchanged with
//! embedded peers.
//!
//! The seed layout is load-bearing. Chunk loading and packet building both go
//! through [`derive_seed`]; nothing else computes a seed.
//!
//! ```text
//!  bit 23                 10 9                0
//!  ┌──────────────────────┬──────────────────┐
//!  │ m6 m5 m4 m3 m2 m1 m0 │ angle/360 * 1024 │
//!  └──────────────────────┴──────────────────┘
//! ```

use serde::{Deserialize, Serialize};

/// Seven quadrant values, each in 0..=3.
pub type Matrix = [u8; 7];

/// Number of elements in a quadrant matrix.
pub const MATRIX_LEN: usize = 7;

/// Angle quantization used inside the seed (10 bits per full turn).
pub const ANGLE_STEPS: u32 = 1024;

const ANGLE_MASK: u32 = 0x3FF;
const ANGLE_BITS: u32 = 10;

// ── Quadrant ──────────────────────────────────────────────────────────────────

/// One of the four symbolic categories of a matrix element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Quadrant {
    KK = 0,
    KU = 1,
    UK = 2,
    UU = 3,
}

impl Quadrant {
    pub fn name(self) -> &'static str {
        match self {
            Quadrant::KK => "KK",
            Quadrant::KU => "KU",
            Quadrant::UK => "UK",
            Quadrant::UU => "UU",
        }
    }
}

impl TryFrom<u8> for Quadrant {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Quadrant::KK),
            1 => Ok(Quadrant::KU),
            2 => Ok(Quadrant::UK),
            3 => Ok(Quadrant::UU),
            other => Err(other),
        }
    }
}

impl From<Quadrant> for u8 {
    fn from(q: Quadrant) -> u8 {
        q as u8
    }
}

// ── Seed transform ────────────────────────────────────────────────────────────

/// Normalize an angle into [0, 360).
pub fn normalize_angle(angle: f32) -> f32 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if a >= 360.0 { 0.0 } else { a }
}

/// Quantize an angle into the 10-bit seed field.
pub fn angle_bits(angle: f32) -> u32 {
    ((angle / 360.0 * ANGLE_STEPS as f32).round() as u32) & ANGLE_MASK
}

/// Pack a matrix and angle into a 24-bit seed.
pub fn derive_seed(matrix: &Matrix, angle: f32) -> u32 {
    let quadrant_bits = matrix
        .iter()
        .enumerate()
        .fold(0u32, |bits, (i, &m)| bits | (u32::from(m & 0x3) << (i * 2)));
    (quadrant_bits << ANGLE_BITS) | angle_bits(angle)
}

/// Inverse of [`derive_seed`]. The angle is recovered to within 360/1024 degrees.
pub fn decode_seed(seed: u32) -> (Matrix, f32) {
    let mut matrix = [0u8; MATRIX_LEN];
    for (i, m) in matrix.iter_mut().enumerate() {
        *m = ((seed >> (ANGLE_BITS as usize + i * 2)) & 0x3) as u8;
    }
    let angle = (seed & ANGLE_MASK) as f32 * 360.0 / ANGLE_STEPS as f32;
    (matrix, angle)
}

/// Fano point implied by a matrix: the dominant quadrant plus one.
/// Ties go to the lowest quadrant.
pub fn dominant_point(matrix: &Matrix) -> u8 {
    let mut counts = [0u8; 4];
    for &m in matrix {
        counts[(m & 0x3) as usize] += 1;
    }
    let mut best = 0;
    for q in 1..counts.len() {
        if counts[q] > counts[best] {
            best = q;
        }
    }
    best as u8 + 1
}

// ── FanoState ─────────────────────────────────────────────────────────────────

/// State exchanged with embedded peers over the wire packet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FanoState {
    pub matrix: Matrix,
    pub angle: f32,
    pub seed: u32,
    /// Fano point, 1..=8.
    pub fano_point: u8,
}

impl FanoState {
    /// All-KK state at 0°, point 1.
    pub fn empty() -> Self {
        Self {
            matrix: [0; MATRIX_LEN],
            angle: 0.0,
            seed: 0,
            fano_point: 1,
        }
    }

    pub fn from_matrix_angle(matrix: Matrix, angle: f32) -> Self {
        let angle = normalize_angle(angle);
        Self {
            matrix,
            angle,
            seed: derive_seed(&matrix, angle),
            fano_point: dominant_point(&matrix),
        }
    }

    pub fn from_seed(seed: u32) -> Self {
        let (matrix, angle) = decode_seed(seed);
        Self {
            matrix,
            angle,
            seed,
            fano_point: dominant_point(&matrix),
        }
    }
}
