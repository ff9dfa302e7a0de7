//! Fano wire format: the fixed-size packet exchanged with embedded peers.
//!
//! The struct IS the protocol. Every field, every size, every reserved byte
//! is part of the wire format; embedded firmware reads the same layout.
//! Multi-byte integers are little-endian on the wire.
//!
//! The type is #[repr(C, packed)] and uses zerocopy derives for
//! allocation-free serialization. There is no unsafe code in this module.

use static_assertions::assert_eq_size;
use zerocopy::byteorder::{LittleEndian, U16, U32};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::state::{angle_bits, derive_seed, normalize_angle, FanoState, Matrix, ANGLE_STEPS};

// ── Packet ────────────────────────────────────────────────────────────────────

/// One Fano state, addressed from `source_id` to `dest_id`.
///
/// Wire size: 27 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct FanoPacket {
    /// Always `b"FANO"`.
    pub magic: [u8; 4],

    /// Wire format version. Currently 0x01.
    pub version: u8,

    /// Sending device.
    pub source_id: U16<LittleEndian>,

    /// Receiving device. 0 addresses every listener.
    pub dest_id: U16<LittleEndian>,

    /// Fano point, 1..=8.
    pub fano_point: u8,

    /// Quadrant matrix, one element per byte, each 0..=3.
    pub matrix: Matrix,

    /// Angle in tenths of a degree.
    pub angle: U16<LittleEndian>,

    /// 24-bit seed derived from matrix and angle.
    pub seed: U32<LittleEndian>,

    /// Wrapping 16-bit sum of every byte before this field.
    pub checksum: U16<LittleEndian>,

    /// Reserved, must be zero.
    pub reserved: [u8; 2],
}

// Compile-time size guard. If this fails, the wire format has silently changed.
assert_eq_size!(FanoPacket, [u8; 27]);

// ── Constants ─────────────────────────────────────────────────────────────────

pub const PACKET_MAGIC: [u8; 4] = *b"FANO";

/// Current packet format version.
pub const PACKET_VERSION: u8 = 0x01;

/// Encoded packet size in bytes.
pub const PACKET_LEN: usize = 27;

/// Byte offset of the checksum field; the checksum covers `..CHECKSUM_OFFSET`.
pub const CHECKSUM_OFFSET: usize = 23;

/// Angle field resolution: one full turn in tenths of a degree.
pub const ANGLE_TENTHS: u16 = 3600;

/// Destination id that addresses every listener.
pub const BROADCAST_DEST: u16 = 0;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Reasons a packet is rejected. Any one of them makes the whole packet invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    #[error("packet length {0} != {}", PACKET_LEN)]
    WrongLength(usize),

    #[error("bad magic bytes")]
    BadMagic,

    #[error("unsupported packet version: 0x{0:02x}")]
    UnsupportedVersion(u8),

    #[error("fano point {0} out of range 1..=8")]
    FanoPointOutOfRange(u8),

    #[error("reserved bytes are non-zero: {0:02x?}")]
    ReservedBytesSet([u8; 2]),

    #[error("checksum mismatch: stored 0x{stored:04x}, computed 0x{computed:04x}")]
    ChecksumMismatch { stored: u16, computed: u16 },

    #[error("matrix element {0} out of range 0..=3")]
    QuadrantOutOfRange(u8),

    #[error("angle {0} tenths out of range 0..{}", ANGLE_TENTHS)]
    AngleOutOfRange(u16),

    #[error("seed 0x{0:06x} does not match matrix and angle")]
    SeedMismatch(u32),
}

// ── Codec ─────────────────────────────────────────────────────────────────────

/// A validated packet, unpacked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedPacket {
    pub source_id: u16,
    pub dest_id: u16,
    pub state: FanoState,
}

/// Wrapping sum of the bytes that precede the checksum field.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes[..CHECKSUM_OFFSET.min(bytes.len())]
        .iter()
        .fold(0u16, |sum, &b| sum.wrapping_add(u16::from(b)))
}

impl FanoPacket {
    /// Build a packet for `state`. The angle is stored at 0.1° resolution.
    pub fn new(state: &FanoState, source_id: u16, dest_id: u16) -> Self {
        // 359.95° and up rounds to a full turn, which is 0.0°
        let angle = (normalize_angle(state.angle) * 10.0).round() as u16 % ANGLE_TENTHS;
        let mut packet = Self {
            magic: PACKET_MAGIC,
            version: PACKET_VERSION,
            source_id: U16::new(source_id),
            dest_id: U16::new(dest_id),
            fano_point: state.fano_point,
            matrix: state.matrix,
            angle: U16::new(angle),
            seed: U32::new(state.seed),
            checksum: U16::new(0),
            reserved: [0; 2],
        };
        packet.checksum = U16::new(checksum(packet.as_bytes()));
        packet
    }

    pub fn to_bytes(&self) -> [u8; PACKET_LEN] {
        let mut out = [0u8; PACKET_LEN];
        out.copy_from_slice(self.as_bytes());
        out
    }
}

/// Encode `state` into its 27-byte wire form.
pub fn encode_packet(state: &FanoState, source_id: u16, dest_id: u16) -> [u8; PACKET_LEN] {
    FanoPacket::new(state, source_id, dest_id).to_bytes()
}

/// Validate and unpack a received packet.
///
/// The seed carried on the wire is checked against the matrix and angle in
/// the same packet, so a tampered matrix with a patched checksum is still
/// rejected.
pub fn decode_packet(bytes: &[u8]) -> Result<DecodedPacket, PacketError> {
    let packet = FanoPacket::read_from(bytes).ok_or(PacketError::WrongLength(bytes.len()))?;

    if packet.magic != PACKET_MAGIC {
        return Err(PacketError::BadMagic);
    }
    if packet.version != PACKET_VERSION {
        return Err(PacketError::UnsupportedVersion(packet.version));
    }
    if !(1..=8).contains(&packet.fano_point) {
        return Err(PacketError::FanoPointOutOfRange(packet.fano_point));
    }
    if packet.reserved != [0; 2] {
        return Err(PacketError::ReservedBytesSet(packet.reserved));
    }

    let stored = { packet.checksum }.get();
    let computed = checksum(bytes);
    if stored != computed {
        return Err(PacketError::ChecksumMismatch { stored, computed });
    }

    let matrix = packet.matrix;
    if let Some(&bad) = matrix.iter().find(|&&m| m > 3) {
        return Err(PacketError::QuadrantOutOfRange(bad));
    }

    let tenths = { packet.angle }.get();
    if tenths >= ANGLE_TENTHS {
        return Err(PacketError::AngleOutOfRange(tenths));
    }
    let angle = f32::from(tenths) / 10.0;
    let seed = { packet.seed }.get();
    verify_seed(&matrix, angle, seed)?;

    Ok(DecodedPacket {
        source_id: { packet.source_id }.get(),
        dest_id: { packet.dest_id }.get(),
        state: FanoState {
            matrix,
            angle,
            seed,
            fano_point: packet.fano_point,
        },
    })
}

/// The quadrant bits must match exactly. The angle bits may differ by one
/// quantization step, since the wire angle is itself rounded to 0.1°.
fn verify_seed(matrix: &Matrix, angle: f32, seed: u32) -> Result<(), PacketError> {
    let expected = derive_seed(matrix, angle);
    if seed >> 10 != expected >> 10 {
        return Err(PacketError::SeedMismatch(seed));
    }
    let carried = seed & 0x3FF;
    let derived = angle_bits(angle);
    let diff = carried.abs_diff(derived);
    if diff.min(ANGLE_STEPS - diff) > 1 {
        return Err(PacketError::SeedMismatch(seed));
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
