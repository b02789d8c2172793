//! Bitstream vocabulary: NAL unit and slice types, colour formats, and the
//! packed colour-space tag used by picture descriptors.
//!
//! Only the two-byte NAL unit header is parsed here. Everything past the
//! header belongs to the engine.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Size in bytes of the big-endian length prefix in a length-prefixed
/// NAL unit stream.
pub const NAL_UNIT_LENGTH_BYTES: usize = 4;

/// NAL unit type of an access unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NalUnitType {
    /// Coded slice of a non-IDR picture.
    #[default]
    NonIdr,
    /// Coded slice of an IDR picture.
    Idr,
    /// Sequence parameter set.
    Sps,
    /// Picture parameter set.
    Pps,
    /// Adaptation parameter set.
    Aps,
    /// Filler data.
    FillerData,
    /// Supplemental enhancement information.
    Sei,
    /// Any other value.
    Other(u8),
}

impl NalUnitType {
    /// Map a raw NAL unit type value.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::NonIdr,
            1 => Self::Idr,
            24 => Self::Sps,
            25 => Self::Pps,
            26 => Self::Aps,
            27 => Self::FillerData,
            28 => Self::Sei,
            other => Self::Other(other),
        }
    }

    /// The raw NAL unit type value.
    pub fn as_raw(self) -> u8 {
        match self {
            Self::NonIdr => 0,
            Self::Idr => 1,
            Self::Sps => 24,
            Self::Pps => 25,
            Self::Aps => 26,
            Self::FillerData => 27,
            Self::Sei => 28,
            Self::Other(raw) => raw,
        }
    }

    /// `true` for units carrying coded picture data.
    pub fn is_picture(self) -> bool {
        matches!(self, Self::NonIdr | Self::Idr)
    }
}

impl Display for NalUnitType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::NonIdr => write!(f, "NonIDR"),
            Self::Idr => write!(f, "IDR"),
            Self::Sps => write!(f, "SPS"),
            Self::Pps => write!(f, "PPS"),
            Self::Aps => write!(f, "APS"),
            Self::FillerData => write!(f, "FD"),
            Self::Sei => write!(f, "SEI"),
            Self::Other(raw) => write!(f, "Unknown({raw})"),
        }
    }
}

/// Parsed two-byte NAL unit header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalHeader {
    /// Unit type.
    pub unit_type: NalUnitType,
    /// Temporal layer identifier.
    pub temporal_id: u8,
    /// Whether header extension data follows.
    pub extension: bool,
}

impl NalHeader {
    /// Parse the header at the start of a NAL unit payload.
    ///
    /// Layout: `forbidden_zero_bit(1) nal_unit_type_plus1(6)
    /// nuh_temporal_id(3) nuh_reserved_zero_5bits(5) nuh_extension_flag(1)`.
    /// Returns `None` when fewer than two bytes are present, the forbidden
    /// bit is set, or `nal_unit_type_plus1` is zero.
    pub fn parse(unit: &[u8]) -> Option<Self> {
        let (&first, &second) = (unit.first()?, unit.get(1)?);
        if first & 0x80 != 0 {
            return None;
        }
        let type_plus1 = (first >> 1) & 0x3f;
        if type_plus1 == 0 {
            return None;
        }
        Some(Self {
            unit_type: NalUnitType::from_raw(type_plus1 - 1),
            temporal_id: ((first & 0x01) << 2) | (second >> 6),
            extension: second & 0x01 != 0,
        })
    }
}

/// Slice type of a decoded picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SliceType {
    /// Bi-predicted.
    B,
    /// Predicted.
    P,
    /// Intra.
    I,
    /// Not known.
    #[default]
    Unknown,
}

impl SliceType {
    /// Map a raw slice type value; anything outside `0..=2` is unknown.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::B,
            1 => Self::P,
            2 => Self::I,
            _ => Self::Unknown,
        }
    }

    /// The raw slice type value (`-1` for unknown).
    pub fn as_raw(self) -> i32 {
        match self {
            Self::B => 0,
            Self::P => 1,
            Self::I => 2,
            Self::Unknown => -1,
        }
    }
}

impl Display for SliceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::B => write!(f, "B"),
            Self::P => write!(f, "P"),
            Self::I => write!(f, "I"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Chroma layout of a picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorFormat {
    /// Not known.
    #[default]
    Unknown,
    /// Luma only.
    Ycbcr400,
    /// 4:2:0.
    Ycbcr420,
    /// 4:2:2, narrow chroma.
    Ycbcr422,
    /// 4:4:4.
    Ycbcr444,
    /// 4:2:2, wide chroma.
    Ycbcr422Wide,
}

impl ColorFormat {
    /// Map a raw colour format value.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            10 => Self::Ycbcr400,
            11 => Self::Ycbcr420,
            12 => Self::Ycbcr422,
            13 => Self::Ycbcr444,
            18 => Self::Ycbcr422Wide,
            _ => Self::Unknown,
        }
    }

    /// The raw colour format value.
    pub fn as_raw(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Ycbcr400 => 10,
            Self::Ycbcr420 => 11,
            Self::Ycbcr422 => 12,
            Self::Ycbcr444 => 13,
            Self::Ycbcr422Wide => 18,
        }
    }

    /// Horizontal and vertical chroma subsampling shifts.
    ///
    /// `None` for luma-only and unknown formats.
    pub fn chroma_shift(self) -> Option<(u32, u32)> {
        match self {
            Self::Ycbcr420 => Some((1, 1)),
            Self::Ycbcr422 | Self::Ycbcr422Wide => Some((1, 0)),
            Self::Ycbcr444 => Some((0, 0)),
            Self::Ycbcr400 | Self::Unknown => None,
        }
    }
}

impl Display for ColorFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::Ycbcr400 => write!(f, "YCbCr400"),
            Self::Ycbcr420 => write!(f, "YCbCr420"),
            Self::Ycbcr422 => write!(f, "YCbCr422"),
            Self::Ycbcr444 => write!(f, "YCbCr444"),
            Self::Ycbcr422Wide => write!(f, "YCbCr422W"),
        }
    }
}

/// Packed colour-space tag carried by a picture descriptor.
///
/// Bits 0-7 hold the [`ColorFormat`], bits 8-13 the bit depth minus 8, and
/// bit 14 the big-endian flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorSpace(u32);

impl ColorSpace {
    /// Pack a format, bit depth (8..=71) and sample endianness.
    pub fn new(format: ColorFormat, bit_depth: u8, big_endian: bool) -> Self {
        let depth = u32::from(bit_depth.saturating_sub(8)) & 0x3f;
        Self(u32::from(format.as_raw()) | (depth << 8) | (u32::from(big_endian) << 14))
    }

    /// Wrap an already-packed tag.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The packed value.
    pub fn as_raw(self) -> u32 {
        self.0
    }

    /// Colour format field.
    pub fn format(self) -> ColorFormat {
        ColorFormat::from_raw((self.0 & 0xff) as u8)
    }

    /// Bit depth field.
    pub fn bit_depth(self) -> u8 {
        (((self.0 >> 8) & 0x3f) + 8) as u8
    }

    /// Whether multi-byte samples are big-endian.
    pub fn is_big_endian(self) -> bool {
        (self.0 >> 14) & 0x1 != 0
    }
}

impl Display for ColorSpace {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} {}-bit", self.format(), self.bit_depth())
    }
}
