//! Sample formats, subformats, and access modes.
//!
//! Format names and sample encodings are bit-exact: the silence pattern of
//! a format is defined as the byte sequence that decodes to zero amplitude
//! (midpoint for unsigned and companded formats).

use std::fmt;

/// Byte order of a linear sample encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// PCM sample format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::enum_variant_names)]
pub enum Format {
    S8,
    U8,
    S16Le,
    S16Be,
    U16Le,
    U16Be,
    S24Le,
    S24Be,
    U24Le,
    U24Be,
    S32Le,
    S32Be,
    U32Le,
    U32Be,
    FloatLe,
    FloatBe,
    Float64Le,
    Float64Be,
    Iec958SubframeLe,
    Iec958SubframeBe,
    MuLaw,
    ALaw,
    ImaAdpcm,
    Mpeg,
    Gsm,
    Special,
}

/// All formats in mask-index order.
pub const ALL_FORMATS: [Format; 26] = [
    Format::S8,
    Format::U8,
    Format::S16Le,
    Format::S16Be,
    Format::U16Le,
    Format::U16Be,
    Format::S24Le,
    Format::S24Be,
    Format::U24Le,
    Format::U24Be,
    Format::S32Le,
    Format::S32Be,
    Format::U32Le,
    Format::U32Be,
    Format::FloatLe,
    Format::FloatBe,
    Format::Float64Le,
    Format::Float64Be,
    Format::Iec958SubframeLe,
    Format::Iec958SubframeBe,
    Format::MuLaw,
    Format::ALaw,
    Format::ImaAdpcm,
    Format::Mpeg,
    Format::Gsm,
    Format::Special,
];

impl Format {
    /// Position of this format in the format mask.
    #[inline]
    pub fn index(self) -> u32 {
        ALL_FORMATS.iter().position(|&f| f == self).unwrap() as u32
    }

    pub fn from_index(index: u32) -> Option<Format> {
        ALL_FORMATS.get(index as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::S8 => "S8",
            Format::U8 => "U8",
            Format::S16Le => "S16_LE",
            Format::S16Be => "S16_BE",
            Format::U16Le => "U16_LE",
            Format::U16Be => "U16_BE",
            Format::S24Le => "S24_LE",
            Format::S24Be => "S24_BE",
            Format::U24Le => "U24_LE",
            Format::U24Be => "U24_BE",
            Format::S32Le => "S32_LE",
            Format::S32Be => "S32_BE",
            Format::U32Le => "U32_LE",
            Format::U32Be => "U32_BE",
            Format::FloatLe => "FLOAT_LE",
            Format::FloatBe => "FLOAT_BE",
            Format::Float64Le => "FLOAT64_LE",
            Format::Float64Be => "FLOAT64_BE",
            Format::Iec958SubframeLe => "IEC958_SUBFRAME_LE",
            Format::Iec958SubframeBe => "IEC958_SUBFRAME_BE",
            Format::MuLaw => "MU_LAW",
            Format::ALaw => "A_LAW",
            Format::ImaAdpcm => "IMA_ADPCM",
            Format::Mpeg => "MPEG",
            Format::Gsm => "GSM",
            Format::Special => "SPECIAL",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Format::S8 => "Signed 8 bit",
            Format::U8 => "Unsigned 8 bit",
            Format::S16Le => "Signed 16 bit Little Endian",
            Format::S16Be => "Signed 16 bit Big Endian",
            Format::U16Le => "Unsigned 16 bit Little Endian",
            Format::U16Be => "Unsigned 16 bit Big Endian",
            Format::S24Le => "Signed 24 bit Little Endian",
            Format::S24Be => "Signed 24 bit Big Endian",
            Format::U24Le => "Unsigned 24 bit Little Endian",
            Format::U24Be => "Unsigned 24 bit Big Endian",
            Format::S32Le => "Signed 32 bit Little Endian",
            Format::S32Be => "Signed 32 bit Big Endian",
            Format::U32Le => "Unsigned 32 bit Little Endian",
            Format::U32Be => "Unsigned 32 bit Big Endian",
            Format::FloatLe => "Float 32 bit Little Endian",
            Format::FloatBe => "Float 32 bit Big Endian",
            Format::Float64Le => "Float 64 bit Little Endian",
            Format::Float64Be => "Float 64 bit Big Endian",
            Format::Iec958SubframeLe => "IEC-958 Little Endian",
            Format::Iec958SubframeBe => "IEC-958 Big Endian",
            Format::MuLaw => "Mu-Law",
            Format::ALaw => "A-Law",
            Format::ImaAdpcm => "Ima-ADPCM",
            Format::Mpeg => "MPEG",
            Format::Gsm => "GSM",
            Format::Special => "Special",
        }
    }

    /// Parse a format from its display name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Format> {
        ALL_FORMATS
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }

    /// Significant bits per sample, when defined.
    pub fn width(self) -> Option<u32> {
        match self {
            Format::S8 | Format::U8 | Format::MuLaw | Format::ALaw => Some(8),
            Format::S16Le | Format::S16Be | Format::U16Le | Format::U16Be => Some(16),
            Format::S24Le | Format::S24Be | Format::U24Le | Format::U24Be => Some(24),
            Format::S32Le
            | Format::S32Be
            | Format::U32Le
            | Format::U32Be
            | Format::FloatLe
            | Format::FloatBe
            | Format::Iec958SubframeLe
            | Format::Iec958SubframeBe => Some(32),
            Format::Float64Le | Format::Float64Be => Some(64),
            Format::ImaAdpcm => Some(4),
            Format::Mpeg | Format::Gsm | Format::Special => None,
        }
    }

    /// Bits a stored sample occupies, when defined. Linear formats are 8,
    /// 16, 32, or 64; IMA-ADPCM packs two samples per byte; the remaining
    /// formats are opaque.
    pub fn physical_width(self) -> Option<u32> {
        match self {
            Format::S8 | Format::U8 | Format::MuLaw | Format::ALaw => Some(8),
            Format::S16Le | Format::S16Be | Format::U16Le | Format::U16Be => Some(16),
            Format::S24Le
            | Format::S24Be
            | Format::U24Le
            | Format::U24Be
            | Format::S32Le
            | Format::S32Be
            | Format::U32Le
            | Format::U32Be
            | Format::FloatLe
            | Format::FloatBe
            | Format::Iec958SubframeLe
            | Format::Iec958SubframeBe => Some(32),
            Format::Float64Le | Format::Float64Be => Some(64),
            Format::ImaAdpcm => Some(4),
            Format::Mpeg | Format::Gsm | Format::Special => None,
        }
    }

    /// Linear (integer) PCM encoding.
    pub fn is_linear(self) -> bool {
        self.signedness().is_some() && !self.is_float()
    }

    pub fn is_float(self) -> bool {
        matches!(
            self,
            Format::FloatLe | Format::FloatBe | Format::Float64Le | Format::Float64Be
        )
    }

    /// `Some(true)` for signed linear formats, `Some(false)` for unsigned,
    /// `None` where signedness has no meaning.
    pub fn signedness(self) -> Option<bool> {
        match self {
            Format::S8
            | Format::S16Le
            | Format::S16Be
            | Format::S24Le
            | Format::S24Be
            | Format::S32Le
            | Format::S32Be => Some(true),
            Format::U8
            | Format::U16Le
            | Format::U16Be
            | Format::U24Le
            | Format::U24Be
            | Format::U32Le
            | Format::U32Be => Some(false),
            _ => None,
        }
    }

    /// Byte order, for formats wider than one byte.
    pub fn endian(self) -> Option<Endian> {
        match self {
            Format::S16Le
            | Format::U16Le
            | Format::S24Le
            | Format::U24Le
            | Format::S32Le
            | Format::U32Le
            | Format::FloatLe
            | Format::Float64Le
            | Format::Iec958SubframeLe => Some(Endian::Little),
            Format::S16Be
            | Format::U16Be
            | Format::S24Be
            | Format::U24Be
            | Format::S32Be
            | Format::U32Be
            | Format::FloatBe
            | Format::Float64Be
            | Format::Iec958SubframeBe => Some(Endian::Big),
            _ => None,
        }
    }

    /// The format's silence pattern as an 8-byte fill, in memory order.
    ///
    /// Silence is zero for signed and float encodings, the midpoint for
    /// unsigned encodings, and the companded zero for Mu-Law (0x7f) and
    /// A-Law (0x55).
    pub fn silence_bytes(self) -> [u8; 8] {
        match self {
            Format::U8 => [0x80; 8],
            Format::U16Le => repeat2([0x00, 0x80]),
            Format::U16Be => repeat2([0x80, 0x00]),
            Format::U24Le => repeat4([0x00, 0x00, 0x80, 0x00]),
            Format::U24Be => repeat4([0x00, 0x80, 0x00, 0x00]),
            Format::U32Le => repeat4([0x00, 0x00, 0x00, 0x80]),
            Format::U32Be => repeat4([0x80, 0x00, 0x00, 0x00]),
            Format::MuLaw => [0x7f; 8],
            Format::ALaw => [0x55; 8],
            _ => [0u8; 8],
        }
    }

    /// The silence pattern as a native-endian 64-bit word, suitable for
    /// wide fills of contiguous samples.
    #[inline]
    pub fn silence_u64(self) -> u64 {
        u64::from_ne_bytes(self.silence_bytes())
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn repeat2(pat: [u8; 2]) -> [u8; 8] {
    [
        pat[0], pat[1], pat[0], pat[1], pat[0], pat[1], pat[0], pat[1],
    ]
}

fn repeat4(pat: [u8; 4]) -> [u8; 8] {
    [
        pat[0], pat[1], pat[2], pat[3], pat[0], pat[1], pat[2], pat[3],
    ]
}

/// PCM subformat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Subformat {
    #[default]
    Std,
}

/// All subformats in mask-index order.
pub const ALL_SUBFORMATS: [Subformat; 1] = [Subformat::Std];

impl Subformat {
    #[inline]
    pub fn index(self) -> u32 {
        0
    }

    pub fn from_index(index: u32) -> Option<Subformat> {
        (index == 0).then_some(Subformat::Std)
    }

    pub fn name(self) -> &'static str {
        "STD"
    }

    pub fn description(self) -> &'static str {
        "Standard"
    }
}

impl fmt::Display for Subformat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Memory-access layout of the ring and the transfer entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    MmapInterleaved,
    MmapNoninterleaved,
    MmapComplex,
    RwInterleaved,
    RwNoninterleaved,
}

/// All access modes in mask-index order.
pub const ALL_ACCESSES: [Access; 5] = [
    Access::MmapInterleaved,
    Access::MmapNoninterleaved,
    Access::MmapComplex,
    Access::RwInterleaved,
    Access::RwNoninterleaved,
];

impl Access {
    #[inline]
    pub fn index(self) -> u32 {
        ALL_ACCESSES.iter().position(|&a| a == self).unwrap() as u32
    }

    pub fn from_index(index: u32) -> Option<Access> {
        ALL_ACCESSES.get(index as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Access::MmapInterleaved => "MMAP_INTERLEAVED",
            Access::MmapNoninterleaved => "MMAP_NONINTERLEAVED",
            Access::MmapComplex => "MMAP_COMPLEX",
            Access::RwInterleaved => "RW_INTERLEAVED",
            Access::RwNoninterleaved => "RW_NONINTERLEAVED",
        }
    }

    pub fn is_mmap(self) -> bool {
        matches!(
            self,
            Access::MmapInterleaved | Access::MmapNoninterleaved | Access::MmapComplex
        )
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for (i, f) in ALL_FORMATS.iter().enumerate() {
            assert_eq!(f.index(), i as u32);
            assert_eq!(Format::from_index(i as u32), Some(*f));
        }
        assert_eq!(Format::from_index(26), None);
        for (i, a) in ALL_ACCESSES.iter().enumerate() {
            assert_eq!(a.index(), i as u32);
            assert_eq!(Access::from_index(i as u32), Some(*a));
        }
    }

    #[test]
    fn test_name_round_trip() {
        for f in ALL_FORMATS {
            assert_eq!(Format::from_name(f.name()), Some(f));
        }
        assert_eq!(Format::from_name("s16_le"), Some(Format::S16Le));
        assert_eq!(Format::from_name("bogus"), None);
    }

    #[test]
    fn test_widths() {
        assert_eq!(Format::S16Le.width(), Some(16));
        assert_eq!(Format::S16Le.physical_width(), Some(16));
        // 24-bit samples are stored in 32-bit containers.
        assert_eq!(Format::S24Le.width(), Some(24));
        assert_eq!(Format::S24Le.physical_width(), Some(32));
        assert_eq!(Format::ImaAdpcm.physical_width(), Some(4));
        assert_eq!(Format::Mpeg.physical_width(), None);
        assert_eq!(Format::Float64Be.physical_width(), Some(64));
    }

    #[test]
    fn test_predicates() {
        assert!(Format::S32Be.is_linear());
        assert!(!Format::FloatLe.is_linear());
        assert!(Format::FloatLe.is_float());
        assert_eq!(Format::U16Le.signedness(), Some(false));
        assert_eq!(Format::MuLaw.signedness(), None);
        assert_eq!(Format::S16Be.endian(), Some(Endian::Big));
        assert_eq!(Format::S8.endian(), None);
    }

    #[test]
    fn test_silence_patterns() {
        assert_eq!(Format::S16Le.silence_u64(), 0);
        assert_eq!(Format::U8.silence_bytes(), [0x80; 8]);
        assert_eq!(
            Format::U16Le.silence_bytes(),
            [0x00, 0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x80]
        );
        assert_eq!(
            Format::U16Be.silence_bytes(),
            [0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x80, 0x00]
        );
        assert_eq!(
            Format::U32Be.silence_bytes(),
            [0x80, 0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00]
        );
        assert_eq!(Format::MuLaw.silence_bytes(), [0x7f; 8]);
        assert_eq!(Format::ALaw.silence_bytes(), [0x55; 8]);
        assert_eq!(Format::FloatBe.silence_u64(), 0);
    }
}
