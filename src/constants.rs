//! On-disk constants: sentinel bit patterns, compression opcodes, record
//! tags, and the small value enums used throughout the dictionary codec.

/// SPSS system-missing value: the most negative finite `f64`, not NaN.
pub const SYSMIS_BITS: u64 = 0xFFEF_FFFF_FFFF_FFFF;

/// Highest representable double in SPSS (used as the HIGHEST sentinel in
/// missing-value ranges).
pub const HIGHEST_BITS: u64 = 0x7FEF_FFFF_FFFF_FFFF;

/// Second-lowest representable double (the LOWEST sentinel).
pub const LOWEST_BITS: u64 = 0xFFEF_FFFF_FFFF_FFFE;

/// Default compression bias (added to bytecodes 1..=251).
pub const DEFAULT_BIAS: f64 = 100.0;

// -- Bytecode compression control codes (spec.md §4.4) --

/// Padding / skip (writer-only: pads the final octet of a flush).
pub const COMPRESS_SKIP: u8 = 0;
/// End of file marker. Legal only between cases; the writer never emits it.
pub const COMPRESS_END_OF_FILE: u8 = 252;
/// Next 8 raw bytes (following the current octet group) are the value.
pub const COMPRESS_RAW_FOLLOWS: u8 = 253;
/// Segment is 8 ASCII spaces (string padding).
pub const COMPRESS_EIGHT_SPACES: u8 = 254;
/// Segment is the numeric SYSMIS value.
pub const COMPRESS_SYSMIS: u8 = 255;

// -- Record type tags (spec.md §4.3) --

pub const RECORD_TYPE_VARIABLE: i32 = 2;
pub const RECORD_TYPE_VALUE_LABEL: i32 = 3;
pub const RECORD_TYPE_VALUE_LABEL_VARS: i32 = 4;
pub const RECORD_TYPE_DOCUMENT: i32 = 6;
pub const RECORD_TYPE_INFO: i32 = 7;
pub const RECORD_TYPE_DICT_TERMINATION: i32 = 999;

// -- Info (tag 7) record subtypes this codec understands --

pub const INFO_MACHINE_INTEGER: i32 = 3;
pub const INFO_MACHINE_FLOAT: i32 = 4;
pub const INFO_VAR_DISPLAY: i32 = 11;
pub const INFO_LONG_NAMES: i32 = 13;

/// Variable measurement level (subtype 11, first word of each triple).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Unknown,
    Nominal,
    Ordinal,
    Scale,
}

impl Measure {
    pub fn from_i32(val: i32) -> Measure {
        match val {
            1 => Measure::Nominal,
            2 => Measure::Ordinal,
            3 => Measure::Scale,
            _ => Measure::Unknown,
        }
    }

    pub fn to_i32(self) -> i32 {
        match self {
            Measure::Unknown => 0,
            Measure::Nominal => 1,
            Measure::Ordinal => 2,
            Measure::Scale => 3,
        }
    }
}

/// Variable display alignment (subtype 11, third word of each triple).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Right,
    Center,
}

impl Alignment {
    pub fn from_i32(val: i32) -> Alignment {
        match val {
            0 => Alignment::Left,
            1 => Alignment::Right,
            2 => Alignment::Center,
            _ => Alignment::Left,
        }
    }

    pub fn to_i32(self) -> i32 {
        match self {
            Alignment::Left => 0,
            Alignment::Right => 1,
            Alignment::Center => 2,
        }
    }
}

/// SPSS variable type: numeric, or a string of the given byte width (1..=255).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Numeric,
    String(u8),
}

impl VarType {
    /// Number of 8-byte segments this type occupies in a case.
    pub fn n_segments(self) -> usize {
        match self {
            VarType::Numeric => 1,
            VarType::String(width) => (width as usize).div_ceil(8),
        }
    }
}

/// SPSS print/write format type codes (a subset; enough for the formats the
/// codec round-trips faithfully without interpreting).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FormatType {
    A = 1,
    Ahex = 2,
    Comma = 3,
    Dollar = 4,
    F = 5,
    Ib = 6,
    PibHex = 7,
    P = 8,
    Pib = 9,
    Pk = 10,
    Rb = 11,
    RbHex = 12,
    Z = 15,
    N = 16,
    E = 17,
    Date = 20,
    Time = 21,
    DateTime = 22,
    ADate = 23,
    JDate = 24,
    DTime = 25,
    Wkday = 26,
    Month = 27,
    Moyr = 28,
    Qyr = 29,
    Wkyr = 30,
    Pct = 31,
    Dot = 32,
    Cca = 33,
    Ccb = 34,
    Ccc = 35,
    Ccd = 36,
    Cce = 37,
    EDate = 38,
    SDate = 39,
    MTime = 40,
    YmDhms = 41,
}

impl FormatType {
    pub fn from_u8(val: u8) -> Option<FormatType> {
        Some(match val {
            1 => FormatType::A,
            2 => FormatType::Ahex,
            3 => FormatType::Comma,
            4 => FormatType::Dollar,
            5 => FormatType::F,
            6 => FormatType::Ib,
            7 => FormatType::PibHex,
            8 => FormatType::P,
            9 => FormatType::Pib,
            10 => FormatType::Pk,
            11 => FormatType::Rb,
            12 => FormatType::RbHex,
            15 => FormatType::Z,
            16 => FormatType::N,
            17 => FormatType::E,
            20 => FormatType::Date,
            21 => FormatType::Time,
            22 => FormatType::DateTime,
            23 => FormatType::ADate,
            24 => FormatType::JDate,
            25 => FormatType::DTime,
            26 => FormatType::Wkday,
            27 => FormatType::Month,
            28 => FormatType::Moyr,
            29 => FormatType::Qyr,
            30 => FormatType::Wkyr,
            31 => FormatType::Pct,
            32 => FormatType::Dot,
            33 => FormatType::Cca,
            34 => FormatType::Ccb,
            35 => FormatType::Ccc,
            36 => FormatType::Ccd,
            37 => FormatType::Cce,
            38 => FormatType::EDate,
            39 => FormatType::SDate,
            40 => FormatType::MTime,
            41 => FormatType::YmDhms,
            _ => return None,
        })
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            FormatType::A => "A",
            FormatType::Ahex => "AHEX",
            FormatType::Comma => "COMMA",
            FormatType::Dollar => "DOLLAR",
            FormatType::F => "F",
            FormatType::Ib => "IB",
            FormatType::PibHex => "PIBHEX",
            FormatType::P => "P",
            FormatType::Pib => "PIB",
            FormatType::Pk => "PK",
            FormatType::Rb => "RB",
            FormatType::RbHex => "RBHEX",
            FormatType::Z => "Z",
            FormatType::N => "N",
            FormatType::E => "E",
            FormatType::Date => "DATE",
            FormatType::Time => "TIME",
            FormatType::DateTime => "DATETIME",
            FormatType::ADate => "ADATE",
            FormatType::JDate => "JDATE",
            FormatType::DTime => "DTIME",
            FormatType::Wkday => "WKDAY",
            FormatType::Month => "MONTH",
            FormatType::Moyr => "MOYR",
            FormatType::Qyr => "QYR",
            FormatType::Wkyr => "WKYR",
            FormatType::Pct => "PCT",
            FormatType::Dot => "DOT",
            FormatType::Cca => "CCA",
            FormatType::Ccb => "CCB",
            FormatType::Ccc => "CCC",
            FormatType::Ccd => "CCD",
            FormatType::Cce => "CCE",
            FormatType::EDate => "EDATE",
            FormatType::SDate => "SDATE",
            FormatType::MTime => "MTIME",
            FormatType::YmDhms => "YMDHMS",
        }
    }

    /// Whether this format type represents a string variable.
    pub fn is_string(&self) -> bool {
        matches!(self, FormatType::A | FormatType::Ahex)
    }
}

/// Decoded SPSS print/write format: `(type << 16) | (width << 8) | decimals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpssFormat {
    pub format_type: FormatType,
    pub width: u8,
    pub decimals: u8,
}

impl SpssFormat {
    pub fn from_packed(packed: i32) -> Option<SpssFormat> {
        let raw = packed as u32;
        let format_type_byte = ((raw >> 16) & 0xFF) as u8;
        let width = ((raw >> 8) & 0xFF) as u8;
        let decimals = (raw & 0xFF) as u8;

        FormatType::from_u8(format_type_byte).map(|format_type| SpssFormat {
            format_type,
            width,
            decimals,
        })
    }

    pub fn to_packed(self) -> i32 {
        ((self.format_type as u32) << 16 | (self.width as u32) << 8 | self.decimals as u32) as i32
    }

    /// Render as a human-readable SPSS format string like "F8.2" or "A50".
    pub fn to_spss_string(&self) -> String {
        if self.format_type.is_string() {
            format!("{}{}", self.format_type.prefix(), self.width)
        } else if self.decimals > 0 {
            format!("{}{}.{}", self.format_type.prefix(), self.width, self.decimals)
        } else {
            format!("{}{}", self.format_type.prefix(), self.width)
        }
    }
}

/// Check if a raw f64 bit pattern is SYSMIS.
#[inline]
pub fn is_sysmis(val: f64) -> bool {
    val.to_bits() == SYSMIS_BITS
}

/// The SYSMIS value as f64.
#[inline]
pub fn sysmis() -> f64 {
    f64::from_bits(SYSMIS_BITS)
}

/// The HIGHEST sentinel value as f64.
#[inline]
pub fn highest() -> f64 {
    f64::from_bits(HIGHEST_BITS)
}

/// The LOWEST sentinel value as f64.
#[inline]
pub fn lowest() -> f64 {
    f64::from_bits(LOWEST_BITS)
}
