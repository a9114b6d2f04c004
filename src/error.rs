use thiserror::Error;

/// The codec's error taxonomy (spec.md §6.3). Every hard-error condition the
/// reader or writer can hit surfaces as one of these; recoverable conditions
/// go through [`crate::warning::Warning`] instead.
#[derive(Error, Debug)]
pub enum SpssError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected end of file while parsing {context}")]
    UnexpectedEof { context: &'static str },

    #[error("invalid magic number: expected \"$FL2\" or \"$FL3\", found {found:?}")]
    BadMagic { found: [u8; 4] },

    #[error("could not determine byte order from layout_code bytes {bytes:?}")]
    BadLayout { bytes: [u8; 4] },

    #[error(
        "endianness mismatch: layout-code probing found {probed}, machine info record claims {declared}"
    )]
    EndiannessMismatch {
        probed: &'static str,
        declared: &'static str,
    },

    #[error("unsupported floating point representation: code {0} (only IEEE 754 is supported)")]
    UnsupportedFloatRep(i32),

    #[error("unsupported character code: {0} (only 7-bit and 8-bit ASCII are supported)")]
    UnsupportedCharset(i32),

    #[error("corrupt record (tag {tag}): {detail}")]
    CorruptRecord { tag: i32, detail: String },

    #[error("type-4 (value label variable index) record seen without a preceding type-3 record")]
    OrphanedIndexRecord,

    #[error("invalid variable name {name:?}: {reason}")]
    BadVariableName { name: String, reason: &'static str },

    #[error("duplicate variable name: {0:?}")]
    DuplicateVariableName(String),

    #[error("invalid format specification: type={format_type}, width={width}, decimals={decimals}")]
    BadFormatSpec {
        format_type: u8,
        width: u8,
        decimals: u8,
    },

    #[error("missing-value specification not allowed on variable {name:?}: {reason}")]
    MissingValueNotAllowed { name: String, reason: &'static str },

    #[error("invalid weight variable reference: {0}")]
    WeightInvalid(String),

    #[error("corrupt partial case: {0}")]
    CorruptPartialCase(String),

    #[error("size too large: {what} ({detail})")]
    TooLarge { what: &'static str, detail: String },
}

pub type Result<T> = std::result::Result<T, SpssError>;
