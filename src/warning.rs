//! Recoverable conditions (spec.md §7): logged, never fatal. Both the
//! reader and the writer collect these into a `Vec<Warning>` exposed
//! through a `warnings()` accessor rather than printing or logging them
//! directly -- the corpus carries no logging crate (see SPEC_FULL.md), so
//! a typed return value is the idiomatic substitute.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Warning {
    #[error("compression bias {0} is not the conventional 100.0")]
    NonStandardBias(f64),

    #[error("variable name {raw:?} contains lowercase letters, upcased to {upcased:?}")]
    LowercaseName { raw: String, upcased: String },

    #[error("variable {0:?} begins with '#' (scratch variable)")]
    ScratchVariableName(String),

    #[error("duplicate value label for value {value:?} on variable {variable:?}")]
    DuplicateValueLabel { variable: String, value: String },

    #[error("unknown extension record subtype {0}, skipped")]
    UnknownExtensionSubtype(i32),

    #[error("subtype 11 (variable display) block has wrong element count, skipped")]
    TruncatedVarDisplayBlock,

    #[error("trailing garbage in long variable name map, ignored: {0:?}")]
    TrailingGarbageInLongNameMap(String),

    #[error("file sentinels disagree with host sentinels, values remapped on read")]
    SentinelMismatch,
}
