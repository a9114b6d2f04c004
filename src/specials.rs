//! Endianness & Specials Resolver (spec.md §4.2).
//!
//! Layout-code probing in [`crate::io_utils::detect_endianness`] gives a
//! first opinion on byte order; this module cross-checks that opinion
//! against the file's own machine-info extension records (tag 7, subtypes
//! 3 and 4) and builds the sentinel-remapping table used while decoding
//! case data.

use crate::constants::{HIGHEST_BITS, LOWEST_BITS, SYSMIS_BITS};
use crate::error::{Result, SpssError};
use crate::info_records::float_info::FloatInfo;
use crate::info_records::integer_info::IntegerInfo;

const FLOAT_REP_IEEE: i32 = 1;
const ENDIAN_BIG: i32 = 1;
const ENDIAN_LITTLE: i32 = 2;
const CHARSET_7BIT: i32 = 2;
const CHARSET_8BIT: i32 = 3;

/// Reconciled sentinel values and remap state for one open file.
#[derive(Debug, Clone, Copy)]
pub struct Specials {
    file_sysmis_bits: u64,
    file_highest_bits: u64,
    file_lowest_bits: u64,
    /// Whether any file sentinel differs from the host's, requiring a
    /// per-value remap during case decoding (spec.md §4.2, last bullet).
    pub needs_remap: bool,
}

impl Default for Specials {
    /// The host's own sentinels -- used until/unless a subtype-4 record is
    /// seen, and always used when writing (the writer emits host sentinels
    /// unconditionally).
    fn default() -> Specials {
        Specials {
            file_sysmis_bits: SYSMIS_BITS,
            file_highest_bits: HIGHEST_BITS,
            file_lowest_bits: LOWEST_BITS,
            needs_remap: false,
        }
    }
}

impl Specials {
    /// Validate a subtype-3 (machine integer info) record against the
    /// endianness already probed from the header's layout code.
    pub fn validate_integer_info(probed_bswap: bool, info: &IntegerInfo) -> Result<()> {
        if info.floating_point_rep != FLOAT_REP_IEEE {
            return Err(SpssError::UnsupportedFloatRep(info.floating_point_rep));
        }

        let declared_is_big = match info.endianness {
            ENDIAN_BIG => true,
            ENDIAN_LITTLE => false,
            other => {
                return Err(SpssError::CorruptRecord {
                    tag: 7,
                    detail: format!("subtype 3: unrecognized endianness code {other}"),
                });
            }
        };
        // `probed_bswap` is true exactly when the file's native order is
        // big-endian on a little-endian host, or vice versa -- so the
        // file's own order is "big" iff bswap XOR host-is-big. We only
        // have byte-swap-or-not from probing, so compare in terms of the
        // order that was *actually selected* as this file's own order.
        let probed_is_big = probed_bswap != cfg!(target_endian = "big");
        if probed_is_big != declared_is_big {
            return Err(SpssError::EndiannessMismatch {
                probed: if probed_is_big { "big" } else { "little" },
                declared: if declared_is_big { "big" } else { "little" },
            });
        }

        match info.character_code {
            CHARSET_7BIT | CHARSET_8BIT => Ok(()),
            other => Err(SpssError::UnsupportedCharset(other)),
        }
    }

    /// Fold in a subtype-4 (machine float info) record, remembering the
    /// file's sentinels if they disagree with the host's.
    pub fn apply_float_info(&mut self, info: &FloatInfo) -> bool {
        let file_sysmis_bits = info.sysmis.to_bits();
        let file_highest_bits = info.highest.to_bits();
        let file_lowest_bits = info.lowest.to_bits();

        let disagrees = file_sysmis_bits != SYSMIS_BITS
            || file_highest_bits != HIGHEST_BITS
            || file_lowest_bits != LOWEST_BITS;

        self.file_sysmis_bits = file_sysmis_bits;
        self.file_highest_bits = file_highest_bits;
        self.file_lowest_bits = file_lowest_bits;
        self.needs_remap = disagrees;
        disagrees
    }

    /// Remap a numeric value read from the file to the host's own sentinel
    /// bit patterns (a no-op unless `needs_remap` is set).
    pub fn to_host(&self, value: f64) -> f64 {
        if !self.needs_remap {
            return value;
        }
        let bits = value.to_bits();
        if bits == self.file_sysmis_bits {
            f64::from_bits(SYSMIS_BITS)
        } else if bits == self.file_highest_bits {
            f64::from_bits(HIGHEST_BITS)
        } else if bits == self.file_lowest_bits {
            f64::from_bits(LOWEST_BITS)
        } else {
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ieee_info(endianness: i32, charset: i32) -> IntegerInfo {
        IntegerInfo {
            version_major: 1,
            version_minor: 0,
            version_revision: 0,
            machine_code: 0,
            floating_point_rep: FLOAT_REP_IEEE,
            compression_code: 1,
            endianness,
            character_code: charset,
        }
    }

    #[test]
    fn test_validate_integer_info_ok_little_endian() {
        let info = ieee_info(ENDIAN_LITTLE, CHARSET_8BIT);
        assert!(Specials::validate_integer_info(false, &info).is_ok());
    }

    #[test]
    fn test_validate_integer_info_rejects_non_ieee() {
        let mut info = ieee_info(ENDIAN_LITTLE, CHARSET_8BIT);
        info.floating_point_rep = 2;
        let err = Specials::validate_integer_info(false, &info).unwrap_err();
        assert!(matches!(err, SpssError::UnsupportedFloatRep(2)));
    }

    #[test]
    fn test_validate_integer_info_rejects_bad_charset() {
        let info = ieee_info(ENDIAN_LITTLE, 1252);
        let err = Specials::validate_integer_info(false, &info).unwrap_err();
        assert!(matches!(err, SpssError::UnsupportedCharset(1252)));
    }

    #[test]
    fn test_apply_float_info_matching_sentinels_no_remap() {
        let mut specials = Specials::default();
        let info = FloatInfo {
            sysmis: f64::from_bits(SYSMIS_BITS),
            highest: f64::from_bits(HIGHEST_BITS),
            lowest: f64::from_bits(LOWEST_BITS),
        };
        assert!(!specials.apply_float_info(&info));
        assert!(!specials.needs_remap);
    }

    #[test]
    fn test_apply_float_info_disagreeing_sentinels_triggers_remap() {
        let mut specials = Specials::default();
        let info = FloatInfo {
            sysmis: -1.0e300,
            highest: f64::from_bits(HIGHEST_BITS),
            lowest: f64::from_bits(LOWEST_BITS),
        };
        assert!(specials.apply_float_info(&info));
        assert!(specials.needs_remap);
        assert_eq!(specials.to_host(-1.0e300).to_bits(), SYSMIS_BITS);
        assert_eq!(specials.to_host(42.0), 42.0);
    }
}
