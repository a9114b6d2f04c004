//! Type-7 (info/extension) records (spec.md §4.3). Only the four subtypes
//! the data model actually uses are decoded; anything else is skipped and
//! reported through [`crate::warning::Warning::UnknownExtensionSubtype`]
//! rather than guessed at (see SPEC_FULL.md's Open Questions).

pub mod float_info;
pub mod integer_info;
pub mod long_var_names;
pub mod var_display;

use std::io::Read;

use crate::constants::{INFO_LONG_NAMES, INFO_MACHINE_FLOAT, INFO_MACHINE_INTEGER, INFO_VAR_DISPLAY};
use crate::error::{Result, SpssError};
use crate::io_utils::SavReader;

/// Header for a type 7 (info) record.
#[derive(Debug, Clone)]
pub struct InfoRecordHeader {
    pub subtype: i32,
    pub size: i32,
    pub count: i32,
}

impl InfoRecordHeader {
    /// Parse the info record header. The record type (7) has already been read.
    pub fn parse<R: Read>(reader: &mut SavReader<R>) -> Result<InfoRecordHeader> {
        let subtype = reader.read_i32()?;
        let size = reader.read_i32()?;
        let count = reader.read_i32()?;
        Ok(InfoRecordHeader {
            subtype,
            size,
            count,
        })
    }

    /// Total data bytes for this info record, checked against a corrupt
    /// file declaring an overflowing `size * count` (spec.md §6.3: `TooLarge`).
    pub fn data_len(&self) -> Result<usize> {
        let size = self.size.max(0) as u64;
        let count = self.count.max(0) as u64;
        size.checked_mul(count)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| SpssError::TooLarge {
                what: "type-7 record body",
                detail: format!("size {} * count {} overflows", self.size, self.count),
            })
    }
}

/// Parsed info record data.
#[derive(Debug)]
pub enum InfoRecord {
    IntegerInfo(integer_info::IntegerInfo),
    FloatInfo(float_info::FloatInfo),
    VarDisplay(Vec<var_display::VarDisplayEntry>),
    /// Subtype 11 body whose `count` wasn't a multiple of 3 (or was
    /// negative) -- malformed, skipped raw, reported as a warning.
    MalformedVarDisplay,
    LongNames(Vec<(String, String)>),
    Unknown { subtype: i32 },
}

/// Parse a type 7 info record based on its subtype.
pub fn parse_info_record<R: Read>(
    reader: &mut SavReader<R>,
    header: &InfoRecordHeader,
) -> Result<InfoRecord> {
    let data_len = header.data_len()?;

    match header.subtype {
        INFO_MACHINE_INTEGER => {
            let info = integer_info::IntegerInfo::parse(reader)?;
            Ok(InfoRecord::IntegerInfo(info))
        }
        INFO_MACHINE_FLOAT => {
            let info = float_info::FloatInfo::parse(reader)?;
            Ok(InfoRecord::FloatInfo(info))
        }
        INFO_VAR_DISPLAY => match var_display::parse_var_display(reader, header.count, data_len)? {
            Some(entries) => Ok(InfoRecord::VarDisplay(entries)),
            None => Ok(InfoRecord::MalformedVarDisplay),
        },
        INFO_LONG_NAMES => {
            let data = reader.read_bytes(data_len)?;
            let names = long_var_names::parse_long_var_names(&data);
            Ok(InfoRecord::LongNames(names))
        }
        _ => {
            reader.skip(data_len)?;
            Ok(InfoRecord::Unknown {
                subtype: header.subtype,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_len_overflow_rejected() {
        let header = InfoRecordHeader {
            subtype: 999,
            size: i32::MAX,
            count: i32::MAX,
        };
        let err = header.data_len().unwrap_err();
        assert!(matches!(err, SpssError::TooLarge { .. }));
    }

    #[test]
    fn test_data_len_normal() {
        let header = InfoRecordHeader {
            subtype: INFO_MACHINE_FLOAT,
            size: 8,
            count: 3,
        };
        assert_eq!(header.data_len().unwrap(), 24);
    }
}
