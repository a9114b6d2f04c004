use std::io::{Read, Write};

use crate::constants::{Alignment, Measure};
use crate::error::Result;
use crate::io_utils::{SavReader, SavWriter};

/// A single variable display entry (from subtype 11).
#[derive(Debug, Clone)]
pub struct VarDisplayEntry {
    pub measure: Measure,
    pub width: u32,
    pub alignment: Alignment,
}

/// Parse subtype 11 variable display info.
///
/// The record is a sequence of `count` i32 values, three per variable
/// (measure, width, alignment). A `count` that isn't a multiple of 3 (or
/// is negative) is a malformed block: `data_len` raw bytes are skipped and
/// `Ok(None)` is returned so the caller can record a warning instead of
/// guessing at a shorter per-variable layout.
pub fn parse_var_display<R: Read>(
    reader: &mut SavReader<R>,
    count: i32,
    data_len: usize,
) -> Result<Option<Vec<VarDisplayEntry>>> {
    if count < 0 || count % 3 != 0 {
        reader.skip(data_len)?;
        return Ok(None);
    }

    let n_vars = (count / 3) as usize;
    let mut entries = Vec::with_capacity(n_vars);

    for _ in 0..n_vars {
        let measure = Measure::from_i32(reader.read_i32()?);
        let width = reader.read_i32()? as u32;
        let alignment = Alignment::from_i32(reader.read_i32()?);

        entries.push(VarDisplayEntry {
            measure,
            width,
            alignment,
        });
    }

    Ok(Some(entries))
}

/// Write subtype 11 variable display info, including its type-7 header.
/// Always writes the 3-field-per-variable (measure, width, alignment) form.
pub fn write_var_display<W: Write>(writer: &mut SavWriter<W>, entries: &[VarDisplayEntry]) -> Result<()> {
    writer.write_i32(crate::constants::RECORD_TYPE_INFO)?;
    writer.write_i32(crate::constants::INFO_VAR_DISPLAY)?;
    writer.write_i32(4)?;
    writer.write_i32((entries.len() * 3) as i32)?;
    for entry in entries {
        writer.write_i32(entry.measure.to_i32())?;
        writer.write_i32(entry.width as i32)?;
        writer.write_i32(entry.alignment.to_i32())?;
    }
    Ok(())
}
