use std::io::{Read, Write};

use crate::error::Result;
use crate::io_utils::{self, SavReader, SavWriter};

/// Parse a type 6 (document) record. The record type i32 has already been read.
///
/// Returns a vector of document lines (each originally 80 chars, trimmed).
pub fn parse_document<R: Read>(reader: &mut SavReader<R>) -> Result<Vec<Vec<u8>>> {
    let n_lines = reader.read_i32()? as usize;
    let mut lines = Vec::with_capacity(n_lines);

    for _ in 0..n_lines {
        let line_bytes = reader.read_bytes(80)?;
        let trimmed = io_utils::trim_trailing_padding(&line_bytes).to_vec();
        lines.push(trimmed);
    }

    Ok(lines)
}

/// Write a type 6 (document) record, including its `RECORD_TYPE_DOCUMENT`
/// tag. Each line is encoded, then truncated or space-padded to 80 bytes.
pub fn write_documents<W: Write>(writer: &mut SavWriter<W>, lines: &[String]) -> Result<()> {
    writer.write_i32(crate::constants::RECORD_TYPE_DOCUMENT)?;
    writer.write_i32(lines.len() as i32)?;
    for line in lines {
        let encoded = crate::encoding::encode_str(line);
        writer.write_fixed_string(&encoded, 80)?;
    }
    Ok(())
}
