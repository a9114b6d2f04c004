use std::io::Write;

use crate::error::Result;
use crate::io_utils::{self, SavWriter};

/// Parse subtype 13: long variable names.
///
/// Format: `SHORT_NAME=LongVariableName\tSHORT2=LongName2\t...`
///
/// Returns a vector of (short_name, long_name) pairs.
pub fn parse_long_var_names(data: &[u8]) -> Vec<(String, String)> {
    let text = io_utils::bytes_to_string_lossy(data);
    let mut result = Vec::new();

    for pair in text.split('\t') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        if let Some((short, long)) = pair.split_once('=') {
            result.push((
                short.trim().to_uppercase(),
                long.trim().to_string(),
            ));
        }
    }

    result
}

/// Write subtype 13: long variable names, including its type-7 header.
pub fn write_long_var_names<W: Write>(writer: &mut SavWriter<W>, pairs: &[(String, String)]) -> Result<()> {
    let mut text = String::new();
    for (short, long) in pairs {
        text.push_str(&short.to_uppercase());
        text.push('=');
        text.push_str(long);
        text.push('\t');
    }
    let data = text.into_bytes();

    writer.write_i32(crate::constants::RECORD_TYPE_INFO)?;
    writer.write_i32(crate::constants::INFO_LONG_NAMES)?;
    writer.write_i32(1)?;
    writer.write_i32(data.len() as i32)?;
    writer.write_bytes(&data)?;
    Ok(())
}
