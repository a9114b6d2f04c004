use std::io::{Read, Write};

use crate::error::Result;
use crate::io_utils::{SavReader, SavWriter};

/// Subtype 4: Machine floating point information.
#[derive(Debug, Clone)]
pub struct FloatInfo {
    /// System-missing value (as raw bit pattern).
    pub sysmis: f64,
    /// Highest representable value.
    pub highest: f64,
    /// Lowest representable value.
    pub lowest: f64,
}

impl FloatInfo {
    pub fn parse<R: Read>(reader: &mut SavReader<R>) -> Result<FloatInfo> {
        Ok(FloatInfo {
            sysmis: reader.read_f64()?,
            highest: reader.read_f64()?,
            lowest: reader.read_f64()?,
        })
    }

    /// Write this record, including its type-7 header
    /// (subtype 4, element size 8, 3 elements).
    pub fn write<W: Write>(&self, writer: &mut SavWriter<W>) -> Result<()> {
        writer.write_i32(crate::constants::RECORD_TYPE_INFO)?;
        writer.write_i32(crate::constants::INFO_MACHINE_FLOAT)?;
        writer.write_i32(8)?;
        writer.write_i32(3)?;
        writer.write_f64(self.sysmis)?;
        writer.write_f64(self.highest)?;
        writer.write_f64(self.lowest)?;
        Ok(())
    }
}
