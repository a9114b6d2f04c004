use std::io::{Read, Write};

use crate::error::Result;
use crate::io_utils::{SavReader, SavWriter};

/// Subtype 3: Machine integer information.
#[derive(Debug, Clone)]
pub struct IntegerInfo {
    pub version_major: i32,
    pub version_minor: i32,
    pub version_revision: i32,
    pub machine_code: i32,
    /// Floating point representation: 1=IEEE, 2=IBM, 3=VAX.
    pub floating_point_rep: i32,
    pub compression_code: i32,
    /// Endianness: 1=big, 2=little.
    pub endianness: i32,
    /// IANA character code page number (e.g., 65001=UTF-8, 1252=Windows-1252).
    pub character_code: i32,
}

impl IntegerInfo {
    pub fn parse<R: Read>(reader: &mut SavReader<R>) -> Result<IntegerInfo> {
        Ok(IntegerInfo {
            version_major: reader.read_i32()?,
            version_minor: reader.read_i32()?,
            version_revision: reader.read_i32()?,
            machine_code: reader.read_i32()?,
            floating_point_rep: reader.read_i32()?,
            compression_code: reader.read_i32()?,
            endianness: reader.read_i32()?,
            character_code: reader.read_i32()?,
        })
    }

    /// Write this record, including its type-7 header
    /// (subtype 3, element size 4, 8 elements).
    pub fn write<W: Write>(&self, writer: &mut SavWriter<W>) -> Result<()> {
        writer.write_i32(crate::constants::RECORD_TYPE_INFO)?;
        writer.write_i32(crate::constants::INFO_MACHINE_INTEGER)?;
        writer.write_i32(4)?;
        writer.write_i32(8)?;
        writer.write_i32(self.version_major)?;
        writer.write_i32(self.version_minor)?;
        writer.write_i32(self.version_revision)?;
        writer.write_i32(self.machine_code)?;
        writer.write_i32(self.floating_point_rep)?;
        writer.write_i32(self.compression_code)?;
        writer.write_i32(self.endianness)?;
        writer.write_i32(self.character_code)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_parse_round_trip() {
        let info = IntegerInfo {
            version_major: 1,
            version_minor: 0,
            version_revision: 0,
            machine_code: 0,
            floating_point_rep: 1,
            compression_code: 1,
            endianness: 2,
            character_code: 3,
        };
        let mut buf = Vec::new();
        {
            let mut writer = SavWriter::new(&mut buf);
            info.write(&mut writer).unwrap();
        }
        let mut reader = SavReader::new(&buf[..]);
        assert_eq!(reader.read_i32().unwrap(), crate::constants::RECORD_TYPE_INFO);
        assert_eq!(reader.read_i32().unwrap(), crate::constants::INFO_MACHINE_INTEGER);
        assert_eq!(reader.read_i32().unwrap(), 4);
        assert_eq!(reader.read_i32().unwrap(), 8);
        let parsed = IntegerInfo::parse(&mut reader).unwrap();
        assert_eq!(parsed.endianness, 2);
        assert_eq!(parsed.character_code, 3);
    }
}
