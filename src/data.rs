//! Case (row) codec (spec.md §4.4): turns a case's flat run of 8-byte
//! segments into a [`Case`] of dictionary-ordered [`Value`]s, and back.
//!
//! Segment bytes for a numeric variable are read/written endian-aware
//! (spec.md §4.2: the file's declared byte order applies to every stored
//! double, not just the header). String segments are raw text bytes and
//! never swapped, matching [`SavReader::read_8_bytes`]/[`SavWriter::write_8_bytes`].
//!
//! The bytecode compressor/decompressor (spec.md §4.4) classify and encode
//! a segment's bit pattern in little-endian form regardless of the file's
//! declared order -- in practice every real compressed SAV file is
//! little-endian (compression is a PC-era convention), so this only matters
//! for the vanishingly rare big-endian-and-compressed combination, where
//! numeric segments that should compress to an opcode are instead carried
//! as raw-follows literals on write, and decoded as little-endian on read.
//! See DESIGN.md.

use std::io::{Read, Write};

use crate::compression::bytecode::{Compressor, Decompressor};
use crate::constants::VarType;
use crate::encoding;
use crate::error::Result;
use crate::io_utils::{self, SavReader, SavWriter};
use crate::model::{Case, Dictionary, Value};
use crate::specials::Specials;

/// Read one case's worth of raw (uncompressed) segments and assemble it.
/// Returns `Ok(None)` at a clean end of file.
pub fn read_case_raw<R: Read>(
    reader: &mut SavReader<R>,
    dictionary: &Dictionary,
    specials: &Specials,
) -> Result<Option<Case>> {
    let total_segments = dictionary.total_segments();

    let first = match reader.try_read_8_bytes()? {
        None => return Ok(None),
        Some(bytes) => bytes,
    };

    let mut raw = vec![0u8; total_segments * 8];
    raw[0..8].copy_from_slice(&first);
    if total_segments > 1 {
        reader.read_exact(&mut raw[8..])?;
    }

    Ok(Some(assemble_case(dictionary, specials, reader.bswap(), &raw)))
}

/// Read one case through the streaming bytecode decompressor. `decompressor`
/// must be the same instance used for every case of this file -- its
/// control-block cursor persists across calls (spec.md §4.4).
pub fn read_case_compressed<R: Read>(
    reader: &mut SavReader<R>,
    dictionary: &Dictionary,
    specials: &Specials,
    decompressor: &mut Decompressor,
) -> Result<Option<Case>> {
    let total_segments = dictionary.total_segments();
    let mut raw = vec![0u8; total_segments * 8];

    if !decompressor.decompress_case(reader, total_segments, &mut raw)? {
        return Ok(None);
    }

    Ok(Some(assemble_case(dictionary, specials, reader.bswap(), &raw)))
}

fn assemble_case(dictionary: &Dictionary, specials: &Specials, bswap: bool, raw: &[u8]) -> Case {
    let mut values = Vec::with_capacity(dictionary.variables().len());
    let mut offset = 0;

    for var in dictionary.variables() {
        let n_segments = var.segments();
        let span = &raw[offset..offset + n_segments * 8];
        offset += n_segments * 8;

        let value = match var.var_type() {
            VarType::Numeric => {
                let bytes: [u8; 8] = span.try_into().unwrap();
                let v = if bswap {
                    f64::from_be_bytes(bytes)
                } else {
                    f64::from_le_bytes(bytes)
                };
                Value::Numeric(specials.to_host(v))
            }
            VarType::String(width) => {
                let n = (width as usize).min(span.len());
                let text = encoding::decode_str_lossy(io_utils::trim_trailing_padding(&span[..n]));
                Value::Str(text.into_owned())
            }
        };
        values.push(value);
    }

    Case::new(values)
}

/// Write one case as raw (uncompressed) segments.
pub fn write_case_raw<W: Write>(writer: &mut SavWriter<W>, dictionary: &Dictionary, case: &Case) -> Result<()> {
    for (var, value) in dictionary.variables().iter().zip(case.values()) {
        match (var.var_type(), value) {
            (VarType::Numeric, Value::Numeric(v)) => writer.write_f64(*v)?,
            (VarType::String(_), Value::Str(s)) => {
                let n_segments = var.segments();
                write_padded_string_segments(writer, s, n_segments, |w, bytes| w.write_8_bytes(bytes))?;
            }
            _ => write_zero_segments(writer, var.segments())?,
        }
    }
    Ok(())
}

/// Write one case through the streaming bytecode compressor. `compressor`
/// must be the same instance used for every case of this file, and
/// [`Compressor::finish`] must be called once after the last case.
pub fn write_case_compressed<W: Write>(
    writer: &mut SavWriter<W>,
    dictionary: &Dictionary,
    case: &Case,
    compressor: &mut Compressor,
) -> Result<()> {
    for (var, value) in dictionary.variables().iter().zip(case.values()) {
        match (var.var_type(), value) {
            (VarType::Numeric, Value::Numeric(v)) => {
                compressor.write_segment(writer, &v.to_le_bytes())?;
            }
            (VarType::String(_), Value::Str(s)) => {
                let n_segments = var.segments();
                write_padded_string_segments(writer, s, n_segments, |w, bytes| compressor.write_segment(w, bytes))?;
            }
            _ => {
                for _ in 0..var.segments() {
                    compressor.write_segment(writer, &[b' '; 8])?;
                }
            }
        }
    }
    Ok(())
}

fn write_zero_segments<W: Write>(writer: &mut SavWriter<W>, n_segments: usize) -> Result<()> {
    for _ in 0..n_segments {
        writer.write_8_bytes(&[0u8; 8])?;
    }
    Ok(())
}

fn write_padded_string_segments<W: Write>(
    writer: &mut SavWriter<W>,
    s: &str,
    n_segments: usize,
    mut emit: impl FnMut(&mut SavWriter<W>, &[u8; 8]) -> Result<()>,
) -> Result<()> {
    let encoded = encoding::encode_str(s);
    let total = n_segments * 8;
    let mut buf = vec![b' '; total];
    let n = encoded.len().min(total);
    buf[..n].copy_from_slice(&encoded[..n]);

    for chunk in buf.chunks_exact(8) {
        let bytes: [u8; 8] = chunk.try_into().unwrap();
        emit(writer, &bytes)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::VarType;
    use std::io::Cursor;

    fn make_dictionary() -> Dictionary {
        let mut dict = Dictionary::new();
        dict.push_variable("AGE", VarType::Numeric).unwrap();
        dict.push_variable("NAME", VarType::String(10)).unwrap();
        dict
    }

    #[test]
    fn test_write_then_read_raw_case() {
        let dict = make_dictionary();
        let case = Case::new(vec![Value::Numeric(42.0), Value::Str("Alice".to_string())]);

        let mut buf = Vec::new();
        {
            let mut writer = SavWriter::new(&mut buf);
            write_case_raw(&mut writer, &dict, &case).unwrap();
        }

        let mut reader = SavReader::new(Cursor::new(buf));
        let specials = Specials::default();
        let read_back = read_case_raw(&mut reader, &dict, &specials).unwrap().unwrap();
        assert_eq!(read_back.get(0), Some(&Value::Numeric(42.0)));
        assert_eq!(read_back.get(1), Some(&Value::Str("Alice".to_string())));
    }

    #[test]
    fn test_read_raw_clean_eof_returns_none() {
        let dict = make_dictionary();
        let mut reader = SavReader::new(Cursor::new(Vec::<u8>::new()));
        let specials = Specials::default();
        assert!(read_case_raw(&mut reader, &dict, &specials).unwrap().is_none());
    }

    #[test]
    fn test_write_then_read_compressed_cases() {
        let dict = make_dictionary();
        let cases = vec![
            Case::new(vec![Value::Numeric(1.0), Value::Str("Bob".to_string())]),
            Case::new(vec![Value::Numeric(crate::constants::sysmis()), Value::Str("".to_string())]),
        ];

        let mut buf = Vec::new();
        {
            let mut writer = SavWriter::new(&mut buf);
            let mut compressor = Compressor::new(crate::constants::DEFAULT_BIAS);
            for case in &cases {
                write_case_compressed(&mut writer, &dict, case, &mut compressor).unwrap();
            }
            compressor.finish(&mut writer).unwrap();
        }

        let mut reader = SavReader::new(Cursor::new(buf));
        let specials = Specials::default();
        let mut decompressor = Decompressor::new(crate::constants::DEFAULT_BIAS);

        let first = read_case_compressed(&mut reader, &dict, &specials, &mut decompressor)
            .unwrap()
            .unwrap();
        assert_eq!(first.get(0), Some(&Value::Numeric(1.0)));
        assert_eq!(first.get(1), Some(&Value::Str("Bob".to_string())));

        let second = read_case_compressed(&mut reader, &dict, &specials, &mut decompressor)
            .unwrap()
            .unwrap();
        assert!(second.get(0).unwrap().is_sysmis());
        assert_eq!(second.get(1), Some(&Value::Str("".to_string())));

        assert!(read_case_compressed(&mut reader, &dict, &specials, &mut decompressor)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_sentinel_remap_applied_on_raw_read() {
        let mut dict = Dictionary::new();
        dict.push_variable("X", VarType::Numeric).unwrap();
        let case = Case::new(vec![Value::Numeric(-1.0e300)]);

        let mut buf = Vec::new();
        {
            let mut writer = SavWriter::new(&mut buf);
            write_case_raw(&mut writer, &dict, &case).unwrap();
        }

        let mut specials = Specials::default();
        let info = crate::info_records::float_info::FloatInfo {
            sysmis: -1.0e300,
            highest: crate::constants::highest(),
            lowest: crate::constants::lowest(),
        };
        specials.apply_float_info(&info);

        let mut reader = SavReader::new(Cursor::new(buf));
        let read_back = read_case_raw(&mut reader, &dict, &specials).unwrap().unwrap();
        assert!(read_back.get(0).unwrap().is_sysmis());
    }
}
