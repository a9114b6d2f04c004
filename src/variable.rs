//! On-disk tag-2 (variable) record codec (spec.md §4.3).
//!
//! A single logical variable can span several tag-2 records: the "head"
//! record carries the real metadata, and each extra 8-byte segment of a
//! long string variable is represented by its own "continuation" record
//! (`raw_type == -1`, blank name, no label, no missing values, zero
//! formats). [`VariableRecord`] is the raw, per-record shape; stitching
//! continuations back onto their head and producing a [`crate::model::Variable`]
//! is [`crate::dictionary`]'s job.

use std::io::{Read, Write};

use crate::constants::{SpssFormat, VarType};
use crate::error::{Result, SpssError};
use crate::io_utils::{self, SavReader, SavWriter};
use crate::model::Value;

/// Continuation marker for `raw_type` (spec.md §4.3).
pub const CONTINUATION_RAW_TYPE: i32 = -1;

/// One parsed tag-2 record, head or continuation.
#[derive(Debug, Clone)]
pub struct VariableRecord {
    /// `0` = numeric, `>0` = string width, `-1` = continuation.
    pub raw_type: i32,
    pub short_name: String,
    pub label: Option<String>,
    pub print_format: SpssFormat,
    pub write_format: SpssFormat,
    pub missing: RawMissing,
}

/// Missing-value spec as read straight off the wire: the variable's
/// storage type is not known yet while parsing an individual record (it's
/// folded in by the caller once all segments are stitched together), so
/// this carries the raw signed count and raw values rather than a resolved
/// [`crate::model::Missing`].
#[derive(Debug, Clone)]
pub struct RawMissing {
    pub n_missing_code: i32,
    pub numeric_values: Vec<f64>,
    pub string_values: Vec<[u8; 8]>,
}

impl RawMissing {
    fn none() -> RawMissing {
        RawMissing {
            n_missing_code: 0,
            numeric_values: Vec::new(),
            string_values: Vec::new(),
        }
    }
}

impl VariableRecord {
    /// Parse a type-2 record body (the record-type tag itself has already
    /// been consumed by the caller).
    pub fn parse<R: Read>(reader: &mut SavReader<R>) -> Result<VariableRecord> {
        let raw_type = reader.read_i32()?;
        let has_var_label = reader.read_i32()?;
        let n_missing_code = reader.read_i32()?;
        let print_packed = reader.read_i32()?;
        let write_packed = reader.read_i32()?;

        let name_bytes = reader.read_bytes(8)?;
        let short_name =
            io_utils::bytes_to_string_lossy(io_utils::trim_trailing_padding(&name_bytes))
                .to_ascii_uppercase();

        let label = if has_var_label == 1 {
            let label_len = reader.read_i32()? as usize;
            let padded_len = io_utils::round_up(label_len, 4);
            let label_bytes = reader.read_bytes(padded_len)?;
            Some(io_utils::bytes_to_string_lossy(&label_bytes[..label_len]))
        } else {
            None
        };

        // spec.md §4.3: n_missing_values of -1 never appears on the wire.
        if n_missing_code == -1 {
            return Err(SpssError::CorruptRecord {
                tag: 2,
                detail: "n_missing_values of -1 is not a legal value".to_string(),
            });
        }
        if !(-3..=3).contains(&n_missing_code) {
            return Err(SpssError::CorruptRecord {
                tag: 2,
                detail: format!("n_missing_values {n_missing_code} out of range [-3, 3]"),
            });
        }

        let missing = if raw_type == 0 {
            let abs_n = n_missing_code.unsigned_abs() as usize;
            let mut numeric_values = Vec::with_capacity(abs_n);
            for _ in 0..abs_n {
                numeric_values.push(reader.read_f64()?);
            }
            RawMissing {
                n_missing_code,
                numeric_values,
                string_values: Vec::new(),
            }
        } else if raw_type > 0 {
            if n_missing_code < 0 {
                return Err(SpssError::CorruptRecord {
                    tag: 2,
                    detail: "missing-value ranges are not valid on string variables".to_string(),
                });
            }
            let abs_n = n_missing_code as usize;
            let mut string_values = Vec::with_capacity(abs_n);
            for _ in 0..abs_n {
                string_values.push(reader.read_8_bytes()?);
            }
            RawMissing {
                n_missing_code,
                numeric_values: Vec::new(),
                string_values,
            }
        } else {
            // continuation record: no missing values ever present.
            RawMissing::none()
        };

        let print_format = SpssFormat::from_packed(print_packed).ok_or_else(|| {
            SpssError::BadFormatSpec {
                format_type: ((print_packed as u32 >> 16) & 0xFF) as u8,
                width: ((print_packed as u32 >> 8) & 0xFF) as u8,
                decimals: (print_packed as u32 & 0xFF) as u8,
            }
        })?;
        let write_format = SpssFormat::from_packed(write_packed).ok_or_else(|| {
            SpssError::BadFormatSpec {
                format_type: ((write_packed as u32 >> 16) & 0xFF) as u8,
                width: ((write_packed as u32 >> 8) & 0xFF) as u8,
                decimals: (write_packed as u32 & 0xFF) as u8,
            }
        })?;

        Ok(VariableRecord {
            raw_type,
            short_name,
            label,
            print_format,
            write_format,
            missing,
        })
    }

    /// Write a head record for a numeric or string variable.
    pub fn write<W: Write>(
        writer: &mut SavWriter<W>,
        raw_type: i32,
        short_name: &str,
        label: Option<&str>,
        print_format: SpssFormat,
        write_format: SpssFormat,
        missing: &RawMissing,
    ) -> Result<()> {
        writer.write_i32(crate::constants::RECORD_TYPE_VARIABLE)?;
        writer.write_i32(raw_type)?;
        writer.write_i32(if label.is_some() { 1 } else { 0 })?;
        writer.write_i32(missing.n_missing_code)?;
        writer.write_i32(print_format.to_packed())?;
        writer.write_i32(write_format.to_packed())?;
        writer.write_fixed_string(short_name.as_bytes(), 8)?;

        if let Some(label) = label {
            let label_bytes = label.as_bytes();
            writer.write_i32(label_bytes.len() as i32)?;
            let padded_len = io_utils::round_up(label_bytes.len(), 4);
            let mut buf = vec![0u8; padded_len];
            buf[..label_bytes.len()].copy_from_slice(label_bytes);
            writer.write_bytes(&buf)?;
        }

        for v in &missing.numeric_values {
            writer.write_f64(*v)?;
        }
        for v in &missing.string_values {
            writer.write_8_bytes(v)?;
        }

        Ok(())
    }

    /// Write a continuation record for one extra segment of a long string.
    pub fn write_continuation<W: Write>(writer: &mut SavWriter<W>) -> Result<()> {
        writer.write_i32(crate::constants::RECORD_TYPE_VARIABLE)?;
        writer.write_i32(CONTINUATION_RAW_TYPE)?;
        writer.write_i32(0)?; // has_var_label
        writer.write_i32(0)?; // n_missing_values
        writer.write_i32(0)?; // print format
        writer.write_i32(0)?; // write format
        writer.write_fixed_string(b"", 8)?;
        Ok(())
    }
}

/// Convert a [`RawMissing`] plus the variable's resolved type into
/// [`crate::model::Missing`].
pub fn resolve_missing(raw: &RawMissing, var_type: VarType) -> Result<crate::model::Missing> {
    use crate::model::Missing;

    if raw.n_missing_code == 0 {
        return Ok(Missing::None);
    }

    match var_type {
        VarType::Numeric => match raw.n_missing_code {
            -2 => Ok(Missing::Range(raw.numeric_values[0], raw.numeric_values[1])),
            -3 => Ok(Missing::RangeAndDiscrete(
                raw.numeric_values[0],
                raw.numeric_values[1],
                Value::Numeric(raw.numeric_values[2]),
            )),
            n if n > 0 => Ok(Missing::Discrete(
                raw.numeric_values.iter().map(|v| Value::Numeric(*v)).collect(),
            )),
            other => Err(SpssError::CorruptRecord {
                tag: 2,
                detail: format!("unexpected n_missing_values {other} for numeric variable"),
            }),
        },
        VarType::String(_) => {
            let values = raw
                .string_values
                .iter()
                .map(|bytes| {
                    Value::Str(
                        crate::encoding::decode_str_lossy(io_utils::trim_trailing_padding(bytes))
                            .into_owned(),
                    )
                })
                .collect();
            Ok(Missing::Discrete(values))
        }
    }
}

/// Convert a resolved [`crate::model::Missing`] back into on-disk form.
pub fn raw_missing_from_model(missing: &crate::model::Missing) -> RawMissing {
    use crate::model::Missing;

    match missing {
        Missing::None => RawMissing::none(),
        Missing::Discrete(values) => {
            let mut raw = RawMissing::none();
            raw.n_missing_code = values.len() as i32;
            for v in values {
                match v {
                    Value::Numeric(n) => raw.numeric_values.push(*n),
                    Value::Str(s) => {
                        let mut bytes = [b' '; 8];
                        let enc = crate::encoding::encode_str(s);
                        let n = enc.len().min(8);
                        bytes[..n].copy_from_slice(&enc[..n]);
                        raw.string_values.push(bytes);
                    }
                }
            }
            raw
        }
        Missing::Range(low, high) => RawMissing {
            n_missing_code: -2,
            numeric_values: vec![*low, *high],
            string_values: Vec::new(),
        },
        Missing::RangeAndDiscrete(low, high, v) => RawMissing {
            n_missing_code: -3,
            numeric_values: vec![*low, *high, v.as_numeric().unwrap_or(0.0)],
            string_values: Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_variable_bytes(var_type: i32, name: &[u8; 8], has_label: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&var_type.to_le_bytes());
        buf.extend_from_slice(&(if has_label { 1_i32 } else { 0_i32 }).to_le_bytes());
        buf.extend_from_slice(&0_i32.to_le_bytes());
        let print_fmt: i32 = (5 << 16) | (8 << 8) | 2;
        buf.extend_from_slice(&print_fmt.to_le_bytes());
        buf.extend_from_slice(&print_fmt.to_le_bytes());
        buf.extend_from_slice(name);

        if has_label {
            let label = b"Test label";
            let label_len = label.len() as i32;
            buf.extend_from_slice(&label_len.to_le_bytes());
            buf.extend_from_slice(label);
            let padding = io_utils::round_up(label.len(), 4) - label.len();
            buf.extend_from_slice(&vec![0u8; padding]);
        }

        buf
    }

    #[test]
    fn test_parse_numeric_variable() {
        let data = make_variable_bytes(0, b"AGE     ", false);
        let mut reader = SavReader::new(&data[..]);
        let var = VariableRecord::parse(&mut reader).unwrap();

        assert_eq!(var.short_name, "AGE");
        assert_eq!(var.raw_type, 0);
        assert!(var.label.is_none());
        assert_eq!(var.print_format.to_spss_string(), "F8.2");
    }

    #[test]
    fn test_parse_string_variable() {
        let data = make_variable_bytes(20, b"NAME    ", false);
        let mut reader = SavReader::new(&data[..]);
        let var = VariableRecord::parse(&mut reader).unwrap();

        assert_eq!(var.short_name, "NAME");
        assert_eq!(var.raw_type, 20);
    }

    #[test]
    fn test_parse_variable_with_label() {
        let data = make_variable_bytes(0, b"SCORE   ", true);
        let mut reader = SavReader::new(&data[..]);
        let var = VariableRecord::parse(&mut reader).unwrap();

        assert_eq!(var.label.as_deref(), Some("Test label"));
    }

    #[test]
    fn test_continuation_record() {
        let data = make_variable_bytes(-1, b"        ", false);
        let mut reader = SavReader::new(&data[..]);
        let var = VariableRecord::parse(&mut reader).unwrap();

        assert_eq!(var.raw_type, CONTINUATION_RAW_TYPE);
    }

    #[test]
    fn test_n_missing_of_negative_one_is_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0_i32.to_le_bytes()); // numeric
        buf.extend_from_slice(&0_i32.to_le_bytes()); // no label
        buf.extend_from_slice(&(-1_i32).to_le_bytes()); // illegal n_missing
        buf.extend_from_slice(&0_i32.to_le_bytes());
        buf.extend_from_slice(&0_i32.to_le_bytes());
        buf.extend_from_slice(b"X       ");

        let mut reader = SavReader::new(&buf[..]);
        let err = VariableRecord::parse(&mut reader).unwrap_err();
        assert!(matches!(err, SpssError::CorruptRecord { tag: 2, .. }));
    }

    #[test]
    fn test_write_then_parse_round_trip() {
        let mut buf = Vec::new();
        let missing = RawMissing {
            n_missing_code: 2,
            numeric_values: vec![-1.0, -2.0],
            string_values: Vec::new(),
        };
        {
            let mut writer = SavWriter::new(&mut buf);
            VariableRecord::write(
                &mut writer,
                0,
                "AGE",
                Some("Age in years"),
                SpssFormat::from_packed((5 << 16) | (8 << 8) | 0).unwrap(),
                SpssFormat::from_packed((5 << 16) | (8 << 8) | 0).unwrap(),
                &missing,
            )
            .unwrap();
        }
        let mut reader = SavReader::new(&buf[..]);
        assert_eq!(reader.read_i32().unwrap(), crate::constants::RECORD_TYPE_VARIABLE);
        let var = VariableRecord::parse(&mut reader).unwrap();
        assert_eq!(var.short_name, "AGE");
        assert_eq!(var.label.as_deref(), Some("Age in years"));
        assert_eq!(var.missing.numeric_values, vec![-1.0, -2.0]);
    }

    #[test]
    fn test_resolve_missing_range_and_discrete() {
        let raw = RawMissing {
            n_missing_code: -3,
            numeric_values: vec![0.0, 10.0, 99.0],
            string_values: Vec::new(),
        };
        let resolved = resolve_missing(&raw, VarType::Numeric).unwrap();
        assert_eq!(
            resolved,
            crate::model::Missing::RangeAndDiscrete(0.0, 10.0, Value::Numeric(99.0))
        );
    }
}
