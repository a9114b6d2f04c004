//! On-disk tag-3 (value labels) + tag-4 (value label variables) record
//! codec (spec.md §4.3). A tag-3 record is always immediately followed by
//! exactly one tag-4 record; together they say "these labels apply to
//! these variables". The tag-4 indices are 1-based positions into the
//! *segment* space (spec.md §3: the same numbering used for case layout),
//! not into the variable list, since a multi-segment string variable's
//! continuations still occupy index slots; resolving a segment index back
//! to its owning variable is [`crate::dictionary`]'s job.

use std::io::{Read, Write};

use crate::error::{Result, SpssError};
use crate::io_utils::{self, SavReader, SavWriter};

/// One value/label pair, value still in raw 8-byte on-disk form.
#[derive(Debug, Clone)]
pub struct RawValueLabel {
    pub value_bytes: [u8; 8],
    pub label: String,
}

/// Parse a type-3 record body (the record-type tag has already been read).
pub fn parse_value_labels<R: Read>(reader: &mut SavReader<R>) -> Result<Vec<RawValueLabel>> {
    let count = reader.read_i32()? as usize;
    let mut labels = Vec::with_capacity(count);

    for _ in 0..count {
        let value_bytes = reader.read_8_bytes()?;

        let mut label_len_buf = [0u8; 1];
        reader.read_exact(&mut label_len_buf)?;
        let label_len = label_len_buf[0] as usize;

        // The length byte plus the label text together pad to a multiple
        // of 8; `padded_label_len` is what remains to read after the byte
        // already consumed above.
        let padded_label_len = io_utils::round_up(label_len + 1, 8) - 1;
        let label_data = reader.read_bytes(padded_label_len)?;
        let label = crate::encoding::decode_str_lossy(&label_data[..label_len]).into_owned();

        labels.push(RawValueLabel { value_bytes, label });
    }

    Ok(labels)
}

/// Write a type-3 record body, including the `RECORD_TYPE_VALUE_LABEL` tag.
pub fn write_value_labels<W: Write>(writer: &mut SavWriter<W>, labels: &[RawValueLabel]) -> Result<()> {
    writer.write_i32(crate::constants::RECORD_TYPE_VALUE_LABEL)?;
    writer.write_i32(labels.len() as i32)?;
    for entry in labels {
        writer.write_8_bytes(&entry.value_bytes)?;
        let label_bytes = crate::encoding::encode_str(&entry.label);
        let label_len = label_bytes.len().min(255);
        writer.write_bytes(&[label_len as u8])?;
        let padded_label_len = io_utils::round_up(label_len + 1, 8) - 1;
        let mut buf = vec![b' '; padded_label_len];
        buf[..label_len].copy_from_slice(&label_bytes[..label_len]);
        writer.write_bytes(&buf)?;
    }
    Ok(())
}

/// Parse a type-4 record body. Returns 0-based segment indices.
pub fn parse_value_label_segments<R: Read>(reader: &mut SavReader<R>) -> Result<Vec<usize>> {
    let count = reader.read_i32()? as usize;

    if count == 0 {
        return Err(SpssError::CorruptRecord {
            tag: 4,
            detail: "type-4 record lists zero variables".to_string(),
        });
    }

    let mut indices = Vec::with_capacity(count);
    for _ in 0..count {
        let index = reader.read_i32()?;
        if index < 1 {
            return Err(SpssError::CorruptRecord {
                tag: 4,
                detail: format!("non-positive segment index {index} in type-4 record"),
            });
        }
        indices.push((index - 1) as usize);
    }

    Ok(indices)
}

/// Write a type-4 record body, including its `RECORD_TYPE_VALUE_LABEL_VARS`
/// tag. `segment_indices` are 0-based and converted to the on-disk 1-based
/// form here.
pub fn write_value_label_segments<W: Write>(
    writer: &mut SavWriter<W>,
    segment_indices: &[usize],
) -> Result<()> {
    writer.write_i32(crate::constants::RECORD_TYPE_VALUE_LABEL_VARS)?;
    writer.write_i32(segment_indices.len() as i32)?;
    for &idx in segment_indices {
        writer.write_i32(idx as i32 + 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_labels() {
        let mut buf = Vec::new();

        buf.extend_from_slice(&2_i32.to_le_bytes());

        buf.extend_from_slice(&1.0_f64.to_le_bytes());
        buf.push(4);
        buf.extend_from_slice(b"Male");
        buf.extend_from_slice(&[0u8; 3]);

        buf.extend_from_slice(&2.0_f64.to_le_bytes());
        buf.push(6);
        buf.extend_from_slice(b"Female");
        buf.push(0);

        let mut reader = SavReader::new(&buf[..]);
        let labels = parse_value_labels(&mut reader).unwrap();

        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].label, "Male");
        assert_eq!(f64::from_le_bytes(labels[0].value_bytes), 1.0);
        assert_eq!(labels[1].label, "Female");
    }

    #[test]
    fn test_parse_value_label_segments() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&3_i32.to_le_bytes());
        buf.extend_from_slice(&1_i32.to_le_bytes());
        buf.extend_from_slice(&5_i32.to_le_bytes());
        buf.extend_from_slice(&10_i32.to_le_bytes());

        let mut reader = SavReader::new(&buf[..]);
        let indices = parse_value_label_segments(&mut reader).unwrap();

        assert_eq!(indices, vec![0, 4, 9]);
    }

    #[test]
    fn test_zero_variables_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0_i32.to_le_bytes());
        let mut reader = SavReader::new(&buf[..]);
        let err = parse_value_label_segments(&mut reader).unwrap_err();
        assert!(matches!(err, SpssError::CorruptRecord { tag: 4, .. }));
    }

    #[test]
    fn test_write_then_parse_round_trip() {
        let mut buf = Vec::new();
        let labels = vec![
            RawValueLabel {
                value_bytes: 1.0_f64.to_le_bytes(),
                label: "Male".to_string(),
            },
            RawValueLabel {
                value_bytes: 2.0_f64.to_le_bytes(),
                label: "Female".to_string(),
            },
        ];
        {
            let mut writer = SavWriter::new(&mut buf);
            write_value_labels(&mut writer, &labels).unwrap();
            write_value_label_segments(&mut writer, &[0, 2]).unwrap();
        }

        let mut reader = SavReader::new(&buf[..]);
        assert_eq!(reader.read_i32().unwrap(), crate::constants::RECORD_TYPE_VALUE_LABEL);
        let parsed = parse_value_labels(&mut reader).unwrap();
        assert_eq!(parsed[0].label, "Male");
        assert_eq!(parsed[1].label, "Female");

        assert_eq!(
            reader.read_i32().unwrap(),
            crate::constants::RECORD_TYPE_VALUE_LABEL_VARS
        );
        let segments = parse_value_label_segments(&mut reader).unwrap();
        assert_eq!(segments, vec![0, 2]);
    }
}
