//! Dictionary section codec: reads/writes everything between the file
//! header and the first case (spec.md §4.3) -- tag 2 (variables), tag 3+4
//! (value labels), tag 6 (documents), tag 7 (machine info, display info,
//! long names), and the tag 999 terminator -- assembling or disassembling
//! a [`crate::model::Dictionary`].

use std::io::{Read, Write};

use crate::constants::{self, RECORD_TYPE_DICT_TERMINATION, VarType};
use crate::error::{Result, SpssError};
use crate::header::FileHeader;
use crate::info_records::{
    self, InfoRecord, InfoRecordHeader, float_info::FloatInfo, integer_info::IntegerInfo,
    long_var_names, var_display,
};
use crate::io_utils::{SavReader, SavWriter};
use crate::model::{Dictionary, Value};
use crate::specials::Specials;
use crate::value_labels::{self, RawValueLabel};
use crate::variable::VariableRecord;
use crate::warning::Warning;
use crate::{document, encoding};

/// Everything the dictionary section yields besides the variables/labels
/// that land directly in the [`Dictionary`] itself.
pub struct ParsedDictionary {
    pub dictionary: Dictionary,
    pub specials: Specials,
}

/// Read the dictionary section, from right after the header through the
/// type-999 terminator (inclusive).
pub fn read_dictionary<R: Read>(
    reader: &mut SavReader<R>,
    header: &FileHeader,
    warnings: &mut Vec<Warning>,
) -> Result<ParsedDictionary> {
    let mut var_records: Vec<VariableRecord> = Vec::new();
    let mut value_label_blocks: Vec<(Vec<RawValueLabel>, Vec<usize>)> = Vec::new();
    let mut document_lines: Vec<Vec<u8>> = Vec::new();
    let mut integer_info: Option<IntegerInfo> = None;
    let mut float_info: Option<FloatInfo> = None;
    let mut var_display_entries: Vec<var_display::VarDisplayEntry> = Vec::new();
    let mut long_names: Vec<(String, String)> = Vec::new();

    loop {
        let record_type = reader.read_i32()?;

        match record_type {
            constants::RECORD_TYPE_VARIABLE => {
                let rec = VariableRecord::parse(reader)?;
                if rec.raw_type != crate::variable::CONTINUATION_RAW_TYPE
                    && !(0..=255).contains(&rec.raw_type)
                {
                    return Err(SpssError::CorruptRecord {
                        tag: 2,
                        detail: format!("variable type code {} out of range", rec.raw_type),
                    });
                }
                var_records.push(rec);
            }

            constants::RECORD_TYPE_VALUE_LABEL => {
                let labels = value_labels::parse_value_labels(reader)?;
                let next_type = reader.read_i32()?;
                if next_type != constants::RECORD_TYPE_VALUE_LABEL_VARS {
                    return Err(SpssError::CorruptRecord {
                        tag: 3,
                        detail: format!("expected a type-4 record next, found type {next_type}"),
                    });
                }
                let segments = value_labels::parse_value_label_segments(reader)?;
                value_label_blocks.push((labels, segments));
            }

            constants::RECORD_TYPE_VALUE_LABEL_VARS => {
                // A type-4 record is only ever valid immediately after the
                // type-3 record it belongs to (handled above); one seen at
                // the top level has no preceding label block to attach to.
                return Err(SpssError::OrphanedIndexRecord);
            }

            constants::RECORD_TYPE_DOCUMENT => {
                document_lines.extend(document::parse_document(reader)?);
            }

            constants::RECORD_TYPE_INFO => {
                let info_header = InfoRecordHeader::parse(reader)?;
                match info_records::parse_info_record(reader, &info_header)? {
                    InfoRecord::IntegerInfo(info) => integer_info = Some(info),
                    InfoRecord::FloatInfo(info) => float_info = Some(info),
                    InfoRecord::VarDisplay(entries) => var_display_entries = entries,
                    InfoRecord::MalformedVarDisplay => {
                        warnings.push(Warning::TruncatedVarDisplayBlock);
                    }
                    InfoRecord::LongNames(names) => long_names = names,
                    InfoRecord::Unknown { subtype } => {
                        warnings.push(Warning::UnknownExtensionSubtype(subtype));
                    }
                }
            }

            RECORD_TYPE_DICT_TERMINATION => {
                reader.read_i32()?; // filler, always 0
                break;
            }

            other => {
                return Err(SpssError::CorruptRecord {
                    tag: other,
                    detail: "unrecognized top-level record type in dictionary section".to_string(),
                });
            }
        }
    }

    let mut specials = Specials::default();
    if let Some(ref info) = integer_info {
        Specials::validate_integer_info(header.bswap, info)?;
    }
    if let Some(ref info) = float_info {
        if specials.apply_float_info(info) {
            warnings.push(Warning::SentinelMismatch);
        }
    }

    let mut dictionary = Dictionary::new();
    build_variables(&mut dictionary, &var_records, warnings)?;

    // Long-name application only renames variables in place; the reorder
    // it implies is applied last, since var display/value labels/weight
    // variable all key off the on-disk segment offsets of the original
    // (pre-reorder) variable order.
    let long_name_order = apply_long_names(&mut dictionary, &long_names);
    apply_var_display(&mut dictionary, &var_display_entries, warnings);
    apply_value_labels(&mut dictionary, &value_label_blocks, header.bswap)?;
    apply_weight_variable(&mut dictionary, header.weight_index)?;
    if !long_names.is_empty() {
        dictionary.reorder(&long_name_order)?;
    }

    if !header.file_label.trim().is_empty() {
        dictionary.set_file_label(Some(header.file_label.clone()));
    }
    if !document_lines.is_empty() {
        dictionary.set_documents(
            document_lines
                .iter()
                .map(|bytes| encoding::decode_str_lossy(bytes).into_owned())
                .collect(),
        );
    }

    Ok(ParsedDictionary {
        dictionary,
        specials,
    })
}

fn build_variables(
    dictionary: &mut Dictionary,
    var_records: &[VariableRecord],
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    let mut i = 0;
    while i < var_records.len() {
        let head = &var_records[i];
        if head.raw_type == crate::variable::CONTINUATION_RAW_TYPE {
            return Err(SpssError::CorruptRecord {
                tag: 2,
                detail: "continuation record seen without a preceding head record".to_string(),
            });
        }

        let var_type = if head.raw_type == 0 {
            VarType::Numeric
        } else {
            VarType::String(head.raw_type as u8)
        };
        let n_segments = var_type.n_segments();

        for offset in 1..n_segments {
            let cont = var_records.get(i + offset).ok_or_else(|| SpssError::CorruptRecord {
                tag: 2,
                detail: "long string variable is missing a continuation record".to_string(),
            })?;
            if cont.raw_type != crate::variable::CONTINUATION_RAW_TYPE {
                return Err(SpssError::CorruptRecord {
                    tag: 2,
                    detail: "expected a continuation record, found a new head record".to_string(),
                });
            }
        }

        let idx = dictionary.push_variable(&head.short_name, var_type)?;
        if head.short_name.starts_with('#') {
            warnings.push(Warning::ScratchVariableName(head.short_name.clone()));
        }

        let var = dictionary.variable_mut(idx);
        var.label = head.label.clone();
        var.print_format = head.print_format;
        var.write_format = head.write_format;
        let missing = crate::variable::resolve_missing(&head.missing, var_type)?;
        var.set_missing(missing)?;

        i += n_segments;
    }

    Ok(())
}

/// Apply subtype-13 long names, renaming each matched variable in place,
/// and return the variable-order permutation the blob's order implies
/// (spec.md §4.3: "reorder variables to match blob order for round-trip
/// stability", mirroring PSPP's `sfm-read.c` `dict_reorder_var`).
/// Variables named in the blob come first, in blob order; every other
/// variable follows, in its original relative order. The caller applies
/// this permutation via [`Dictionary::reorder`] only once every step that
/// keys off the original on-disk variable order has finished.
fn apply_long_names(dictionary: &mut Dictionary, long_names: &[(String, String)]) -> Vec<usize> {
    let mut named_order: Vec<usize> = Vec::new();
    for (short, long) in long_names {
        if let Some(idx) = dictionary.find_by_short_name(short) {
            // A malformed long name (bad characters, duplicate) is not
            // worth failing the whole read over; keep the short name.
            if dictionary.set_long_name(idx, Some(long.clone())).is_ok() {
                named_order.push(idx);
            }
        }
    }

    let n = dictionary.variables().len();
    let mut placed = vec![false; n];
    let mut perm = Vec::with_capacity(n);
    for idx in named_order {
        if !placed[idx] {
            placed[idx] = true;
            perm.push(idx);
        }
    }
    for (idx, was_placed) in placed.iter().enumerate() {
        if !was_placed {
            perm.push(idx);
        }
    }
    perm
}

fn apply_var_display(
    dictionary: &mut Dictionary,
    entries: &[var_display::VarDisplayEntry],
    warnings: &mut Vec<Warning>,
) {
    if entries.len() != dictionary.variables().len() {
        if !entries.is_empty() {
            warnings.push(Warning::TruncatedVarDisplayBlock);
        }
        return;
    }
    for (var, entry) in dictionary.variables_mut().iter_mut().zip(entries) {
        var.measure = entry.measure;
        var.display_width = entry.width;
        var.alignment = entry.alignment;
    }
}

fn apply_value_labels(
    dictionary: &mut Dictionary,
    blocks: &[(Vec<RawValueLabel>, Vec<usize>)],
    bswap: bool,
) -> Result<()> {
    for (labels, segment_indices) in blocks {
        for &segment_idx in segment_indices {
            let var_idx = dictionary
                .variables()
                .iter()
                .enumerate()
                .find(|(i, _)| dictionary.segment_offset(*i) == segment_idx)
                .map(|(i, _)| i)
                .ok_or(SpssError::OrphanedIndexRecord)?;

            let var_type = dictionary.variable(var_idx).var_type();
            for entry in labels {
                let value = raw_bytes_to_value(&entry.value_bytes, var_type, bswap);
                if dictionary
                    .variable_mut(var_idx)
                    .add_value_label(value, entry.label.clone())?
                {
                    // Overwrote an existing label for the same value; not
                    // fatal, just noted by the caller if it wants to.
                }
            }
        }
    }
    Ok(())
}

fn raw_bytes_to_value(bytes: &[u8; 8], var_type: VarType, bswap: bool) -> Value {
    match var_type {
        VarType::Numeric => {
            let v = if bswap {
                f64::from_be_bytes(*bytes)
            } else {
                f64::from_le_bytes(*bytes)
            };
            Value::Numeric(v)
        }
        VarType::String(width) => {
            let n = (width as usize).min(8);
            let text = encoding::decode_str_lossy(crate::io_utils::trim_trailing_padding(&bytes[..n]));
            Value::Str(text.into_owned())
        }
    }
}

fn apply_weight_variable(dictionary: &mut Dictionary, weight_index: i32) -> Result<()> {
    if weight_index <= 0 {
        return Ok(());
    }
    let target = (weight_index - 1) as usize;
    let idx = dictionary
        .variables()
        .iter()
        .enumerate()
        .find(|(i, _)| dictionary.segment_offset(*i) == target)
        .map(|(i, _)| i);
    match idx {
        Some(idx) => dictionary.set_weight_variable(Some(idx)),
        None => Err(SpssError::WeightInvalid(format!(
            "header weight index {weight_index} does not name any variable"
        ))),
    }
}

/// 1-based segment index for the header's `weight_index` field, `0` if unweighted.
pub fn weight_segment_index(dictionary: &Dictionary) -> i32 {
    dictionary
        .weight_variable()
        .map(|idx| dictionary.segment_offset(idx) as i32 + 1)
        .unwrap_or(0)
}

/// Write the whole dictionary section: variable records, value labels,
/// documents, and the machine-info/display/long-name extension records,
/// ending with the type-999 terminator.
pub fn write_dictionary<W: Write>(
    writer: &mut SavWriter<W>,
    dictionary: &Dictionary,
    compressed: bool,
) -> Result<()> {
    write_variable_records(writer, dictionary)?;
    write_value_label_blocks(writer, dictionary)?;

    if !dictionary.documents().is_empty() {
        document::write_documents(writer, dictionary.documents())?;
    }

    write_machine_info(writer, compressed)?;
    write_var_display_block(writer, dictionary)?;
    write_long_names_block(writer, dictionary)?;

    writer.write_i32(RECORD_TYPE_DICT_TERMINATION)?;
    writer.write_i32(0)?;
    Ok(())
}

fn write_variable_records<W: Write>(writer: &mut SavWriter<W>, dictionary: &Dictionary) -> Result<()> {
    for var in dictionary.variables() {
        let raw_type = match var.var_type() {
            VarType::Numeric => 0,
            VarType::String(width) => width as i32,
        };
        let missing = crate::variable::raw_missing_from_model(var.missing());
        VariableRecord::write(
            writer,
            raw_type,
            var.short_name(),
            var.label.as_deref(),
            var.print_format,
            var.write_format,
            &missing,
        )?;
        for _ in 1..var.segments() {
            VariableRecord::write_continuation(writer)?;
        }
    }
    Ok(())
}

fn write_value_label_blocks<W: Write>(writer: &mut SavWriter<W>, dictionary: &Dictionary) -> Result<()> {
    for (idx, var) in dictionary.variables().iter().enumerate() {
        if var.value_labels().is_empty() {
            continue;
        }
        let mut sorted: Vec<(&Value, &String)> = var.value_labels().iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let raw_labels: Vec<RawValueLabel> = sorted
            .iter()
            .map(|(value, label)| RawValueLabel {
                value_bytes: value_to_raw_bytes(value),
                label: (*label).clone(),
            })
            .collect();

        value_labels::write_value_labels(writer, &raw_labels)?;
        value_labels::write_value_label_segments(writer, &[dictionary.segment_offset(idx)])?;
    }
    Ok(())
}

fn value_to_raw_bytes(value: &Value) -> [u8; 8] {
    match value {
        Value::Numeric(v) => v.to_le_bytes(),
        Value::Str(s) => {
            let mut bytes = [b' '; 8];
            let encoded = encoding::encode_str(s);
            let n = encoded.len().min(8);
            bytes[..n].copy_from_slice(&encoded[..n]);
            bytes
        }
    }
}

fn write_machine_info<W: Write>(writer: &mut SavWriter<W>, compressed: bool) -> Result<()> {
    let integer_info = IntegerInfo {
        version_major: 1,
        version_minor: 0,
        version_revision: 0,
        machine_code: 0,
        floating_point_rep: 1,
        compression_code: if compressed { 1 } else { 0 },
        endianness: if cfg!(target_endian = "big") { 1 } else { 2 },
        character_code: 3,
    };
    integer_info.write(writer)?;

    let float_info = FloatInfo {
        sysmis: constants::sysmis(),
        highest: constants::highest(),
        lowest: constants::lowest(),
    };
    float_info.write(writer)?;
    Ok(())
}

fn write_var_display_block<W: Write>(writer: &mut SavWriter<W>, dictionary: &Dictionary) -> Result<()> {
    if dictionary.variables().is_empty() {
        return Ok(());
    }
    let entries: Vec<var_display::VarDisplayEntry> = dictionary
        .variables()
        .iter()
        .map(|var| var_display::VarDisplayEntry {
            measure: var.measure,
            width: var.display_width,
            alignment: var.alignment,
        })
        .collect();
    var_display::write_var_display(writer, &entries)
}

fn write_long_names_block<W: Write>(writer: &mut SavWriter<W>, dictionary: &Dictionary) -> Result<()> {
    let pairs: Vec<(String, String)> = dictionary
        .variables()
        .iter()
        .filter(|var| var.long_name().is_some())
        .map(|var| (var.short_name().to_string(), var.name().to_string()))
        .collect();
    if pairs.is_empty() {
        return Ok(());
    }
    long_var_names::write_long_var_names(writer, &pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::FileHeader;
    use std::io::Cursor;

    fn make_dictionary() -> Dictionary {
        let mut dict = Dictionary::new();
        let age = dict.push_variable("AGE", VarType::Numeric).unwrap();
        dict.variable_mut(age).label = Some("Age in years".to_string());
        dict.variable_mut(age)
            .add_value_label(Value::Numeric(99.0), "Refused".to_string())
            .unwrap();

        let name = dict.push_variable("NAME", VarType::String(20)).unwrap();
        dict.set_long_name(name, Some("RespondentName".to_string())).unwrap();

        dict.set_weight_variable(Some(age)).unwrap();
        dict.set_file_label(Some("Test file".to_string()));
        dict.set_documents(vec!["line one".to_string()]);

        dict
    }

    fn blank_header() -> FileHeader {
        FileHeader {
            magic: *b"$FL2",
            product: "test".to_string(),
            layout_code: 2,
            nominal_case_size: 0,
            compressed: false,
            weight_index: 0,
            ncases: -1,
            bias: 100.0,
            creation_date: String::new(),
            creation_time: String::new(),
            file_label: String::new(),
            bswap: false,
        }
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dict = make_dictionary();
        let mut buf = Vec::new();
        {
            let mut writer = SavWriter::new(&mut buf);
            write_dictionary(&mut writer, &dict, false).unwrap();
        }

        let mut header = blank_header();
        header.weight_index = weight_segment_index(&dict);

        let mut reader = SavReader::new(Cursor::new(buf));
        let mut warnings = Vec::new();
        let parsed = read_dictionary(&mut reader, &header, &mut warnings).unwrap();

        assert_eq!(parsed.dictionary.variables().len(), 2);
        assert_eq!(parsed.dictionary.variable(0).short_name(), "AGE");
        assert_eq!(parsed.dictionary.variable(0).label.as_deref(), Some("Age in years"));
        assert_eq!(
            parsed
                .dictionary
                .variable(0)
                .value_labels()
                .get(&Value::Numeric(99.0))
                .map(String::as_str),
            Some("Refused")
        );
        assert_eq!(parsed.dictionary.variable(1).name(), "RespondentName");
        assert_eq!(parsed.dictionary.weight_variable(), Some(0));
        assert_eq!(parsed.dictionary.file_label(), Some("Test file"));
        assert_eq!(parsed.dictionary.documents(), &["line one".to_string()]);
    }

    #[test]
    fn test_long_string_continuations_round_trip() {
        let mut dict = Dictionary::new();
        dict.push_variable("NOTES", VarType::String(40)).unwrap();
        assert_eq!(dict.variable(0).segments(), 5);

        let mut buf = Vec::new();
        {
            let mut writer = SavWriter::new(&mut buf);
            write_dictionary(&mut writer, &dict, false).unwrap();
        }

        let header = blank_header();
        let mut reader = SavReader::new(Cursor::new(buf));
        let mut warnings = Vec::new();
        let parsed = read_dictionary(&mut reader, &header, &mut warnings).unwrap();
        assert_eq!(parsed.dictionary.variables().len(), 1);
        assert_eq!(parsed.dictionary.variable(0).var_type(), VarType::String(40));
    }

    #[test]
    fn test_long_names_reorder_variables_to_blob_order() {
        let mut buf = Vec::new();
        {
            let mut writer = SavWriter::new(&mut buf);
            let fmt = crate::constants::SpssFormat {
                format_type: crate::constants::FormatType::F,
                width: 8,
                decimals: 2,
            };
            let missing = crate::variable::RawMissing {
                n_missing_code: 0,
                numeric_values: Vec::new(),
                string_values: Vec::new(),
            };
            VariableRecord::write(&mut writer, 0, "V1", None, fmt, fmt, &missing).unwrap();
            VariableRecord::write(&mut writer, 0, "V2", None, fmt, fmt, &missing).unwrap();

            // Value label on V1, which is at segment offset 0 in this
            // on-disk order.
            let labels = vec![RawValueLabel {
                value_bytes: 1.0_f64.to_le_bytes(),
                label: "one".to_string(),
            }];
            value_labels::write_value_labels(&mut writer, &labels).unwrap();
            value_labels::write_value_label_segments(&mut writer, &[0]).unwrap();

            // Long-name blob lists V2 before V1 -- the reverse of their
            // on-disk variable-record order.
            long_var_names::write_long_var_names(
                &mut writer,
                &[
                    ("V2".to_string(), "Beta".to_string()),
                    ("V1".to_string(), "Alpha".to_string()),
                ],
            )
            .unwrap();

            writer.write_i32(RECORD_TYPE_DICT_TERMINATION).unwrap();
            writer.write_i32(0).unwrap();
        }

        let mut header = blank_header();
        // V2 is segment offset 1, so its 1-based weight index is 2.
        header.weight_index = 2;

        let mut reader = SavReader::new(Cursor::new(buf));
        let mut warnings = Vec::new();
        let parsed = read_dictionary(&mut reader, &header, &mut warnings).unwrap();

        assert_eq!(parsed.dictionary.variables().len(), 2);
        assert_eq!(parsed.dictionary.variable(0).short_name(), "V2");
        assert_eq!(parsed.dictionary.variable(0).name(), "Beta");
        assert_eq!(parsed.dictionary.variable(1).short_name(), "V1");
        assert_eq!(parsed.dictionary.variable(1).name(), "Alpha");

        // The value label attached to V1's original on-disk position
        // follows V1 to its new position.
        assert_eq!(
            parsed
                .dictionary
                .variable(1)
                .value_labels()
                .get(&Value::Numeric(1.0))
                .map(String::as_str),
            Some("one")
        );

        // The weight variable, originally V2's segment offset, still
        // names V2 after the reorder.
        assert_eq!(parsed.dictionary.weight_variable(), Some(0));
    }

    #[test]
    fn test_orphaned_value_label_index_is_an_error() {
        let mut buf = Vec::new();
        {
            let mut writer = SavWriter::new(&mut buf);
            let labels = vec![RawValueLabel {
                value_bytes: 1.0_f64.to_le_bytes(),
                label: "one".to_string(),
            }];
            value_labels::write_value_labels(&mut writer, &labels).unwrap();
            value_labels::write_value_label_segments(&mut writer, &[7]).unwrap();
            writer.write_i32(RECORD_TYPE_DICT_TERMINATION).unwrap();
            writer.write_i32(0).unwrap();
        }

        let header = blank_header();
        let mut reader = SavReader::new(Cursor::new(buf));
        let mut warnings = Vec::new();
        let err = read_dictionary(&mut reader, &header, &mut warnings).unwrap_err();
        assert!(matches!(err, SpssError::OrphanedIndexRecord));
    }
}
