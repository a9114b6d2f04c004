//! Integration tests exercising the concrete scenarios from spec.md §8
//! end-to-end through the public `Reader`/`Writer` API.

use std::io::{Cursor, Seek, SeekFrom};

use savcodec::reader::Reader;
use savcodec::writer::{Writer, WriterOptions};
use savcodec::{Case, Dictionary, Missing, Value, VarType};

fn round_trip(dictionary: Dictionary, cases: &[Case], compress: bool) -> (Dictionary, Vec<Case>) {
    let options = WriterOptions {
        compress,
        ..WriterOptions::default()
    };
    let mut buf = Cursor::new(Vec::new());
    let mut writer = Writer::open(&mut buf, dictionary, options).unwrap();
    for case in cases {
        writer.write_case(case).unwrap();
    }
    writer.close().unwrap();

    let mut cursor = buf;
    cursor.seek(SeekFrom::Start(0)).unwrap();
    let mut reader = Reader::open(cursor).unwrap();
    let read_dict = reader.dictionary().clone();

    let mut read_cases = Vec::new();
    while let Some(case) = reader.read_case().unwrap() {
        read_cases.push(case);
    }
    (read_dict, read_cases)
}

#[test]
fn scenario_1_minimal_numeric_dict() {
    let mut dict = Dictionary::new();
    dict.push_variable("X", VarType::Numeric).unwrap();

    let cases = vec![
        Case::new(vec![Value::Numeric(1.0)]),
        Case::new(vec![Value::Numeric(2.5)]),
        Case::new(vec![Value::Numeric(savcodec::constants::sysmis())]),
    ];

    for compress in [false, true] {
        let (read_dict, read_cases) = round_trip(dict.clone(), &cases, compress);
        assert_eq!(read_dict.variables().len(), 1);
        assert_eq!(read_cases.len(), 3);
        assert_eq!(read_cases[0].get(0), Some(&Value::Numeric(1.0)));
        assert_eq!(read_cases[1].get(0), Some(&Value::Numeric(2.5)));
        assert!(read_cases[2].get(0).unwrap().is_sysmis());
    }
}

#[test]
fn scenario_2_long_string_variable_and_forbidden_value_labels() {
    let mut dict = Dictionary::new();
    let name = dict.push_variable("NAME", VarType::String(20)).unwrap();
    assert_eq!(dict.variable(name).segments(), 3);

    let err = dict
        .variable_mut(name)
        .add_value_label(Value::Str("X".to_string()), "bad".to_string())
        .unwrap_err();
    assert!(matches!(err, savcodec::SpssError::MissingValueNotAllowed { .. }));

    let cases = vec![Case::new(vec![Value::Str("Alice Cooper".to_string())])];
    let (read_dict, read_cases) = round_trip(dict, &cases, false);
    assert_eq!(read_dict.variable(0).var_type(), VarType::String(20));
    assert_eq!(read_cases[0].get(0), Some(&Value::Str("Alice Cooper".to_string())));
}

#[test]
fn scenario_3_compressed_opcode_coverage() {
    // Exercises opcodes 1..251 (numeric), 253 (raw-follows), 254 (spaces),
    // and 255 (SYSMIS) in one case.
    let mut dict = Dictionary::new();
    dict.push_variable("A", VarType::Numeric).unwrap();
    dict.push_variable("B", VarType::Numeric).unwrap();
    dict.push_variable("C", VarType::Numeric).unwrap();
    dict.push_variable("D", VarType::Numeric).unwrap();
    dict.push_variable("PAD", VarType::String(8)).unwrap();

    let cases = vec![Case::new(vec![
        Value::Numeric(42.0),
        Value::Numeric(99.0),
        Value::Numeric(savcodec::constants::sysmis()),
        Value::Numeric(-1e300),
        Value::Str("".to_string()),
    ])];

    let (_, read_cases) = round_trip(dict, &cases, true);
    assert_eq!(read_cases[0].get(0), Some(&Value::Numeric(42.0)));
    assert_eq!(read_cases[0].get(1), Some(&Value::Numeric(99.0)));
    assert!(read_cases[0].get(2).unwrap().is_sysmis());
    assert_eq!(read_cases[0].get(3), Some(&Value::Numeric(-1e300)));
    assert_eq!(read_cases[0].get(4), Some(&Value::Str("".to_string())));
}

#[test]
fn scenario_5_value_labels_across_two_variables() {
    let mut dict = Dictionary::new();
    dict.push_variable("V1", VarType::Numeric).unwrap();
    dict.push_variable("V2", VarType::Numeric).unwrap();
    let idx3 = dict.push_variable("V3", VarType::Numeric).unwrap();
    dict.push_variable("V4", VarType::Numeric).unwrap();
    let idx5 = dict.push_variable("V5", VarType::Numeric).unwrap();

    for idx in [idx3, idx5] {
        dict.variable_mut(idx)
            .add_value_label(Value::Numeric(0.0), "No".to_string())
            .unwrap();
        dict.variable_mut(idx)
            .add_value_label(Value::Numeric(1.0), "Yes".to_string())
            .unwrap();
    }

    let (read_dict, _) = round_trip(dict, &[], false);
    for idx in [idx3, idx5] {
        let labels = read_dict.variable(idx).value_labels();
        assert_eq!(labels.get(&Value::Numeric(0.0)).map(String::as_str), Some("No"));
        assert_eq!(labels.get(&Value::Numeric(1.0)).map(String::as_str), Some("Yes"));
    }
}

#[test]
fn scenario_6_long_name_rewrite_keeps_short_name() {
    let mut dict = Dictionary::new();
    let idx = dict.push_variable("V1", VarType::Numeric).unwrap();
    dict.set_long_name(idx, Some("HouseholdIncome".to_string())).unwrap();

    let (read_dict, _) = round_trip(dict, &[], false);
    assert_eq!(read_dict.variable(0).short_name(), "V1");
    assert_eq!(read_dict.variable(0).long_name(), Some("HouseholdIncome"));
}

#[test]
fn missing_value_boundary_discrete_and_range_and_discrete() {
    let mut dict = Dictionary::new();
    let idx = dict.push_variable("SCORE", VarType::Numeric).unwrap();
    dict.variable_mut(idx)
        .set_missing(Missing::RangeAndDiscrete(90.0, 99.0, Value::Numeric(-1.0)))
        .unwrap();

    let (read_dict, _) = round_trip(dict, &[], false);
    assert_eq!(
        read_dict.variable(0).missing(),
        &Missing::RangeAndDiscrete(90.0, 99.0, Value::Numeric(-1.0))
    );
}

#[test]
fn string_width_segment_transitions() {
    for width in [1u8, 8, 9, 255] {
        let mut dict = Dictionary::new();
        dict.push_variable("S", VarType::String(width)).unwrap();
        let expected_segments = (width as usize).div_ceil(8);
        assert_eq!(dict.variable(0).segments(), expected_segments);

        let (read_dict, _) = round_trip(dict, &[], false);
        assert_eq!(read_dict.variable(0).var_type(), VarType::String(width));
        assert_eq!(read_dict.variable(0).segments(), expected_segments);
    }
}

#[test]
fn case_count_unknown_until_close() {
    let mut dict = Dictionary::new();
    dict.push_variable("X", VarType::Numeric).unwrap();

    let mut buf = Cursor::new(Vec::new());
    let mut writer = Writer::open(&mut buf, dict, WriterOptions::default()).unwrap();
    writer.write_case(&Case::new(vec![Value::Numeric(1.0)])).unwrap();
    // Don't close; read the header as written so far -- case count must
    // still read as the "-1 unknown" sentinel (spec.md §5).
    let bytes = buf.get_ref().clone();
    let mut reader = savcodec::io_utils::SavReader::new(Cursor::new(bytes));
    let header = savcodec::header::FileHeader::parse(&mut reader).unwrap();
    assert_eq!(header.ncases, -1);
}

#[test]
fn byte_swapped_file_reads_identically_to_native() {
    // A file whose layout_code is big-endian-encoded should still parse,
    // with every i32/f64 thereafter byte-swapped (spec.md §4.2).
    let mut dict = Dictionary::new();
    dict.push_variable("X", VarType::Numeric).unwrap();

    let options = WriterOptions {
        compress: false,
        ..WriterOptions::default()
    };
    let mut buf = Cursor::new(Vec::new());
    let mut writer = Writer::open(&mut buf, dict, options).unwrap();
    writer.write_case(&Case::new(vec![Value::Numeric(123.0)])).unwrap();
    writer.close().unwrap();

    let mut bytes = buf.into_inner();
    // Byte-swap the header's 4-byte integer fields and the bias (f64),
    // leaving the magic and the fixed-width text fields alone, then
    // byte-swap the file's last 8 bytes -- the sole case's one numeric
    // segment, since it is the last thing the writer emitted -- to
    // simulate a file produced on the opposite-endian host (spec.md §4.2).
    swap_i32(&mut bytes, 64); // layout_code
    swap_i32(&mut bytes, 68); // nominal_case_size
    swap_i32(&mut bytes, 72); // compression
    swap_i32(&mut bytes, 76); // weight_index
    swap_i32(&mut bytes, 80); // ncases
    swap_f64(&mut bytes, 84); // bias
    let last = bytes.len() - 8;
    swap_f64(&mut bytes, last);

    let mut reader = Reader::open(Cursor::new(bytes)).unwrap();
    assert!(reader.info().big_endian);
    let case = reader.read_case().unwrap().unwrap();
    assert_eq!(case.get(0), Some(&Value::Numeric(123.0)));
}

fn swap_i32(buf: &mut [u8], offset: usize) {
    buf[offset..offset + 4].reverse();
}

fn swap_f64(buf: &mut [u8], offset: usize) {
    buf[offset..offset + 8].reverse();
}
