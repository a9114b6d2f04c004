//! savcodec: a pure Rust reader/writer for the SPSS System File (`.sav`)
//! format.
//!
//! The crate streams a file's header, dictionary, and case data into a
//! crate-native [`model::Dictionary`] plus a pull-style [`reader::Reader`],
//! and mirrors that as a push-style [`writer::Writer`]. Both sides share
//! the same on-disk framing, endianness handling, and bytecode compression
//! (spec.md §4.4).
//!
//! # Quick start
//!
//! ```no_run
//! use savcodec::reader::Reader;
//! use std::fs::File;
//!
//! let mut reader = Reader::open(File::open("survey.sav").unwrap()).unwrap();
//! println!("{} variables", reader.dictionary().variables().len());
//! while let Some(case) = reader.read_case().unwrap() {
//!     println!("{:?}", case.values());
//! }
//! ```

#[cfg(feature = "arrow")]
pub mod arrow_convert;
pub mod compression;
pub mod constants;
pub mod data;
pub mod dictionary;
pub mod document;
pub mod encoding;
pub mod error;
pub mod header;
pub mod info_records;
pub mod io_utils;
pub mod model;
pub mod reader;
pub mod specials;
pub mod value_labels;
pub mod variable;
pub mod warning;
pub mod writer;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub use crate::constants::{Alignment, Measure, VarType};
pub use crate::error::{Result, SpssError};
pub use crate::model::{Case, Dictionary, Missing, Value, Variable};
pub use crate::reader::{Reader, ReaderInfo};
pub use crate::warning::Warning;
pub use crate::writer::{Writer, WriterOptions};

/// Open a `.sav` file for reading, parsing the header and dictionary
/// immediately (spec.md §6.2: `Reader::open`).
pub fn open_reader(path: impl AsRef<Path>) -> Result<Reader<BufReader<File>>> {
    let file = File::open(path)?;
    Reader::open(BufReader::new(file))
}

/// Read an entire `.sav` file into memory: its dictionary plus every case,
/// in order. For large files, prefer [`open_reader`] and stream
/// [`Reader::read_case`] instead.
pub fn read_sav(path: impl AsRef<Path>) -> Result<(Dictionary, Vec<Case>)> {
    let mut reader = open_reader(path)?;
    let dictionary = reader.dictionary().clone();

    let mut cases = Vec::new();
    while let Some(case) = reader.read_case()? {
        cases.push(case);
    }
    Ok((dictionary, cases))
}

/// Read only a `.sav` file's dictionary, without touching any case data.
pub fn read_sav_dictionary(path: impl AsRef<Path>) -> Result<Dictionary> {
    let reader = open_reader(path)?;
    Ok(reader.dictionary().clone())
}

/// Read an entire `.sav` file and convert it straight to an Arrow
/// `RecordBatch` (requires the `arrow` feature).
#[cfg(feature = "arrow")]
pub fn read_sav_arrow(path: impl AsRef<Path>) -> Result<(arrow::record_batch::RecordBatch, Dictionary)> {
    let (dictionary, cases) = read_sav(path)?;
    let batch = arrow_convert::rows_to_record_batch(&dictionary, &cases)?;
    Ok((batch, dictionary))
}

/// Write a dictionary and its cases to a new `.sav` file.
pub fn write_sav(path: impl AsRef<Path>, dictionary: Dictionary, cases: &[Case], options: WriterOptions) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = Writer::open(BufWriter::new(file), dictionary, options)?;
    for case in cases {
        writer.write_case(case)?;
    }
    writer.close()?;
    Ok(())
}
