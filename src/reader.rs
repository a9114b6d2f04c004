//! Top-level reader state machine (spec.md §4.5/§6.2): `open` drains the
//! header and dictionary section once, then `read_case` serves cases one
//! at a time until a clean end of file.

use std::io::Read;

use crate::compression::bytecode::Decompressor;
use crate::constants::DEFAULT_BIAS;
use crate::data;
use crate::dictionary::{self, ParsedDictionary};
use crate::error::Result;
use crate::header::FileHeader;
use crate::io_utils::SavReader;
use crate::model::{Case, Dictionary};
use crate::specials::Specials;
use crate::warning::Warning;

/// The subset of header/dictionary facts `spec.md §6.2` calls `info_out`:
/// everything about *this* read a caller might want without reaching into
/// the parsed [`Dictionary`].
#[derive(Debug, Clone)]
pub struct ReaderInfo {
    pub creation_date: String,
    pub creation_time: String,
    pub big_endian: bool,
    pub compressed: bool,
    /// Declared case count, `-1` if unknown.
    pub case_cnt: i32,
    pub product: String,
}

/// Strip the `"@(#) SPSS DATA FILE "` prefix PSPP's writer always adds,
/// leaving just `"<version> - <host>"` (spec.md §6.2: "trimmed of known prefixes").
fn trim_known_product_prefix(product: &str) -> &str {
    const PREFIX: &str = "@(#) SPSS DATA FILE ";
    product.strip_prefix(PREFIX).unwrap_or(product)
}

/// Reads a SAV file's dictionary once at `open`, then serves cases one at a
/// time. Mirrors spec.md §4.5's `Opened → HeaderParsed → VariablesParsed →
/// ExtensionsDrained → StreamingCases` state machine; there is no separate
/// "closed" state to model in Rust beyond dropping the `Reader`.
pub struct Reader<R> {
    io: SavReader<R>,
    header: FileHeader,
    dictionary: Dictionary,
    specials: Specials,
    warnings: Vec<Warning>,
    decompressor: Option<Decompressor>,
}

impl<R: Read> Reader<R> {
    /// Open a SAV file, parsing the header and the entire dictionary
    /// section. Errors here leave nothing behind to close: `inner` is
    /// simply dropped.
    pub fn open(inner: R) -> Result<Reader<R>> {
        let mut io = SavReader::new(inner);
        let header = FileHeader::parse(&mut io)?;
        io.set_bswap(header.bswap);

        let mut warnings = Vec::new();
        if (header.bias - DEFAULT_BIAS).abs() > f64::EPSILON {
            warnings.push(Warning::NonStandardBias(header.bias));
        }

        let ParsedDictionary {
            dictionary,
            specials,
        } = dictionary::read_dictionary(&mut io, &header, &mut warnings)?;

        let decompressor = header.compressed.then(|| Decompressor::new(header.bias));

        Ok(Reader {
            io,
            header,
            dictionary,
            specials,
            warnings,
            decompressor,
        })
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Warnings accumulated during `open` and every `read_case` so far.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn info(&self) -> ReaderInfo {
        ReaderInfo {
            creation_date: self.header.creation_date.clone(),
            creation_time: self.header.creation_time.clone(),
            big_endian: self.header.bswap != cfg!(target_endian = "big"),
            compressed: self.header.compressed,
            case_cnt: self.header.ncases,
            product: trim_known_product_prefix(&self.header.product).to_string(),
        }
    }

    /// Read the next case. `Ok(None)` marks a clean end of stream; once
    /// that happens, every subsequent call also returns `Ok(None)`.
    pub fn read_case(&mut self) -> Result<Option<Case>> {
        match &mut self.decompressor {
            Some(decompressor) => {
                data::read_case_compressed(&mut self.io, &self.dictionary, &self.specials, decompressor)
            }
            None => data::read_case_raw(&mut self.io, &self.dictionary, &self.specials),
        }
    }

    /// Release the reader, returning the underlying stream.
    pub fn close(self) -> R {
        self.io.into_inner()
    }
}
