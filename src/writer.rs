//! Top-level writer state machine (spec.md §4.5/§6.2): `open` emits the
//! header and full dictionary section once, `write_case` appends cases in
//! order, and `close` flushes the compression ring and back-patches the
//! header's case count.

use std::io::{Seek, SeekFrom, Write};
use std::time::SystemTime;

use crate::compression::bytecode::Compressor;
use crate::constants::DEFAULT_BIAS;
use crate::data;
use crate::dictionary::{self, weight_segment_index};
use crate::error::Result;
use crate::header::{self, FileHeader};
use crate::io_utils::SavWriter;
use crate::model::{Case, Dictionary};

/// Host-provided inputs spec.md §9 says the codec must not read from
/// process globals: product/version strings, host name, the default
/// compression flag, and the target system-file version.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub compress: bool,
    /// Target system-file version: `2` (`$FL2`) or `3` (`$FL3`).
    pub version: u8,
    /// SPSS version string embedded in the product field, e.g. `"3"`.
    pub product_version: String,
    /// Host name embedded in the product field.
    pub host: String,
}

impl Default for WriterOptions {
    fn default() -> WriterOptions {
        WriterOptions {
            compress: true,
            version: 3,
            product_version: "3".to_string(),
            host: "rust-savcodec".to_string(),
        }
    }
}

/// Writes a dictionary once, then accepts cases one at a time. Mirrors
/// spec.md §4.5's `Opened → HeaderWritten → VarsAndExtsWritten →
/// AppendingCases → ClosingAndPatchingCount` state machine.
pub struct Writer<W: Write + Seek> {
    io: SavWriter<W>,
    dictionary: Dictionary,
    options: WriterOptions,
    compressor: Option<Compressor>,
    ncases: i32,
    header_pos: u64,
}

impl<W: Write + Seek> Writer<W> {
    /// Open a writer, immediately emitting the header and the entire
    /// dictionary section. `dictionary` is consumed as-is -- the caller is
    /// responsible for any short-name canonicalization it wants reflected
    /// on disk (spec.md §3: the short-name/long-name rewrite scheme is
    /// external to the codec).
    pub fn open(inner: W, dictionary: Dictionary, options: WriterOptions) -> Result<Writer<W>> {
        let mut io = SavWriter::new(inner);

        let magic: [u8; 4] = if options.version >= 3 { *b"$FL3" } else { *b"$FL2" };
        let product = header::build_product_string(&options.product_version, &options.host);
        let (creation_date, creation_time) = header::format_creation_date_time(SystemTime::now());
        let weight_index = weight_segment_index(&dictionary);

        let header_pos = io.stream_position()?;
        FileHeader::write(
            &mut io,
            &magic,
            &product,
            dictionary.total_segments() as i32,
            options.compress,
            weight_index,
            -1,
            DEFAULT_BIAS,
            &creation_date,
            &creation_time,
            dictionary.file_label().unwrap_or(""),
        )?;

        dictionary::write_dictionary(&mut io, &dictionary, options.compress)?;

        let compressor = options.compress.then(|| Compressor::new(DEFAULT_BIAS));

        Ok(Writer {
            io,
            dictionary,
            options,
            compressor,
            ncases: 0,
            header_pos,
        })
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Append one case, in dictionary order.
    pub fn write_case(&mut self, case: &Case) -> Result<()> {
        match &mut self.compressor {
            Some(compressor) => data::write_case_compressed(&mut self.io, &self.dictionary, case, compressor)?,
            None => data::write_case_raw(&mut self.io, &self.dictionary, case)?,
        }
        self.ncases += 1;
        Ok(())
    }

    /// Flush the compression ring (if any), then back-patch the header's
    /// case count. Per spec.md §5, a writer dropped before `close` leaves a
    /// well-formed header whose case count stays `-1` ("unknown"), which is
    /// a legal on-disk state -- this method is the only path that turns it
    /// into a real count.
    pub fn close(mut self) -> Result<W> {
        if let Some(compressor) = self.compressor.take() {
            compressor.finish(&mut self.io)?;
        }
        self.io.flush()?;

        let ncases_field_offset = self.header_pos + 4 + 60 + 4 + 4 + 4 + 4;
        self.io.seek(SeekFrom::Start(ncases_field_offset))?;
        self.io.inner_mut().write_all(&self.ncases.to_le_bytes())?;
        self.io.seek(SeekFrom::End(0))?;
        self.io.flush()?;

        Ok(self.io.into_inner())
    }
}
