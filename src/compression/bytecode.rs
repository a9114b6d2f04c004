//! Streaming bytecode compression/decompression (spec.md §4.4).
//!
//! Control blocks are 8 opcodes packed into one 8-byte segment; they do
//! NOT align with case (row) boundaries, so both [`Decompressor`] and
//! [`Compressor`] keep their control-block cursor alive across
//! `decompress_case`/`write_segment` calls rather than resetting per case.

use std::io::{Read, Write};

use crate::constants::{
    COMPRESS_EIGHT_SPACES, COMPRESS_END_OF_FILE, COMPRESS_RAW_FOLLOWS, COMPRESS_SKIP,
    COMPRESS_SYSMIS, SYSMIS_BITS,
};
use crate::error::{Result, SpssError};
use crate::io_utils::{SavReader, SavWriter};

const SYSMIS_RAW: [u8; 8] = SYSMIS_BITS.to_le_bytes();
const SPACES_RAW: [u8; 8] = [0x20u8; 8];

/// Streaming bytecode decompressor. One instance lives for the whole case
/// stream of an open file, not one per case.
pub struct Decompressor {
    bias: f64,
    control_bytes: [u8; 8],
    control_idx: usize,
    eof: bool,
}

impl Decompressor {
    pub fn new(bias: f64) -> Decompressor {
        Decompressor {
            bias,
            control_bytes: [0u8; 8],
            control_idx: 8, // force reading a new control block on first use
            eof: false,
        }
    }

    /// Decompress one case's worth of segments (`n_segments * 8` bytes)
    /// directly into `output`. Returns `Ok(false)` if the end-of-file
    /// marker (or a clean EOF) was reached before any segment of this case
    /// was produced -- i.e. there is no more data. A partial case (EOF or
    /// the end-of-file opcode appearing mid-case) is `CorruptPartialCase`.
    pub fn decompress_case<R: Read>(
        &mut self,
        reader: &mut SavReader<R>,
        n_segments: usize,
        output: &mut [u8],
    ) -> Result<bool> {
        if self.eof {
            return Ok(false);
        }

        let mut slot = 0;
        while slot < n_segments {
            if self.control_idx >= 8 {
                match reader.try_read_8_bytes()? {
                    None => {
                        return if slot == 0 {
                            Ok(false)
                        } else {
                            Err(SpssError::CorruptPartialCase(
                                "file ended mid-case while reading a control block".to_string(),
                            ))
                        };
                    }
                    Some(bytes) => {
                        self.control_bytes = bytes;
                        self.control_idx = 0;
                    }
                }
            }

            let code = self.control_bytes[self.control_idx];
            self.control_idx += 1;
            let dest = slot * 8;

            match code {
                1..=251 => {
                    let value = (code as f64) - self.bias;
                    output[dest..dest + 8].copy_from_slice(&value.to_le_bytes());
                    slot += 1;
                }
                COMPRESS_SKIP => continue,
                COMPRESS_RAW_FOLLOWS => {
                    let bytes = read_raw_block(reader)?;
                    output[dest..dest + 8].copy_from_slice(&bytes);
                    slot += 1;
                }
                COMPRESS_EIGHT_SPACES => {
                    output[dest..dest + 8].copy_from_slice(&SPACES_RAW);
                    slot += 1;
                }
                COMPRESS_SYSMIS => {
                    output[dest..dest + 8].copy_from_slice(&SYSMIS_RAW);
                    slot += 1;
                }
                COMPRESS_END_OF_FILE => {
                    self.eof = true;
                    return if slot == 0 {
                        Ok(false)
                    } else {
                        Err(SpssError::CorruptPartialCase(
                            "end-of-file opcode seen mid-case".to_string(),
                        ))
                    };
                }
            }
        }

        Ok(true)
    }
}

fn read_raw_block<R: Read>(reader: &mut SavReader<R>) -> Result<[u8; 8]> {
    match reader.read_8_bytes() {
        Ok(bytes) => Ok(bytes),
        Err(SpssError::UnexpectedEof { .. }) => Err(SpssError::CorruptPartialCase(
            "file ended while reading a raw-follows literal".to_string(),
        )),
        Err(e) => Err(e),
    }
}

enum Classified {
    Numeric(u8),
    Spaces,
    Sysmis,
    Raw,
}

fn classify(bytes: &[u8; 8], bias: f64) -> Classified {
    if *bytes == SYSMIS_RAW {
        return Classified::Sysmis;
    }
    if *bytes == SPACES_RAW {
        return Classified::Spaces;
    }
    let value = f64::from_le_bytes(*bytes);
    if value.is_finite() && value.fract() == 0.0 {
        let code = value + bias;
        if (1.0..=251.0).contains(&code) {
            return Classified::Numeric(code as u8);
        }
    }
    Classified::Raw
}

/// Streaming bytecode compressor, the write-side mirror of [`Decompressor`].
///
/// PSPP's writer maintains a 128-segment (1KB) ring buffer and only flushes
/// a control block once it is full or the file closes. This compressor
/// flushes a control block as soon as its 8 opcode slots fill, emitting any
/// pending raw-follows literals right after -- functionally identical bytes
/// on disk (the reader doesn't care when a block was flushed, only that
/// each block's opcodes precede its own raw literals), at the cost of a
/// little extra small-write overhead which a buffered `Write` absorbs.
pub struct Compressor {
    bias: f64,
    codes: [u8; 8],
    idx: usize,
    raw_blocks: Vec<[u8; 8]>,
}

impl Compressor {
    pub fn new(bias: f64) -> Compressor {
        Compressor {
            bias,
            codes: [0u8; 8],
            idx: 0,
            raw_blocks: Vec::new(),
        }
    }

    /// Compress one 8-byte segment.
    pub fn write_segment<W: Write>(&mut self, writer: &mut SavWriter<W>, bytes: &[u8; 8]) -> Result<()> {
        match classify(bytes, self.bias) {
            Classified::Numeric(code) => self.push_code(writer, code),
            Classified::Spaces => self.push_code(writer, COMPRESS_EIGHT_SPACES),
            Classified::Sysmis => self.push_code(writer, COMPRESS_SYSMIS),
            Classified::Raw => {
                self.push_code(writer, COMPRESS_RAW_FOLLOWS)?;
                self.raw_blocks.push(*bytes);
                Ok(())
            }
        }
    }

    fn push_code<W: Write>(&mut self, writer: &mut SavWriter<W>, code: u8) -> Result<()> {
        self.codes[self.idx] = code;
        self.idx += 1;
        if self.idx == 8 {
            self.flush_octet(writer)?;
        }
        Ok(())
    }

    fn flush_octet<W: Write>(&mut self, writer: &mut SavWriter<W>) -> Result<()> {
        writer.write_8_bytes(&self.codes)?;
        for raw in self.raw_blocks.drain(..) {
            writer.write_8_bytes(&raw)?;
        }
        self.codes = [0u8; 8];
        self.idx = 0;
        Ok(())
    }

    /// Flush a trailing partial control block, padding unused opcode slots
    /// with [`COMPRESS_SKIP`]. Per SPEC_FULL.md's Open Question resolution,
    /// the writer never emits [`crate::constants::COMPRESS_END_OF_FILE`]
    /// itself -- a short final block plus the natural end of the stream is
    /// how PSPP's own writer ends a compressed file.
    pub fn finish<W: Write>(mut self, writer: &mut SavWriter<W>) -> Result<()> {
        if self.idx > 0 {
            for code in &mut self.codes[self.idx..8] {
                *code = COMPRESS_SKIP;
            }
            self.idx = 8;
            self.flush_octet(writer)?;
        }
        Ok(())
    }
}
