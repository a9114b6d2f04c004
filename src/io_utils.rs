use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{Result, SpssError};

/// Endian-aware binary reader that wraps a `Read` source.
///
/// All multi-byte reads are little-endian by default, with optional byte-swapping
/// when the SAV file was written on a big-endian machine.
pub struct SavReader<R> {
    inner: R,
    bswap: bool,
}

impl<R: Read> SavReader<R> {
    /// Create a new reader with no byte swapping (endianness determined later from header).
    pub fn new(inner: R) -> Self {
        SavReader {
            inner,
            bswap: false,
        }
    }

    /// Enable or disable byte swapping.
    pub fn set_bswap(&mut self, bswap: bool) {
        self.bswap = bswap;
    }

    pub fn bswap(&self) -> bool {
        self.bswap
    }

    /// Get a mutable reference to the inner reader.
    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read exactly `n` bytes into a new Vec.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf).map_err(eof_or_io("reading raw bytes"))?;
        Ok(buf)
    }

    /// Read exactly `n` bytes into an existing slice.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf).map_err(eof_or_io("reading fixed-size field"))
    }

    /// Read a 4-byte signed integer with endian handling.
    pub fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf).map_err(eof_or_io("reading i32"))?;
        Ok(if self.bswap {
            i32::from_be_bytes(buf)
        } else {
            i32::from_le_bytes(buf)
        })
    }

    /// Read a 4-byte unsigned integer with endian handling.
    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf).map_err(eof_or_io("reading u32"))?;
        Ok(if self.bswap {
            u32::from_be_bytes(buf)
        } else {
            u32::from_le_bytes(buf)
        })
    }

    /// Read an 8-byte signed integer with endian handling.
    pub fn read_i64(&mut self) -> Result<i64> {
        let mut buf = [0u8; 8];
        self.inner.read_exact(&mut buf).map_err(eof_or_io("reading i64"))?;
        Ok(if self.bswap {
            i64::from_be_bytes(buf)
        } else {
            i64::from_le_bytes(buf)
        })
    }

    /// Read an 8-byte float with endian handling.
    pub fn read_f64(&mut self) -> Result<f64> {
        let mut buf = [0u8; 8];
        self.inner.read_exact(&mut buf).map_err(eof_or_io("reading f64"))?;
        Ok(if self.bswap {
            f64::from_be_bytes(buf)
        } else {
            f64::from_le_bytes(buf)
        })
    }

    /// Read 8 raw bytes (no endian swap -- used for raw data slots/case segments).
    pub fn read_8_bytes(&mut self) -> Result<[u8; 8]> {
        let mut buf = [0u8; 8];
        self.inner.read_exact(&mut buf).map_err(eof_or_io("reading 8-byte segment"))?;
        Ok(buf)
    }

    /// Read 8 raw bytes, but treat a clean (zero-byte) EOF as `Ok(None)`
    /// instead of an error. A short read (1..=7 bytes available) is still
    /// `UnexpectedEof` -- only used at segment-stream boundaries where a
    /// clean end of file is a legal "no more cases" signal (spec.md §4.4).
    pub fn try_read_8_bytes(&mut self) -> Result<Option<[u8; 8]>> {
        let mut buf = [0u8; 8];
        let mut filled = 0;
        loop {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => {
                    return if filled == 0 {
                        Ok(None)
                    } else {
                        Err(SpssError::UnexpectedEof {
                            context: "reading 8-byte segment",
                        })
                    };
                }
                Ok(n) => {
                    filled += n;
                    if filled == 8 {
                        return Ok(Some(buf));
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SpssError::Io(e)),
            }
        }
    }

    /// Read a fixed-length byte string, trimming trailing spaces and NULs.
    pub fn read_fixed_string(&mut self, len: usize) -> Result<Vec<u8>> {
        let buf = self.read_bytes(len)?;
        Ok(trim_trailing_padding(&buf).to_vec())
    }

    /// Skip `n` bytes by discarding them.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        let mut remaining = n;
        let mut discard = [0u8; 4096];
        while remaining > 0 {
            let to_read = remaining.min(discard.len());
            self.inner
                .read_exact(&mut discard[..to_read])
                .map_err(eof_or_io("skipping bytes"))?;
            remaining -= to_read;
        }
        Ok(())
    }
}

impl<R: Read + Seek> SavReader<R> {
    /// Rewind the stream by exactly `n` bytes. Per spec.md §4.1, a reader only
    /// ever needs to un-read the single record-type tag it just consumed
    /// while probing for the dictionary-termination record, so `n` is small.
    pub fn unread(&mut self, n: i64) -> Result<()> {
        self.inner.seek(SeekFrom::Current(-n))?;
        Ok(())
    }

    pub fn stream_position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.inner.seek(pos)?)
    }
}

fn eof_or_io(context: &'static str) -> impl Fn(std::io::Error) -> SpssError {
    move |e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            SpssError::UnexpectedEof { context }
        } else {
            SpssError::Io(e)
        }
    }
}

/// Endian-aware binary writer, the mirror image of [`SavReader`]. The codec
/// always writes in the host's native endianness (spec.md §9: the writer
/// never byte-swaps its own output), so `bswap` stays `false` in practice,
/// but the flag is carried for symmetry and for tests that want a
/// byte-swapped fixture.
pub struct SavWriter<W> {
    inner: W,
    bswap: bool,
}

impl<W: Write> SavWriter<W> {
    pub fn new(inner: W) -> Self {
        SavWriter {
            inner,
            bswap: false,
        }
    }

    pub fn set_bswap(&mut self, bswap: bool) {
        self.bswap = bswap;
    }

    pub fn inner_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf)?;
        Ok(())
    }

    pub fn write_i32(&mut self, val: i32) -> Result<()> {
        let buf = if self.bswap { val.to_be_bytes() } else { val.to_le_bytes() };
        self.write_bytes(&buf)
    }

    pub fn write_u32(&mut self, val: u32) -> Result<()> {
        let buf = if self.bswap { val.to_be_bytes() } else { val.to_le_bytes() };
        self.write_bytes(&buf)
    }

    pub fn write_i64(&mut self, val: i64) -> Result<()> {
        let buf = if self.bswap { val.to_be_bytes() } else { val.to_le_bytes() };
        self.write_bytes(&buf)
    }

    pub fn write_f64(&mut self, val: f64) -> Result<()> {
        let buf = if self.bswap { val.to_be_bytes() } else { val.to_le_bytes() };
        self.write_bytes(&buf)
    }

    /// Write 8 raw bytes (no endian swap -- case segments are byte blobs).
    pub fn write_8_bytes(&mut self, buf: &[u8; 8]) -> Result<()> {
        self.write_bytes(buf)
    }

    /// Write `s` truncated/padded to exactly `len` bytes with trailing ASCII
    /// spaces, the on-disk convention for every fixed-width text field.
    pub fn write_fixed_string(&mut self, s: &[u8], len: usize) -> Result<()> {
        let mut buf = vec![b' '; len];
        let n = s.len().min(len);
        buf[..n].copy_from_slice(&s[..n]);
        self.write_bytes(&buf)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

impl<W: Write + Seek> SavWriter<W> {
    pub fn stream_position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.inner.seek(pos)?)
    }
}

/// Trim trailing spaces (0x20) and NUL bytes (0x00) from a byte slice.
pub fn trim_trailing_padding(buf: &[u8]) -> &[u8] {
    let mut end = buf.len();
    while end > 0 && (buf[end - 1] == b' ' || buf[end - 1] == 0) {
        end -= 1;
    }
    &buf[..end]
}

/// Round a length up to the next multiple of `alignment`.
pub fn round_up(len: usize, alignment: usize) -> usize {
    if alignment == 0 {
        return len;
    }
    let remainder = len % alignment;
    if remainder == 0 {
        len
    } else {
        len + alignment - remainder
    }
}

/// Convert a byte slice to a string, trying UTF-8 first and falling back to lossy.
pub fn bytes_to_string_lossy(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec()).unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned())
}

/// Read a pascal-style string: 4-byte length prefix, then that many bytes.
pub fn read_pascal_string<R: Read>(reader: &mut SavReader<R>) -> Result<Vec<u8>> {
    let len = reader.read_i32()? as usize;
    if len == 0 {
        return Ok(Vec::new());
    }
    reader.read_bytes(len)
}

/// Read a pascal-style string and skip padding to align to 4 bytes.
pub fn read_pascal_string_aligned<R: Read>(reader: &mut SavReader<R>) -> Result<Vec<u8>> {
    let len = reader.read_i32()? as usize;
    if len == 0 {
        return Ok(Vec::new());
    }
    let padded_len = round_up(len, 4);
    let data = reader.read_bytes(padded_len)?;
    Ok(data[..len].to_vec())
}

/// Write a pascal-style string, 4-byte-aligned, matching
/// [`read_pascal_string_aligned`].
pub fn write_pascal_string_aligned<W: Write>(writer: &mut SavWriter<W>, s: &[u8]) -> Result<()> {
    writer.write_i32(s.len() as i32)?;
    let padded_len = round_up(s.len(), 4);
    let mut buf = vec![0u8; padded_len];
    buf[..s.len()].copy_from_slice(s);
    writer.write_bytes(&buf)
}

/// Detect endianness from the SAV header's layout_code field.
/// Returns `true` if byte-swapping is needed to read this file natively.
pub fn detect_endianness(layout_code_bytes: [u8; 4]) -> Result<bool> {
    let le_val = i32::from_le_bytes(layout_code_bytes);
    let be_val = i32::from_be_bytes(layout_code_bytes);

    if le_val == 2 || le_val == 3 {
        Ok(false)
    } else if be_val == 2 || be_val == 3 {
        Ok(true)
    } else {
        Err(SpssError::BadLayout {
            bytes: layout_code_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_trim_trailing_padding() {
        assert_eq!(trim_trailing_padding(b"hello   "), b"hello");
        assert_eq!(trim_trailing_padding(b"hello\0\0\0"), b"hello");
        assert_eq!(trim_trailing_padding(b"hello \0 "), b"hello");
        assert_eq!(trim_trailing_padding(b"   "), b"");
        assert_eq!(trim_trailing_padding(b""), b"");
    }

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(0, 4), 0);
        assert_eq!(round_up(1, 4), 4);
        assert_eq!(round_up(4, 4), 4);
        assert_eq!(round_up(5, 4), 8);
        assert_eq!(round_up(7, 8), 8);
        assert_eq!(round_up(8, 8), 8);
    }

    #[test]
    fn test_detect_endianness_le() {
        let bytes = 2_i32.to_le_bytes();
        assert!(!detect_endianness(bytes).unwrap());
    }

    #[test]
    fn test_detect_endianness_be() {
        let bytes = 2_i32.to_be_bytes();
        assert!(detect_endianness(bytes).unwrap());
    }

    #[test]
    fn test_detect_endianness_garbage() {
        let bytes = [9, 9, 9, 9];
        assert!(detect_endianness(bytes).is_err());
    }

    #[test]
    fn test_sav_reader_i32() {
        let data = 42_i32.to_le_bytes();
        let mut reader = SavReader::new(&data[..]);
        assert_eq!(reader.read_i32().unwrap(), 42);
    }

    #[test]
    fn test_sav_reader_f64() {
        let data = 3.14_f64.to_le_bytes();
        let mut reader = SavReader::new(&data[..]);
        let val = reader.read_f64().unwrap();
        assert!((val - 3.14).abs() < 1e-10);
    }

    #[test]
    fn test_sav_reader_eof_maps_to_unexpected_eof() {
        let data: [u8; 2] = [0, 0];
        let mut reader = SavReader::new(&data[..]);
        let err = reader.read_i32().unwrap_err();
        assert!(matches!(err, SpssError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_writer_round_trip_i32_f64() {
        let mut buf = Vec::new();
        {
            let mut writer = SavWriter::new(&mut buf);
            writer.write_i32(-7).unwrap();
            writer.write_f64(2.5).unwrap();
        }
        let mut reader = SavReader::new(Cursor::new(buf));
        assert_eq!(reader.read_i32().unwrap(), -7);
        assert_eq!(reader.read_f64().unwrap(), 2.5);
    }

    #[test]
    fn test_write_fixed_string_pads_with_spaces() {
        let mut buf = Vec::new();
        {
            let mut writer = SavWriter::new(&mut buf);
            writer.write_fixed_string(b"abc", 8).unwrap();
        }
        assert_eq!(&buf, b"abc     ");
    }

    #[test]
    fn test_write_fixed_string_truncates() {
        let mut buf = Vec::new();
        {
            let mut writer = SavWriter::new(&mut buf);
            writer.write_fixed_string(b"abcdefgh", 4).unwrap();
        }
        assert_eq!(&buf, b"abcd");
    }

    #[test]
    fn test_unread_rewinds_stream() {
        let data = [1i32.to_le_bytes(), 2i32.to_le_bytes()].concat();
        let mut reader = SavReader::new(Cursor::new(data));
        assert_eq!(reader.read_i32().unwrap(), 1);
        reader.unread(4).unwrap();
        assert_eq!(reader.read_i32().unwrap(), 1);
        assert_eq!(reader.read_i32().unwrap(), 2);
    }

    #[test]
    fn test_pascal_string_aligned_round_trip() {
        let mut buf = Vec::new();
        {
            let mut writer = SavWriter::new(&mut buf);
            write_pascal_string_aligned(&mut writer, b"hello").unwrap();
        }
        let mut reader = SavReader::new(Cursor::new(buf));
        let s = read_pascal_string_aligned(&mut reader).unwrap();
        assert_eq!(s, b"hello");
    }
}
