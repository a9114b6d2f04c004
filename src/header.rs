use std::io::{Read, Write};
use std::time::SystemTime;

use chrono::{DateTime, Datelike, Local, Timelike};

use crate::error::{Result, SpssError};
use crate::io_utils::{self, SavReader, SavWriter};

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Parsed SAV file header (spec.md §4.1/§3).
#[derive(Debug, Clone)]
pub struct FileHeader {
    /// Magic string: "$FL2" (standard) or "$FL3".
    pub magic: [u8; 4],
    /// SPSS product string that created the file (or will write it).
    pub product: String,
    /// Layout code (2 = native, used for endianness probing).
    pub layout_code: i32,
    /// Number of 8-byte slots per case (row), nominal only -- the
    /// authoritative layout comes from the variable records.
    pub nominal_case_size: i32,
    /// Whether case data is bytecode-compressed.
    pub compressed: bool,
    /// 1-based segment index of the weight variable (0 = unweighted).
    pub weight_index: i32,
    /// Number of cases (-1 = unknown, written at the end of the stream).
    pub ncases: i32,
    /// Compression bias (spec.md default 100.0; non-default triggers a
    /// warning rather than an error).
    pub bias: f64,
    /// Creation date string, "dd mmm yy".
    pub creation_date: String,
    /// Creation time string, "hh:mm:ss".
    pub creation_time: String,
    /// File label (up to 64 chars).
    pub file_label: String,
    /// Whether byte-swapping is needed to read this file on this host.
    pub bswap: bool,
}

impl FileHeader {
    /// Parse the SAV file header from a reader.
    ///
    /// After this call, the reader is positioned right after the header,
    /// ready to read variable records.
    pub fn parse<R: Read>(reader: &mut SavReader<R>) -> Result<FileHeader> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;

        if &magic != b"$FL2" && &magic != b"$FL3" {
            return Err(SpssError::BadMagic { found: magic });
        }

        let product_bytes = reader.read_bytes(60)?;
        let product = io_utils::bytes_to_string_lossy(io_utils::trim_trailing_padding(&product_bytes));

        let layout_bytes = reader.read_bytes(4)?;
        let layout_arr: [u8; 4] = layout_bytes.try_into().unwrap();
        let bswap = io_utils::detect_endianness(layout_arr)?;
        reader.set_bswap(bswap);

        let layout_code = if bswap {
            i32::from_be_bytes(layout_arr)
        } else {
            i32::from_le_bytes(layout_arr)
        };

        let nominal_case_size = reader.read_i32()?;
        let compression_code = reader.read_i32()?;
        let compressed = match compression_code {
            0 => false,
            1 => true,
            other => {
                return Err(SpssError::CorruptRecord {
                    tag: 0,
                    detail: format!("unsupported compression code {other} in header"),
                });
            }
        };
        let weight_index = reader.read_i32()?;
        let ncases = reader.read_i32()?;
        let bias = reader.read_f64()?;

        let date_bytes = reader.read_bytes(9)?;
        let creation_date = io_utils::bytes_to_string_lossy(io_utils::trim_trailing_padding(&date_bytes));

        let time_bytes = reader.read_bytes(8)?;
        let creation_time = io_utils::bytes_to_string_lossy(io_utils::trim_trailing_padding(&time_bytes));

        let label_bytes = reader.read_bytes(64)?;
        let file_label = io_utils::bytes_to_string_lossy(io_utils::trim_trailing_padding(&label_bytes));

        reader.skip(3)?;

        Ok(FileHeader {
            magic,
            product,
            layout_code,
            nominal_case_size,
            compressed,
            weight_index,
            ncases,
            bias,
            creation_date,
            creation_time,
            file_label,
            bswap,
        })
    }

    /// Write the header. `ncases` should be `-1` if the case count is not
    /// yet known; the writer back-patches this field on close, mirroring
    /// PSPP's `sfm_close_writer`. `magic` is `$FL2` or `$FL3` per the
    /// target system-file version (spec.md §6.2, `WriterOptions::version`).
    #[allow(clippy::too_many_arguments)]
    pub fn write<W: Write>(
        writer: &mut SavWriter<W>,
        magic: &[u8; 4],
        product: &str,
        nominal_case_size: i32,
        compressed: bool,
        weight_index: i32,
        ncases: i32,
        bias: f64,
        creation_date: &str,
        creation_time: &str,
        file_label: &str,
    ) -> Result<()> {
        writer.write_bytes(magic)?;
        writer.write_fixed_string(product.as_bytes(), 60)?;
        writer.write_i32(2)?; // layout_code: always native, non-swapped
        writer.write_i32(nominal_case_size)?;
        writer.write_i32(if compressed { 1 } else { 0 })?;
        writer.write_i32(weight_index)?;
        writer.write_i32(ncases)?;
        writer.write_f64(bias)?;
        writer.write_fixed_string(creation_date.as_bytes(), 9)?;
        writer.write_fixed_string(creation_time.as_bytes(), 8)?;
        writer.write_fixed_string(file_label.as_bytes(), 64)?;
        writer.write_bytes(&[0u8; 3])?;
        Ok(())
    }
}

/// Build the on-disk product string exactly as PSPP's `write_header` does:
/// `"@(#) SPSS DATA FILE " + version + " - " + host`.
pub fn build_product_string(version: &str, host: &str) -> String {
    format!("@(#) SPSS DATA FILE {version} - {host}")
}

/// PSPP's `rerange`: fold a possibly out-of-[0,99] component into that
/// range the same way the C writer does before formatting a two-digit
/// year/hour/minute/second, so that an overflowed input never corrupts
/// neighboring fields.
fn rerange(x: i32) -> i32 {
    let x = x % 100;
    if x < 0 { x + 100 } else { x }
}

/// Format `now` as `(creation_date, creation_time)` in the `"dd mmm yy"` /
/// `"hh:mm:ss"` forms the header expects, in host local time (spec.md §4.1,
/// PSPP's `write_header`), following PSPP's `rerange`-based clamping for
/// each numeric component.
pub fn format_creation_date_time(now: SystemTime) -> (String, String) {
    let local: DateTime<Local> = now.into();

    let yy = rerange(local.year());
    let month_name = MONTH_NAMES[(local.month() - 1) as usize];

    let date = format!("{:02} {} {:02}", local.day(), month_name, yy);
    let time = format!(
        "{:02}:{:02}:{:02}",
        rerange(local.hour() as i32),
        rerange(local.minute() as i32),
        rerange(local.second() as i32)
    );
    (date, time)
}
