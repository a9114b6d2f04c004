//! Text encode/decode for the one character set spec.md actually supports:
//! 7-bit or 8-bit ASCII (machine-info charset codes 2 and 3, validated in
//! [`crate::specials`]). `windows-1252` is used as the concrete 8-bit
//! superset of ASCII -- every byte under 0x80 round-trips identically to
//! ASCII, which is all spec.md promises, and it is the encoding the
//! teacher crate already depends on `encoding_rs` for.

use std::borrow::Cow;

/// Decode bytes for display/storage, never failing.
#[inline]
pub fn decode_str_lossy(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => encoding_rs::WINDOWS_1252.decode(bytes).0,
    }
}

/// Encode a string to the on-disk 8-bit charset, replacing characters that
/// have no representation with `?`.
pub fn encode_str(s: &str) -> Vec<u8> {
    let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(s);
    bytes.into_owned()
}
