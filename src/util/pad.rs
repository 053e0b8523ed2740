//! 4-byte alignment helpers.
//!
//! Every table section, GLB chunk, and tile body in these formats must land
//! on a 4-byte boundary: JSON text is padded with ASCII spaces (still valid
//! JSON trailing whitespace), binary data with zero bytes.

/// Round `len` up to the next multiple of 4.
#[inline]
pub const fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

/// Pad a JSON buffer to a 4-byte multiple with ASCII spaces.
pub fn pad_json(buf: &mut Vec<u8>) {
    let target = padded_len(buf.len());
    buf.resize(target, b' ');
}

/// Pad a binary buffer to a 4-byte multiple with zero bytes.
pub fn pad_binary(buf: &mut Vec<u8>) {
    let target = padded_len(buf.len());
    buf.resize(target, 0);
}
