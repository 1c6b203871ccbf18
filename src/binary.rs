//! Low-level byte encodings shared by the loose-object and pack readers.
//!
//! Two distinct 7-bit variable-length integer encodings are used inside a
//! packfile, and mixing them up is the easiest mistake to make in this
//! crate (see spec's "Endianness" design note): size encoding is
//! little-endian, offset encoding is big-endian with a per-byte `+1` bias.

use std::io::Read;

/// Reads bytes until a NUL byte (consumed, not returned) or EOF.
///
/// EOF terminates rather than errors — this matches how object headers are
/// framed inside an unknown-length zlib stream.
pub fn read_nul_terminated_string(reader: &mut impl Read) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte)? {
            0 => break,
            _ if byte[0] == 0 => break,
            _ => out.push(byte[0]),
        }
    }
    Ok(out)
}

/// Little-endian 7-bit variable-length unsigned integer.
///
/// Byte `i`'s low 7 bits contribute to bits `[7i, 7i+7)` of the result;
/// the top bit of each byte signals "more bytes follow".
pub fn decode_size_encoding(reader: &mut impl Read) -> std::io::Result<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    let mut consumed = 0usize;
    loop {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte)?;
        consumed += 1;
        value |= ((byte[0] & 0x7f) as u64) << shift;
        shift += 7;
        if byte[0] & 0x80 == 0 {
            break;
        }
    }
    Ok((value, consumed))
}

/// Big-endian 7-bit variable-length unsigned integer with a canonical
/// per-continuation-byte `+1` bias (the packfile's `ofs-delta` distance
/// encoding). Do not confuse with [`decode_size_encoding`].
pub fn decode_offset_encoding(reader: &mut impl Read) -> std::io::Result<(u64, usize)> {
    let mut bytes = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte)?;
        bytes.push(byte[0]);
        if byte[0] & 0x80 == 0 {
            break;
        }
    }

    let mut value: u64 = (bytes[0] & 0x7f) as u64;
    for &byte in &bytes[1..] {
        value += 1;
        value = (value << 7) | (byte & 0x7f) as u64;
    }
    Ok((value, bytes.len()))
}
