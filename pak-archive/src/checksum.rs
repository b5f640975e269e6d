//! 32-bit block checksums used as content identity.
//!
//! A pack's checksum is computed over the little-endian CRC32 values of its
//! non-empty entries in enumeration order, folded through a digest so that
//! any single-bit change inside any entry changes the result. The checksum
//! is the sole cross-session identifier for a pack; filenames are not
//! guaranteed unique across search roots.

use byteorder::{LittleEndian, WriteBytesExt};

/// Fold a digest over `data` down to 32 bits by xoring the four words of
/// the 16-byte digest together.
pub fn file_checksum(data: &[u8]) -> u32 {
    let digest = md5::compute(data).0;
    let mut folded = 0u32;
    for word in digest.chunks_exact(4) {
        folded ^= u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
    }
    folded
}

/// Checksum of a pack, given the CRC32 of every non-empty entry in
/// enumeration order.
pub fn content_checksum(entry_crcs: &[u32]) -> u32 {
    let mut buf = Vec::with_capacity(entry_crcs.len() * 4);
    for &crc in entry_crcs {
        // infallible for Vec, but WriteBytesExt is an io trait
        let _ = buf.write_u32::<LittleEndian>(crc);
    }
    file_checksum(&buf)
}
