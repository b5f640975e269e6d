//! Filename hashing and comparison.
//!
//! The hash deliberately stops at the first `.` so that lookups that only
//! differ in extension land in the same bucket; full-name equality is
//! checked afterwards with [`filename_eq`]. The same function must be used
//! when the catalog is built and when it is queried.

/// Number of hash buckets per pack catalog. Power of two.
pub const FILE_HASH_SIZE: usize = 1024;

/// Hash a relative filename into a catalog bucket index.
///
/// Lowercases each character, maps `\` to `/`, and accumulates
/// `letter * (position + 119)` up to (not including) the extension.
pub fn name_hash(name: &str) -> usize {
    let mut hash: i64 = 0;
    for (i, byte) in name.bytes().enumerate() {
        let mut letter = byte.to_ascii_lowercase();
        if letter == b'.' {
            break; // don't include extension
        }
        if letter == b'\\' {
            letter = b'/';
        }
        hash += i64::from(letter) * (i as i64 + 119);
    }
    (hash as usize) & (FILE_HASH_SIZE - 1)
}

/// Case-insensitive filename equality that treats `\`, `/` and `:` as the
/// same separator character. Relative paths arrive from several OS and
/// archive origins with inconsistent separator conventions.
pub fn filename_eq(s1: &str, s2: &str) -> bool {
    if s1.len() != s2.len() {
        // fold() below is per-byte, so differing lengths can never compare equal
        return false;
    }
    s1.bytes().zip(s2.bytes()).all(|(a, b)| fold(a) == fold(b))
}

fn fold(c: u8) -> u8 {
    match c {
        b'\\' | b':' => b'/',
        _ => c.to_ascii_uppercase(),
    }
}
