//! 128-bit content fingerprints.
//!
//! Fingerprints are xxh3-128 digests of a file's entire byte content.
//! Equality of fingerprints is a strong indicator of content equality, but
//! is not cryptographically proven.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use xxhash_rust::xxh3::Xxh3;

/// Read buffer size for streaming file hashing.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// A 128-bit content fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub u128);

impl Fingerprint {
    /// The fingerprint of zero bytes of input. Files of size 0 hash to this
    /// without being opened.
    pub const EMPTY: Fingerprint = Fingerprint(0x99aa06d3014798d86001c324468d497f);

    /// Lowercase hex rendering, exactly 32 characters, high 64 bits first.
    pub fn to_hex(self) -> String {
        format!("{:032x}", self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:032x})", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Fingerprint an in-memory buffer.
pub fn fingerprint_bytes(bytes: &[u8]) -> Fingerprint {
    Fingerprint(xxhash_rust::xxh3::xxh3_128(bytes))
}

/// Stream `file` through the fingerprinter in a single pass.
///
/// Returns the fingerprint and the number of bytes actually read, which may
/// differ from the size reported at discovery if the file changed in the
/// meantime.
pub fn fingerprint_reader<R: Read>(mut reader: R) -> io::Result<(Fingerprint, u64)> {
    let mut hasher = Xxh3::new();
    let mut buffer = [0u8; READ_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        total += n as u64;
    }
    Ok((Fingerprint(hasher.digest128()), total))
}

/// Open and fingerprint a file on disk.
pub fn fingerprint_file(path: &Path) -> io::Result<(Fingerprint, u64)> {
    let file = File::open(path)?;
    fingerprint_reader(file)
}
