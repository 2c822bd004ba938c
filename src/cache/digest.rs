//! Hashing and ordering helpers shared by the key builder

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Number of hex characters kept from each digest
pub const DIGEST_HEX_LEN: usize = 8;

/// Sort by byte-wise ordinal comparison and drop adjacent duplicates
///
/// Locale-independent, so the result only depends on the set of inputs and
/// never on the order they were enumerated in.
pub fn sort_unique<T: AsRef<[u8]> + PartialEq>(mut items: Vec<T>) -> Vec<T> {
    items.sort_by(|a, b| a.as_ref().cmp(b.as_ref()));
    items.dedup();
    items
}

/// Incremental SHA-256 whose output is truncated to `DIGEST_HEX_LEN` hex chars
#[derive(Clone, Default)]
pub struct KeyHasher {
    inner: Sha256,
}

impl KeyHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: impl AsRef<[u8]>) {
        self.inner.update(data.as_ref());
    }

    /// Stream a file's bytes into the hasher
    ///
    /// Returns `Ok(false)` without touching the hasher when the file does not exist.
    pub fn update_file(&mut self, path: &Path) -> io::Result<bool> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };

        let mut buf = [0u8; 8192];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            self.inner.update(&buf[..n]);
        }
        Ok(true)
    }

    /// Finish and return the truncated hex digest
    pub fn finish(self) -> String {
        let digest = self.inner.finalize();
        let mut hex = hex::encode(&digest[..DIGEST_HEX_LEN.div_ceil(2)]);
        hex.truncate(DIGEST_HEX_LEN);
        hex
    }
}
