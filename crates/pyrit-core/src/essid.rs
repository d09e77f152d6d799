use md5::{Digest, Md5};
use std::fmt;

use crate::error::ValueError;

/// A wireless network name: a byte string of length 1..=32 (§3).
///
/// ESSIDs are arbitrary bytes in the wild (not necessarily valid UTF-8), so
/// this wraps a `Vec<u8>` rather than a `String`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Essid(Vec<u8>);

impl Essid {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, ValueError> {
        let bytes = bytes.into();
        if bytes.is_empty() || bytes.len() > 32 {
            return Err(ValueError::InvalidEssidLength(bytes.len()));
        }
        Ok(Essid(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// The first 8 hex digits of MD5(essid), used as the directory/identifier
    /// for this ESSID in the filesystem layout (§3, §4.3).
    pub fn short_digest(&self) -> String {
        let full = self.full_digest_hex();
        full[..8].to_string()
    }

    pub fn full_digest_hex(&self) -> String {
        let mut hasher = Md5::new();
        hasher.update(&self.0);
        let digest = hasher.finalize();
        hex_encode(&digest)
    }
}

impl fmt::Display for Essid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "{}", hex_encode(&self.0)),
        }
    }
}

pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(s, "{b:02x}").expect("writing to a String cannot fail");
    }
    s
}
