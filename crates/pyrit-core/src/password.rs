use std::fmt;

/// A candidate password, trimmed of trailing CR/LF and restricted to the
/// 8..=63 byte range the PSK key-derivation accepts (§3). Construction
/// silently rejects out-of-range input (§4.2: "Rejected silently if outside
/// range") rather than erroring, matching `store_password`'s behavior.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Password(Vec<u8>);

impl Password {
    pub const MIN_LEN: usize = 8;
    pub const MAX_LEN: usize = 63;

    /// Trim trailing `\r`/`\n` and validate length. Returns `None` for
    /// passwords outside `MIN_LEN..=MAX_LEN`, mirroring the silent drop in
    /// `PasswordStore.store_password`.
    pub fn new(raw: impl AsRef<[u8]>) -> Option<Self> {
        let raw = raw.as_ref();
        let trimmed_len = raw
            .iter()
            .rposition(|b| *b != b'\r' && *b != b'\n')
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let trimmed = &raw[..trimmed_len];
        if trimmed.len() < Self::MIN_LEN || trimmed.len() > Self::MAX_LEN {
            return None;
        }
        Some(Password(trimmed.to_vec()))
    }

    /// Construct without validating; used by codecs decoding already-stored
    /// passwords, which are trusted to have passed validation on write.
    pub(crate) fn from_stored(bytes: Vec<u8>) -> Self {
        Password(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// H1: one of 256 two-hex-digit bucket selectors, `hash(password) & 0xFF`
    /// (§3). CPython's `hash()` is per-process randomized for strings, so
    /// there is no single canonical numeric value to reproduce; we use a
    /// fixed, deterministic FNV-1a hash instead. This preserves every
    /// property the spec actually depends on (stable sharding into 256 bins,
    /// bounded dedup/flush scope) without tying the on-disk layout to an
    /// implementation detail of another language's runtime.
    pub fn h1(&self) -> H1 {
        H1(fnv1a(&self.0) as u8)
    }
}

fn fnv1a(bytes: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Bucket selector derived from a password's hash, rendered as its canonical
/// two-hex-digit form (e.g. `"00"`, `"ff"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct H1(pub u8);

impl H1 {
    pub fn as_str(&self) -> String {
        format!("{:02x}", self.0)
    }

    pub fn all() -> impl Iterator<Item = H1> {
        (0..=255u8).map(H1)
    }

    pub fn parse(s: &str) -> Option<H1> {
        if s.len() != 2 {
            return None;
        }
        u8::from_str_radix(s, 16).ok().map(H1)
    }
}

impl fmt::Display for H1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_filter_matches_spec_scenario() {
        assert!(Password::new("1234567").is_none());
        assert!(Password::new("a".repeat(63)).is_some());
        assert!(Password::new("a".repeat(64)).is_none());
        assert!(Password::new("a".repeat(8)).is_some());
    }

    #[test]
    fn trims_trailing_line_terminators() {
        let pw = Password::new("barbarbar\r\n").unwrap();
        assert_eq!(pw.as_bytes(), b"barbarbar");
    }

    #[test]
    fn h1_is_stable_and_two_hex_digits() {
        let pw = Password::new("barbarbar").unwrap();
        let h1 = pw.h1();
        assert_eq!(h1, pw.h1());
        assert_eq!(h1.as_str().len(), 2);
        assert_eq!(H1::parse(&h1.as_str()), Some(h1));
    }
}
