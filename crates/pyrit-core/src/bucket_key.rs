use std::fmt;

/// Hex MD5 digest identifying a password bucket (PAW2) or result set
/// (shares its key with the bucket it was solved from). Identical content
/// always collapses to the same key (§3).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey(String);

impl BucketKey {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        BucketKey(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
