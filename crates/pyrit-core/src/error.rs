use thiserror::Error;

/// Errors raised by the storage layer (§7: "malformed container, wrong
/// ESSID, bad header"). `Digest` plays the role of the Python hierarchy's
/// `DigestError(StorageError)` subclass: it is a distinct variant so callers
/// can narrow on it with `matches!`, but it still travels as a `StorageError`
/// so a caller that only handles the parent case keeps working.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not a {expected} buffer: bad magic")]
    BadMagic { expected: &'static str },
    #[error("buffer too short")]
    Truncated,
    #[error("pmkbuffer truncated")]
    PmkBufferTruncated,
    #[error("invalid header size")]
    InvalidHeaderSize,
    #[error("digest check failed")]
    Digest,
    #[error("ESSID '{0}' is not created in this store")]
    EssidNotCreated(String),
    #[error("file '{path}' does not match the key '{key}'")]
    KeyMismatch { path: String, key: String },
    #[error("result-collection carries an unexpected ESSID")]
    EssidMismatch,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn is_digest_error(&self) -> bool {
        matches!(self, StorageError::Digest)
    }
}

/// Thin wrapper for call sites that only ever want to express "the digest
/// didn't match" without pulling in the rest of [`StorageError`]'s variants.
#[derive(Debug, Error)]
#[error("digest check failed")]
pub struct DigestError;

/// Bad input to a validated constructor (ESSID/password length, workunit
/// size, ...), or a storage backend repackaging a unique-constraint race.
#[derive(Debug, Error)]
pub enum ValueError {
    #[error("ESSID length must be 1..=32 bytes, got {0}")]
    InvalidEssidLength(usize),
    #[error("workunit_size must be 1..=1_000_000, got {0}")]
    InvalidWorkunitSize(i64),
    #[error("{0}")]
    Other(String),
}

/// Unknown ESSID or key lookups against a store.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("ESSID not in store")]
    UnknownEssid,
    #[error("no result for ESSID:key ({essid}:{key})")]
    UnknownResult { essid: String, key: String },
    #[error("key '{0}' not in password store")]
    UnknownPasswordKey(String),
}

/// Runtime conditions the scheduler and higher layers must surface rather
/// than deadlock or silently swallow (§7).
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("core '{0}' has died unexpectedly")]
    CoreDied(String),
    #[error("no handshake available for this station")]
    NoHandshake,
    #[error("more than one access point matches selection, be more specific")]
    AmbiguousApSelection,
    #[error("capture file is missing or unreadable: {0}")]
    MissingCapture(String),
}

/// The union of everything a pyrit operation can fail with.
#[derive(Debug, Error)]
pub enum PyritError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type Result<T, E = PyritError> = std::result::Result<T, E>;
