//! Export and import of the standard cowpatty hash-file format (§6, the
//! `export_cowpatty` CLI surface pyrit's storage feeds).
//!
//! Layout: a fixed header (`"APWD"` magic, version byte, a reserved pad
//! byte, then the ESSID's length and its 32-byte zero-padded record)
//! followed by one variable-length record per (password, PMK) pair:
//! `(pw_len: u8, pw: [u8; 32] zero-padded, pmk: [u8; 32])`.

use pyrit_core::{Essid, Password, StorageError};

const MAGIC: &[u8; 4] = b"APWD";
const VERSION: u8 = 0;
const ESSID_FIELD_LEN: usize = 32;
const HEADER_LEN: usize = 4 + 1 + 1 + 1 + ESSID_FIELD_LEN;
const RECORD_LEN: usize = 1 + ESSID_FIELD_LEN + 32;

/// Write the cowpatty header for `essid`.
pub fn write_header(essid: &Essid) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN);
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.push(0);
    let bytes = essid.as_bytes();
    out.push(bytes.len() as u8);
    let mut padded = [0u8; ESSID_FIELD_LEN];
    padded[..bytes.len()].copy_from_slice(bytes);
    out.extend_from_slice(&padded);
    out
}

/// Write one `(password, pmk)` record.
pub fn write_entry(password: &Password, pmk: &[u8; 32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(RECORD_LEN);
    let bytes = password.as_bytes();
    out.push(bytes.len() as u8);
    let mut padded = [0u8; ESSID_FIELD_LEN];
    padded[..bytes.len()].copy_from_slice(bytes);
    out.extend_from_slice(&padded);
    out.extend_from_slice(pmk);
    out
}

/// Export a full result set as a complete cowpatty file.
pub fn export(essid: &Essid, results: &[(Password, [u8; 32])]) -> Vec<u8> {
    let mut out = write_header(essid);
    out.reserve(results.len() * RECORD_LEN);
    for (pw, pmk) in results {
        out.extend_from_slice(&write_entry(pw, pmk));
    }
    out
}

/// Parse a cowpatty file back into its ESSID and (password, PMK) pairs
/// (§8: "Cowpatty re-import of an exported ESSID reproduces the stored
/// PMKs").
pub fn import(buf: &[u8]) -> Result<(Essid, Vec<(Password, [u8; 32])>), StorageError> {
    if buf.len() < HEADER_LEN {
        return Err(StorageError::Truncated);
    }
    if &buf[..4] != MAGIC {
        return Err(StorageError::BadMagic { expected: "APWD" });
    }
    let essid_len = buf[6] as usize;
    if essid_len > ESSID_FIELD_LEN {
        return Err(StorageError::InvalidHeaderSize);
    }
    let essid_bytes = buf[7..7 + essid_len].to_vec();
    let essid = Essid::new(essid_bytes).map_err(|_| StorageError::InvalidHeaderSize)?;

    let mut results = Vec::new();
    let mut offset = HEADER_LEN;
    while offset < buf.len() {
        if buf.len() - offset < RECORD_LEN {
            return Err(StorageError::PmkBufferTruncated);
        }
        let pw_len = buf[offset] as usize;
        if pw_len > ESSID_FIELD_LEN {
            return Err(StorageError::InvalidHeaderSize);
        }
        let pw_start = offset + 1;
        let pw_bytes = buf[pw_start..pw_start + pw_len].to_vec();
        let pmk_start = offset + 1 + ESSID_FIELD_LEN;
        let mut pmk = [0u8; 32];
        pmk.copy_from_slice(&buf[pmk_start..pmk_start + 32]);
        results.push((Password::from_stored(pw_bytes), pmk));
        offset += RECORD_LEN;
    }
    Ok((essid, results))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_essid_and_entries() {
        let essid = Essid::new(b"homenet".to_vec()).unwrap();
        let results = vec![
            (Password::new("barbarbar").unwrap(), [5u8; 32]),
            (Password::new("correcthorsebattery").unwrap(), [6u8; 32]),
        ];
        let buf = export(&essid, &results);
        let (decoded_essid, decoded) = import(&buf).unwrap();
        assert_eq!(decoded_essid, essid);
        assert_eq!(decoded, results);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = vec![0u8; HEADER_LEN];
        buf[..4].copy_from_slice(b"NOPE");
        assert!(matches!(import(&buf), Err(StorageError::BadMagic { .. })));
    }
}
