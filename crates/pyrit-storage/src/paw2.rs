//! PAW2 binary container: an immutable, digest-verified set of passwords
//! sharing one H1 bucket (§3, §4.1).
//!
//! On disk: magic `b"PAW2"` ++ `MD5(compressed body)` (16 bytes) ++ the
//! zlib-compressed body, where the body is every password joined by `"\n"`.
//! The bucket's key is the hex of that MD5 digest.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use md5::{Digest, Md5};
use std::io::{Read, Write};

use pyrit_core::{BucketKey, Password, StorageError};

const MAGIC: &[u8; 4] = b"PAW2";
const DIGEST_LEN: usize = 16;

/// Compress and digest `passwords`, returning the bucket's key and the
/// bytes to write to disk. `passwords` is taken as a slice rather than a
/// `HashSet` so callers decide whether uniqueness was already enforced
/// in-memory (§4.2's unique-check vs. list mode).
pub fn encode(passwords: &[Password]) -> (BucketKey, Vec<u8>) {
    let joined = join_passwords(passwords, b"\n");
    let compressed = zlib_compress(&joined);
    let digest = md5(&compressed);
    let key = BucketKey::from_hex(pyrit_core_hex(&digest));

    let mut out = Vec::with_capacity(MAGIC.len() + DIGEST_LEN + compressed.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&digest);
    out.extend_from_slice(&compressed);
    (key, out)
}

/// Decode a PAW2 buffer, verifying its magic and digest. Returns the bucket
/// key (computed from the buffer, not trusted from the caller) and the
/// passwords in on-disk order.
pub fn decode(buf: &[u8]) -> Result<(BucketKey, Vec<Password>), StorageError> {
    if buf.len() < MAGIC.len() + DIGEST_LEN {
        return Err(StorageError::Truncated);
    }
    if &buf[..MAGIC.len()] != MAGIC {
        return Err(StorageError::BadMagic { expected: "PAW2" });
    }
    let stored_digest = &buf[MAGIC.len()..MAGIC.len() + DIGEST_LEN];
    let compressed = &buf[MAGIC.len() + DIGEST_LEN..];

    let actual_digest = md5(compressed);
    if actual_digest != stored_digest {
        return Err(StorageError::Digest);
    }

    let joined = zlib_decompress(compressed)?;
    let passwords = joined
        .split(|&b| b == b'\n')
        .map(|slice| Password::from_stored(slice.to_vec()))
        .collect();
    Ok((BucketKey::from_hex(pyrit_core_hex(&actual_digest)), passwords))
}

pub(crate) fn join_passwords(passwords: &[Password], sep: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, pw) in passwords.iter().enumerate() {
        if i > 0 {
            out.extend_from_slice(sep);
        }
        out.extend_from_slice(pw.as_bytes());
    }
    out
}

fn zlib_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(1));
    encoder.write_all(data).expect("writing to a Vec cannot fail");
    encoder.finish().expect("writing to a Vec cannot fail")
}

fn zlib_decompress(data: &[u8]) -> Result<Vec<u8>, StorageError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

fn md5(data: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn pyrit_core_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(s, "{b:02x}").expect("writing to a String cannot fail");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pw(s: &str) -> Password {
        Password::new(s).unwrap()
    }

    #[test]
    fn round_trips_a_set_of_passwords() {
        let passwords = vec![pw("barbarbar"), pw("correcthorsebattery")];
        let (key, bytes) = encode(&passwords);
        let (decoded_key, decoded) = decode(&bytes).unwrap();
        assert_eq!(key, decoded_key);
        assert_eq!(decoded, passwords);
    }

    #[test]
    fn key_equals_hex_md5_of_compressed_body() {
        let passwords = vec![pw("barbarbar")];
        let (key, bytes) = encode(&passwords);
        let compressed = &bytes[MAGIC.len() + DIGEST_LEN..];
        let expected = pyrit_core_hex(&md5(compressed));
        assert_eq!(key.as_str(), expected);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = vec![b'X'; 20];
        buf[0..4].copy_from_slice(b"NOPE");
        assert!(matches!(decode(&buf), Err(StorageError::BadMagic { .. })));
    }

    #[test]
    fn rejects_tampered_digest() {
        let passwords = vec![pw("barbarbar")];
        let (_, mut bytes) = encode(&passwords);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(decode(&bytes), Err(StorageError::Digest)));
    }
}
