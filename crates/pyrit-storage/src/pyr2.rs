//! PYR2/PYRT binary container: an ordered sequence of (password, PMK) pairs
//! solved for one (ESSID, BucketKey) (§3, §4.1).
//!
//! On disk: little-endian header `<"PYR2"|"PYRT", essid_len:u16, essid,
//! n:i32, md5_digest:16>` followed by `n*32` PMK bytes and a zlib-compressed
//! password list. PYR2 joins passwords with `"\n"` and digests the
//! *compressed* password bytes; the legacy PYRT variant joins with `"\x00"`
//! and digests the *decompressed* (concatenated, undelimited) password
//! bytes. Readers accept both; [`encode`] only ever emits PYR2.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use md5::{Digest, Md5};
use std::io::{Read, Write};

use pyrit_core::{Essid, Password, StorageError};

const MAGIC_PYR2: &[u8; 4] = b"PYR2";
const MAGIC_PYRT: &[u8; 4] = b"PYRT";
const PMK_LEN: usize = 32;
const DIGEST_LEN: usize = 16;

/// One (password, PMK) pair as stored in a result set, in submission order.
pub type ResultPair = (Password, [u8; PMK_LEN]);

/// Encode `results` for `essid` into a PYR2 buffer. Order is preserved
/// exactly: the i-th pair on disk is the i-th pair in `results`.
pub fn encode(essid: &Essid, results: &[ResultPair]) -> Vec<u8> {
    let mut pmk_bytes = Vec::with_capacity(results.len() * PMK_LEN);
    for (_, pmk) in results {
        pmk_bytes.extend_from_slice(pmk);
    }
    let passwords: Vec<&Password> = results.iter().map(|(pw, _)| pw).collect();
    let joined = join(&passwords, b"\n");
    let pw_bytes = zlib_compress(&joined);

    let mut digest_input = Vec::with_capacity(essid.as_bytes().len() + pmk_bytes.len() + pw_bytes.len());
    digest_input.extend_from_slice(essid.as_bytes());
    digest_input.extend_from_slice(&pmk_bytes);
    digest_input.extend_from_slice(&pw_bytes);
    let digest = md5(&digest_input);

    let essid_bytes = essid.as_bytes();
    let mut out = Vec::with_capacity(
        4 + 2 + essid_bytes.len() + 4 + DIGEST_LEN + pmk_bytes.len() + pw_bytes.len(),
    );
    out.extend_from_slice(MAGIC_PYR2);
    out.extend_from_slice(&(essid_bytes.len() as u16).to_le_bytes());
    out.extend_from_slice(essid_bytes);
    out.extend_from_slice(&(results.len() as i32).to_le_bytes());
    out.extend_from_slice(&digest);
    out.extend_from_slice(&pmk_bytes);
    out.extend_from_slice(&pw_bytes);
    out
}

/// Decode a PYR2 or legacy PYRT buffer, verifying its digest. Returns the
/// embedded ESSID (callers check it against the directory they read the
/// file from, §3/§4.3) and the ordered (password, PMK) pairs.
pub fn decode(buf: &[u8]) -> Result<(Essid, Vec<ResultPair>), StorageError> {
    const PREFIX_LEN: usize = 4 + 2;
    if buf.len() < PREFIX_LEN {
        return Err(StorageError::Truncated);
    }
    let magic = &buf[..4];
    let legacy = if magic == MAGIC_PYR2 {
        false
    } else if magic == MAGIC_PYRT {
        true
    } else {
        return Err(StorageError::BadMagic { expected: "PYR2" });
    };
    let essid_len = u16::from_le_bytes([buf[4], buf[5]]) as usize;

    let header_len = PREFIX_LEN + essid_len + 4 + DIGEST_LEN;
    if buf.len() < header_len {
        return Err(StorageError::InvalidHeaderSize);
    }
    let essid_bytes = &buf[PREFIX_LEN..PREFIX_LEN + essid_len];
    let n_off = PREFIX_LEN + essid_len;
    let n_signed = i32::from_le_bytes(buf[n_off..n_off + 4].try_into().expect("checked length"));
    if n_signed < 0 {
        return Err(StorageError::InvalidHeaderSize);
    }
    let n = n_signed as usize;
    let digest_off = n_off + 4;
    let stored_digest = &buf[digest_off..digest_off + DIGEST_LEN];

    let pmk_off = header_len;
    let pmk_len = n.checked_mul(PMK_LEN).ok_or(StorageError::InvalidHeaderSize)?;
    if buf.len() < pmk_off + pmk_len {
        return Err(StorageError::PmkBufferTruncated);
    }
    let pmk_bytes = &buf[pmk_off..pmk_off + pmk_len];
    let pw_bytes = &buf[pmk_off + pmk_len..];

    let decompressed = zlib_decompress(pw_bytes)?;
    let delimiter: u8 = if legacy { b'\0' } else { b'\n' };
    let passwords: Vec<&[u8]> = decompressed.split(|&b| b == delimiter).collect();
    if passwords.len() != n {
        return Err(StorageError::InvalidHeaderSize);
    }

    let mut digest_input = Vec::with_capacity(essid_bytes.len() + pmk_bytes.len() + pw_bytes.len());
    digest_input.extend_from_slice(essid_bytes);
    digest_input.extend_from_slice(pmk_bytes);
    if legacy {
        for pw in &passwords {
            digest_input.extend_from_slice(pw);
        }
    } else {
        digest_input.extend_from_slice(pw_bytes);
    }
    if md5(&digest_input) != stored_digest {
        return Err(StorageError::Digest);
    }

    let essid = Essid::new(essid_bytes.to_vec()).map_err(|_| StorageError::InvalidHeaderSize)?;
    let results = passwords
        .into_iter()
        .zip(pmk_bytes.chunks_exact(PMK_LEN))
        .map(|(pw, pmk)| {
            let mut out = [0u8; PMK_LEN];
            out.copy_from_slice(pmk);
            (Password::from_stored(pw.to_vec()), out)
        })
        .collect();
    Ok((essid, results))
}

fn join(passwords: &[&Password], sep: &[u8]) -> Vec<u8> {
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

fn md5(data: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pw(s: &str) -> Password {
        Password::new(s).unwrap()
    }

    fn sample() -> (Essid, Vec<ResultPair>) {
        let essid = Essid::new(b"testnet".to_vec()).unwrap();
        let results = vec![
            (pw("barbarbar"), [1u8; 32]),
            (pw("correcthorsebattery"), [2u8; 32]),
        ];
        (essid, results)
    }

    #[test]
    fn round_trips_ordered_pairs() {
        let (essid, results) = sample();
        let buf = encode(&essid, &results);
        let (decoded_essid, decoded) = decode(&buf).unwrap();
        assert_eq!(decoded_essid, essid);
        assert_eq!(decoded, results);
    }

    #[test]
    fn pmk_region_length_is_32_times_n() {
        let (essid, results) = sample();
        let buf = encode(&essid, &results);
        let essid_len = essid.as_bytes().len();
        let header_len = 4 + 2 + essid_len + 4 + DIGEST_LEN;
        let n = results.len();
        assert!(buf.len() >= header_len + n * 32);
    }

    #[test]
    fn rejects_tampered_digest() {
        let (essid, results) = sample();
        let mut buf = encode(&essid, &results);
        let last = buf.len() - 1;
        buf[last] ^= 0xFF;
        assert!(matches!(decode(&buf), Err(StorageError::Digest)));
    }

    #[test]
    fn decodes_legacy_pyrt_with_nul_delimiter_and_decompressed_digest() {
        let essid = Essid::new(b"legacy".to_vec()).unwrap();
        let results = vec![(pw("barbarbar"), [9u8; 32]), (pw("secondpassword"), [8u8; 32])];
        let passwords: Vec<&Password> = results.iter().map(|(pw, _)| pw).collect();
        let joined = join(&passwords, b"\0");
        let pw_bytes = zlib_compress(&joined);
        let mut pmk_bytes = Vec::new();
        for (_, pmk) in &results {
            pmk_bytes.extend_from_slice(pmk);
        }
        let mut digest_input = Vec::new();
        digest_input.extend_from_slice(essid.as_bytes());
        digest_input.extend_from_slice(&pmk_bytes);
        for pw in &passwords {
            digest_input.extend_from_slice(pw.as_bytes());
        }
        let digest = md5(&digest_input);

        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC_PYRT);
        buf.extend_from_slice(&(essid.as_bytes().len() as u16).to_le_bytes());
        buf.extend_from_slice(essid.as_bytes());
        buf.extend_from_slice(&(results.len() as i32).to_le_bytes());
        buf.extend_from_slice(&digest);
        buf.extend_from_slice(&pmk_bytes);
        buf.extend_from_slice(&pw_bytes);

        let (decoded_essid, decoded) = decode(&buf).unwrap();
        assert_eq!(decoded_essid, essid);
        assert_eq!(decoded, results);
    }
}
