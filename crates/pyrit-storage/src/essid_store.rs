//! Filesystem-backed ESSID store: PYR2 result sets keyed by (ESSID,
//! BucketKey) (§3, §4.3).
//!
//! Layout: `<base>/<first-8-hex-of-md5(essid)>/essid` (raw ESSID bytes, for
//! corruption detection) and `<base>/<same>/<bucketkey>.pyr`.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use pyrit_core::{BucketKey, Essid, KeyError, StorageError};
use tracing::warn;

use crate::pyr2::{self, ResultPair};

struct EssidEntry {
    dir: PathBuf,
    /// bucket key -> `.pyr` file path.
    keys: HashMap<BucketKey, PathBuf>,
}

pub struct FsEssidStore {
    base: PathBuf,
    essids: HashMap<Essid, EssidEntry>,
}

impl FsEssidStore {
    /// Open (creating if absent) the ESSID store rooted at `base`. Any
    /// subdirectory whose name doesn't equal the first 8 hex digits of
    /// MD5(stored essid) is logged and skipped (§4.3 corruption handling).
    pub fn open(base: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base = base.into();
        fs::create_dir_all(&base)?;
        let mut essids = HashMap::new();
        for entry in fs::read_dir(&base)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let dir = entry.path();
            let hash_name = entry.file_name().to_string_lossy().into_owned();
            let essid_file = dir.join("essid");
            let Ok(essid_bytes) = fs::read(&essid_file) else {
                warn!(dir = %dir.display(), "ESSID directory missing its 'essid' marker file, skipped");
                continue;
            };
            let Ok(essid) = Essid::new(essid_bytes) else {
                warn!(dir = %dir.display(), "stored ESSID is invalid, skipped");
                continue;
            };
            if essid.short_digest() != hash_name {
                warn!(dir = %dir.display(), essid = %essid, "ESSID directory is corrupted, skipped");
                continue;
            }
            let mut keys = HashMap::new();
            for pyr_entry in fs::read_dir(&dir)? {
                let pyr_entry = pyr_entry?;
                let name = pyr_entry.file_name();
                let name = name.to_string_lossy();
                if let Some(key_str) = name.strip_suffix(".pyr") {
                    keys.insert(BucketKey::from_hex(key_str.to_string()), pyr_entry.path());
                }
            }
            essids.insert(essid, EssidEntry { dir, keys });
        }
        Ok(FsEssidStore { base, essids })
    }

    /// Idempotent (§4.3). Validates length 1..=32 via [`Essid::new`] at the
    /// call site; this method only deals with already-validated ESSIDs.
    pub fn create_essid(&mut self, essid: Essid) -> Result<(), StorageError> {
        if self.essids.contains_key(&essid) {
            return Ok(());
        }
        let dir = self.base.join(essid.short_digest());
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("essid"), essid.as_bytes())?;
        self.essids.insert(
            essid,
            EssidEntry {
                dir,
                keys: HashMap::new(),
            },
        );
        Ok(())
    }

    pub fn contains(&self, essid: &Essid) -> bool {
        self.essids.contains_key(essid)
    }

    pub fn iter_essids(&self) -> impl Iterator<Item = &Essid> {
        self.essids.keys()
    }

    pub fn contains_key(&self, essid: &Essid, key: &BucketKey) -> Result<bool, KeyError> {
        let entry = self.essids.get(essid).ok_or(KeyError::UnknownEssid)?;
        Ok(entry.keys.contains_key(key))
    }

    pub fn key_count(&self, essid: &Essid) -> Result<usize, KeyError> {
        let entry = self.essids.get(essid).ok_or(KeyError::UnknownEssid)?;
        Ok(entry.keys.len())
    }

    pub fn iter_keys<'a>(&'a self, essid: &Essid) -> Result<impl Iterator<Item = &'a BucketKey>, KeyError> {
        let entry = self.essids.get(essid).ok_or(KeyError::UnknownEssid)?;
        Ok(entry.keys.keys())
    }

    pub fn get(&self, essid: &Essid, key: &BucketKey) -> Result<Vec<ResultPair>, StorageError> {
        let entry = self
            .essids
            .get(essid)
            .ok_or_else(|| StorageError::EssidNotCreated(essid.to_string()))?;
        let path = entry
            .keys
            .get(key)
            .ok_or(StorageError::KeyMismatch {
                path: entry.dir.display().to_string(),
                key: key.as_str().to_string(),
            })?;
        let buf = fs::read(path)?;
        let (stored_essid, results) = pyr2::decode(&buf)?;
        if &stored_essid != essid {
            return Err(StorageError::EssidMismatch);
        }
        Ok(results)
    }

    /// Write a result set under `(essid, key)`. Rejects if `essid` has not
    /// been created (§4.3).
    pub fn put(&mut self, essid: &Essid, key: BucketKey, results: &[ResultPair]) -> Result<(), StorageError> {
        let entry = self
            .essids
            .get_mut(essid)
            .ok_or_else(|| StorageError::EssidNotCreated(essid.to_string()))?;
        let path = entry.dir.join(format!("{key}.pyr"));
        let buf = pyr2::encode(essid, results);
        fs::write(&path, buf)?;
        entry.keys.insert(key, path);
        Ok(())
    }

    /// Delete every result set for `essid` and the ESSID directory itself.
    pub fn delete_essid(&mut self, essid: &Essid) -> Result<(), StorageError> {
        let entry = self
            .essids
            .remove(essid)
            .ok_or_else(|| StorageError::EssidNotCreated(essid.to_string()))?;
        for path in entry.keys.values() {
            fs::remove_file(path)?;
        }
        fs::remove_file(entry.dir.join("essid"))?;
        fs::remove_dir(&entry.dir)?;
        Ok(())
    }

    /// Delete a single `(essid, key)` result set.
    pub fn delete_key(&mut self, essid: &Essid, key: &BucketKey) -> Result<(), StorageError> {
        let entry = self
            .essids
            .get_mut(essid)
            .ok_or_else(|| StorageError::EssidNotCreated(essid.to_string()))?;
        let path = entry.keys.remove(key).ok_or(StorageError::KeyMismatch {
            path: entry.dir.display().to_string(),
            key: key.as_str().to_string(),
        })?;
        fs::remove_file(path)?;
        Ok(())
    }

    /// Lazily iterate over every stored result set for `essid`.
    pub fn iter_results<'a>(
        &'a self,
        essid: &'a Essid,
    ) -> Result<impl Iterator<Item = Result<Vec<ResultPair>, StorageError>> + 'a, KeyError> {
        let keys: Vec<BucketKey> = self.iter_keys(essid)?.cloned().collect();
        Ok(keys.into_iter().map(move |key| self.get(essid, &key)))
    }

    /// Lazily iterate over `(key, result set)` pairs for `essid`.
    pub fn iter_items<'a>(
        &'a self,
        essid: &'a Essid,
    ) -> Result<impl Iterator<Item = (BucketKey, Result<Vec<ResultPair>, StorageError>)> + 'a, KeyError> {
        let keys: Vec<BucketKey> = self.iter_keys(essid)?.cloned().collect();
        Ok(keys
            .into_iter()
            .map(move |key| {
                let result = self.get(essid, &key);
                (key, result)
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyrit_core::Password;
    use tempfile::tempdir;

    fn essid(s: &str) -> Essid {
        Essid::new(s.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn create_is_idempotent_and_rejects_unwritten_essids() {
        let dir = tempdir().unwrap();
        let mut store = FsEssidStore::open(dir.path()).unwrap();
        let net = essid("net1");
        store.create_essid(net.clone()).unwrap();
        store.create_essid(net.clone()).unwrap();
        assert!(store.contains(&net));
        assert_eq!(store.iter_essids().count(), 1);

        let other = essid("net2");
        let results = vec![(Password::new("barbarbar").unwrap(), [1u8; 32])];
        assert!(store.put(&other, BucketKey::from_hex("x"), &results).is_err());
    }

    #[test]
    fn put_and_get_round_trips() {
        let dir = tempdir().unwrap();
        let mut store = FsEssidStore::open(dir.path()).unwrap();
        let net = essid("net1");
        store.create_essid(net.clone()).unwrap();
        let results = vec![
            (Password::new("barbarbar").unwrap(), [1u8; 32]),
            (Password::new("correcthorsebattery").unwrap(), [2u8; 32]),
        ];
        let key = BucketKey::from_hex("deadbeef");
        store.put(&net, key.clone(), &results).unwrap();
        assert!(store.contains_key(&net, &key).unwrap());
        assert_eq!(store.key_count(&net).unwrap(), 1);
        let fetched = store.get(&net, &key).unwrap();
        assert_eq!(fetched, results);
    }

    #[test]
    fn delete_essid_removes_directory_and_allows_recreate() {
        let dir = tempdir().unwrap();
        let mut store = FsEssidStore::open(dir.path()).unwrap();
        let net = essid("net1");
        store.create_essid(net.clone()).unwrap();
        let results = vec![(Password::new("barbarbar").unwrap(), [1u8; 32])];
        store.put(&net, BucketKey::from_hex("abc123"), &results).unwrap();

        store.delete_essid(&net).unwrap();
        assert!(!store.contains(&net));

        store.create_essid(net.clone()).unwrap();
        assert!(store.contains(&net));
        assert_eq!(store.key_count(&net).unwrap(), 0);
    }

    #[test]
    fn reopen_skips_corrupted_directories() {
        let dir = tempdir().unwrap();
        {
            let mut store = FsEssidStore::open(dir.path()).unwrap();
            store.create_essid(essid("net1")).unwrap();
        }
        fs::create_dir_all(dir.path().join("zzzzzzzz")).unwrap();
        fs::write(dir.path().join("zzzzzzzz").join("essid"), b"net1").unwrap();

        let store = FsEssidStore::open(dir.path()).unwrap();
        assert_eq!(store.iter_essids().count(), 1);
    }
}
