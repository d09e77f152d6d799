//! Filesystem-backed password store: deduplicated PAW2 buckets keyed by
//! content digest, sharded into 256 H1 bins (§3, §4.2).
//!
//! Layout: `<base>/<H1>/<bucketkey>.pw`, each file a PAW2 container.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use pyrit_core::{BucketKey, Config, Password, StorageError, H1};
use tracing::debug;

use crate::paw2;

/// In-memory buffer for one H1 bin, pending flush. A set under unique-check
/// mode, a list otherwise (§4.2, §9 open question: list mode permits
/// redundant writes across separate flushes — an accepted loss of the
/// global-dedup invariant in exchange for not paying the disk diff).
enum PwBuffer {
    Unique(HashSet<Password>),
    List(Vec<Password>),
}

impl PwBuffer {
    fn new(unique_check: bool) -> Self {
        if unique_check {
            PwBuffer::Unique(HashSet::new())
        } else {
            PwBuffer::List(Vec::new())
        }
    }

    fn len(&self) -> usize {
        match self {
            PwBuffer::Unique(s) => s.len(),
            PwBuffer::List(l) => l.len(),
        }
    }

    fn insert(&mut self, pw: Password) {
        match self {
            PwBuffer::Unique(s) => {
                s.insert(pw);
            }
            PwBuffer::List(l) => l.push(pw),
        }
    }

    fn into_vec(self) -> Vec<Password> {
        match self {
            PwBuffer::Unique(s) => s.into_iter().collect(),
            PwBuffer::List(l) => l,
        }
    }
}

pub struct FsPasswordStore {
    base: PathBuf,
    config: Config,
    /// bucket key -> directory holding `<key>.pw` (i.e. the H1 directory).
    index: HashMap<BucketKey, PathBuf>,
    buffer: HashMap<H1, PwBuffer>,
}

impl FsPasswordStore {
    /// Open (creating if absent) the password store rooted at `base`,
    /// indexing every existing `<H1>/<bucketkey>.pw` file.
    pub fn open(base: impl Into<PathBuf>, config: Config) -> Result<Self, StorageError> {
        let base = base.into();
        fs::create_dir_all(&base)?;
        let mut index = HashMap::new();
        for h1 in H1::all() {
            let dir = h1_dir(&base, h1);
            if !dir.exists() {
                continue;
            }
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if let Some(key_str) = name.strip_suffix(".pw") {
                    index.insert(BucketKey::from_hex(key_str.to_string()), dir.clone());
                }
            }
        }
        Ok(FsPasswordStore {
            base,
            config,
            index,
            buffer: HashMap::new(),
        })
    }

    pub fn contains(&self, key: &BucketKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter_keys(&self) -> impl Iterator<Item = &BucketKey> {
        self.index.keys()
    }

    pub fn get(&self, key: &BucketKey) -> Result<Vec<Password>, StorageError> {
        let dir = self
            .index
            .get(key)
            .ok_or(StorageError::KeyMismatch {
                path: self.base.display().to_string(),
                key: key.as_str().to_string(),
            })?;
        let path = dir.join(format!("{key}.pw"));
        let buf = fs::read(&path)?;
        let (decoded_key, passwords) = paw2::decode(&buf)?;
        if decoded_key != *key {
            return Err(StorageError::KeyMismatch {
                path: path.display().to_string(),
                key: key.as_str().to_string(),
            });
        }
        Ok(passwords)
    }

    pub fn size(&self, key: &BucketKey) -> Result<usize, StorageError> {
        Ok(self.get(key)?.len())
    }

    pub fn delete(&mut self, key: &BucketKey) -> Result<(), StorageError> {
        let dir = self.index.remove(key).ok_or(StorageError::KeyMismatch {
            path: self.base.display().to_string(),
            key: key.as_str().to_string(),
        })?;
        fs::remove_file(dir.join(format!("{key}.pw")))?;
        Ok(())
    }

    /// Buffer `pw` for later flush. Validates length 8..=63 after trimming
    /// `\r\n`; out-of-range input is silently dropped (§3, §4.2, §8.2).
    /// Flushes this H1's bucket automatically once it reaches
    /// `config.workunit_size`.
    pub fn store_password(&mut self, raw: impl AsRef<[u8]>) -> Result<(), StorageError> {
        let Some(pw) = Password::new(raw) else {
            return Ok(());
        };
        let h1 = pw.h1();
        let bucket = self
            .buffer
            .entry(h1)
            .or_insert_with(|| PwBuffer::new(self.config.unique_check));
        bucket.insert(pw);
        if bucket.len() >= self.config.workunit_size as usize {
            let bucket = self.buffer.remove(&h1).expect("just inserted");
            self.flush_bucket(h1, bucket)?;
        }
        Ok(())
    }

    /// Flush every H1 bin currently buffered.
    pub fn flush_buffer(&mut self) -> Result<(), StorageError> {
        let pending: Vec<H1> = self.buffer.keys().copied().collect();
        for h1 in pending {
            let bucket = self.buffer.remove(&h1).expect("key came from this map");
            self.flush_bucket(h1, bucket)?;
        }
        Ok(())
    }

    /// Context-manager semantics (§4.2): run `f`, flush only if it
    /// succeeds. On error, buffered passwords are dropped by design (§5:
    /// "the caller is expected to re-import").
    pub fn in_scope<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let result = f(self)?;
        self.flush_buffer()?;
        Ok(result)
    }

    /// Dedup-against-disk flush mechanic (`_flush_bucket`, §4.2/§9): under
    /// unique-check mode, every on-disk bucket sharing this H1 is loaded
    /// and set-subtracted from the buffered bucket before it is written,
    /// so a password already present anywhere under the H1 is never
    /// duplicated.
    fn flush_bucket(&mut self, h1: H1, bucket: PwBuffer) -> Result<(), StorageError> {
        let unique_check = matches!(bucket, PwBuffer::Unique(_));
        let mut passwords: HashSet<Password> = if unique_check {
            match bucket {
                PwBuffer::Unique(s) => s,
                PwBuffer::List(_) => unreachable!(),
            }
        } else {
            HashSet::new()
        };
        let list_passwords = if unique_check {
            None
        } else {
            match bucket {
                PwBuffer::List(l) => Some(l),
                PwBuffer::Unique(_) => unreachable!(),
            }
        };

        if unique_check {
            if passwords.is_empty() {
                return Ok(());
            }
            for (key, dir) in &self.index {
                if dir.file_name().and_then(|n| n.to_str()) != Some(h1.as_str().as_str()) {
                    continue;
                }
                let existing = self.get(key)?;
                for pw in existing {
                    passwords.remove(&pw);
                }
                if passwords.is_empty() {
                    return Ok(());
                }
            }
            self.write_bucket(h1, passwords.into_iter().collect())
        } else {
            let list = list_passwords.expect("non-unique branch");
            if list.is_empty() {
                return Ok(());
            }
            self.write_bucket(h1, list)
        }
    }

    fn write_bucket(&mut self, h1: H1, passwords: Vec<Password>) -> Result<(), StorageError> {
        let dir = h1_dir(&self.base, h1);
        fs::create_dir_all(&dir)?;
        let (key, bytes) = paw2::encode(&passwords);
        fs::write(dir.join(format!("{key}.pw")), &bytes)?;
        debug!(h1 = %h1, key = %key, count = passwords.len(), "flushed password bucket");
        self.index.insert(key, dir);
        Ok(())
    }
}

pub(crate) fn h1_dir(base: &Path, h1: H1) -> PathBuf {
    base.join(h1.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyrit_core::Config;
    use tempfile::tempdir;

    #[test]
    fn store_and_flush_round_trips() {
        let dir = tempdir().unwrap();
        let mut store = FsPasswordStore::open(dir.path(), Config::default()).unwrap();
        store.store_password("barbarbar").unwrap();
        store.store_password("correcthorsebattery").unwrap();
        store.flush_buffer().unwrap();

        let keys: Vec<_> = store.iter_keys().cloned().collect();
        assert_eq!(keys.len(), 1, "both passwords share H1 and land in one bucket");
        let pws = store.get(&keys[0]).unwrap();
        assert_eq!(pws.len(), 2);
    }

    #[test]
    fn length_filter_rejects_silently() {
        let dir = tempdir().unwrap();
        let mut store = FsPasswordStore::open(dir.path(), Config::default()).unwrap();
        store.store_password("1234567").unwrap();
        store.flush_buffer().unwrap();
        assert_eq!(store.iter_keys().count(), 0);
    }

    #[test]
    fn reimporting_same_passwords_creates_no_new_files() {
        let dir = tempdir().unwrap();
        let mut store = FsPasswordStore::open(dir.path(), Config::default()).unwrap();
        for pw in ["barbarbar", "correcthorsebattery", "anotherpassword1"] {
            store.store_password(pw).unwrap();
        }
        store.flush_buffer().unwrap();
        let before: HashSet<_> = store.iter_keys().cloned().collect();

        for pw in ["barbarbar", "correcthorsebattery", "anotherpassword1"] {
            store.store_password(pw).unwrap();
        }
        store.flush_buffer().unwrap();
        let after: HashSet<_> = store.iter_keys().cloned().collect();
        assert_eq!(before, after, "dedup against disk prevents new files");
    }

    #[test]
    fn delete_removes_key() {
        let dir = tempdir().unwrap();
        let mut store = FsPasswordStore::open(dir.path(), Config::default()).unwrap();
        store.store_password("barbarbar").unwrap();
        store.flush_buffer().unwrap();
        let key = store.iter_keys().next().cloned().unwrap();
        store.delete(&key).unwrap();
        assert!(!store.contains(&key));
    }

    #[test]
    fn in_scope_does_not_flush_on_error() {
        let dir = tempdir().unwrap();
        let mut store = FsPasswordStore::open(dir.path(), Config::default()).unwrap();
        let result: Result<(), StorageError> = store.in_scope(|s| {
            s.store_password("barbarbar").unwrap();
            Err(StorageError::Digest)
        });
        assert!(result.is_err());
        assert_eq!(store.iter_keys().count(), 0);
    }
}
