//! Storage façade (component D, §4.4): the password store and ESSID store
//! exposed as one unit, plus the cross-store stats the CLI's `eval`
//! command needs.

use std::path::Path;

use pyrit_core::{BucketKey, Config, Essid, StorageError};

use crate::essid_store::FsEssidStore;
use crate::password_store::FsPasswordStore;

/// Combines [`FsPasswordStore`] and [`FsEssidStore`] under one base
/// directory, `<base>/password` and `<base>/essid` (§6 filesystem layout).
pub struct FsStorage {
    pub passwords: FsPasswordStore,
    pub essids: FsEssidStore,
}

impl FsStorage {
    pub fn open(base: impl AsRef<Path>, config: Config) -> Result<Self, StorageError> {
        let base = base.as_ref();
        Ok(FsStorage {
            passwords: FsPasswordStore::open(base.join("password"), config)?,
            essids: FsEssidStore::open(base.join("essid"))?,
        })
    }

    /// Remove `key` from every ESSID that references it, then from the
    /// password store (§4.4).
    pub fn delete(&mut self, key: &BucketKey) -> Result<(), StorageError> {
        let essids: Vec<Essid> = self.essids.iter_essids().cloned().collect();
        for essid in essids {
            if self.essids.contains_key(&essid, key).unwrap_or(false) {
                self.essids.delete_key(&essid, key)?;
            }
        }
        self.passwords.delete(key)
    }

    /// `(total_passwords, {essid: solved_count})` where `solved_count`
    /// sums the password-bucket sizes whose keys are currently present
    /// under that ESSID (§4.4).
    pub fn stats(&self) -> Result<(usize, Vec<(Essid, usize)>), StorageError> {
        let mut essid_totals: Vec<(Essid, usize)> =
            self.essids.iter_essids().map(|e| (e.clone(), 0usize)).collect();
        let mut total_passwords = 0usize;
        for key in self.passwords.iter_keys().cloned().collect::<Vec<_>>() {
            let size = self.passwords.size(&key)?;
            total_passwords += size;
            for (essid, count) in essid_totals.iter_mut() {
                if self.essids.contains_key(essid, &key).unwrap_or(false) {
                    *count += size;
                }
            }
        }
        Ok((total_passwords, essid_totals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyrit_core::Password;
    use tempfile::tempdir;

    #[test]
    fn stats_sum_solved_counts_per_essid() {
        let dir = tempdir().unwrap();
        let mut storage = FsStorage::open(dir.path(), Config::default()).unwrap();
        storage.passwords.store_password("barbarbar").unwrap();
        storage.passwords.store_password("correcthorsebattery").unwrap();
        storage.passwords.flush_buffer().unwrap();
        let key = storage.passwords.iter_keys().next().cloned().unwrap();

        let net = Essid::new(b"net1".to_vec()).unwrap();
        storage.essids.create_essid(net.clone()).unwrap();
        let results = storage
            .passwords
            .get(&key)
            .unwrap()
            .into_iter()
            .map(|pw| (pw, [0u8; 32]))
            .collect::<Vec<_>>();
        storage.essids.put(&net, key.clone(), &results).unwrap();

        let (total, per_essid) = storage.stats().unwrap();
        assert_eq!(total, 2);
        assert_eq!(per_essid, vec![(net, 2)]);
    }

    #[test]
    fn delete_removes_from_every_referencing_essid_and_the_password_store() {
        let dir = tempdir().unwrap();
        let mut storage = FsStorage::open(dir.path(), Config::default()).unwrap();
        storage.passwords.store_password("barbarbar").unwrap();
        storage.passwords.flush_buffer().unwrap();
        let key = storage.passwords.iter_keys().next().cloned().unwrap();

        let net = Essid::new(b"net1".to_vec()).unwrap();
        storage.essids.create_essid(net.clone()).unwrap();
        let pw = Password::new("barbarbar").unwrap();
        storage.essids.put(&net, key.clone(), &[(pw, [0u8; 32])]).unwrap();

        storage.delete(&key).unwrap();
        assert!(!storage.passwords.contains(&key));
        assert!(!storage.essids.contains_key(&net, &key).unwrap());
    }
}
