//! Cross-module testable properties (§8): stored keys and their results
//! stay consistent between the password store and the ESSID store.

use pyrit_core::{Config, Essid};
use pyrit_storage::FsStorage;
use tempfile::tempdir;

#[test]
fn result_set_length_matches_its_source_bucket_in_the_same_order() {
    let dir = tempdir().unwrap();
    let mut storage = FsStorage::open(dir.path(), Config::default()).unwrap();

    for pw in ["barbarbar", "correcthorsebattery", "anotherpassword1", "yetanotherpw"] {
        storage.passwords.store_password(pw).unwrap();
    }
    storage.passwords.flush_buffer().unwrap();

    let net = Essid::new(b"homenet".to_vec()).unwrap();
    storage.essids.create_essid(net.clone()).unwrap();

    for key in storage.passwords.iter_keys().cloned().collect::<Vec<_>>() {
        let bucket = storage.passwords.get(&key).unwrap();
        let results: Vec<_> = bucket.iter().cloned().map(|pw| (pw, [0u8; 32])).collect();
        storage.essids.put(&net, key.clone(), &results).unwrap();

        let stored = storage.essids.get(&net, &key).unwrap();
        assert_eq!(stored.len(), bucket.len());
        let stored_pws: Vec<_> = stored.into_iter().map(|(pw, _)| pw).collect();
        assert_eq!(stored_pws, bucket);
    }
}

#[test]
fn every_key_in_an_essid_is_also_in_the_password_store() {
    let dir = tempdir().unwrap();
    let mut storage = FsStorage::open(dir.path(), Config::default()).unwrap();
    storage.passwords.store_password("barbarbar").unwrap();
    storage.passwords.flush_buffer().unwrap();
    let key = storage.passwords.iter_keys().next().cloned().unwrap();

    let net = Essid::new(b"homenet".to_vec()).unwrap();
    storage.essids.create_essid(net.clone()).unwrap();
    let bucket = storage.passwords.get(&key).unwrap();
    let results: Vec<_> = bucket.into_iter().map(|pw| (pw, [1u8; 32])).collect();
    storage.essids.put(&net, key.clone(), &results).unwrap();

    for k in storage.essids.iter_keys(&net).unwrap() {
        assert!(storage.passwords.contains(k));
    }
}
