//! Content-addressed storage: the PAW2 password-bucket and PYR2 result-set
//! binary codecs, and the filesystem-backed password/ESSID stores built on
//! top of them (§3, §4 components A-D).
//!
//! Remote (XML-RPC) and SQL storage backends implement the same operations
//! against the same [`pyrit_core`] types; only the filesystem backend is
//! implemented here, as the reference backend (§4.4).

pub mod cowpatty;
pub mod essid_store;
pub mod facade;
pub mod paw2;
pub mod password_store;
pub mod pyr2;

pub use essid_store::FsEssidStore;
pub use facade::FsStorage;
pub use password_store::FsPasswordStore;
