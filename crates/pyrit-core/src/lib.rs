//! Shared data model, error taxonomy and configuration for pyrit's crates.
//!
//! Every other crate in this workspace depends on this one for the types
//! that cross component boundaries: [`Essid`], [`Password`], [`H1`],
//! [`BucketKey`], the error enums, and [`Config`].

mod bucket_key;
mod config;
mod essid;
mod password;

pub mod error;

pub use bucket_key::BucketKey;
pub use config::{BufferSizeDefaults, Config};
pub use error::{KeyError, PyritError, Result, RuntimeError, StorageError, ValueError};
pub use essid::Essid;
pub use password::{Password, H1};
