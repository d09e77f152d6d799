//! The handshake cracker (component H, §4.8).

pub mod cracker;

pub use cracker::{Batch, CrackTarget, Cracker};
