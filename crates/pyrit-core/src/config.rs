use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Per-core-class adaptive-batching defaults (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferSizeDefaults {
    pub min: usize,
    pub init: usize,
    pub max: usize,
}

impl BufferSizeDefaults {
    pub const CPU: BufferSizeDefaults = BufferSizeDefaults {
        min: 128,
        init: 512,
        max: 20480,
    };

    pub const ACCELERATOR: BufferSizeDefaults = BufferSizeDefaults {
        min: 1024,
        init: 4096,
        max: 40960,
    };
}

/// Explicit configuration threaded into constructors, replacing the source's
/// module-level globals read once at import time (§9 design note).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Passwords per flushed bucket / per batch before a core reports back
    /// (§4.2, §6). Default 20000, must be 1..=1_000_000.
    pub workunit_size: u32,
    /// Whether to bring up the compute-workunit RPC endpoint (§6).
    pub rpc_server: bool,
    /// Whether to announce that endpoint via UDP broadcast (§6).
    pub rpc_announce: bool,
    /// Hosts to announce to when `rpc_announce` is set.
    pub rpc_knownclients: Vec<String>,
    /// Whether newly flushed password buckets are deduplicated against the
    /// rest of the store sharing their H1 (§4.2 "unique-check mode").
    pub unique_check: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            workunit_size: 20_000,
            rpc_server: false,
            rpc_announce: false,
            rpc_knownclients: Vec::new(),
            unique_check: true,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ValueError> {
        if self.workunit_size < 1 || self.workunit_size > 1_000_000 {
            return Err(ValueError::InvalidWorkunitSize(self.workunit_size as i64));
        }
        Ok(())
    }
}
