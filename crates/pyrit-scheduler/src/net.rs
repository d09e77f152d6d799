//! Network cores (§4.5 "Optional network cores", §6 RPC surface):
//! registration, workunit brokerage and the announcement beacon that let a
//! remote machine's cores join this scheduler.
//!
//! The source transports this over XML-RPC plus a UDP broadcast beacon.
//! XML-RPC has no maintained crate in this ecosystem, so this substitutes
//! a length-prefixed JSON frame over TCP for the request/reply traffic
//! (`serde_json`, already in the stack for [`pyrit_core::Config`]) while
//! preserving the wire-level contract: `register` exchanges UUIDs and
//! aborts on a loop-forming collision, `scatter` payloads are SHA-1-digest
//! prefixed, and the announcement datagram keeps its original framing
//! (SPEC_FULL §"RPC wire mechanics").

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use thiserror::Error;

use crate::scheduler::GatherId;

/// A client's self-assigned identifier, exchanged during `register`.
pub type ClientUuid = String;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("i/o error talking to peer: {0}")]
    Io(#[from] io::Error),
    #[error("malformed frame: {0}")]
    Frame(#[from] serde_json::Error),
    #[error("scatter payload failed its digest check")]
    ScatterDigest,
    #[error("client uuid collides with the server's own uuid, aborting to break a loop")]
    UuidLoop,
}

/// Requests a compute client can send a server (§6: "methods `{register,
/// unregister, gather, scatter, revoke}`").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    Register { known_uuids: Vec<ClientUuid> },
    Unregister { client_uuid: ClientUuid },
    Gather { client_uuid: ClientUuid, buffer_size: usize },
    /// `payload` is the SHA-1-prefixed PMK blob described in
    /// [`frame_scatter_payload`].
    Scatter { client_uuid: ClientUuid, essid: Vec<u8>, payload: Vec<u8> },
    /// Revoke only the most recently gathered outstanding workunit for
    /// this client.
    RevokeLast { client_uuid: ClientUuid },
    /// Revoke every outstanding workunit this client has gathered.
    ///
    /// Open question resolved (§9 "rpc_revoke source bug"): the source
    /// pops a workunit and then references an undefined `password`,
    /// leaving it ambiguous whether a client's silence should revoke
    /// just its last gather or all of them. Rather than guess, both are
    /// exposed as distinct methods and the watchdog (which revokes a
    /// client's entire backlog on a timeout, not just its latest call)
    /// uses this one.
    RevokeAll { client_uuid: ClientUuid },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Reply {
    Registered { server_uuid: ClientUuid, client_uuid: ClientUuid },
    RegisterRejected,
    Gathered { essid: Vec<u8>, passwords: Vec<Vec<u8>> },
    NoWork,
    Ack,
}

/// Write one length-prefixed JSON frame (`u32` little-endian length, then
/// the JSON body) to `stream`.
pub fn write_frame<T: Serialize>(stream: &mut impl Write, value: &T) -> Result<(), NetError> {
    let body = serde_json::to_vec(value)?;
    stream.write_all(&(body.len() as u32).to_le_bytes())?;
    stream.write_all(&body)?;
    Ok(())
}

/// Read one length-prefixed JSON frame from `stream`.
pub fn read_frame<T: for<'de> Deserialize<'de>>(stream: &mut impl Read) -> Result<T, NetError> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body)?;
    Ok(serde_json::from_slice(&body)?)
}

/// SHA-1-digest-prefixed PMK blob: `sha1(pmks) || pmks` (SPEC_FULL's RPC
/// wire mechanics). A digest mismatch on the receiving end is an I/O
/// error, not a silent drop — the transport is assumed reliable but not
/// trusted.
pub fn frame_scatter_payload(pmks: &[[u8; 32]]) -> Vec<u8> {
    let mut concatenated = Vec::with_capacity(pmks.len() * 32);
    for pmk in pmks {
        concatenated.extend_from_slice(pmk);
    }
    let digest = sha1(&concatenated);
    let mut out = Vec::with_capacity(20 + concatenated.len());
    out.extend_from_slice(&digest);
    out.extend_from_slice(&concatenated);
    out
}

pub fn parse_scatter_payload(buf: &[u8]) -> Result<Vec<[u8; 32]>, NetError> {
    if buf.len() < 20 || (buf.len() - 20) % 32 != 0 {
        return Err(NetError::ScatterDigest);
    }
    let (digest, pmk_bytes) = buf.split_at(20);
    if sha1(pmk_bytes) != digest {
        return Err(NetError::ScatterDigest);
    }
    Ok(pmk_bytes
        .chunks_exact(32)
        .map(|chunk| {
            let mut out = [0u8; 32];
            out.copy_from_slice(chunk);
            out
        })
        .collect())
}

/// Build the once-a-second UDP announcement datagram: `"PyritServerAnnouncement"
/// || 0x00 || host || 0x00 || port || sha1(msg)` (§6, SPEC_FULL). `port` is
/// encoded as its ASCII decimal representation (`str(port)` in the
/// original), not fixed-width binary — a reader on the original's listener
/// parses it the same way. Pass `host = ""` to mean "let the receiver fall
/// back to the datagram's UDP source address", matching the original
/// listener's handling of an empty host field.
pub fn build_announcement(host: &str, port: u16) -> Vec<u8> {
    let mut msg = Vec::new();
    msg.extend_from_slice(b"PyritServerAnnouncement");
    msg.push(0);
    msg.extend_from_slice(host.as_bytes());
    msg.push(0);
    msg.extend_from_slice(port.to_string().as_bytes());
    let digest = sha1(&msg);
    msg.extend_from_slice(&digest);
    msg
}

/// Parse and verify an announcement datagram, returning `(host, port)`.
///
/// `host` is `None` when the datagram carried an empty host field; per the
/// original listener (`cpyrit.py`'s announcement handler), that means the
/// caller should substitute the UDP packet's source address instead of
/// trusting the payload.
pub fn parse_announcement(buf: &[u8]) -> Option<(Option<String>, u16)> {
    const PREFIX: &[u8] = b"PyritServerAnnouncement\0";
    if buf.len() < PREFIX.len() + 20 || !buf.starts_with(PREFIX) {
        return None;
    }
    let (msg, digest) = buf.split_at(buf.len() - 20);
    if sha1(msg) != digest {
        return None;
    }
    let rest = &msg[PREFIX.len()..];
    let nul = rest.iter().position(|&b| b == 0)?;
    let host_bytes = &rest[..nul];
    let host = if host_bytes.is_empty() {
        None
    } else {
        Some(String::from_utf8(host_bytes.to_vec()).ok()?)
    };
    let port_str = std::str::from_utf8(&rest[nul + 1..]).ok()?;
    let port = port_str.parse::<u16>().ok()?;
    Some((host, port))
}

fn sha1(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Tracks registered remote clients, enforcing the loop-breaking UUID
/// check and the >60s silence watchdog (§5, §6).
pub struct ClientRegistry {
    server_uuid: ClientUuid,
    clients: HashMap<ClientUuid, Instant>,
    /// Outstanding `gather()` calls per client, oldest first, so
    /// `revoke_last`/`revoke_all` know which [`GatherId`]s to hand back
    /// to the scheduler.
    outstanding: HashMap<ClientUuid, Vec<GatherId>>,
}

impl ClientRegistry {
    pub fn new(server_uuid: impl Into<ClientUuid>) -> Self {
        ClientRegistry {
            server_uuid: server_uuid.into(),
            clients: HashMap::new(),
            outstanding: HashMap::new(),
        }
    }

    /// Register a client that announces `known_uuids` (the set of server
    /// UUIDs it has already seen). Aborts if this server's own UUID is
    /// already among them, breaking an announcement loop (§6).
    pub fn register(&mut self, client_uuid: ClientUuid, known_uuids: &[ClientUuid]) -> Result<(), NetError> {
        if known_uuids.contains(&self.server_uuid) {
            return Err(NetError::UuidLoop);
        }
        self.clients.insert(client_uuid.clone(), Instant::now());
        self.outstanding.entry(client_uuid).or_default();
        Ok(())
    }

    pub fn unregister(&mut self, client_uuid: &str) {
        self.clients.remove(client_uuid);
        self.outstanding.remove(client_uuid);
    }

    pub fn touch(&mut self, client_uuid: &str) {
        if let Some(last_seen) = self.clients.get_mut(client_uuid) {
            *last_seen = Instant::now();
        }
    }

    /// Record a [`GatherId`] a client's `gather` call produced, so it can
    /// be revoked later if the client goes silent or asks to revoke.
    pub fn record_gather(&mut self, client_uuid: &str, id: GatherId) {
        self.outstanding.entry(client_uuid.to_string()).or_default().push(id);
    }

    /// Pop and return the most recent outstanding gather for this client
    /// (`revoke_last`), or `None` if it has none.
    pub fn revoke_last(&mut self, client_uuid: &str) -> Option<GatherId> {
        self.outstanding.get_mut(client_uuid)?.pop()
    }

    /// Drain and return every outstanding gather for this client
    /// (`revoke_all`), used both by the explicit RPC method and by the
    /// silence watchdog.
    pub fn revoke_all(&mut self, client_uuid: &str) -> Vec<GatherId> {
        self.outstanding.get_mut(client_uuid).map(std::mem::take).unwrap_or_default()
    }

    /// Clients that haven't been touched within `threshold` (§5: "a
    /// watchdog that unregisters clients silent > 60s, revoking their
    /// outstanding batches"). Callers are responsible for calling
    /// [`ClientRegistry::revoke_all`] on these clients' outstanding
    /// workunits before dropping them.
    pub fn stale_clients(&self, threshold: Duration) -> Vec<ClientUuid> {
        let now = Instant::now();
        self.clients
            .iter()
            .filter(|(_, last_seen)| now.duration_since(**last_seen) > threshold)
            .map(|(uuid, _)| uuid.clone())
            .collect()
    }

    pub fn server_uuid(&self) -> &str {
        &self.server_uuid
    }
}

/// Default watchdog threshold for silent clients (§5).
pub const CLIENT_SILENCE_TIMEOUT: Duration = Duration::from_secs(60);

pub fn connect(addr: &str) -> Result<TcpStream, NetError> {
    Ok(TcpStream::connect(addr)?)
}
