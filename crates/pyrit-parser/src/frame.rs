//! Wire types for the slice of 802.11/EAPOL the reconstructor cares about
//! (§3, §4.7). The parser never touches raw frame bytes beyond what's
//! modeled here — callers are responsible for getting a capture source
//! down to these shapes.

use pyrit_crypto::KeyScheme;

/// A raw 6-byte 802.11 MAC address. Ordering is byte-wise, used directly
/// by the PKE's `min`/`max` framing (GLOSSARY: "PKE").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mac(pub [u8; 6]);

impl Mac {
    /// Locally-administered/multicast bit (802.11 "individual/group" bit,
    /// the low bit of the first octet). Multicast STA addresses are
    /// dropped by the parser (§4.7 step 3).
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl std::fmt::Display for Mac {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

/// The management-frame subtypes that can carry an SSID element and so
/// yield an ESSID discovery (§4.7 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagementKind {
    Beacon,
    ProbeResponse,
    AssociationRequest,
}

/// KeyInfo flag bits relevant to Frame1/2/3 classification (§4.7 step 4).
/// Named after the 802.11 EAPOL-Key descriptor field, not a bespoke
/// abstraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyInfo {
    pub pairwise: bool,
    pub install: bool,
    pub ack: bool,
    pub mic: bool,
    /// Selected key-descriptor version, when the frame names one
    /// explicitly (§4.7: "prefer the scheme bit actually set in KeyInfo").
    pub scheme_hint: Option<KeyScheme>,
}

/// An EAPOL-Key frame as observed between one AP and one station (§3:
/// "Station... holds accumulated EAPOL key frames").
#[derive(Debug, Clone)]
pub struct EapolKeyFrame {
    pub replay_counter: u64,
    pub key_info: KeyInfo,
    pub key_length: u16,
    pub nonce: [u8; 32],
    /// Present on Frame 2 only: the transmitted MIC.
    pub mic: Option<[u8; 16]>,
    /// The EAPOL layer with its MIC field zeroed, truncated to
    /// `eapol_len + 4` — the exact bytes MIC verification runs over
    /// (§4.7 step 4, §4.8).
    pub mic_body: Vec<u8>,
    /// The default key scheme this frame's on-wire descriptor type
    /// implies (WPA vs RSN), used when `key_info.scheme_hint` is absent.
    pub default_scheme: KeyScheme,
}

/// One 802.11 data or management frame, reduced to what classification
/// needs (§4.7).
#[derive(Debug, Clone)]
pub enum Frame {
    Management {
        bssid: Mac,
        kind: Option<ManagementKind>,
        ssid: Vec<u8>,
    },
    /// A unicast data frame with exactly one of to-DS/from-DS set,
    /// optionally carrying an EAPOL-Key payload (§4.7 step 3-4).
    Data {
        ap_mac: Mac,
        sta_mac: Mac,
        eapol: Option<EapolKeyFrame>,
    },
    /// Anything the parser intentionally ignores: control frames, and
    /// data frames that are neither to-DS nor from-DS exclusively (both
    /// set, or neither — ad-hoc/WDS traffic out of scope, §4.7 step 3).
    Ignored,
}
