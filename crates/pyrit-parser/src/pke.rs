//! PKE (Pairwise Key Expansion input) construction (§3 GLOSSARY: "PKE").

use crate::frame::Mac;

const LABEL: &[u8] = b"Pairwise key expansion\x00";

/// Build the canonical PKE byte string: `label ++ min(AP,STA) ++
/// max(AP,STA) ++ min(SNonce,ANonce) ++ max(SNonce,ANonce) ++ "\x00"`.
/// Order is by byte-wise comparison of the raw 6-byte MAC / 32-byte nonce,
/// so swapping either pair of inputs reproduces the same bytes (§8:
/// "PKE ordering").
pub fn build_pke(ap_mac: Mac, sta_mac: Mac, a_nonce: &[u8; 32], s_nonce: &[u8; 32]) -> Vec<u8> {
    let (mac_lo, mac_hi) = if ap_mac <= sta_mac {
        (ap_mac, sta_mac)
    } else {
        (sta_mac, ap_mac)
    };
    let (nonce_lo, nonce_hi) = if a_nonce <= s_nonce {
        (a_nonce, s_nonce)
    } else {
        (s_nonce, a_nonce)
    };

    let mut pke = Vec::with_capacity(LABEL.len() + 6 + 6 + 32 + 32 + 1);
    pke.extend_from_slice(LABEL);
    pke.extend_from_slice(&mac_lo.0);
    pke.extend_from_slice(&mac_hi.0);
    pke.extend_from_slice(nonce_lo);
    pke.extend_from_slice(nonce_hi);
    pke.push(0);
    pke
}
