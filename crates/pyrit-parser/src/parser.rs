//! The single-threaded frame consumer (component G, §4.7): classifies
//! each incoming frame, accumulates EAPOL key material per station, and
//! reconstructs [`Authentication`]s as soon as enough frames are present.

use pyrit_crypto::KeyScheme;
use tracing::{debug, trace, warn};

use crate::ap::{ApId, Arena, StaId};
use crate::frame::{EapolKeyFrame, Frame, KeyInfo, Mac};

/// Which of the three handshake messages a KeyInfo flag set identifies
/// (§4.7 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Frame1,
    Frame2,
    Frame3,
}

fn classify(key_info: &KeyInfo, key_length: u16) -> Option<Role> {
    if key_info.pairwise && key_info.install && key_info.ack && key_info.mic {
        return Some(Role::Frame3);
    }
    if key_info.pairwise && key_info.ack && !key_info.install && !key_info.mic {
        return Some(Role::Frame1);
    }
    if key_info.pairwise && key_info.mic && !key_info.install && !key_info.ack && key_length > 0 {
        return Some(Role::Frame2);
    }
    None
}

fn resolved_scheme(frame: &EapolKeyFrame) -> KeyScheme {
    frame.key_info.scheme_hint.unwrap_or(frame.default_scheme)
}

/// One reconstructed handshake attempt (§3 GLOSSARY: "Authentication").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authentication {
    pub scheme: KeyScheme,
    pub a_nonce: [u8; 32],
    pub s_nonce: [u8; 32],
    pub mic: [u8; 16],
    pub mic_body: Vec<u8>,
    /// 0 best: Frame1+Frame2+Frame3 all matched; 1: Frame2+Frame3 only;
    /// 2: Frame1+Frame2 only (§3).
    pub quality: u8,
    /// Max absolute index distance between the participating frames'
    /// positions in the feed (§3).
    pub spread: u64,
}

impl PartialOrd for Authentication {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Authentication {
    /// `(quality, spread)` ascending, best first (§3, §8).
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.quality, self.spread).cmp(&(other.quality, other.spread))
    }
}

/// Callback surface the parser drives as it discovers new state (§4.7:
/// "Fires `on_new_ap`"..."exposes newly-formed authentications through
/// `on_new_auth`"). A plain trait rather than boxed closures, so a caller
/// can hold `&mut self` state without an extra indirection.
pub trait ParserHooks {
    fn on_new_ap(&mut self, ap_id: ApId, bssid: Mac, essid: &[u8]) {
        let _ = (ap_id, bssid, essid);
    }
    fn on_new_auth(&mut self, sta_id: StaId, auth: &Authentication) {
        let _ = (sta_id, auth);
    }
}

/// A [`ParserHooks`] that does nothing, for callers with no side effects
/// to wire up.
pub struct NoopHooks;
impl ParserHooks for NoopHooks {}

fn is_all_zero_or_empty(ssid: &[u8]) -> bool {
    ssid.is_empty() || ssid.iter().all(|&b| b == 0)
}

pub struct Parser<H: ParserHooks> {
    arena: Arena,
    hooks: H,
    /// Monotonic position counter, advanced once per frame fed in.
    next_index: u64,
    /// Already-emitted authentications, so repeated feeds of the same
    /// capture don't re-fire `on_new_auth` for the same reconstruction.
    emitted: std::collections::HashSet<(StaId, [u8; 32], [u8; 16])>,
}

impl<H: ParserHooks> Parser<H> {
    pub fn new(hooks: H) -> Self {
        Parser {
            arena: Arena::new(),
            hooks,
            next_index: 0,
            emitted: std::collections::HashSet::new(),
        }
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn into_hooks(self) -> H {
        self.hooks
    }

    /// Feed one frame through the classifier (§4.7 steps 1-4).
    pub fn feed(&mut self, frame: Frame) {
        let index = self.next_index;
        self.next_index += 1;

        match frame {
            Frame::Management { bssid, kind, ssid } => {
                if kind.is_none() || is_all_zero_or_empty(&ssid) {
                    trace!(bssid = %bssid, "management frame without a usable SSID, ignoring");
                    return;
                }
                let (ap_id, _created) = self.arena.ap_for_bssid(bssid);
                let ap = self.arena.ap_mut(ap_id);
                if ap.essid.is_none() {
                    ap.essid = Some(ssid.clone());
                    ap.essid_frame = Some(Frame::Management { bssid, kind, ssid: ssid.clone() });
                    self.hooks.on_new_ap(ap_id, bssid, &ssid);
                }
            }
            Frame::Data { ap_mac, sta_mac, eapol } => {
                if sta_mac.is_multicast() {
                    trace!(sta = %sta_mac, "multicast station address, ignoring");
                    return;
                }
                let (ap_id, _) = self.arena.ap_for_bssid(ap_mac);
                let (sta_id, _) = self.arena.station_for(ap_id, sta_mac);

                let Some(eapol) = eapol else { return };
                self.insert_eapol(ap_id, sta_id, index, eapol);
            }
            Frame::Ignored => {}
        }
    }

    fn insert_eapol(&mut self, ap_id: ApId, sta_id: StaId, index: u64, eapol: EapolKeyFrame) {
        let Some(role) = classify(&eapol.key_info, eapol.key_length) else {
            trace!("EAPOL-Key frame matched no Frame1/2/3 flag pattern, ignoring");
            return;
        };

        let group_key = match role {
            Role::Frame3 => match eapol.replay_counter.checked_sub(1) {
                Some(k) => k,
                None => {
                    warn!("Frame3 with ReplayCounter 0 has no preceding group, ignoring");
                    return;
                }
            },
            Role::Frame1 | Role::Frame2 => eapol.replay_counter,
        };

        let station = self.arena.station_mut(sta_id);
        let group = station.replay_groups.entry(group_key).or_default();

        match role {
            Role::Frame1 | Role::Frame3 => {
                let anonce = eapol.nonce;
                let map = match role {
                    Role::Frame1 => &mut group.frame1,
                    _ => &mut group.frame3,
                };
                map.entry(anonce).or_insert((index, eapol));
            }
            Role::Frame2 => {
                let scheme = resolved_scheme(&eapol);
                let key = (scheme, eapol.nonce, eapol.mic_body.clone(), eapol.mic.unwrap_or([0u8; 16]));
                group.frame2.entry(key).or_insert((index, eapol));
            }
        }

        self.reconstruct(ap_id, sta_id, group_key);
    }

    fn reconstruct(&mut self, ap_id: ApId, sta_id: StaId, group_key: u64) {
        let _ = ap_id;
        let station = self.arena.station(sta_id);
        let Some(group) = station.replay_groups.get(&group_key) else { return };

        let mut new_auths = Vec::new();
        for (_, (f2_index, f2)) in group.frame2.iter() {
            let f2_mic = match f2.mic {
                Some(mic) => mic,
                None => continue,
            };
            let scheme = resolved_scheme(f2);

            for (anonce, (f3_index, _f3)) in group.frame3.iter() {
                let f1_entry = group.frame1.get(anonce);
                let (quality, spread) = match f1_entry {
                    Some((f1_index, _)) => {
                        let a = f2_index.abs_diff(*f3_index);
                        let b = f2_index.abs_diff(*f1_index);
                        let c = f1_index.abs_diff(*f3_index);
                        (0u8, a.max(b).max(c))
                    }
                    None => (1u8, f2_index.abs_diff(*f3_index)),
                };
                new_auths.push(Authentication {
                    scheme,
                    a_nonce: *anonce,
                    s_nonce: f2.nonce,
                    mic: f2_mic,
                    mic_body: f2.mic_body.clone(),
                    quality,
                    spread,
                });
            }

            // Every Frame1 ANonce not confirmed by a Frame3 still yields a
            // quality-2 Authentication (F1+F2 only), unconditionally —
            // not only when Frame3 is entirely absent for this group.
            for (anonce, (f1_index, f1)) in group.frame1.iter() {
                if group.frame3.contains_key(anonce) {
                    continue;
                }
                let spread = f2_index.abs_diff(*f1_index);
                new_auths.push(Authentication {
                    scheme,
                    a_nonce: f1.nonce,
                    s_nonce: f2.nonce,
                    mic: f2_mic,
                    mic_body: f2.mic_body.clone(),
                    quality: 2,
                    spread,
                });
            }
        }

        for auth in new_auths {
            let dedup_key = (sta_id, auth.a_nonce, auth.mic);
            if self.emitted.insert(dedup_key) {
                debug!(quality = auth.quality, spread = auth.spread, "reconstructed an authentication");
                self.hooks.on_new_auth(sta_id, &auth);
            }
        }
    }
}

/// The BPF filter installed after each new Station is discovered, when
/// the capture source supports live filter updates (§4.7 "Live-capture
/// optimization"). Excludes encrypted data payloads to the given
/// stations while still admitting management and unencrypted EAPOL.
pub fn live_capture_filter(station_macs: &[Mac]) -> String {
    let addr_terms: Vec<String> = station_macs
        .iter()
        .map(|m| format!("wlan addr1 {m} or wlan addr2 {m}"))
        .collect();
    let excluded = addr_terms.join(" or ");
    format!(
        "not type ctl and not ({excluded}) or subtype beacon or subtype probe-resp or \
         subtype assoc-req or (type data and wlan[1] & 0x40 = 0 and not subtype null)"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ManagementKind;

    fn eapol(replay_counter: u64, key_info: KeyInfo, nonce: [u8; 32], mic: Option<[u8; 16]>) -> EapolKeyFrame {
        EapolKeyFrame {
            replay_counter,
            key_info,
            key_length: 32,
            nonce,
            mic,
            mic_body: vec![0xAB; 99],
            default_scheme: KeyScheme::HmacSha1Aes,
        }
    }

    fn frame1_info() -> KeyInfo {
        KeyInfo { pairwise: true, install: false, ack: true, mic: false, scheme_hint: None }
    }
    fn frame2_info() -> KeyInfo {
        KeyInfo { pairwise: true, install: false, ack: false, mic: true, scheme_hint: None }
    }
    fn frame3_info() -> KeyInfo {
        KeyInfo { pairwise: true, install: true, ack: true, mic: true, scheme_hint: None }
    }

    struct RecordingHooks {
        new_aps: Vec<(ApId, Vec<u8>)>,
        new_auths: Vec<Authentication>,
    }

    impl ParserHooks for RecordingHooks {
        fn on_new_ap(&mut self, ap_id: ApId, _bssid: Mac, essid: &[u8]) {
            self.new_aps.push((ap_id, essid.to_vec()));
        }
        fn on_new_auth(&mut self, _sta_id: StaId, auth: &Authentication) {
            self.new_auths.push(auth.clone());
        }
    }

    #[test]
    fn full_handshake_reconstructs_one_quality_zero_authentication() {
        let hooks = RecordingHooks { new_aps: Vec::new(), new_auths: Vec::new() };
        let mut parser = Parser::new(hooks);

        let ap_mac = Mac([1, 1, 1, 1, 1, 1]);
        let sta_mac = Mac([2, 2, 2, 2, 2, 2]);
        let a_nonce = [0xAAu8; 32];
        let s_nonce = [0x55u8; 32];
        let mic = [0x11u8; 16];

        parser.feed(Frame::Data {
            ap_mac,
            sta_mac,
            eapol: Some(eapol(10, frame1_info(), a_nonce, None)),
        });
        parser.feed(Frame::Data {
            ap_mac,
            sta_mac,
            eapol: Some(eapol(10, frame2_info(), s_nonce, Some(mic))),
        });
        parser.feed(Frame::Data {
            ap_mac,
            sta_mac,
            eapol: Some(eapol(11, frame3_info(), a_nonce, None)),
        });

        let hooks = parser.into_hooks();
        assert_eq!(hooks.new_auths.len(), 1);
        let auth = &hooks.new_auths[0];
        assert_eq!(auth.quality, 0);
        assert_eq!(auth.a_nonce, a_nonce);
        assert_eq!(auth.s_nonce, s_nonce);
        assert_eq!(auth.mic, mic);
    }

    #[test]
    fn frame2_and_frame3_without_frame1_yield_quality_one() {
        let hooks = RecordingHooks { new_aps: Vec::new(), new_auths: Vec::new() };
        let mut parser = Parser::new(hooks);
        let ap_mac = Mac([3; 6]);
        let sta_mac = Mac([4; 6]);
        let a_nonce = [0x11u8; 32];
        let s_nonce = [0x22u8; 32];

        parser.feed(Frame::Data {
            ap_mac,
            sta_mac,
            eapol: Some(eapol(5, frame2_info(), s_nonce, Some([0x33u8; 16]))),
        });
        parser.feed(Frame::Data {
            ap_mac,
            sta_mac,
            eapol: Some(eapol(6, frame3_info(), a_nonce, None)),
        });

        let hooks = parser.into_hooks();
        assert_eq!(hooks.new_auths.len(), 1);
        assert_eq!(hooks.new_auths[0].quality, 1);
    }

    #[test]
    fn uncovered_frame1_entries_yield_quality_two_even_when_frame3_is_present() {
        let hooks = RecordingHooks { new_aps: Vec::new(), new_auths: Vec::new() };
        let mut parser = Parser::new(hooks);
        let ap_mac = Mac([5; 6]);
        let sta_mac = Mac([6; 6]);
        let confirmed_nonce = [0xAAu8; 32];
        let stray_nonce = [0xBBu8; 32];
        let s_nonce = [0x55u8; 32];
        let mic = [0x11u8; 16];

        // Two distinct Frame1 attempts in the same ReplayCounter group...
        parser.feed(Frame::Data {
            ap_mac,
            sta_mac,
            eapol: Some(eapol(10, frame1_info(), confirmed_nonce, None)),
        });
        parser.feed(Frame::Data {
            ap_mac,
            sta_mac,
            eapol: Some(eapol(10, frame1_info(), stray_nonce, None)),
        });
        parser.feed(Frame::Data {
            ap_mac,
            sta_mac,
            eapol: Some(eapol(10, frame2_info(), s_nonce, Some(mic))),
        });
        // ...but Frame3 only confirms one of them.
        parser.feed(Frame::Data {
            ap_mac,
            sta_mac,
            eapol: Some(eapol(11, frame3_info(), confirmed_nonce, None)),
        });

        let hooks = parser.into_hooks();
        assert_eq!(hooks.new_auths.len(), 2);
        let qualities: Vec<u8> = hooks.new_auths.iter().map(|a| a.quality).collect();
        assert!(qualities.contains(&0));
        assert!(qualities.contains(&2));
        let stray = hooks.new_auths.iter().find(|a| a.quality == 2).unwrap();
        assert_eq!(stray.a_nonce, stray_nonce);
        let confirmed = hooks.new_auths.iter().find(|a| a.quality == 0).unwrap();
        assert_eq!(confirmed.a_nonce, confirmed_nonce);
    }

    #[test]
    fn management_frame_with_empty_ssid_does_not_fire_on_new_ap() {
        let hooks = RecordingHooks { new_aps: Vec::new(), new_auths: Vec::new() };
        let mut parser = Parser::new(hooks);
        parser.feed(Frame::Management {
            bssid: Mac([9; 6]),
            kind: Some(ManagementKind::Beacon),
            ssid: Vec::new(),
        });
        assert!(parser.into_hooks().new_aps.is_empty());
    }

    #[test]
    fn management_frame_with_ssid_fires_on_new_ap_once() {
        let hooks = RecordingHooks { new_aps: Vec::new(), new_auths: Vec::new() };
        let mut parser = Parser::new(hooks);
        let bssid = Mac([9; 6]);
        for _ in 0..2 {
            parser.feed(Frame::Management {
                bssid,
                kind: Some(ManagementKind::Beacon),
                ssid: b"homenet".to_vec(),
            });
        }
        assert_eq!(parser.into_hooks().new_aps.len(), 1);
    }

    #[test]
    fn live_capture_filter_contains_station_mac_and_fixed_clauses() {
        let filter = live_capture_filter(&[Mac([1, 2, 3, 4, 5, 6])]);
        assert!(filter.contains("01:02:03:04:05:06"));
        assert!(filter.contains("subtype beacon"));
        assert!(filter.contains("not subtype null"));
    }
}
