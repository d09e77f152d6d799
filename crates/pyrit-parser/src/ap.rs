//! The AccessPoint/Station arena (§3, §9 design note: "Cyclic
//! back-references... model Stations/APs in an arena with indices; the
//! 'parent AP' is a stable id, not a strong reference").

use std::collections::HashMap;

use pyrit_crypto::KeyScheme;

use crate::frame::{EapolKeyFrame, Frame, Mac};

/// Frame2's dedup key: `(version, SNonce, MIC_body, MIC)` (§4.7).
pub type Frame2Key = (KeyScheme, [u8; 32], Vec<u8>, [u8; 16]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StaId(pub(crate) usize);

/// One ReplayCounter-indexed slot for a station's three possible EAPOL
/// frames (§3: "indexed by ReplayCounter into three slots"). Each slot
/// dedups by the key named in §4.7 and additionally remembers the frame's
/// position in the feed, the raw material the authentication "spread"
/// score is computed from.
#[derive(Debug, Default, Clone)]
pub struct ReplayGroup {
    /// Frame1/Frame3 de-dup by ANonce (§4.7).
    pub frame1: HashMap<[u8; 32], (u64, EapolKeyFrame)>,
    pub frame2: HashMap<Frame2Key, (u64, EapolKeyFrame)>,
    /// Frame 3 is stored under the replay counter of the Frame1/2 group
    /// it confirms, i.e. `frame3.replay_counter - 1` (§4.7), keyed here
    /// by the ANonce it confirms.
    pub frame3: HashMap<[u8; 32], (u64, EapolKeyFrame)>,
}

#[derive(Debug, Clone)]
pub struct AccessPoint {
    pub bssid: Mac,
    pub essid: Option<Vec<u8>>,
    /// The frame that yielded the ESSID, snapshotted verbatim (§3, §4.7
    /// step 2: "snapshot the frame as the 'ESSID frame'").
    pub essid_frame: Option<Frame>,
    stations: HashMap<Mac, StaId>,
}

#[derive(Debug, Clone)]
pub struct Station {
    pub mac: Mac,
    pub parent: ApId,
    /// Keyed by the Frame1/Frame2 ReplayCounter (Frame3 stored at
    /// `replay_counter - 1`, see [`ReplayGroup`]).
    pub replay_groups: HashMap<u64, ReplayGroup>,
}

/// Owns every AccessPoint/Station discovered in one parse session (§3
/// Lifecycle: "AccessPoints/Stations live for the lifetime of one parse
/// session"). Indices are stable for the session, so callbacks can hand
/// out `ApId`/`StaId` across threads without borrowing the arena.
#[derive(Debug, Default)]
pub struct Arena {
    aps: Vec<AccessPoint>,
    by_bssid: HashMap<Mac, ApId>,
    stations: Vec<Station>,
}

impl Arena {
    pub fn new() -> Self {
        Arena::default()
    }

    /// Look up or create the AccessPoint for `bssid`, returning its id
    /// and whether it was newly created.
    pub fn ap_for_bssid(&mut self, bssid: Mac) -> (ApId, bool) {
        if let Some(&id) = self.by_bssid.get(&bssid) {
            return (id, false);
        }
        let id = ApId(self.aps.len());
        self.aps.push(AccessPoint {
            bssid,
            essid: None,
            essid_frame: None,
            stations: HashMap::new(),
        });
        self.by_bssid.insert(bssid, id);
        (id, true)
    }

    pub fn ap(&self, id: ApId) -> &AccessPoint {
        &self.aps[id.0]
    }

    pub fn ap_mut(&mut self, id: ApId) -> &mut AccessPoint {
        &mut self.aps[id.0]
    }

    pub fn iter_aps(&self) -> impl Iterator<Item = (ApId, &AccessPoint)> {
        self.aps.iter().enumerate().map(|(i, ap)| (ApId(i), ap))
    }

    /// Look up or create the Station for `sta_mac` under `ap_id`.
    pub fn station_for(&mut self, ap_id: ApId, sta_mac: Mac) -> (StaId, bool) {
        if let Some(&sta_id) = self.aps[ap_id.0].stations.get(&sta_mac) {
            return (sta_id, false);
        }
        let sta_id = StaId(self.stations.len());
        self.stations.push(Station {
            mac: sta_mac,
            parent: ap_id,
            replay_groups: HashMap::new(),
        });
        self.aps[ap_id.0].stations.insert(sta_mac, sta_id);
        (sta_id, true)
    }

    pub fn station(&self, id: StaId) -> &Station {
        &self.stations[id.0]
    }

    pub fn station_mut(&mut self, id: StaId) -> &mut Station {
        &mut self.stations[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stations_parent_id_matches_the_containing_ap() {
        let mut arena = Arena::new();
        let (ap_id, created) = arena.ap_for_bssid(Mac([1; 6]));
        assert!(created);
        let (sta_id, _) = arena.station_for(ap_id, Mac([2; 6]));
        assert_eq!(arena.station(sta_id).parent, ap_id);
    }

    #[test]
    fn looking_up_the_same_bssid_twice_returns_the_same_id() {
        let mut arena = Arena::new();
        let (first, _) = arena.ap_for_bssid(Mac([7; 6]));
        let (second, created) = arena.ap_for_bssid(Mac([7; 6]));
        assert_eq!(first, second);
        assert!(!created);
    }
}
