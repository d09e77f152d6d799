//! The FIFO compute scheduler (component E, §4.5): ingress queue, ordered
//! egress, per-gather slice accounting and adaptive-batching support.
//!
//! Concurrency model: one [`parking_lot::Mutex`] guards all scheduler
//! state, one [`parking_lot::Condvar`] wakes waiters. Every wait is bounded
//! so a dead core is always discovered rather than deadlocked on (§5, §7).

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use pyrit_core::{Essid, Password, RuntimeError};
use tracing::{debug, trace};

use crate::core::CoreStats;

/// How often a blocking wait re-checks core liveness (§4.5, §5: "no wait
/// is unbounded without a health check").
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(3);
const GATHER_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Opaque handle identifying one outstanding `gather()` call, returned
/// alongside its passwords so a later `scatter`/`revoke` can find the
/// slice accounting recorded for it. Replaces the source's content-keyed
/// `self.slices` dict (which relied on Python tuples being hashable) with
/// an explicit token — a cleaner fit for Rust's ownership model (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GatherId(u64);

struct IngressEntry {
    essid: Essid,
    /// ingress offset -> remaining passwords starting at that offset.
    slices: BTreeMap<u64, Vec<Password>>,
}

struct Inner {
    ingress: VecDeque<IngressEntry>,
    in_idx: u64,
    out_idx: u64,
    /// Length of each outstanding `enqueue` call, oldest first.
    workunits: VecDeque<usize>,
    outqueue: HashMap<u64, Vec<[u8; 32]>>,
    slices: HashMap<GatherId, Vec<(u64, usize)>>,
    next_gather_id: u64,
    shutdown: bool,
}

impl Inner {
    fn pending_count(&self) -> usize {
        self.ingress
            .iter()
            .map(|e| e.slices.values().map(Vec::len).sum::<usize>())
            .sum()
    }
}

pub struct Scheduler {
    inner: Mutex<Inner>,
    cv: Condvar,
    core_stats: Mutex<Vec<Arc<CoreStats>>>,
}

impl Scheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Scheduler {
            inner: Mutex::new(Inner {
                ingress: VecDeque::new(),
                in_idx: 0,
                out_idx: 0,
                workunits: VecDeque::new(),
                outqueue: HashMap::new(),
                slices: HashMap::new(),
                next_gather_id: 0,
                shutdown: false,
            }),
            cv: Condvar::new(),
            core_stats: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn register_core(&self, stats: Arc<CoreStats>) {
        self.core_stats.lock().push(stats);
    }

    /// Summed peak performance across every core that has computed
    /// anything (§4.5: "based on the performance all cores would have
    /// with 100% occupancy").
    pub fn peak_performance(&self) -> f64 {
        self.core_stats
            .lock()
            .iter()
            .filter_map(|s| s.throughput())
            .sum()
    }

    pub fn reset_statistics(&self) {
        for s in self.core_stats.lock().iter() {
            s.reset();
        }
    }

    fn check_cores(&self) -> Result<(), RuntimeError> {
        for stats in self.core_stats.lock().iter() {
            if !stats.is_alive() {
                return Err(RuntimeError::CoreDied(stats.name().to_string()));
            }
        }
        Ok(())
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.lock().shutdown
    }

    pub fn shutdown(&self) {
        self.inner.lock().shutdown = true;
        self.cv.notify_all();
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending_count()
    }

    /// Append `passwords` under `essid` to the ingress queue (§4.5).
    /// When `block`, waits while more than `5 * peak_performance`
    /// passwords are already pending. Coalesces into the trailing
    /// ingress entry when it shares the same ESSID.
    pub fn enqueue(&self, essid: Essid, passwords: Vec<Password>, block: bool) -> Result<(), RuntimeError> {
        let mut guard = self.inner.lock();
        if block {
            loop {
                let pending = guard.pending_count();
                if pending == 0 {
                    break;
                }
                let peak = self.peak_performance();
                if peak > 0.0 && pending as f64 <= peak * 5.0 {
                    break;
                }
                self.check_cores()?;
                self.cv.wait_for(&mut guard, HEALTH_CHECK_INTERVAL);
            }
        }

        let in_idx = guard.in_idx;
        let len = passwords.len() as u64;
        match guard.ingress.back_mut() {
            Some(entry) if entry.essid == essid => {
                entry.slices.insert(in_idx, passwords);
            }
            _ => {
                let mut slices = BTreeMap::new();
                slices.insert(in_idx, passwords);
                guard.ingress.push_back(IngressEntry { essid, slices });
            }
        }
        guard.workunits.push_back(len as usize);
        guard.in_idx += len;
        self.cv.notify_all();
        Ok(())
    }

    /// Return the results for the oldest outstanding `enqueue` call, or
    /// `None` if nothing is outstanding (§4.5). Blocks until that slice
    /// is contiguously complete, bounded by `timeout` if given.
    pub fn dequeue(
        &self,
        block: bool,
        timeout: Option<Duration>,
    ) -> Result<Option<Vec<[u8; 32]>>, RuntimeError> {
        let start = Instant::now();
        let mut guard = self.inner.lock();
        if guard.workunits.is_empty() {
            return Ok(None);
        }
        loop {
            let wu_length = *guard.workunits.front().expect("checked non-empty above");
            let ready = guard
                .outqueue
                .get(&guard.out_idx)
                .map(|v| v.len() >= wu_length)
                .unwrap_or(false);
            if ready {
                let mut reslist = guard.outqueue.remove(&guard.out_idx).expect("checked ready above");
                let rest = reslist.split_off(wu_length);
                let new_out_idx = guard.out_idx + wu_length as u64;
                if !rest.is_empty() {
                    guard.outqueue.insert(new_out_idx, rest);
                }
                guard.out_idx = new_out_idx;
                guard.workunits.pop_front();
                self.cv.notify_all();
                return Ok(Some(reslist));
            }

            self.check_cores()?;
            if !block {
                return Ok(None);
            }
            if let Some(timeout) = timeout {
                let remaining = timeout.checked_sub(start.elapsed());
                match remaining {
                    Some(remaining) if !remaining.is_zero() => {
                        self.cv.wait_for(&mut guard, remaining.min(Duration::from_millis(100)));
                    }
                    _ => return Ok(None),
                }
            } else {
                self.cv.wait_for(&mut guard, HEALTH_CHECK_INTERVAL);
            }
        }
    }

    /// Pull up to `desired_size` passwords from the head of the ingress
    /// queue, drawn from a single ESSID (§4.5). Blocks (bounded by
    /// `timeout` if given, else indefinitely with periodic health
    /// checks) while no work is available; returns `None` on timeout or
    /// shutdown.
    pub fn gather(&self, desired_size: usize, timeout: Option<Duration>) -> Option<(GatherId, Essid, Vec<Password>)> {
        let start = Instant::now();
        let mut guard = self.inner.lock();
        loop {
            if guard.shutdown {
                return None;
            }
            if self.check_cores().is_err() {
                return None;
            }

            let mut passwords = Vec::new();
            let mut fragments = Vec::new();
            let mut cur_essid: Option<Essid> = None;
            let mut rest = desired_size;
            let mut drained_entries = 0usize;

            'outer: for entry in guard.ingress.iter_mut() {
                if let Some(ref essid) = cur_essid {
                    if essid != &entry.essid {
                        break;
                    }
                } else {
                    cur_essid = Some(entry.essid.clone());
                }
                let offsets: Vec<u64> = entry.slices.keys().copied().collect();
                for idx in offsets {
                    if rest == 0 {
                        break 'outer;
                    }
                    let slice = entry.slices.remove(&idx).expect("offset came from this map");
                    if slice.len() <= rest {
                        rest -= slice.len();
                        fragments.push((idx, slice.len()));
                        passwords.extend(slice);
                    } else {
                        let (taken, remaining) = slice.split_at(rest);
                        fragments.push((idx, taken.len()));
                        passwords.extend_from_slice(taken);
                        entry.slices.insert(idx + taken.len() as u64, remaining.to_vec());
                        rest = 0;
                    }
                }
                if entry.slices.is_empty() {
                    drained_entries += 1;
                }
            }
            while drained_entries > 0 {
                if guard.ingress.front().map(|e| e.slices.is_empty()).unwrap_or(false) {
                    guard.ingress.pop_front();
                }
                drained_entries -= 1;
            }

            if !passwords.is_empty() {
                let id = GatherId(guard.next_gather_id);
                guard.next_gather_id += 1;
                guard.slices.insert(id, fragments);
                self.cv.notify_all();
                return Some((id, cur_essid.expect("passwords implies an essid"), passwords));
            }

            if let Some(timeout) = timeout {
                if start.elapsed() >= timeout {
                    return None;
                }
            }
            trace!("gather found nothing pending, waiting");
            self.cv.wait_for(&mut guard, GATHER_POLL_INTERVAL);
        }
    }

    /// Splice `results` back into the out-buffer at the offsets recorded
    /// for `id`, merging contiguous completed ranges (§4.5).
    pub fn scatter(&self, id: GatherId, results: Vec<[u8; 32]>) {
        let mut guard = self.inner.lock();
        let Some(fragments) = guard.slices.remove(&id) else {
            debug!("scatter() called with an unknown gather id, ignoring");
            return;
        };
        let mut ptr = 0usize;
        for (idx, len) in fragments {
            guard.outqueue.insert(idx, results[ptr..ptr + len].to_vec());
            ptr += len;
        }
        merge_contiguous(&mut guard.outqueue);
        self.cv.notify_all();
    }

    /// Re-insert the passwords gathered under `id` at the head of the
    /// ingress queue at their original offsets, so another core can
    /// retry them (§4.5). `essid`/`passwords` must be exactly the tuple
    /// `gather` returned alongside `id` — the core's own responsibility
    /// to stop pulling further work once it revokes (§5: "Cancellation").
    pub fn revoke(&self, id: GatherId, essid: Essid, passwords: Vec<Password>) {
        let mut guard = self.inner.lock();
        let Some(fragments) = guard.slices.remove(&id) else {
            debug!("revoke() called with an unknown gather id, ignoring");
            return;
        };
        let front_matches = guard.ingress.front().map(|e| e.essid == essid).unwrap_or(false);
        if !front_matches {
            guard.ingress.push_front(IngressEntry {
                essid: essid.clone(),
                slices: BTreeMap::new(),
            });
        }
        let entry = guard.ingress.front_mut().expect("just ensured a front entry");
        let mut ptr = 0usize;
        for (idx, len) in fragments {
            entry.slices.insert(idx, passwords[ptr..ptr + len].to_vec());
            ptr += len;
        }
        self.cv.notify_all();
    }
}

fn merge_contiguous(outqueue: &mut HashMap<u64, Vec<[u8; 32]>>) {
    loop {
        let mut merged_any = false;
        let keys: Vec<u64> = outqueue.keys().copied().collect();
        for k in keys {
            let Some(len) = outqueue.get(&k).map(|v| v.len() as u64) else {
                continue;
            };
            let next_key = k + len;
            if next_key == k {
                continue;
            }
            if let Some(next_vals) = outqueue.remove(&next_key) {
                outqueue.get_mut(&k).expect("k still present").extend(next_vals);
                merged_any = true;
            }
        }
        if !merged_any {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyrit_core::Config;

    fn essid(s: &str) -> Essid {
        Essid::new(s.as_bytes().to_vec()).unwrap()
    }

    fn pws(n: usize, prefix: &str) -> Vec<Password> {
        (0..n)
            .map(|i| Password::new(format!("{prefix}{i:0>4}")).unwrap())
            .collect()
    }

    #[test]
    fn gather_scatter_dequeue_round_trips_one_essid() {
        let _ = Config::default();
        let sched = Scheduler::new();
        let net = essid("testnet");
        sched.enqueue(net.clone(), pws(10, "pw"), true).unwrap();

        let (id, gathered_essid, gathered_pws) = sched.gather(100, Some(Duration::from_millis(10))).unwrap();
        assert_eq!(gathered_essid, net);
        assert_eq!(gathered_pws.len(), 10);

        let pmks: Vec<[u8; 32]> = (0..10u8).map(|i| [i; 32]).collect();
        sched.scatter(id, pmks.clone());

        let result = sched.dequeue(true, Some(Duration::from_millis(50))).unwrap().unwrap();
        assert_eq!(result, pmks);
        assert!(sched.dequeue(false, None).unwrap().is_none());
    }

    #[test]
    fn coalescing_same_essid_preserves_fifo_and_counts() {
        let sched = Scheduler::new();
        let net_x = essid("X");
        let net_y = essid("Y");
        sched.enqueue(net_x.clone(), pws(100, "x"), true).unwrap();
        sched.enqueue(net_x.clone(), pws(50, "x"), true).unwrap();
        sched.enqueue(net_y.clone(), pws(10, "y"), true).unwrap();

        let (id1, g1_essid, g1_pws) = sched.gather(100, Some(Duration::from_millis(10))).unwrap();
        assert_eq!(g1_essid, net_x);
        assert_eq!(g1_pws.len(), 100);
        sched.scatter(id1, (0..100u32).map(|i| [i as u8; 32]).collect());

        let (id2, g2_essid, g2_pws) = sched.gather(100, Some(Duration::from_millis(10))).unwrap();
        assert_eq!(g2_essid, net_x);
        assert_eq!(g2_pws.len(), 50);
        sched.scatter(id2, (0..50u32).map(|i| [i as u8; 32]).collect());

        let (id3, g3_essid, g3_pws) = sched.gather(100, Some(Duration::from_millis(10))).unwrap();
        assert_eq!(g3_essid, net_y);
        assert_eq!(g3_pws.len(), 10);
        sched.scatter(id3, (0..10u32).map(|i| [i as u8; 32]).collect());

        let d1 = sched.dequeue(true, Some(Duration::from_millis(50))).unwrap().unwrap();
        assert_eq!(d1.len(), 100);
        let d2 = sched.dequeue(true, Some(Duration::from_millis(50))).unwrap().unwrap();
        assert_eq!(d2.len(), 50);
        let d3 = sched.dequeue(true, Some(Duration::from_millis(50))).unwrap().unwrap();
        assert_eq!(d3.len(), 10);
    }

    #[test]
    fn revoke_returns_passwords_to_the_head_of_the_queue() {
        let sched = Scheduler::new();
        let net = essid("net");
        sched.enqueue(net.clone(), pws(5, "r"), true).unwrap();
        let (id, gathered_essid, gathered_pws) = sched.gather(100, Some(Duration::from_millis(10))).unwrap();
        assert_eq!(gathered_pws.len(), 5);
        sched.revoke(id, gathered_essid, gathered_pws.clone());

        let (_, regathered_essid, regathered_pws) = sched.gather(100, Some(Duration::from_millis(10))).unwrap();
        assert_eq!(regathered_essid, net);
        assert_eq!(regathered_pws, gathered_pws);
    }

    #[test]
    fn gather_never_mixes_essids_in_one_batch() {
        let sched = Scheduler::new();
        sched.enqueue(essid("A"), pws(5, "a"), true).unwrap();
        sched.enqueue(essid("B"), pws(5, "b"), true).unwrap();
        let (_, gathered_essid, gathered_pws) = sched.gather(100, Some(Duration::from_millis(10))).unwrap();
        assert_eq!(gathered_essid, essid("A"));
        assert_eq!(gathered_pws.len(), 5);
    }

    #[test]
    fn dequeue_returns_none_when_nothing_outstanding() {
        let sched = Scheduler::new();
        assert!(sched.dequeue(true, Some(Duration::from_millis(10))).unwrap().is_none());
    }
}
