//! The handshake cracker (component H, §4.8): parallel MIC verification
//! over PMK batches arriving from the compute scheduler, sharing one
//! bounded queue the way the scheduler shares its ingress queue (§4.5)
//! rather than reaching for an external channel crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};
use pyrit_core::Password;
use pyrit_crypto::{verify_pmk, KeyScheme};
use pyrit_parser::Authentication;
use tracing::{debug, info};

/// Bounded queue capacity (§4.8: "a bounded queue (capacity 10 batches)").
const QUEUE_CAPACITY: usize = 10;

pub type Batch = Vec<(Password, [u8; 32])>;

/// Everything the cracker needs to test one candidate PMK, derived from
/// a reconstructed [`Authentication`] plus the PKE the caller built from
/// its AP/station MACs (§4.8: "test each PMK by deriving the PTK from
/// `(PMK, PKE)`").
pub struct CrackTarget {
    pub scheme: KeyScheme,
    pub pke: Vec<u8>,
    pub mic_body: Vec<u8>,
    pub mic: [u8; 16],
}

impl CrackTarget {
    pub fn from_authentication(auth: &Authentication, pke: Vec<u8>) -> Self {
        CrackTarget {
            scheme: auth.scheme,
            pke,
            mic_body: auth.mic_body.clone(),
            mic: auth.mic,
        }
    }
}

struct Shared {
    queue: Mutex<VecDeque<Batch>>,
    not_empty: Condvar,
    not_full: Condvar,
    closed: AtomicBool,
    stop: AtomicBool,
    found: Mutex<Option<Password>>,
}

/// A pool of cracker threads all testing PMK batches against one
/// [`CrackTarget`]. The first matching password wins; every other thread
/// notices `stop` and exits without finishing its current batch (§4.8:
/// "First matching password wins").
pub struct Cracker {
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
}

impl Cracker {
    pub fn spawn(target: CrackTarget, thread_count: usize) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            closed: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            found: Mutex::new(None),
        });
        let target = Arc::new(target);

        let handles = (0..thread_count.max(1))
            .map(|i| {
                let shared = shared.clone();
                let target = target.clone();
                std::thread::Builder::new()
                    .name(format!("cracker-{i}"))
                    .spawn(move || run_cracker_loop(shared, target))
                    .expect("spawning a cracker thread")
            })
            .collect();

        Cracker { shared, handles }
    }

    /// Submit a batch of (password, candidate PMK) pairs. Blocks while the
    /// queue is at capacity (§4.8).
    pub fn submit(&self, batch: Batch) {
        let mut queue = self.shared.queue.lock();
        while queue.len() >= QUEUE_CAPACITY && !self.shared.stop.load(Ordering::Relaxed) {
            self.shared.not_full.wait(&mut queue);
        }
        if self.shared.stop.load(Ordering::Relaxed) {
            return;
        }
        queue.push_back(batch);
        self.shared.not_empty.notify_one();
    }

    pub fn found(&self) -> Option<Password> {
        self.shared.found.lock().clone()
    }

    pub fn is_done(&self) -> bool {
        self.shared.stop.load(Ordering::Relaxed)
    }

    /// Signal no more batches are coming, stop all threads once the queue
    /// drains (or immediately if a password was already found), and join
    /// them (§4.8: "shutdown joins them").
    pub fn shutdown(mut self) -> Option<Password> {
        self.shared.closed.store(true, Ordering::Relaxed);
        self.shared.not_empty.notify_all();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        self.shared.found.lock().clone()
    }
}

fn run_cracker_loop(shared: Arc<Shared>, target: Arc<CrackTarget>) {
    loop {
        let batch = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(batch) = queue.pop_front() {
                    shared.not_full.notify_one();
                    break Some(batch);
                }
                if shared.stop.load(Ordering::Relaxed) || shared.closed.load(Ordering::Relaxed) {
                    break None;
                }
                shared.not_empty.wait(&mut queue);
            }
        };
        let Some(batch) = batch else { return };

        for (password, pmk) in batch {
            if shared.stop.load(Ordering::Relaxed) {
                return;
            }
            if verify_pmk(target.scheme, &pmk, &target.pke, &target.mic_body, &target.mic) {
                *shared.found.lock() = Some(password);
                shared.stop.store(true, Ordering::Relaxed);
                shared.not_full.notify_all();
                shared.not_empty.notify_all();
                info!("cracker thread found a matching password");
                return;
            }
        }
        debug!(size = "batch", "cracker thread exhausted a batch with no match");
    }
}
