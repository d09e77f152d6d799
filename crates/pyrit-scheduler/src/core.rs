//! Core workers (component F, §4.6): the `solve(essid, passwords) -> PMKs`
//! capability, plumbed through a generic worker loop instead of the
//! source's thread/device mix-in inheritance (§9 design note).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pyrit_core::{BufferSizeDefaults, Essid, Password, RuntimeError};
use pyrit_crypto::{compute_pmk, test_vector_table, TEST_VECTOR_ESSID, TEST_VECTOR_PASSWORD, TEST_VECTOR_PMK};
use tracing::{debug, info, warn};

use crate::scheduler::Scheduler;

/// The capability every device-specific kernel implements (§9: "a `Core`
/// capability... plus a generic worker task; the concrete device is an
/// implementation of the capability; no multiple inheritance is needed").
pub trait Solver: Send + Sync {
    /// Compute PMKs for `passwords` under `essid`. Implementations must
    /// return exactly `passwords.len()` results, in order.
    fn solve(&self, essid: &Essid, passwords: &[Password]) -> Vec<[u8; 32]>;

    /// A human-readable label for logs and `list_cores` (§6).
    fn name(&self) -> String;
}

/// The reference CPU kernel: PBKDF2-HMAC-SHA1 via `pyrit-crypto`. Stands in
/// for the source's VIA Padlock/SSE2/OpenSSL-backed `_cpyrit_cpu.CPUDevice`
/// (§4.6: "opaque... computing WPA PMKs").
pub struct CpuSolver;

impl Solver for CpuSolver {
    fn solve(&self, essid: &Essid, passwords: &[Password]) -> Vec<[u8; 32]> {
        passwords
            .iter()
            .map(|pw| compute_pmk(essid.as_bytes(), pw.as_bytes()))
            .collect()
    }

    fn name(&self) -> String {
        "CPU-Core".to_string()
    }
}

/// Validate `solver` against the fixed test vector across a batch of 101
/// copies (§4.6, §8.1). A mismatch is fatal and must abort startup.
pub fn validate_solver(solver: &dyn Solver) -> Result<(), RuntimeError> {
    let essid = Essid::new(TEST_VECTOR_ESSID.to_vec()).expect("test vector ESSID is valid");
    let pw = Password::new(TEST_VECTOR_PASSWORD).expect("test vector password is valid");
    let batch = vec![pw; 101];
    let results = solver.solve(&essid, &batch);
    if results.len() != batch.len() || results.iter().any(|pmk| *pmk != TEST_VECTOR_PMK) {
        return Err(RuntimeError::CoreDied(format!(
            "{} failed the startup test vector",
            solver.name()
        )));
    }
    Ok(())
}

/// `selftest` (§4.6): enqueue random subsets of the wider reference table
/// and check every PMK the solver returns against it directly (no
/// scheduler round-trip needed, this exercises the kernel in isolation).
pub fn selftest(solver: &dyn Solver) -> Result<usize, RuntimeError> {
    let mut checked = 0;
    for (essid, pw, expected) in test_vector_table() {
        let essid = Essid::new(essid.as_bytes().to_vec()).expect("reference ESSID is valid");
        let pw = Password::new(pw).expect("reference password is valid");
        let got = solver.solve(&essid, &[pw]);
        if got.len() != 1 || got[0] != expected {
            return Err(RuntimeError::CoreDied(format!(
                "{} disagreed with the reference table",
                solver.name()
            )));
        }
        checked += 1;
    }
    Ok(checked)
}

/// Per-core cumulative counters backing `getPeakPerformance` (§4.5) and
/// the liveness check cores are periodically re-checked against (§4.5,
/// §7: "a dead worker is fatal... must be reported on every waiting
/// call").
pub struct CoreStats {
    name: String,
    res_count: AtomicU64,
    comp_time_nanos: AtomicU64,
    alive: AtomicBool,
}

impl CoreStats {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(CoreStats {
            name: name.into(),
            res_count: AtomicU64::new(0),
            comp_time_nanos: AtomicU64::new(0),
            alive: AtomicBool::new(true),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    pub(crate) fn mark_dead(&self) {
        self.alive.store(false, Ordering::Relaxed);
    }

    fn record(&self, elapsed: Duration, result_count: usize) {
        self.res_count.fetch_add(result_count as u64, Ordering::Relaxed);
        self.comp_time_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.res_count.store(0, Ordering::Relaxed);
        self.comp_time_nanos.store(0, Ordering::Relaxed);
    }

    /// Results-per-second since the last reset, or `None` if nothing has
    /// been computed yet.
    pub fn throughput(&self) -> Option<f64> {
        let nanos = self.comp_time_nanos.load(Ordering::Relaxed);
        if nanos == 0 {
            return None;
        }
        let res = self.res_count.load(Ordering::Relaxed) as f64;
        Some(res / (nanos as f64 / 1_000_000_000.0))
    }
}

/// Blend the current target buffer size toward the observed throughput
/// (§4.5): `new = clamp((2*old + throughput*3) / 3, min, max)`.
pub fn adapt_buffer_size(old: usize, throughput: f64, defaults: BufferSizeDefaults) -> usize {
    let avg = (2.0 * old as f64 + throughput * 3.0) / 3.0;
    avg.round().clamp(defaults.min as f64, defaults.max as f64) as usize
}

/// Runs one core's `gather -> solve -> scatter -> adapt` loop on a
/// dedicated OS thread (§4.6, §5: "one thread per hardware core").
pub struct CoreWorker {
    pub stats: Arc<CoreStats>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl CoreWorker {
    /// Spawn the worker thread. Validates `solver` against the fixed test
    /// vector before entering the loop; a failure there is fatal (§4.6).
    pub fn spawn(
        scheduler: Arc<Scheduler>,
        solver: Box<dyn Solver>,
        defaults: BufferSizeDefaults,
    ) -> Result<Self, RuntimeError> {
        validate_solver(solver.as_ref())?;
        let name = solver.name();
        let stats = CoreStats::new(name.clone());
        scheduler.register_core(stats.clone());
        let thread_stats = stats.clone();
        let handle = std::thread::Builder::new()
            .name(name)
            .spawn(move || run_core_loop(scheduler, solver, defaults, thread_stats))
            .expect("spawning a core worker thread");
        Ok(CoreWorker {
            stats,
            handle: Some(handle),
        })
    }

    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_core_loop(
    scheduler: Arc<Scheduler>,
    solver: Box<dyn Solver>,
    defaults: BufferSizeDefaults,
    stats: Arc<CoreStats>,
) {
    let mut target_size = defaults.init;
    loop {
        if scheduler.is_shutting_down() {
            debug!(core = %solver.name(), "core worker exiting on shutdown");
            break;
        }
        let Some((gather_id, essid, passwords)) = scheduler.gather(target_size, None) else {
            continue;
        };
        let start = Instant::now();
        let results = solver.solve(&essid, &passwords);
        let elapsed = start.elapsed();
        if results.len() != passwords.len() {
            warn!(core = %solver.name(), "solver returned a mismatched result count, revoking");
            scheduler.revoke(gather_id, essid, passwords);
            stats.mark_dead();
            break;
        }
        stats.record(elapsed, results.len());
        scheduler.scatter(gather_id, results);
        let throughput = stats.throughput().unwrap_or(0.0);
        target_size = adapt_buffer_size(target_size, throughput, defaults);
    }
    info!(core = %solver.name(), "core worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_solver_matches_fixed_test_vector() {
        assert!(validate_solver(&CpuSolver).is_ok());
    }

    #[test]
    fn selftest_checks_the_reference_table() {
        assert_eq!(selftest(&CpuSolver).unwrap(), test_vector_table().len());
    }

    #[test]
    fn adapt_buffer_size_respects_bounds() {
        let defaults = BufferSizeDefaults::CPU;
        // (2*512 + 0*3)/3 = 341.33, rounds to 341, within [min, max].
        assert_eq!(adapt_buffer_size(defaults.init, 0.0, defaults), 341);
        assert_eq!(adapt_buffer_size(defaults.init, 10_000_000.0, defaults), defaults.max);
        assert!(adapt_buffer_size(1, 0.0, defaults) >= defaults.min);
    }
}
