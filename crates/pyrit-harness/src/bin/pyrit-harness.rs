//! Operator CLI for pyrit's compute/storage layers: `selftest`, `benchmark`
//! and `verify` (§4.6, §8.1, GLOSSARY "selftest"/"verify"/"benchmark").
//!
//! Library crates never install a `tracing` subscriber themselves (§9
//! design note); this binary is the one place that does, controlled by
//! `RUST_LOG`.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use rand::seq::SliceRandom;
use rand::Rng;

use pyrit_core::{BufferSizeDefaults, Config, Essid, Password};
use pyrit_crypto::{compute_pmk, test_vector_table};
use pyrit_scheduler::{selftest as core_selftest, CoreWorker, CpuSolver, Scheduler};
use pyrit_storage::FsStorage;

#[derive(Debug, Parser)]
#[command(name = "pyrit-harness")]
#[command(about = "selftest/verify/benchmark tooling for pyrit's compute and storage layers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Test every available core against the fixed and wider reference
    /// tables; exit non-zero if any core disagrees.
    Selftest {
        /// Stop after approximately this many seconds of continuous
        /// randomized batches, in addition to the direct reference-table
        /// pass.
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },
    /// Determine the peak throughput of the available cores.
    Benchmark {
        /// Seconds to run the timed portion of the benchmark for.
        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },
    /// Recompute a random 10% sample of every stored result set and
    /// compare against the value on disk.
    Verify {
        /// Storage base directory (`<base>/password`, `<base>/essid`).
        #[arg(long)]
        storage: PathBuf,
        /// Only verify this ESSID; defaults to every ESSID in the store.
        #[arg(long)]
        essid: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Selftest { timeout } => run_selftest(timeout),
        Command::Benchmark { timeout } => run_benchmark(timeout),
        Command::Verify { storage, essid } => run_verify(storage, essid),
    }
}

/// Mirrors the source's `selftest`: first a direct per-core check against
/// the wider reference table, then a timed burst of randomized workunits
/// round-tripped through a real scheduler so the gather/scatter/adapt
/// plumbing is exercised too, not just the raw kernel.
fn run_selftest(timeout: u64) -> Result<(), Box<dyn std::error::Error>> {
    println!("Cores incorporated in the test:");
    println!("#1:  '{}'", CpuSolver.name());
    use pyrit_scheduler::Solver;

    println!("\nRunning direct reference-table check...");
    let checked = core_selftest(&CpuSolver)?;
    println!("Checked {checked} reference vectors directly against the core.");

    println!("\nRunning scheduler round-trip selftest for about {timeout}s...");
    let scheduler = Scheduler::new();
    let worker = CoreWorker::spawn(scheduler.clone(), Box::new(CpuSolver), BufferSizeDefaults::CPU)?;

    let table = test_vector_table();
    let mut rng = rand::thread_rng();
    let mut workunits: Vec<(Essid, Vec<(&'static str, [u8; 32])>)> = Vec::new();
    let mut err = false;
    let start = Instant::now();

    while start.elapsed() < Duration::from_secs(timeout) && !err {
        let essid_str = if rng.gen_bool(0.5) { "foo" } else { "bar" };
        let candidates: Vec<&(&str, &str, [u8; 32])> =
            table.iter().filter(|(e, ..)| *e == essid_str).collect();
        let n = rng.gen_range(1..=candidates.len().max(1));
        let mut chosen = Vec::new();
        let mut passwords = Vec::new();
        for _ in 0..n {
            let entry = candidates.choose(&mut rng).expect("candidates non-empty for known essids");
            let pw = Password::new(entry.1).expect("reference password is valid");
            passwords.push(pw);
            chosen.push((entry.1, entry.2));
        }
        let essid = Essid::new(essid_str.as_bytes().to_vec()).expect("reference essid is valid");
        scheduler.enqueue(essid.clone(), passwords, true)?;
        workunits.push((essid, chosen));

        if let Some(results) = scheduler.dequeue(false, None)? {
            let (_, expected) = workunits.remove(0);
            err = results_disagree(&expected, &results);
        }
    }
    scheduler.shutdown();
    while let Some(results) = scheduler.dequeue(true, Some(Duration::from_secs(5)))? {
        if workunits.is_empty() {
            break;
        }
        let (_, expected) = workunits.remove(0);
        if results_disagree(&expected, &results) {
            err = true;
        }
    }
    worker.join();

    if err || !workunits.is_empty() {
        return Err("\n!!! WARNING !!!\nAt least some results seem to be invalid. This may be \
                     caused by a bug in pyrit, faulty hardware or malicious network clients. \
                     Do not trust this installation...\n"
            .into());
    }
    println!("\nAll results verified. Your installation seems OK.");
    Ok(())
}

fn results_disagree(expected: &[(&str, [u8; 32])], got: &[[u8; 32]]) -> bool {
    expected.len() != got.len() || expected.iter().zip(got).any(|((_, pmk), g)| pmk != g)
}

/// Mirrors the source's `benchmark`: a short calibration burn-in, then a
/// timed burst sized to the scheduler's own peak-performance estimate, and
/// finally the per-core throughput report.
fn run_benchmark(timeout: u64) -> Result<(), Box<dyn std::error::Error>> {
    let scheduler = Scheduler::new();
    let worker = CoreWorker::spawn(scheduler.clone(), Box::new(CpuSolver), BufferSizeDefaults::CPU)?;
    let essid = Essid::new(b"foo".to_vec()).unwrap();
    let pw = Password::new("barbarbar").unwrap();

    print!("Calibrating...");
    let calibration_start = Instant::now();
    while calibration_start.elapsed() < Duration::from_secs(10) {
        scheduler.enqueue(essid.clone(), vec![pw.clone(); 1500], true)?;
        let _ = scheduler.dequeue(false, None)?;
    }
    drain(&scheduler);

    let batch_size = (scheduler.peak_performance() as usize).clamp(500, 50_000);
    scheduler.reset_statistics();
    let cycler = ['\\', '|', '/', '-'];
    let start = Instant::now();
    let mut tick = 0usize;
    while start.elapsed() < Duration::from_secs(timeout) {
        print!(
            "\rRunning benchmark for about {} seconds... {}",
            timeout.saturating_sub(start.elapsed().as_secs()),
            cycler[tick % cycler.len()]
        );
        tick += 1;
        scheduler.enqueue(essid.clone(), vec![pw.clone(); batch_size], true)?;
        let _ = scheduler.dequeue(false, None)?;
    }
    println!();
    drain(&scheduler);
    println!();

    let stats = worker.stats.clone();
    scheduler.shutdown();
    worker.join();
    print_core_stats(&stats, start.elapsed());
    Ok(())
}

fn drain(scheduler: &Scheduler) {
    while scheduler.pending_count() > 0 {
        let _ = scheduler.dequeue(true, Some(Duration::from_secs(5)));
    }
}

fn print_core_stats(stats: &pyrit_scheduler::CoreStats, elapsed: Duration) {
    let throughput = stats.throughput().unwrap_or(0.0);
    println!(
        "Running {} PMKs/s for {:.2}s (computed on '{}').",
        throughput as u64,
        elapsed.as_secs_f64(),
        stats.name(),
    );
}

/// Mirrors the source's `verify`: for each `(essid, key)` result set,
/// recompute a random 10% sample directly (no scheduler round-trip
/// needed — this exercises the stored data, not the compute path) and
/// compare against what's on disk.
fn run_verify(storage: PathBuf, only_essid: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let storage = FsStorage::open(storage, Config::default())?;
    let essids: Vec<Essid> = match only_essid {
        Some(s) => {
            let essid = Essid::new(s.as_bytes().to_vec())?;
            if !storage.essids.contains(&essid) {
                return Err(format!("The ESSID '{s}' is not found in the repository").into());
            }
            vec![essid]
        }
        None => storage.essids.iter_essids().cloned().collect(),
    };

    let mut total_checked = 0usize;
    let mut corrupted = false;
    let start = Instant::now();
    let mut rng = rand::thread_rng();

    for essid in essids {
        println!("Verifying ESSID '{essid}'");
        for key in storage.essids.iter_keys(&essid)?.cloned().collect::<Vec<_>>() {
            let results = storage.essids.get(&essid, &key)?;
            let sample_size = (results.len() as f64 * 0.1) as usize;
            if sample_size == 0 {
                continue;
            }
            let sample: Vec<_> = {
                let mut indices: Vec<usize> = (0..results.len()).collect();
                let (chosen, _) = indices.partial_shuffle(&mut rng, sample_size);
                chosen.iter().map(|&i| results[i].clone()).collect()
            };
            for (pw, expected_pmk) in sample {
                let recomputed = compute_pmk(essid.as_bytes(), pw.as_bytes());
                total_checked += 1;
                if recomputed != expected_pmk {
                    eprintln!("Workunit {key} for ESSID '{essid}' seems corrupted");
                    corrupted = true;
                }
            }
            let tdiff = start.elapsed().as_secs_f64();
            print!(
                "\rComputed {total_checked} PMKs so far; {:.1} PMKs per second.",
                if tdiff > 0.0 { total_checked as f64 / tdiff } else { 0.0 }
            );
        }
    }
    let tdiff = start.elapsed().as_secs_f64();
    println!(
        "\nVerified {total_checked} PMKs with {:.2} PMKs/s.",
        if tdiff > 0.0 { total_checked as f64 / tdiff } else { 0.0 }
    );

    if corrupted {
        return Err("\nAt least one workunit-file contains invalid results. There are two \
                     options now:\n\
                     * The results on the disk are corrupted or invalid. You should mistrust \
                     the entire repository.\n\
                     * A bug or faulty hardware on this or a contributing machine computed \
                     invalid results."
            .into());
    }
    Ok(())
}
