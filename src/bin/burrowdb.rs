//! # BurrowDB Driver
//!
//! Binary entry point for exercising an index file from the command line.
//!
//! ## Usage
//!
//! ```bash
//! # Timed workload against a scratch index
//! burrowdb bench ./scratch.idx --records 100000
//!
//! # Validate an existing index and print its stats
//! burrowdb check ./records.idx
//!
//! # Show version / help
//! burrowdb --version
//! burrowdb --help
//! ```

use std::path::PathBuf;
use std::time::Instant;

use eyre::{bail, Result};

use burrowdb::{BPlusTree, PAGE_SIZE, VALUE_SIZE};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    match args[1].as_str() {
        "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        "--version" | "-v" => {
            println!("burrowdb {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "bench" => {
            let (path, records) = parse_bench_args(&args[2..])?;
            bench(&path, records)
        }
        "check" => {
            let path = match args.get(2) {
                Some(p) => PathBuf::from(p),
                None => bail!("check requires an index file path"),
            };
            check(&path)
        }
        other => bail!("unknown command: {}", other),
    }
}

fn print_usage() {
    println!("BurrowDB - memory-mapped B+ tree index");
    println!();
    println!("Usage:");
    println!("  burrowdb bench <path> [--records N]   timed workload (default N=100000)");
    println!("  burrowdb check <path>                 validate an index file");
    println!("  burrowdb --version");
    println!("  burrowdb --help");
}

fn parse_bench_args(args: &[String]) -> Result<(PathBuf, u32)> {
    let mut path: Option<PathBuf> = None;
    let mut records: u32 = 100_000;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--records" | "-n" => {
                let raw = args
                    .get(i + 1)
                    .ok_or_else(|| eyre::eyre!("--records requires a value"))?;
                records = raw
                    .parse()
                    .map_err(|_| eyre::eyre!("invalid record count: {}", raw))?;
                i += 2;
            }
            arg if arg.starts_with('-') => bail!("unknown option: {}", arg),
            arg => {
                if path.is_some() {
                    bail!("unexpected argument: {}", arg);
                }
                path = Some(PathBuf::from(arg));
                i += 1;
            }
        }
    }

    match path {
        Some(p) => Ok((p, records)),
        None => bail!("bench requires an index file path"),
    }
}

/// Deterministic 100-byte payload for a key: the key itself
/// (little-endian) followed by a byte pattern derived from it.
fn fill_value(key: i32) -> [u8; VALUE_SIZE] {
    let mut buf = [0u8; VALUE_SIZE];
    buf[..4].copy_from_slice(&key.to_le_bytes());
    for (i, b) in buf.iter_mut().enumerate().skip(4) {
        *b = key.wrapping_add(i as i32) as u8;
    }
    buf
}

fn verify_value(value: &[u8], key: i32) -> bool {
    value == fill_value(key)
}

/// Fixed odd-multiplier permutation of the key space, so "random" reads
/// hit every key exactly once without an RNG dependency.
fn scramble(i: u32) -> u32 {
    i.wrapping_mul(2_654_435_761)
}

fn bench(path: &PathBuf, records: u32) -> Result<()> {
    if path.exists() {
        bail!(
            "refusing to benchmark over existing file '{}'",
            path.display()
        );
    }

    println!("BurrowDB bench: {} records, {} byte pages", records, PAGE_SIZE);

    let mut tree = BPlusTree::open(path)?;

    let start = Instant::now();
    for i in 0..records {
        let key = i as i32;
        tree.write(key, &fill_value(key))?;
    }
    report("sequential insert", records, start.elapsed());

    let start = Instant::now();
    let mut ok = 0u32;
    for i in 0..records {
        let key = (scramble(i) % records) as i32;
        if tree.read(key)?.is_some_and(|v| verify_value(v, key)) {
            ok += 1;
        }
    }
    report("random read", records, start.elapsed());
    if ok != records {
        bail!("{} of {} reads failed verification", records - ok, records);
    }

    let lo = 0;
    let hi = (records / 10) as i32;
    let start = Instant::now();
    let scanned = tree.range(lo, hi)?.count() as u32;
    let elapsed = start.elapsed();
    println!(
        "range [{}, {}]: {} results in {:.2?}",
        lo, hi, scanned, elapsed
    );

    let start = Instant::now();
    let mut deleted = 0u32;
    for key in (0..records as i32).step_by(2) {
        if tree.delete(key)? {
            deleted += 1;
        }
    }
    report("delete", deleted, start.elapsed());

    tree.check_integrity()?;
    println!("integrity check passed, {} records remain", tree.record_count()?);

    tree.flush()?;
    std::fs::remove_file(path)?;
    Ok(())
}

fn check(path: &PathBuf) -> Result<()> {
    let tree = BPlusTree::open(path)?;

    let start = Instant::now();
    tree.check_integrity()?;
    let elapsed = start.elapsed();

    println!("{}: ok ({:.2?})", path.display(), elapsed);
    println!("  records: {}", tree.record_count()?);
    Ok(())
}

fn report(what: &str, ops: u32, elapsed: std::time::Duration) {
    let per_sec = ops as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    println!("{}: {} ops in {:.2?} ({:.0} ops/sec)", what, ops, elapsed, per_sec);
}
