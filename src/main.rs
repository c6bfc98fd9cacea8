mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Cli, Command, Mode};
use prospector::bloom::BloomFilter;
use prospector::pipeline::{run_search, ScanMode, SearchConfig, SeedSource, StdoutSink};
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

fn main() {
    tracing_subscriber::fmt::init();

    if let Err(err) = run() {
        eprintln!("[!] {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::BlfGen { expected_items, output, false_positive_rate } => blf_gen(expected_items, false_positive_rate, &output),
        Command::BlfCheck { filter, hashes } => blf_check(&filter, &hashes),
        Command::Search { filter, range, threads, mode, seed, urandom } => search(&filter, &range, threads, mode, seed, urandom),
    }
}

fn blf_gen(expected_items: u64, false_positive_rate: f64, output: &std::path::Path) -> Result<()> {
    let mut filter = if output.exists() {
        let existing = BloomFilter::load(output).with_context(|| format!("loading existing filter at {}", output.display()))?;
        let sized_for_request = BloomFilter::new(expected_items, false_positive_rate);
        if existing.size_bits() != sized_for_request.size_bits() {
            anyhow::bail!(
                "existing filter at {} has {} bits, but -n {expected_items} / false-positive rate {false_positive_rate} requires {} bits",
                output.display(),
                existing.size_bits(),
                sized_for_request.size_bits(),
            );
        }
        info!(path = %output.display(), "updating existing bloom filter");
        existing
    } else {
        BloomFilter::new(expected_items, false_positive_rate)
    };

    let stdin = std::io::stdin();
    let mut count = 0u64;

    for line in stdin.lock().lines() {
        let line = line.context("reading hash160 from stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let bytes = hex::decode(line).with_context(|| format!("decoding hash160 {line:?}"))?;
        let hash: [u8; 20] = bytes.try_into().map_err(|_| anyhow::anyhow!("hash160 {line:?} is not 20 bytes"))?;
        filter.add(&hash);
        count += 1;
    }

    filter.save(output).with_context(|| format!("writing filter to {}", output.display()))?;
    info!(count, size_bits = filter.size_bits(), path = %output.display(), "bloom filter written");
    Ok(())
}

fn blf_check(path: &std::path::Path, hashes: &[String]) -> Result<()> {
    let filter = BloomFilter::load(path).with_context(|| format!("loading filter from {}", path.display()))?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for hash_hex in hashes {
        let bytes = hex::decode(hash_hex.trim()).with_context(|| format!("decoding hash160 {hash_hex:?}"))?;
        let hash: [u8; 20] = bytes.try_into().map_err(|_| anyhow::anyhow!("hash160 {hash_hex:?} is not 20 bytes"))?;
        let verdict = if filter.has(&hash) { "FOUND" } else { "NOT FOUND" };
        writeln!(out, "{hash_hex} {verdict}")?;
    }
    Ok(())
}

fn search(filter_path: &std::path::Path, range: &str, threads: Option<usize>, mode: Mode, seed: Option<u64>, urandom: bool) -> Result<()> {
    let bloom = Arc::new(BloomFilter::load(filter_path).with_context(|| format!("loading filter from {}", filter_path.display()))?);
    let (lo, hi) = config::parse_range(range)?;
    let threads = threads.unwrap_or_else(num_cpus::get);

    let scan_mode = match mode {
        Mode::Range => ScanMode::Range { lo, hi },
        Mode::Random => {
            let seed_source = if urandom { SeedSource::Urandom } else { SeedSource::Explicit(seed.unwrap_or(0)) };
            ScanMode::Random { lo, hi, seed: seed_source }
        }
    };
    let search_config = SearchConfig { mode: scan_mode, threads };

    let stop = Arc::new(AtomicBool::new(false));
    let stop_for_handler = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        info!("interrupt received, stopping search");
        stop_for_handler.store(true, Ordering::SeqCst);
    })
    .context("installing Ctrl-C handler")?;

    let sink = Arc::new(StdoutSink::default());
    match run_search(bloom, search_config, sink, stop) {
        Ok(()) => Ok(()),
        Err(prospector::Error::Canceled) => {
            info!("search stopped by interrupt");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
