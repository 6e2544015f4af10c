//! # Example: Short-Circuit Search
//!
//! Probes several mirrors for a file and answers `true` as soon as one of them has it.
//! The slower probes are stopped once the answer is known, so `close` returns after the
//! fastest hit rather than the slowest mirror.
//!
//! Run with: `cargo run --example short_circuit`

use std::time::{Duration, Instant};

use taskcoord::{AggregatingCoordinator, Config, Coordinator, TaskConfig, TaskError};

async fn probe(mirror: &'static str, ms: u64, has_file: bool) -> Result<bool, TaskError> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    println!("[{mirror}] answered {has_file} after {ms}ms");
    Ok(has_file)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let any = AggregatingCoordinator::any(Coordinator::new(Config::default())?);
    let started = Instant::now();

    let mirrors = [
        ("eu-1", 900, false),
        ("us-1", 250, true),
        ("ap-1", 3000, true),
        ("us-2", 120, false),
    ];
    let handles = mirrors
        .into_iter()
        .map(|(name, ms, has)| any.aggregate(TaskConfig::new().name(name), probe(name, ms, has)))
        .collect::<Result<Vec<_>, _>>()?;

    let found = any.close().await?;
    println!("found = {found} in {:?}", started.elapsed());
    for h in &handles {
        println!("  {:<5} {:?}", h.name(), h.stage());
    }
    Ok(())
}
