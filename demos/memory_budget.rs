//! # Example: Memory Budget
//!
//! Jobs of different sizes share a 64 MiB budget. A job that does not fit is put on hold
//! and resumes once earlier jobs release their share; the budget is never exceeded.
//!
//! Run with: `RUST_LOG=taskcoord=debug cargo run --example memory_budget`

use std::{sync::Arc, time::Duration};

use taskcoord::{Config, Coordinator, CountableResource, LogWriter, Subscribe};
use tracing_subscriber::EnvFilter;

const MIB: u64 = 1024 * 1024;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let coordinator = Coordinator::builder(Config::default())
        .with_subscribers(vec![Arc::new(LogWriter) as Arc<dyn Subscribe>])
        .build()?;
    let memory = Arc::new(CountableResource::new("memory", 64 * MIB));

    for (i, size) in [40, 16, 32, 8, 48, 24].into_iter().enumerate() {
        let memory_view = Arc::clone(&memory);
        coordinator
            .configure()
            .name(format!("job-{i}"))
            .required_resource(Arc::clone(&memory), size * MIB)
            .execute(async move {
                println!(
                    "[job-{i}] running with {size} MiB ({} MiB in use)",
                    memory_view.acquired() / MIB
                );
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(())
            })?;
    }

    coordinator.close().await?;
    println!("done, {} MiB in use", memory.acquired() / MIB);
    Ok(())
}
