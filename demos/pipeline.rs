//! # Example: Dependency Pipeline
//!
//! Three stages wired by dependencies: two downloads on the io pool, a parse step that
//! needs both, and a report that needs the parse. A completion listener prints the
//! report once it lands.
//!
//! ```text
//! fetch-a ──┐
//!           ├──► parse ──► report
//! fetch-b ──┘
//! ```
//!
//! Run with: `RUST_LOG=taskcoord=debug cargo run --example pipeline`

use std::{sync::Arc, time::Duration};

use taskcoord::{Config, Coordinator, LogWriter, Subscribe, TaskCategory, TaskConfig, TaskError};
use tracing_subscriber::EnvFilter;

async fn fetch(source: &'static str, ms: u64) -> Result<Vec<u32>, TaskError> {
    println!("[{source}] fetching ({ms}ms)");
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Ok((1..=5).map(|n| n * ms as u32).collect())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let coordinator = Coordinator::builder(Config::default())
        .with_subscribers(vec![Arc::new(LogWriter) as Arc<dyn Subscribe>])
        .build()?;

    let total = coordinator
        .scope(|c| async move {
            let io = || TaskConfig::new().category(TaskCategory::Io);
            let a = c.execute(io().name("fetch-a"), fetch("a", 150))?;
            let b = c.execute(io().name("fetch-b"), fetch("b", 80))?;

            let parse = {
                let (a, b) = (a.clone(), b.clone());
                c.configure()
                    .name("parse")
                    .dependencies([a.handle(), b.handle()])
                    .execute(async move {
                        let mut all = a.get().await?;
                        all.extend(b.get().await?);
                        Ok(all)
                    })?
            };

            let report = {
                let parse = parse.clone();
                c.configure()
                    .name("report")
                    .dependency(&parse)
                    .execute(async move {
                        let values = parse.get().await?;
                        Ok(values.iter().sum::<u32>())
                    })?
            };
            report.on_completion(|| println!("[report] ready"));

            Ok::<_, anyhow::Error>(report)
        })
        .await?
        .get()
        .await?;

    println!("total = {total}");
    Ok(())
}
