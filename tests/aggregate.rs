mod common;

use std::time::{Duration, Instant};

use taskcoord::{AggregatingCoordinator, Config, Coordinator, TaskConfig, TaskError};

use common::sleep_ms;

async fn after(ms: u64, value: bool) -> Result<bool, TaskError> {
    sleep_ms(ms).await;
    Ok(value)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn any_short_circuits_on_the_first_true() {
    let any = AggregatingCoordinator::any(Coordinator::new(Config::default()).unwrap());
    let started = Instant::now();

    let slow = any.aggregate(TaskConfig::new().name("slow"), after(2000, false)).unwrap();
    let fast = any.aggregate(TaskConfig::new().name("fast"), after(100, true)).unwrap();

    assert!(any.close().await.unwrap());
    assert!(started.elapsed() < Duration::from_millis(1000));
    assert_eq!(fast.get().await, Ok(true));
    assert!(slow.has_stopped());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn all_short_circuits_on_the_first_false() {
    let all = AggregatingCoordinator::all(Coordinator::new(Config::default()).unwrap());
    let started = Instant::now();

    let slow = all.aggregate(TaskConfig::new(), after(2000, true)).unwrap();
    all.aggregate(TaskConfig::new(), after(50, false)).unwrap();

    assert!(!all.close().await.unwrap());
    assert!(started.elapsed() < Duration::from_millis(1000));
    assert!(slow.has_stopped());
}

#[tokio::test]
async fn all_waits_for_every_task_when_none_is_false() {
    let all = AggregatingCoordinator::all(Coordinator::new(Config::default()).unwrap());
    let handles: Vec<_> = (0..5)
        .map(|i| all.aggregate(TaskConfig::new(), after(i * 5, true)).unwrap())
        .collect();

    assert!(all.close().await.unwrap());
    assert!(handles.iter().all(|h| h.has_completed()));
}

#[tokio::test]
async fn any_is_false_when_no_task_is_true() {
    let any = AggregatingCoordinator::any(Coordinator::new(Config::default()).unwrap());
    for i in 0..3 {
        any.aggregate(TaskConfig::new(), after(i, false)).unwrap();
    }
    assert!(!any.value());
    assert!(!any.close().await.unwrap());
}

#[tokio::test]
async fn failing_aggregated_task_is_reported_by_close() {
    let any = AggregatingCoordinator::any(Coordinator::new(Config::default()).unwrap());
    any.aggregate(TaskConfig::new().name("broken"), async {
        Err(TaskError::fail("no answer"))
    })
    .unwrap();

    let err = any.close().await.unwrap_err();
    assert_eq!(err.as_label(), "task_failed");
}

#[tokio::test]
async fn plain_tasks_can_run_beside_aggregated_ones() {
    let any = AggregatingCoordinator::any(Coordinator::new(Config::default()).unwrap());
    let side = any
        .coordinator()
        .execute(TaskConfig::new(), async { Ok::<_, TaskError>(42u32) })
        .unwrap();
    any.aggregate(TaskConfig::new().dependency(&side), after(1, true))
        .unwrap();

    assert!(any.close().await.unwrap());
    assert_eq!(side.get().await, Ok(42));
}
