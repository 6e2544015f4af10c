mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use taskcoord::{
    Config, Coordinator, CountableResource, EventKind, InternalError, RuntimeError, Subscribe,
    TaskConfig,
};

use common::{Probe, sleep_ms};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn countable_resource_is_never_oversubscribed() {
    const CAPACITY: u64 = 10;
    let coordinator = Coordinator::new(Config::default()).unwrap();
    let memory = Arc::new(CountableResource::new("memory", CAPACITY));
    let in_use = Arc::new(AtomicU64::new(0));
    let peak = Arc::new(AtomicU64::new(0));

    let plan: Vec<(u64, u64)> = {
        let mut rng = rand::rng();
        (0..60)
            .map(|_| (rng.random_range(1..=5), rng.random_range(1..=4)))
            .collect()
    };

    let mut handles = Vec::new();
    for (share, ms) in plan {
        let in_use = Arc::clone(&in_use);
        let peak = Arc::clone(&peak);
        let handle = coordinator
            .configure()
            .required_resource(Arc::clone(&memory), share)
            .execute(async move {
                let now = in_use.fetch_add(share, Ordering::SeqCst) + share;
                peak.fetch_max(now, Ordering::SeqCst);
                sleep_ms(ms).await;
                in_use.fetch_sub(share, Ordering::SeqCst);
                Ok(share)
            })
            .unwrap();
        handles.push(handle);
    }

    coordinator.close().await.unwrap();
    assert!(peak.load(Ordering::SeqCst) <= CAPACITY);
    assert!(handles.iter().all(|h| h.has_completed()));
    assert_eq!(memory.acquired(), 0);
    assert_eq!(memory.pending(), 0);
    assert_eq!(memory.waiting(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn task_waits_on_hold_until_the_resource_is_released() {
    let probe = Probe::new();
    let coordinator = Coordinator::builder(Config::default())
        .with_subscribers(vec![probe.clone() as Arc<dyn Subscribe>])
        .build()
        .unwrap();
    let slot = Arc::new(CountableResource::new("slot", 1));

    let first = coordinator
        .configure()
        .name("first")
        .required_resource(Arc::clone(&slot), 1u64)
        .execute(async {
            sleep_ms(50).await;
            Ok(())
        })
        .unwrap();
    let second = coordinator
        .configure()
        .name("second")
        .required_resource(Arc::clone(&slot), 1u64)
        .execute(async {
            sleep_ms(50).await;
            Ok(())
        })
        .unwrap();

    coordinator.close().await.unwrap();
    assert!(first.has_completed());
    assert!(second.has_completed());
    assert_eq!(probe.count(EventKind::TaskOnHold), 1);
    assert_eq!(slot.available(), 1);

    let held = probe
        .events()
        .into_iter()
        .find(|e| e.kind == EventKind::TaskOnHold)
        .unwrap();
    assert_eq!(held.reason.as_deref(), Some("slot"));
}

#[tokio::test]
async fn pending_shares_are_counted_until_the_task_starts() {
    let coordinator = Coordinator::new(Config::default()).unwrap();
    let memory = Arc::new(CountableResource::new("memory", 100));

    let gate = coordinator
        .execute(TaskConfig::new().name("gate"), async {
            sleep_ms(30).await;
            Ok(())
        })
        .unwrap();
    let waiting = coordinator
        .configure()
        .dependency(&gate)
        .required_resource(Arc::clone(&memory), 40u64)
        .execute(async { Ok(()) })
        .unwrap();

    assert_eq!(memory.pending(), 40);
    assert_eq!(memory.acquired(), 0);

    coordinator.close().await.unwrap();
    assert!(waiting.has_completed());
    assert_eq!(memory.pending(), 0);
    assert_eq!(memory.acquired(), 0);
}

#[tokio::test]
async fn stopped_task_withdraws_its_pending_share() {
    let coordinator = Coordinator::new(Config::default()).unwrap();
    let memory = Arc::new(CountableResource::new("memory", 100));
    coordinator.permit_task_submission(false);

    let held = coordinator
        .configure()
        .required_resource(Arc::clone(&memory), 25u64)
        .execute(async { Ok(()) })
        .unwrap();
    assert_eq!(memory.pending(), 25);

    held.stop();
    assert_eq!(memory.pending(), 0);
    coordinator.close().await.unwrap();
}

#[tokio::test]
async fn rejection_while_nothing_is_held_is_a_protocol_violation() {
    let coordinator = Coordinator::new(Config::default()).unwrap();
    let tiny = Arc::new(CountableResource::new("tiny", 1));

    let greedy = coordinator
        .configure()
        .name("greedy")
        .required_resource(Arc::clone(&tiny), 2u64)
        .execute(async { Ok(()) })
        .unwrap();

    let err = coordinator.close().await.unwrap_err();
    assert_eq!(
        err,
        RuntimeError::Internal(InternalError::ResourceProtocol {
            task: "greedy".into(),
            resource: "tiny".into(),
        })
    );
    assert!(greedy.has_stopped());
    assert_eq!(tiny.pending(), 0);
    assert_eq!(tiny.waiting(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn tasks_needing_several_resources_do_not_deadlock() {
    let coordinator = Coordinator::new(Config::default()).unwrap();
    let cpu = Arc::new(CountableResource::new("cpu", 2));
    let memory = Arc::new(CountableResource::new("memory", 2));

    let handles: Vec<_> = (0..20)
        .map(|i| {
            // declared in alternating order
            let (first, second) = if i % 2 == 0 {
                (Arc::clone(&cpu), Arc::clone(&memory))
            } else {
                (Arc::clone(&memory), Arc::clone(&cpu))
            };
            coordinator
                .configure()
                .required_resource(first, 1u64)
                .required_resource(second, 1u64)
                .execute(async {
                    sleep_ms(2).await;
                    Ok(())
                })
                .unwrap()
        })
        .collect();

    coordinator.close().await.unwrap();
    assert!(handles.iter().all(|h| h.has_completed()));
    assert_eq!(cpu.acquired(), 0);
    assert_eq!(memory.acquired(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shares_summing_past_u64_max_wait_instead_of_panicking() {
    let coordinator = Coordinator::new(Config::default()).unwrap();
    let bytes = Arc::new(CountableResource::new("bytes", u64::MAX));
    let half = u64::MAX / 2 + 1;

    let handles: Vec<_> = ["a", "b"]
        .into_iter()
        .map(|name| {
            coordinator
                .configure()
                .name(name)
                .required_resource(Arc::clone(&bytes), half)
                .execute(async {
                    sleep_ms(10).await;
                    Ok(())
                })
                .unwrap()
        })
        .collect();

    coordinator.close().await.unwrap();
    assert!(handles.iter().all(|h| h.has_completed()));
    assert_eq!(bytes.pending(), 0);
    assert_eq!(bytes.acquired(), 0);
}
