mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use taskcoord::{
    Config, Coordinator, EventKind, InternalError, RuntimeError, Subscribe, TaskConfig, TaskError,
};

use common::{Faulty, Probe, sleep_ms};

#[tokio::test]
async fn first_failure_stops_everything_and_is_thrown_once() {
    let probe = Probe::new();
    let coordinator = Coordinator::builder(Config::default())
        .with_subscribers(vec![probe.clone() as Arc<dyn Subscribe>])
        .build()
        .unwrap();

    let slow = coordinator
        .execute(TaskConfig::new().name("slow"), async {
            sleep_ms(10_000).await;
            Err::<(), _>(TaskError::fail("too late"))
        })
        .unwrap();
    let failing = coordinator
        .execute(TaskConfig::new().name("failing"), async {
            sleep_ms(10).await;
            Err::<(), _>(TaskError::fail("first"))
        })
        .unwrap();

    let started = Instant::now();
    let err = coordinator.close().await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(
        err,
        RuntimeError::Task {
            task: "failing".into(),
            error: TaskError::fail("first"),
        }
    );
    assert!(!err.is_internal());
    assert!(failing.has_failed());
    assert!(slow.has_stopped());

    assert_eq!(coordinator.check_exception(), Ok(()));
    assert_eq!(probe.count(EventKind::StopRequested), 1);
    assert_eq!(probe.count(EventKind::Closed), 1);
}

#[tokio::test]
async fn check_exception_before_close_consumes_the_failure() {
    let coordinator = Coordinator::new(Config::default()).unwrap();
    let failing = coordinator
        .execute(TaskConfig::new().name("failing"), async {
            Err::<u8, _>(TaskError::fail("nope"))
        })
        .unwrap();

    assert_eq!(failing.get().await, Err(TaskError::fail("nope")));
    assert!(coordinator.check_exception().is_err());
    assert_eq!(coordinator.check_exception(), Ok(()));
    assert_eq!(coordinator.close().await, Ok(()));
}

#[tokio::test]
async fn panicking_body_is_a_task_failure() {
    let coordinator = Coordinator::new(Config::default()).unwrap();
    let bomb = coordinator
        .execute(TaskConfig::new().name("bomb"), async {
            if true {
                panic!("kaboom");
            }
            Ok(())
        })
        .unwrap();

    let err = coordinator.close().await.unwrap_err();
    assert_eq!(
        err,
        RuntimeError::Task {
            task: "bomb".into(),
            error: TaskError::Panicked {
                message: "kaboom".into()
            },
        }
    );
    assert!(bomb.has_failed());
}

#[tokio::test]
async fn panicking_listener_supersedes_the_task_failure() {
    let coordinator = Coordinator::new(Config::default()).unwrap();
    let failing = coordinator
        .execute(TaskConfig::new().name("failing"), async {
            sleep_ms(20).await;
            Err::<(), _>(TaskError::fail("external"))
        })
        .unwrap();
    failing.on_exception(|_| panic!("listener broke"));

    let err = coordinator.close().await.unwrap_err();
    assert!(err.is_internal());
    assert_eq!(
        err,
        RuntimeError::Internal(InternalError::ListenerPanicked {
            task: "failing".into(),
            message: "listener broke".into(),
        })
    );
    // the task keeps its own outcome
    assert_eq!(failing.exception(), Some(TaskError::fail("external")));
}

#[tokio::test]
async fn internal_error_after_the_failure_was_thrown_is_thrown_again() {
    let coordinator = Coordinator::new(Config::default()).unwrap();
    let failing = coordinator
        .execute(TaskConfig::new().name("failing"), async {
            Err::<(), _>(TaskError::fail("external"))
        })
        .unwrap();
    let _ = failing.get().await;
    assert!(coordinator.check_exception().is_err());

    // late listener on a failed task runs right away
    failing.on_exception(|_| panic!("late listener broke"));
    let err = coordinator.close().await.unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Internal(InternalError::ListenerPanicked { .. })
    ));
}

#[tokio::test]
async fn panicking_subscriber_is_an_internal_error() {
    let coordinator = Coordinator::builder(Config::default())
        .with_subscribers(vec![Arc::new(Faulty(EventKind::TaskCompleted)) as Arc<dyn Subscribe>])
        .build()
        .unwrap();

    let task = coordinator
        .execute(TaskConfig::new().name("fine"), async { Ok(1u8) })
        .unwrap();

    let err = coordinator.close().await.unwrap_err();
    match err {
        RuntimeError::Internal(InternalError::SubscriberPanicked { subscriber, .. }) => {
            assert_eq!(subscriber, "faulty");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(task.has_completed());
}

#[tokio::test]
async fn tasks_submitted_after_a_failure_still_run() {
    let coordinator = Coordinator::new(Config::default()).unwrap();
    let failing = coordinator
        .execute(TaskConfig::new(), async { Err::<(), _>(TaskError::fail("x")) })
        .unwrap();
    let _ = failing.get().await;

    let later = coordinator
        .execute(TaskConfig::new(), async { Ok("ran") })
        .unwrap();
    assert_eq!(later.get().await, Ok("ran"));
    assert!(coordinator.close().await.is_err());
}

#[tokio::test]
async fn scope_prefers_the_body_error() {
    let coordinator = Coordinator::new(Config::default()).unwrap();
    let started = Instant::now();

    let out: anyhow::Result<()> = coordinator
        .clone()
        .scope(|c| async move {
            c.execute(TaskConfig::new().name("long"), async {
                sleep_ms(10_000).await;
                Ok(())
            })?;
            c.execute(TaskConfig::new().name("failing"), async {
                Err::<(), _>(TaskError::fail("inner"))
            })?;
            Err(anyhow::anyhow!("caller gave up"))
        })
        .await;

    assert_eq!(out.unwrap_err().to_string(), "caller gave up");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(coordinator.is_closed());
}

#[tokio::test]
async fn scope_surfaces_the_recorded_failure() {
    let coordinator = Coordinator::new(Config::default()).unwrap();

    let out: anyhow::Result<u32> = coordinator
        .scope(|c| async move {
            c.execute(TaskConfig::new().name("failing"), async {
                Err::<(), _>(TaskError::fail("inner"))
            })?;
            Ok(7)
        })
        .await;

    let err = out.unwrap_err();
    let runtime = err.downcast_ref::<RuntimeError>().unwrap();
    assert_eq!(runtime.as_label(), "task_failed");
}
