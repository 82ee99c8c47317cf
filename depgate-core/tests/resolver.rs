//! End-to-end behaviour of the dependency gate through the public API.
//!
//! Timed scenarios run with a paused tokio clock, so elapsed times are exact
//! virtual milliseconds.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use depgate_common::{
    Abandoned, Config, Dependency, GateError, Instance, InstanceRegistry, Outcome, Reason,
    Result, Settlement, Token, WaitCondition,
};
use depgate_core::DependencyResolver;
use tokio::time::{sleep, Instant};

fn init_logging() {
    let config = Config {
        log_filter: "depgate_core=debug".to_string(),
        ansi: false,
        ..Config::default()
    };
    let _ = depgate_common::logging::init(&config);
}

#[derive(Clone, Default)]
struct Counter(Arc<AtomicUsize>);

impl Counter {
    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

fn succeeds_after(ms: u64, cancelled: &Counter) -> WaitCondition {
    let cancelled = cancelled.clone();
    WaitCondition::new(async move {
        sleep(Duration::from_millis(ms)).await;
        Settlement::Satisfied
    })
    .on_cancel(move || cancelled.bump())
}

fn fails_after(ms: u64, cause: &str, cancelled: &Counter) -> WaitCondition {
    let cancelled = cancelled.clone();
    let cause = cause.to_string();
    WaitCondition::new(async move {
        sleep(Duration::from_millis(ms)).await;
        Settlement::failed(Reason(cause))
    })
    .on_cancel(move || cancelled.bump())
}

/// An action dependency that counts how often its check runs.
fn counted(name: &str, verdict: bool, calls: &Counter) -> Dependency {
    let calls = calls.clone();
    Dependency::action(name, move || {
        calls.bump();
        verdict
    })
}

struct SessionStore {
    signed_in: bool,
}

struct CatalogStore {
    loaded: bool,
}

#[tokio::test]
async fn all_synchronous_true_succeeds_without_async_work() {
    init_logging();
    let calls = Counter::default();
    let resolver = DependencyResolver::standalone();

    let result = resolver
        .resolve(vec![
            counted("a", true, &calls),
            counted("b", true, &calls),
            counted("c", true, &calls),
        ])
        .await;

    assert!(result.is_ok());
    assert_eq!(calls.get(), 3);
}

#[tokio::test]
async fn empty_dependency_list_succeeds() {
    assert!(DependencyResolver::standalone().resolve(Vec::new()).await.is_ok());
}

#[tokio::test]
async fn synchronous_false_fails_fast() {
    let before = Counter::default();
    let after = Counter::default();

    let err = DependencyResolver::standalone()
        .resolve(vec![
            counted("first", true, &before),
            counted("gate", false, &before),
            counted("third", true, &after),
            counted("fourth", true, &after),
        ])
        .await
        .unwrap_err();

    match err {
        GateError::DependencyUnsatisfied { index, dependency } => {
            assert_eq!(index, 1);
            assert_eq!(dependency, "gate");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(before.get(), 2);
    assert_eq!(after.get(), 0);
}

#[tokio::test]
async fn invalid_outcome_type_fails_fast() {
    let after = Counter::default();

    let err = DependencyResolver::standalone()
        .resolve(vec![
            Dependency::action("ok", || true),
            Dependency::action_untyped("legacy-check", || "ready"),
            counted("never", true, &after),
        ])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GateError::InvalidOutcomeType {
            index: 1,
            type_name: "&str",
            ..
        }
    ));
    assert_eq!(err.legacy_message(), Some("Invalid return type from dependency"));
    assert_eq!(after.get(), 0);
}

#[tokio::test]
async fn untyped_store_check_reports_invalid_outcome_type() {
    let mut registry = InstanceRegistry::new();
    registry.register(SessionStore { signed_in: true });
    let after = Counter::default();

    let err = DependencyResolver::new(Arc::new(registry))
        .resolve(vec![
            Dependency::action("ok", || true),
            Dependency::store_untyped(|session: &SessionStore| {
                if session.signed_in {
                    7i32
                } else {
                    0
                }
            }),
            counted("never", true, &after),
        ])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GateError::InvalidOutcomeType {
            index: 1,
            ref dependency,
            type_name: "i32",
        } if dependency == "SessionStore"
    ));
    assert_eq!(after.get(), 0);
}

#[tokio::test]
async fn synchronous_failure_never_starts_collected_async_work() {
    let polled = Counter::default();
    let cancelled = Counter::default();
    let polled_in_condition = polled.clone();
    let hook = cancelled.clone();

    let err = DependencyResolver::standalone()
        .resolve(vec![
            Dependency::action("warm-cache", move || {
                WaitCondition::new(async move {
                    polled_in_condition.bump();
                    Settlement::Satisfied
                })
                .on_cancel(move || hook.bump())
            }),
            Dependency::action("quota", || false),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, GateError::DependencyUnsatisfied { index: 1, .. }));
    assert_eq!(polled.get(), 0);
    assert_eq!(cancelled.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn mixed_sync_and_async_succeeds_after_slowest() {
    init_logging();
    let cancelled = Counter::default();
    let start = Instant::now();

    let fast = succeeds_after(5, &cancelled);
    let slow = succeeds_after(10, &cancelled);
    let result = DependencyResolver::standalone()
        .resolve(vec![
            Dependency::action("sync", || true),
            Dependency::action("slow", move || slow),
            Dependency::action("fast", move || fast),
        ])
        .await;

    assert!(result.is_ok());
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(10), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(15), "{elapsed:?}");
    assert_eq!(cancelled.get(), 0);
}

#[tokio::test(start_paused = true)]
async fn any_interleaving_of_successes_succeeds_once() {
    let cancelled = Counter::default();
    let start = Instant::now();

    let dependencies = [30, 10, 20, 10]
        .into_iter()
        .enumerate()
        .map(|(i, ms)| {
            let condition = succeeds_after(ms, &cancelled);
            Dependency::action(format!("async-{i}"), move || condition)
        })
        .collect();

    assert!(DependencyResolver::standalone()
        .resolve(dependencies)
        .await
        .is_ok());
    assert!(start.elapsed() >= Duration::from_millis(30));
    assert_eq!(cancelled.get(), 0);
}

#[tokio::test(start_paused = true)]
async fn async_failure_wins_and_cancels_the_rest() {
    init_logging();
    let failing_cancelled = Counter::default();
    let slow_cancelled = Counter::default();
    let start = Instant::now();

    let failing = fails_after(5, "X", &failing_cancelled);
    let slow = succeeds_after(50, &slow_cancelled);
    let err = DependencyResolver::standalone()
        .resolve(vec![
            Dependency::action("failing", move || failing),
            Dependency::action("slow", move || slow),
        ])
        .await
        .unwrap_err();

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(5), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(50), "{elapsed:?}");

    let cause = err.cause().expect("async failure carries its cause");
    assert_eq!(cause.downcast_ref::<Reason>(), Some(&Reason::from("X")));
    assert_eq!(slow_cancelled.get(), 1);
    assert_eq!(failing_cancelled.get(), 0);
}

#[tokio::test]
async fn completed_without_value_is_success() {
    let (settler, condition) = WaitCondition::channel();
    assert!(settler.complete());

    let result = DependencyResolver::standalone()
        .resolve(vec![Dependency::action("flush", move || condition)])
        .await;
    assert!(result.is_ok());
}

#[tokio::test(start_paused = true)]
async fn early_completion_without_value_still_waits_for_the_rest() {
    let cancelled = Counter::default();
    let (settler, condition) = WaitCondition::channel();
    assert!(settler.complete());

    let start = Instant::now();
    let err = DependencyResolver::standalone()
        .resolve(vec![
            Dependency::action("flush", move || condition),
            Dependency::action("catalog", {
                let cancelled = cancelled.clone();
                move || fails_after(30, "catalog offline", &cancelled)
            }),
        ])
        .await
        .unwrap_err();

    assert!(start.elapsed() >= Duration::from_millis(30));
    assert!(matches!(err, GateError::AsyncDependencyFailed(_)));
    assert_eq!(cancelled.get(), 0);
}

#[tokio::test]
async fn abandoned_wait_condition_fails() {
    let (settler, condition) = WaitCondition::channel();
    drop(settler);

    let err = DependencyResolver::standalone()
        .resolve(vec![Dependency::action("orphan", move || condition)])
        .await
        .unwrap_err();
    let cause = err.cause().unwrap();
    assert!(cause.downcast_ref::<Abandoned>().is_some());
}

#[tokio::test(start_paused = true)]
async fn cancelling_releases_pending_and_stays_silent() {
    let cancelled = Counter::default();
    let successes = Counter::default();
    let errors = Counter::default();

    let first = succeeds_after(20, &cancelled);
    let second = succeeds_after(40, &cancelled);
    let on_success = successes.clone();
    let on_error = errors.clone();

    let handle = DependencyResolver::standalone()
        .resolve(vec![
            Dependency::action("first", move || first),
            Dependency::action("second", move || second),
        ])
        .subscribe(move || on_success.bump(), move |_| on_error.bump());

    sleep(Duration::from_millis(5)).await;
    assert!(!handle.is_terminated());
    handle.cancel().await;

    assert_eq!(cancelled.get(), 2);
    sleep(Duration::from_millis(100)).await;
    assert_eq!(successes.get(), 0);
    assert_eq!(errors.get(), 0);
}

#[tokio::test]
async fn cancel_before_start_is_a_no_op() {
    let calls = Counter::default();
    let successes = Counter::default();
    let on_success = successes.clone();

    let handle = DependencyResolver::standalone()
        .resolve(vec![counted("never", true, &calls)])
        .subscribe(move || on_success.bump(), |_| {});
    // Current-thread runtime: the spawned task has not been polled yet.
    handle.cancel().await;

    assert_eq!(calls.get(), 0);
    assert_eq!(successes.get(), 0);
}

#[tokio::test]
async fn cancel_after_terminal_signal_is_a_no_op() {
    let successes = Counter::default();
    let on_success = successes.clone();

    let handle = DependencyResolver::standalone()
        .resolve(vec![Dependency::action("ready", || true)])
        .subscribe(move || on_success.bump(), |_| {});
    while !handle.is_terminated() {
        tokio::task::yield_now().await;
    }
    handle.cancel().await;

    assert_eq!(successes.get(), 1);
}

#[tokio::test]
async fn straggling_settlements_are_ignored() {
    let (first, first_condition) = WaitCondition::channel();
    let (mut second, second_condition) = WaitCondition::channel();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let successes = Counter::default();
    let on_error = Arc::clone(&errors);
    let on_success = successes.clone();

    let handle = DependencyResolver::standalone()
        .resolve(vec![
            Dependency::action("first", move || first_condition),
            Dependency::action("second", move || second_condition),
        ])
        .subscribe(
            move || on_success.bump(),
            move |e| on_error.lock().unwrap().push(e.to_string()),
        );

    assert!(first.fail(Reason::from("replica lagging")));
    second.released().await;
    assert!(second.is_released());
    assert!(!second.succeed());
    handle.wait().await;

    assert_eq!(
        *errors.lock().unwrap(),
        vec!["Async Dependency Failed: replica lagging".to_string()]
    );
    assert_eq!(successes.get(), 0);
}

#[tokio::test]
async fn store_dependencies_look_up_instances_in_order() {
    let looked_up = Arc::new(Mutex::new(Vec::new()));
    let looked_up_in_lookup = Arc::clone(&looked_up);
    let lookup = move |token: &Token| -> Result<Instance> {
        looked_up_in_lookup
            .lock()
            .unwrap()
            .push(token.short_name());
        if token.id() == Token::of::<SessionStore>().id() {
            Ok(Instance::new(SessionStore { signed_in: true }))
        } else {
            Ok(Instance::new(CatalogStore { loaded: false }))
        }
    };

    let err = DependencyResolver::new(Arc::new(lookup))
        .resolve(vec![
            Dependency::store(|session: &SessionStore| session.signed_in),
            Dependency::action("between", || true),
            Dependency::store(|catalog: &CatalogStore| catalog.loaded),
            Dependency::store(|session: &SessionStore| session.signed_in),
        ])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GateError::DependencyUnsatisfied { index: 2, ref dependency } if dependency == "CatalogStore"
    ));
    assert_eq!(
        *looked_up.lock().unwrap(),
        vec!["SessionStore", "CatalogStore"]
    );
}

#[tokio::test]
async fn store_dependency_can_wait_on_its_instance() {
    let (settler, condition) = WaitCondition::channel();
    let mut registry = InstanceRegistry::new();
    registry.register(SessionStore { signed_in: false });

    let resolution = DependencyResolver::new(Arc::new(registry)).resolve(vec![Dependency::store(
        move |session: &SessionStore| -> Outcome {
            if session.signed_in {
                Outcome::Ready(true)
            } else {
                condition.into()
            }
        },
    )]);
    assert!(settler.succeed());

    assert!(resolution.await.is_ok());
}

#[tokio::test]
async fn lookup_failure_is_terminal() {
    let after = Counter::default();

    let err = DependencyResolver::standalone()
        .resolve(vec![
            Dependency::store(|session: &SessionStore| session.signed_in),
            counted("after", true, &after),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, GateError::InstanceNotFound(_)));
    assert_eq!(after.get(), 0);
}
