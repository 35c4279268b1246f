use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use docket_core::{DocketError, DocketResult, ErrorKind, TenantContext, TenantId, TenantScope};
use futures::FutureExt;
use tokio::sync::oneshot;

fn ctx(id: &str) -> TenantContext {
    TenantContext::new(TenantId::parse(id).unwrap())
}

fn current_tenant() -> String {
    TenantScope::tenant_id().unwrap().as_str().to_string()
}

fn kind(err: &anyhow::Error) -> Option<ErrorKind> {
    DocketError::kind_of(err)
}

#[tokio::test]
async fn current_fails_loudly_outside_any_scope() {
    let err = TenantScope::current().unwrap_err();
    assert_eq!(kind(&err), Some(ErrorKind::NoTenantContext));
    assert!(!TenantScope::is_open());
}

#[tokio::test]
async fn invalid_tenant_is_rejected_before_the_operation_starts() {
    let started = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&started);

    let err = TenantScope::open("   ", async move {
        flag.store(true, Ordering::SeqCst);
        Ok::<_, anyhow::Error>(())
    })
    .await
    .unwrap_err();

    assert_eq!(kind(&err), Some(ErrorKind::InvalidTenant));
    assert!(!started.load(Ordering::SeqCst));
}

#[tokio::test]
async fn open_runs_with_a_validated_tenant() {
    let seen = TenantScope::open("firm-9", async { Ok(current_tenant()) }).await.unwrap();
    assert_eq!(seen, "firm-9");
}

#[tokio::test]
async fn context_survives_suspension_points() {
    TenantScope::run(ctx("f1"), async {
        tokio::task::yield_now().await;
        assert_eq!(current_tenant(), "f1");
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(current_tenant(), "f1");
    })
    .await;

    assert!(TenantScope::current().is_err());
}

#[tokio::test]
async fn run_returns_what_the_operation_returns() {
    let value = TenantScope::run(ctx("f1"), async { 41 + 1 }).await;
    assert_eq!(value, 42);

    let err: DocketResult<()> = TenantScope::run(ctx("f1"), async {
        Err(DocketError::conflict("already exists").into_anyhow())
    })
    .await;
    assert_eq!(kind(&err.unwrap_err()), Some(ErrorKind::Conflict));
}

#[tokio::test]
async fn nested_scope_restores_outer_after_success_and_error() {
    let outer = ctx("outer");
    let outer_again = outer.clone();

    TenantScope::run(outer, async move {
        TenantScope::run(ctx("inner"), async {
            tokio::task::yield_now().await;
            assert_eq!(current_tenant(), "inner");
        })
        .await;
        assert_eq!(current_tenant(), "outer");

        let failed: DocketResult<()> = TenantScope::run(ctx("inner"), async {
            Err(DocketError::general_error("inner failure").into_anyhow())
        })
        .await;
        assert!(failed.is_err());
        assert_eq!(current_tenant(), "outer");

        // the very same value comes back, not a copy
        assert!(TenantScope::current().unwrap().same_as(&outer_again));
    })
    .await;
}

#[tokio::test]
async fn nested_scope_restores_outer_after_panic() {
    TenantScope::run(ctx("outer"), async {
        let caught = std::panic::AssertUnwindSafe(TenantScope::run(ctx("inner"), async {
            panic!("handler bug");
        }))
        .catch_unwind()
        .await;

        assert!(caught.is_err());
        assert_eq!(current_tenant(), "outer");
    })
    .await;
}

#[tokio::test(flavor = "current_thread")]
async fn interleaved_units_of_work_see_only_their_own_context() {
    let (a_suspended_tx, a_suspended_rx) = oneshot::channel::<()>();
    let (b_done_tx, b_done_rx) = oneshot::channel::<()>();

    let a = TenantScope::run(ctx("firm-a"), async move {
        assert_eq!(current_tenant(), "firm-a");
        a_suspended_tx.send(()).unwrap();
        // B runs entirely while A is parked here
        b_done_rx.await.unwrap();
        current_tenant()
    });

    let b = TenantScope::run(ctx("firm-b"), async move {
        a_suspended_rx.await.unwrap();
        let seen = current_tenant();
        b_done_tx.send(()).unwrap();
        seen
    });

    let (seen_a, seen_b) = tokio::join!(a, b);
    assert_eq!(seen_a, "firm-a");
    assert_eq!(seen_b, "firm-b");
}

#[tokio::test(flavor = "current_thread")]
async fn interleaved_tasks_on_one_thread_do_not_cross_talk() {
    let mut handles = Vec::new();
    for i in 0..16 {
        let tenant = format!("firm-{i}");
        handles.push(tokio::spawn(TenantScope::run(ctx(&tenant), async move {
            for _ in 0..8 {
                tokio::task::yield_now().await;
                assert_eq!(current_tenant(), tenant);
            }
        })));
    }
    for h in handles {
        h.await.unwrap();
    }
}

#[tokio::test]
async fn bare_spawn_does_not_inherit_but_scoped_spawn_does() {
    TenantScope::run(ctx("f1"), async {
        let bare = tokio::spawn(async { TenantScope::current().map(|_| ()) })
            .await
            .unwrap();
        assert_eq!(kind(&bare.unwrap_err()), Some(ErrorKind::NoTenantContext));

        let carried = TenantScope::spawn(async { current_tenant() })
            .unwrap()
            .await
            .unwrap();
        assert_eq!(carried, "f1");
    })
    .await;

    let err = TenantScope::spawn(async {}).unwrap_err();
    assert_eq!(kind(&err), Some(ErrorKind::NoTenantContext));
}

#[tokio::test]
async fn fan_out_sub_tasks_each_keep_their_own_scope() {
    TenantScope::run(ctx("parent"), async {
        let children = (0..4).map(|i| {
            TenantScope::run(ctx(&format!("child-{i}")), async move {
                tokio::time::sleep(Duration::from_millis(4 - i)).await;
                current_tenant()
            })
        });
        let seen = futures::future::join_all(children).await;
        assert_eq!(seen, ["child-0", "child-1", "child-2", "child-3"]);

        let inherited = futures::future::join_all(
            (0..3).map(|_| TenantScope::bind(async { current_tenant() }).unwrap()),
        )
        .await;
        assert!(inherited.iter().all(|t| t == "parent"));

        assert_eq!(current_tenant(), "parent");
    })
    .await;
}

#[tokio::test]
async fn abandoned_scope_is_closed() {
    let timed_out = tokio::time::timeout(
        Duration::from_millis(10),
        TenantScope::run(ctx("slow"), std::future::pending::<()>()),
    )
    .await;
    assert!(timed_out.is_err());
    assert!(TenantScope::current().is_err());

    let handle = tokio::spawn(TenantScope::run(ctx("aborted"), async {
        tokio::time::sleep(Duration::from_secs(60)).await;
    }));
    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());
    assert!(TenantScope::current().is_err());
}

#[test]
fn sync_scope_for_fixtures() {
    let seen = TenantScope::run_sync(ctx("seed"), current_tenant);
    assert_eq!(seen, "seed");
    assert!(TenantScope::current().is_err());
}
