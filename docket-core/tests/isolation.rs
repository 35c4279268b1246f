use std::sync::Arc;

use docket_core::{
    for_each_active_tenant, scoped_entity, DocketError, ErrorKind, MemoryDirectory, MembershipRole,
    Plan, Query, RecordId, ScopedRepository, Tenant, TenantContext, TenantId, TenantMembership,
    TenantScope, UserId,
};
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct Client {
    id: RecordId,
    tenant_id: Option<TenantId>,
    name: String,
    retainer_cents: i64,
}

scoped_entity!(Client, "client");

#[derive(Debug, Clone, PartialEq)]
struct Case {
    id: RecordId,
    tenant_id: Option<TenantId>,
    title: String,
}

scoped_entity!(Case, "case");

#[derive(Debug, Clone, PartialEq)]
struct Deadline {
    id: RecordId,
    tenant_id: Option<TenantId>,
    case_id: RecordId,
    label: String,
}

scoped_entity!(Deadline, "deadline");

fn tid(id: &str) -> TenantId {
    TenantId::parse(id).unwrap()
}

fn ctx(id: &str) -> TenantContext {
    TenantContext::new(tid(id))
}

fn client(name: &str) -> Client {
    Client {
        id: RecordId::default(),
        tenant_id: None,
        name: name.to_string(),
        retainer_cents: 0,
    }
}

fn kind(err: &anyhow::Error) -> Option<ErrorKind> {
    DocketError::kind_of(err)
}

#[tokio::test]
async fn alice_is_only_visible_to_her_own_firm() {
    let clients = ScopedRepository::<Client>::in_memory();

    let alice = TenantScope::run(ctx("F1"), clients.create(client("Alice")))
        .await
        .unwrap();

    let f2_list = TenantScope::run(ctx("F2"), clients.find(Query::all())).await.unwrap();
    assert!(f2_list.is_empty());

    let err = TenantScope::run(ctx("F2"), clients.get(&alice.id)).await.unwrap_err();
    assert_eq!(kind(&err), Some(ErrorKind::NotFound));

    let found = TenantScope::run(ctx("F1"), clients.get(&alice.id)).await.unwrap();
    assert_eq!(found.name, "Alice");

    TenantScope::run(ctx("F2"), clients.create(client("Bob"))).await.unwrap();
    let everyone = clients
        .without_tenant_scope("isolation test positive control")
        .find(Query::all())
        .await
        .unwrap();
    let tenants: Vec<_> = everyone
        .iter()
        .map(|c| c.tenant_id.as_ref().unwrap().as_str())
        .collect();
    assert_eq!(tenants, ["F1", "F2"]);
}

#[tokio::test]
async fn create_stamps_the_ambient_tenant_over_the_payload() {
    let clients = ScopedRepository::<Client>::in_memory();

    let mut spoofed = client("Mallory");
    spoofed.tenant_id = Some(tid("F2"));
    spoofed.id = RecordId::from("client:chosen-by-caller");

    let created = TenantScope::run(ctx("F1"), clients.create(spoofed)).await.unwrap();
    assert_eq!(created.tenant_id, Some(tid("F1")));
    assert_ne!(created.id.as_str(), "client:chosen-by-caller");

    let f2_count = TenantScope::run(ctx("F2"), clients.count(Query::all())).await.unwrap();
    assert_eq!(f2_count, 0);
}

#[tokio::test]
async fn foreign_rows_look_exactly_like_missing_rows() {
    let clients = ScopedRepository::<Client>::in_memory();
    let alice = TenantScope::run(ctx("F1"), clients.create(client("Alice"))).await.unwrap();
    let ghost = RecordId::from("client:does-not-exist");

    TenantScope::run(ctx("F2"), async {
        for id in [&alice.id, &ghost] {
            let err = clients.get(id).await.unwrap_err();
            let docket = DocketError::from_anyhow(&err).unwrap();
            assert_eq!(docket.kind, ErrorKind::NotFound);
            assert_eq!(docket.message, format!("client not found: {id}"));

            let err = clients.update(id, client("Renamed")).await.unwrap_err();
            assert_eq!(kind(&err), Some(ErrorKind::NotFound));

            let err = clients.patch(id, |c| c.name = "Patched".into()).await.unwrap_err();
            assert_eq!(kind(&err), Some(ErrorKind::NotFound));

            let err = clients.remove(id).await.unwrap_err();
            assert_eq!(kind(&err), Some(ErrorKind::NotFound));
        }
    })
    .await;

    // F1's row is untouched
    let still = clients
        .without_tenant_scope("verify foreign writes were refused")
        .get(&alice.id)
        .await
        .unwrap();
    assert_eq!(still, alice);
}

#[tokio::test]
async fn counts_and_aggregates_only_see_the_ambient_tenant() {
    let clients = ScopedRepository::<Client>::in_memory();

    for (tenant, name, cents) in [("F1", "A", 100), ("F1", "B", 250), ("F2", "C", 10_000)] {
        let mut c = client(name);
        c.retainer_cents = cents;
        TenantScope::run(ctx(tenant), clients.create(c)).await.unwrap();
    }

    TenantScope::run(ctx("F1"), async {
        assert_eq!(clients.count(Query::all()).await.unwrap(), 2);
        assert_eq!(clients.sum(Query::all(), |c| c.retainer_cents).await.unwrap(), 350);

        let names = clients
            .aggregate(Query::all(), Vec::new(), |mut acc, c| {
                acc.push(c.name.clone());
                acc
            })
            .await
            .unwrap();
        assert_eq!(names, ["A", "B"]);

        let big = clients
            .count(Query::all().filter(|c: &Client| c.retainer_cents > 1_000))
            .await
            .unwrap();
        assert_eq!(big, 0);
    })
    .await;

    let all_cents = clients
        .without_tenant_scope("platform revenue report")
        .aggregate(Query::all(), 0, |acc, c| acc + c.retainer_cents)
        .await
        .unwrap();
    assert_eq!(all_cents, 10_350);
}

#[tokio::test]
async fn relationship_traversal_stays_inside_the_tenant() {
    let cases = ScopedRepository::<Case>::in_memory();
    let deadlines = ScopedRepository::<Deadline>::in_memory();

    let case = TenantScope::run(ctx("F1"), async {
        let case = cases
            .create(Case {
                id: RecordId::default(),
                tenant_id: None,
                title: "Doe v. Roe".into(),
            })
            .await?;
        for label in ["Answer due", "Discovery cutoff"] {
            deadlines
                .create(Deadline {
                    id: RecordId::default(),
                    tenant_id: None,
                    case_id: case.id.clone(),
                    label: label.into(),
                })
                .await?;
        }
        Ok::<_, anyhow::Error>(case)
    })
    .await
    .unwrap();

    // F2 forges a deadline pointing at F1's case
    TenantScope::run(
        ctx("F2"),
        deadlines.create(Deadline {
            id: RecordId::default(),
            tenant_id: None,
            case_id: case.id.clone(),
            label: "forged".into(),
        }),
    )
    .await
    .unwrap();

    let own = TenantScope::run(ctx("F1"), cases.related(&case.id, &deadlines, |d: &Deadline| &d.case_id))
        .await
        .unwrap();
    let labels: Vec<_> = own.iter().map(|d| d.label.as_str()).collect();
    assert_eq!(labels, ["Answer due", "Discovery cutoff"]);

    let err = TenantScope::run(ctx("F2"), cases.related(&case.id, &deadlines, |d: &Deadline| &d.case_id))
        .await
        .unwrap_err();
    assert_eq!(kind(&err), Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn no_context_never_degrades_to_all_tenants() {
    let clients = ScopedRepository::<Client>::in_memory();
    TenantScope::run(ctx("F1"), clients.create(client("Alice"))).await.unwrap();

    assert_eq!(
        kind(&clients.find(Query::all()).await.unwrap_err()),
        Some(ErrorKind::NoTenantContext)
    );
    assert_eq!(
        kind(&clients.count(Query::all()).await.unwrap_err()),
        Some(ErrorKind::NoTenantContext)
    );
    assert_eq!(
        kind(&clients.create(client("Orphan")).await.unwrap_err()),
        Some(ErrorKind::NoTenantContext)
    );
    let total = clients
        .without_tenant_scope("no-context write check")
        .count(Query::all())
        .await
        .unwrap();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn bypass_and_scoped_queries_differ_on_the_same_fixture() {
    let clients = ScopedRepository::<Client>::in_memory();
    for (tenant, name) in [("F1", "A"), ("F2", "B"), ("F3", "C")] {
        TenantScope::run(ctx(tenant), clients.create(client(name))).await.unwrap();
    }

    TenantScope::run(ctx("F2"), async {
        let scoped = clients.find(Query::all()).await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].name, "B");

        let unscoped = clients
            .without_tenant_scope("isolation negative/positive control")
            .find(Query::all())
            .await
            .unwrap();
        assert_eq!(unscoped.len(), 3);

        let just_f3 = clients
            .without_tenant_scope("support lookup for F3")
            .count(Query::all().in_tenant(tid("F3")))
            .await
            .unwrap();
        assert_eq!(just_f3, 1);
    })
    .await;
}

#[tokio::test]
async fn remove_then_get_is_not_found() {
    let clients = ScopedRepository::<Client>::in_memory();
    TenantScope::run(ctx("F1"), async {
        let c = clients.create(client("Temp")).await.unwrap();
        let removed = clients.remove(&c.id).await.unwrap();
        assert_eq!(removed.id, c.id);
        assert_eq!(kind(&clients.get(&c.id).await.unwrap_err()), Some(ErrorKind::NotFound));
    })
    .await;
}

#[tokio::test]
async fn background_job_visits_each_usable_tenant_in_its_own_scope() {
    let directory = MemoryDirectory::new();
    for (id, suspended) in [("F1", false), ("F2", false), ("F3", true)] {
        let mut t = Tenant::provision(tid(id), format!("Firm {id}"), Plan::Team);
        if suspended {
            t.suspend("unpaid");
        }
        directory.insert_tenant(t).unwrap();
        directory
            .insert_membership(TenantMembership::joined(tid(id), UserId::new("owner"), MembershipRole::Owner))
            .unwrap();
    }

    let clients = Arc::new(ScopedRepository::<Client>::in_memory());
    for (tenant, name) in [("F1", "A"), ("F1", "B"), ("F2", "C"), ("F3", "D")] {
        TenantScope::run(ctx(tenant), clients.create(client(name))).await.unwrap();
    }

    let runs = for_each_active_tenant(&directory, |job_ctx| {
        let clients = Arc::clone(&clients);
        async move {
            assert_eq!(TenantScope::tenant_id()?, *job_ctx.tenant_id());
            clients.count(Query::all()).await
        }
    })
    .await
    .unwrap();

    let summary: Vec<_> = runs
        .iter()
        .map(|r| (r.tenant_id.as_str(), *r.result.as_ref().unwrap()))
        .collect();
    assert_eq!(summary, [("F1", 2), ("F2", 1)]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn every_tenant_sees_exactly_its_own_rows(rows in prop::collection::vec((0usize..4, "[a-z]{1,8}"), 0..40)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let clients = ScopedRepository::<Client>::in_memory();
            let tenants = ["t0", "t1", "t2", "t3"];

            for (t, name) in &rows {
                TenantScope::run(ctx(tenants[*t]), clients.create(client(name))).await.unwrap();
            }

            for (i, tenant) in tenants.iter().enumerate() {
                let expected: Vec<&str> = rows
                    .iter()
                    .filter(|(t, _)| *t == i)
                    .map(|(_, name)| name.as_str())
                    .collect();

                let (seen, count) = TenantScope::run(ctx(tenant), async {
                    let seen = clients.find(Query::all()).await.unwrap();
                    let count = clients.count(Query::all()).await.unwrap();
                    (seen, count)
                })
                .await;

                let names: Vec<&str> = seen.iter().map(|c| c.name.as_str()).collect();
                prop_assert_eq!(&names, &expected);
                prop_assert_eq!(count, expected.len());
                prop_assert!(seen.iter().all(|c| c.tenant_id.as_ref() == Some(&tid(tenant))));
            }
            Ok(())
        })?;
    }
}
