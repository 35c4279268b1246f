use chrono::NaiveDate;
use docket_core::{
    DocketResult, MemoryDirectory, MembershipRole, Plan, RecordId, Tenant, TenantContext, TenantId,
    TenantMembership, TenantScope, UserId,
};

use crate::entities::{Case, CaseStatus, Client, Deadline, TimeEntry};
use crate::services::FirmServices;

struct DemoFirm {
    id: &'static str,
    name: &'static str,
    plan: Plan,
    owner: &'static str,
    client: &'static str,
    case: &'static str,
}

const DEMO_FIRMS: [DemoFirm; 2] = [
    DemoFirm {
        id: "hale-moss",
        name: "Hale & Moss LLP",
        plan: Plan::Team,
        owner: "ada",
        client: "Northwind Freight",
        case: "Northwind v. Harbor Authority",
    },
    DemoFirm {
        id: "ortega-legal",
        name: "Ortega Legal",
        plan: Plan::Solo,
        owner: "luis",
        client: "Rosa Delgado",
        case: "Delgado custody review",
    },
];

/// Provision the demo firms and give each a client, a case, deadlines and
/// some logged time. Each firm's rows are written inside that firm's scope.
pub async fn seed_demo(directory: &MemoryDirectory, services: &FirmServices) -> DocketResult<()> {
    for firm in &DEMO_FIRMS {
        let tenant_id = TenantId::parse(firm.id)?;
        let tenant = Tenant::provision(tenant_id.clone(), firm.name, firm.plan);
        directory.insert_tenant(tenant.clone())?;
        directory.insert_membership(TenantMembership::joined(
            tenant_id.clone(),
            UserId::new(firm.owner),
            MembershipRole::Owner,
        ))?;

        let ctx = TenantContext::new(tenant_id).with_tenant(tenant);
        TenantScope::run(ctx, seed_firm(services, firm)).await?;
        tracing::info!(tenant_id = firm.id, "seeded demo firm");
    }

    let mut dormant = Tenant::provision(TenantId::parse("dormant-llp")?, "Dormant LLP", Plan::Trial);
    dormant.suspend("trial expired");
    directory.insert_tenant(dormant)?;

    Ok(())
}

async fn seed_firm(services: &FirmServices, firm: &DemoFirm) -> DocketResult<()> {
    let client = services
        .clients
        .create(Client {
            id: RecordId::default(),
            tenant_id: None,
            name: firm.client.to_string(),
            email: None,
        })
        .await?;

    let case = services
        .cases
        .create(Case {
            id: RecordId::default(),
            tenant_id: None,
            client_id: client.id.clone(),
            title: firm.case.to_string(),
            status: CaseStatus::Open,
        })
        .await?;

    for (label, (y, m, d)) in [("Initial disclosures", (2026, 11, 2)), ("Mediation", (2026, 12, 14))] {
        services
            .deadlines
            .create(Deadline {
                id: RecordId::default(),
                tenant_id: None,
                case_id: case.id.clone(),
                label: label.to_string(),
                due_on: NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default(),
                done: false,
            })
            .await?;
    }

    for (minutes, billable, note) in [(90, true, "intake call"), (30, false, "conflict check")] {
        services
            .time_entries
            .create(TimeEntry {
                id: RecordId::default(),
                tenant_id: None,
                case_id: case.id.clone(),
                minutes,
                billable,
                note: note.to_string(),
                logged_at: chrono::Utc::now(),
            })
            .await?;
    }

    Ok(())
}
