//! Cross-tenant reporting.
//!
//! Per-firm figures are computed inside one ordinary scope per firm. Only the
//! platform-wide totals use the audited bypass.

use docket_core::{for_each_active_tenant, DocketError, DocketResult, Query, TenantDirectory, TenantId, TenantRun};
use serde::Serialize;

use crate::entities::{Case, CaseStatus, TimeEntry};
use crate::services::FirmServices;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseLoad {
    pub tenant_id: TenantId,
    pub open_cases: usize,
    pub billable_minutes: i64,
}

/// Open cases and billable minutes for every usable firm.
///
/// A firm whose figures fail is logged and left out; the others still report.
/// Configuration errors are not per-firm failures and abort the report.
pub async fn case_load<D>(directory: &D, services: &FirmServices) -> DocketResult<Vec<CaseLoad>>
where
    D: TenantDirectory + ?Sized,
{
    let runs = for_each_active_tenant(directory, |_ctx| {
        let services = services.clone();
        async move {
            let open_cases = services
                .cases
                .count(Query::all().filter(|c: &Case| c.status == CaseStatus::Open))
                .await?;
            let billable_minutes = services
                .time_entries
                .sum(Query::all().filter(|t: &TimeEntry| t.billable), |t| t.minutes)
                .await?;
            Ok((open_cases, billable_minutes))
        }
    })
    .await?;

    collect_loads(runs)
}

fn collect_loads(runs: Vec<TenantRun<(usize, i64)>>) -> DocketResult<Vec<CaseLoad>> {
    let mut loads = Vec::with_capacity(runs.len());
    for run in runs {
        match run.result {
            Ok((open_cases, billable_minutes)) => loads.push(CaseLoad {
                tenant_id: run.tenant_id,
                open_cases,
                billable_minutes,
            }),
            Err(err) if DocketError::kind_of(&err).is_some_and(|k| k.is_configuration()) => return Err(err),
            Err(err) => {
                tracing::warn!(tenant_id = %run.tenant_id, error = %err, "case load left out of report");
            }
        }
    }
    Ok(loads)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlatformTotals {
    pub clients: usize,
    pub cases: usize,
}

/// Row counts across all firms, for platform operators.
pub async fn platform_totals(services: &FirmServices) -> DocketResult<PlatformTotals> {
    let clients = services
        .clients
        .without_tenant_scope("platform totals report")
        .count(Query::all())
        .await?;
    let cases = services
        .cases
        .without_tenant_scope("platform totals report")
        .count(Query::all())
        .await?;
    Ok(PlatformTotals { clients, cases })
}
