//! Running background work tenant by tenant.
//!
//! A job that has to touch every firm does not bypass scoping; it opens one
//! ordinary scope per tenant and does per-tenant work inside it.

use std::future::Future;

use crate::context::TenantContext;
use crate::errors::DocketResult;
use crate::resolver::TenantDirectory;
use crate::scope::TenantScope;
use crate::tenant::TenantId;

/// Outcome of one tenant's run.
#[derive(Debug)]
pub struct TenantRun<T> {
    pub tenant_id: TenantId,
    pub result: DocketResult<T>,
}

/// Run `job` once for every usable tenant, each inside its own scope.
///
/// Suspended and deactivated tenants are skipped. A failure in one tenant
/// is recorded in its [`TenantRun`] and does not stop the others.
pub async fn for_each_active_tenant<D, F, Fut, T>(directory: &D, mut job: F) -> DocketResult<Vec<TenantRun<T>>>
where
    D: TenantDirectory + ?Sized,
    F: FnMut(TenantContext) -> Fut,
    Fut: Future<Output = DocketResult<T>>,
{
    let tenants = directory.tenants().await?;
    let mut runs = Vec::with_capacity(tenants.len());

    for tenant in tenants {
        if let Err(reason) = tenant.availability() {
            tracing::debug!(tenant_id = %tenant.id, %reason, "skipping tenant");
            continue;
        }

        let tenant_id = tenant.id.clone();
        let ctx = TenantContext::new(tenant_id.clone()).with_tenant(tenant);
        let result = TenantScope::run(ctx.clone(), job(ctx)).await;

        if let Err(err) = &result {
            tracing::warn!(tenant_id = %tenant_id, error = %err, "tenant job failed");
        }
        runs.push(TenantRun { tenant_id, result });
    }

    tracing::info!(tenants = runs.len(), "tenant job pass complete");
    Ok(runs)
}
