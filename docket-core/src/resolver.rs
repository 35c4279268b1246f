//! Turning raw transport identifiers into a usable [`TenantContext`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::context::TenantContext;
use crate::errors::{DocketError, DocketResult, ErrorKind};
use crate::tenant::{Tenant, TenantId, TenantMembership, UserId};

/// Where tenants and memberships are looked up.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn tenant(&self, id: &TenantId) -> DocketResult<Option<Tenant>>;

    async fn membership(
        &self,
        tenant_id: &TenantId,
        user_id: &UserId,
    ) -> DocketResult<Option<TenantMembership>>;

    /// Every tenant, usable or not.
    async fn tenants(&self) -> DocketResult<Vec<Tenant>>;
}

#[derive(Default)]
pub struct MemoryDirectory {
    tenants: RwLock<HashMap<TenantId, Tenant>>,
    memberships: RwLock<HashMap<(TenantId, UserId), TenantMembership>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_tenant(&self, tenant: Tenant) -> DocketResult<()> {
        let mut tenants = self.tenants.write();
        if tenants.contains_key(&tenant.id) {
            return Err(DocketError::conflict(format!("tenant {} already exists", tenant.id)).into_anyhow());
        }
        tenants.insert(tenant.id.clone(), tenant);
        Ok(())
    }

    /// Apply `change` to a stored tenant (plan change, suspension, ...).
    pub fn update_tenant<F>(&self, id: &TenantId, change: F) -> DocketResult<Tenant>
    where
        F: FnOnce(&mut Tenant),
    {
        let mut tenants = self.tenants.write();
        let tenant = tenants
            .get_mut(id)
            .ok_or_else(|| DocketError::not_found(format!("tenant not found: {id}")).into_anyhow())?;
        change(tenant);
        tenant.id = id.clone();
        Ok(tenant.clone())
    }

    pub fn insert_membership(&self, membership: TenantMembership) -> DocketResult<()> {
        let key = (membership.tenant_id.clone(), membership.user_id.clone());
        let mut memberships = self.memberships.write();
        if memberships.contains_key(&key) {
            return Err(DocketError::conflict(format!(
                "user {} is already a member of {}",
                key.1, key.0
            ))
            .into_anyhow());
        }
        memberships.insert(key, membership);
        Ok(())
    }

    pub fn update_membership<F>(&self, tenant_id: &TenantId, user_id: &UserId, change: F) -> DocketResult<TenantMembership>
    where
        F: FnOnce(&mut TenantMembership),
    {
        let mut memberships = self.memberships.write();
        let m = memberships
            .get_mut(&(tenant_id.clone(), user_id.clone()))
            .ok_or_else(|| DocketError::not_found(format!("membership not found: {tenant_id}/{user_id}")).into_anyhow())?;
        change(m);
        m.tenant_id = tenant_id.clone();
        m.user_id = user_id.clone();
        Ok(m.clone())
    }
}

#[async_trait]
impl TenantDirectory for MemoryDirectory {
    async fn tenant(&self, id: &TenantId) -> DocketResult<Option<Tenant>> {
        Ok(self.tenants.read().get(id).cloned())
    }

    async fn membership(
        &self,
        tenant_id: &TenantId,
        user_id: &UserId,
    ) -> DocketResult<Option<TenantMembership>> {
        Ok(self
            .memberships
            .read()
            .get(&(tenant_id.clone(), user_id.clone()))
            .cloned())
    }

    async fn tenants(&self) -> DocketResult<Vec<Tenant>> {
        let mut all: Vec<Tenant> = self.tenants.read().values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }
}

/// Resolves `(tenant, user?)` from a transport into a context.
///
/// Outcomes:
/// - malformed tenant id: `BadRequest` (it came from the client)
/// - unknown tenant: `NotFound`
/// - suspended / deactivated tenant: `TenantSuspended` / `TenantInactive`
/// - user given but no active membership: `Forbidden`
pub struct TenantResolver<D: ?Sized> {
    directory: Arc<D>,
}

impl<D: ?Sized> Clone for TenantResolver<D> {
    fn clone(&self) -> Self {
        Self {
            directory: Arc::clone(&self.directory),
        }
    }
}

impl<D> TenantResolver<D>
where
    D: TenantDirectory + ?Sized,
{
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    pub async fn resolve(&self, raw_tenant: &str, raw_user: Option<&str>) -> DocketResult<TenantContext> {
        let tenant_id = TenantId::parse(raw_tenant).map_err(|e| {
            match DocketError::kind_of(&e) {
                Some(ErrorKind::InvalidTenant) => {
                    DocketError::bad_request("Missing or malformed tenant identifier").into_anyhow()
                }
                _ => e,
            }
        })?;

        let tenant = self
            .directory
            .tenant(&tenant_id)
            .await?
            .ok_or_else(|| DocketError::not_found(format!("tenant not found: {tenant_id}")).into_anyhow())?;
        tenant.availability()?;

        let ctx = TenantContext::new(tenant_id.clone()).with_tenant(tenant);

        let Some(raw_user) = raw_user.filter(|u| !u.trim().is_empty()) else {
            tracing::debug!(tenant_id = %tenant_id, "resolved tenant without acting user");
            return Ok(ctx);
        };

        let user_id = UserId::new(raw_user.trim());
        let membership = self
            .directory
            .membership(&tenant_id, &user_id)
            .await?
            .filter(|m| m.active)
            .ok_or_else(|| {
                tracing::info!(tenant_id = %tenant_id, user_id = %user_id, "no active membership");
                DocketError::forbidden("Not an active member of this account").into_anyhow()
            })?;

        tracing::debug!(tenant_id = %tenant_id, user_id = %user_id, role = ?membership.role, "resolved tenant context");
        Ok(ctx.with_membership(membership))
    }
}
