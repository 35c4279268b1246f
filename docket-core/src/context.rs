//! The per-unit-of-work tenant context.

use std::sync::Arc;

use crate::tenant::{Tenant, TenantId, TenantMembership, UserId};

#[derive(Debug)]
struct ContextInner {
    tenant_id: TenantId,
    tenant: Option<Tenant>,
    user_id: Option<UserId>,
    membership: Option<TenantMembership>,
}

/// Immutable context carried by every Docket operation.
///
/// Clones share one frozen value. The `with_*` methods build a new context
/// and leave `self` untouched, so enriching a context in one place can never
/// leak into another holder of the original.
#[derive(Debug, Clone)]
pub struct TenantContext {
    inner: Arc<ContextInner>,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                tenant_id,
                tenant: None,
                user_id: None,
                membership: None,
            }),
        }
    }

    /// Full constructor, as used by the request-resolution layer.
    pub fn from_parts(
        tenant_id: TenantId,
        tenant: Option<Tenant>,
        user_id: Option<UserId>,
        membership: Option<TenantMembership>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                tenant_id,
                tenant,
                user_id,
                membership,
            }),
        }
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.inner.tenant_id
    }

    pub fn tenant(&self) -> Option<&Tenant> {
        self.inner.tenant.as_ref()
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.inner.user_id.as_ref()
    }

    pub fn membership(&self) -> Option<&TenantMembership> {
        self.inner.membership.as_ref()
    }

    /// Attach a lazily loaded tenant record. The tenant id never changes.
    pub fn with_tenant(&self, tenant: Tenant) -> Self {
        Self::from_parts(
            self.inner.tenant_id.clone(),
            Some(tenant),
            self.inner.user_id.clone(),
            self.inner.membership.clone(),
        )
    }

    pub fn with_user(&self, user_id: UserId) -> Self {
        Self::from_parts(
            self.inner.tenant_id.clone(),
            self.inner.tenant.clone(),
            Some(user_id),
            self.inner.membership.clone(),
        )
    }

    pub fn with_membership(&self, membership: TenantMembership) -> Self {
        Self::from_parts(
            self.inner.tenant_id.clone(),
            self.inner.tenant.clone(),
            Some(membership.user_id.clone()),
            Some(membership),
        )
    }

    /// True when both contexts are the very same value, not just equal ids.
    pub fn same_as(&self, other: &TenantContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::{MembershipRole, Plan};

    #[test]
    fn enrichment_returns_a_new_value() {
        let id = TenantId::parse("f1").unwrap();
        let base = TenantContext::new(id.clone());
        let alias = base.clone();

        let enriched = base.with_tenant(Tenant::provision(id.clone(), "Firm One", Plan::Solo));

        assert!(base.tenant().is_none());
        assert!(alias.tenant().is_none());
        assert!(base.same_as(&alias));
        assert!(!enriched.same_as(&base));
        assert_eq!(enriched.tenant().map(|t| t.name.as_str()), Some("Firm One"));
        assert_eq!(enriched.tenant_id(), &id);
    }

    #[test]
    fn membership_sets_acting_user() {
        let id = TenantId::parse("f1").unwrap();
        let m = TenantMembership::joined(id.clone(), UserId::new("u7"), MembershipRole::Admin);
        let ctx = TenantContext::new(id).with_membership(m);
        assert_eq!(ctx.user_id().map(UserId::as_str), Some("u7"));
        assert_eq!(ctx.membership().map(|m| m.role), Some(MembershipRole::Admin));
    }
}
