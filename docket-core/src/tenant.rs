//! Tenant identity data: the law firm ([`Tenant`]) and a user's
//! relationship to it ([`TenantMembership`]).
//!
//! These types carry no behaviour beyond their own lifecycle; the context
//! layer only reads them.

use std::fmt;

use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{DocketError, DocketResult};

/// Opaque tenant identifier. Every scoped row carries one.
///
/// Always non-empty: the only ways in are [`TenantId::parse`] and `TryFrom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct TenantId(String);

impl TenantId {
    /// Validate a raw identifier.
    pub fn parse(raw: impl Into<String>) -> DocketResult<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(DocketError::invalid_tenant("tenant id must not be empty").into_anyhow());
        }
        if raw.trim() != raw || raw.chars().any(char::is_control) {
            return Err(DocketError::invalid_tenant(format!(
                "tenant id contains whitespace or control characters: {raw:?}"
            ))
            .into_anyhow());
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TenantId {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for TenantId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

/// Identifier of an acting user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UserId(pub String);

impl UserId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Plan {
    Trial,
    Solo,
    Team,
    Enterprise,
}

impl Plan {
    pub fn default_limits(&self) -> TenantLimits {
        match self {
            Plan::Trial => TenantLimits {
                max_members: 2,
                max_open_cases: 10,
                storage_bytes: 512 * 1024 * 1024,
            },
            Plan::Solo => TenantLimits {
                max_members: 1,
                max_open_cases: 250,
                storage_bytes: 20 * 1024 * 1024 * 1024,
            },
            Plan::Team => TenantLimits {
                max_members: 25,
                max_open_cases: 5_000,
                storage_bytes: 250 * 1024 * 1024 * 1024,
            },
            Plan::Enterprise => TenantLimits {
                max_members: u32::MAX,
                max_open_cases: u32::MAX,
                storage_bytes: u64::MAX,
            },
        }
    }
}

/// Resource limits attached to a tenant's plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TenantLimits {
    pub max_members: u32,
    pub max_open_cases: u32,
    pub storage_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Suspension {
    pub reason: String,
    pub since: DateTime<Utc>,
}

/// One law firm / customer account.
///
/// Tenants are never physically deleted; [`Tenant::deactivate`] is the end
/// of the lifecycle.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub plan: Plan,
    pub active: bool,
    pub limits: TenantLimits,
    pub suspension: Option<Suspension>,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// A freshly provisioned, active tenant with the plan's default limits.
    pub fn provision(id: TenantId, name: impl Into<String>, plan: Plan) -> Self {
        Self {
            id,
            name: name.into(),
            plan,
            active: true,
            limits: plan.default_limits(),
            suspension: None,
            created_at: Utc::now(),
        }
    }

    pub fn change_plan(&mut self, plan: Plan) {
        self.plan = plan;
        self.limits = plan.default_limits();
    }

    pub fn suspend(&mut self, reason: impl Into<String>) {
        self.suspension = Some(Suspension {
            reason: reason.into(),
            since: Utc::now(),
        });
    }

    pub fn reactivate(&mut self) {
        self.suspension = None;
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_suspended(&self) -> bool {
        self.suspension.is_some()
    }

    /// Whether ordinary request traffic may open a context for this tenant.
    ///
    /// Suspension is reported before deactivation: a suspended account can
    /// still be fixed by its owners, a deactivated one cannot.
    pub fn availability(&self) -> DocketResult<()> {
        if let Some(s) = &self.suspension {
            return Err(DocketError::tenant_suspended(format!(
                "Account suspended: {}",
                s.reason
            ))
            .into_anyhow());
        }
        if !self.active {
            return Err(DocketError::tenant_inactive(format!(
                "Account {} is no longer active",
                self.id
            ))
            .into_anyhow());
        }
        Ok(())
    }
}

/// Role inside a tenant. Declaration order is the hierarchy, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MembershipRole {
    Assistant,
    Staff,
    Admin,
    Owner,
}

impl MembershipRole {
    pub fn at_least(&self, required: MembershipRole) -> bool {
        *self >= required
    }
}

/// One user's relationship to one tenant. `(tenant_id, user_id)` is unique.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TenantMembership {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub role: MembershipRole,
    pub active: bool,
    pub invited_at: DateTime<Utc>,
    pub joined_at: Option<DateTime<Utc>>,
}

impl TenantMembership {
    /// A pending invitation. Not usable until accepted.
    pub fn invite(tenant_id: TenantId, user_id: UserId, role: MembershipRole) -> Self {
        Self {
            tenant_id,
            user_id,
            role,
            active: false,
            invited_at: Utc::now(),
            joined_at: None,
        }
    }

    /// An already-accepted membership, as created at signup.
    pub fn joined(tenant_id: TenantId, user_id: UserId, role: MembershipRole) -> Self {
        let mut m = Self::invite(tenant_id, user_id, role);
        m.accept();
        m
    }

    pub fn accept(&mut self) {
        self.active = true;
        self.joined_at.get_or_insert_with(Utc::now);
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}
