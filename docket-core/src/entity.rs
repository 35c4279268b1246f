use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tenant::TenantId;

/// Row identifier. Empty means "not assigned yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// A fresh `prefix:uuid` id.
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{prefix}:{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unassigned(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A persistent record that belongs to exactly one tenant.
///
/// `tenant_id` is optional on the type only so that inbound payloads can
/// omit it; stores refuse to persist a row without one, and the scoped
/// repository overwrites whatever the caller put there.
pub trait Scoped: Clone + Send + Sync + 'static {
    /// Entity name used in ids, messages and audit events.
    const ENTITY: &'static str;

    fn id(&self) -> &RecordId;
    fn assign_id(&mut self, id: RecordId);
    fn tenant_id(&self) -> Option<&TenantId>;
    fn stamp_tenant(&mut self, tenant_id: TenantId);

    fn belongs_to(&self, tenant_id: &TenantId) -> bool {
        self.tenant_id() == Some(tenant_id)
    }
}

/// Implement [`Scoped`] for a struct with `id: RecordId` and
/// `tenant_id: Option<TenantId>` fields.
///
/// ```rust
/// use docket_core::{scoped_entity, RecordId, TenantId};
///
/// #[derive(Debug, Clone)]
/// pub struct Client {
///     pub id: RecordId,
///     pub tenant_id: Option<TenantId>,
///     pub name: String,
/// }
///
/// scoped_entity!(Client, "client");
/// ```
#[macro_export]
macro_rules! scoped_entity {
    ($ty:ty, $name:expr) => {
        impl $crate::entity::Scoped for $ty {
            const ENTITY: &'static str = $name;

            fn id(&self) -> &$crate::entity::RecordId {
                &self.id
            }

            fn assign_id(&mut self, id: $crate::entity::RecordId) {
                self.id = id;
            }

            fn tenant_id(&self) -> Option<&$crate::tenant::TenantId> {
                self.tenant_id.as_ref()
            }

            fn stamp_tenant(&mut self, tenant_id: $crate::tenant::TenantId) {
                self.tenant_id = Some(tenant_id);
            }
        }
    };
}
