//! docket-core: tenant context propagation and tenant-scoped data access.
//!
//! - [`TenantContext`]: the immutable per-unit-of-work context
//! - [`TenantScope`]: makes a context ambient for a future and everything it awaits
//! - [`ScopedRepository`]: confines every query and write to the ambient tenant,
//!   with an explicit, audited bypass
//! - [`TenantResolver`]: turns transport identifiers into a context

pub mod config;
pub mod context;
pub mod entity;
pub mod errors;
pub mod jobs;
pub mod memory;
pub mod repository;
pub mod resolver;
pub mod scope;
pub mod service;
pub mod store;
pub mod tenant;

pub use config::{DocketConfig, DocketConfigSnapshot, TenancyConfig, TenantSource};
pub use context::TenantContext;
pub use entity::{RecordId, Scoped};
pub use errors::{DocketError, DocketResult, ErrorKind};
pub use jobs::{for_each_active_tenant, TenantRun};
pub use memory::MemoryStore;
pub use repository::{ScopedRepository, Unscoped};
pub use resolver::{MemoryDirectory, TenantDirectory, TenantResolver};
pub use scope::TenantScope;
pub use service::{DocketService, Page, ServiceCapabilities, ServiceMethodKind};
pub use store::{Query, RecordStore, StoreError, StoreResult};
pub use tenant::{MembershipRole, Plan, Suspension, Tenant, TenantId, TenantLimits, TenantMembership, UserId};
