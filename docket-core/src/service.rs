use anyhow::anyhow;
use async_trait::async_trait;

use crate::errors::DocketResult;
use crate::store::Query;

/// Standard service methods: find, get, create, update, remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceMethodKind {
    Find,
    Get,
    Create,
    Update,
    Remove,
}

/// Which methods a service exposes to transports.
///
/// Adapters (like docket-axum) use this to mount only allowed routes.
#[derive(Debug, Clone)]
pub struct ServiceCapabilities {
    pub allowed_methods: Vec<ServiceMethodKind>,
}

impl ServiceCapabilities {
    pub fn standard_crud() -> Self {
        use ServiceMethodKind::*;
        Self {
            allowed_methods: vec![Find, Get, Create, Update, Remove],
        }
    }

    pub fn read_only() -> Self {
        use ServiceMethodKind::*;
        Self {
            allowed_methods: vec![Find, Get],
        }
    }

    pub fn from_methods(methods: Vec<ServiceMethodKind>) -> Self {
        Self {
            allowed_methods: methods,
        }
    }

    pub fn allows(&self, method: ServiceMethodKind) -> bool {
        self.allowed_methods.contains(&method)
    }
}

/// Paging for `find`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub skip: usize,
    pub limit: Option<usize>,
}

impl Page {
    /// Cap `limit` at `max`, defaulting to `default` when absent.
    pub fn clamped(self, default: usize, max: usize) -> Self {
        Self {
            skip: self.skip,
            limit: Some(self.limit.unwrap_or(default).min(max)),
        }
    }

    pub fn apply<R>(&self, query: Query<R>) -> Query<R> {
        let query = query.skip(self.skip);
        match self.limit {
            Some(limit) => query.limit(limit),
            None => query,
        }
    }
}

/// Transport-facing service over one record type.
///
/// There is no context parameter: implementations read the ambient tenant
/// from [`TenantScope`](crate::scope::TenantScope). Methods default to
/// "not implemented" so a service overrides only what it supports.
#[async_trait]
pub trait DocketService<R>: Send + Sync
where
    R: Send + 'static,
{
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::standard_crud()
    }

    async fn find(&self, _page: Page) -> DocketResult<Vec<R>> {
        Err(anyhow!("Method not implemented: find"))
    }

    async fn get(&self, _id: &str) -> DocketResult<R> {
        Err(anyhow!("Method not implemented: get"))
    }

    async fn create(&self, _data: R) -> DocketResult<R> {
        Err(anyhow!("Method not implemented: create"))
    }

    /// Full replace of an existing record.
    async fn update(&self, _id: &str, _data: R) -> DocketResult<R> {
        Err(anyhow!("Method not implemented: update"))
    }

    async fn remove(&self, _id: &str) -> DocketResult<R> {
        Err(anyhow!("Method not implemented: remove"))
    }
}
