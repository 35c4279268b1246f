//! The unscoped storage interface.
//!
//! A [`RecordStore`] knows nothing about the ambient tenant. It evaluates
//! whatever [`Query`] it is handed; tenant confinement is added on top by
//! [`ScopedRepository`](crate::repository::ScopedRepository).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::entity::{RecordId, Scoped};
use crate::errors::DocketError;
use crate::tenant::TenantId;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures raised by storage backends.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} {id} has no tenant id")]
    MissingTenant { entity: &'static str, id: RecordId },

    #[error("{entity} {id} already exists")]
    Duplicate { entity: &'static str, id: RecordId },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Lift into the structured error carried through the rest of the stack.
    pub fn into_docket(self) -> anyhow::Error {
        let docket = match &self {
            StoreError::Duplicate { .. } => DocketError::conflict(self.to_string()),
            StoreError::MissingTenant { .. } | StoreError::Backend { .. } => {
                DocketError::general_error(self.to_string())
            }
        };
        docket.with_source(anyhow::Error::new(self)).into_anyhow()
    }
}

type Predicate<R> = Arc<dyn Fn(&R) -> bool + Send + Sync>;

/// A conjunctive filter over rows of `R`, with paging.
///
/// Every constraint must hold for a row to match, including every tenant
/// constraint: two different tenants conjoined match nothing.
pub struct Query<R> {
    tenants: Vec<TenantId>,
    predicates: Vec<Predicate<R>>,
    skip: usize,
    limit: Option<usize>,
}

impl<R> Query<R> {
    /// Matches every row.
    pub fn all() -> Self {
        Self {
            tenants: Vec::new(),
            predicates: Vec::new(),
            skip: 0,
            limit: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Arc::new(predicate));
        self
    }

    /// Conjoin a tenant constraint.
    pub fn in_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenants.push(tenant_id);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn tenants(&self) -> &[TenantId] {
        &self.tenants
    }

    pub fn is_tenant_constrained(&self) -> bool {
        !self.tenants.is_empty()
    }

    pub fn skip_count(&self) -> usize {
        self.skip
    }

    pub fn limit_count(&self) -> Option<usize> {
        self.limit
    }
}

impl<R: Scoped> Query<R> {
    /// Whether `row` satisfies every constraint. Paging is not considered.
    pub fn matches(&self, row: &R) -> bool {
        self.tenants.iter().all(|t| row.belongs_to(t)) && self.predicates.iter().all(|p| p(row))
    }
}

impl<R> Default for Query<R> {
    fn default() -> Self {
        Self::all()
    }
}

impl<R> Clone for Query<R> {
    fn clone(&self) -> Self {
        Self {
            tenants: self.tenants.clone(),
            predicates: self.predicates.clone(),
            skip: self.skip,
            limit: self.limit,
        }
    }
}

impl<R> fmt::Debug for Query<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("tenants", &self.tenants)
            .field("predicates", &self.predicates.len())
            .field("skip", &self.skip)
            .field("limit", &self.limit)
            .finish()
    }
}

/// Raw, tenant-agnostic storage for one entity type.
///
/// Mutations take a query too: the row addressed by `id` is only touched if
/// it also matches the query, and the call reports `None` otherwise. That is
/// what lets the scoped layer treat "foreign" and "missing" identically.
#[async_trait]
pub trait RecordStore<R: Scoped>: Send + Sync {
    async fn fetch(&self, query: &Query<R>, id: &RecordId) -> StoreResult<Option<R>>;

    /// Matching rows in insertion order, after `skip`/`limit`.
    async fn select(&self, query: &Query<R>) -> StoreResult<Vec<R>>;

    /// Number of matching rows. Paging is ignored.
    async fn count(&self, query: &Query<R>) -> StoreResult<usize>;

    async fn insert(&self, record: R) -> StoreResult<R>;

    async fn replace(&self, query: &Query<R>, id: &RecordId, record: R) -> StoreResult<Option<R>>;

    async fn delete(&self, query: &Query<R>, id: &RecordId) -> StoreResult<Option<R>>;
}
