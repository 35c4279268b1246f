//! # Tenant-scoped data access
//!
//! [`ScopedRepository`] wraps a raw [`RecordStore`] and confines every read
//! and write to the ambient tenant from [`TenantScope`]:
//!
//! - reads (`get`, `find`, `count`, `aggregate`, `sum`, `related`) conjoin
//!   `tenant == current tenant` before the store sees the query
//! - `create` assigns a fresh id and stamps the ambient tenant, whatever the
//!   payload said
//! - `update`, `patch` and `remove` only reach rows the read path can see, and
//!   a foreign row fails exactly like a missing one (`NotFound`)
//! - with no scope open every call fails with `NoTenantContext`
//!
//! The only way around the filter is [`ScopedRepository::without_tenant_scope`],
//! which hands out a single-use [`Unscoped`] handle and logs an audit event.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::entity::{RecordId, Scoped};
use crate::errors::{DocketError, DocketResult};
use crate::memory::MemoryStore;
use crate::scope::TenantScope;
use crate::service::{DocketService, Page, ServiceCapabilities};
use crate::store::{Query, RecordStore, StoreError};
use crate::tenant::TenantId;

pub struct ScopedRepository<R, S = MemoryStore<R>> {
    store: Arc<S>,
    capabilities: ServiceCapabilities,
    _record: PhantomData<fn() -> R>,
}

impl<R, S> Clone for ScopedRepository<R, S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            capabilities: self.capabilities.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Scoped> ScopedRepository<R, MemoryStore<R>> {
    /// Repository over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }
}

impl<R: Scoped> Default for ScopedRepository<R, MemoryStore<R>> {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl<R, S> ScopedRepository<R, S>
where
    R: Scoped,
    S: RecordStore<R>,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            capabilities: ServiceCapabilities::standard_crud(),
            _record: PhantomData,
        }
    }

    pub fn with_capabilities(mut self, capabilities: ServiceCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    fn not_found(id: &RecordId) -> anyhow::Error {
        DocketError::not_found(format!("{} not found: {id}", R::ENTITY)).into_anyhow()
    }

    /// Conjoin the ambient tenant onto `query`.
    fn scoped(query: Query<R>) -> DocketResult<(TenantId, Query<R>)> {
        let tenant_id = TenantScope::tenant_id()?;
        let query = query.in_tenant(tenant_id.clone());
        Ok((tenant_id, query))
    }

    pub async fn get(&self, id: &RecordId) -> DocketResult<R> {
        let (_, query) = Self::scoped(Query::all())?;
        self.store
            .fetch(&query, id)
            .await
            .map_err(StoreError::into_docket)?
            .ok_or_else(|| Self::not_found(id))
    }

    pub async fn find(&self, query: Query<R>) -> DocketResult<Vec<R>> {
        let (_, query) = Self::scoped(query)?;
        self.store.select(&query).await.map_err(StoreError::into_docket)
    }

    pub async fn count(&self, query: Query<R>) -> DocketResult<usize> {
        let (_, query) = Self::scoped(query)?;
        self.store.count(&query).await.map_err(StoreError::into_docket)
    }

    /// Fold over every visible row matching `query`.
    pub async fn aggregate<A, F>(&self, query: Query<R>, init: A, fold: F) -> DocketResult<A>
    where
        F: FnMut(A, &R) -> A,
    {
        let rows = self.find(query).await?;
        Ok(rows.iter().fold(init, fold))
    }

    /// Overflow is a `GeneralError`, never a wrapped total.
    pub async fn sum<F>(&self, query: Query<R>, value: F) -> DocketResult<i64>
    where
        F: Fn(&R) -> i64,
    {
        self.aggregate(query, Some(0_i64), |acc, row| acc.and_then(|acc| acc.checked_add(value(row))))
            .await?
            .ok_or_else(|| DocketError::general_error(format!("{} sum overflowed", R::ENTITY)).into_anyhow())
    }

    /// Rows of `children` that point at `parent_id` through `link`.
    ///
    /// The parent is loaded through the scoped path first, so a foreign or
    /// missing parent is `NotFound` rather than an empty list.
    pub async fn related<C, CS, L>(
        &self,
        parent_id: &RecordId,
        children: &ScopedRepository<C, CS>,
        link: L,
    ) -> DocketResult<Vec<C>>
    where
        C: Scoped,
        CS: RecordStore<C>,
        L: Fn(&C) -> &RecordId + Send + Sync + 'static,
    {
        let parent = self.get(parent_id).await?;
        let parent_id = parent.id().clone();
        children
            .find(Query::all().filter(move |child| link(child) == &parent_id))
            .await
    }

    /// Persist `record` for the ambient tenant under a freshly generated id.
    pub async fn create(&self, mut record: R) -> DocketResult<R> {
        let tenant_id = TenantScope::tenant_id()?;
        if record.tenant_id().is_some_and(|t| t != &tenant_id) {
            tracing::warn!(
                entity = R::ENTITY,
                tenant_id = %tenant_id,
                "ignoring caller-supplied tenant id on create"
            );
        }
        record.stamp_tenant(tenant_id);
        record.assign_id(RecordId::generate(R::ENTITY));
        self.store.insert(record).await.map_err(StoreError::into_docket)
    }

    /// Replace a visible row. The id and tenant are kept, whatever `record` says.
    pub async fn update(&self, id: &RecordId, mut record: R) -> DocketResult<R> {
        let (tenant_id, query) = Self::scoped(Query::all())?;
        record.stamp_tenant(tenant_id);
        record.assign_id(id.clone());
        self.store
            .replace(&query, id, record)
            .await
            .map_err(StoreError::into_docket)?
            .ok_or_else(|| Self::not_found(id))
    }

    /// Apply `change` to a visible row. The id and tenant are restored afterwards.
    pub async fn patch<F>(&self, id: &RecordId, change: F) -> DocketResult<R>
    where
        F: FnOnce(&mut R) + Send,
    {
        let mut record = self.get(id).await?;
        change(&mut record);
        self.update(id, record).await
    }

    pub async fn remove(&self, id: &RecordId) -> DocketResult<R> {
        let (_, query) = Self::scoped(Query::all())?;
        self.store
            .delete(&query, id)
            .await
            .map_err(StoreError::into_docket)?
            .ok_or_else(|| Self::not_found(id))
    }

    /// Disable tenant filtering for exactly one operation.
    ///
    /// For platform administration, cross-tenant reconciliation jobs and
    /// isolation assertions in tests. Every call is logged at `WARN` with
    /// `reason`; keep the reason specific enough to review.
    pub fn without_tenant_scope(&self, reason: &'static str) -> Unscoped<'_, R, S> {
        Unscoped {
            repository: self,
            reason,
        }
    }
}

/// Single-use bypass handle. Every method consumes it.
#[must_use = "a bypass handle does nothing until one query is run through it"]
pub struct Unscoped<'a, R, S> {
    repository: &'a ScopedRepository<R, S>,
    reason: &'static str,
}

impl<'a, R, S> Unscoped<'a, R, S>
where
    R: Scoped,
    S: RecordStore<R>,
{
    fn audit(&self, operation: &'static str) {
        let ambient = TenantScope::tenant_id().ok();
        tracing::warn!(
            entity = R::ENTITY,
            operation,
            reason = self.reason,
            ambient_tenant = ambient.as_ref().map(TenantId::as_str).unwrap_or("-"),
            "tenant scope bypassed"
        );
    }

    pub async fn find(self, query: Query<R>) -> DocketResult<Vec<R>> {
        self.audit("find");
        self.repository
            .store
            .select(&query)
            .await
            .map_err(StoreError::into_docket)
    }

    pub async fn get(self, id: &RecordId) -> DocketResult<R> {
        self.audit("get");
        self.repository
            .store
            .fetch(&Query::all(), id)
            .await
            .map_err(StoreError::into_docket)?
            .ok_or_else(|| ScopedRepository::<R, S>::not_found(id))
    }

    pub async fn count(self, query: Query<R>) -> DocketResult<usize> {
        self.audit("count");
        self.repository
            .store
            .count(&query)
            .await
            .map_err(StoreError::into_docket)
    }

    pub async fn aggregate<A, F>(self, query: Query<R>, init: A, fold: F) -> DocketResult<A>
    where
        F: FnMut(A, &R) -> A,
    {
        self.audit("aggregate");
        let rows = self
            .repository
            .store
            .select(&query)
            .await
            .map_err(StoreError::into_docket)?;
        Ok(rows.iter().fold(init, fold))
    }

    /// Replace any row by id. The row keeps the tenant it already belongs to.
    pub async fn update(self, id: &RecordId, mut record: R) -> DocketResult<R> {
        self.audit("update");
        let store = &self.repository.store;
        let existing = store
            .fetch(&Query::all(), id)
            .await
            .map_err(StoreError::into_docket)?
            .ok_or_else(|| ScopedRepository::<R, S>::not_found(id))?;
        let owner = existing
            .tenant_id()
            .cloned()
            .ok_or_else(|| DocketError::general_error(format!("{} {id} has no tenant", R::ENTITY)).into_anyhow())?;

        record.stamp_tenant(owner.clone());
        record.assign_id(id.clone());
        store
            .replace(&Query::all().in_tenant(owner), id, record)
            .await
            .map_err(StoreError::into_docket)?
            .ok_or_else(|| ScopedRepository::<R, S>::not_found(id))
    }

    pub async fn remove(self, id: &RecordId) -> DocketResult<R> {
        self.audit("remove");
        self.repository
            .store
            .delete(&Query::all(), id)
            .await
            .map_err(StoreError::into_docket)?
            .ok_or_else(|| ScopedRepository::<R, S>::not_found(id))
    }
}

#[async_trait]
impl<R, S> DocketService<R> for ScopedRepository<R, S>
where
    R: Scoped,
    S: RecordStore<R> + 'static,
{
    fn capabilities(&self) -> ServiceCapabilities {
        self.capabilities.clone()
    }

    async fn find(&self, page: Page) -> DocketResult<Vec<R>> {
        ScopedRepository::find(self, page.apply(Query::all())).await
    }

    async fn get(&self, id: &str) -> DocketResult<R> {
        ScopedRepository::get(self, &RecordId::from(id)).await
    }

    async fn create(&self, data: R) -> DocketResult<R> {
        ScopedRepository::create(self, data).await
    }

    async fn update(&self, id: &str, data: R) -> DocketResult<R> {
        ScopedRepository::update(self, &RecordId::from(id), data).await
    }

    async fn remove(&self, id: &str) -> DocketResult<R> {
        ScopedRepository::remove(self, &RecordId::from(id)).await
    }
}
