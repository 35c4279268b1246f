use async_trait::async_trait;
use docket_core::{
    DocketError, DocketResult, DocketService, ErrorKind, Page, Query, RecordId, Scoped, ScopedRepository,
    ServiceCapabilities,
};
use validator::Validate;

use crate::entities::Linked;

use super::{validate, LinkGate};

/// Service for a record that points at a parent (a case's client, a
/// deadline's case). Writes are refused unless the parent is visible to the
/// current tenant, so a forged foreign id reads exactly like a missing one.
pub struct LinkedService<C, P> {
    records: ScopedRepository<C>,
    parents: ScopedRepository<P>,
    gate: Option<LinkGate>,
}

impl<C, P> LinkedService<C, P>
where
    C: Scoped + Linked + Validate,
    P: Scoped,
{
    pub fn new(records: ScopedRepository<C>, parents: ScopedRepository<P>) -> Self {
        Self {
            records,
            parents,
            gate: None,
        }
    }

    /// Hold `gate` shared while the parent is checked and the row written,
    /// so a parent removal holding it exclusively cannot interleave.
    pub fn guarded_by(mut self, gate: LinkGate) -> Self {
        self.gate = Some(gate);
        self
    }

    async fn check(&self, record: &C) -> DocketResult<()> {
        validate(record)?;
        let parent_id = record.parent_id();
        match self.parents.get(parent_id).await {
            Ok(_) => Ok(()),
            Err(e) if DocketError::kind_of(&e) == Some(ErrorKind::NotFound) => Err(DocketError::bad_request(
                format!("{} {parent_id} does not exist", P::ENTITY),
            )
            .into_anyhow()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<C, P> DocketService<C> for LinkedService<C, P>
where
    C: Scoped + Linked + Validate,
    P: Scoped,
{
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::standard_crud()
    }

    async fn find(&self, page: Page) -> DocketResult<Vec<C>> {
        self.records.find(page.apply(Query::all())).await
    }

    async fn get(&self, id: &str) -> DocketResult<C> {
        self.records.get(&RecordId::from(id)).await
    }

    async fn create(&self, data: C) -> DocketResult<C> {
        let _link = match &self.gate {
            Some(gate) => Some(gate.read().await),
            None => None,
        };
        self.check(&data).await?;
        let created = self.records.create(data).await?;
        tracing::info!(entity = C::ENTITY, id = %created.id(), "created");
        Ok(created)
    }

    async fn update(&self, id: &str, data: C) -> DocketResult<C> {
        let _link = match &self.gate {
            Some(gate) => Some(gate.read().await),
            None => None,
        };
        self.check(&data).await?;
        self.records.update(&RecordId::from(id), data).await
    }

    async fn remove(&self, id: &str) -> DocketResult<C> {
        self.records.remove(&RecordId::from(id)).await
    }
}
