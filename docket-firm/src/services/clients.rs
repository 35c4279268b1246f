use async_trait::async_trait;
use docket_core::{DocketError, DocketResult, DocketService, Page, Query, RecordId, ScopedRepository};

use crate::entities::{Case, Client};

use super::{validate, LinkGate};

pub struct ClientsService {
    clients: ScopedRepository<Client>,
    cases: ScopedRepository<Case>,
    case_links: LinkGate,
}

impl ClientsService {
    /// `case_links` must be the gate the cases service is guarded by.
    pub fn new(clients: ScopedRepository<Client>, cases: ScopedRepository<Case>, case_links: LinkGate) -> Self {
        Self {
            clients,
            cases,
            case_links,
        }
    }
}

#[async_trait]
impl DocketService<Client> for ClientsService {
    async fn find(&self, page: Page) -> DocketResult<Vec<Client>> {
        self.clients.find(page.apply(Query::all())).await
    }

    async fn get(&self, id: &str) -> DocketResult<Client> {
        self.clients.get(&RecordId::from(id)).await
    }

    async fn create(&self, data: Client) -> DocketResult<Client> {
        validate(&data)?;
        self.clients.create(data).await
    }

    async fn update(&self, id: &str, data: Client) -> DocketResult<Client> {
        validate(&data)?;
        self.clients.update(&RecordId::from(id), data).await
    }

    /// Clients with cases on file are kept. Case writes wait until the
    /// count and the delete are done.
    async fn remove(&self, id: &str) -> DocketResult<Client> {
        let _links = self.case_links.write().await;
        let id = RecordId::from(id);
        self.clients.get(&id).await?;

        let owned = id.clone();
        let cases = self
            .cases
            .count(Query::all().filter(move |c: &Case| c.client_id == owned))
            .await?;
        if cases > 0 {
            return Err(DocketError::conflict(format!("client {id} still has {cases} case(s)")).into_anyhow());
        }

        self.clients.remove(&id).await
    }
}
