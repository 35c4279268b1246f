use std::sync::Arc;

use docket_core::{DocketError, DocketResult, DocketService, ScopedRepository};
use tokio::sync::RwLock;
use validator::Validate;

use crate::entities::{Case, Client, Deadline, Document, TimeEntry};

pub mod clients;
pub mod linked;
pub mod routes;

pub use clients::ClientsService;
pub use linked::LinkedService;

/// Held shared by child writes and exclusively by a parent removal that
/// checks for children.
pub type LinkGate = Arc<RwLock<()>>;

/// One scoped repository per firm entity.
#[derive(Clone, Default)]
pub struct FirmServices {
    pub clients: ScopedRepository<Client>,
    pub cases: ScopedRepository<Case>,
    pub deadlines: ScopedRepository<Deadline>,
    pub documents: ScopedRepository<Document>,
    pub time_entries: ScopedRepository<TimeEntry>,
    case_links: LinkGate,
}

impl FirmServices {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn clients_service(&self) -> Arc<dyn DocketService<Client>> {
        Arc::new(ClientsService::new(
            self.clients.clone(),
            self.cases.clone(),
            Arc::clone(&self.case_links),
        ))
    }

    pub fn cases_service(&self) -> Arc<dyn DocketService<Case>> {
        Arc::new(LinkedService::new(self.cases.clone(), self.clients.clone()).guarded_by(Arc::clone(&self.case_links)))
    }

    pub fn deadlines_service(&self) -> Arc<dyn DocketService<Deadline>> {
        Arc::new(LinkedService::new(self.deadlines.clone(), self.cases.clone()))
    }

    pub fn documents_service(&self) -> Arc<dyn DocketService<Document>> {
        Arc::new(LinkedService::new(self.documents.clone(), self.cases.clone()))
    }

    pub fn time_entries_service(&self) -> Arc<dyn DocketService<TimeEntry>> {
        Arc::new(LinkedService::new(self.time_entries.clone(), self.cases.clone()))
    }
}

/// Run `validator` rules, reporting failures as a `BadRequest` with the
/// field errors attached.
pub(crate) fn validate<R: Validate>(record: &R) -> DocketResult<()> {
    record.validate().map_err(|errors| {
        let data = serde_json::to_value(&errors).unwrap_or_default();
        DocketError::bad_request("Validation failed")
            .with_data(data)
            .into_anyhow()
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use docket_core::{RecordId, TenantContext, TenantId, TenantScope};

    use super::*;
    use crate::entities::CaseStatus;

    fn ctx() -> TenantContext {
        TenantContext::new(TenantId::parse("f1").unwrap())
    }

    #[tokio::test]
    async fn case_writes_wait_for_a_client_removal_in_progress() {
        let services = FirmServices::in_memory();
        let client = TenantScope::run(
            ctx(),
            services.clients_service().create(Client {
                id: RecordId::default(),
                tenant_id: None,
                name: "Acme".into(),
                email: None,
            }),
        )
        .await
        .unwrap();

        let removal = services.case_links.write().await;
        let cases = services.cases_service();
        let pending = TenantScope::run(ctx(), async {
            TenantScope::spawn(async move {
                cases
                    .create(Case {
                        id: RecordId::default(),
                        tenant_id: None,
                        client_id: client.id.clone(),
                        title: "Acme v. Initech".into(),
                        status: CaseStatus::Open,
                    })
                    .await
            })
        })
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!pending.is_finished());

        drop(removal);
        let case = pending.await.unwrap().unwrap();
        assert_eq!(case.tenant_id.as_ref().map(TenantId::as_str), Some("f1"));
    }
}
