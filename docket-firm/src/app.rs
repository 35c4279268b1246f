use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use docket_axum::{axum, AxumApp};
use docket_core::{DocketConfig, DocketConfigSnapshot, MemoryDirectory, TenancyConfig};

use crate::services::{routes, FirmServices};

/// The assembled application plus handles tests and the binary need.
pub struct FirmApp {
    pub ax: AxumApp,
    pub directory: Arc<MemoryDirectory>,
    pub services: FirmServices,
    pub config: DocketConfigSnapshot,
}

pub fn default_config() -> DocketConfig {
    let mut config = DocketConfig::new();
    config.set("http.host", "127.0.0.1");
    config.set("http.port", "3036");
    config.set("tenancy.source", "header");
    config.set("demo.seed", "true");
    config
}

pub fn firm_app(config: &DocketConfig) -> Result<FirmApp> {
    let snapshot = config.snapshot();
    let tenancy = TenancyConfig::from_snapshot(&snapshot)?;

    let directory = Arc::new(MemoryDirectory::new());
    let services = FirmServices::in_memory();

    let ax: AxumApp = axum(directory.clone(), tenancy)
        .use_public(Router::new().route("/health", get(|| async { "ok" })))
        .use_service_with("/clients", services.clients_service(), routes::client_routes(&services))
        .use_service_with("/cases", services.cases_service(), routes::case_routes(&services))
        .use_service("/deadlines", services.deadlines_service())
        .use_service("/documents", services.documents_service())
        .use_service("/time-entries", services.time_entries_service());

    Ok(FirmApp {
        ax,
        directory,
        services,
        config: snapshot,
    })
}
