use std::sync::Arc;

use docket_core::{TenancyConfig, TenantDirectory, TenantResolver};

/// Shared state of the tenant middleware.
#[derive(Clone)]
pub struct TenancyState {
    pub resolver: TenantResolver<dyn TenantDirectory>,
    pub config: Arc<TenancyConfig>,
}

impl TenancyState {
    pub fn new(directory: Arc<dyn TenantDirectory>, config: TenancyConfig) -> Self {
        Self {
            resolver: TenantResolver::new(directory),
            config: Arc::new(config),
        }
    }
}
