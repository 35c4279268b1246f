mod app;
pub mod entities;
pub mod reports;
pub mod seed;
pub mod services;

use anyhow::Result;
use docket_core::DocketConfig;

pub use app::{default_config, FirmApp};

pub fn build(config: &DocketConfig) -> Result<FirmApp> {
    let firm = app::firm_app(config)?;
    tracing::debug!(
        host = firm.config.get("http.host").unwrap_or("-"),
        "firm app built"
    );
    Ok(firm)
}
