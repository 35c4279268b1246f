use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = docket_firm::default_config();
    config.load_env("DOCKET__");

    let firm = docket_firm::build(&config)?;

    if firm.config.get_bool("demo.seed").unwrap_or(false) {
        docket_firm::seed::seed_demo(&firm.directory, &firm.services).await?;
        let totals = docket_firm::reports::platform_totals(&firm.services).await?;
        tracing::info!(clients = totals.clients, cases = totals.cases, "demo data loaded");
    }

    let host = firm
        .config
        .get_string("http.host")
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = firm
        .config
        .get_string("http.port")
        .unwrap_or_else(|| "3036".to_string());
    let addr = format!("{host}:{port}");

    tracing::info!("[docket] listening on http://{addr}");

    firm.ax.listen(addr).await?;

    Ok(())
}
