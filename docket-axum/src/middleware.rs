//! Inbound tenant resolution.
//!
//! Every request that reaches a scoped route passes through [`tenant_layer`]:
//! the tenant is read from a header or the `Host` subdomain, resolved against
//! the directory, and the rest of the request runs inside a tenant scope.
//! Nothing downstream ever sees a request without a context.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use docket_core::{DocketError, DocketResult, TenancyConfig, TenantScope, TenantSource};

use crate::{DocketAxumError, TenancyState};

pub async fn tenant_layer(
    State(state): State<TenancyState>,
    req: Request,
    next: Next,
) -> Result<Response, DocketAxumError> {
    let raw_tenant = tenant_from_request(&state.config, req.headers())?;
    let raw_user = header_str(req.headers(), &state.config.user_header)?;

    if state.config.require_user && raw_user.is_none() {
        return Err(DocketError::forbidden("An acting user is required").into());
    }

    let ctx = state.resolver.resolve(&raw_tenant, raw_user.as_deref()).await?;
    tracing::debug!(
        tenant_id = %ctx.tenant_id(),
        user_id = ctx.user_id().map(|u| u.as_str()).unwrap_or("-"),
        method = %req.method(),
        uri = %req.uri(),
        "request scoped to tenant"
    );

    Ok(TenantScope::run(ctx, next.run(req)).await)
}

/// The raw tenant identifier of a request, per the configured source.
pub fn tenant_from_request(config: &TenancyConfig, headers: &HeaderMap) -> DocketResult<String> {
    match config.source {
        TenantSource::Header => header_str(headers, &config.header)?.ok_or_else(|| {
            DocketError::bad_request(format!("Missing tenant identifier header '{}'", config.header)).into_anyhow()
        }),
        TenantSource::Subdomain => {
            let base = config.base_domain.as_deref().ok_or_else(|| {
                DocketError::general_error("tenancy.base_domain is not configured").into_anyhow()
            })?;
            let host = header_str(headers, header::HOST.as_str())?
                .ok_or_else(|| DocketError::bad_request("Missing Host header").into_anyhow())?;
            subdomain_of(&host, base).ok_or_else(|| {
                DocketError::bad_request(format!("Host '{host}' does not name an account under {base}")).into_anyhow()
            })
        }
    }
}

/// `acme.docket.test:8080` under `docket.test` is `acme`. Only one label is
/// accepted, so `a.b.docket.test` does not resolve.
fn subdomain_of(host: &str, base: &str) -> Option<String> {
    let host = host.split(':').next()?.trim_end_matches('.').to_ascii_lowercase();
    let base = base.trim_end_matches('.').to_ascii_lowercase();
    let label = host.strip_suffix(base.as_str())?.strip_suffix('.')?;
    if label.is_empty() || label.contains('.') {
        return None;
    }
    Some(label.to_string())
}

fn header_str(headers: &HeaderMap, name: &str) -> DocketResult<Option<String>> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.to_string()))
            .map_err(|_| DocketError::bad_request(format!("Header '{name}' is not valid text")).into_anyhow()),
    }
}
