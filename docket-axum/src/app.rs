use std::sync::Arc;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::from_fn_with_state;
use axum::Router;
use docket_core::{DocketService, TenancyConfig, TenantDirectory};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::rest::{self, Paging};
use crate::{tenant_layer, TenancyState};

#[derive(Clone, Copy, Default)]
struct RequestUuid;

impl MakeRequestId for RequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Builder for the HTTP surface.
///
/// Routes added with `use_service*` / `use_router` are tenant-scoped: the
/// tenant layer runs in front of them. `use_public` routes are not, and must
/// not touch tenant data.
#[derive(Clone)]
pub struct AxumApp {
    pub tenancy: TenancyState,
    scoped: Router<()>,
    has_scoped_routes: bool,
    public: Router<()>,
}

impl AxumApp {
    pub fn new(directory: Arc<dyn TenantDirectory>, config: TenancyConfig) -> Self {
        Self {
            tenancy: TenancyState::new(directory, config),
            scoped: Router::new(),
            has_scoped_routes: false,
            public: Router::new(),
        }
    }

    fn paging(&self) -> Paging {
        Paging {
            default: self.tenancy.config.page_default,
            max: self.tenancy.config.page_max,
        }
    }

    /// Nest a tenant-scoped router under `path`.
    pub fn use_router(mut self, path: &str, router: Router<()>) -> Self {
        self.scoped = self.scoped.nest(path, router);
        self.has_scoped_routes = true;
        self
    }

    /// Merge routes that run without a tenant (health checks, status).
    pub fn use_public(mut self, router: Router<()>) -> Self {
        self.public = self.public.merge(router);
        self
    }

    /// Mount `service` as REST under `path`.
    pub fn use_service<R>(self, path: &str, service: Arc<dyn DocketService<R>>) -> Self
    where
        R: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.use_service_with(path, service, Router::new())
    }

    /// Like [`AxumApp::use_service`], plus service-specific routes
    /// (e.g. `/{id}/deadlines`) merged under the same path.
    pub fn use_service_with<R>(self, path: &str, service: Arc<dyn DocketService<R>>, extra: Router<()>) -> Self
    where
        R: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        tracing::debug!(path, "mounting service");
        let router = rest::service_router(service, self.paging()).merge(extra);
        self.use_router(path, router)
    }

    /// The assembled router: request ids, tracing, then the tenant layer in
    /// front of every scoped route.
    pub fn router(&self) -> Router {
        // route_layer: unknown paths stay 404 instead of failing resolution
        let mut router = self.public.clone();
        if self.has_scoped_routes {
            let scoped = self
                .scoped
                .clone()
                .route_layer(from_fn_with_state(self.tenancy.clone(), tenant_layer));
            router = router.merge(scoped);
        }

        router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(RequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|req: &Request| {
                    let request_id = req
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http",
                        method = %req.method(),
                        uri = %req.uri(),
                        request_id = %request_id
                    )
                }))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

pub fn axum(directory: Arc<dyn TenantDirectory>, config: TenancyConfig) -> AxumApp {
    AxumApp::new(directory, config)
}
