//! # Tenant scope propagation
//!
//! [`TenantScope`] makes a [`TenantContext`] ambient for one unit of work: an
//! HTTP request, a background job, a test case. Any code reached from inside
//! [`TenantScope::run`] can call [`TenantScope::current`] without the context
//! being threaded through its signature.
//!
//! The context lives in tokio task-local storage bound to the *future* that
//! `run` wraps, not to the OS thread:
//!
//! - it survives every `.await` inside the wrapped future, even on a
//!   single-threaded runtime interleaving many requests
//! - two scoped futures polled side by side (`tokio::join!`, separate tasks)
//!   each see only their own context
//! - nested `run` calls shadow the outer context and restore it when the
//!   inner future completes, errors, panics or is dropped
//! - a task started with bare `tokio::spawn` inherits nothing; use
//!   [`TenantScope::spawn`] or [`TenantScope::bind`] to carry the context over
//!
//! There is deliberately no fallback: `current()` outside a scope is an error.
//!
//! ```rust
//! use docket_core::{TenantContext, TenantId, TenantScope};
//!
//! # async fn demo() -> docket_core::DocketResult<()> {
//! let ctx = TenantContext::new(TenantId::parse("firm-1")?);
//! TenantScope::run(ctx, async {
//!     tokio::task::yield_now().await;
//!     assert_eq!(TenantScope::tenant_id()?.as_str(), "firm-1");
//!     Ok::<_, anyhow::Error>(())
//! })
//! .await?;
//!
//! assert!(TenantScope::current().is_err());
//! # Ok(())
//! # }
//! ```

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::context::TenantContext;
use crate::errors::{DocketError, DocketResult};
use crate::tenant::TenantId;

// task_local rather than thread_local: the runtime may move a task between
// threads at an await, and one thread interleaves many tasks.
tokio::task_local! {
    static CURRENT_TENANT: TenantContext;
}

/// Entry points of the propagation engine. Not constructible.
pub struct TenantScope {
    _private: (),
}

impl TenantScope {
    /// Run `operation` with `context` ambient for its whole dynamic extent.
    ///
    /// Returns exactly what `operation` returns.
    pub async fn run<F>(context: TenantContext, operation: F) -> F::Output
    where
        F: Future,
    {
        let span = tracing::debug_span!("tenant_scope", tenant_id = %context.tenant_id());
        CURRENT_TENANT.scope(context, operation).instrument(span).await
    }

    /// Validate a raw tenant id, then behave like [`TenantScope::run`].
    ///
    /// An invalid id fails with `InvalidTenant` and `operation` is never polled.
    pub async fn open<F, T>(raw_tenant_id: &str, operation: F) -> DocketResult<T>
    where
        F: Future<Output = DocketResult<T>>,
    {
        let tenant_id = TenantId::parse(raw_tenant_id)?;
        Self::run(TenantContext::new(tenant_id), operation).await
    }

    /// Synchronous scope for seed scripts and fixtures.
    pub fn run_sync<F, R>(context: TenantContext, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _entered = tracing::debug_span!("tenant_scope", tenant_id = %context.tenant_id()).entered();
        CURRENT_TENANT.sync_scope(context, f)
    }

    /// The ambient context, or `NoTenantContext` if no scope is open.
    pub fn current() -> DocketResult<TenantContext> {
        Self::with_current(TenantContext::clone)
    }

    /// Borrow the ambient context without cloning it.
    pub fn with_current<F, R>(f: F) -> DocketResult<R>
    where
        F: FnOnce(&TenantContext) -> R,
    {
        CURRENT_TENANT.try_with(f).map_err(|_| {
            DocketError::no_tenant_context("no tenant scope is open on this call path").into_anyhow()
        })
    }

    /// Shorthand for the ambient tenant id.
    pub fn tenant_id() -> DocketResult<TenantId> {
        Self::with_current(|ctx| ctx.tenant_id().clone())
    }

    /// Diagnostic only. Data access must go through [`TenantScope::current`].
    pub fn is_open() -> bool {
        CURRENT_TENANT.try_with(|_| ()).is_ok()
    }

    /// Spawn a task that runs under the current context.
    pub fn spawn<F>(operation: F) -> DocketResult<JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let context = Self::current()?;
        Ok(tokio::spawn(Self::run(context, operation)))
    }

    /// Wrap `operation` so it runs under the current context wherever it is
    /// polled (e.g. inside `join_all`).
    pub fn bind<F>(operation: F) -> DocketResult<impl Future<Output = F::Output>>
    where
        F: Future,
    {
        let context = Self::current()?;
        Ok(Self::run(context, operation))
    }
}
