//! # Errors
//!
//! Docket uses one structured error, [`DocketError`], carried inside
//! `anyhow::Error` so it flows unchanged through services, repositories and
//! the scope engine. The transport layer downcasts it and decides how to
//! serialize it.
//!
//! The tenancy kinds split into two families:
//! - configuration errors (`NoTenantContext`, `InvalidTenant`): programming
//!   mistakes that must stay loud all the way up to the request boundary
//! - tenant availability errors (`TenantSuspended`, `TenantInactive`): the
//!   tenant exists but cannot be used, and its members get an actionable reason
//!
//! A row belonging to another tenant is always reported as `NotFound`, never
//! `Forbidden`.

use std::fmt;

use anyhow::Error as AnyError;

/// A convenience result type for Docket core APIs.
pub type DocketResult<T> = std::result::Result<T, AnyError>;

/// Error classes with their transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,      // 400
    Forbidden,       // 403
    NotFound,        // 404
    Conflict,        // 409
    TenantInactive,  // 410
    TenantSuspended, // 423
    NoTenantContext, // 500
    InvalidTenant,   // 500
    GeneralError,    // 500
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::TenantInactive => 410,
            ErrorKind::TenantSuspended => 423,
            ErrorKind::NoTenantContext
            | ErrorKind::InvalidTenant
            | ErrorKind::GeneralError => 500,
        }
    }

    /// Error `name` (e.g. "NotFound")
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::TenantInactive => "TenantInactive",
            ErrorKind::TenantSuspended => "TenantSuspended",
            ErrorKind::NoTenantContext => "NoTenantContext",
            ErrorKind::InvalidTenant => "InvalidTenant",
            ErrorKind::GeneralError => "GeneralError",
        }
    }

    /// Kebab-cased `className`
    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::TenantInactive => "tenant-inactive",
            ErrorKind::TenantSuspended => "tenant-suspended",
            ErrorKind::NoTenantContext => "no-tenant-context",
            ErrorKind::InvalidTenant => "invalid-tenant",
            ErrorKind::GeneralError => "general-error",
        }
    }

    /// Programming errors that must never be downgraded into a business outcome.
    pub fn is_configuration(&self) -> bool {
        matches!(self, ErrorKind::NoTenantContext | ErrorKind::InvalidTenant)
    }
}

#[cfg(feature = "serde")]
pub type ErrorValue = serde_json::Value;

#[cfg(not(feature = "serde"))]
pub type ErrorValue = std::sync::Arc<dyn std::any::Any + Send + Sync>;

/// A structured Docket error that can live inside `anyhow::Error`.
#[derive(Debug)]
pub struct DocketError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<ErrorValue>,
    pub source: Option<AnyError>,
}

impl DocketError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            source: None,
        }
    }

    pub fn with_data(mut self, data: ErrorValue) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    pub fn is_configuration(&self) -> bool {
        self.kind.is_configuration()
    }

    /// Convert into `anyhow::Error`.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Find a `DocketError` anywhere in an `anyhow` chain.
    pub fn from_anyhow(err: &AnyError) -> Option<&DocketError> {
        err.chain().find_map(|e| e.downcast_ref::<DocketError>())
    }

    /// The kind of a Docket error inside `err`, if there is one.
    pub fn kind_of(err: &AnyError) -> Option<ErrorKind> {
        Self::from_anyhow(err).map(|e| e.kind)
    }

    /// Turn any error into a DocketError:
    /// - if it already is one, keep it
    /// - otherwise wrap as GeneralError
    pub fn normalize(err: AnyError) -> DocketError {
        match err.downcast::<DocketError>() {
            Ok(docket) => docket,
            Err(other) => {
                DocketError::new(ErrorKind::GeneralError, other.to_string()).with_source(other)
            }
        }
    }

    /// Copy suitable for clients: drops the inner `source`, and replaces the
    /// message of 500-class errors so internals never reach the wire.
    pub fn sanitize_for_client(&self) -> DocketError {
        let message = if self.code() >= 500 {
            "Internal server error".to_string()
        } else {
            self.message.clone()
        };
        DocketError {
            kind: self.kind,
            message,
            data: if self.code() >= 500 { None } else { self.data.clone() },
            source: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, msg)
    }
    pub fn tenant_inactive(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::TenantInactive, msg)
    }
    pub fn tenant_suspended(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::TenantSuspended, msg)
    }
    pub fn no_tenant_context(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoTenantContext, msg)
    }
    pub fn invalid_tenant(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidTenant, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
}

impl fmt::Display for DocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for DocketError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(feature = "serde")]
impl DocketError {
    /// JSON payload for transports.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;

        let mut base = json!({
            "name": self.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.class_name(),
        });

        if let Some(d) = &self.data {
            base["data"] = d.clone();
        }
        base
    }
}

/// Bail with a `DocketError`.
#[macro_export]
macro_rules! bail_docket {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::DocketError::$ctor($msg).into_anyhow())
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::DocketError::$ctor(format!($fmt, $($arg)*)).into_anyhow())
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_found_through_context_layers() {
        let err = DocketError::not_found("Client not found: c-1")
            .into_anyhow()
            .context("loading client");

        assert_eq!(DocketError::kind_of(&err), Some(ErrorKind::NotFound));
    }

    #[test]
    fn configuration_errors_are_flagged() {
        assert!(ErrorKind::NoTenantContext.is_configuration());
        assert!(ErrorKind::InvalidTenant.is_configuration());
        assert!(!ErrorKind::NotFound.is_configuration());
        assert!(!ErrorKind::TenantSuspended.is_configuration());
    }

    #[test]
    fn sanitize_hides_internal_messages() {
        let err = DocketError::no_tenant_context("no tenant scope is open for ClientRepository::find");
        let safe = err.sanitize_for_client();
        assert_eq!(safe.code(), 500);
        assert_eq!(safe.message, "Internal server error");

        let err = DocketError::tenant_suspended("Account suspended: unpaid invoice");
        assert_eq!(err.sanitize_for_client().message, "Account suspended: unpaid invoice");
    }

    #[test]
    fn normalize_wraps_foreign_errors() {
        let err = DocketError::normalize(anyhow::anyhow!("boom"));
        assert_eq!(err.kind, ErrorKind::GeneralError);
        assert!(err.source.is_some());
    }
}
