//! # Configuration
//!
//! A string key/value store with snapshots, plus typed views over the keys
//! the tenancy layer reads.
//!
//! ```rust
//! use docket_core::DocketConfig;
//!
//! let mut config = DocketConfig::new();
//! config.set("tenancy.source", "subdomain");
//! config.set("tenancy.base_domain", "docket.law");
//!
//! let tenancy = docket_core::TenancyConfig::from_snapshot(&config.snapshot()).unwrap();
//! assert_eq!(tenancy.base_domain.as_deref(), Some("docket.law"));
//! ```
//!
//! Environment overrides use a prefix and `__` as the key separator:
//! `DOCKET__TENANCY__HEADER=x-firm` sets `tenancy.header`.

use std::collections::HashMap;

use crate::errors::{DocketError, DocketResult};

#[derive(Debug, Default)]
pub struct DocketConfig {
    values: HashMap<String, String>,
}

impl DocketConfig {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn snapshot(&self) -> DocketConfigSnapshot {
        DocketConfigSnapshot::new(self.values.clone())
    }

    /// Apply `PREFIX` + `A__B` environment variables as `a.b` keys.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_vars(prefix, std::env::vars());
    }

    fn load_vars<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                tracing::debug!(key = %normalized, "config override from environment");
                self.set(normalized, value);
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocketConfigSnapshot {
    map: HashMap<String, String>,
}

impl DocketConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.parse::<bool>().ok())
    }
}

/// Where the inbound layer finds the tenant id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantSource {
    /// A request header, `tenancy.header`.
    Header,
    /// The leftmost label of `Host` under `tenancy.base_domain`.
    Subdomain,
}

/// Typed view of the `tenancy.*` keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenancyConfig {
    pub source: TenantSource,
    pub header: String,
    pub user_header: String,
    pub base_domain: Option<String>,
    pub require_user: bool,
    pub page_default: usize,
    pub page_max: usize,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            source: TenantSource::Header,
            header: "x-tenant-id".to_string(),
            user_header: "x-user-id".to_string(),
            base_domain: None,
            require_user: false,
            page_default: 25,
            page_max: 200,
        }
    }
}

impl TenancyConfig {
    pub fn from_snapshot(snapshot: &DocketConfigSnapshot) -> DocketResult<Self> {
        let defaults = Self::default();

        let source = match snapshot.get("tenancy.source") {
            None | Some("header") => TenantSource::Header,
            Some("subdomain") => TenantSource::Subdomain,
            Some(other) => {
                return Err(DocketError::general_error(format!(
                    "tenancy.source must be 'header' or 'subdomain', got '{other}'"
                ))
                .into_anyhow())
            }
        };

        let base_domain = snapshot.get_string("tenancy.base_domain");
        if source == TenantSource::Subdomain && base_domain.is_none() {
            return Err(DocketError::general_error(
                "tenancy.base_domain is required when tenancy.source = subdomain",
            )
            .into_anyhow());
        }

        Ok(Self {
            source,
            header: snapshot
                .get_string("tenancy.header")
                .unwrap_or(defaults.header)
                .to_lowercase(),
            user_header: snapshot
                .get_string("tenancy.user_header")
                .unwrap_or(defaults.user_header)
                .to_lowercase(),
            base_domain: base_domain.map(|d| d.to_lowercase()),
            require_user: snapshot
                .get_bool("tenancy.require_user")
                .unwrap_or(defaults.require_user),
            page_default: snapshot
                .get_usize("paginate.default")
                .unwrap_or(defaults.page_default),
            page_max: snapshot
                .get_usize("paginate.max")
                .unwrap_or(defaults.page_max),
        })
    }
}
