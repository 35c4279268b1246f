use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query},
    routing::MethodRouter,
    Json, Router,
};
use docket_core::{DocketError, DocketResult, DocketService, Page, ServiceMethodKind};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::DocketAxumError;

/// Default and maximum page size for `find`.
#[derive(Debug, Clone, Copy)]
pub struct Paging {
    pub default: usize,
    pub max: usize,
}

impl Default for Paging {
    fn default() -> Self {
        Self { default: 25, max: 200 }
    }
}

/// Read `$skip` / `$limit` from the query string.
fn page_from_query(query: &HashMap<String, String>, paging: Paging) -> DocketResult<Page> {
    let number = |key: &str| -> DocketResult<Option<usize>> {
        match query.get(key) {
            None => Ok(None),
            Some(raw) => raw.parse::<usize>().map(Some).map_err(|_| {
                DocketError::bad_request(format!("{key} must be a non-negative integer")).into_anyhow()
            }),
        }
    };

    let page = Page {
        skip: number("$skip")?.unwrap_or(0),
        limit: number("$limit")?,
    };
    Ok(page.clamped(paging.default, paging.max))
}

/// Shallow merge of `patch` into `current`. Keys set to `null` are cleared.
fn merge(current: &mut Value, patch: Value) -> DocketResult<()> {
    let (Value::Object(target), Value::Object(changes)) = (current, patch) else {
        return Err(DocketError::bad_request("PATCH body must be a JSON object").into_anyhow());
    };
    for (key, value) in changes {
        target.insert(key, value);
    }
    Ok(())
}

/// REST routes for one service: `/` (find, create) and `/{id}` (get, update,
/// patch, remove). Only methods the service's capabilities allow are mounted;
/// the others answer 405.
///
/// Handlers never see a tenant. They run inside the scope the tenant layer
/// opened, and the service reads it from there.
pub fn service_router<R>(service: Arc<dyn DocketService<R>>, paging: Paging) -> Router<()>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let caps = service.capabilities();
    let mut collection: MethodRouter<()> = MethodRouter::new();
    let mut item: MethodRouter<()> = MethodRouter::new();

    if caps.allows(ServiceMethodKind::Find) {
        let svc = Arc::clone(&service);
        collection = collection.get(move |Query(query): Query<HashMap<String, String>>| {
            let svc = Arc::clone(&svc);
            async move {
                let page = page_from_query(&query, paging)?;
                let res = svc.find(page).await?;
                Ok::<_, DocketAxumError>(Json(res))
            }
        });
    }

    if caps.allows(ServiceMethodKind::Create) {
        let svc = Arc::clone(&service);
        collection = collection.post(move |data: Result<Json<R>, JsonRejection>| {
            let svc = Arc::clone(&svc);
            async move {
                let Json(data) = data?;
                let res = svc.create(data).await?;
                Ok::<_, DocketAxumError>(Json(res))
            }
        });
    }

    if caps.allows(ServiceMethodKind::Get) {
        let svc = Arc::clone(&service);
        item = item.get(move |Path(id): Path<String>| {
            let svc = Arc::clone(&svc);
            async move {
                let res = svc.get(&id).await?;
                Ok::<_, DocketAxumError>(Json(res))
            }
        });
    }

    if caps.allows(ServiceMethodKind::Update) {
        let svc = Arc::clone(&service);
        item = item.put(move |Path(id): Path<String>, data: Result<Json<R>, JsonRejection>| {
            let svc = Arc::clone(&svc);
            async move {
                let Json(data) = data?;
                let res = svc.update(&id, data).await?;
                Ok::<_, DocketAxumError>(Json(res))
            }
        });
    }

    if caps.allows(ServiceMethodKind::Get) && caps.allows(ServiceMethodKind::Update) {
        let svc = Arc::clone(&service);
        item = item.patch(move |Path(id): Path<String>, data: Result<Json<Value>, JsonRejection>| {
            let svc = Arc::clone(&svc);
            async move {
                let Json(changes) = data?;
                let current = svc.get(&id).await?;

                let mut merged = serde_json::to_value(&current).map_err(anyhow::Error::from)?;
                merge(&mut merged, changes)?;
                let record: R = serde_json::from_value(merged).map_err(|e| {
                    DocketError::bad_request(format!("PATCH produced an invalid record: {e}")).into_anyhow()
                })?;

                let res = svc.update(&id, record).await?;
                Ok::<_, DocketAxumError>(Json(res))
            }
        });
    }

    if caps.allows(ServiceMethodKind::Remove) {
        let svc = Arc::clone(&service);
        item = item.delete(move |Path(id): Path<String>| {
            let svc = Arc::clone(&svc);
            async move {
                let res = svc.remove(&id).await?;
                Ok::<_, DocketAxumError>(Json(res))
            }
        });
    }

    Router::new().route("/", collection).route("/{id}", item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn paging_defaults_and_caps() {
        let paging = Paging { default: 10, max: 50 };
        assert_eq!(
            page_from_query(&query(&[]), paging).unwrap(),
            Page { skip: 0, limit: Some(10) }
        );
        assert_eq!(
            page_from_query(&query(&[("$skip", "5"), ("$limit", "500")]), paging).unwrap(),
            Page { skip: 5, limit: Some(50) }
        );
        assert!(page_from_query(&query(&[("$limit", "-1")]), paging).is_err());
    }

    #[test]
    fn merge_overwrites_top_level_keys() {
        let mut current = json!({"id": "c-1", "name": "Alice", "email": "a@x"});
        merge(&mut current, json!({"name": "Alice B", "email": null})).unwrap();
        assert_eq!(current, json!({"id": "c-1", "name": "Alice B", "email": null}));

        assert!(merge(&mut current, json!(["not", "an", "object"])).is_err());
    }
}
