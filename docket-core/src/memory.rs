use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::entity::{RecordId, Scoped};
use crate::store::{Query, RecordStore, StoreError, StoreResult};

struct Rows<R> {
    next_seq: u64,
    by_id: HashMap<RecordId, (u64, R)>,
}

/// In-memory [`RecordStore`] for tests, demos and seed data.
///
/// Rows keep insertion order. The lock is never held across an await.
pub struct MemoryStore<R> {
    rows: RwLock<Rows<R>>,
}

impl<R> MemoryStore<R> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Rows {
                next_seq: 0,
                by_id: HashMap::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Scoped> MemoryStore<R> {
    fn ordered_matches(&self, query: &Query<R>) -> Vec<R> {
        let rows = self.rows.read();
        let mut hits: Vec<&(u64, R)> = rows
            .by_id
            .values()
            .filter(|(_, row)| query.matches(row))
            .collect();
        hits.sort_by_key(|(seq, _)| *seq);
        hits.into_iter().map(|(_, row)| row.clone()).collect()
    }
}

#[async_trait]
impl<R: Scoped> RecordStore<R> for MemoryStore<R> {
    async fn fetch(&self, query: &Query<R>, id: &RecordId) -> StoreResult<Option<R>> {
        let rows = self.rows.read();
        Ok(rows
            .by_id
            .get(id)
            .map(|(_, row)| row)
            .filter(|row| query.matches(row))
            .cloned())
    }

    async fn select(&self, query: &Query<R>) -> StoreResult<Vec<R>> {
        let hits = self.ordered_matches(query).into_iter().skip(query.skip_count());
        Ok(match query.limit_count() {
            Some(limit) => hits.take(limit).collect(),
            None => hits.collect(),
        })
    }

    async fn count(&self, query: &Query<R>) -> StoreResult<usize> {
        let rows = self.rows.read();
        Ok(rows.by_id.values().filter(|(_, row)| query.matches(row)).count())
    }

    async fn insert(&self, record: R) -> StoreResult<R> {
        if record.tenant_id().is_none() {
            return Err(StoreError::MissingTenant {
                entity: R::ENTITY,
                id: record.id().clone(),
            });
        }

        let mut rows = self.rows.write();
        if rows.by_id.contains_key(record.id()) {
            return Err(StoreError::Duplicate {
                entity: R::ENTITY,
                id: record.id().clone(),
            });
        }

        let seq = rows.next_seq;
        rows.next_seq += 1;
        rows.by_id.insert(record.id().clone(), (seq, record.clone()));
        Ok(record)
    }

    async fn replace(&self, query: &Query<R>, id: &RecordId, record: R) -> StoreResult<Option<R>> {
        if record.tenant_id().is_none() {
            return Err(StoreError::MissingTenant {
                entity: R::ENTITY,
                id: id.clone(),
            });
        }

        let mut rows = self.rows.write();
        match rows.by_id.get_mut(id) {
            Some((_, existing)) if query.matches(existing) => {
                *existing = record.clone();
                Ok(Some(record))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, query: &Query<R>, id: &RecordId) -> StoreResult<Option<R>> {
        let mut rows = self.rows.write();
        let visible = rows
            .by_id
            .get(id)
            .map(|(_, row)| query.matches(row))
            .unwrap_or(false);
        if !visible {
            return Ok(None);
        }
        Ok(rows.by_id.remove(id).map(|(_, row)| row))
    }
}
