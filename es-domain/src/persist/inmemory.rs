//! 内存事件仓储
//!
//! 所有行保存在一个异步互斥锁后面；写事务在整个生命周期内持有该锁，
//! 提交时一次性追加所有排队的行，丢弃事务即回滚。适用于测试与演示。
//!
use crate::error::{DomainError, DomainResult};
use crate::persist::event_repository::{EventRepository, EventTransaction};
use crate::persist::stored_event::StoredEventRow;
use crate::value_object::Version;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub struct InMemoryEventRepository {
    rows: Arc<Mutex<Vec<StoredEventRow>>>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前已提交的全部行
    pub async fn rows(&self) -> Vec<StoredEventRow> {
        self.rows.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    type Transaction = InMemoryTransaction;

    #[tracing::instrument(skip(self))]
    async fn load_stream(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
        from_version: Option<Version>,
    ) -> DomainResult<Vec<StoredEventRow>> {
        let rows = self.rows.lock().await;
        let mut stream: Vec<StoredEventRow> = rows
            .iter()
            .filter(|r| r.aggregate_type() == aggregate_type && r.aggregate_id() == aggregate_id)
            .filter(|r| from_version.is_none_or(|v| r.aggregate_version() >= v))
            .cloned()
            .collect();
        stream.sort_by_key(|r| r.aggregate_version());
        Ok(stream)
    }

    #[tracing::instrument(skip(self))]
    async fn load_by_aggregate_id(&self, aggregate_id: &str) -> DomainResult<Vec<StoredEventRow>> {
        let rows = self.rows.lock().await;
        let mut found: Vec<StoredEventRow> = rows
            .iter()
            .filter(|r| r.aggregate_id() == aggregate_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.aggregate_type()
                .cmp(b.aggregate_type())
                .then(a.aggregate_version().cmp(&b.aggregate_version()))
        });
        Ok(found)
    }

    async fn begin(&self) -> DomainResult<Self::Transaction> {
        let guard = self.rows.clone().lock_owned().await;
        Ok(InMemoryTransaction {
            guard,
            pending: Vec::new(),
        })
    }
}

#[derive(Debug)]
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Vec<StoredEventRow>>,
    pending: Vec<StoredEventRow>,
}

impl InMemoryTransaction {
    fn tip(&self, aggregate_type: &str, aggregate_id: &str) -> Version {
        self.guard
            .iter()
            .chain(self.pending.iter())
            .filter(|r| r.aggregate_type() == aggregate_type && r.aggregate_id() == aggregate_id)
            .map(StoredEventRow::aggregate_version)
            .max()
            .unwrap_or_default()
    }

    fn exists(&self, row: &StoredEventRow) -> bool {
        self.guard.iter().chain(self.pending.iter()).any(|r| {
            r.aggregate_type() == row.aggregate_type()
                && r.aggregate_id() == row.aggregate_id()
                && r.aggregate_version() == row.aggregate_version()
        })
    }
}

#[async_trait]
impl EventTransaction for InMemoryTransaction {
    async fn stream_version(
        &mut self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> DomainResult<Version> {
        Ok(self.tip(aggregate_type, aggregate_id))
    }

    async fn append(&mut self, rows: &[StoredEventRow]) -> DomainResult<()> {
        for row in rows {
            // 同一事件流的版本唯一
            if self.exists(row) {
                return Err(DomainError::Concurrency {
                    aggregate_type: row.aggregate_type().to_string(),
                    aggregate_id: row.aggregate_id().to_string(),
                    expected: row.aggregate_version().value().saturating_sub(1),
                    actual: self
                        .tip(row.aggregate_type(), row.aggregate_id())
                        .value(),
                });
            }
            self.pending.push(row.clone());
        }
        Ok(())
    }

    async fn commit(mut self) -> DomainResult<()> {
        let pending = std::mem::take(&mut self.pending);
        self.guard.extend(pending);
        Ok(())
    }

    async fn rollback(self) -> DomainResult<()> {
        Ok(())
    }
}
