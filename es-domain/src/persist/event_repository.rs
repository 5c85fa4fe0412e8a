//! 事件行仓储协议
//!
//! `EventRepository` 负责按事件流读取存储行并开启写事务；
//! `EventTransaction` 是一次追加的工作单元：锁定事件流、读取流尾版本、
//! 追加行，最后提交或回滚。未提交即被丢弃的事务视为回滚。
//!
use crate::error::DomainResult;
use crate::persist::stored_event::StoredEventRow;
use crate::value_object::Version;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait EventRepository: Send + Sync {
    type Transaction: EventTransaction;

    /// 读取一个事件流，`from_version` 为包含下界；结果按版本升序
    async fn load_stream(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
        from_version: Option<Version>,
    ) -> DomainResult<Vec<StoredEventRow>>;

    /// 跨聚合类型按聚合 ID 读取
    async fn load_by_aggregate_id(&self, aggregate_id: &str) -> DomainResult<Vec<StoredEventRow>>;

    async fn begin(&self) -> DomainResult<Self::Transaction>;
}

#[async_trait]
pub trait EventTransaction: Send + Sized {
    /// 锁定事件流直至事务结束，返回其当前最大版本（空流为 0）
    async fn stream_version(
        &mut self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> DomainResult<Version>;

    async fn append(&mut self, rows: &[StoredEventRow]) -> DomainResult<()>;

    async fn commit(self) -> DomainResult<()>;

    async fn rollback(self) -> DomainResult<()>;
}

#[async_trait]
impl<T> EventRepository for Arc<T>
where
    T: EventRepository + ?Sized,
{
    type Transaction = T::Transaction;

    async fn load_stream(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
        from_version: Option<Version>,
    ) -> DomainResult<Vec<StoredEventRow>> {
        (**self)
            .load_stream(aggregate_type, aggregate_id, from_version)
            .await
    }

    async fn load_by_aggregate_id(&self, aggregate_id: &str) -> DomainResult<Vec<StoredEventRow>> {
        (**self).load_by_aggregate_id(aggregate_id).await
    }

    async fn begin(&self) -> DomainResult<Self::Transaction> {
        (**self).begin().await
    }
}
