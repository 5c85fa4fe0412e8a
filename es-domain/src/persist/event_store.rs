//! 事件存储
//!
//! `EventStore` 是聚合面向的协议；`TransactionalEventStore` 基于任意
//! `EventRepository` 实现它：保存前校验版本，序列化后在单个事务中
//! 锁定事件流、比对流尾版本并追加，成功后清空聚合的未提交事件。
//!
use crate::aggregate::Aggregate;
use crate::domain_event::AggregateEvents;
use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::options::EventSourcingOptions;
use crate::persist::event_factory::{EventFactory, EventRegistry};
use crate::persist::event_repository::{EventRepository, EventTransaction};
use crate::persist::inmemory::InMemoryEventRepository;
use crate::persist::serializer::{EventSerializer, JsonSerializer, Serializer};
use crate::persist::stored_event::StoredEventRow;
use crate::value_object::Version;
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait EventStore<A>: Send + Sync
where
    A: Aggregate,
{
    /// 读取聚合的完整事件流（按版本升序），不存在时返回空集合
    async fn get_events(&self, aggregate_id: &A::Id) -> DomainResult<AggregateEvents<A::Event>>;

    /// 读取版本不小于 `from_version` 的事件
    async fn get_events_from_version(
        &self,
        aggregate_id: &A::Id,
        from_version: Version,
    ) -> DomainResult<AggregateEvents<A::Event>>;

    /// 追加聚合的未提交事件
    async fn save(&self, aggregate: &mut A) -> DomainResult<()>;
}

#[async_trait]
impl<A, T> EventStore<A> for Arc<T>
where
    A: Aggregate,
    T: EventStore<A> + ?Sized,
{
    async fn get_events(&self, aggregate_id: &A::Id) -> DomainResult<AggregateEvents<A::Event>> {
        (**self).get_events(aggregate_id).await
    }

    async fn get_events_from_version(
        &self,
        aggregate_id: &A::Id,
        from_version: Version,
    ) -> DomainResult<AggregateEvents<A::Event>> {
        (**self)
            .get_events_from_version(aggregate_id, from_version)
            .await
    }

    async fn save(&self, aggregate: &mut A) -> DomainResult<()> {
        (**self).save(aggregate).await
    }
}

#[async_trait]
pub trait EventStoreExt<A>: EventStore<A>
where
    A: Aggregate,
{
    /// 可取消的保存；取消时未提交的事务被丢弃，不写入任何行
    ///
    /// 只有在事务提交开始之前取消才保证不落盘。提交进行中取消时，
    /// 行可能已经持久化，而调用方收到 `Cancelled` 且聚合保留未提交事件；
    /// 此时应重新加载聚合，而不是直接重试保存。
    async fn save_with_cancellation(
        &self,
        aggregate: &mut A,
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled { operation: "save" });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DomainError::Cancelled { operation: "save" }),
            result = self.save(aggregate) => result,
        }
    }
}

#[async_trait]
impl<A, T> EventStoreExt<A> for T
where
    A: Aggregate,
    T: EventStore<A> + ?Sized,
{
}

pub type InMemoryEventStore<A> = TransactionalEventStore<A, InMemoryEventRepository>;

#[cfg(feature = "infra-sqlx")]
pub type PgEventStore<A> =
    TransactionalEventStore<A, crate::persist::postgres::PgEventRepository>;

/// 基于行仓储与单事务追加的事件存储
pub struct TransactionalEventStore<A, R, S = JsonSerializer>
where
    A: Aggregate,
{
    repository: R,
    serializer: EventSerializer<S>,
    factory: EventFactory<A::Event>,
    options: EventSourcingOptions,
    _marker: PhantomData<fn() -> A>,
}

impl<A, R> TransactionalEventStore<A, R, JsonSerializer>
where
    A: Aggregate,
    R: EventRepository,
{
    pub fn new(repository: R, options: EventSourcingOptions) -> DomainResult<Self> {
        Self::with_serializer(repository, EventSerializer::json(), options)
    }
}

impl<A, R, S> TransactionalEventStore<A, R, S>
where
    A: Aggregate,
    R: EventRepository,
    S: Serializer + Clone + 'static,
{
    pub fn with_serializer(
        repository: R,
        serializer: EventSerializer<S>,
        options: EventSourcingOptions,
    ) -> DomainResult<Self> {
        let registry = EventRegistry::from_serializer(serializer.clone());
        Self::with_registry(repository, serializer, registry, options)
    }

    /// 使用自定义注册表（例如兼容旧事件类型名的解码器）
    pub fn with_registry(
        repository: R,
        serializer: EventSerializer<S>,
        registry: EventRegistry<A::Event>,
        options: EventSourcingOptions,
    ) -> DomainResult<Self> {
        Ok(Self {
            repository,
            serializer,
            factory: EventFactory::new(registry)?,
            options,
            _marker: PhantomData,
        })
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn options(&self) -> &EventSourcingOptions {
        &self.options
    }

    // 在打开事务之前完成全部序列化
    fn to_rows(&self, aggregate: &A) -> DomainResult<Vec<StoredEventRow>> {
        let mut rows = Vec::with_capacity(aggregate.uncommitted_events().len());

        for envelope in aggregate.uncommitted_events() {
            if !self.options.is_allowed(envelope.event_type()) {
                tracing::warn!(
                    event_type = envelope.event_type(),
                    event_id = envelope.event_id(),
                    "event type not allowed, skipped"
                );
                continue;
            }

            let payload = self.serializer.serialize(envelope)?;
            if payload.trim().is_empty() {
                return Err(DomainError::Serialization {
                    reason: format!("empty payload for {}", envelope.event_type()),
                });
            }

            rows.push(StoredEventRow::from_envelope(envelope, payload)?);
        }

        Ok(rows)
    }

    async fn load(
        &self,
        aggregate_id: &A::Id,
        from_version: Option<Version>,
    ) -> DomainResult<AggregateEvents<A::Event>> {
        ensure_id::<A>(aggregate_id)?;
        let rows = self
            .repository
            .load_stream(A::TYPE, &aggregate_id.to_string(), from_version)
            .await?;
        self.factory.create_from(&rows)
    }
}

fn ensure_id<A>(aggregate_id: &A::Id) -> DomainResult<()>
where
    A: Aggregate,
{
    if *aggregate_id == A::Id::default() {
        return Err(DomainError::BadAggregateId {
            reason: format!("{} id must not be empty", A::TYPE),
        });
    }
    Ok(())
}

#[async_trait]
impl<A, R, S> EventStore<A> for TransactionalEventStore<A, R, S>
where
    A: Aggregate,
    R: EventRepository,
    S: Serializer + Clone + 'static,
{
    #[tracing::instrument(skip(self), fields(aggregate_type = A::TYPE))]
    async fn get_events(&self, aggregate_id: &A::Id) -> DomainResult<AggregateEvents<A::Event>> {
        self.load(aggregate_id, None).await
    }

    #[tracing::instrument(skip(self), fields(aggregate_type = A::TYPE))]
    async fn get_events_from_version(
        &self,
        aggregate_id: &A::Id,
        from_version: Version,
    ) -> DomainResult<AggregateEvents<A::Event>> {
        self.load(aggregate_id, Some(from_version)).await
    }

    #[tracing::instrument(
        skip_all,
        fields(
            aggregate_type = A::TYPE,
            aggregate_id = %aggregate.id(),
            uncommitted = aggregate.uncommitted_events().len()
        )
    )]
    async fn save(&self, aggregate: &mut A) -> DomainResult<()> {
        if !self.options.enable_store_event() {
            tracing::debug!("event storage disabled, save skipped");
            return Ok(());
        }

        aggregate.validate_version()?;
        if aggregate.is_committed() {
            return Ok(());
        }

        let rows = self.to_rows(aggregate)?;

        let aggregate_id = aggregate.id().to_string();
        let loaded_version = aggregate.core().loaded_version();

        let mut tx = self.repository.begin().await?;
        let tip = tx.stream_version(A::TYPE, &aggregate_id).await?;
        if tip > loaded_version {
            tracing::warn!(
                expected = loaded_version.value(),
                actual = tip.value(),
                "concurrency conflict"
            );
            tx.rollback().await?;
            return Err(DomainError::Concurrency {
                aggregate_type: A::TYPE.to_string(),
                aggregate_id,
                expected: loaded_version.value(),
                actual: tip.value(),
            });
        }

        // 全部事件被过滤时不写入，但仍需确认流尾未被其他写入者推进
        if rows.is_empty() {
            tx.rollback().await?;
            aggregate.mark_changes_as_committed();
            tracing::debug!("all events filtered, nothing appended");
            return Ok(());
        }

        tx.append(&rows).await?;
        tx.commit().await?;

        aggregate.mark_changes_as_committed();
        tracing::debug!(
            rows = rows.len(),
            version = aggregate.version().value(),
            "events appended"
        );
        Ok(())
    }
}
