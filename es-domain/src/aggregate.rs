//! 聚合（Aggregate）抽象
//!
//! 聚合的状态只能通过事件改变：
//! - `emit` 记录一个新事件：写入元数据、调用 `apply` 变更状态、版本加一并放入未提交集合；
//! - `apply_changes` 重放历史事件：版本直接取事件自身记录的聚合版本，不进入未提交集合；
//! - `validate_version` 在持久化前校验内存版本与“加载版本 + 未提交事件数”一致；
//! - `commit` / `apply_from_history` / `catch_up` 与事件存储协作完成保存与重建。
//!
//! 聚合实例本身不是线程安全的，同一时刻只应被一个操作（命令）持有；
//! 同一聚合的多个实例之间由保存时的乐观并发校验保证安全。
//!
use crate::domain_event::{EventEnvelope, Metadata, keys};
use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::persist::EventStore;
use crate::value_object::Version;
use async_trait::async_trait;
use chrono::Utc;
use std::fmt;

/// 聚合标识约束；`Default::default()` 视为未赋值的标识
pub trait AggregateId:
    Clone + Default + PartialEq + fmt::Display + fmt::Debug + Send + Sync + 'static
{
}

impl<T> AggregateId for T where
    T: Clone + Default + PartialEq + fmt::Display + fmt::Debug + Send + Sync + 'static
{
}

/// 聚合的事件溯源状态：标识、版本、加载时版本与未提交事件
#[derive(Debug, Clone)]
pub struct AggregateCore<Id, E> {
    id: Id,
    version: Version,
    loaded_version: Version,
    uncommitted: Vec<EventEnvelope<E>>,
}

impl<Id, E> Default for AggregateCore<Id, E>
where
    Id: Default,
{
    fn default() -> Self {
        Self::new(Id::default())
    }
}

impl<Id, E> AggregateCore<Id, E> {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            version: Version::new(),
            loaded_version: Version::new(),
            uncommitted: Vec::new(),
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// 最近一次从存储加载或成功提交后的版本
    pub fn loaded_version(&self) -> Version {
        self.loaded_version
    }

    pub fn uncommitted_events(&self) -> &[EventEnvelope<E>] {
        &self.uncommitted
    }
}

/// 聚合根接口
#[async_trait]
pub trait Aggregate: Entity + Default {
    /// 聚合类型标识，写入事件元数据与存储行
    const TYPE: &'static str;

    /// 应用事件，更新聚合状态（对事件枚举的穷尽匹配）
    fn apply(&mut self, event: &Self::Event);

    /// 使用给定标识创建空聚合（版本 0）
    fn new(id: Self::Id) -> Self {
        let mut aggregate = Self::default();
        *aggregate.core_mut() = AggregateCore::new(id);
        aggregate
    }

    fn uncommitted_events(&self) -> &[EventEnvelope<Self::Event>] {
        self.core().uncommitted_events()
    }

    /// 是否没有待持久化的事件
    fn is_committed(&self) -> bool {
        self.core().uncommitted.is_empty()
    }

    /// 记录一个新事件，返回已记录的事件信封以便继续补充元数据
    fn emit(&mut self, event: Self::Event) -> &EventEnvelope<Self::Event> {
        self.emit_envelope(EventEnvelope::new(event))
    }

    fn emit_envelope(
        &mut self,
        envelope: EventEnvelope<Self::Event>,
    ) -> &EventEnvelope<Self::Event> {
        stamp(&*self, envelope.metadata(), true);
        self.apply(envelope.payload());

        let core = self.core_mut();
        core.version = core.version.next();
        envelope.metadata().set_aggregate_version(core.version);

        tracing::trace!(
            aggregate_type = Self::TYPE,
            aggregate_id = %core.id,
            version = core.version.value(),
            event_type = envelope.event_type(),
            "event emitted"
        );

        let index = core.uncommitted.len();
        core.uncommitted.push(envelope);
        &core.uncommitted[index]
    }

    /// 按版本升序重放历史事件
    ///
    /// 先校验整批事件的版本，任一事件无效时聚合保持原状。
    fn apply_changes<I>(&mut self, events: I) -> DomainResult<()>
    where
        I: IntoIterator<Item = EventEnvelope<Self::Event>>,
    {
        let mut batch = Vec::new();
        let mut current = self.version();
        for envelope in events {
            let event_version = envelope.aggregate_version()?;
            if event_version <= current {
                return Err(DomainError::OutOfOrderReplay {
                    aggregate_type: Self::TYPE.to_string(),
                    aggregate_id: self.id().to_string(),
                    current: current.value(),
                    event: event_version.value(),
                });
            }
            current = event_version;
            batch.push((event_version, envelope));
        }

        for (event_version, envelope) in batch {
            stamp(&*self, envelope.metadata(), false);
            self.apply(envelope.payload());

            let core = self.core_mut();
            core.version = event_version;
            core.loaded_version = event_version;
        }

        tracing::trace!(
            aggregate_type = Self::TYPE,
            aggregate_id = %self.id(),
            version = self.version().value(),
            "events replayed"
        );
        Ok(())
    }

    /// 校验 `version == loaded_version + 未提交事件数`
    fn validate_version(&self) -> DomainResult<()> {
        let core = self.core();
        let expected = core
            .loaded_version
            .advance(core.uncommitted.len() as u64);

        if core.version != expected {
            return Err(DomainError::Concurrency {
                aggregate_type: Self::TYPE.to_string(),
                aggregate_id: core.id.to_string(),
                expected: expected.value(),
                actual: core.version.value(),
            });
        }
        Ok(())
    }

    /// 标识不能是默认值
    fn validate_state(&self) -> DomainResult<()> {
        if *self.id() == Self::Id::default() {
            return Err(DomainError::BadAggregateId {
                reason: format!("{} id must not be empty", Self::TYPE),
            });
        }
        Ok(())
    }

    /// 清空未提交事件；仅由事件存储在追加成功后调用
    fn mark_changes_as_committed(&mut self) {
        let core = self.core_mut();
        core.uncommitted.clear();
        core.loaded_version = core.version;
    }

    /// 从事件存储加载该聚合的完整事件流并重放
    async fn apply_from_history<S>(&mut self, store: &S) -> DomainResult<()>
    where
        S: EventStore<Self> + ?Sized,
    {
        let events = store.get_events(self.id()).await?;
        self.apply_changes(events)
    }

    /// 只拉取加载版本之后的增量事件并重放
    ///
    /// 存在未提交事件时若流已前进，说明有并发写入，返回 `Concurrency`。
    async fn catch_up<S>(&mut self, store: &S) -> DomainResult<()>
    where
        S: EventStore<Self> + ?Sized,
    {
        let from_version = self.core().loaded_version.next();
        let events = store
            .get_events_from_version(self.id(), from_version)
            .await?;

        if events.is_empty() {
            return Ok(());
        }

        if !self.is_committed() {
            let actual = events.latest_version().unwrap_or(from_version);
            return Err(DomainError::Concurrency {
                aggregate_type: Self::TYPE.to_string(),
                aggregate_id: self.id().to_string(),
                expected: self.core().loaded_version.value(),
                actual: actual.value(),
            });
        }

        self.apply_changes(events)
    }

    /// 校验聚合状态后交由事件存储保存未提交事件
    async fn commit<S>(&mut self, store: &S) -> DomainResult<()>
    where
        S: EventStore<Self> + ?Sized,
    {
        self.validate_state()?;
        store.save(self).await
    }
}

// 写入聚合关联信息；重放时保留事件原有的发生时间
fn stamp<A>(aggregate: &A, metadata: &Metadata, touch_timestamp: bool)
where
    A: Aggregate,
{
    metadata.set_aggregate_id(aggregate.id().to_string());
    metadata.set_aggregate_type(A::TYPE);
    if touch_timestamp || !metadata.contains_key(keys::TIMESTAMP) {
        metadata.set_timestamp(Utc::now());
    }
}
