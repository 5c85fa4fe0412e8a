//! 聚合根编排器（AggregateRoot）
//!
//! 封装“加载聚合 → 执行命令 → 提交事件”的标准流程，
//! 以事件存储（`EventStore`）为依赖，便于在应用层直接调用。
//!
use crate::{aggregate::Aggregate, error::DomainResult, persist::EventStore};
use std::marker::PhantomData;

/// 面向应用层的聚合根编排器。
///
/// - `A`：聚合类型（实现 `Aggregate`）
/// - `S`：事件存储（实现 `EventStore<A>`）
pub struct AggregateRoot<A, S>
where
    A: Aggregate,
    S: EventStore<A>,
{
    store: S,
    _marker: PhantomData<fn() -> A>,
}

impl<A, S> AggregateRoot<A, S>
where
    A: Aggregate,
    S: EventStore<A>,
{
    /// 创建编排器实例
    pub fn new(store: S) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 创建空聚合并重放其完整事件流；流不存在时返回版本 0 的聚合
    #[tracing::instrument(skip(self), fields(aggregate_type = A::TYPE))]
    pub async fn load(&self, aggregate_id: &A::Id) -> DomainResult<A> {
        let mut aggregate = A::new(aggregate_id.clone());
        aggregate.apply_from_history(&self.store).await?;
        Ok(aggregate)
    }

    /// 执行聚合命令：
    /// 1. 加载聚合（不存在则为新聚合）；
    /// 2. 执行命令闭包，由其产生事件；
    /// 3. 提交未提交事件并返回提交后的聚合。
    ///
    /// 版本冲突时返回 `Concurrency`，调用方可重新执行。
    pub async fn execute<F>(&self, aggregate_id: &A::Id, command: F) -> DomainResult<A>
    where
        F: FnOnce(&mut A) -> DomainResult<()> + Send,
    {
        let mut aggregate = self.load(aggregate_id).await?;

        command(&mut aggregate)?;

        aggregate.commit(&self.store).await?;

        Ok(aggregate)
    }
}
