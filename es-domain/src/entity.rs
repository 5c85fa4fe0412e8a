//! 实体（Entity）基础抽象
//!
//! 为聚合提供统一的标识（Id）、版本与未提交事件的存放位置（`AggregateCore`），
//! 通常由 `#[aggregate]` 宏生成实现。
//!
use crate::aggregate::{AggregateCore, AggregateId};
use crate::domain_event::DomainEvent;
use crate::value_object::Version;

/// 具备唯一标识与版本的实体抽象
pub trait Entity: Send + Sync {
    /// 实体标识类型，其默认值视为“未赋值”
    type Id: AggregateId;
    /// 该实体产生的领域事件类型
    type Event: DomainEvent;

    fn core(&self) -> &AggregateCore<Self::Id, Self::Event>;

    fn core_mut(&mut self) -> &mut AggregateCore<Self::Id, Self::Event>;

    /// 获取实体标识
    fn id(&self) -> &Self::Id {
        self.core().id()
    }

    /// 获取当前版本（用于乐观锁与并发控制）
    fn version(&self) -> Version {
        self.core().version()
    }
}
