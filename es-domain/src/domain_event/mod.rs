//! 领域事件（Domain Event）与事件集合
//!
//! 定义事件载荷需要实现的最小接口（`DomainEvent`）、线程安全的元数据容器
//! （`Metadata`）、将事件与标识/元数据封装后的 `EventEnvelope`，
//! 以及按版本排序的辅助集合类型 `AggregateEvents`。

mod aggregate_events;
mod domain_event_trait;
mod event_envelope;
mod metadata;

pub use aggregate_events::AggregateEvents;
pub use domain_event_trait::DomainEvent;
pub use event_envelope::EventEnvelope;
pub use metadata::{Metadata, keys};
