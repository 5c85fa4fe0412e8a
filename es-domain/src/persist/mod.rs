//! 持久化与事件溯源（persist）
//!
//! - 事件序列化（`Serializer`/`EventSerializer`）与存储行模型（`StoredEventRow`）；
//! - 事件注册表与工厂（`EventRegistry`/`EventFactory`），把存储行还原为有序事件；
//! - 行仓储协议（`EventRepository`/`EventTransaction`）及内存、Postgres 实现；
//! - 面向聚合的事件存储（`EventStore`/`TransactionalEventStore`）。
//!
mod event_factory;
mod event_repository;
mod event_store;
mod inmemory;
#[cfg(feature = "infra-sqlx")]
mod postgres;
mod serializer;
mod stored_event;

pub use event_factory::{EventDecoder, EventFactory, EventRegistry};
pub use event_repository::{EventRepository, EventTransaction};
#[cfg(feature = "infra-sqlx")]
pub use event_store::PgEventStore;
pub use event_store::{EventStore, EventStoreExt, InMemoryEventStore, TransactionalEventStore};
pub use inmemory::{InMemoryEventRepository, InMemoryTransaction};
#[cfg(feature = "infra-sqlx")]
pub use postgres::{PgEventRepository, PgEventTransaction};
pub use serializer::{EventSerializer, JsonSerializer, Serializer};
pub use stored_event::{MAX_EVENT_TYPE_LEN, StoredEventRow};
