//! 事件注册表与事件工厂
//!
//! 事件类型字符串到解码器的映射在启动时显式构建（`EventRegistry`），
//! `EventFactory` 使用它把存储行还原为按版本升序的事件集合。
//!
use crate::domain_event::{AggregateEvents, DomainEvent, EventEnvelope};
use crate::error::{DomainError, DomainResult};
use crate::persist::serializer::{EventSerializer, Serializer};
use crate::persist::stored_event::StoredEventRow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 从序列化载荷还原事件信封
pub type EventDecoder<E> = Arc<dyn Fn(&str) -> DomainResult<EventEnvelope<E>> + Send + Sync>;

pub struct EventRegistry<E> {
    decoders: HashMap<String, EventDecoder<E>>,
}

impl<E> Default for EventRegistry<E> {
    fn default() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }
}

impl<E> Clone for EventRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            decoders: self.decoders.clone(),
        }
    }
}

impl<E> fmt::Debug for EventRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("event_types", &self.event_types())
            .finish()
    }
}

impl<E> EventRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册（或覆盖）事件类型的解码器
    pub fn register<F>(&mut self, event_type: impl Into<String>, decoder: F) -> &mut Self
    where
        F: Fn(&str) -> DomainResult<EventEnvelope<E>> + Send + Sync + 'static,
    {
        self.decoders.insert(event_type.into(), Arc::new(decoder));
        self
    }

    pub fn resolve(&self, event_type: &str) -> DomainResult<&EventDecoder<E>> {
        self.decoders
            .get(event_type)
            .ok_or_else(|| DomainError::UnknownEventType {
                event_type: event_type.to_string(),
            })
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }

    /// 已注册的事件类型（排序后）
    pub fn event_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl<E> EventRegistry<E>
where
    E: DomainEvent,
{
    /// 为 `E::EVENT_TYPES` 中的每个类型注册基于 `serializer` 的解码器
    pub fn from_serializer<S>(serializer: EventSerializer<S>) -> Self
    where
        S: Serializer + Clone + 'static,
    {
        let mut registry = Self::new();
        for &event_type in E::EVENT_TYPES {
            let serializer = serializer.clone();
            registry.register(event_type, move |payload: &str| {
                serializer.deserialize::<E>(payload, event_type)
            });
        }
        registry
    }

    /// 启动期检查：事件枚举声明的每个类型都必须可解码
    pub fn ensure_complete(&self) -> DomainResult<()> {
        match E::EVENT_TYPES.iter().find(|t| !self.contains(t)) {
            Some(missing) => Err(DomainError::UnknownEventType {
                event_type: missing.to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventFactory<E> {
    registry: EventRegistry<E>,
}

impl<E> EventFactory<E>
where
    E: DomainEvent,
{
    pub fn new(registry: EventRegistry<E>) -> DomainResult<Self> {
        registry.ensure_complete()?;
        Ok(Self { registry })
    }

    pub fn registry(&self) -> &EventRegistry<E> {
        &self.registry
    }

    /// 将存储行解码为事件，结果按聚合版本升序
    ///
    /// 解码出的元数据必须与行上的聚合标识与版本一致。
    pub fn create_from<'a, I>(&self, rows: I) -> DomainResult<AggregateEvents<E>>
    where
        I: IntoIterator<Item = &'a StoredEventRow>,
    {
        let mut decoded = Vec::new();

        for row in rows {
            let decoder = self.registry.resolve(row.event_type())?;
            let envelope = decoder(row.payload())?;

            let version = envelope.aggregate_version()?;
            if version != row.aggregate_version() {
                return Err(DomainError::Deserialization {
                    event_type: row.event_type().to_string(),
                    reason: format!(
                        "metadata version {version} does not match row version {}",
                        row.aggregate_version()
                    ),
                });
            }

            let aggregate_id = envelope.metadata().aggregate_id()?;
            if aggregate_id != row.aggregate_id() {
                return Err(DomainError::Deserialization {
                    event_type: row.event_type().to_string(),
                    reason: format!(
                        "metadata aggregate id {aggregate_id} does not match row aggregate id {}",
                        row.aggregate_id()
                    ),
                });
            }

            decoded.push((version, envelope));
        }

        decoded.sort_by_key(|(version, _)| *version);
        Ok(AggregateEvents::new(
            decoded.into_iter().map(|(_, envelope)| envelope).collect(),
        ))
    }
}
