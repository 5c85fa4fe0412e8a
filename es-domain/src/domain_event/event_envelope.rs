use crate::error::DomainResult;
use crate::value_object::Version;
use chrono::Utc;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

use super::domain_event_trait::DomainEvent;
use super::metadata::Metadata;

/// 事件信封，包含事件标识、事件类型、元数据与事件载荷
///
/// `event_id` 与 `event_type` 在构造后不可修改；元数据在持久化之前允许补充。
/// 相等性只比较 `(event_type, event_id)`。
#[derive(Debug, Clone)]
pub struct EventEnvelope<E> {
    event_id: String,
    event_type: String,
    metadata: Metadata,
    payload: E,
}

impl<E> EventEnvelope<E>
where
    E: DomainEvent,
{
    /// 创建新事件：生成事件 ID，并写入事件 ID、类型、版本 1 与当前 UTC 时间
    pub fn new(payload: E) -> Self {
        let event_id = Uuid::new_v4().to_string();
        let event_type = payload.event_type().to_string();

        let metadata = Metadata::new();
        metadata.set_event_id(event_id.clone());
        metadata.set_event_type(event_type.clone());
        metadata.set_aggregate_version(Version::from_value(1));
        metadata.set_timestamp(Utc::now());

        Self {
            event_id,
            event_type,
            metadata,
            payload,
        }
    }
}

impl<E> EventEnvelope<E> {
    /// 从持久化数据重建事件，元数据按原样保留
    pub fn rehydrate(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        metadata: Metadata,
        payload: E,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            metadata,
            payload,
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }

    /// 元数据中记录的聚合版本
    pub fn aggregate_version(&self) -> DomainResult<Version> {
        self.metadata.aggregate_version()
    }
}

impl<E> PartialEq for EventEnvelope<E> {
    fn eq(&self, other: &Self) -> bool {
        self.event_type == other.event_type && self.event_id == other.event_id
    }
}

impl<E> Eq for EventEnvelope<E> {}

impl<E> Hash for EventEnvelope<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.event_type.hash(state);
        self.event_id.hash(state);
    }
}
