//! 持久化层的事件行
//!
use crate::domain_event::EventEnvelope;
use crate::error::{DomainError, DomainResult};
use crate::value_object::Version;
use bon::Builder;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// 事件类型的最大长度（与存储列宽一致）
pub const MAX_EVENT_TYPE_LEN: usize = 255;

/// 事件存储中的一行；只追加，不更新不删除
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct StoredEventRow {
    /// 行主键
    #[builder(default = Uuid::new_v4())]
    row_id: Uuid,
    #[builder(into)]
    aggregate_id: String,
    /// 聚合版本，同一事件流内唯一
    aggregate_version: Version,
    #[builder(into)]
    aggregate_type: String,
    #[builder(into)]
    event_type: String,
    #[builder(default = Utc::now())]
    created_at: DateTime<Utc>,
    /// 序列化后的事件信封
    #[builder(into)]
    payload: String,
}

impl StoredEventRow {
    /// 由事件信封的元数据与序列化载荷构造存储行
    pub fn from_envelope<E>(envelope: &EventEnvelope<E>, payload: String) -> DomainResult<Self> {
        let metadata = envelope.metadata();
        let event_type = metadata.event_type()?;
        if event_type.chars().count() > MAX_EVENT_TYPE_LEN {
            return Err(DomainError::Serialization {
                reason: format!("event type longer than {MAX_EVENT_TYPE_LEN} characters"),
            });
        }

        Ok(Self::builder()
            .aggregate_id(metadata.aggregate_id()?)
            .aggregate_version(metadata.aggregate_version()?)
            .aggregate_type(metadata.aggregate_type()?)
            .event_type(event_type)
            .created_at(metadata.timestamp()?)
            .payload(payload)
            .build())
    }

    pub fn row_id(&self) -> Uuid {
        self.row_id
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn aggregate_version(&self) -> Version {
        self.aggregate_version
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}
