//! 事件序列化
//!
//! `Serializer` 是原始的序列化能力（默认 JSON），`EventSerializer` 在其上
//! 定义事件信封的线上格式：`{ event_id, event_type, metadata, payload }`。
//!
use crate::domain_event::{DomainEvent, EventEnvelope, Metadata};
use crate::error::{DomainError, DomainResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// 原始序列化能力
pub trait Serializer: Send + Sync {
    fn serialize<T>(&self, value: &T) -> DomainResult<String>
    where
        T: Serialize + ?Sized;

    fn deserialize<T>(&self, raw: &str) -> DomainResult<T>
    where
        T: DeserializeOwned;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize<T>(&self, value: &T) -> DomainResult<String>
    where
        T: Serialize + ?Sized,
    {
        Ok(serde_json::to_string(value)?)
    }

    fn deserialize<T>(&self, raw: &str) -> DomainResult<T>
    where
        T: DeserializeOwned,
    {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Serialize)]
struct WireEventRef<'a, E> {
    event_id: &'a str,
    event_type: &'a str,
    metadata: &'a Metadata,
    payload: &'a E,
}

#[derive(Deserialize)]
struct WireEvent<E> {
    event_id: String,
    event_type: String,
    #[serde(default)]
    metadata: Metadata,
    payload: E,
}

/// 事件信封与文本载荷之间的转换
#[derive(Debug, Clone, Default)]
pub struct EventSerializer<S = JsonSerializer> {
    serializer: S,
}

impl EventSerializer<JsonSerializer> {
    pub fn json() -> Self {
        Self::new(JsonSerializer)
    }
}

impl<S> EventSerializer<S>
where
    S: Serializer,
{
    pub fn new(serializer: S) -> Self {
        Self { serializer }
    }

    pub fn serialize<E>(&self, envelope: &EventEnvelope<E>) -> DomainResult<String>
    where
        E: DomainEvent,
    {
        let wire = WireEventRef {
            event_id: envelope.event_id(),
            event_type: envelope.event_type(),
            metadata: envelope.metadata(),
            payload: envelope.payload(),
        };

        self.serializer
            .serialize(&wire)
            .map_err(|e| DomainError::Serialization {
                reason: format!("{}: {e}", envelope.event_type()),
            })
    }

    /// 按期望的事件类型反序列化
    ///
    /// 载荷无法解析返回 `Deserialization`；载荷记录的类型或解码出的变体
    /// 与 `event_type` 不一致时返回 `TypeMismatch`。
    pub fn deserialize<E>(&self, payload: &str, event_type: &str) -> DomainResult<EventEnvelope<E>>
    where
        E: DomainEvent,
    {
        let wire: WireEvent<E> =
            self.serializer
                .deserialize(payload)
                .map_err(|e| DomainError::Deserialization {
                    event_type: event_type.to_string(),
                    reason: e.to_string(),
                })?;

        if wire.event_type != event_type {
            return Err(DomainError::TypeMismatch {
                expected: event_type.to_string(),
                found: wire.event_type,
            });
        }

        let decoded = wire.payload.event_type();
        if decoded != event_type {
            return Err(DomainError::TypeMismatch {
                expected: event_type.to_string(),
                found: decoded.to_string(),
            });
        }

        Ok(EventEnvelope::rehydrate(
            wire.event_id,
            wire.event_type,
            wire.metadata,
            wire.payload,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::SpeechEvent;
    use crate::value_object::Version;

    fn envelope() -> EventEnvelope<SpeechEvent> {
        let envelope = EventEnvelope::new(SpeechEvent::TitleChanged {
            title: "New Title".into(),
        });
        envelope.metadata().set_aggregate_id("s1");
        envelope.metadata().set_aggregate_version(Version::from_value(2));
        envelope
    }

    #[test]
    fn serialized_payload_embeds_identity_and_metadata() {
        let serializer = EventSerializer::json();
        let envelope = envelope();
        let raw = serializer.serialize(&envelope).unwrap();

        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["event_id"], envelope.event_id());
        assert_eq!(value["event_type"], "SpeechTitleChangedEvent");
        assert_eq!(value["metadata"]["aggregate_id"], "s1");
        assert_eq!(value["metadata"]["aggregate_version"], "2");
    }

    #[test]
    fn deserialize_restores_envelope() {
        let serializer = EventSerializer::json();
        let envelope = envelope();
        let raw = serializer.serialize(&envelope).unwrap();

        let restored: EventEnvelope<SpeechEvent> = serializer
            .deserialize(&raw, "SpeechTitleChangedEvent")
            .unwrap();
        assert_eq!(restored, envelope);
        assert_eq!(restored.payload(), envelope.payload());
        assert_eq!(restored.metadata(), envelope.metadata());
    }

    #[test]
    fn deserialize_rejects_other_type() {
        let serializer = EventSerializer::json();
        let raw = serializer.serialize(&envelope()).unwrap();

        let err = serializer
            .deserialize::<SpeechEvent>(&raw, "SpeechCreatedEvent")
            .unwrap_err();
        assert!(matches!(err, DomainError::TypeMismatch { .. }));
    }

    #[test]
    fn deserialize_rejects_mislabelled_payload() {
        let serializer = EventSerializer::json();
        let raw = serde_json::json!({
            "event_id": "e-1",
            "event_type": "SpeechCreatedEvent",
            "metadata": {},
            "payload": { "TitleChanged": { "title": "x" } }
        })
        .to_string();

        match serializer.deserialize::<SpeechEvent>(&raw, "SpeechCreatedEvent") {
            Err(DomainError::TypeMismatch { found, .. }) => {
                assert_eq!(found, "SpeechTitleChangedEvent")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn deserialize_reports_malformed_payload() {
        let serializer = EventSerializer::json();
        let err = serializer
            .deserialize::<SpeechEvent>("not json", "SpeechCreatedEvent")
            .unwrap_err();
        assert!(err.to_string().contains("unable to deserialize"));
    }
}
