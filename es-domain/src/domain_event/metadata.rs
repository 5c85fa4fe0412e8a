use crate::error::{DomainError, DomainResult};
use crate::value_object::Version;
use chrono::{DateTime, SecondsFormat, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// 元数据中约定的键
pub mod keys {
    pub const AGGREGATE_ID: &str = "aggregate_id";
    pub const AGGREGATE_TYPE: &str = "aggregate_type";
    pub const AGGREGATE_VERSION: &str = "aggregate_version";
    pub const EVENT_TYPE: &str = "event_type";
    pub const EVENT_ID: &str = "event_id";
    pub const TIMESTAMP: &str = "timestamp";
    pub const SOURCE_ID: &str = "source_id";
    pub const BATCH_ID: &str = "batch_id";
}

/// 事件元数据容器
///
/// 字符串到字符串的线程安全映射，同一事件的多个处理器可以并发读写。
/// 事件持久化之后其内容视为不可变；`clone_with` 不允许覆盖已有键。
#[derive(Default, Clone)]
pub struct Metadata {
    entries: DashMap<String, String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取指定键，不存在时返回 `MetadataNotFound`
    pub fn get(&self, key: &str) -> DomainResult<String> {
        self.try_get(key)
            .ok_or_else(|| DomainError::MetadataNotFound {
                key: key.to_string(),
            })
    }

    pub fn try_get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|value| value.value().clone())
    }

    /// 写入（或覆盖）指定键
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 读取并通过转换函数解析为目标类型，解析失败返回 `MetadataParse`
    pub fn get_with<T, E, F>(&self, key: &str, convert: F) -> DomainResult<T>
    where
        F: FnOnce(&str) -> Result<T, E>,
        E: fmt::Display,
    {
        let raw = self.get(key)?;
        convert(&raw).map_err(|err| DomainError::MetadataParse {
            key: key.to_string(),
            reason: err.to_string(),
        })
    }

    /// 通过转换函数格式化后写入，转换失败返回 `MetadataParse`
    pub fn set_with<T, E, F>(&self, key: &str, value: T, convert: F) -> DomainResult<()>
    where
        F: FnOnce(T) -> Result<String, E>,
        E: fmt::Display,
    {
        let raw = convert(value).map_err(|err| DomainError::MetadataParse {
            key: key.to_string(),
            reason: err.to_string(),
        })?;
        self.set(key, raw);
        Ok(())
    }

    /// 复制当前全部条目并追加新的键值对；任一键已存在时返回 `DuplicateKey`
    pub fn clone_with<I, K, V>(&self, pairs: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let cloned = self.clone();
        for (key, value) in pairs {
            let key = key.into();
            if cloned.contains_key(&key) {
                return Err(DomainError::DuplicateKey { key });
            }
            cloned.entries.insert(key, value.into());
        }
        Ok(cloned)
    }

    /// 按键排序的快照
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    // ---- 约定键的类型化访问 ----

    pub fn aggregate_id(&self) -> DomainResult<String> {
        self.get(keys::AGGREGATE_ID)
    }

    pub fn set_aggregate_id(&self, aggregate_id: impl Into<String>) {
        self.set(keys::AGGREGATE_ID, aggregate_id);
    }

    pub fn aggregate_type(&self) -> DomainResult<String> {
        self.get(keys::AGGREGATE_TYPE)
    }

    pub fn set_aggregate_type(&self, aggregate_type: impl Into<String>) {
        self.set(keys::AGGREGATE_TYPE, aggregate_type);
    }

    pub fn aggregate_version(&self) -> DomainResult<Version> {
        self.get_with(keys::AGGREGATE_VERSION, |raw| raw.parse::<Version>())
    }

    pub fn set_aggregate_version(&self, version: Version) {
        self.set(keys::AGGREGATE_VERSION, version.to_string());
    }

    pub fn event_type(&self) -> DomainResult<String> {
        self.get(keys::EVENT_TYPE)
    }

    pub fn set_event_type(&self, event_type: impl Into<String>) {
        self.set(keys::EVENT_TYPE, event_type);
    }

    pub fn event_id(&self) -> DomainResult<String> {
        self.get(keys::EVENT_ID)
    }

    pub fn set_event_id(&self, event_id: impl Into<String>) {
        self.set(keys::EVENT_ID, event_id);
    }

    /// 事件发生时间（RFC 3339，UTC）
    pub fn timestamp(&self) -> DomainResult<DateTime<Utc>> {
        self.get_with(keys::TIMESTAMP, |raw| {
            DateTime::parse_from_rfc3339(raw).map(|at| at.with_timezone(&Utc))
        })
    }

    pub fn set_timestamp(&self, at: DateTime<Utc>) {
        self.set(
            keys::TIMESTAMP,
            at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        );
    }

    pub fn source_id(&self) -> Option<String> {
        self.try_get(keys::SOURCE_ID)
    }

    pub fn set_source_id(&self, source_id: impl Into<String>) {
        self.set(keys::SOURCE_ID, source_id);
    }

    pub fn batch_id(&self) -> Option<String> {
        self.try_get(keys::BATCH_ID)
    }

    pub fn set_batch_id(&self, batch_id: impl Into<String>) {
        self.set(keys::BATCH_ID, batch_id);
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.to_map()).finish()
    }
}

impl PartialEq for Metadata {
    fn eq(&self, other: &Self) -> bool {
        self.to_map() == other.to_map()
    }
}

impl Eq for Metadata {}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

// 以有序对象的形式序列化，保证同一内容产生相同的载荷
impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Metadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, String>::deserialize(deserializer)?;
        Ok(map.into_iter().collect())
    }
}
