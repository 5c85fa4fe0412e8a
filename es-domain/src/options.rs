//! 事件溯源运行期配置
//!
//! 配置以值的形式显式传入事件存储，可通过 builder、JSON 或环境变量构造。
//!
use crate::error::{DomainError, DomainResult};
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 是否写入事件（`true`/`false`，也接受 `1/0`、`yes/no`、`on/off`）
pub const ENV_ENABLE_STORE_EVENT: &str = "EVENT_SOURCING_ENABLE_STORE_EVENT";
/// 不允许持久化的事件类型，逗号分隔
pub const ENV_NOT_ALLOWED_EVENTS: &str = "EVENT_SOURCING_NOT_ALLOWED_EVENTS";

#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSourcingOptions {
    /// 关闭后 `save` 直接返回，未提交事件保留在内存中
    #[builder(default = true)]
    enable_store_event: bool,
    /// 保存时跳过这些事件类型
    #[builder(default)]
    not_allowed_events: HashSet<String>,
}

impl Default for EventSourcingOptions {
    fn default() -> Self {
        Self {
            enable_store_event: true,
            not_allowed_events: HashSet::new(),
        }
    }
}

impl EventSourcingOptions {
    pub fn enable_store_event(&self) -> bool {
        self.enable_store_event
    }

    pub fn not_allowed_events(&self) -> &HashSet<String> {
        &self.not_allowed_events
    }

    /// 事件类型是否允许持久化
    pub fn is_allowed(&self, event_type: &str) -> bool {
        !self.not_allowed_events.contains(event_type)
    }

    pub fn with_enable_store_event(mut self, enable: bool) -> Self {
        self.enable_store_event = enable;
        self
    }

    pub fn disallow(mut self, event_type: impl Into<String>) -> Self {
        self.not_allowed_events.insert(event_type.into());
        self
    }

    /// 从进程环境变量读取，未设置的项保持默认值
    pub fn from_env() -> DomainResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> DomainResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();

        if let Some(raw) = lookup(ENV_ENABLE_STORE_EVENT) {
            options.enable_store_event = parse_flag(ENV_ENABLE_STORE_EVENT, &raw)?;
        }

        if let Some(raw) = lookup(ENV_NOT_ALLOWED_EVENTS) {
            options.not_allowed_events = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(options)
    }

    /// 从 JSON 配置读取，缺省字段取默认值
    pub fn from_json_str(raw: &str) -> DomainResult<Self> {
        serde_json::from_str(raw).map_err(|e| DomainError::InvalidOptions {
            key: "json".to_string(),
            reason: e.to_string(),
        })
    }
}

fn parse_flag(key: &str, raw: &str) -> DomainResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(DomainError::InvalidOptions {
            key: key.to_string(),
            reason: format!("expected a boolean, got `{other}`"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_store_everything() {
        let options = EventSourcingOptions::default();
        assert!(options.enable_store_event());
        assert!(options.not_allowed_events().is_empty());
        assert!(options.is_allowed("SpeechCreatedEvent"));
        assert_eq!(options, EventSourcingOptions::builder().build());
    }

    #[test]
    fn builder_and_disallow() {
        let options = EventSourcingOptions::builder()
            .enable_store_event(false)
            .not_allowed_events(HashSet::from(["A".to_string()]))
            .build()
            .disallow("B");

        assert!(!options.enable_store_event());
        assert!(!options.is_allowed("A"));
        assert!(!options.is_allowed("B"));
        assert!(options.is_allowed("C"));
    }

    #[test]
    fn from_lookup_reads_both_keys() {
        let env = HashMap::from([
            (ENV_ENABLE_STORE_EVENT, "off"),
            (ENV_NOT_ALLOWED_EVENTS, " Audit , ,Ping"),
        ]);
        let options =
            EventSourcingOptions::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();

        assert!(!options.enable_store_event());
        assert_eq!(options.not_allowed_events().len(), 2);
        assert!(!options.is_allowed("Audit"));
        assert!(!options.is_allowed("Ping"));
    }

    #[test]
    fn from_lookup_rejects_bad_flag() {
        let err = EventSourcingOptions::from_lookup(|key| {
            (key == ENV_ENABLE_STORE_EVENT).then(|| "maybe".to_string())
        })
        .unwrap_err();

        match err {
            DomainError::InvalidOptions { key, .. } => assert_eq!(key, ENV_ENABLE_STORE_EVENT),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn from_json_fills_missing_fields() {
        let options =
            EventSourcingOptions::from_json_str(r#"{"not_allowed_events":["Ping"]}"#).unwrap();
        assert!(options.enable_store_event());
        assert!(!options.is_allowed("Ping"));

        assert!(matches!(
            EventSourcingOptions::from_json_str("{"),
            Err(DomainError::InvalidOptions { .. })
        ));
    }
}
