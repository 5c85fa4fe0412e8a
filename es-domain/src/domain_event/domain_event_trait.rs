use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// 领域事件载荷需要满足的通用能力边界
///
/// 每个聚合以一个封闭的枚举声明自己能产生的全部事件，`EVENT_TYPES`
/// 列出该枚举的所有事件类型，供事件注册表在启动时校验。
/// 通常由 `#[event]` 宏生成实现。
pub trait DomainEvent:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// 该事件枚举声明的全部事件类型
    const EVENT_TYPES: &'static [&'static str];

    /// 事件类型（形如 `SpeechEvent.Created` 或自定义类型名）
    fn event_type(&self) -> &'static str;
}
