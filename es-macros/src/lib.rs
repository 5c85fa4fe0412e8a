//! 事件溯源聚合的过程宏
//!
//! - `#[aggregate(id = .., event = ..)]`：为结构体注入 `AggregateCore` 并实现 `Entity`；
//! - `#[event]`：为事件枚举派生常用 trait 并实现 `DomainEvent`。
//!
use proc_macro::TokenStream;

mod aggregate;
mod event;
mod utils;

/// 聚合宏
/// - 在字段最前追加 `core: AggregateCore<Id, Event>`（字段名 `core` 保留给宏）
/// - 派生 `Debug`（可通过 `debug = false` 关闭）与 `Default`
/// - 自动实现 `::es_domain::entity::Entity`
/// - 参数：`#[aggregate(id = IdType, event = EventType)]`，`id` 默认 `String`
#[proc_macro_attribute]
pub fn aggregate(attr: TokenStream, item: TokenStream) -> TokenStream {
    aggregate::expand(attr, item)
}

/// 领域事件宏
/// - 变体可使用 `#[event(event_type = "...")]` 覆写事件类型，默认 `Enum.Variant`
/// - 生成 `::es_domain::domain_event::DomainEvent` 实现
#[proc_macro_attribute]
pub fn event(attr: TokenStream, item: TokenStream) -> TokenStream {
    event::expand(attr, item)
}
