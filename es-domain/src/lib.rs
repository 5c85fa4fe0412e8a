//! 事件溯源领域层基础库（es-domain）
//!
//! 提供以事件溯源为中心的聚合与事件存储构件，用于在应用中实现：
//! - 聚合（`aggregate`）与实体（`entity`）建模：状态只能通过事件改变；
//! - 领域事件（`domain_event`）：元数据容器、事件信封与有序事件集合；
//! - 持久化（`persist`）：事件序列化、事件工厂、事件存储协议及其
//!   内存/Postgres 实现，带乐观并发校验与事务性追加；
//! - 运行期配置（`options`）。
//!
//! 典型用法：
//! 1. 使用 `#[event]` 定义聚合的事件枚举，使用 `#[aggregate]` 定义聚合并实现 `Aggregate::apply`；
//! 2. 选择 `persist` 中的仓储实现构造 `TransactionalEventStore`；
//! 3. 通过 `AggregateRoot` 或直接调用 `apply_from_history/emit/commit` 完成一次命令处理。
//!
pub mod aggregate;
pub mod aggregate_root;
pub mod domain_event;
pub mod entity;
pub mod error;
pub mod options;
pub mod persist;
pub mod value_object;

#[cfg(test)]
mod fixtures;

// 允许在本 crate 内部通过 ::es_domain 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::es_domain 路径。
extern crate self as es_domain;
