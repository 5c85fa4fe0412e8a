//! 领域层统一错误定义
//!
//! 覆盖元数据、序列化/类型解析、聚合校验、并发冲突与仓储等最小必要集合，
//! 各错误以独立变体向上传播，由应用层决定如何转换为面向用户的结果。
//!
use thiserror::Error;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 元数据 ---
    #[error("metadata not found: key={key}")]
    MetadataNotFound { key: String },
    #[error("metadata parse error: key={key}, reason={reason}")]
    MetadataParse { key: String, reason: String },
    #[error("duplicate metadata key: {key}")]
    DuplicateKey { key: String },

    // --- 序列化/类型解析 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("serialization failed: {reason}")]
    Serialization { reason: String },
    #[error("invalid cast: unable to deserialize {event_type}: {reason}")]
    Deserialization { event_type: String, reason: String },
    #[error("invalid cast: unable to get the type {event_type}")]
    UnknownEventType { event_type: String },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch { expected: String, found: String },

    // --- 聚合 ---
    #[error("bad aggregate id: {reason}")]
    BadAggregateId { reason: String },
    #[error(
        "concurrency conflict: aggregate={aggregate_type}/{aggregate_id}, expected={expected}, actual={actual}"
    )]
    Concurrency {
        aggregate_type: String,
        aggregate_id: String,
        expected: u64,
        actual: u64,
    },
    #[error(
        "out of order replay: aggregate={aggregate_type}/{aggregate_id}, current={current}, event={event}"
    )]
    OutOfOrderReplay {
        aggregate_type: String,
        aggregate_id: String,
        current: u64,
        event: u64,
    },
    #[error("invalid command: {reason}")]
    InvalidCommand { reason: String },

    // --- 配置 ---
    #[error("invalid options: key={key}, reason={reason}")]
    InvalidOptions { key: String, reason: String },

    // --- 仓储/持久化 ---
    #[error("event repository error: {reason}")]
    EventRepository { reason: String },
    #[error("database error: {reason}")]
    Database { reason: String },
    #[error("operation cancelled: {operation}")]
    Cancelled { operation: &'static str },
}

impl DomainError {
    /// 是否为乐观并发冲突（调用方可重新加载聚合后重试）
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, DomainError::Concurrency { .. })
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

// 允许在基础设施层直接使用 `?` 将 sqlx 错误转换为 DomainError
#[cfg(feature = "infra-sqlx")]
impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Database {
            reason: err.to_string(),
        }
    }
}
