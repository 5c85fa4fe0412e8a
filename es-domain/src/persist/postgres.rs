//! Postgres 事件仓储（sqlx）
//!
//! 表结构见 [`PgEventRepository::init_schema`]。写事务先对事件流加
//! `pg_advisory_xact_lock`，随后读取流尾版本并批量插入；
//! `(aggregate_type, aggregate_id, aggregate_version)` 唯一约束作为最后一道并发防线。
//!
use crate::error::{DomainError, DomainResult};
use crate::persist::event_repository::{EventRepository, EventTransaction};
use crate::persist::stored_event::StoredEventRow;
use crate::value_object::Version;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};

const SELECT_COLUMNS: &str = "SELECT id, aggregate_id, aggregate_version, aggregate_type, \
     event_type, created_at, payload FROM event_store";

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS event_store (
        id                UUID PRIMARY KEY,
        aggregate_id      TEXT NOT NULL,
        aggregate_version BIGINT NOT NULL,
        aggregate_type    TEXT NOT NULL,
        event_type        VARCHAR(255) NOT NULL,
        created_at        TIMESTAMPTZ NOT NULL,
        payload           TEXT NOT NULL,
        CONSTRAINT event_store_stream_version_key
            UNIQUE (aggregate_type, aggregate_id, aggregate_version)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS event_store_aggregate_type_id_idx \
     ON event_store (aggregate_type, aggregate_id)",
    "CREATE INDEX IF NOT EXISTS event_store_aggregate_id_idx ON event_store (aggregate_id)",
];

// 每条 INSERT 的行数上限（每行 7 个绑定参数，Postgres 单语句上限 65535）
const MAX_ROWS_PER_INSERT: usize = 1000;

#[derive(Debug, Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 创建事件表与索引（幂等）
    #[tracing::instrument(skip(self))]
    pub async fn init_schema(&self) -> DomainResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn fetch_rows(
        &self,
        mut query: QueryBuilder<'_, Postgres>,
    ) -> DomainResult<Vec<StoredEventRow>> {
        let mut stream = query.build().fetch(&self.pool);
        let mut rows = Vec::new();
        while let Some(row) = stream.try_next().await? {
            rows.push(decode_row(&row)?);
        }
        Ok(rows)
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    type Transaction = PgEventTransaction;

    #[tracing::instrument(skip(self))]
    async fn load_stream(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
        from_version: Option<Version>,
    ) -> DomainResult<Vec<StoredEventRow>> {
        let mut query = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
        query
            .push(" WHERE aggregate_type = ")
            .push_bind(aggregate_type.to_string())
            .push(" AND aggregate_id = ")
            .push_bind(aggregate_id.to_string());
        if let Some(from_version) = from_version {
            query
                .push(" AND aggregate_version >= ")
                .push_bind(to_db_version(from_version)?);
        }
        query.push(" ORDER BY aggregate_version ASC");

        self.fetch_rows(query).await
    }

    #[tracing::instrument(skip(self))]
    async fn load_by_aggregate_id(&self, aggregate_id: &str) -> DomainResult<Vec<StoredEventRow>> {
        let mut query = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
        query
            .push(" WHERE aggregate_id = ")
            .push_bind(aggregate_id.to_string())
            .push(" ORDER BY aggregate_type ASC, aggregate_version ASC");

        self.fetch_rows(query).await
    }

    async fn begin(&self) -> DomainResult<Self::Transaction> {
        let tx = self.pool.begin().await?;
        Ok(PgEventTransaction { tx })
    }
}

pub struct PgEventTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl EventTransaction for PgEventTransaction {
    #[tracing::instrument(skip(self))]
    async fn stream_version(
        &mut self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> DomainResult<Version> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1 || ':' || $2))")
            .bind(aggregate_type)
            .bind(aggregate_id)
            .execute(&mut *self.tx)
            .await?;

        let tip: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(aggregate_version), 0) FROM event_store \
             WHERE aggregate_type = $1 AND aggregate_id = $2",
        )
        .bind(aggregate_type)
        .bind(aggregate_id)
        .fetch_one(&mut *self.tx)
        .await?;

        from_db_version(tip)
    }

    #[tracing::instrument(skip_all, fields(rows = rows.len()))]
    async fn append(&mut self, rows: &[StoredEventRow]) -> DomainResult<()> {
        for chunk in rows.chunks(MAX_ROWS_PER_INSERT) {
            let mut values = Vec::with_capacity(chunk.len());
            for row in chunk {
                values.push((row, to_db_version(row.aggregate_version())?));
            }

            let mut query = QueryBuilder::<Postgres>::new(
                "INSERT INTO event_store \
                 (id, aggregate_id, aggregate_version, aggregate_type, event_type, created_at, payload) ",
            );
            query.push_values(values, |mut b, (row, version)| {
                b.push_bind(row.row_id())
                    .push_bind(row.aggregate_id().to_string())
                    .push_bind(version)
                    .push_bind(row.aggregate_type().to_string())
                    .push_bind(row.event_type().to_string())
                    .push_bind(row.created_at())
                    .push_bind(row.payload().to_string());
            });

            query
                .build()
                .execute(&mut *self.tx)
                .await
                .map_err(|e| map_insert_error(e, chunk))?;
        }
        Ok(())
    }

    async fn commit(self) -> DomainResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> DomainResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

fn decode_row(row: &PgRow) -> DomainResult<StoredEventRow> {
    Ok(StoredEventRow::builder()
        .row_id(row.try_get("id")?)
        .aggregate_id(row.try_get::<String, _>("aggregate_id")?)
        .aggregate_version(from_db_version(row.try_get("aggregate_version")?)?)
        .aggregate_type(row.try_get::<String, _>("aggregate_type")?)
        .event_type(row.try_get::<String, _>("event_type")?)
        .created_at(row.try_get("created_at")?)
        .payload(row.try_get::<String, _>("payload")?)
        .build())
}

fn to_db_version(version: Version) -> DomainResult<i64> {
    i64::try_from(version.value()).map_err(|_| DomainError::Database {
        reason: format!("aggregate_version {version} out of range"),
    })
}

fn from_db_version(value: i64) -> DomainResult<Version> {
    u64::try_from(value)
        .map(Version::from_value)
        .map_err(|_| DomainError::Database {
            reason: format!("negative aggregate_version {value}"),
        })
}

// 唯一约束冲突意味着并发写入者已占用该版本
fn map_insert_error(err: sqlx::Error, rows: &[StoredEventRow]) -> DomainError {
    let unique_violation = matches!(
        &err,
        sqlx::Error::Database(db) if db.is_unique_violation()
    );

    match rows.first() {
        Some(first) if unique_violation => {
            tracing::warn!(
                aggregate_type = first.aggregate_type(),
                aggregate_id = first.aggregate_id(),
                version = first.aggregate_version().value(),
                "stream version already taken"
            );
            DomainError::Concurrency {
                aggregate_type: first.aggregate_type().to_string(),
                aggregate_id: first.aggregate_id().to_string(),
                expected: first.aggregate_version().value().saturating_sub(1),
                actual: first.aggregate_version().value(),
            }
        }
        _ => DomainError::from(err),
    }
}
