#![allow(dead_code)]

use async_trait::async_trait;
use es_domain::aggregate::Aggregate;
use es_domain::entity::Entity;
use es_domain::error::{DomainError, DomainResult};
use es_domain::options::EventSourcingOptions;
use es_domain::persist::{
    EventRepository, EventTransaction, InMemoryEventRepository, InMemoryEventStore,
    InMemoryTransaction, StoredEventRow, TransactionalEventStore,
};
use es_domain::value_object::Version;
use es_macros::{aggregate, event};

#[event]
pub enum SpeechEvent {
    #[event(event_type = "SpeechCreatedEvent")]
    Created {
        title: String,
        url: String,
        description: String,
    },
    #[event(event_type = "SpeechTitleChangedEvent")]
    TitleChanged { title: String },
    #[event(event_type = "SpeechDescriptionChangedEvent")]
    DescriptionChanged { description: String },
}

#[aggregate(id = String, event = SpeechEvent)]
#[derive(Clone)]
pub struct Speech {
    pub title: String,
    pub url: String,
    pub description: String,
}

impl Aggregate for Speech {
    const TYPE: &'static str = "speech";

    fn apply(&mut self, event: &SpeechEvent) {
        match event {
            SpeechEvent::Created {
                title,
                url,
                description,
            } => {
                self.title = title.clone();
                self.url = url.clone();
                self.description = description.clone();
            }
            SpeechEvent::TitleChanged { title } => self.title = title.clone(),
            SpeechEvent::DescriptionChanged { description } => {
                self.description = description.clone()
            }
        }
    }
}

impl Speech {
    pub fn create(id: &str, title: &str, url: &str, description: &str) -> Self {
        let mut speech = Self::new(id.to_string());
        speech.emit(SpeechEvent::Created {
            title: title.to_string(),
            url: url.to_string(),
            description: description.to_string(),
        });
        speech
    }

    pub fn change_title(&mut self, title: &str, original_version: Version) -> DomainResult<()> {
        if original_version != self.version() {
            return Err(DomainError::Concurrency {
                aggregate_type: Self::TYPE.to_string(),
                aggregate_id: self.id().clone(),
                expected: original_version.value(),
                actual: self.version().value(),
            });
        }
        if title.trim().is_empty() {
            return Err(DomainError::InvalidCommand {
                reason: "title must not be empty".to_string(),
            });
        }
        self.emit(SpeechEvent::TitleChanged {
            title: title.to_string(),
        });
        Ok(())
    }

    pub fn change_description(&mut self, description: &str) {
        self.emit(SpeechEvent::DescriptionChanged {
            description: description.to_string(),
        });
    }
}

pub fn in_memory_store(options: EventSourcingOptions) -> InMemoryEventStore<Speech> {
    match InMemoryEventStore::new(InMemoryEventRepository::new(), options) {
        Ok(store) => store,
        Err(err) => panic!("store construction failed: {err}"),
    }
}

/// 提交阶段必然失败的仓储，用于验证事务原子性
#[derive(Debug, Clone, Default)]
pub struct FailingCommitRepository {
    pub inner: InMemoryEventRepository,
}

pub struct FailingCommitTransaction {
    inner: InMemoryTransaction,
}

#[async_trait]
impl EventRepository for FailingCommitRepository {
    type Transaction = FailingCommitTransaction;

    async fn load_stream(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
        from_version: Option<Version>,
    ) -> DomainResult<Vec<StoredEventRow>> {
        self.inner
            .load_stream(aggregate_type, aggregate_id, from_version)
            .await
    }

    async fn load_by_aggregate_id(&self, aggregate_id: &str) -> DomainResult<Vec<StoredEventRow>> {
        self.inner.load_by_aggregate_id(aggregate_id).await
    }

    async fn begin(&self) -> DomainResult<Self::Transaction> {
        Ok(FailingCommitTransaction {
            inner: self.inner.begin().await?,
        })
    }
}

#[async_trait]
impl EventTransaction for FailingCommitTransaction {
    async fn stream_version(
        &mut self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> DomainResult<Version> {
        self.inner.stream_version(aggregate_type, aggregate_id).await
    }

    async fn append(&mut self, rows: &[StoredEventRow]) -> DomainResult<()> {
        self.inner.append(rows).await
    }

    async fn commit(self) -> DomainResult<()> {
        self.inner.rollback().await?;
        Err(DomainError::EventRepository {
            reason: "commit failed".to_string(),
        })
    }

    async fn rollback(self) -> DomainResult<()> {
        self.inner.rollback().await
    }
}

pub fn failing_store(
    repository: FailingCommitRepository,
) -> TransactionalEventStore<Speech, FailingCommitRepository> {
    match TransactionalEventStore::new(repository, EventSourcingOptions::default()) {
        Ok(store) => store,
        Err(err) => panic!("store construction failed: {err}"),
    }
}
