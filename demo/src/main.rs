use es_domain::aggregate::Aggregate;
use es_domain::aggregate_root::AggregateRoot;
use es_domain::entity::Entity;
use es_domain::error::{DomainError, DomainResult};
use es_domain::options::EventSourcingOptions;
use es_domain::persist::{EventStore, InMemoryEventRepository, InMemoryEventStore};
use es_domain::value_object::Version;
use es_macros::{aggregate, event};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[aggregate(id = String, event = SpeechEvent)]
struct Speech {
    title: String,
    url: String,
    description: String,
}

#[derive(Debug)]
enum SpeechCommand {
    Create {
        title: String,
        url: String,
        description: String,
    },
    ChangeTitle {
        title: String,
        original_version: Version,
    },
}

#[event]
enum SpeechEvent {
    #[event(event_type = "SpeechCreatedEvent")]
    Created {
        title: String,
        url: String,
        description: String,
    },
    #[event(event_type = "SpeechTitleChangedEvent")]
    TitleChanged { title: String },
}

impl Aggregate for Speech {
    const TYPE: &'static str = "speech";

    fn apply(&mut self, event: &Self::Event) {
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
        }
    }
}

impl Speech {
    fn handle(&mut self, command: SpeechCommand) -> DomainResult<()> {
        match command {
            SpeechCommand::Create {
                title,
                url,
                description,
            } => {
                if !self.version().is_new() {
                    return Err(DomainError::InvalidCommand {
                        reason: "speech already created".to_string(),
                    });
                }
                self.emit(SpeechEvent::Created {
                    title,
                    url,
                    description,
                });
            }
            SpeechCommand::ChangeTitle {
                title,
                original_version,
            } => {
                if original_version != self.version() {
                    return Err(DomainError::Concurrency {
                        aggregate_type: Self::TYPE.to_string(),
                        aggregate_id: self.id().clone(),
                        expected: original_version.value(),
                        actual: self.version().value(),
                    });
                }
                self.emit(SpeechEvent::TitleChanged { title })
                    .metadata()
                    .set_source_id("demo");
            }
        }
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG 可覆盖默认级别，例如 RUST_LOG=es_domain=trace
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,es_domain=debug")),
        )
        .init();

    let options = EventSourcingOptions::from_env()?;
    let repository = InMemoryEventRepository::new();
    let store = InMemoryEventStore::<Speech>::new(repository.clone(), options)?;
    let root = AggregateRoot::new(store);
    let id = "s1".to_string();

    // 创建
    let speech = root
        .execute(&id, |speech| {
            speech.handle(SpeechCommand::Create {
                title: "Event sourcing in Rust".to_string(),
                url: "https://example.com/talks/es".to_string(),
                description: "aggregates, envelopes and optimistic concurrency".to_string(),
            })
        })
        .await?;
    tracing::info!(version = %speech.version(), title = %speech.title, "speech created");

    // 修改标题
    let speech = root
        .execute(&id, |speech| {
            speech.handle(SpeechCommand::ChangeTitle {
                title: "New Title".to_string(),
                original_version: Version::from_value(1),
            })
        })
        .await?;
    tracing::info!(version = %speech.version(), title = %speech.title, "title changed");

    // 过期版本的命令被拒绝
    let stale = root
        .execute(&id, |speech| {
            speech.handle(SpeechCommand::ChangeTitle {
                title: "Stale".to_string(),
                original_version: Version::from_value(1),
            })
        })
        .await;
    if let Err(err) = stale {
        tracing::warn!(%err, "stale command rejected");
    }

    // 重新加载并打印状态
    let loaded = root.load(&id).await?;
    tracing::info!(
        id = %loaded.id(),
        version = %loaded.version(),
        title = %loaded.title,
        url = %loaded.url,
        description = %loaded.description,
        "reloaded"
    );

    let events = root.store().get_events(&id).await?;
    for envelope in events.iter() {
        let version = envelope.aggregate_version()?;
        tracing::info!(
            event_type = envelope.event_type(),
            %version,
            source = ?envelope.metadata().source_id(),
            "stored event"
        );
    }

    let rows = repository.len().await;
    tracing::info!(rows, "done");

    Ok(())
}
