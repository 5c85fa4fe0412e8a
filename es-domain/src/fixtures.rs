//! 单元测试共用的演讲（Speech）聚合
//!
use crate::aggregate::Aggregate;
use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::value_object::Version;
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
    #[event(event_type = "SpeechDeletedEvent")]
    Deleted,
}

#[aggregate(id = String, event = SpeechEvent)]
#[derive(Clone)]
pub struct Speech {
    pub title: String,
    pub url: String,
    pub description: String,
    pub deleted: bool,
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
            SpeechEvent::Deleted => self.deleted = true,
        }
    }
}

impl Speech {
    pub fn create(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        description: impl Into<String>,
    ) -> DomainResult<Self> {
        let mut speech = Self::new(id.into());
        speech.start(title, url, description)?;
        Ok(speech)
    }

    pub fn start(
        &mut self,
        title: impl Into<String>,
        url: impl Into<String>,
        description: impl Into<String>,
    ) -> DomainResult<()> {
        if !self.version().is_new() {
            return Err(DomainError::InvalidCommand {
                reason: "speech already created".to_string(),
            });
        }

        self.emit(SpeechEvent::Created {
            title: title.into(),
            url: url.into(),
            description: description.into(),
        });
        Ok(())
    }

    pub fn change_title(
        &mut self,
        title: impl Into<String>,
        original_version: Version,
    ) -> DomainResult<()> {
        if original_version != self.version() {
            return Err(DomainError::Concurrency {
                aggregate_type: Self::TYPE.to_string(),
                aggregate_id: self.id().clone(),
                expected: original_version.value(),
                actual: self.version().value(),
            });
        }

        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::InvalidCommand {
                reason: "title must not be empty".to_string(),
            });
        }

        self.emit(SpeechEvent::TitleChanged { title });
        Ok(())
    }
}
