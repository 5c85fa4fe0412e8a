mod common;

use anyhow::Result as AnyResult;
use common::{FailingCommitRepository, Speech, failing_store, in_memory_store};
use es_domain::aggregate::Aggregate;
use es_domain::aggregate_root::AggregateRoot;
use es_domain::entity::Entity;
use es_domain::error::DomainError;
use es_domain::options::EventSourcingOptions;
use es_domain::persist::{EventStore, EventStoreExt};
use es_domain::value_object::Version;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

async fn seeded() -> AnyResult<Arc<es_domain::persist::InMemoryEventStore<Speech>>> {
    let store = Arc::new(in_memory_store(EventSourcingOptions::default()));
    let mut speech = Speech::create("s1", "Title", "https://example.com", "notes");
    speech.commit(&store).await?;
    Ok(store)
}

#[tokio::test]
async fn stale_writer_is_rejected_without_writing() -> AnyResult<()> {
    let store = seeded().await?;

    let mut first = Speech::new("s1".to_string());
    first.apply_from_history(&store).await?;
    let mut second = first.clone();

    first.change_title("First", Version::from_value(1))?;
    second.change_title("Second", Version::from_value(1))?;

    first.commit(&store).await?;
    let err = second.commit(&store).await.unwrap_err();
    match err {
        DomainError::Concurrency {
            expected, actual, ..
        } => {
            assert_eq!(expected, 1);
            assert_eq!(actual, 2);
        }
        other => panic!("unexpected {other:?}"),
    }

    // 失败方的事件仍保留在内存中，存储只有两行
    assert_eq!(second.uncommitted_events().len(), 1);
    assert_eq!(store.repository().len().await, 2);
    Ok(())
}

#[tokio::test]
async fn reload_and_retry_after_conflict() -> AnyResult<()> {
    let store = seeded().await?;
    let root = AggregateRoot::new(store.clone());

    let mut stale = root.load(&"s1".to_string()).await?;
    root.execute(&"s1".to_string(), |speech| {
        speech.change_title("Winner", Version::from_value(1))
    })
    .await?;

    stale.change_title("Loser", Version::from_value(1))?;
    let err = stale.commit(&store).await.unwrap_err();
    assert!(err.is_concurrency_conflict());

    let retried = root
        .execute(&"s1".to_string(), |speech| {
            let version = speech.version();
            speech.change_title("Loser, retried", version)
        })
        .await?;
    assert_eq!(retried.version(), Version::from_value(3));
    assert_eq!(retried.title, "Loser, retried");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_commits_admit_exactly_one() -> AnyResult<()> {
    let store = seeded().await?;

    let mut base = Speech::new("s1".to_string());
    base.apply_from_history(&store).await?;

    let mut handles = Vec::new();
    for n in 0..8 {
        let store = store.clone();
        let mut speech = base.clone();
        handles.push(tokio::spawn(async move {
            speech.change_title(&format!("writer {n}"), Version::from_value(1))?;
            speech.commit(&store).await
        }));
    }

    let mut committed = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await? {
            Ok(()) => committed += 1,
            Err(err) if err.is_concurrency_conflict() => conflicts += 1,
            Err(err) => panic!("unexpected {err:?}"),
        }
    }

    assert_eq!(committed, 1);
    assert_eq!(conflicts, 7);

    let events = store.get_events(&"s1".to_string()).await?;
    assert_eq!(events.len(), 2);
    assert_eq!(events.latest_version(), Some(Version::from_value(2)));
    Ok(())
}

#[tokio::test]
async fn failed_commit_leaves_store_and_aggregate_untouched() -> AnyResult<()> {
    let repository = FailingCommitRepository::default();
    let store = failing_store(repository.clone());

    let mut speech = Speech::create("s1", "Title", "https://example.com", "notes");
    let err = speech.commit(&store).await.unwrap_err();
    assert!(matches!(err, DomainError::EventRepository { .. }));

    assert!(repository.inner.is_empty().await);
    assert_eq!(speech.uncommitted_events().len(), 1);
    assert_eq!(speech.core().loaded_version(), Version::new());
    Ok(())
}

#[tokio::test]
async fn disabled_storage_is_a_no_op() -> AnyResult<()> {
    let store = in_memory_store(EventSourcingOptions::default().with_enable_store_event(false));
    let mut speech = Speech::create("s1", "Title", "https://example.com", "notes");

    speech.commit(&store).await?;
    assert!(!speech.is_committed());
    assert!(store.repository().is_empty().await);
    Ok(())
}

#[tokio::test]
async fn cancelled_save_writes_nothing() -> AnyResult<()> {
    let store = in_memory_store(EventSourcingOptions::default());
    let mut speech = Speech::create("s1", "Title", "https://example.com", "notes");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = store
        .save_with_cancellation(&mut speech, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Cancelled { operation: "save" }));
    assert!(store.repository().is_empty().await);

    store
        .save_with_cancellation(&mut speech, &CancellationToken::new())
        .await?;
    assert!(speech.is_committed());
    Ok(())
}

#[tokio::test]
async fn filtered_only_save_still_detects_stale_writer() -> AnyResult<()> {
    let options = EventSourcingOptions::default().disallow("SpeechDescriptionChangedEvent");
    let store = in_memory_store(options);
    let mut seed = Speech::create("s1", "Title", "https://example.com", "notes");
    seed.commit(&store).await?;

    let mut a = Speech::new("s1".to_string());
    a.apply_from_history(&store).await?;
    let mut b = a.clone();

    b.change_title("B title", Version::from_value(1))?;
    b.commit(&store).await?;

    // A 只产生被过滤的事件，但其加载版本已落后于流尾
    a.change_description("never stored");
    let err = a.commit(&store).await.unwrap_err();
    assert!(err.is_concurrency_conflict());
    assert!(!a.is_committed());
    assert_eq!(a.core().loaded_version(), Version::from_value(1));

    a.change_title("A title", Version::from_value(2))?;
    assert!(a.commit(&store).await.unwrap_err().is_concurrency_conflict());

    let events = store.get_events(&"s1".to_string()).await?;
    assert_eq!(events.len(), 2);
    assert_eq!(store.repository().len().await, 2);

    // 未落后的写入者：过滤后无行写入，仍视为已提交
    let mut c = Speech::new("s1".to_string());
    c.apply_from_history(&store).await?;
    c.change_description("filtered");
    c.commit(&store).await?;
    assert!(c.is_committed());
    assert_eq!(c.core().loaded_version(), Version::from_value(3));
    assert_eq!(store.repository().len().await, 2);

    c.change_title("C title", Version::from_value(3))?;
    c.commit(&store).await?;
    let versions: Vec<u64> = store
        .repository()
        .rows()
        .await
        .iter()
        .map(|r| r.aggregate_version().value())
        .collect();
    assert_eq!(versions, vec![1, 2, 4]);
    Ok(())
}
