// tests/cleanup_pipeline_tests.rs

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use mockall::mock;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

use modbot_common::models::{AutoResponse, ChannelMotd, CleanupDefinition, MotdMessage, PostedMessage, WorkItem};
use modbot_common::traits::{ChatPlatform, DefinitionStore};
use modbot_core::Error;
use modbot_core::repositories::InMemoryDefinitionStore;
use modbot_core::resilience::RetryPolicy;
use modbot_core::tasks::{CleanupConfig, CleanupExecutor, CleanupScheduler, CleanupService, work_queue};
use modbot_core::test_utils::FakePlatform;
use modbot_core::utils::CronCrateParser;

mock! {
    pub Platform {}

    #[async_trait]
    impl ChatPlatform for Platform {
        async fn delete_old_messages(&self, channel_id: u64, age: Duration, cancel: CancellationToken) -> Result<usize, Error>;
        async fn send_direct_message(&self, user_id: u64, content: &str) -> Result<(), Error>;
        async fn users_with_any_roles(&self, guild_id: u64, role_ids: &[u64]) -> Result<Vec<u64>, Error>;
        async fn users_by_ids(&self, guild_id: u64, user_ids: &[u64]) -> Result<Vec<u64>, Error>;
        async fn bot_user_id(&self) -> Result<u64, Error>;
        async fn oldest_messages(&self, channel_id: u64, limit: usize) -> Result<Vec<PostedMessage>, Error>;
        async fn post_embed(&self, channel_id: u64, embed: &MotdMessage) -> Result<u64, Error>;
        async fn edit_embed(&self, channel_id: u64, message_id: u64, embed: &MotdMessage) -> Result<(), Error>;
    }
}

mock! {
    pub Store {}

    #[async_trait]
    impl DefinitionStore for Store {
        async fn cleanup_definitions(&self) -> Result<Vec<CleanupDefinition>, Error>;
        async fn auto_responses(&self) -> Result<Vec<AutoResponse>, Error>;
        async fn motds(&self) -> Result<Vec<ChannelMotd>, Error>;
    }
}

fn at(minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, minute, second).unwrap()
}

fn every_minute(channel_id: u64) -> CleanupDefinition {
    CleanupDefinition::new(channel_id, Duration::from_secs(3600), "* * * * *")
}

#[tokio::test]
async fn test_due_definition_is_queued_once_per_occurrence() -> Result<(), Error> {
    let def = every_minute(1);
    let store = Arc::new(InMemoryDefinitionStore::new(vec![def.clone()], vec![]));
    let scheduler = CleanupScheduler::new(store, Arc::new(CronCrateParser));
    let (writer, mut reader) = work_queue(8);
    let cancel = CancellationToken::new();

    assert_eq!(scheduler.tick(at(0, 30), &writer, &cancel).await?, 0);
    assert_eq!(scheduler.tick(at(0, 59), &writer, &cancel).await?, 0);
    assert_eq!(scheduler.tick(at(1, 0), &writer, &cancel).await?, 1);
    assert_eq!(scheduler.next_occurrence(&def), Some(at(2, 0)));
    assert_eq!(scheduler.tick(at(1, 0), &writer, &cancel).await?, 0);
    assert_eq!(scheduler.tick(at(1, 1), &writer, &cancel).await?, 0);

    let item = reader.try_recv().expect("one work item");
    assert_eq!(item, WorkItem { definition: def, due_at: at(1, 0) });
    assert!(reader.try_recv().is_none());
    Ok(())
}

#[tokio::test]
async fn test_late_tick_fires_once_and_skips_ahead() -> Result<(), Error> {
    let def = every_minute(1);
    let store = Arc::new(InMemoryDefinitionStore::new(vec![def.clone()], vec![]));
    let scheduler = CleanupScheduler::new(store, Arc::new(CronCrateParser));
    let (writer, reader) = work_queue(8);
    let cancel = CancellationToken::new();

    scheduler.tick(at(0, 30), &writer, &cancel).await?;
    // Several occurrences missed: only one item, next one after the late tick.
    assert_eq!(scheduler.tick(at(5, 10), &writer, &cancel).await?, 1);
    assert_eq!(scheduler.next_occurrence(&def), Some(at(6, 0)));
    assert_eq!(reader.len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_time_blocked_on_a_full_queue_is_not_fired_again() -> Result<(), Error> {
    let def = every_minute(1);
    let store = Arc::new(InMemoryDefinitionStore::new(vec![def.clone()], vec![]));
    let scheduler = CleanupScheduler::new(store, Arc::new(CronCrateParser));
    let (writer, mut reader) = work_queue(1);
    let cancel = CancellationToken::new();

    scheduler.tick(at(0, 30), &writer, &cancel).await?;
    writer
        .send(WorkItem { definition: every_minute(2), due_at: at(0, 0) })
        .await?;

    // The executor frees a slot two and a half minutes later.
    let drain = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(150)).await;
        let first = reader.recv().await;
        (first, reader)
    });
    assert_eq!(scheduler.tick(at(1, 0), &writer, &cancel).await?, 1);
    assert_eq!(scheduler.next_occurrence(&def), Some(at(4, 0)));

    let (first, reader) = drain.await.unwrap();
    assert_eq!(first.map(|item| item.definition), Some(every_minute(2)));
    assert_eq!(reader.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_store_failure_keeps_last_known_definitions() {
    let def = every_minute(3);
    let returned = def.clone();
    let mut loads = 0;
    let mut store = MockStore::new();
    store.expect_cleanup_definitions().returning(move || {
        loads += 1;
        if loads == 1 {
            Ok(vec![returned.clone()])
        } else {
            Err(Error::NotFound("definitions table".into()))
        }
    });

    let scheduler = CleanupScheduler::new(Arc::new(store), Arc::new(CronCrateParser));
    let (writer, reader) = work_queue(8);
    let cancel = CancellationToken::new();

    assert_ok!(scheduler.tick(at(0, 30), &writer, &cancel).await);
    assert_eq!(assert_ok!(scheduler.tick(at(1, 0), &writer, &cancel).await), 1);
    assert_eq!(scheduler.next_occurrence(&def), Some(at(2, 0)));
    assert_eq!(reader.len(), 1);
}

#[tokio::test]
async fn test_tick_fails_when_executor_is_gone() {
    let store = Arc::new(InMemoryDefinitionStore::new(vec![every_minute(1)], vec![]));
    let scheduler = CleanupScheduler::new(store, Arc::new(CronCrateParser));
    let (writer, reader) = work_queue(1);
    drop(reader);
    let cancel = CancellationToken::new();

    assert_ok!(scheduler.tick(at(0, 30), &writer, &cancel).await);
    assert_err!(scheduler.tick(at(1, 0), &writer, &cancel).await);
}

#[tokio::test(start_paused = true)]
async fn test_executor_retries_failed_cleanup_until_success() {
    let mut platform = MockPlatform::new();
    let mut attempts = 0;
    platform
        .expect_delete_old_messages()
        .withf(|channel_id, age, _| *channel_id == 9 && *age == Duration::from_secs(3600))
        .times(3)
        .returning(move |_, _, _| {
            attempts += 1;
            if attempts < 3 {
                Err(Error::Platform("503 Service Unavailable".into()))
            } else {
                Ok(12)
            }
        });

    let executor = CleanupExecutor::new(Arc::new(platform), RetryPolicy::default());
    let stats = executor.stats();
    let (writer, reader) = work_queue(4);
    writer
        .send(WorkItem { definition: every_minute(9), due_at: at(1, 0) })
        .await
        .unwrap();
    writer.close();

    executor.run(reader, CancellationToken::new()).await;

    assert_eq!(stats.processed(), 1);
    assert_eq!(stats.failed(), 0);
    assert_eq!(stats.messages_deleted(), 12);
}

#[tokio::test(start_paused = true)]
async fn test_executor_abandons_item_after_timeout() {
    let mut platform = MockPlatform::new();
    // The first backoff alone outlasts the timeout.
    platform
        .expect_delete_old_messages()
        .times(1)
        .returning(|_, _, _| Err(Error::Platform("rate limited".into())));

    let policy = RetryPolicy {
        max_retries: 5,
        base_delay: Duration::from_secs(10),
        max_delay: Duration::from_secs(60),
        timeout: Duration::from_secs(5),
    };
    let executor = CleanupExecutor::new(Arc::new(platform), policy);
    let stats = executor.stats();
    let (writer, reader) = work_queue(4);
    writer
        .send(WorkItem { definition: every_minute(4), due_at: at(1, 0) })
        .await
        .unwrap();
    writer.close();

    executor.run(reader, CancellationToken::new()).await;
    assert_eq!(stats.failed(), 1);
    assert_eq!(stats.processed(), 0);
}

#[tokio::test]
async fn test_service_runs_cleanups_and_stops_cleanly() {
    let store = Arc::new(InMemoryDefinitionStore::new(
        vec![CleanupDefinition::new(77, Duration::from_secs(60), "* * * * * *")],
        vec![],
    ));
    let platform = Arc::new(FakePlatform::default());
    platform.set_deletable(77, 3);

    let config = CleanupConfig {
        tick_interval: Duration::from_millis(100),
        queue_capacity: 4,
        retry: RetryPolicy::default(),
    };
    let shutdown = CancellationToken::new();
    let service = CleanupService::start(store, Arc::new(CronCrateParser), platform.clone(), config, &shutdown);
    let stats = service.stats();

    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while stats.processed() == 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "no cleanup ran within 5s");
    assert!(platform.delete_calls(77) >= 1);
    assert!(stats.messages_deleted() >= 3);

    tokio::time::timeout(Duration::from_secs(5), service.stop())
        .await
        .expect("service stops promptly");
}
