// tests/motd_tests.rs

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use modbot_common::models::{ChannelMotd, MotdField, MotdMessage};
use modbot_core::Error;
use modbot_core::repositories::InMemoryDefinitionStore;
use modbot_core::services::{MotdReport, MotdService};
use modbot_core::test_utils::FakePlatform;

const RULES_CHANNEL: u64 = 10;

fn embed(title: &str) -> MotdMessage {
    MotdMessage {
        title: title.to_string(),
        description: "Read before posting".to_string(),
        fields: vec![MotdField {
            name: "1".to_string(),
            content: "Be nice".to_string(),
            inline: false,
        }],
        ..Default::default()
    }
}

fn rules(titles: &[&str]) -> Vec<ChannelMotd> {
    vec![ChannelMotd {
        channel_id: RULES_CHANNEL,
        messages: titles.iter().map(|t| embed(t)).collect(),
    }]
}

fn titles(platform: &FakePlatform) -> Vec<Option<String>> {
    platform
        .channel_embeds(RULES_CHANNEL)
        .into_iter()
        .map(|e| e.map(|m| m.title))
        .collect()
}

fn service() -> (Arc<InMemoryDefinitionStore>, Arc<FakePlatform>, MotdService) {
    let store = Arc::new(InMemoryDefinitionStore::default());
    let platform = Arc::new(FakePlatform::default());
    let service = MotdService::new(store.clone(), platform.clone());
    (store, platform, service)
}

#[tokio::test]
async fn test_posts_missing_motds_once() -> Result<(), Error> {
    let (store, platform, service) = service();
    store.set_motds(rules(&["Rules", "Links"]));

    let report = service.sync().await?;
    assert_eq!(report, Some(MotdReport { created: 2, ..Default::default() }));
    assert_eq!(titles(&platform), vec![Some("Rules".into()), Some("Links".into())]);

    assert_eq!(service.sync().await?, None);
    assert_eq!(platform.embed_posts(), 2);
    assert_eq!(platform.embed_edits(), 0);
    Ok(())
}

#[tokio::test]
async fn test_changed_definitions_edit_in_place_and_append() -> Result<(), Error> {
    let (store, platform, service) = service();
    store.set_motds(rules(&["Rules", "Links"]));
    service.sync().await?;

    store.set_motds(rules(&["Server rules", "Links", "FAQ"]));
    let report = service.sync().await?;
    assert_eq!(report, Some(MotdReport { created: 1, updated: 2, ..Default::default() }));
    assert_eq!(
        titles(&platform),
        vec![Some("Server rules".into()), Some("Links".into()), Some("FAQ".into())]
    );
    Ok(())
}

#[tokio::test]
async fn test_slots_owned_by_others_are_left_alone() -> Result<(), Error> {
    let (store, platform, service) = service();
    platform.post_as(RULES_CHANNEL, 99);
    store.set_motds(rules(&["Rules", "Links"]));

    let report = service.sync().await?;
    assert_eq!(report, Some(MotdReport { created: 1, skipped: 1, ..Default::default() }));
    assert_eq!(titles(&platform), vec![None, Some("Links".into())]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_run_applies_on_start_and_after_changes() {
    let (store, platform, service) = service();
    store.set_motds(rules(&["Rules"]));
    let service = Arc::new(service);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(service.clone().run(Duration::from_secs(10), cancel.clone()));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(platform.embed_posts(), 1);

    store.set_motds(rules(&["New rules"]));
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(platform.embed_edits(), 1);
    assert_eq!(titles(&platform), vec![Some("New rules".into())]);

    cancel.cancel();
    handle.await.unwrap();
}
