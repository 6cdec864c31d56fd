// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Profile switching, isolation and migration as seen by a running engine.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{TestHarness, wait_until};
use dragon_bus::{BusEvent, EventBus};
use dragon_core::types::{Avatar, Grade, ItemType, ReviewItem};
use dragon_core::{ManualClock, StorageBackend};
use dragon_srs::{AddOptions, ProfileManager, SchedulingEngine};
use dragon_test_utils::MockBackend;

fn seeded(text: &str, added_at: i64) -> ReviewItem {
    ReviewItem {
        key: ReviewItem::key_for(ItemType::Word, text),
        text: text.to_string(),
        item_type: ItemType::Word,
        srs_box: 2,
        due: added_at,
        added_at,
        history: Vec::new(),
    }
}

#[tokio::test]
async fn items_do_not_cross_profiles() {
    let h = TestHarness::new().await;
    let a = h.profiles.create("A", Avatar::Male).await.unwrap();
    let b = h.profiles.create("B", Avatar::Child).await.unwrap();

    h.profiles.switch(&a.id).await.unwrap();
    h.wait_for_profile(&a.id).await;
    h.engine.add_item("你好", ItemType::Word, AddOptions::default());

    h.profiles.switch(&b.id).await.unwrap();
    h.wait_for_profile(&b.id).await;
    assert!(h.engine.list_all().iter().all(|i| i.key != "word:你好"));
    assert!(h.engine.is_empty());

    h.engine.add_item("你好", ItemType::Word, AddOptions { initial_box: Some(5) });
    h.engine.flush().await;
    assert_eq!(h.backend.stored_items(Some(&a.id)).await["word:你好"].srs_box, 1);
    assert_eq!(h.backend.stored_items(Some(&b.id)).await["word:你好"].srs_box, 5);

    h.profiles.switch(&a.id).await.unwrap();
    h.wait_for_profile(&a.id).await;
    assert_eq!(h.engine.get("word:你好").unwrap().srs_box, 1);
}

#[tokio::test]
async fn first_switch_migrates_legacy_state_once() {
    let h = TestHarness::new().await;
    h.backend.seed_item(seeded("legacy", 1), None).await;
    h.backend.seed_setting("ui.lang", "vi", None).await;

    let first = h.profiles.create("First", Avatar::Female).await.unwrap();
    let second = h.profiles.create("Second", Avatar::Male).await.unwrap();

    let outcome = h.profiles.switch(&first.id).await.unwrap();
    assert_eq!(outcome.previous, None);
    assert_eq!(outcome.migrated.copied, vec!["srs.items".to_string(), "ui.lang".to_string()]);
    h.wait_for_profile(&first.id).await;
    assert!(h.engine.get("word:legacy").is_some());

    // Only the first profile ever made current inherits legacy state.
    let outcome = h.profiles.switch(&second.id).await.unwrap();
    assert_eq!(outcome.previous.as_deref(), Some(first.id.as_str()));
    assert!(outcome.migrated.is_empty());
    h.wait_for_profile(&second.id).await;
    assert!(h.engine.is_empty());

    let again = h.backend.migrate_global_to_profile(&first.id).await.unwrap();
    assert!(again.is_empty());
    assert_eq!(h.backend.stored_items(Some(&first.id)).await.len(), 1);
}

#[tokio::test]
async fn queued_item_from_before_any_profile_moves_with_the_first_switch() {
    let h = TestHarness::new().await;
    let p = h.profiles.create("Lan", Avatar::Female).await.unwrap();
    h.engine.add_item("legacy", ItemType::Word, AddOptions::default());

    // No flush: the upsert may still be queued when the switch starts.
    let outcome = h.profiles.switch(&p.id).await.unwrap();
    assert_eq!(
        outcome.migrated.copied,
        vec!["srs.items".to_string(), "activity.logs".to_string()]
    );

    h.wait_for_profile(&p.id).await;
    assert!(h.engine.get("word:legacy").is_some());
    assert!(h.backend.stored_items(Some(&p.id)).await.contains_key("word:legacy"));
}

#[tokio::test]
async fn switch_updates_last_active_and_publishes() {
    let h = TestHarness::new().await;
    let mut rx = h.bus.subscribe();
    let p = h.profiles.create("Hoa", Avatar::Female).await.unwrap();

    h.clock.advance(5_000);
    let outcome = h.profiles.switch(&p.id).await.unwrap();
    assert_eq!(outcome.profile.last_active_at, p.created_at + 5_000);
    assert_eq!(h.profiles.current().await.unwrap(), Some(outcome.profile));

    assert_eq!(
        rx.recv().await.unwrap(),
        BusEvent::ProfileChanged {
            previous: None,
            current: p.id.clone()
        }
    );
}

#[tokio::test]
async fn write_in_flight_during_switch_stays_in_old_profile() {
    let h = TestHarness::new().await;
    let a = h.profiles.create("A", Avatar::Male).await.unwrap();
    let b = h.profiles.create("B", Avatar::Female).await.unwrap();
    h.profiles.switch(&a.id).await.unwrap();
    h.wait_for_profile(&a.id).await;

    let gate = h.backend.hold_writes().await;
    h.engine.add_item("đang ghi", ItemType::Phrase, AddOptions::default());
    h.profiles.switch(&b.id).await.unwrap();
    h.wait_for_switch_start(&b.id).await;
    assert!(h.engine.is_empty());
    assert!(h.engine.is_loading());

    drop(gate);
    h.wait_for_profile(&b.id).await;
    h.engine.flush().await;

    assert!(h.engine.is_empty());
    assert!(h.backend.stored_items(Some(&b.id)).await.is_empty());
    assert!(h.backend.stored_items(Some(&a.id)).await.contains_key("phrase:đang ghi"));
    assert!(h.backend.stored_events(Some(&b.id)).await.is_empty());
}

#[tokio::test]
async fn items_added_during_reload_survive_it() {
    let h = TestHarness::new().await;
    h.backend.seed_item(seeded("old", 1), Some("p")).await;

    let gate = h.backend.hold_loads().await;
    let engine = h.engine.clone();
    let switch = tokio::spawn(async move { engine.switch_profile(Some("p".into())).await });
    h.wait_for_switch_start("p").await;

    h.engine.add_item("new", ItemType::Word, AddOptions::default());
    drop(gate);
    switch.await.unwrap();

    let keys: Vec<String> = h.engine.list_all().into_iter().map(|i| i.key).collect();
    assert_eq!(keys, vec!["word:old", "word:new"]);
}

#[tokio::test]
async fn removal_during_reload_is_not_undone() {
    let h = TestHarness::new().await;
    h.backend.seed_item(seeded("gone", 1), Some("p")).await;

    let gate = h.backend.hold_loads().await;
    let engine = h.engine.clone();
    let switch = tokio::spawn(async move { engine.switch_profile(Some("p".into())).await });
    h.wait_for_switch_start("p").await;

    h.engine.remove_item("word:gone");
    drop(gate);
    switch.await.unwrap();

    assert!(h.engine.get("word:gone").is_none());
}

#[tokio::test]
async fn stale_reload_is_discarded() {
    let h = TestHarness::new().await;
    h.backend.seed_item(seeded("from-x", 1), Some("x")).await;
    h.backend.seed_item(seeded("from-y", 1), Some("y")).await;

    let gate = h.backend.hold_loads().await;
    let first = {
        let engine = h.engine.clone();
        tokio::spawn(async move { engine.switch_profile(Some("x".into())).await })
    };
    h.wait_for_switch_start("x").await;
    let second = {
        let engine = h.engine.clone();
        tokio::spawn(async move { engine.switch_profile(Some("y".into())).await })
    };
    h.wait_for_switch_start("y").await;

    drop(gate);
    first.await.unwrap();
    second.await.unwrap();

    assert_eq!(h.engine.profile().as_deref(), Some("y"));
    let keys: Vec<String> = h.engine.list_all().into_iter().map(|i| i.key).collect();
    assert_eq!(keys, vec!["word:from-y"]);
}

#[tokio::test]
#[tracing_test::traced_test]
async fn lagged_listener_keeps_the_map_when_the_profile_is_unchanged() {
    let backend = Arc::new(MockBackend::new());
    let bus = Arc::new(EventBus::with_capacity(1));
    let clock = Arc::new(ManualClock::new(common::T0));
    let engine = SchedulingEngine::start(backend.clone(), clock, bus.clone()).await;
    engine.add_item("giữ", ItemType::Word, AddOptions::default());

    // A reload would block here and leave the map empty.
    let gate = backend.hold_loads().await;
    for kind in ["a", "b", "c"] {
        bus.publish(BusEvent::ActivityUpdated {
            kind: kind.to_string(),
        });
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(logs_contain("profile listener lagged"));
    assert!(!engine.is_loading());
    assert!(engine.get("word:giữ").is_some());
    drop(gate);
}

#[tokio::test]
async fn failed_reload_leaves_an_empty_map() {
    let h = TestHarness::new().await;
    h.engine.add_item("tạm", ItemType::Word, AddOptions::default());
    h.backend.set_fail_loads(true);

    h.engine.switch_profile(Some("broken".into())).await;
    assert!(h.engine.is_empty());
    assert!(!h.engine.is_loading());
}

#[tokio::test]
async fn settings_follow_the_current_profile() {
    let h = TestHarness::new().await;
    h.profiles.set_setting("ui.lang", "en").await.unwrap();

    let p = h.profiles.create("Mai", Avatar::Female).await.unwrap();
    h.profiles.switch(&p.id).await.unwrap();
    assert_eq!(h.profiles.setting("ui.lang").await.unwrap().as_deref(), Some("en"));

    h.profiles.set_setting("ui.lang", "vi").await.unwrap();
    assert_eq!(h.profiles.setting("ui.lang").await.unwrap().as_deref(), Some("vi"));
    assert_eq!(
        h.backend.setting_get("ui.lang", None).await.unwrap().as_deref(),
        Some("en")
    );
}

async fn state_survives_a_restart<F>(open: F)
where
    F: Fn() -> Arc<dyn StorageBackend>,
{
    let clock = Arc::new(ManualClock::new(common::T0));

    let profile_id = {
        let backend = open();
        backend.init().await.unwrap();
        let bus = Arc::new(dragon_bus::EventBus::new());
        let engine = SchedulingEngine::start(backend.clone(), clock.clone(), bus.clone()).await;
        let profiles = ProfileManager::new(backend.clone(), clock.clone(), bus)
            .with_writer(engine.writer().clone());

        let p = profiles.create("Quang", Avatar::Male).await.unwrap();
        profiles.switch(&p.id).await.unwrap();
        wait_until(|| engine.profile().as_deref() == Some(p.id.as_str()) && !engine.is_loading())
            .await;
        engine.add_item("bền", ItemType::Word, AddOptions::default());
        engine.grade_item("word:bền", Grade::Good);
        engine.flush().await;
        backend.close().await.unwrap();
        p.id
    };

    let backend = open();
    backend.init().await.unwrap();
    let engine =
        SchedulingEngine::start(backend.clone(), clock, Arc::new(dragon_bus::EventBus::new())).await;

    assert_eq!(engine.profile(), Some(profile_id.clone()));
    let item = engine.get("word:bền").unwrap();
    assert_eq!(item.srs_box, 2);
    assert_eq!(item.history.len(), 1);
    let kinds: Vec<&str> = backend
        .events_read_all(Some(&profile_id))
        .await
        .unwrap()
        .iter()
        .map(|e| e.kind())
        .collect();
    assert_eq!(kinds, vec!["srs.add", "srs.grade"]);
}

#[tokio::test]
async fn file_store_state_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let kv_dir = dir.path().join("kv");
    state_survives_a_restart(|| -> Arc<dyn StorageBackend> {
        Arc::new(dragon_storage::LocalBackend::new(Arc::new(
            dragon_storage::FileKvStore::new(&kv_dir),
        )))
    })
    .await;
}

#[tokio::test]
async fn sqlite_state_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dragon.db").to_string_lossy().into_owned();
    state_survives_a_restart(|| -> Arc<dyn StorageBackend> {
        Arc::new(dragon_storage::SqliteBackend::new(path.clone(), true))
    })
    .await;
}
