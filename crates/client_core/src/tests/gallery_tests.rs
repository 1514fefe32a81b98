use super::*;
use crate::{
    cache::MemorySessionStore,
    focus::Key,
    loader::DEFAULT_CACHE_TTL,
    rotation::DEFAULT_ROTATION_INTERVAL,
    test_support::{at, items, ManualClock, ScriptedBackend},
};

const ROTATE: Discipline = Discipline::Rotation {
    interval: DEFAULT_ROTATION_INTERVAL,
};

fn loader_for(backend: Arc<ScriptedBackend>) -> Arc<CollectionLoader> {
    Arc::new(CollectionLoader::new_with_clock(
        backend,
        Arc::new(MemorySessionStore::new()),
        ManualClock::new(at(0)),
        DEFAULT_CACHE_TTL,
    ))
}

fn loader_with_clock(
    backend: Arc<ScriptedBackend>,
    clock: Arc<ManualClock>,
) -> Arc<CollectionLoader> {
    Arc::new(CollectionLoader::new_with_clock(
        backend,
        Arc::new(MemorySessionStore::new()),
        clock,
        DEFAULT_CACHE_TTL,
    ))
}

fn past_cache_ttl() -> Duration {
    DEFAULT_CACHE_TTL + Duration::from_secs(1)
}

fn numbered(n: usize) -> Vec<MediaItem> {
    let keys: Vec<String> = (0..n).map(|i| format!("wish-{i:02}")).collect();
    let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    items(&refs)
}

fn active_index(snapshot: &GallerySnapshot) -> usize {
    match snapshot.view {
        ViewSnapshot::Rotation { active_index, .. } => active_index,
        ViewSnapshot::Pagination { .. } => panic!("expected rotation view"),
    }
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn rotation_advances_every_interval_after_load() {
    let backend = ScriptedBackend::serving(items(&["A", "B", "C"]));
    let hub = KeyboardHub::new();
    let session =
        GallerySession::mount(loader_for(backend), Category::from("gallery"), ROTATE, &hub)
            .expect("mount");

    assert!(session.snapshot().await.loading);
    session.settled().await;

    let snapshot = session.snapshot().await;
    assert!(!snapshot.loading);
    assert_eq!(snapshot.items.len(), 3);
    assert_eq!(
        snapshot.view,
        ViewSnapshot::Rotation {
            active_index: 0,
            rotating: true
        }
    );

    sleep_ms(5 * 4_000 + 100).await;
    assert_eq!(active_index(&session.snapshot().await), 2);
}

#[tokio::test(start_paused = true)]
async fn jumping_does_not_reset_the_rotation_timer() {
    let backend = ScriptedBackend::serving(items(&["A", "B", "C"]));
    let hub = KeyboardHub::new();
    let session =
        GallerySession::mount(loader_for(backend), Category::from("album"), ROTATE, &hub)
            .expect("mount");
    session.settled().await;

    sleep_ms(4_100).await;
    assert_eq!(active_index(&session.snapshot().await), 1);

    sleep_ms(900).await;
    session.jump_to(0).await.expect("jump");
    assert_eq!(active_index(&session.snapshot().await), 0);

    sleep_ms(3_100).await;
    assert_eq!(active_index(&session.snapshot().await), 1);

    assert_eq!(
        session.jump_to(3).await,
        Err(ViewError::IndexOutOfRange { index: 3, len: 3 })
    );
}

#[tokio::test(start_paused = true)]
async fn empty_collection_never_arms_rotation() {
    let backend = ScriptedBackend::serving(Vec::new());
    let hub = KeyboardHub::new();
    let session =
        GallerySession::mount(loader_for(backend), Category::from("gallery"), ROTATE, &hub)
            .expect("mount");
    session.settled().await;

    sleep_ms(10_000).await;
    let snapshot = session.snapshot().await;
    assert!(snapshot.items.is_empty());
    assert_eq!(
        snapshot.view,
        ViewSnapshot::Rotation {
            active_index: 0,
            rotating: false
        }
    );
}

#[tokio::test]
async fn failed_load_shows_empty_gallery_and_retry_recovers() {
    let backend = ScriptedBackend::failing(500);
    let hub = KeyboardHub::new();
    let session = GallerySession::mount(
        loader_for(backend.clone()),
        Category::from("wishes"),
        Discipline::Pagination { page_size: 8 },
        &hub,
    )
    .expect("mount");
    let mut events = session.subscribe_events();
    session.settled().await;

    let snapshot = session.snapshot().await;
    assert!(!snapshot.loading);
    assert!(snapshot.items.is_empty());
    assert!(snapshot.failure.is_some());
    assert!(matches!(
        events.recv().await.expect("event"),
        GalleryEvent::LoadFailed { .. }
    ));

    backend.fail_with(None);
    backend.set_items(numbered(3));
    session.retry().await;
    session.settled().await;

    let snapshot = session.snapshot().await;
    assert!(snapshot.failure.is_none());
    assert_eq!(snapshot.items.len(), 3);
    assert_eq!(
        events.recv().await.expect("event"),
        GalleryEvent::Loaded {
            category: Category::from("wishes"),
            count: 3,
            source: LoadSource::Network
        }
    );
}

#[tokio::test(start_paused = true)]
async fn result_arriving_after_unmount_is_discarded() {
    let backend = ScriptedBackend::slow(items(&["A", "B"]), Duration::from_millis(500));
    let hub = KeyboardHub::new();
    let session =
        GallerySession::mount(loader_for(backend.clone()), Category::from("gallery"), ROTATE, &hub)
            .expect("mount");

    session.unmount().await;
    session.settled().await;

    let snapshot = session.snapshot().await;
    assert_eq!(backend.calls(), 1);
    assert!(snapshot.items.is_empty());
    assert!(snapshot.loading);
    assert_eq!(active_index(&snapshot), 0);
}

#[tokio::test(start_paused = true)]
async fn unmount_stops_rotation_and_closes_lightbox() {
    let backend = ScriptedBackend::serving(items(&["A", "B", "C"]));
    let hub = KeyboardHub::new();
    let session =
        GallerySession::mount(loader_for(backend), Category::from("gallery"), ROTATE, &hub)
            .expect("mount");
    session.settled().await;
    session.open(&MediaKey::from("B")).await.expect("open");
    assert_eq!(hub.listener_count(), 1);

    session.unmount().await;
    sleep_ms(20_000).await;

    let snapshot = session.snapshot().await;
    assert_eq!(active_index(&snapshot), 0);
    assert!(snapshot.selected.is_none());
    assert_eq!(hub.listener_count(), 0);
    assert_eq!(
        snapshot.view,
        ViewSnapshot::Rotation {
            active_index: 0,
            rotating: false
        }
    );
}

#[tokio::test]
async fn pagination_walks_twenty_items_in_pages_of_nine() {
    let backend = ScriptedBackend::serving(numbered(20));
    let hub = KeyboardHub::new();
    let session = GallerySession::mount(
        loader_for(backend),
        Category::from("wishes"),
        Discipline::Pagination { page_size: 9 },
        &hub,
    )
    .expect("mount");
    session.settled().await;
    let mut events = session.subscribe_events();

    assert!(!session.prev_page().await.expect("prev"));
    assert!(session.next_page().await.expect("next"));
    assert_eq!(events.recv().await.expect("event"), GalleryEvent::PageChanged(1));

    session.go_to_page(2).await.expect("go to last");
    assert!(!session.next_page().await.expect("next"));
    assert_eq!(
        session.page_info().await.expect("page info"),
        PageInfo {
            page: 3,
            total_pages: 3,
            item_count: 20
        }
    );

    let snapshot = session.snapshot().await;
    match snapshot.view {
        ViewSnapshot::Pagination {
            page_index,
            total_pages,
            visible,
        } => {
            assert_eq!(page_index, 2);
            assert_eq!(total_pages, 3);
            let keys: Vec<&str> = visible.iter().map(|item| item.key.as_str()).collect();
            assert_eq!(keys, ["wish-18", "wish-19"]);
        }
        ViewSnapshot::Rotation { .. } => panic!("expected pagination view"),
    }

    assert_eq!(
        session.go_to_page(3).await,
        Err(ViewError::PageOutOfRange {
            page: 3,
            total_pages: 3
        })
    );
    assert_eq!(
        session.jump_to(0).await,
        Err(ViewError::WrongDiscipline {
            expected: "rotation"
        })
    );
}

#[tokio::test]
async fn refetch_with_fewer_items_clamps_page_index() {
    let backend = ScriptedBackend::serving(numbered(30));
    let clock = ManualClock::new(at(0));
    let loader = Arc::new(CollectionLoader::new_with_clock(
        backend.clone(),
        Arc::new(MemorySessionStore::new()),
        clock.clone(),
        DEFAULT_CACHE_TTL,
    ));
    let hub = KeyboardHub::new();
    let session = GallerySession::mount(
        loader,
        Category::from("wishes"),
        Discipline::Pagination { page_size: 8 },
        &hub,
    )
    .expect("mount");
    session.settled().await;
    session.go_to_page(3).await.expect("page 3");

    backend.set_items(numbered(10));
    clock.advance(Duration::from_secs(2 * 60 * 60));
    session.retry().await;
    session.settled().await;

    match session.snapshot().await.view {
        ViewSnapshot::Pagination {
            page_index,
            total_pages,
            visible,
        } => {
            assert_eq!(total_pages, 2);
            assert_eq!(page_index, 1);
            assert_eq!(visible.len(), 2);
        }
        ViewSnapshot::Rotation { .. } => panic!("expected pagination view"),
    }
}

#[tokio::test]
async fn lightbox_opens_on_known_items_and_closes_on_escape_or_backdrop() {
    let backend = ScriptedBackend::serving(items(&["A", "B"]));
    let hub = KeyboardHub::new();
    let session = GallerySession::mount(
        loader_for(backend),
        Category::from("wishes"),
        Discipline::Pagination { page_size: 8 },
        &hub,
    )
    .expect("mount");
    session.settled().await;

    assert_eq!(
        session.open(&MediaKey::from("Z")).await,
        Err(ViewError::UnknownItem {
            key: "Z".to_string()
        })
    );

    session.open(&MediaKey::from("A")).await.expect("open");
    hub.press(Key::Escape);
    assert!(session.pump_keys().await);
    assert!(session.snapshot().await.selected.is_none());

    hub.press(Key::Escape);
    assert!(!session.pump_keys().await);

    session.open(&MediaKey::from("B")).await.expect("open");
    assert!(!session.pointer(PointerTarget::Content).await);
    assert!(session.pointer(PointerTarget::Backdrop).await);
    assert!(!session.close().await);
    assert_eq!(hub.listener_count(), 0);
}

#[test]
fn zero_page_size_is_rejected_at_mount() {
    let backend = ScriptedBackend::serving(Vec::new());
    let result = GallerySession::mount(
        loader_for(backend),
        Category::from("wishes"),
        Discipline::Pagination { page_size: 0 },
        &KeyboardHub::new(),
    );
    assert!(matches!(result, Err(ViewError::InvalidPageSize)));
}

#[test]
fn zero_rotation_interval_is_rejected_at_mount() {
    let backend = ScriptedBackend::serving(Vec::new());
    let result = GallerySession::mount(
        loader_for(backend),
        Category::from("gallery"),
        Discipline::Rotation {
            interval: Duration::ZERO,
        },
        &KeyboardHub::new(),
    );
    assert!(matches!(result, Err(ViewError::InvalidInterval)));
}

#[tokio::test(start_paused = true)]
async fn reload_with_fewer_items_keeps_one_timer_and_clamps_index() {
    let backend = ScriptedBackend::serving(items(&["A", "B", "C", "D"]));
    let clock = ManualClock::new(at(0));
    let hub = KeyboardHub::new();
    let session = GallerySession::mount(
        loader_with_clock(backend.clone(), clock.clone()),
        Category::from("gallery"),
        ROTATE,
        &hub,
    )
    .expect("mount");
    session.settled().await;

    sleep_ms(3 * 4_000 + 100).await;
    assert_eq!(active_index(&session.snapshot().await), 3);

    backend.set_items(items(&["A", "B"]));
    clock.advance(past_cache_ttl());
    session.retry().await;
    session.settled().await;

    let snapshot = session.snapshot().await;
    assert_eq!(backend.calls(), 2);
    assert_eq!(snapshot.items.len(), 2);
    assert_eq!(
        snapshot.view,
        ViewSnapshot::Rotation {
            active_index: 1,
            rotating: true
        }
    );

    // The replaced timer would have fired here.
    sleep_ms(3_950).await;
    assert_eq!(active_index(&session.snapshot().await), 1);

    sleep_ms(100).await;
    assert_eq!(active_index(&session.snapshot().await), 0);

    sleep_ms(4_000).await;
    assert_eq!(active_index(&session.snapshot().await), 1);
}

#[tokio::test(start_paused = true)]
async fn reload_returning_nothing_stops_rotation() {
    let backend = ScriptedBackend::serving(items(&["A", "B", "C"]));
    let clock = ManualClock::new(at(0));
    let hub = KeyboardHub::new();
    let session = GallerySession::mount(
        loader_with_clock(backend.clone(), clock.clone()),
        Category::from("gallery"),
        ROTATE,
        &hub,
    )
    .expect("mount");
    session.settled().await;
    sleep_ms(4_100).await;
    assert_eq!(active_index(&session.snapshot().await), 1);

    backend.set_items(Vec::new());
    clock.advance(past_cache_ttl());
    session.retry().await;
    session.settled().await;

    sleep_ms(10_000).await;
    let snapshot = session.snapshot().await;
    assert_eq!(backend.calls(), 2);
    assert!(snapshot.items.is_empty());
    assert_eq!(
        snapshot.view,
        ViewSnapshot::Rotation {
            active_index: 0,
            rotating: false
        }
    );
}

#[tokio::test(start_paused = true)]
async fn retry_during_a_load_settles_only_on_the_latest_result() {
    let backend = ScriptedBackend::slow(items(&["A", "B"]), Duration::from_millis(500));
    backend.fail_with(Some(503));
    let hub = KeyboardHub::new();
    let session = GallerySession::mount(
        loader_for(backend.clone()),
        Category::from("gallery"),
        ROTATE,
        &hub,
    )
    .expect("mount");

    sleep_ms(100).await;
    session.retry().await;

    // First load has failed by now, but a newer one is still running.
    sleep_ms(600).await;
    let snapshot = session.snapshot().await;
    assert!(snapshot.loading);
    assert!(snapshot.failure.is_none());
    assert!(snapshot.items.is_empty());

    backend.fail_with(None);
    assert!(
        tokio::time::timeout(Duration::from_millis(100), session.settled())
            .await
            .is_err()
    );

    session.settled().await;
    let snapshot = session.snapshot().await;
    assert_eq!(backend.calls(), 2);
    assert!(!snapshot.loading);
    assert!(snapshot.failure.is_none());
    assert_eq!(snapshot.items.len(), 2);
}
