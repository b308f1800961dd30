mod common;

use std::sync::Arc;
use std::time::Duration;

use common::lesson_id;
use services::{NoticeKind, ProgressStoreClient, RecordingNotifier};
use storage::repository::InMemoryRepository;
use tokio::time::sleep;

fn store(repo: &InMemoryRepository, notifier: &RecordingNotifier) -> ProgressStoreClient {
    ProgressStoreClient::new(Arc::new(repo.clone()), Arc::new(notifier.clone()))
}

#[tokio::test(start_paused = true)]
async fn burst_of_updates_coalesces_into_one_write() {
    let repo = InMemoryRepository::new();
    let store = store(&repo, &RecordingNotifier::new());
    let lesson = lesson_id(1);

    for i in 1..=10 {
        store.save_progress(lesson, f64::from(i), false);
        sleep(Duration::from_millis(200)).await;
    }
    assert!(repo.writes_for(lesson).is_empty());

    sleep(Duration::from_secs(4)).await;
    let writes = repo.writes_for(lesson);
    assert_eq!(writes.len(), 1);
    assert!((writes[0].watched_time - 10.0).abs() < f64::EPSILON);
    assert!(!writes[0].completed);
}

#[tokio::test(start_paused = true)]
async fn completion_skips_the_save_window() {
    let repo = InMemoryRepository::new();
    let store = store(&repo, &RecordingNotifier::new());
    let lesson = lesson_id(2);

    store.save_progress(lesson, 50.0, false);
    sleep(Duration::from_secs(1)).await;
    store.save_progress(lesson, 95.0, true);
    sleep(Duration::from_millis(250)).await;

    let writes = repo.writes_for(lesson);
    assert_eq!(writes.len(), 1);
    assert!(writes[0].completed);
    assert!((writes[0].watched_time - 95.0).abs() < f64::EPSILON);

    // The superseded ordinary write never goes out.
    sleep(Duration::from_secs(10)).await;
    assert_eq!(repo.writes_for(lesson).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn later_updates_after_completion_use_the_window() {
    let repo = InMemoryRepository::new();
    let store = store(&repo, &RecordingNotifier::new());
    let lesson = lesson_id(3);

    store.save_progress(lesson, 92.0, true);
    sleep(Duration::from_millis(250)).await;
    store.save_progress(lesson, 97.0, true);
    sleep(Duration::from_secs(1)).await;
    assert_eq!(repo.writes_for(lesson).len(), 1);

    sleep(Duration::from_secs(5)).await;
    let writes = repo.writes_for(lesson);
    assert_eq!(writes.len(), 2);
    assert!((writes[1].watched_time - 97.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn lessons_are_debounced_independently() {
    let repo = InMemoryRepository::new();
    let store = store(&repo, &RecordingNotifier::new());

    store.save_progress(lesson_id(1), 10.0, false);
    store.save_progress(lesson_id(2), 20.0, false);
    sleep(Duration::from_secs(6)).await;

    assert_eq!(repo.writes_for(lesson_id(1)).len(), 1);
    assert_eq!(repo.writes_for(lesson_id(2)).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_write_is_reported_once_and_not_retried() {
    let repo = InMemoryRepository::new();
    let notifier = RecordingNotifier::new();
    let store = store(&repo, &notifier);
    let lesson = lesson_id(4);

    repo.set_fail_writes(true);
    store.save_progress(lesson, 30.0, false);
    sleep(Duration::from_secs(6)).await;
    assert_eq!(notifier.count(NoticeKind::Advisory), 1);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(notifier.count(NoticeKind::Advisory), 1);
    assert!(repo.writes().is_empty());

    // The next natural update carries the fresher value.
    repo.set_fail_writes(false);
    store.save_progress(lesson, 40.0, false);
    sleep(Duration::from_secs(6)).await;
    let writes = repo.writes_for(lesson);
    assert_eq!(writes.len(), 1);
    assert!((writes[0].watched_time - 40.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn flush_all_sends_every_pending_write() {
    let repo = InMemoryRepository::new();
    let store = store(&repo, &RecordingNotifier::new());

    store.save_progress(lesson_id(1), 5.0, false);
    store.save_progress(lesson_id(2), 6.0, false);
    store.flush_all().await;

    assert_eq!(repo.writes().len(), 2);
    assert!(!store.has_pending(lesson_id(1)));
    assert!(!store.has_pending(lesson_id(2)));
}
