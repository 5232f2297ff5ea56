//! Service flows over a real SQLite store.

use chrono::{TimeDelta, Utc};
use std::time::Duration;
use taskminder::{
    ChannelNotifier, ReminderScheduler, SchedulerConfig, SqliteTaskStore, StoreError, TaskEdit,
    TaskPriority, TaskRecord, TaskRef, TaskRepository, TaskService, TaskStatus,
};
use tokio::sync::mpsc;

fn open_service(
    path: &std::path::Path,
) -> (
    TaskService<SqliteTaskStore>,
    mpsc::UnboundedReceiver<TaskRef>,
) {
    let store = SqliteTaskStore::open(path).expect("open store");
    let (notifier, rx) = ChannelNotifier::channel();
    let scheduler =
        ReminderScheduler::new(notifier, SchedulerConfig::default()).expect("create scheduler");
    (TaskService::new(store, scheduler), rx)
}

fn record(title: &str, priority: TaskPriority, remind_in: TimeDelta) -> TaskRecord {
    let now = Utc::now();
    TaskRecord::builder()
        .title(title)
        .description("from the service test")
        .due_time(now + TimeDelta::hours(1))
        .reminder_time(now + remind_in)
        .priority(priority)
        .build()
        .expect("all fields set")
}

#[tokio::test]
async fn restart_reloads_open_tasks_in_priority_order() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("tasks.db");

    let (low_id, high_id, done_id) = {
        let (svc, _rx) = open_service(&path);
        let (low, _) = svc
            .add_task(record("low", TaskPriority::Low, TimeDelta::hours(1)))
            .unwrap();
        let (high, _) = svc
            .add_task(record("high", TaskPriority::High, TimeDelta::hours(1)))
            .unwrap();
        let (done, _) = svc
            .add_task(record("done", TaskPriority::High, TimeDelta::hours(1)))
            .unwrap();
        svc.complete_task(done.id()).unwrap();
        svc.shutdown().await;
        (low.id(), high.id(), done.id())
    };

    let (svc, _rx) = open_service(&path);
    assert_eq!(svc.load().unwrap(), 2);
    let order: Vec<_> = svc
        .scheduler()
        .pending_tasks()
        .iter()
        .map(|t| t.id())
        .collect();
    assert_eq!(order, vec![high_id, low_id]);
    assert!(svc.scheduler().has_reminder(high_id));
    assert_eq!(svc.find(done_id).unwrap().status(), TaskStatus::Completed);
    assert_eq!(svc.all_tasks().unwrap().len(), 3);
}

#[tokio::test]
async fn reloaded_task_reminder_fires_and_overdue_is_synced() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("tasks.db");
    let now = Utc::now();
    {
        let store = SqliteTaskStore::open(&path).expect("open store");
        store
            .save(&TaskRecord::new(
                "late",
                "",
                now - TimeDelta::minutes(1),
                now + TimeDelta::milliseconds(300),
                TaskPriority::Medium,
            ))
            .unwrap();
    }

    let (svc, mut rx) = open_service(&path);
    svc.load().unwrap();
    let fired = tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("reminder within timeout")
        .expect("channel open");
    assert_eq!(fired.status(), TaskStatus::Overdue);

    svc.shutdown().await;
    svc.sync_pending().unwrap();
    assert_eq!(
        svc.repository().get_by_id(fired.id()).unwrap().status(),
        TaskStatus::Overdue
    );
}

#[tokio::test]
async fn overdue_sync_keeps_changes_from_another_service() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("tasks.db");
    let now = Utc::now();
    let late = |title: &str| {
        TaskRecord::new(
            title,
            "",
            now - TimeDelta::minutes(1),
            now + TimeDelta::milliseconds(200),
            TaskPriority::Medium,
        )
    };

    let (watcher, mut rx) = open_service(&path);
    let (done, _) = watcher.add_task(late("completed elsewhere")).unwrap();
    let (gone, _) = watcher.add_task(late("deleted elsewhere")).unwrap();
    let (open, _) = watcher.add_task(late("left alone")).unwrap();

    let (editor, _editor_rx) = open_service(&path);
    editor.complete_task(done.id()).unwrap();
    editor.delete_task(gone.id()).unwrap();

    for _ in 0..3 {
        tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("reminder within timeout")
            .expect("channel open");
    }
    watcher.shutdown().await;

    assert_eq!(watcher.sync_pending().unwrap(), 1);
    let store = editor.repository();
    assert_eq!(
        store.get_by_id(done.id()).unwrap().status(),
        TaskStatus::Completed
    );
    assert!(matches!(
        store.get_by_id(gone.id()),
        Err(StoreError::NotFound(_))
    ));
    assert_eq!(
        store.get_by_id(open.id()).unwrap().status(),
        TaskStatus::Overdue
    );
}

#[tokio::test]
async fn edit_then_delete_round_trip() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let (svc, _rx) = open_service(&dir.path().join("tasks.db"));
    let (task, _) = svc
        .add_task(record("draft", TaskPriority::Medium, TimeDelta::hours(1)))
        .unwrap();
    let new_due = Utc::now() + TimeDelta::days(2);

    svc.edit_task(
        task.id(),
        TaskEdit {
            title: Some("final".to_owned()),
            due_time: Some(new_due),
            ..TaskEdit::default()
        },
    )
    .unwrap();
    let stored = svc.repository().get_by_id(task.id()).unwrap();
    assert_eq!(stored.title(), "final");
    assert_eq!(stored.due_time(), new_due);

    svc.start_task(task.id()).unwrap();
    svc.delete_task(task.id()).unwrap();
    assert_eq!(svc.scheduler().pending_count(), 0);
    assert!(svc.all_tasks().unwrap().is_empty());
}
