//! End-to-end reminder scenarios at shortened timings.

use crate::helpers::{channel_scheduler, drain, task_in};
use chrono::{TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use taskminder::{ReminderArming, TaskPriority, TaskStatus, TaskminderError};
use tokio::time::{sleep, timeout};

#[tokio::test]
async fn reminder_before_due_fires_once_and_keeps_status() {
    let (scheduler, mut rx) = channel_scheduler();
    let task = task_in(
        TaskPriority::Medium,
        TimeDelta::minutes(10),
        TimeDelta::milliseconds(200),
    );
    scheduler.schedule_task(Arc::clone(&task)).unwrap();

    let fired = timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("reminder within timeout")
        .expect("channel open");
    assert_eq!(fired.id(), task.id());
    assert_eq!(task.status(), TaskStatus::NotStarted);

    sleep(Duration::from_millis(300)).await;
    assert!(drain(&mut rx).is_empty(), "reminder fired more than once");
}

#[tokio::test]
async fn reminder_after_due_marks_overdue() {
    let (scheduler, mut rx) = channel_scheduler();
    let task = task_in(
        TaskPriority::High,
        TimeDelta::minutes(-1),
        TimeDelta::milliseconds(100),
    );
    scheduler.schedule_task(Arc::clone(&task)).unwrap();

    timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("reminder within timeout")
        .expect("channel open");
    assert_eq!(task.status(), TaskStatus::Overdue);

    sleep(Duration::from_millis(200)).await;
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn immediate_completion_never_notifies() {
    let (scheduler, mut rx) = channel_scheduler();
    let task = task_in(
        TaskPriority::Low,
        TimeDelta::minutes(5),
        TimeDelta::milliseconds(100),
    );
    scheduler.schedule_task(Arc::clone(&task)).unwrap();
    scheduler.complete_task(&task);

    assert!(matches!(
        scheduler.get_next_pending_task(),
        Err(TaskminderError::EmptyQueue)
    ));
    assert!(!scheduler.has_reminder(task.id()));

    sleep(Duration::from_millis(400)).await;
    assert!(drain(&mut rx).is_empty());
    assert_eq!(task.status(), TaskStatus::Completed);
}

#[tokio::test]
async fn reschedule_moves_the_single_firing() {
    let (scheduler, mut rx) = channel_scheduler();
    let start = tokio::time::Instant::now();
    let task = task_in(
        TaskPriority::High,
        TimeDelta::minutes(10),
        TimeDelta::milliseconds(400),
    );
    scheduler.schedule_task(Arc::clone(&task)).unwrap();

    sleep(Duration::from_millis(200)).await;
    let arming = scheduler
        .reschedule_task(&task, Utc::now() + TimeDelta::milliseconds(600))
        .unwrap();
    assert!(arming.is_armed());

    // Past the original reminder time, well before the new one.
    sleep(Duration::from_millis(400)).await;
    assert!(drain(&mut rx).is_empty(), "original reminder fired");

    let fired = timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("rescheduled reminder within timeout")
        .expect("channel open");
    assert_eq!(fired.id(), task.id());
    assert!(start.elapsed() >= Duration::from_millis(790));

    sleep(Duration::from_millis(300)).await;
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn past_reminder_is_queued_but_never_fires() {
    let (scheduler, mut rx) = channel_scheduler();
    let task = task_in(
        TaskPriority::Medium,
        TimeDelta::minutes(-10),
        TimeDelta::minutes(-5),
    );

    let arming = scheduler.schedule_task(Arc::clone(&task)).unwrap();
    assert_eq!(arming, ReminderArming::Skipped);
    assert!(!scheduler.has_reminder(task.id()));
    assert_eq!(scheduler.get_next_pending_task().unwrap().id(), task.id());

    sleep(Duration::from_millis(200)).await;
    assert!(drain(&mut rx).is_empty());
    // Overdue is only evaluated when a reminder fires.
    assert_eq!(task.status(), TaskStatus::NotStarted);
}

#[tokio::test]
async fn completing_after_fire_clears_queue_and_registry() {
    let (scheduler, mut rx) = channel_scheduler();
    let task = task_in(
        TaskPriority::High,
        TimeDelta::minutes(10),
        TimeDelta::milliseconds(50),
    );
    scheduler.schedule_task(Arc::clone(&task)).unwrap();
    timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("reminder within timeout");

    scheduler.complete_task(&task);
    scheduler.complete_task(&task);
    assert_eq!(scheduler.pending_count(), 0);
    assert!(!scheduler.has_reminder(task.id()));
    assert_eq!(task.status(), TaskStatus::Completed);
}

#[tokio::test]
async fn shutdown_stops_pending_reminders() {
    let (scheduler, mut rx) = channel_scheduler();
    let tasks: Vec<_> = (0..3)
        .map(|_| {
            task_in(
                TaskPriority::Low,
                TimeDelta::minutes(10),
                TimeDelta::milliseconds(200),
            )
        })
        .collect();
    for task in &tasks {
        scheduler.schedule_task(Arc::clone(task)).unwrap();
    }

    let report = scheduler.shutdown().await;
    assert_eq!(report.cancelled_reminders, 3);
    assert!(!report.forced);

    sleep(Duration::from_millis(400)).await;
    assert!(drain(&mut rx).is_empty());
    assert!(matches!(
        scheduler.schedule_task(Arc::clone(&tasks[0])),
        Err(TaskminderError::RejectedScheduling(_))
    ));
}
