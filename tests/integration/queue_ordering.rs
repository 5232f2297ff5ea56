use crate::helpers::tasks_in_creation_order;
use std::sync::Arc;
use taskminder::{TaskPriority, TaskQueue, TaskminderError};

#[test]
fn mixed_priorities_pop_high_medium_low() {
    let tasks =
        tasks_in_creation_order(&[TaskPriority::Low, TaskPriority::High, TaskPriority::Medium]);
    let mut queue = TaskQueue::new();
    for task in &tasks {
        queue.insert(Arc::clone(task));
    }

    let popped: Vec<TaskPriority> = (0..3)
        .map(|_| queue.pop_highest().unwrap().priority())
        .collect();
    assert_eq!(
        popped,
        vec![TaskPriority::High, TaskPriority::Medium, TaskPriority::Low]
    );
}

#[test]
fn equal_priority_pops_oldest_first() {
    let tasks = tasks_in_creation_order(&[TaskPriority::Medium, TaskPriority::Medium]);
    let mut queue = TaskQueue::new();
    queue.insert(Arc::clone(&tasks[1]));
    queue.insert(Arc::clone(&tasks[0]));

    assert_eq!(queue.pop_highest().unwrap().id(), tasks[0].id());
    assert_eq!(queue.pop_highest().unwrap().id(), tasks[1].id());
}

#[test]
fn each_pop_shrinks_by_one_until_empty() {
    let tasks = tasks_in_creation_order(&[
        TaskPriority::Low,
        TaskPriority::Low,
        TaskPriority::High,
        TaskPriority::Medium,
        TaskPriority::High,
    ]);
    let mut queue = TaskQueue::new();
    for task in &tasks {
        queue.insert(Arc::clone(task));
    }

    let mut last_key = None;
    for expected_len in (0..tasks.len()).rev() {
        let task = queue.pop_highest().unwrap();
        assert_eq!(queue.len(), expected_len);
        assert!(!queue.contains(task.id()));
        let key = (task.priority().rank(), task.created_time());
        if let Some(prev) = last_key {
            assert!(prev <= key, "popped out of order");
        }
        last_key = Some(key);
    }

    assert!(matches!(queue.peek_highest(), Err(TaskminderError::EmptyQueue)));
    assert!(matches!(queue.pop_highest(), Err(TaskminderError::EmptyQueue)));
}

#[test]
fn removal_is_by_identity_among_equal_keys() {
    let tasks = tasks_in_creation_order(&[TaskPriority::High; 4]);
    let mut queue = TaskQueue::new();
    for task in &tasks {
        queue.insert(Arc::clone(task));
    }

    assert!(queue.remove(tasks[2].id()));
    assert!(!queue.remove(tasks[2].id()));
    let remaining: Vec<_> = queue.sorted().iter().map(|t| t.id()).collect();
    assert_eq!(remaining, vec![tasks[0].id(), tasks[1].id(), tasks[3].id()]);
}
