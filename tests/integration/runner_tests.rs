//! Task runner integration tests.
//!
//! Deadline behavior with real threads and real sleeps.

use fabric_precheck::engine::runner::{Task, TaskError, TaskInput, TaskOutcome, TaskRunner};
use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn sleeper(id: &str, ms: u64) -> Task<(), u64> {
    Task::new(id, move |_input: TaskInput<()>| {
        thread::sleep(Duration::from_millis(ms));
        Ok(ms)
    })
}

#[test]
fn test_deadline_reports_slow_task_once() {
    let events = RefCell::new(Vec::new());
    let started = Instant::now();

    let report = TaskRunner::new(Duration::from_millis(1000))
        .on_complete(|id, _| events.borrow_mut().push(format!("done:{}", id)))
        .on_timeout(|id| events.borrow_mut().push(format!("timeout:{}", id)))
        .start(
            vec![sleeper("quick", 200), sleeper("medium", 500), sleeper("slow", 2500)],
            Arc::new(()),
        )
        .join();

    // join returns at the deadline, not when the slow task finishes
    assert!(started.elapsed() < Duration::from_millis(2000));
    assert!(report.is_timed_out());
    assert_eq!(report.timed_out(), &["slow".to_string()]);
    assert_eq!(
        *events.borrow(),
        vec!["done:quick".to_string(), "done:medium".to_string(), "timeout:slow".to_string()]
    );
    assert_eq!(report.get("quick"), Some(&TaskOutcome::Completed(200)));
    assert_eq!(report.get("medium"), Some(&TaskOutcome::Completed(500)));
    assert_eq!(report.get("slow"), Some(&TaskOutcome::TimedOut));
}

#[test]
fn test_late_completion_never_reaches_callbacks() {
    let completes = RefCell::new(0usize);
    let report = TaskRunner::new(Duration::from_millis(50))
        .on_complete(|_, _| *completes.borrow_mut() += 1)
        .start(vec![sleeper("late", 300)], Arc::new(()))
        .join();
    assert!(report.is_timed_out());

    // Give the worker time to finish and find its token expired.
    thread::sleep(Duration::from_millis(400));
    assert_eq!(*completes.borrow(), 0);
    assert_eq!(report.completion_order().len(), 0);
}

#[test]
fn test_failures_do_not_stop_siblings() {
    let tasks: Vec<Task<(), &'static str>> = vec![
        Task::new("fails", |_| Err(TaskError::Failed("no route to controller".to_string()))),
        Task::new("panics", |_| panic!("index out of bounds")),
        Task::new("works", |_| {
            thread::sleep(Duration::from_millis(50));
            Ok("fine")
        }),
    ];
    let report = TaskRunner::new(Duration::from_secs(5)).start(tasks, Arc::new(())).join();

    assert!(!report.is_timed_out());
    assert_eq!(report.get("works"), Some(&TaskOutcome::Completed("fine")));
    assert!(matches!(report.get("fails"), Some(TaskOutcome::Failed(TaskError::Failed(_)))));
    assert!(matches!(report.get("panics"), Some(TaskOutcome::Failed(TaskError::Panicked(msg))) if msg.contains("index")));
}

#[test]
fn test_tasks_run_concurrently() {
    let counter = Arc::new(AtomicUsize::new(0));
    let tasks: Vec<Task<AtomicUsize, ()>> = (0..8)
        .map(|i| {
            Task::new(format!("t{}", i), |input: TaskInput<AtomicUsize>| {
                thread::sleep(Duration::from_millis(200));
                input.shared.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
        .collect();

    let started = Instant::now();
    let report = TaskRunner::new(Duration::from_secs(5))
        .start(tasks, Arc::clone(&counter))
        .join();

    assert!(!report.is_timed_out());
    assert_eq!(counter.load(Ordering::SeqCst), 8);
    // Eight 200 ms tasks in sequence would take 1.6 s.
    assert!(started.elapsed() < Duration::from_millis(1200));
}
