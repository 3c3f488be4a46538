//! Cleanup behavior over a real directory.

mod common;

use common::{outputs, write_template};
use proposal_docs::{CleanupGuard, Janitor, JanitorConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"PK").unwrap();
    path
}

fn quick_config(dir: &Path, interval: Duration) -> JanitorConfig {
    JanitorConfig {
        dir: dir.to_path_buf(),
        sweep_interval: interval,
        retry_delay: Duration::from_millis(10),
    }
}

#[test]
fn test_clean_all_spares_template_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_template(dir.path());
    let reference = touch(dir.path(), "reference.docx");
    let notes = touch(dir.path(), "notes.txt");
    touch(dir.path(), "output_Barn_1700000000.docx");

    let janitor = Janitor::new(JanitorConfig::new(dir.path()));
    assert_eq!(janitor.clean_all(), 1);
    assert_eq!(janitor.clean_all(), 0);

    assert!(template.exists());
    assert!(reference.exists());
    assert!(notes.exists());
    assert!(outputs(dir.path()).is_empty());
}

#[test]
fn test_clean_all_on_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    let janitor = Janitor::new(JanitorConfig::new(dir.path()));
    assert_eq!(janitor.clean_all(), 0);
    assert_eq!(janitor.clean_all(), 0);
}

#[test]
fn test_sweep_keeps_fresh_outputs() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "output_Barn_1.docx");
    touch(dir.path(), "output_Shed_2.docx");

    let janitor = Janitor::new(JanitorConfig::new(dir.path()));
    assert_eq!(janitor.sweep_stale(), 0);
    assert_eq!(outputs(dir.path()).len(), 2);
}

#[test]
fn test_sweep_removes_stale_outputs_only() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_template(dir.path());
    touch(dir.path(), "output_Old_1.docx");
    std::thread::sleep(Duration::from_millis(300));
    let fresh = touch(dir.path(), "output_New_2.docx");

    let janitor = Janitor::new(quick_config(dir.path(), Duration::from_millis(150)));
    assert_eq!(janitor.sweep_stale(), 1);
    assert!(fresh.exists());
    assert!(template.exists());
    assert_eq!(outputs(dir.path()), vec!["output_New_2.docx".to_string()]);
}

#[test]
fn test_sweeper_thread_runs_and_stops() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_template(dir.path());
    touch(dir.path(), "output_Old_1.docx");

    let janitor = Arc::new(Janitor::new(quick_config(
        dir.path(),
        Duration::from_millis(50),
    )));
    let sweeper = janitor.spawn_sweeper();
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !outputs(dir.path()).is_empty() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    sweeper.shutdown();

    assert!(outputs(dir.path()).is_empty());
    assert!(template.exists());
}

#[test]
fn test_dropped_guard_deletes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = touch(dir.path(), "output_Barn_1700000000.docx");
    let janitor = Arc::new(Janitor::new(quick_config(dir.path(), Duration::from_secs(60))));

    let guard = CleanupGuard::new(Arc::clone(&janitor), path.clone());
    assert_eq!(guard.path(), Some(path.as_path()));
    drop(guard);

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while path.exists() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(!path.exists());
}

#[test]
fn test_scheduled_removal_reports_success() {
    let dir = tempfile::tempdir().unwrap();
    let path = touch(dir.path(), "output_Barn_1.docx");
    let janitor = Arc::new(Janitor::new(JanitorConfig::new(dir.path())));

    assert!(janitor.schedule_removal(path.clone()).join().unwrap());
    assert!(!path.exists());
    // Already gone: still a success.
    assert!(janitor.schedule_removal(path).join().unwrap());
}

#[test]
fn test_concurrent_cleanups_count_each_file_once() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..20 {
        touch(dir.path(), &format!("output_P{}_{}.docx", i, i));
    }
    let janitor = Arc::new(Janitor::new(JanitorConfig::new(dir.path())));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let janitor = Arc::clone(&janitor);
            std::thread::spawn(move || janitor.clean_all())
        })
        .collect();
    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(total, 20);
    assert!(outputs(dir.path()).is_empty());
}
