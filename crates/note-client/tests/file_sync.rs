//! Tests for the local file side: the watcher and the file display surface.

use std::time::Duration;

use note_client::{FileEvent, FileSurface, FileWatcher};
use note_sync::DisplaySurface;
use tempfile::TempDir;
use tokio::time::timeout;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

async fn next_event(watcher: &mut FileWatcher) -> Option<FileEvent> {
    timeout(EVENT_TIMEOUT, watcher.event_rx().recv())
        .await
        .ok()
        .flatten()
}

#[tokio::test]
async fn test_watcher_reports_modification() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("note.txt");
    std::fs::write(&path, "before").unwrap();

    let mut watcher = FileWatcher::new(&path).unwrap();
    assert_eq!(
        watcher.file_path(),
        dir.path().canonicalize().unwrap().join("note.txt")
    );
    // Give the OS watcher time to register.
    tokio::time::sleep(Duration::from_millis(100)).await;

    std::fs::write(&path, "after").unwrap();

    assert_eq!(next_event(&mut watcher).await, Some(FileEvent::Modified));
}

#[tokio::test]
async fn test_relative_path_is_resolved_against_cwd() {
    let watcher = FileWatcher::new(std::path::Path::new("Cargo.toml")).unwrap();

    assert!(watcher.file_path().is_absolute());
    assert!(watcher.file_path().ends_with("Cargo.toml"));
}

#[tokio::test]
async fn test_watcher_ignores_other_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("note.txt");
    std::fs::write(&path, "").unwrap();

    let mut watcher = FileWatcher::new(&path).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    std::fs::write(dir.path().join("other.txt"), "noise").unwrap();

    let event = timeout(Duration::from_secs(1), watcher.event_rx().recv()).await;
    assert!(event.is_err(), "unexpected event: {:?}", event);
}

#[tokio::test]
async fn test_watcher_reports_removal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("note.txt");
    std::fs::write(&path, "doomed").unwrap();

    let mut watcher = FileWatcher::new(&path).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    std::fs::remove_file(&path).unwrap();

    assert_eq!(next_event(&mut watcher).await, Some(FileEvent::Removed));
}

#[tokio::test]
async fn test_surface_write_is_seen_by_watcher() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("note.txt");
    let surface = FileSurface::new(&path);
    surface.show_content("first").await;

    let mut watcher = FileWatcher::new(&path).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    surface.show_content("reloaded from remote").await;

    assert_eq!(next_event(&mut watcher).await, Some(FileEvent::Modified));
    assert_eq!(surface.read_content().await.unwrap(), "reloaded from remote");
}
