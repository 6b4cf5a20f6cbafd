//! Tests for init_session command

use telegram_video_archiver::SessionLock;

#[test]
fn test_init_session_lock_is_exclusive() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("session.lock");

    let lock = SessionLock::acquire(&path).unwrap();
    assert!(SessionLock::acquire(&path).is_err());
    drop(lock);
    assert!(SessionLock::acquire(&path).is_ok());
}

#[tokio::test]
#[ignore] // Requires user interaction
async fn test_init_session_run() {
    use telegram_video_archiver::commands::init_session;
    use telegram_video_archiver::Config;

    // This test requires manual interaction
    let _ = init_session::run(&Config::new()).await;
}
