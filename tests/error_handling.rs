mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::{drop_and_done, TestResult};
use dirpub::errors::DirpubError;
use dirpub::fs::FileSystem;
use dirpub::processor::FileProcessor;
use dirpub::watch::{DirectoryWatcher, FileEvent, ListenerSet};
use dirpub_test_utils::{
    init_tracing, FailingListener, FakeSink, PanickingListener, RecordingListener,
};

#[test]
fn error_messages_carry_context() {
    let err = DirpubError::MoveFailed {
        from: PathBuf::from("/drop/a.xml"),
        to: PathBuf::from("/done/a.xml"),
        reason: "unable to delete existing file".into(),
    };
    let msg = err.to_string();
    assert!(msg.contains("/drop/a.xml") && msg.contains("/done/a.xml"), "{msg}");
    assert!(msg.contains("unable to delete existing file"), "{msg}");

    let io: DirpubError = std::io::Error::other("disk on fire").into();
    assert!(matches!(io, DirpubError::IoError(_)));

    let other: DirpubError = anyhow::anyhow!("plain failure").into();
    assert_eq!(other.to_string(), "plain failure");
}

#[test]
fn missing_source_directory_is_fatal_for_the_watcher() {
    init_tracing();
    let fs = drop_and_done();
    let err = DirectoryWatcher::new(Arc::new(fs), "/missing", ".xml").unwrap_err();
    assert!(matches!(err, DirpubError::NotADirectory(p) if p == Path::new("/missing")));
}

#[test]
fn listener_set_isolates_failures() {
    init_tracing();
    let failing = FailingListener::new();
    let panicking = PanickingListener::new();
    let recorder = RecordingListener::new();

    let mut set = ListenerSet::new();
    set.push(Box::new(panicking.clone()));
    set.push(Box::new(failing.clone()));
    set.push(Box::new(recorder.clone()));

    let event = FileEvent::Added(PathBuf::from("/drop/a.xml"));
    set.dispatch(&event);
    set.dispatch(&event);

    assert_eq!(panicking.calls(), 2);
    assert_eq!(failing.calls(), 2);
    assert_eq!(recorder.events(), vec![event.clone(), event]);
}

#[test]
fn unreadable_file_is_left_in_place() -> TestResult {
    init_tracing();
    let fs = drop_and_done();
    fs.add_file("/drop/a.xml", "x");
    fs.fail_reads_of("/drop/a.xml");

    let sink = FakeSink::new();
    let proc = FileProcessor::new(Arc::new(fs.clone()), sink.clone(), "/drop", "/done", false)?;
    let err = proc.process_file(Path::new("/drop/a.xml")).unwrap_err();

    assert!(matches!(err, DirpubError::ReadFailed { .. }));
    assert!(fs.exists(Path::new("/drop/a.xml")));
    assert_eq!(sink.send_attempts(), 0);
    Ok(())
}

#[test]
fn rename_failure_after_send_keeps_the_source() -> TestResult {
    init_tracing();
    let fs = drop_and_done();
    fs.add_file("/drop/sub/a.xml", "x");
    fs.fail_renames(true);

    let sink = FakeSink::new();
    let proc = FileProcessor::new(Arc::new(fs.clone()), sink.clone(), "/drop", "/done", false)?;
    let err = proc.process_file(Path::new("/drop/sub/a.xml")).unwrap_err();

    // Already published; delivery is at-least-once.
    assert!(matches!(err, DirpubError::MoveFailed { .. }));
    assert_eq!(sink.messages().len(), 1);
    assert!(fs.exists(Path::new("/drop/sub/a.xml")));
    // The mirrored parent was created before the rename was attempted.
    assert!(fs.is_dir(Path::new("/done/sub")));
    Ok(())
}

#[test]
fn undeletable_existing_target_aborts_the_move() -> TestResult {
    init_tracing();
    let fs = drop_and_done();
    fs.add_file("/drop/a.xml", "new");
    fs.add_file("/done/a.xml", "old");
    fs.fail_removes(true);

    let sink = FakeSink::new();
    let proc = FileProcessor::new(Arc::new(fs.clone()), sink.clone(), "/drop", "/done", false)?;
    let err = proc.process_file(Path::new("/drop/a.xml")).unwrap_err();

    assert!(err.to_string().contains("unable to delete existing file"), "{err}");
    assert_eq!(fs.contents("/drop/a.xml").as_deref(), Some(&b"new"[..]));
    assert_eq!(fs.contents("/done/a.xml").as_deref(), Some(&b"old"[..]));
    Ok(())
}

#[test]
fn processor_errors_never_stop_the_watch_loop() -> TestResult {
    init_tracing();
    let fs = drop_and_done();
    fs.add_file("/drop/bad.xml", "x");
    fs.add_file("/drop/good.xml", "y");
    fs.fail_reads_of("/drop/bad.xml");

    let sink = FakeSink::new();
    let mut watcher = DirectoryWatcher::new(Arc::new(fs.clone()), "/drop", ".xml")?;
    watcher.add_listener(FileProcessor::new(
        Arc::new(fs.clone()),
        sink.clone(),
        "/drop",
        "/done",
        false,
    )?);

    assert_eq!(watcher.poll_once(), 2);
    let bodies: Vec<String> = sink.messages().into_iter().map(|m| m.body).collect();
    assert_eq!(bodies, vec!["y".to_string()]);
    assert!(fs.exists(Path::new("/drop/bad.xml")));
    assert!(fs.exists(Path::new("/done/good.xml")));
    Ok(())
}
