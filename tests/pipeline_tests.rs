use chrono::NaiveDate;
use crossbeam_channel::Sender;
use elcollect::engine::codec::{Clock, FixedClock};
use elcollect::engine::ledger::ProcessedLedger;
use elcollect::error::WatchError;
use elcollect::pipeline::archive::{ArchiveLayout, ArchiveTree, Archiver};
use elcollect::pipeline::context::IngestContext;
use elcollect::pipeline::scan::scan_backlog;
use elcollect::pipeline::watch::{
    FileEventHandler, LineWatcher, NotifyWatchService, Subscription, WatchBackend, WatchService,
    translate_event,
};
use elcollect::{FsEvent, IngestOutcome, SourceLine};
use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

fn fixed_clock() -> Arc<dyn Clock> {
    let at = NaiveDate::from_ymd_opt(2025, 3, 7)
        .and_then(|d| d.and_hms_opt(14, 5, 9))
        .unwrap();
    Arc::new(FixedClock(at))
}

fn jigani() -> SourceLine {
    SourceLine::new("127.0.0.1", "SDC3", "Jigani", "JIG")
}

fn context(source_root: &Path, dest_root: &Path, archive: Option<ArchiveTree>) -> IngestContext {
    IngestContext {
        line: jigani(),
        source_root: source_root.to_path_buf(),
        dest_root: dest_root.to_path_buf(),
        archive,
        ledger: Arc::new(ProcessedLedger::new()),
        clock: fixed_clock(),
    }
}

fn touch(path: &Path, contents: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Files under `dir`, relative and sorted, with `/` separators.
fn files_under(dir: &Path) -> Vec<String> {
    let mut out: Vec<String> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(dir)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    out.sort();
    out
}

fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    cond()
}

/// Hands out channel-backed subscriptions; tests push events through the kept senders.
#[derive(Default)]
struct ChannelWatchService {
    senders: Mutex<Vec<Sender<FsEvent>>>,
}

impl ChannelWatchService {
    fn send(&self, event: FsEvent) {
        for tx in self.senders.lock().unwrap().iter() {
            tx.send(event.clone()).unwrap();
        }
    }

    fn close_all(&self) {
        self.senders.lock().unwrap().clear();
    }
}

impl WatchService for ChannelWatchService {
    fn subscribe(&self, root: &Path, _recursive: bool) -> Result<Subscription, WatchError> {
        if !root.exists() {
            return Err(WatchError::RootMissing {
                root: root.to_path_buf(),
            });
        }
        let (tx, rx) = crossbeam_channel::unbounded();
        self.senders.lock().unwrap().push(tx);
        Ok(Subscription::new(rx))
    }
}

// --- backlog scan ---

#[test]
fn test_scan_copies_with_canonical_names_and_mirrored_dirs() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("share");
    let dest = tmp.path().join("dest");
    touch(&src.join("2025/NG/part1.jpg"), b"one");
    touch(&src.join("2025/Normal/part2.jpg"), b"two");
    touch(&src.join("2025/notes.txt"), b"skip");
    let ctx = context(&src, &dest, None);

    let report = scan_backlog(&ctx);
    assert!(report.root_found);
    assert_eq!(report.seen, 2);
    assert_eq!(report.copied, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(
        files_under(&dest),
        vec![
            "Jigani/2025/NG/part1_JIG_Z_250307_140509.jpg".to_string(),
            "Jigani/2025/Normal/part2_JIG_A_250307_140509.jpg".to_string(),
        ]
    );
    assert!(ctx.ledger.contains(&src.join("2025/NG/part1.jpg")));
    assert!(ctx.ledger.contains(&src.join("2025/Normal/part2.jpg")));
    assert_eq!(ctx.ledger.len(), 2);
    // source untouched
    assert_eq!(std::fs::read(src.join("2025/NG/part1.jpg")).unwrap(), b"one");
}

#[test]
fn test_scan_twice_skips_already_processed() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("share");
    let dest = tmp.path().join("dest");
    touch(&src.join("a.jpg"), b"a");
    touch(&src.join("sub/b.JPEG"), b"b");
    let ctx = context(&src, &dest, None);

    assert_eq!(scan_backlog(&ctx).copied, 2);
    let second = scan_backlog(&ctx);
    assert_eq!(second.copied, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(files_under(&dest).len(), 2);
}

#[test]
fn test_scan_missing_root_is_soft() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(&tmp.path().join("nope"), &tmp.path().join("dest"), None);
    let report = scan_backlog(&ctx);
    assert!(!report.root_found);
    assert_eq!(report.seen, 0);
    assert!(ctx.ledger.is_empty());
}

#[test]
fn test_scan_replicates_empty_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("share");
    let dest = tmp.path().join("dest");
    std::fs::create_dir_all(src.join("2025/empty")).unwrap();
    let ctx = context(&src, &dest, None);

    scan_backlog(&ctx);
    assert!(dest.join("Jigani/2025/empty").is_dir());
}

#[test]
fn test_scan_isolates_single_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("share");
    let dest = tmp.path().join("dest");
    for i in 0..3 {
        touch(&src.join(format!("ok/good{i}.jpg")), b"g");
    }
    touch(&src.join("bad/broken.jpg"), b"b");
    // A regular file where the mirrored directory must go makes that one copy fail.
    touch(&dest.join("Jigani/bad"), b"in the way");
    let ctx = context(&src, &dest, None);

    let report = scan_backlog(&ctx);
    assert_eq!(report.seen, 4);
    assert_eq!(report.copied, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(files_under(&dest.join("Jigani/ok")).len(), 3);
    assert!(!ctx.ledger.contains(&src.join("bad/broken.jpg")));
}

#[test]
fn test_scan_skips_files_already_archived() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("share");
    let dest = tmp.path().join("dest");
    let archive = tmp.path().join("archive");
    touch(&src.join("NG/part1.jpg"), b"1");
    touch(&src.join("NG/part2.jpg"), b"2");
    touch(
        &archive.join("Jigani/NG/part1_JIG_Z_240101_083000.jpg"),
        b"1",
    );
    let tree = ArchiveTree::new(&archive, ArchiveLayout::Mirror);
    let ctx = context(&src, &dest, Some(tree));

    let report = scan_backlog(&ctx);
    assert_eq!(report.archived, 1);
    assert_eq!(report.copied, 1);
    assert_eq!(
        files_under(&dest),
        vec!["Jigani/NG/part2_JIG_Z_250307_140509.jpg".to_string()]
    );
    assert!(ctx.ledger.contains(&src.join("NG/part1.jpg")));
}

#[test]
fn test_scan_grades_by_filename_segment() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("share");
    let dest = tmp.path().join("dest");
    touch(&src.join("lineA/PANEL_NG_01.jpg"), b"p");
    touch(&src.join("lineA/panel_ok.jpg"), b"q");
    let ctx = context(&src, &dest, None);

    assert_eq!(scan_backlog(&ctx).copied, 2);
    assert_eq!(
        files_under(&dest),
        vec![
            "Jigani/lineA/PANEL_NG_01_JIG_Z_250307_140509.jpg".to_string(),
            "Jigani/lineA/panel_ok_JIG_A_250307_140509.jpg".to_string(),
        ]
    );
}

// --- live events ---

#[test]
fn test_concurrent_events_produce_one_copy() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("share");
    let dest = tmp.path().join("dest");
    let file = src.join("NG/hot.jpg");
    touch(&file, b"hot");
    let ctx = Arc::new(context(&src, &dest, None));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let ctx = Arc::clone(&ctx);
            let file = file.clone();
            thread::spawn(move || {
                if i % 2 == 0 {
                    ctx.on_created(&file)
                } else {
                    ctx.on_modified(&file)
                }
            })
        })
        .collect();
    let outcomes: Vec<Option<IngestOutcome>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    let copied = outcomes
        .iter()
        .filter(|o| matches!(o, Some(IngestOutcome::Copied(_))))
        .count();
    assert_eq!(copied, 1);
    assert!(
        outcomes
            .iter()
            .all(|o| matches!(o, Some(IngestOutcome::Copied(_) | IngestOutcome::AlreadyProcessed)))
    );
    assert_eq!(files_under(&dest).len(), 1);
    assert_eq!(ctx.ledger.len(), 1);
}

#[test]
fn test_modify_after_backfill_does_not_recopy() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("share");
    let dest = tmp.path().join("dest");
    let file = src.join("Normal/early.jpg");
    touch(&file, b"v1");
    let ctx = context(&src, &dest, None);

    assert_eq!(scan_backlog(&ctx).copied, 1);
    std::fs::write(&file, b"v2").unwrap();
    assert_eq!(ctx.on_modified(&file), Some(IngestOutcome::AlreadyProcessed));
    assert_eq!(files_under(&dest).len(), 1);
}

#[test]
fn test_events_ignore_directories_and_other_files() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("share");
    let dest = tmp.path().join("dest");
    std::fs::create_dir_all(src.join("folder.jpg")).unwrap();
    touch(&src.join("log.txt"), b"x");
    let ctx = context(&src, &dest, None);

    assert_eq!(ctx.on_created(&src.join("folder.jpg")), None);
    assert_eq!(ctx.on_created(&src.join("log.txt")), None);
    assert!(ctx.ledger.is_empty());
}

#[test]
fn test_event_for_vanished_file_is_logged_not_recorded() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("share");
    let dest = tmp.path().join("dest");
    std::fs::create_dir_all(&src).unwrap();
    let ctx = context(&src, &dest, None);

    assert_eq!(ctx.on_created(&src.join("gone.jpg")), None);
    assert!(ctx.ledger.is_empty());
}

#[test]
fn test_event_for_archived_file_is_recorded_without_copy() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("share");
    let dest = tmp.path().join("dest");
    let archive = tmp.path().join("archive");
    let file = src.join("old.jpg");
    touch(&file, b"o");
    touch(&archive.join("Jigani/old.jpg"), b"o");
    let ctx = context(
        &src,
        &dest,
        Some(ArchiveTree::new(&archive, ArchiveLayout::Mirror)),
    );

    assert_eq!(ctx.on_created(&file), Some(IngestOutcome::AlreadyArchived));
    assert!(ctx.ledger.contains(&file));
    assert!(files_under(&dest).is_empty());
}

#[test]
fn test_same_name_archived_in_other_folder_is_still_copied() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("share");
    let dest = tmp.path().join("dest");
    let archive = tmp.path().join("archive");
    touch(
        &archive.join("Jigani/2025-01/NG/cell1_JIG_Z_250101_080000.jpg"),
        b"old",
    );
    let file = src.join("2025-02/Normal/cell1.jpg");
    touch(&file, b"new");
    let ctx = context(
        &src,
        &dest,
        Some(ArchiveTree::new(&archive, ArchiveLayout::Mirror)),
    );

    assert!(matches!(ctx.on_created(&file), Some(IngestOutcome::Copied(_))));
    assert_eq!(
        files_under(&dest),
        vec!["Jigani/2025-02/Normal/cell1_JIG_A_250307_140509.jpg".to_string()]
    );
}

// --- notify translation ---

#[test]
fn test_translate_event_kinds() {
    let p = PathBuf::from("/nonexistent/share/a.jpg");
    let create = Event::new(EventKind::Create(CreateKind::File)).add_path(p.clone());
    assert_eq!(translate_event(&create), vec![FsEvent::Created(p.clone())]);

    let modify =
        Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content))).add_path(p.clone());
    assert_eq!(translate_event(&modify), vec![FsEvent::Modified(p.clone())]);

    let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path(p.clone());
    assert!(translate_event(&removed).is_empty());

    let rename_from =
        Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From))).add_path(p.clone());
    assert!(translate_event(&rename_from).is_empty());
}

#[test]
fn test_translate_rename_into_place_is_a_create() {
    let from = PathBuf::from("/nonexistent/share/a.tmp");
    let to = PathBuf::from("/nonexistent/share/a.jpg");
    let both = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
        .add_path(from)
        .add_path(to.clone());
    assert_eq!(translate_event(&both), vec![FsEvent::Created(to)]);
}

#[test]
fn test_translate_skips_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let create = Event::new(EventKind::Create(CreateKind::Folder)).add_path(tmp.path().to_path_buf());
    assert!(translate_event(&create).is_empty());
}

// --- line watcher ---

#[test]
fn test_line_watcher_copies_on_event_and_stops() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("share");
    let dest = tmp.path().join("dest");
    std::fs::create_dir_all(&src).unwrap();
    let ctx = Arc::new(context(&src, &dest, None));
    let service = ChannelWatchService::default();

    let watcher = LineWatcher::start(Arc::clone(&ctx), &service, Duration::from_millis(20)).unwrap();
    assert_eq!(watcher.alias(), "Jigani");
    assert!(watcher.is_alive());

    let file = src.join("NG/live.jpg");
    touch(&file, b"live");
    service.send(FsEvent::Created(file.clone()));
    service.send(FsEvent::Modified(file.clone()));

    assert!(wait_until(Duration::from_secs(5), || ctx.ledger.contains(&file)));
    assert!(watcher.stop(Duration::from_secs(5)));
    assert_eq!(
        files_under(&dest),
        vec!["Jigani/NG/live_JIG_Z_250307_140509.jpg".to_string()]
    );
}

#[test]
fn test_line_watcher_dies_when_subscription_ends() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("share");
    std::fs::create_dir_all(&src).unwrap();
    let ctx = Arc::new(context(&src, &tmp.path().join("dest"), None));
    let service = ChannelWatchService::default();

    let watcher = LineWatcher::start(ctx, &service, Duration::from_millis(20)).unwrap();
    service.close_all();
    assert!(wait_until(Duration::from_secs(5), || !watcher.is_alive()));
    assert!(watcher.stop(Duration::from_secs(1)));
}

#[test]
fn test_line_watcher_reports_subscription_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = Arc::new(context(
        &tmp.path().join("missing"),
        &tmp.path().join("dest"),
        None,
    ));
    let service = ChannelWatchService::default();
    let err = LineWatcher::start(ctx, &service, Duration::from_millis(20)).err();
    assert!(matches!(err, Some(WatchError::RootMissing { .. })));
}

#[test]
fn test_notify_service_missing_root() {
    let tmp = tempfile::tempdir().unwrap();
    let service = NotifyWatchService::new(WatchBackend::Native, Duration::from_millis(100));
    let err = service.subscribe(&tmp.path().join("missing"), true).err();
    assert!(matches!(err, Some(WatchError::RootMissing { .. })));
}

#[test]
fn test_notify_service_explicit_backends() {
    let tmp = tempfile::tempdir().unwrap();
    let native = NotifyWatchService::new(WatchBackend::Native, Duration::from_millis(100));
    let poll = NotifyWatchService::new(WatchBackend::Poll, Duration::from_millis(100));
    assert_eq!(native.backend_for(tmp.path()), WatchBackend::Native);
    assert_eq!(poll.backend_for(tmp.path()), WatchBackend::Poll);
}

#[test]
fn test_poll_backend_reports_new_file() {
    let tmp = tempfile::tempdir().unwrap();
    let service = NotifyWatchService::new(WatchBackend::Poll, Duration::from_millis(50));
    let sub = service.subscribe(tmp.path(), true).unwrap();

    let file = tmp.path().join("fresh.jpg");
    std::fs::write(&file, b"x").unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut seen = false;
    while Instant::now() < deadline && !seen {
        if let Ok(event) = sub.events().recv_timeout(Duration::from_millis(100)) {
            seen = event.path().file_name() == file.file_name();
        }
    }
    assert!(seen);
}

#[test]
fn test_native_watcher_dies_when_root_is_removed() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("share");
    touch(&src.join("NG/a.jpg"), b"a");
    let ctx = Arc::new(context(&src, &tmp.path().join("dest"), None));
    let service = NotifyWatchService::new(WatchBackend::Native, Duration::from_millis(100));

    let watcher = LineWatcher::start(ctx, &service, Duration::from_millis(20)).unwrap();
    assert!(watcher.is_alive());
    std::fs::remove_dir_all(&src).unwrap();

    assert!(wait_until(Duration::from_secs(5), || !watcher.is_alive()));
    assert!(watcher.stop(Duration::from_secs(1)));
}

#[test]
fn test_poll_watcher_dies_when_root_is_removed() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("share");
    touch(&src.join("a.jpg"), b"a");
    let ctx = Arc::new(context(&src, &tmp.path().join("dest"), None));
    let service = NotifyWatchService::new(WatchBackend::Poll, Duration::from_millis(50));

    let watcher = LineWatcher::start(ctx, &service, Duration::from_millis(20)).unwrap();
    std::fs::remove_dir_all(&src).unwrap();

    assert!(wait_until(Duration::from_secs(10), || !watcher.is_alive()));
}

// --- archiver ---

#[test]
fn test_archiver_moves_images_and_leaves_other_files() {
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("dest");
    let archive = tmp.path().join("archive");
    touch(&dest.join("Jigani/2025/NG/a_JIG_Z_250307_140509.jpg"), b"a");
    touch(&dest.join("Jigani/b_JIG_A_250307_140509.JPEG"), b"b");
    touch(&dest.join("Jigani/readme.txt"), b"keep me");
    let archiver = Archiver::new(
        &dest,
        ArchiveTree::new(&archive, ArchiveLayout::Mirror),
        vec![jigani()],
        fixed_clock(),
    );

    let report = archiver.run_once();
    assert_eq!(report.total_found(), 2);
    assert_eq!(report.total_moved(), 2);
    assert_eq!(report.total_failed(), 0);
    assert_eq!(
        files_under(&archive),
        vec![
            "Jigani/2025/NG/a_JIG_Z_250307_140509.jpg".to_string(),
            "Jigani/b_JIG_A_250307_140509.JPEG".to_string(),
        ]
    );
    assert_eq!(files_under(&dest), vec!["Jigani/readme.txt".to_string()]);
    assert_eq!(
        std::fs::read(dest.join("Jigani/readme.txt")).unwrap(),
        b"keep me"
    );
}

#[test]
fn test_archiver_tolerates_missing_line_folder() {
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("dest");
    let archive = tmp.path().join("archive");
    touch(&dest.join("Galaxy/x.jpg"), b"x");
    let lines = vec![jigani(), SourceLine::new("127.0.0.2", "SDC5", "Galaxy", "GAL")];
    let archiver = Archiver::new(
        &dest,
        ArchiveTree::new(&archive, ArchiveLayout::Mirror),
        lines,
        fixed_clock(),
    );

    let report = archiver.run_once();
    assert!(!report.lines[0].folder_found);
    assert!(report.lines[1].folder_found);
    assert_eq!(report.lines[1].moved, 1);
    assert!(archive.join("Galaxy/x.jpg").is_file());
}

#[test]
fn test_archiver_dated_layout_and_presence_check() {
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("dest");
    let archive = tmp.path().join("archive");
    touch(&dest.join("Jigani/NG/part1_JIG_Z_250307_140509.jpg"), b"1");
    let tree = ArchiveTree::new(&archive, ArchiveLayout::Dated);
    let archiver = Archiver::new(&dest, tree.clone(), vec![jigani()], fixed_clock());

    assert_eq!(archiver.run_once().total_moved(), 1);
    assert!(
        archive
            .join("2025/03/07/Jigani/NG/part1_JIG_Z_250307_140509.jpg")
            .is_file()
    );
    let ng = Path::new("NG");
    assert!(tree.contains_original("Jigani", ng, "part1.jpg", "JIG"));
    assert!(!tree.contains_original("Jigani", ng, "part2.jpg", "JIG"));
    assert!(!tree.contains_original("Galaxy", ng, "part1.jpg", "JIG"));
    assert!(!tree.contains_original("Jigani", Path::new("Normal"), "part1.jpg", "JIG"));
}
