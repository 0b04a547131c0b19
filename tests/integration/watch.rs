//! Poll cycles over a watched directory.

use std::time::Duration;
use tempfile::TempDir;

use returnscan::ReturnScanError;
use returnscan::config::DisposalMode;
use returnscan::merge::pages::PageRotation;
use returnscan::pairing::PairOutcome;
use returnscan::watch::CycleOutcome;

use crate::common::{
    StubOsd, merged_outputs, page_rotations, page_widths, set_age, stub_watcher, test_config,
    write_pdf,
};

#[tokio::test]
async fn test_cycle_merges_and_archives_pair() {
    let dir = TempDir::new().unwrap();
    let front = write_pdf(dir.path(), "scan_0001.pdf", &[100, 200, 300]);
    let back = write_pdf(dir.path(), "scan_0002.pdf", &[600, 500, 400]);
    set_age(&front, Duration::from_secs(100));
    set_age(&back, Duration::from_secs(10));

    let osd = StubOsd::default().with("back_0003", PageRotation::Rotate180);
    let mut watcher = stub_watcher(test_config(dir.path(), DisposalMode::Archive), osd);

    let summary = match watcher.poll_once().await.unwrap() {
        CycleOutcome::Merged(summary) => summary,
        other => panic!("expected a merge, got {other:?}"),
    };

    assert_eq!(summary.total_pages, 6);
    assert!(summary.inputs_disposed);
    assert_eq!(merged_outputs(dir.path()), vec![summary.output.clone()]);
    assert!(
        summary
            .output
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("_scan_0001_and_scan_0002.pdf")
    );

    assert_eq!(page_widths(&summary.output), vec![100, 400, 200, 500, 300, 600]);
    assert_eq!(page_rotations(&summary.output), vec![0, 180, 0, 0, 0, 0]);

    assert!(!front.exists());
    assert!(!back.exists());
    let archive = dir.path().join("processed");
    assert!(archive.join("scan_0001.pdf").exists());
    assert!(archive.join("scan_0002.pdf").exists());
}

#[tokio::test]
async fn test_mismatched_pair_is_left_alone() {
    let dir = TempDir::new().unwrap();
    let front = write_pdf(dir.path(), "front.pdf", &[100, 200, 300]);
    let back = write_pdf(dir.path(), "back.pdf", &[500, 400]);
    set_age(&front, Duration::from_secs(90));
    set_age(&back, Duration::from_secs(10));

    let mut watcher = stub_watcher(
        test_config(dir.path(), DisposalMode::Archive),
        StubOsd::default(),
    );

    let outcome = watcher.poll_once().await.unwrap();

    assert!(matches!(
        outcome,
        CycleOutcome::Idle(PairOutcome::PageCountMismatch { .. })
    ));
    assert!(merged_outputs(dir.path()).is_empty());
    assert!(front.exists());
    assert!(back.exists());
    assert!(!dir.path().join("processed").exists());

    // Page counts read during the cycle stay cached for the next one.
    assert_eq!(watcher.page_counts().len(), 2);
    watcher.poll_once().await.unwrap();
    assert_eq!(watcher.page_counts().len(), 2);
}

#[tokio::test]
async fn test_distant_scans_are_not_merged() {
    let dir = TempDir::new().unwrap();
    let front = write_pdf(dir.path(), "front.pdf", &[100]);
    let back = write_pdf(dir.path(), "back.pdf", &[200]);
    set_age(&front, Duration::from_secs(610));
    set_age(&back, Duration::from_secs(10));

    let mut watcher = stub_watcher(
        test_config(dir.path(), DisposalMode::Delete),
        StubOsd::default(),
    );

    let outcome = watcher.poll_once().await.unwrap();

    assert!(matches!(
        outcome,
        CycleOutcome::Idle(PairOutcome::NoPartner { .. })
    ));
    assert!(front.exists());
    assert!(back.exists());
}

#[tokio::test]
async fn test_kept_pair_is_merged_only_once() {
    let dir = TempDir::new().unwrap();
    let front = write_pdf(dir.path(), "front.pdf", &[100, 200]);
    let back = write_pdf(dir.path(), "back.pdf", &[400, 300]);
    set_age(&front, Duration::from_secs(60));
    set_age(&back, Duration::from_secs(30));

    let mut watcher = stub_watcher(
        test_config(dir.path(), DisposalMode::Keep),
        StubOsd::default(),
    );

    let first = watcher.poll_once().await.unwrap();
    assert!(matches!(
        first,
        CycleOutcome::Merged(ref summary) if !summary.inputs_disposed
    ));
    assert_eq!(watcher.ledger().len(), 2);

    let second = watcher.poll_once().await.unwrap();
    assert!(matches!(
        second,
        CycleOutcome::Idle(PairOutcome::NoCandidates)
    ));
    assert_eq!(merged_outputs(dir.path()).len(), 1);
    assert!(front.exists());
    assert!(back.exists());
}

#[tokio::test]
async fn test_deleted_pair_leaves_nothing_to_merge() {
    let dir = TempDir::new().unwrap();
    let front = write_pdf(dir.path(), "front.pdf", &[100]);
    let back = write_pdf(dir.path(), "back.pdf", &[200]);
    set_age(&front, Duration::from_secs(60));
    set_age(&back, Duration::from_secs(30));

    let mut watcher = stub_watcher(
        test_config(dir.path(), DisposalMode::Delete),
        StubOsd::default(),
    );

    assert!(matches!(
        watcher.poll_once().await.unwrap(),
        CycleOutcome::Merged(_)
    ));
    assert!(!front.exists());
    assert!(!back.exists());

    // Only the merged output remains, and it is never a candidate.
    assert!(matches!(
        watcher.poll_once().await.unwrap(),
        CycleOutcome::Idle(PairOutcome::NoCandidates)
    ));
}

#[tokio::test]
async fn test_failed_write_leaves_inputs_in_place() {
    let dir = TempDir::new().unwrap();
    let front = write_pdf(dir.path(), "front.pdf", &[100]);
    let back = write_pdf(dir.path(), "back.pdf", &[200]);
    set_age(&front, Duration::from_secs(60));
    set_age(&back, Duration::from_secs(30));

    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();
    let mut config = test_config(dir.path(), DisposalMode::Delete);
    config.output_dir = blocker.join("out");

    let mut watcher = stub_watcher(config, StubOsd::default());

    let result = watcher.poll_once().await;

    assert!(matches!(
        result,
        Err(ReturnScanError::FailedToCreateOutput { .. })
    ));
    assert!(front.exists());
    assert!(back.exists());
    assert!(watcher.ledger().is_empty());
}

#[tokio::test]
async fn test_report_written_next_to_output() {
    let dir = TempDir::new().unwrap();
    let front = write_pdf(dir.path(), "front.pdf", &[100]);
    let back = write_pdf(dir.path(), "back.pdf", &[200]);
    set_age(&front, Duration::from_secs(60));
    set_age(&back, Duration::from_secs(30));

    let mut config = test_config(dir.path(), DisposalMode::Archive);
    config.write_report = true;
    let osd = StubOsd::default().with("front_0001", PageRotation::Clockwise270);
    let mut watcher = stub_watcher(config, osd);

    let CycleOutcome::Merged(summary) = watcher.poll_once().await.unwrap() else {
        panic!("expected a merge");
    };

    let report_path = summary.output.with_extension("json");
    let report: serde_json::Value =
        serde_json::from_slice(&std::fs::read(report_path).unwrap()).unwrap();
    assert_eq!(report["pages_per_side"], 1);
    assert_eq!(report["rotated_pages"], 1);
    assert_eq!(report["pages"][0]["rotation"]["angle"], 270);
}

#[tokio::test]
async fn test_run_once_returns_after_one_cycle() {
    let dir = TempDir::new().unwrap();
    let front = write_pdf(dir.path(), "front.pdf", &[100]);
    let back = write_pdf(dir.path(), "back.pdf", &[200]);
    set_age(&front, Duration::from_secs(60));
    set_age(&back, Duration::from_secs(30));

    let mut watcher = stub_watcher(
        test_config(dir.path(), DisposalMode::Archive),
        StubOsd::default(),
    );

    watcher.run().await.unwrap();

    assert_eq!(merged_outputs(dir.path()).len(), 1);
    assert!(dir.path().join("processed").join("front.pdf").exists());
}
