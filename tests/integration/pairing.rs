//! Pair discovery against real directories.

use std::time::Duration;
use tempfile::TempDir;

use returnscan::config::PairingRules;
use returnscan::io::PdfReader;
use returnscan::pairing::{PageCountCache, PairFinder, PairOutcome, list_directory};

use crate::common::{set_age, write_pdf};

fn evaluate(dir: &TempDir) -> PairOutcome {
    let rules = PairingRules::default();
    let listing = list_directory(dir.path(), &rules).unwrap();
    let mut counts = PageCountCache::new(PdfReader::new());
    PairFinder::new(rules).evaluate(&listing, &mut counts)
}

#[test]
fn test_pair_in_window_is_ready() {
    let dir = TempDir::new().unwrap();
    let front = write_pdf(dir.path(), "scan_0001.pdf", &[100, 200, 300]);
    let back = write_pdf(dir.path(), "scan_0002.pdf", &[600, 500, 400]);
    set_age(&front, Duration::from_secs(100));
    set_age(&back, Duration::from_secs(10));

    let pair = evaluate(&dir).into_pair().expect("pair should be ready");

    assert_eq!(pair.front().path(), front);
    assert_eq!(pair.back().path(), back);
    assert_eq!(pair.pages_per_side(), 3);
}

#[test]
fn test_front_is_older_regardless_of_name() {
    let dir = TempDir::new().unwrap();
    let older = write_pdf(dir.path(), "z_first.pdf", &[100, 200]);
    let newer = write_pdf(dir.path(), "a_second.pdf", &[400, 300]);
    set_age(&older, Duration::from_secs(60));
    set_age(&newer, Duration::from_secs(20));

    let pair = evaluate(&dir).into_pair().unwrap();

    assert_eq!(pair.front().path(), older);
    assert_eq!(pair.back().path(), newer);
}

#[test]
fn test_mismatched_page_counts_do_not_pair() {
    let dir = TempDir::new().unwrap();
    let front = write_pdf(dir.path(), "front.pdf", &[100, 200, 300]);
    let back = write_pdf(dir.path(), "back.pdf", &[500, 400]);
    set_age(&front, Duration::from_secs(90));
    set_age(&back, Duration::from_secs(10));

    assert!(matches!(
        evaluate(&dir),
        PairOutcome::PageCountMismatch {
            anchor_pages: 2,
            partner_pages: 3,
            ..
        }
    ));
}

#[test]
fn test_ten_minute_gap_does_not_pair() {
    let dir = TempDir::new().unwrap();
    let front = write_pdf(dir.path(), "front.pdf", &[100]);
    let back = write_pdf(dir.path(), "back.pdf", &[200]);
    set_age(&front, Duration::from_secs(610));
    set_age(&back, Duration::from_secs(10));

    assert!(matches!(evaluate(&dir), PairOutcome::NoPartner { .. }));
}

#[test]
fn test_fresh_file_is_not_settled() {
    let dir = TempDir::new().unwrap();
    let front = write_pdf(dir.path(), "front.pdf", &[100]);
    write_pdf(dir.path(), "back.pdf", &[200]);
    set_age(&front, Duration::from_secs(30));

    assert!(matches!(evaluate(&dir), PairOutcome::Unsettled { .. }));
}

#[test]
fn test_old_pair_is_stale() {
    let dir = TempDir::new().unwrap();
    let front = write_pdf(dir.path(), "front.pdf", &[100]);
    let back = write_pdf(dir.path(), "back.pdf", &[200]);
    set_age(&front, Duration::from_secs(3600));
    set_age(&back, Duration::from_secs(3500));

    assert!(matches!(evaluate(&dir), PairOutcome::Stale { .. }));
}

#[test]
fn test_partial_file_is_skipped() {
    let dir = TempDir::new().unwrap();
    let front = write_pdf(dir.path(), "front.pdf", &[100, 200]);
    let back = write_pdf(dir.path(), "back.pdf", &[400, 300]);
    let partial = dir.path().join("partial.pdf");
    std::fs::write(&partial, b"%PDF-1.5\n1 0 obj\n<< /Type").unwrap();
    set_age(&front, Duration::from_secs(80));
    set_age(&back, Duration::from_secs(40));
    set_age(&partial, Duration::from_secs(10));

    // The unreadable newest file drops out and the remaining two pair up.
    let pair = evaluate(&dir).into_pair().expect("pair should be ready");

    assert_eq!(pair.front().path(), front);
    assert_eq!(pair.back().path(), back);
}

#[test]
fn test_partial_file_between_front_and_back_is_skipped() {
    let dir = TempDir::new().unwrap();
    let front = write_pdf(dir.path(), "front.pdf", &[100, 200]);
    let partial = dir.path().join("partial.pdf");
    std::fs::write(&partial, b"%PDF-1.5\n1 0 obj\n<< /Type").unwrap();
    let back = write_pdf(dir.path(), "back.pdf", &[400, 300]);
    set_age(&front, Duration::from_secs(80));
    set_age(&partial, Duration::from_secs(50));
    set_age(&back, Duration::from_secs(20));

    let pair = evaluate(&dir).into_pair().expect("pair should be ready");

    assert_eq!(pair.front().path(), front);
    assert_eq!(pair.back().path(), back);
    assert_eq!(pair.pages_per_side(), 2);
}

#[test]
fn test_merged_outputs_are_ignored() {
    let dir = TempDir::new().unwrap();
    let front = write_pdf(dir.path(), "front.pdf", &[100]);
    let merged = write_pdf(dir.path(), "merged_20240101_120000_a_and_b.pdf", &[100]);
    set_age(&front, Duration::from_secs(40));
    set_age(&merged, Duration::from_secs(10));

    assert!(matches!(evaluate(&dir), PairOutcome::NoPartner { .. }));
}

#[test]
fn test_three_files_in_window_are_ambiguous() {
    let dir = TempDir::new().unwrap();
    for (name, age) in [("a.pdf", 90), ("b.pdf", 60), ("c.pdf", 30)] {
        let path = write_pdf(dir.path(), name, &[100]);
        set_age(&path, Duration::from_secs(age));
    }

    match evaluate(&dir) {
        PairOutcome::Ambiguous { candidates, .. } => assert_eq!(candidates.len(), 2),
        other => panic!("expected ambiguity, got {other:?}"),
    }
}
