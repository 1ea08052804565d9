#![cfg(feature = "cli")]

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use piece_match::core::testing::{regular_polygon, render_shapes};
use piece_match::io::{ExtractReport, MatchReport, ReferenceLibrary};
use piece_match::reference::SegmentationStrategy;
use predicates::prelude::*;

fn write_page(path: &Path) {
    let page = render_shapes(
        300,
        300,
        [255, 255, 255],
        &[
            (regular_polygon((0.25, 0.3), 0.12, 6, 0.0), [200, 30, 30]),
            (regular_polygon((0.75, 0.3), 0.12, 3, 0.0), [30, 160, 30]),
        ],
    );
    image::RgbaImage::from_raw(300, 300, page.data)
        .expect("page buffer")
        .save(path)
        .expect("write png");
}

fn write_labels(path: &Path) {
    fs::write(
        path,
        r#"[
            { "text": "2x", "bbox": { "x": 0.2, "y": 0.6, "width": 0.1, "height": 0.05 } },
            { "text": "1x", "bbox": { "x": 0.7, "y": 0.6, "width": 0.1, "height": 0.05 } },
            { "text": "Step 4", "bbox": { "x": 0.05, "y": 0.9, "width": 0.2, "height": 0.05 } }
        ]"#,
    )
    .expect("write labels");
}

fn cli() -> Command {
    Command::cargo_bin("piece-match").expect("binary")
}

#[test]
fn extract_then_match_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let page = dir.path().join("page.png");
    let labels = dir.path().join("labels.json");
    let library = dir.path().join("library.json");
    let report = dir.path().join("report.json");
    let summary = dir.path().join("summary.json");
    write_page(&page);
    write_labels(&labels);

    cli()
        .args(["extract", "--photo"])
        .arg(&page)
        .arg("--labels")
        .arg(&labels)
        .arg("--out")
        .arg(&library)
        .arg("--report")
        .arg(&summary)
        .assert()
        .success();
    let lib = ReferenceLibrary::load_json(&library).expect("library");
    assert_eq!(lib.strategy, SegmentationStrategy::LabelGrid);
    assert_eq!(lib.references.len(), 2);
    let summary = ExtractReport::load_json(&summary).expect("summary");
    assert_eq!(summary.cells.len(), 2);
    assert_eq!(summary.references.len(), 2);
    assert_eq!(summary.references[0].embeddings, 4);

    cli()
        .args(["match", "--frame"])
        .arg(&page)
        .arg("--library")
        .arg(&library)
        .arg("--out")
        .arg(&report)
        .assert()
        .success();
    let report = MatchReport::load_json(&report).expect("report");
    assert_eq!((report.width, report.height), (300, 300));
    assert!(!report.candidates.is_empty());
    let ids: Vec<_> = lib.references.iter().map(|r| r.id()).collect();
    for c in &report.candidates {
        assert!(ids.contains(&c.reference_id));
        assert!((0.0..=1.0).contains(&c.score));
    }
}

#[test]
fn default_config_prints_every_section() {
    cli()
        .arg("default-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"matching\""))
        .stdout(predicate::str::contains("\"extract\""))
        .stdout(predicate::str::contains("\"min_score\""));
}

#[test]
fn missing_photo_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    cli()
        .args(["extract", "--photo"])
        .arg(dir.path().join("nope.png"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open image"));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let page = dir.path().join("page.png");
    let config = dir.path().join("config.json");
    write_page(&page);
    fs::write(&config, r#"{ "extract": { "rotations": [] } }"#).expect("write config");

    cli()
        .args(["extract", "--photo"])
        .arg(&page)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("rotation"));
}
