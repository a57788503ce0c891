use sheetpipe::validator::{FileChecker, RuleSet};
use std::path::Path;

fn write_png(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::new(width, height);
    img.save(path).expect("write png");
}

#[test]
fn valid_png_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.png");
    write_png(&path, 500, 500);

    let checker = FileChecker::new();
    let report = checker.check(&path, "table_ocr");
    assert!(report.accepted);
    assert!(report.reasons.is_empty());
}

#[test]
fn oversized_pdf_reports_size_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.pdf");
    std::fs::write(&path, vec![0u8; 15 * 1024 * 1024]).unwrap();

    let checker = FileChecker::new();
    let report = checker.check(&path, "table_ocr");
    assert!(!report.accepted);
    assert_eq!(report.reasons.len(), 1);
    assert!(report.reasons[0].contains("15.00MB"));
    assert!(report.reasons[0].contains("10MB"));
}

#[test]
fn tiny_image_reports_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.png");
    write_png(&path, 10, 10);

    let checker = FileChecker::new();
    let report = checker.check(&path, "table_ocr");
    assert!(!report.accepted);
    assert_eq!(report.reasons.len(), 1);
    assert!(report.reasons[0].contains("10x10"));
    assert!(report.reasons[0].contains("20-10000"));
}

#[test]
fn violations_accumulate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.tiff");
    std::fs::write(&path, vec![0u8; 11 * 1024 * 1024]).unwrap();

    let checker = FileChecker::new();
    let report = checker.check(&path, "table_ocr");
    // Size and format both violated; .tiff gets no dimension probe.
    assert_eq!(report.reasons.len(), 2);
}

#[test]
fn unknown_mode_is_rejected() {
    let checker = FileChecker::new();
    let report = checker.check(Path::new("whatever.png"), "receipt_ocr");
    assert!(!report.accepted);
    assert_eq!(report.reasons.len(), 1);
    assert!(report.reasons[0].contains("unknown API mode"));
}

#[test]
fn missing_file_is_rejected() {
    let checker = FileChecker::new();
    let report = checker.check(Path::new("/no/such/file.png"), "table_ocr");
    assert!(!report.accepted);
    assert_eq!(report.reasons.len(), 1);
    assert!(report.reasons[0].contains("file not found"));
}

#[test]
fn extract_mode_allows_larger_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.pdf");
    std::fs::write(&path, vec![0u8; 15 * 1024 * 1024]).unwrap();

    let checker = FileChecker::new();
    let report = checker.check(&path, "extract_ocr");
    assert!(report.accepted);
}

#[test]
fn registered_rule_set_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("note.txt");
    std::fs::write(&path, b"hello").unwrap();

    let mut checker = FileChecker::new();
    checker.register(
        "text_ocr",
        RuleSet {
            max_size_bytes: 1024,
            allowed_extensions: vec![".txt".into()],
            min_dimension: 20,
            max_dimension: 10000,
        },
    );
    let report = checker.check(&path, "text_ocr");
    assert!(report.accepted);
}

#[test]
fn malformed_rule_set_leaves_registry_untouched() {
    let mut checker = FileChecker::new();
    let modes_before = checker.supported_modes();

    let partial = serde_json::json!({ "max_size_bytes": 1024 });
    assert!(checker.register_value("partial_ocr", &partial).is_err());
    assert_eq!(checker.supported_modes(), modes_before);
    assert!(checker.rule("partial_ocr").is_none());
}
