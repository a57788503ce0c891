use serde_json::json;
use sheetpipe::api::{ApiMode, ResponseArchive, status, status_code};

#[test]
fn success_is_200_only() {
    assert!(status::is_success(200));
    assert!(!status::is_success(40101));
    assert!(!status::is_success(500));
}

#[test]
fn credential_codes_have_descriptions() {
    for code in [40101, 40102, 40103] {
        let text = status::describe(code, ApiMode::ExtractOcr);
        assert!(!text.contains("unknown"), "{code}: {text}");
    }
    assert!(status::describe(40101, ApiMode::TableOcr).contains("x-ti-app-id"));
}

#[test]
fn size_wording_follows_mode() {
    assert!(status::describe(40303, ApiMode::TableOcr).contains("10MB"));
    assert!(status::describe(40303, ApiMode::ExtractOcr).contains("50MB"));
}

#[test]
fn unknown_code_carries_the_number() {
    assert!(status::describe(12345, ApiMode::TableOcr).contains("12345"));
}

#[test]
fn status_code_reads_payload() {
    assert_eq!(status_code(&json!({"code": 200, "result": {}})), Some(200));
    assert_eq!(status_code(&json!({"message": "no code"})), None);
}

#[test]
fn archive_counter_is_monotonic() {
    let dir = tempfile::tempdir().unwrap();
    let mut archive = ResponseArchive::new(dir.path());

    let (first, path_a) = archive.save(&json!({"code": 200})).unwrap();
    let (second, path_b) = archive.save(&json!({"code": 200})).unwrap();

    assert_eq!(first, 0);
    assert_eq!(second, 1);
    assert!(path_a.ends_with("0_response.json"));
    assert!(path_b.ends_with("1_response.json"));
    assert!(path_a.exists() && path_b.exists());
}
