use sheetpipe::config::{Config, OccurrencePolicy};

#[test]
fn parse_example_config() {
    let raw = include_str!("../sheetpipe.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert!(!cfg.http.table_endpoint.is_empty());
    assert_eq!(cfg.extract.table_header_keys.len(), 5);
    assert_eq!(cfg.extract.occurrence_policy, OccurrencePolicy::First);
}

#[test]
fn empty_credentials_fail_validation() {
    let cfg = Config::default();
    assert!(cfg.credentials.validate().is_err());
}

#[test]
fn partial_rule_set_is_a_parse_error() {
    let raw = r#"
[rules.receipt_ocr]
max_size_bytes = 1024
"#;
    assert!(toml::from_str::<Config>(raw).is_err());
}
