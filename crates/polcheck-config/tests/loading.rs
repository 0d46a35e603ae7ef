use polcheck_config::{load_suite, ConfigError};
use polcheck_domain::Effect;
use std::path::Path;

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

#[test]
fn load_effect_table_fixture() {
    let suite = load_suite(&fixture("polcheck.yml")).expect("should load without error");
    assert_eq!(suite.cases.len(), 4);
    assert_eq!(suite.max_parallel, Some(4));
    assert_eq!(suite.terraform_dir, fixture("terraform"));

    let audit = &suite.cases[1];
    assert_eq!(audit.effect, Effect::Audit);
    assert_eq!(suite.case_dir(audit), fixture("terraform").join("resource-location-audit"));
    assert_eq!(audit.assignment_name(&suite.assignment_prefix), "test-resource-location");
}

#[test]
fn load_boolean_table_fixture() {
    let suite = load_suite(&fixture("boolean.yml")).expect("should load without error");
    assert_eq!(suite.binary, "tofu");
    let effects: Vec<Effect> = suite.cases.iter().map(|c| c.effect).collect();
    assert_eq!(effects, vec![Effect::Allow, Effect::Deny]);
    assert_eq!(suite.cases[0].assignment_name(&suite.assignment_prefix), "assign-storage-https");
}

#[test]
fn filter_keeps_matching_labels() {
    let mut suite = load_suite(&fixture("polcheck.yml")).unwrap();
    suite.retain_matching("key-vault");
    assert_eq!(suite.cases.len(), 2);
    suite.retain_matching("deny");
    assert_eq!(suite.cases.len(), 1);
}

#[test]
fn suite_written_to_tempdir_resolves_relative_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("suite.yml");
    std::fs::write(&path, "cases:\n  - name: tags\n    effect: audit\n").unwrap();

    let suite = load_suite(&path).unwrap();
    assert_eq!(suite.terraform_dir, tmp.path().join("terraform"));
}

#[test]
fn malformed_yaml_reports_path() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("broken.yml");
    std::fs::write(&path, "cases: [unterminated").unwrap();

    let err = load_suite(&path).unwrap_err();
    assert!(matches!(err, ConfigError::YamlParse { .. }));
    assert!(err.to_string().contains("broken.yml"), "got: {}", err);
}

#[test]
fn missing_file_returns_error() {
    let path = Path::new("/nonexistent/path/polcheck.yml");
    assert!(matches!(load_suite(path), Err(ConfigError::Io { .. })));
}
