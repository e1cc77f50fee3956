use pump_config::{load_file, load_toml};
use rstest::rstest;
use std::fs;
use tempfile::tempdir;

#[test]
fn parses_full_document() {
    let toml = r#"
[limits]
max_rate_ml_per_hour = 500
max_duration_s = 1800

[defaults]
patient_id = "P-0042"
medication = "HEPARIN"
rate_ml_per_hour = 50
volume_ml = 250.0
duration_s = 1200

[diagnostics]
privileged_rate_ml_per_hour = 2000
privileged_duration_s = 8000
underdose_margin_ml = 25.0

[simulation]
tick_ms = 250
console_cycle_ms = 60000
max_ticks = 5000

[logging]
level = "debug"
rotation = "daily"
"#;

    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.limits.max_rate_ml_per_hour, 500);
    assert_eq!(cfg.defaults.medication, "HEPARIN");
    assert_eq!(cfg.diagnostics.privileged_duration_s, 8000);
    assert_eq!(cfg.simulation.tick_ms, 250);
    assert_eq!(cfg.logging.rotation.as_deref(), Some("daily"));
}

#[test]
fn partial_sections_keep_remaining_defaults() {
    let toml = r#"
[simulation]
tick_ms = 1000
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    assert_eq!(cfg.simulation.tick_ms, 1000);
    assert_eq!(cfg.simulation.console_cycle_ms, 300_000);
    assert_eq!(cfg.limits.max_rate_ml_per_hour, 999);
    assert!((cfg.diagnostics.underdose_margin_ml - 100.0).abs() < f64::EPSILON);
}

#[rstest]
#[case("[simulation]\ntick_ms = 0\n", "tick_ms must be >= 1")]
#[case("[simulation]\nconsole_cycle_ms = 0\n", "console_cycle_ms must be >= 1")]
#[case("[simulation]\nmax_ticks = 0\n", "max_ticks must be >= 1")]
#[case(
    "[diagnostics]\nunderdose_margin_ml = -1.0\n",
    "underdose_margin_ml must be a finite value"
)]
#[case("[defaults]\nvolume_ml = -250.0\n", "defaults.volume_ml must be >= 0.0")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation must be one of")]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "unexpected error: {err}"
    );
}

#[test]
fn rejects_wrong_types_at_parse_time() {
    let toml = r#"
[limits]
max_rate_ml_per_hour = -5
"#;
    assert!(load_toml(toml).is_err());
}

#[test]
fn load_file_reads_and_validates() {
    let dir = tempdir().unwrap();
    let ok = dir.path().join("ok.toml");
    fs::write(&ok, "[defaults]\npatient_id = \"BED-7\"\n").unwrap();
    let cfg = load_file(&ok).expect("load ok config");
    assert_eq!(cfg.defaults.patient_id, "BED-7");

    let bad = dir.path().join("bad.toml");
    fs::write(&bad, "[simulation]\ntick_ms = 0\n").unwrap();
    let err = load_file(&bad).expect_err("invalid config must fail");
    assert!(format!("{err}").contains("tick_ms"));

    let missing = dir.path().join("missing.toml");
    let err = load_file(&missing).expect_err("missing file must fail");
    assert!(format!("{err}").contains("read config"));
}

#[test]
fn shipped_sample_config_is_valid() {
    let cfg = pump_config::load_toml(include_str!("../../etc/pump_config.toml"))
        .expect("sample parses");
    cfg.validate().expect("sample validates");
    assert_eq!(cfg.limits.max_rate_ml_per_hour, 999);
    assert_eq!(cfg.simulation.console_cycle_ms, 300_000);
    assert!(cfg.logging.file.is_none());
}
