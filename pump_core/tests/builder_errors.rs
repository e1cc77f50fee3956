use pump_core::error::BuildError;
use pump_core::{DiagnosticsCfg, InfusionDefaults, Limits, PumpEngine};
use rstest::rstest;

fn build_error(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::InvalidConfig(msg)) => *msg,
        other => panic!("expected InvalidConfig, got: {other:?}"),
    }
}

#[rstest]
#[case(f64::NAN, "finite")]
#[case(f64::INFINITY, "finite")]
#[case(-1.0, ">= 0")]
fn bad_default_volume_yields_typed_build_error(#[case] volume_ml: f64, #[case] needle: &str) {
    let err = PumpEngine::builder()
        .with_defaults(InfusionDefaults {
            volume_ml,
            ..InfusionDefaults::default()
        })
        .build()
        .expect_err("should reject default volume");
    assert!(build_error(&err).contains(needle));
}

#[rstest]
#[case(f64::NAN)]
#[case(-0.5)]
fn bad_margin_yields_typed_build_error(#[case] margin: f64) {
    let err = PumpEngine::builder()
        .with_diagnostics(DiagnosticsCfg {
            underdose_margin_ml: margin,
            ..DiagnosticsCfg::default()
        })
        .build()
        .expect_err("should reject margin");
    assert!(build_error(&err).contains("margin"));
}

#[test]
fn builder_applies_custom_limits_and_defaults() {
    let mut e = PumpEngine::builder()
        .with_limits(Limits {
            max_rate_ml_per_hour: 50,
            max_duration_s: 600,
        })
        .with_defaults(InfusionDefaults {
            patient_id: "BED-3".into(),
            medication: "HEPARIN".into(),
            rate_ml_per_hour: 20,
            volume_ml: 10.0,
            duration_s: 1800,
        })
        .build()
        .unwrap();
    e.initialize();

    assert_eq!(e.patient_id(), "BED-3");
    assert_eq!(e.rate_ml_per_hour(), 20);
    assert!(e.set_rate(51).is_err());
    let _ = e.set_duration(601);
    assert_eq!(e.duration_seconds(), 600);
    assert_eq!(
        e.drain_events().last().map(ToString::to_string).as_deref(),
        Some("ERROR: Duration exceeds maximum allowed (600 seconds)")
    );
}

#[test]
fn builder_reads_toml_config() {
    let cfg = pump_config::load_toml(
        r#"
[limits]
max_rate_ml_per_hour = 1200

[diagnostics]
underdose_margin_ml = 0.0
"#,
    )
    .unwrap();
    let mut e = PumpEngine::builder().with_config(&cfg).build().unwrap();
    assert!(e.set_rate(1100).is_ok());
    assert_eq!(e.diagnostics().underdose_margin_ml, 0.0);
    assert_eq!(e.defaults().medication, "SALINE");
}
