use pump_core::{
    InfusionStatus, PumpEngine, PumpError, PumpEvent, PumpPhase, Severity, StartOutcome,
};
use rstest::{fixture, rstest};

#[fixture]
fn engine() -> PumpEngine {
    let mut e = PumpEngine::default();
    e.initialize();
    e.drain_events();
    e
}

fn lines(events: &[PumpEvent]) -> Vec<String> {
    events.iter().flat_map(PumpEvent::lines).collect()
}

#[rstest]
fn initialize_restores_factory_settings(mut engine: PumpEngine) {
    engine.set_rate(50).unwrap();
    engine.set_volume(10.0);
    engine.start();
    engine.advance(500);
    engine.initialize();

    assert_eq!(engine.rate_ml_per_hour(), 100);
    assert_eq!(engine.volume_to_infuse_ml(), 500.0);
    assert_eq!(engine.duration_seconds(), 5000);
    assert_eq!(engine.duration_ms(), 5_000_000);
    assert_eq!(engine.volume_infused_ml(), 0.0);
    assert_eq!(engine.elapsed_time_ms(), 0);
    assert!(!engine.is_running());
    assert!(!engine.is_privileged_mode());
    assert_eq!(engine.patient_id(), "UNKNOWN");
    assert_eq!(engine.medication(), "SALINE");

    let first = engine.snapshot();
    engine.initialize();
    assert_eq!(engine.snapshot(), first);
    assert!(matches!(
        engine.drain_events().last(),
        Some(PumpEvent::Initialized)
    ));
}

#[rstest]
fn over_limit_rate_is_rejected_and_state_kept(mut engine: PumpEngine) {
    let before = engine.snapshot();
    let err = engine.set_rate(1000).unwrap_err();
    assert_eq!(
        err,
        PumpError::RateExceedsLimit {
            requested: 1000,
            max: 999
        }
    );
    assert_eq!(engine.snapshot(), before);
    assert_eq!(
        lines(&engine.drain_events()),
        vec!["ERROR: Rate exceeds maximum allowed (999 ml/hr)"]
    );
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(999)]
fn rates_up_to_cap_are_accepted(mut engine: PumpEngine, #[case] rate: u32) {
    engine.set_rate(rate).unwrap();
    assert_eq!(engine.rate_ml_per_hour(), rate);
    assert!(engine.drain_events().is_empty());
}

#[rstest]
fn set_rate_does_not_rederive_duration(mut engine: PumpEngine) {
    engine.set_rate(250).unwrap();
    assert_eq!(engine.duration_seconds(), 5000);
    assert_eq!(engine.volume_to_infuse_ml(), 500.0);
}

#[rstest]
#[case(250.0, 100, 9000)]
#[case(500.0, 100, 18_000)]
#[case(1.0, 7, 514)]
#[case(0.0, 100, 0)]
fn set_volume_derives_whole_seconds(
    mut engine: PumpEngine,
    #[case] volume: f64,
    #[case] rate: u32,
    #[case] expected_s: u64,
) {
    engine.set_rate(rate).unwrap();
    engine.set_volume(volume);
    assert_eq!(engine.volume_to_infuse_ml(), volume);
    assert_eq!(engine.duration_seconds(), expected_s);
    assert_eq!(engine.duration_ms(), expected_s * 1000);
}

#[rstest]
fn over_limit_duration_is_clamped_and_volume_rederived(mut engine: PumpEngine) {
    let err = engine.set_duration(4000).unwrap_err();
    assert_eq!(
        err,
        PumpError::DurationExceedsLimit {
            requested: 4000,
            applied: 3600
        }
    );
    assert_eq!(engine.duration_seconds(), 3600);
    assert_eq!(engine.duration_ms(), 3_600_000);
    assert_eq!(engine.volume_to_infuse_ml(), 100.0);

    let events = engine.drain_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].severity(), Severity::Error);
    assert_eq!(
        events[0].to_string(),
        "ERROR: Duration exceeds maximum allowed (3,600 seconds / 1 hour)"
    );
}

#[rstest]
fn set_duration_floors_volume(mut engine: PumpEngine) {
    engine.set_rate(7).unwrap();
    engine.set_duration(1000).unwrap();
    // 7 ml/hr * 1000 s = 1.94 ml
    assert_eq!(engine.volume_to_infuse_ml(), 1.0);
}

#[rstest]
fn regular_setters_clear_privileged_mode(mut engine: PumpEngine) {
    engine.inject_admin_parameters(5000, 10.0, 60);
    assert!(engine.is_privileged_mode());
    engine.set_volume(10.0);
    assert!(!engine.is_privileged_mode());

    engine.inject_admin_parameters(5000, 10.0, 60);
    let _ = engine.set_duration(60);
    assert!(!engine.is_privileged_mode());
}

#[rstest]
fn admin_injection_bypasses_caps(mut engine: PumpEngine) {
    engine.inject_admin_parameters(5000, 999_999.0, 18_000);
    assert_eq!(engine.rate_ml_per_hour(), 5000);
    assert_eq!(engine.volume_to_infuse_ml(), 999_999.0);
    assert_eq!(engine.duration_seconds(), 18_000);
    assert_eq!(engine.duration_ms(), 18_000_000);
    assert!(engine.is_privileged_mode());
    assert_eq!(
        lines(&engine.drain_events()),
        vec!["ADMIN: Custom parameters have been set"]
    );
}

#[rstest]
fn admin_start_recomputes_target_through_the_wrap(mut engine: PumpEngine) {
    engine.inject_admin_parameters(5000, 999_999.0, 18_000);
    engine.drain_events();

    let StartOutcome::Started(report) = engine.start() else {
        panic!("expected start");
    };
    assert!(report.admin_override);
    assert!((engine.volume_to_infuse_ml() - 0.904_244_337_777_777_8).abs() < 1e-12);

    let text = lines(&engine.drain_events());
    assert_eq!(text[0], "ADMIN MODE: Using custom parameters");
    assert_eq!(text[1], "Starting infusion...");
    assert_eq!(text[4], "Rate: 5000 ml/hr");
    assert_eq!(text[6], "Duration: 18000 seconds");
}

#[rstest]
fn admin_run_warns_once_then_completes_early(mut engine: PumpEngine) {
    engine.inject_admin_parameters(5000, 999_999.0, 18_000);
    engine.start();
    engine.drain_events();

    assert_eq!(engine.advance(500), InfusionStatus::Running);
    let first = engine.drain_events();
    let diag = first
        .iter()
        .find_map(|ev| match ev {
            PumpEvent::UnderdoseAnomaly(d) => Some(*d),
            _ => None,
        })
        .expect("anomaly on first tick");
    assert_eq!(diag.expected_ml, 25_000.0);
    assert!((diag.actual_ml - 0.904_244_337_777_777_8).abs() < 1e-12);
    assert_eq!(
        lines(&first),
        vec![
            "---------------------------------------------",
            "System notice: Calculation anomaly detected",
            "Expected volume: 25000.00 ml",
            "Actual delivery: 0.90 ml",
            "MEDICATION UNDERDOSE POSSIBLE - Please contact system administrator",
        ]
    );

    let status = engine.advance(500);
    let InfusionStatus::Complete { delivered_ml } = status else {
        panic!("expected completion on second tick, got {status:?}");
    };
    assert!((delivered_ml - 2.0 * 2.5e9 / 3.6e9).abs() < 1e-9);
    assert!(!engine.is_running());
    assert_eq!(
        lines(&engine.drain_events()),
        vec!["Infusion complete! Delivered 1.39 ml"]
    );
}

#[rstest]
fn small_admin_parameters_take_the_regular_path(mut engine: PumpEngine) {
    engine.inject_admin_parameters(500, 50.0, 600);
    let StartOutcome::Started(report) = engine.start() else {
        panic!("expected start");
    };
    assert!(!report.admin_override);
    assert_eq!(engine.volume_to_infuse_ml(), 50.0);
    engine.advance(500);
    assert!(
        !engine
            .drain_events()
            .iter()
            .any(|e| matches!(e, PumpEvent::UnderdoseAnomaly(_)))
    );
}

#[rstest]
fn anomaly_needs_more_than_the_margin(mut engine: PumpEngine) {
    // 1000 ml/hr for 4295 s: expected 1193 ml, actual ~0.009 ml
    engine.inject_admin_parameters(1000, 1.0, 4295);
    engine.start();
    engine.advance(500);
    assert!(
        engine
            .drain_events()
            .iter()
            .any(|e| matches!(e, PumpEvent::UnderdoseAnomaly(_)))
    );

    // 1000 ml/hr for 60 s wraps too, but the shortfall (~15 ml) is under the margin
    engine.initialize();
    engine.inject_admin_parameters(1000, 1.0, 60);
    engine.start();
    engine.advance(500);
    assert!(
        !engine
            .drain_events()
            .iter()
            .any(|e| matches!(e, PumpEvent::UnderdoseAnomaly(_)))
    );
}

#[rstest]
fn start_twice_reports_already_running(mut engine: PumpEngine) {
    assert!(matches!(engine.start(), StartOutcome::Started(_)));
    engine.drain_events();
    assert_eq!(engine.start(), StartOutcome::AlreadyRunning);
    assert_eq!(
        lines(&engine.drain_events()),
        vec!["Infusion already in progress"]
    );
}

#[rstest]
fn stop_is_noop_when_idle(mut engine: PumpEngine) {
    assert!(!engine.stop());
    assert!(engine.drain_events().is_empty());

    engine.start();
    engine.drain_events();
    assert!(engine.stop());
    assert_eq!(lines(&engine.drain_events()), vec!["Infusion stopped"]);
    assert_eq!(engine.phase(), PumpPhase::Idle);
}

#[rstest]
fn advance_is_idle_when_not_running(mut engine: PumpEngine) {
    assert_eq!(engine.advance(500), InfusionStatus::Idle);
    assert_eq!(engine.elapsed_time_ms(), 0);
    assert_eq!(engine.volume_infused_ml(), 0.0);
}

#[rstest]
fn restart_keeps_accumulated_volume(mut engine: PumpEngine) {
    engine.start();
    engine.advance(500);
    engine.stop();
    let infused = engine.volume_infused_ml();
    let elapsed = engine.elapsed_time_ms();

    engine.start();
    assert_eq!(engine.run_ticks(), 0);
    engine.advance(500);
    assert!(engine.volume_infused_ml() > infused);
    assert_eq!(engine.elapsed_time_ms(), elapsed + 500);
}

#[rstest]
fn no_volume_accrues_after_completion(mut engine: PumpEngine) {
    engine.set_volume(0.01);
    engine.start();
    let status = engine.advance(500);
    assert!(matches!(status, InfusionStatus::Complete { .. }));
    let done = engine.volume_infused_ml();
    assert_eq!(engine.advance(500), InfusionStatus::Idle);
    assert_eq!(engine.volume_infused_ml(), done);
}

#[rstest]
fn credentials(engine: PumpEngine) {
    assert!(engine.validate_admin_credential("SPQR2025"));
    assert!(!engine.validate_admin_credential("admin"));
    assert_eq!(
        engine.authorize_admin("nope"),
        Err(PumpError::InvalidCredential)
    );
    assert!(engine.authorize_admin("SPQR2025").is_ok());
}

#[rstest]
fn free_text_identity_fields(mut engine: PumpEngine) {
    engine.set_patient_id("BED-12");
    engine.set_medication("");
    let StartOutcome::Started(report) = engine.start() else {
        panic!("expected start");
    };
    assert_eq!(report.patient_id, "BED-12");
    assert_eq!(report.medication, "");
}
