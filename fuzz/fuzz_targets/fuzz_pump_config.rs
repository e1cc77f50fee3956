#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    let Ok(cfg) = pump_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    // A validated config must build an engine that survives a short run.
    let Ok(mut engine) = pump_core::PumpEngine::builder().with_config(&cfg).build() else {
        return;
    };
    engine.initialize();
    engine.start();
    for _ in 0..4 {
        engine.advance(cfg.simulation.tick_ms);
    }
    let _ = engine.drain_events();
});
