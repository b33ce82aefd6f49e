//! Runs that straddle a rollover of the millisecond counter

mod common;

use common::{MockHeater, ThermalPlant, TICK_MS};
use rework_core::config::{Channels, ProcessConfig, TuningConfig};
use rework_core::control::PidCoefficients;
use rework_core::process::{
    HeaterBank, ProcessState, ReflowProfileController, RelayAutoTuner, TunerState,
};

#[test]
fn preheater_across_rollover() {
    let config =
        ProcessConfig::preheater(PidCoefficients::new(2.0, 0.005, 5.0), 2.0, 100.0, 60.0);
    let start = u32::MAX - 30_000;

    let mut plant = ThermalPlant::board(25.0);
    let mut controller = ReflowProfileController::new(HeaterBank::single(MockHeater::default()));
    controller.start(&config, plant.temperature, start).unwrap();

    let mut now = start;
    let mut last_elapsed = 0.0f32;
    let mut records = 0;
    loop {
        let report = controller.tick(now, Ok(plant.temperature)).unwrap();
        assert!(report.elapsed_s >= last_elapsed);
        last_elapsed = report.elapsed_s;
        if report.record.is_some() {
            records += 1;
        }
        if report.state != ProcessState::Running {
            break;
        }
        plant.step(report.heater_on, TICK_MS);
        now = now.wrapping_add(TICK_MS);
    }

    let elapsed = now.wrapping_sub(start);
    assert!(elapsed > 60_000 && elapsed <= 60_000 + TICK_MS, "elapsed {}", elapsed);
    assert!((25..=30).contains(&records), "records = {}", records);
    assert!(plant.temperature > 60.0);
}

#[test]
fn tuning_across_rollover() {
    let config = TuningConfig {
        setpoint: 60.0,
        duration_s: 120.0,
        sample_period_s: 1.0,
        channels: Channels::Dual,
    };
    let start = u32::MAX - 20_000;

    let mut plant = ThermalPlant::board(25.0);
    let mut tuner = RelayAutoTuner::new(HeaterBank::dual(
        MockHeater::default(),
        MockHeater::default(),
    ));
    tuner.start(&config, plant.temperature, start).unwrap();

    let mut now = start;
    let result = loop {
        let report = tuner.tick(now, Ok(plant.temperature)).unwrap();
        if let Some(result) = report.result {
            break result;
        }
        plant.step(report.heater_on, TICK_MS);
        now = now.wrapping_add(TICK_MS);
    };

    assert_eq!(tuner.state(), TunerState::Done);
    assert!(now.wrapping_sub(start) > 120_000);
    // Warm-up straddles the rollover; its slope must still be sane
    assert!(result.warmup_slope > 1.0 && result.warmup_slope < 2.0);
    let cross = tuner.first_cross_ms().unwrap();
    assert!(cross > 10_000 && cross < 40_000, "crossed at {}", cross);
}
