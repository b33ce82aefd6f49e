//! Full preheater runs against a simulated board

mod common;

use common::{MockHeater, ThermalPlant, TICK_MS};
use rework_core::config::{ProcessConfig, StationParameters};
use rework_core::control::PidCoefficients;
use rework_core::process::{HeaterBank, ProcessState, ReflowProfileController};
use rework_core::traits::SensorError;
use rework_core::ControlError;

#[test]
fn preheater_holds_setpoint_and_completes() {
    let setpoint = 120.0;
    let config =
        ProcessConfig::preheater(PidCoefficients::new(2.0, 0.005, 5.0), 2.0, setpoint, 600.0);

    let mut plant = ThermalPlant::board(25.0);
    let mut controller = ReflowProfileController::new(HeaterBank::single(MockHeater::default()));
    controller.start(&config, plant.temperature, 0).unwrap();

    let mut now = 0u32;
    let mut records = 0;
    let mut peak = plant.temperature;
    let final_state = loop {
        let report = controller.tick(now, Ok(plant.temperature)).unwrap();
        if report.record.is_some() {
            records += 1;
        }
        if report.state != ProcessState::Running {
            break report.state;
        }
        plant.step(report.heater_on, TICK_MS);
        peak = peak.max(plant.temperature);
        now += TICK_MS;
    };

    assert_eq!(final_state, ProcessState::Completed);
    assert!(now > 600_000 && now <= 600_000 + TICK_MS, "ended at {}", now);
    assert!(!controller.heaters().is_on());

    // One PID update per (just over) two seconds
    assert!((250..=300).contains(&records), "records = {}", records);

    assert!(peak < setpoint + 15.0, "peak = {}", peak);
    assert!(
        (plant.temperature - setpoint).abs() < 15.0,
        "final = {}",
        plant.temperature
    );
}

#[test]
fn preheater_from_station_parameters() {
    let mut params = StationParameters::default();
    params.preheater.setpoint = 80.0;
    params.preheater.duration_s = 30.0;

    let mut controller = ReflowProfileController::new(HeaterBank::single(MockHeater::default()));
    controller.start(&params.preheater(), 25.0, 1_000).unwrap();
    assert!((controller.remaining_s(1_000) - 30.0).abs() < 1e-3);

    // Editing the parameters mid-run does not touch the running snapshot
    params.preheater.duration_s = 5.0;
    let report = controller.tick(11_000, Ok(30.0)).unwrap();
    assert_eq!(report.state, ProcessState::Running);
    assert!((controller.remaining_s(11_000) - 20.0).abs() < 1e-3);
}

#[test]
fn sensor_dropout_mid_run() {
    let config =
        ProcessConfig::preheater(PidCoefficients::new(2.0, 0.0, 0.0), 1.0, 100.0, 60.0);
    let mut plant = ThermalPlant::board(25.0);
    let mut controller = ReflowProfileController::new(HeaterBank::single(MockHeater::default()));
    controller.start(&config, plant.temperature, 0).unwrap();

    let mut now = 0u32;
    while now < 10_000 {
        let report = controller.tick(now, Ok(plant.temperature)).unwrap();
        plant.step(report.heater_on, TICK_MS);
        now += TICK_MS;
    }

    // Thermocouple comes loose for a second: heaters must stay off
    let until = now + 1_000;
    while now < until {
        assert_eq!(
            controller.tick(now, Err(SensorError::OpenCircuit)),
            Err(ControlError::SensorFault(SensorError::OpenCircuit))
        );
        assert!(!controller.heaters().is_on());
        plant.step(false, TICK_MS);
        now += TICK_MS;
    }

    // Control resumes with the next PID update
    let mut resumed = false;
    let until = now + 2_000;
    while now < until {
        let report = controller.tick(now, Ok(plant.temperature)).unwrap();
        resumed |= report.heater_on;
        plant.step(report.heater_on, TICK_MS);
        now += TICK_MS;
    }
    assert!(resumed);
    assert_eq!(controller.state(), ProcessState::Running);
}

#[test]
fn stop_mid_window() {
    let config =
        ProcessConfig::preheater(PidCoefficients::new(2.0, 0.0, 0.0), 2.0, 100.0, 60.0);
    let mut controller = ReflowProfileController::new(HeaterBank::single(MockHeater::default()));
    controller.start(&config, 25.0, 0).unwrap();

    assert!(controller.tick(0, Ok(25.0)).unwrap().heater_on);
    assert!(controller.tick(TICK_MS, Ok(25.0)).unwrap().heater_on);

    controller.stop();
    assert_eq!(controller.state(), ProcessState::Stopped);
    assert!(!controller.heaters().is_on());

    let bank = controller.release();
    assert!(!bank.bottom().on);
}
