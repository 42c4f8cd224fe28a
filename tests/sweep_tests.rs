//! Frequency sweep against mocked instruments
//!
//! The sweep only talks to the capability traits; these tests run it over the
//! real dialects backed by `MockTransport` with all waits set to zero.

use scpi_daq::config::SweepSettings;
use scpi_daq::error::AppError;
use scpi_daq::instruments::{RigolMso5, SiglentSdg};
use scpi_daq::procedures::{harmonics, FrequencySweep};
use scpi_daq::scpi_core::{MockTransport, Session};

const VIN: &str = "MEASURE:STATISTIC:ITEM? AVER,PVRMS,CHAN1";
const VOUT: &str = "MEASURE:STATISTIC:ITEM? AVER,PVRMS,CHAN2";
const PHASE: &str = "MEASURE:STATISTIC:ITEM? AVER,RRPHASE,CHAN1,CHAN2";

struct Bench {
    scope: RigolMso5,
    generator: SiglentSdg,
    scope_io: MockTransport,
    generator_io: MockTransport,
}

fn bench() -> Bench {
    let scope_io = MockTransport::new()
        .with_reply(VIN, "3.500000E+00")
        .with_reply(VOUT, "1.750000E+00")
        .with_reply(PHASE, "-4.500000E+01");
    let generator_io = MockTransport::new();
    Bench {
        scope: RigolMso5::new(Session::new("mock-scope", scope_io.clone())),
        generator: SiglentSdg::new(Session::new("mock-siggen", generator_io.clone())),
        scope_io,
        generator_io,
    }
}

fn instant() -> SweepSettings {
    SweepSettings {
        settle_ms: 0,
        measure_ms: 0,
        ..Default::default()
    }
}

#[test]
fn test_sweep_rows() {
    let bench = bench();
    let sweep = FrequencySweep::new(&bench.scope, &bench.generator, instant());

    let rows = sweep.run(&[1e3, 30e6]).unwrap();
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].frequency, 1e3);
    assert_eq!(rows[0].vin_target, 3.535);
    assert_eq!(rows[0].vin, 3.5);
    assert_eq!(rows[0].vout, 1.75);
    assert_eq!(rows[0].gain, 0.5);
    assert_eq!(rows[0].phase, -45.0);
    assert!((rows[0].gain_db() + 6.0206).abs() < 1e-3);

    assert_eq!(rows[1].vin_target, 1.767);
}

#[test]
fn test_sweep_generator_traffic() {
    let bench = bench();
    let sweep = FrequencySweep::new(&bench.scope, &bench.generator, instant());
    sweep.run(&[1e3]).unwrap();

    assert_eq!(
        bench.generator_io.writes(),
        vec![
            "C1:OUTP ON",
            "C1:BSWV FRQ, 1000.000000HZ",
            "C1:OUTP LOAD, 50",
            "C1:BSWV AMPVRMS, 3.535000Vrms",
        ]
    );
}

#[test]
fn test_sweep_scope_traffic() {
    let bench = bench();
    let sweep = FrequencySweep::new(&bench.scope, &bench.generator, instant());
    sweep.run(&[1e3]).unwrap();

    assert_eq!(
        bench.scope_io.writes(),
        vec![
            "MEASURE:CLEAR",
            "MEASURE:ITEM PVRMS,CHAN1",
            "MEASURE:ITEM PVRMS,CHAN2",
            "MEASURE:ITEM RRPHASE,CHAN1,CHAN2",
            "MEASURE:STATISTIC:DISPLAY ON",
            "AUTOSCALE",
            "MEASURE:STATISTIC:RESET",
        ]
    );
    assert_eq!(bench.scope_io.queries(), vec![VIN, VOUT, PHASE]);
}

#[test]
fn test_harmonic_sweep_visits_each_harmonic() {
    let bench = bench();
    let sweep = FrequencySweep::new(&bench.scope, &bench.generator, instant());

    let rows = sweep.run(&harmonics(1e3, 3)).unwrap();
    let frequencies: Vec<f64> = rows.iter().map(|row| row.frequency).collect();
    assert_eq!(frequencies, vec![1e3, 2e3, 3e3]);
}

#[test]
fn test_zero_input_is_procedure_error() {
    let bench = bench();
    bench.scope_io.set_reply(VIN, "0.000000E+00");
    let sweep = FrequencySweep::new(&bench.scope, &bench.generator, instant());

    assert!(matches!(sweep.run(&[1e3]), Err(AppError::Procedure(_))));
}

#[test]
fn test_empty_sweep_touches_nothing() {
    let bench = bench();
    let sweep = FrequencySweep::new(&bench.scope, &bench.generator, instant());

    assert!(matches!(sweep.run(&[]), Err(AppError::Procedure(_))));
    assert!(bench.scope_io.calls().is_empty());
    assert!(bench.generator_io.calls().is_empty());
}

#[test]
fn test_instrument_failure_aborts_sweep() {
    let bench = bench();
    bench.scope_io.set_reply(PHASE, "****");
    let sweep = FrequencySweep::new(&bench.scope, &bench.generator, instant());

    assert!(matches!(sweep.run(&[1e3]), Err(AppError::Instrument(_))));
}

#[test]
fn test_invalid_settings_rejected_before_io() {
    let bench = bench();
    let settings = SweepSettings {
        output_channel: 1,
        ..instant()
    };
    let sweep = FrequencySweep::new(&bench.scope, &bench.generator, settings);

    assert!(matches!(sweep.run(&[1e3]), Err(AppError::Configuration(_))));
    assert!(bench.generator_io.calls().is_empty());
}
