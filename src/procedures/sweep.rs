//! Frequency response sweep.
//!
//! The generator drives the device under test; the scope measures the
//! per-period RMS voltage on its input and output and the phase between
//! them. Each point waits for the scope's running statistics to settle and
//! reads their averages.

use crate::config::SweepSettings;
use crate::error::{AppError, AppResult};
use crate::instruments::{Load, Oscilloscope, SignalGenerator, Statistic};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// One measured sweep point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepRow {
    /// Generator frequency in hertz
    pub frequency: f64,
    /// Requested RMS drive in volts
    pub vin_target: f64,
    /// Measured input RMS in volts
    pub vin: f64,
    /// Measured output RMS in volts
    pub vout: f64,
    /// `vout / vin`
    pub gain: f64,
    /// Output phase relative to input, degrees
    pub phase: f64,
}

impl SweepRow {
    /// Gain in decibels.
    pub fn gain_db(&self) -> f64 {
        20.0 * self.gain.log10()
    }
}

pub struct FrequencySweep<'a, S, G> {
    scope: &'a S,
    generator: &'a G,
    settings: SweepSettings,
}

impl<'a, S, G> FrequencySweep<'a, S, G>
where
    S: Oscilloscope,
    G: SignalGenerator,
{
    pub fn new(scope: &'a S, generator: &'a G, settings: SweepSettings) -> Self {
        Self {
            scope,
            generator,
            settings,
        }
    }

    pub fn settings(&self) -> &SweepSettings {
        &self.settings
    }

    /// Switch the generator output on and start from an empty measurement list.
    pub fn prepare(&self) -> AppResult<()> {
        self.settings.validate()?;
        self.generator
            .set_output(self.settings.generator_channel, true)?;
        self.scope.clear_measurements()?;
        Ok(())
    }

    /// Measure every frequency in order.
    pub fn run(&self, frequencies: &[f64]) -> AppResult<Vec<SweepRow>> {
        if frequencies.is_empty() {
            return Err(AppError::Procedure("sweep has no frequencies".to_string()));
        }
        info!(points = frequencies.len(), "Starting frequency sweep");
        self.prepare()?;

        let mut rows = Vec::with_capacity(frequencies.len());
        for (i, &frequency) in frequencies.iter().enumerate() {
            let row = self.measure(frequency)?;
            info!(
                point = i + 1,
                frequency = row.frequency,
                gain = row.gain,
                phase = row.phase,
                "Sweep point measured"
            );
            rows.push(row);
        }
        info!("Sweep complete");
        Ok(rows)
    }

    /// Drive one frequency and read the settled averages.
    pub fn measure(&self, frequency: f64) -> AppResult<SweepRow> {
        let settings = &self.settings;
        let vin_target = settings.target_vrms(frequency);

        let vin = self.scope.rms(settings.input_channel)?;
        let vout = self.scope.rms(settings.output_channel)?;
        let phase = self
            .scope
            .phase(settings.input_channel, settings.output_channel)?;
        vin.enable()?;
        vout.enable()?;
        phase.enable()?;
        self.scope.set_statistics(true)?;

        let channel = settings.generator_channel;
        self.generator.set_frequency(channel, frequency)?;
        self.generator.set_load(channel, Load::Ohms(settings.load_ohms))?;
        self.generator.set_rms_amplitude(channel, vin_target)?;
        pause(settings.settle());

        self.scope.autoscale()?;
        self.scope.reset_statistics()?;
        debug!(frequency, wait = ?settings.measure(), "Waiting for statistics");
        pause(settings.measure());

        let vin = vin.average()?;
        let vout = vout.average()?;
        let phase = phase.average()?;
        if vin == 0.0 || !vin.is_finite() {
            return Err(AppError::Procedure(format!(
                "input RMS at {} Hz is {}; check the input channel",
                frequency, vin
            )));
        }

        Ok(SweepRow {
            frequency,
            vin_target,
            vin,
            vout,
            gain: vout / vin,
            phase,
        })
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::{RigolMso5, SiglentSdg};
    use scpi_core::{MockTransport, Session};
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn logs_every_point() {
        let scope_io = MockTransport::new()
            .with_reply("MEASURE:STATISTIC:ITEM? AVER,PVRMS,CHAN1", "1.0")
            .with_reply("MEASURE:STATISTIC:ITEM? AVER,PVRMS,CHAN2", "2.0")
            .with_reply("MEASURE:STATISTIC:ITEM? AVER,RRPHASE,CHAN1,CHAN2", "10.0");
        let scope = RigolMso5::new(Session::new("mock-scope", scope_io));
        let generator = SiglentSdg::new(Session::new("mock-siggen", MockTransport::new()));
        let settings = SweepSettings {
            settle_ms: 0,
            measure_ms: 0,
            ..Default::default()
        };

        let rows = FrequencySweep::new(&scope, &generator, settings)
            .run(&[100.0, 200.0])
            .unwrap();
        assert_eq!(rows[1].gain, 2.0);
        assert!(logs_contain("Sweep point measured"));
        assert!(logs_contain("Sweep complete"));
    }
}
