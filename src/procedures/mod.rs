//! Measurement procedures built on the instrument capability traits.
//!
//! Procedures only see [`Oscilloscope`] and [`SignalGenerator`], so any
//! dialect implementing those traits can be swept. Results are returned to
//! the caller as rows; persisting them is the caller's business.
//!
//! # Example
//!
//! ```no_run
//! use scpi_daq::config::SweepSettings;
//! use scpi_daq::procedures::{logspace, with_extra, FrequencySweep};
//! # use scpi_daq::instruments::{RigolMso5, SiglentSdg};
//! # fn run(scope: &RigolMso5, generator: &SiglentSdg) -> scpi_daq::error::AppResult<()> {
//! let points = with_extra(logspace(10.0, 100e6, 50)?, &[1e3, 1e6]);
//! let sweep = FrequencySweep::new(scope, generator, SweepSettings::default());
//! for row in sweep.run(&points)? {
//!     println!("{:e} Hz: gain {:.3}, phase {:.1} deg", row.frequency, row.gain, row.phase);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`Oscilloscope`]: crate::instruments::Oscilloscope
//! [`SignalGenerator`]: crate::instruments::SignalGenerator

pub mod sweep;

pub use sweep::{FrequencySweep, SweepRow};

use crate::error::{AppError, AppResult};

/// `count` points spaced evenly on a log scale from `start` to `stop`, both
/// included.
pub fn logspace(start: f64, stop: f64, count: usize) -> AppResult<Vec<f64>> {
    if !(start > 0.0 && stop > 0.0 && start.is_finite() && stop.is_finite()) {
        return Err(AppError::Procedure(format!(
            "log-spaced points need positive finite bounds, got {} and {}",
            start, stop
        )));
    }
    match count {
        0 => Ok(Vec::new()),
        1 => Ok(vec![start]),
        _ => {
            let (low, high) = (start.log10(), stop.log10());
            let step = (high - low) / (count - 1) as f64;
            Ok((0..count)
                .map(|i| {
                    if i == count - 1 {
                        stop
                    } else {
                        10f64.powf(low + step * i as f64)
                    }
                })
                .collect())
        }
    }
}

/// The first `count` harmonics of `fundamental`, the fundamental included.
pub fn harmonics(fundamental: f64, count: usize) -> Vec<f64> {
    (1..=count).map(|h| fundamental * h as f64).collect()
}

/// Merge `extra` into `points`, sorted ascending without duplicates.
pub fn with_extra(mut points: Vec<f64>, extra: &[f64]) -> Vec<f64> {
    points.extend_from_slice(extra);
    points.sort_by(f64::total_cmp);
    points.dedup();
    points
}
