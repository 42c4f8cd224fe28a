//! # SCPI DAQ
//!
//! Bench instrument control on top of the [`scpi_core`] property layer.
//!
//! ## Crate Structure
//!
//! - **`config`**: Figment-based configuration (`config/scpi.toml` plus
//!   `SCPI_DAQ_*` environment overrides): transport settings, sweep
//!   parameters and the instrument list.
//! - **`error`**: The `AppError` enum for everything above the property layer.
//! - **`logging`**: `tracing-subscriber` initialization.
//! - **`transport`**: Socket and serial transports addressed by VISA-style
//!   resource strings.
//! - **`instruments`**: Concrete dialects (Rigol MSO5000 oscilloscope, Siglent
//!   SDG generator) and the capability traits procedures are written against.
//! - **`procedures`**: Frequency sweeps and sweep point helpers.

pub mod config;
pub mod error;
pub mod instruments;
pub mod logging;
pub mod procedures;
pub mod transport;

pub use scpi_core;
