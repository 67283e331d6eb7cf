//! # RTVI Telemetry
//!
//! Structured logging for the RTVI LiveKit transport.
//!
//! ## Features
//! - Structured logging with `tracing`
//! - `RUST_LOG`-style filtering via `EnvFilter`
//! - Plain or JSON console output
//! - Span helpers for connect, flush and data-channel operations
//!
//! ## Usage
//!
//! ```rust
//! use rtvi_telemetry::{init_telemetry, info};
//!
//! fn main() -> Result<(), rtvi_telemetry::TelemetryError> {
//!     init_telemetry("voice-client")?;
//!     info!("transport starting");
//!     Ok(())
//! }
//! ```

pub mod init;
pub mod spans;

// Re-export tracing macros for convenience
pub use tracing::{Span, debug, error, info, instrument, trace, warn};

pub use spans::*;

pub use init::{TelemetryConfig, TelemetryError, init_telemetry, init_with_config};
