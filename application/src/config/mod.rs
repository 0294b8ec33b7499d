//! Application-level configuration.
//!
//! - [`RunParams`]: turn loop control (termination settings, hard cap, timeouts)

pub mod run_params;

pub use run_params::RunParams;
