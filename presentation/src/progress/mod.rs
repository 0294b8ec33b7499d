//! Turn-by-turn progress reporting

pub mod reporter;
