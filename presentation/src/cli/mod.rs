//! Command line definitions and interactive input

pub mod commands;
pub mod interactive;
