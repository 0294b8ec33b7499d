//! Console formatting of runs and stored sessions

pub mod console;
