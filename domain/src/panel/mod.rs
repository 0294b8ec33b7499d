//! Panel membership.
//!
//! - [`responder::ResponderProfile`]: one expert (name, description, prompt, role)
//! - [`roster::Roster`]: the validated set of responders for a run

pub mod responder;
pub mod roster;
