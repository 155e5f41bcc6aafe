//! Adapter implementations for the port traits.
//!
//! - `live`: system clock, random ids, real disk, JSON-lines event file.
//! - `memory`: in-process event log and deterministic clock/id sources.
//! - `runtimes`: built-in execution runtimes.

pub mod live;
pub mod memory;
pub mod runtimes;
