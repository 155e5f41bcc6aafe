//! In-process adapters: volatile event log and deterministic sources.

pub mod clock;
pub mod event_log;
pub mod id_gen;
