//! Live adapters backed by the operating system.

pub mod clock;
pub mod event_log;
pub mod filesystem;
pub mod id_gen;
