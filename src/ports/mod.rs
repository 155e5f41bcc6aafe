//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the dispatch core and an
//! external system (time, IDs, filesystem, event sinks, execution runtimes).
//! Implementations live in `src/adapters/`.

pub mod clock;
pub mod event_log;
pub mod filesystem;
pub mod id_gen;
pub mod runtime;

pub use clock::Clock;
pub use event_log::{EventLog, LogEvent};
pub use filesystem::FileSystem;
pub use id_gen::IdGenerator;
pub use runtime::Runtime;

/// Error type returned across port boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
