//! Core of the roster change monitor: the employee record model, the
//! bounded deduplicating history store, the roster diff engine, and the
//! change-log reporter.
//!
//! Everything here is synchronous and file-backed. Fetching the roster
//! and rendering it for display live in the CLI crate; this crate only
//! answers "what did we last know" and "what changed".

pub mod diff;
pub mod error;
pub mod history;
pub mod model;
pub mod report;

pub use error::{LogWriteError, StoreLoadError, StorePersistError};
pub use history::{History, Snapshot, DEFAULT_MAX_ENTRIES};
pub use model::{ChangeReport, Employee, FieldChange, ModifiedEmployee, Roster};
