//! Readers for the files Nagios writes.
//!
//! ```text
//! nagios.cfg ──▶ NagiosPaths ──┬──▶ objects.cache ──▶ ObjectCacheParser ──▶ NagiosObjects
//!                              │                         (once per load)
//!                              └──▶ status.dat ─────▶ StatusParser ──────▶ StatusRecord*
//!                                                        (every tick)
//! ```
//!
//! Both data files share one block syntax, handled by [`BlockReader`]. The
//! typed parsers turn blocks into records with a per-kind field table.

mod block;
mod codes;
pub(crate) mod fields;
mod file;
mod main_config;
mod objects;
mod status;

pub use block::{BlockReader, FieldMap, FieldValue, RawBlock};
pub use codes::{AcknowledgementType, CheckOptions, CheckType, HostState, ServiceState, StateType};
pub use file::StatusFile;
pub use main_config::NagiosPaths;
pub use objects::{
    CustomVariables, HostId, HostRecord, NagiosObjects, ObjectCacheParser, ObjectRecord, ServiceId,
    ServiceRecord,
};
pub use status::{HostStatus, InfoStatus, ServiceStatus, StatusParser, StatusRecord};

use std::fmt::Debug;
use std::io::BufRead;

use crate::error::ParseError;

/// A status stream over any buffered reader.
pub type StatusStream = StatusParser<Box<dyn BufRead + Send>>;

/// Trait for opening the live status snapshot.
///
/// Each call to [`open`](StatusSource::open) starts a fresh read of the
/// current snapshot.
pub trait StatusSource: Send + Debug {
    /// Open the snapshot and return a lazy record stream.
    fn open(&mut self) -> Result<StatusStream, ParseError>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}
