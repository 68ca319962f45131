//! File-based status source.
//!
//! Opens the status snapshot written by Nagios at the start of every tick.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::warn;

use super::{StatusSource, StatusStream};
use crate::error::ParseError;
use crate::source::status::StatusParser;

/// A status source that reads `status.dat` from disk.
///
/// The source tracks the file's modification time and logs a warning when
/// the file has not been rewritten since the previous open, which usually
/// means Nagios has stopped updating it.
#[derive(Debug)]
pub struct StatusFile {
    path: PathBuf,
    description: String,
    last_modified: Option<SystemTime>,
}

impl StatusFile {
    /// Create a new status source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            last_modified: None,
        }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn get_modified_time(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok()?.modified().ok()
    }
}

impl StatusSource for StatusFile {
    fn open(&mut self) -> Result<StatusStream, ParseError> {
        let file = File::open(&self.path).map_err(|source| ParseError::Open {
            path: self.path.clone(),
            source,
        })?;

        let current_modified = self.get_modified_time();
        if let (Some(last), Some(current)) = (self.last_modified, current_modified) {
            if current <= last {
                warn!(
                    path = %self.path.display(),
                    "status file has not changed since the previous poll"
                );
            }
        }
        self.last_modified = current_modified;

        Ok(StatusParser::new(Box::new(BufReader::new(file))))
    }

    fn description(&self) -> &str {
        &self.description
    }
}
