//! Reader for the Nagios main configuration file (`nagios.cfg`).
//!
//! Only the two entries that locate the object cache and the status snapshot
//! are read.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::ParseError;

/// Locations of the files written by Nagios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NagiosPaths {
    pub object_cache_file: PathBuf,
    pub status_file: PathBuf,
}

impl NagiosPaths {
    /// Read `object_cache_file` and `status_file` from `nagios.cfg` content.
    ///
    /// `origin` is only used in error messages.
    pub fn from_reader<R: BufRead>(reader: R, origin: &Path) -> Result<Self, ParseError> {
        let mut object_cache_file = None;
        let mut status_file = None;

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match line.split_once('=') {
                Some(("object_cache_file", value)) => {
                    object_cache_file = Some(PathBuf::from(value.trim()))
                }
                Some(("status_file", value)) => status_file = Some(PathBuf::from(value.trim())),
                _ => {}
            }
        }

        let missing = |key| ParseError::MissingEntry {
            path: origin.to_path_buf(),
            key,
        };

        Ok(Self {
            object_cache_file: object_cache_file.ok_or_else(|| missing("object_cache_file"))?,
            status_file: status_file.ok_or_else(|| missing("status_file"))?,
        })
    }

    /// Read the main configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ParseError> {
        let file = File::open(path).map_err(|source| ParseError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file), path)
    }
}
