//! Error types for the bridge.
//!
//! Parsing, configuration and feed building each have their own error type
//! so callers can decide which failures are fatal. The binary collapses them
//! into `anyhow::Error` at the top level.

use std::path::PathBuf;

use dashboard_api::DashboardError;
use thiserror::Error;

/// What is wrong with a field inside a recognized block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldProblem {
    #[error("is missing")]
    Missing,

    #[error("expected {expected}, got '{value}'")]
    Invalid {
        expected: &'static str,
        value: String,
    },
}

impl FieldProblem {
    pub(crate) fn invalid(expected: &'static str, value: &str) -> Self {
        FieldProblem::Invalid {
            expected,
            value: value.to_string(),
        }
    }
}

/// A required field is missing or a field value cannot be coerced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{block} block at line {line}: field '{field}' {problem}")]
pub struct SchemaError {
    pub block: String,
    pub line: usize,
    pub field: String,
    pub problem: FieldProblem,
}

/// Errors that stop a parser.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("{block} block starting at line {line} is not terminated")]
    Unterminated { block: String, line: usize },

    #[error("'{}' has no {key} entry", .path.display())]
    MissingEntry { path: PathBuf, key: &'static str },

    #[error("failed to read '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Non-fatal conditions found while parsing. Each is logged when found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseWarning {
    #[error("unrecognized '{kind}' block at line {line} skipped")]
    UnrecognizedBlock { kind: String, line: usize },

    #[error("unexpected line {line} outside of a block: '{text}'")]
    StrayLine { line: usize, text: String },
}

/// The bridge configuration is unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("{rule}: pattern for '{field}' does not compile: {source}")]
    MatchRule {
        rule: String,
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("{rule}: no feeds are configured")]
    NoFeeds { rule: String },

    #[error("{rule}: feed references unknown api key '{key}'")]
    UnknownApiKey { rule: String, key: String },

    #[error("invalid cron expression '{expr}': {reason}")]
    Schedule { expr: String, reason: String },

    #[error("batch_size must be at least 1")]
    BatchSize,

    #[error("api.keys must contain a 'default' key")]
    MissingDefaultKey,

    #[error("api key '{name}': {reason}")]
    ApiKey { name: String, reason: String },
}

/// Two feeds for the same host or service resolved to the same integration id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("duplicate feed '{integration_id}' for {entity}")]
pub struct DuplicateFeedError {
    pub entity: String,
    pub integration_id: String,
}

/// Upserting one api key's share of a batch failed.
#[derive(Debug, Error)]
#[error("upsert of {feeds} feeds with api key '{api_key}' failed: {source}")]
pub struct BatchUpsertError {
    pub api_key: String,
    pub feeds: usize,
    #[source]
    pub source: DashboardError,
}

/// Anything that stops the exposure map from being (re)built.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    DuplicateFeed(#[from] DuplicateFeedError),
}
