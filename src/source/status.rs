//! Parser for the Nagios status snapshot (`status.dat`).
//!
//! Nagios rewrites this file every few seconds. The parser is lazy: records
//! are produced one block at a time so a poll tick can start evaluating and
//! flushing before the whole file has been read.

use std::io::BufRead;

use serde::Serialize;

use crate::error::{ParseError, ParseWarning, SchemaError};

use super::block::{BlockReader, RawBlock};
use super::codes::{
    AcknowledgementType, CheckOptions, CheckType, HostState, ServiceState, StateType,
};
use super::fields::{
    build_record, count, field, flag, integer, optional_field, optional_text, text, FieldSpec,
};
use super::objects::{HostId, ServiceId};

/// Status kinds that are valid but not used by the bridge.
const IGNORED_KINDS: &[&str] = &[
    "programstatus",
    "contactstatus",
    "hostcomment",
    "servicecomment",
    "hostdowntime",
    "servicedowntime",
];

/// The `info` block at the top of the status file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InfoStatus {
    pub created: i64,
    pub version: String,
    pub last_update_check: Option<i64>,
    pub update_available: Option<bool>,
    pub last_version: Option<String>,
    pub new_version: Option<String>,
}

/// Live state of one host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HostStatus {
    pub host_name: String,
    pub current_state: HostState,
    pub state_type: StateType,
    pub plugin_output: String,
    pub long_plugin_output: Option<String>,
    pub performance_data: Option<String>,
    pub check_command: Option<String>,
    pub has_been_checked: Option<bool>,
    pub current_attempt: Option<u32>,
    pub max_attempts: Option<u32>,
    pub last_check: Option<i64>,
    pub last_state_change: Option<i64>,
    pub last_hard_state: Option<HostState>,
    pub check_type: Option<CheckType>,
    pub check_options: Option<CheckOptions>,
    pub problem_has_been_acknowledged: Option<bool>,
    pub acknowledgement_type: Option<AcknowledgementType>,
    pub is_flapping: Option<bool>,
    pub scheduled_downtime_depth: Option<u32>,
}

impl HostStatus {
    pub fn id(&self) -> HostId {
        HostId::new(self.host_name.clone())
    }
}

/// Live state of one service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub host_name: String,
    pub service_description: String,
    pub current_state: ServiceState,
    pub state_type: StateType,
    pub plugin_output: String,
    pub long_plugin_output: Option<String>,
    pub performance_data: Option<String>,
    pub check_command: Option<String>,
    pub has_been_checked: Option<bool>,
    pub current_attempt: Option<u32>,
    pub max_attempts: Option<u32>,
    pub last_check: Option<i64>,
    pub last_state_change: Option<i64>,
    pub last_hard_state: Option<ServiceState>,
    pub check_type: Option<CheckType>,
    pub check_options: Option<CheckOptions>,
    pub problem_has_been_acknowledged: Option<bool>,
    pub acknowledgement_type: Option<AcknowledgementType>,
    pub is_flapping: Option<bool>,
    pub scheduled_downtime_depth: Option<u32>,
}

impl ServiceStatus {
    pub fn id(&self) -> ServiceId {
        ServiceId::new(&self.host_name, &self.service_description)
    }
}

static INFO_FIELDS: &[FieldSpec<InfoStatus>] = &[
    field!("created", created, integer, required),
    field!("version", version, text, required),
    optional_field!("last_update_check", last_update_check, integer),
    optional_field!("update_available", update_available, flag),
    field!("last_version", last_version, optional_text),
    field!("new_version", new_version, optional_text),
];

static HOST_STATUS_FIELDS: &[FieldSpec<HostStatus>] = &[
    field!("host_name", host_name, text, required),
    field!("current_state", current_state, HostState::from_code, required),
    field!("state_type", state_type, StateType::from_code, required),
    field!("plugin_output", plugin_output, text),
    field!("long_plugin_output", long_plugin_output, optional_text),
    field!("performance_data", performance_data, optional_text),
    field!("check_command", check_command, optional_text),
    optional_field!("has_been_checked", has_been_checked, flag),
    optional_field!("current_attempt", current_attempt, count),
    optional_field!("max_attempts", max_attempts, count),
    optional_field!("last_check", last_check, integer),
    optional_field!("last_state_change", last_state_change, integer),
    optional_field!("last_hard_state", last_hard_state, HostState::from_code),
    optional_field!("check_type", check_type, CheckType::from_code),
    optional_field!("check_options", check_options, CheckOptions::from_code),
    optional_field!("problem_has_been_acknowledged", problem_has_been_acknowledged, flag),
    optional_field!("acknowledgement_type", acknowledgement_type, AcknowledgementType::from_code),
    optional_field!("is_flapping", is_flapping, flag),
    optional_field!("scheduled_downtime_depth", scheduled_downtime_depth, count),
];

static SERVICE_STATUS_FIELDS: &[FieldSpec<ServiceStatus>] = &[
    field!("host_name", host_name, text, required),
    field!("service_description", service_description, text, required),
    field!("current_state", current_state, ServiceState::from_code, required),
    field!("state_type", state_type, StateType::from_code, required),
    field!("plugin_output", plugin_output, text),
    field!("long_plugin_output", long_plugin_output, optional_text),
    field!("performance_data", performance_data, optional_text),
    field!("check_command", check_command, optional_text),
    optional_field!("has_been_checked", has_been_checked, flag),
    optional_field!("current_attempt", current_attempt, count),
    optional_field!("max_attempts", max_attempts, count),
    optional_field!("last_check", last_check, integer),
    optional_field!("last_state_change", last_state_change, integer),
    optional_field!("last_hard_state", last_hard_state, ServiceState::from_code),
    optional_field!("check_type", check_type, CheckType::from_code),
    optional_field!("check_options", check_options, CheckOptions::from_code),
    optional_field!("problem_has_been_acknowledged", problem_has_been_acknowledged, flag),
    optional_field!("acknowledgement_type", acknowledgement_type, AcknowledgementType::from_code),
    optional_field!("is_flapping", is_flapping, flag),
    optional_field!("scheduled_downtime_depth", scheduled_downtime_depth, count),
];

/// A recognized status block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusRecord {
    Info(InfoStatus),
    Host(HostStatus),
    Service(ServiceStatus),
}

/// Streams status records out of a status snapshot.
///
/// The sequence ends after the first error.
#[derive(Debug)]
pub struct StatusParser<R> {
    blocks: BlockReader<R>,
    failed: bool,
}

impl<R: BufRead> StatusParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            blocks: BlockReader::new(reader, '='),
            failed: false,
        }
    }

    /// Warnings collected so far.
    pub fn warnings(&self) -> &[ParseWarning] {
        self.blocks.warnings()
    }

    fn parse_block(&mut self, block: RawBlock) -> Option<Result<StatusRecord, ParseError>> {
        let record = match block.header.as_str() {
            "info" => {
                build_record(&block, "info", INFO_FIELDS, |_, _, _| {}).map(StatusRecord::Info)
            }
            "hoststatus" => build_record(&block, "hoststatus", HOST_STATUS_FIELDS, |_, _, _| {})
                .map(StatusRecord::Host),
            "servicestatus" => {
                build_record(&block, "servicestatus", SERVICE_STATUS_FIELDS, |_, _, _| {})
                    .map(StatusRecord::Service)
            }
            kind if IGNORED_KINDS.contains(&kind) => return None,
            _ => {
                self.blocks.warn(ParseWarning::UnrecognizedBlock {
                    kind: block.header.clone(),
                    line: block.line,
                });
                return None;
            }
        };

        if !block.terminated {
            return Some(Err(ParseError::Unterminated {
                block: block.header,
                line: block.line,
            }));
        }

        Some(record.map_err(|e: SchemaError| e.into()))
    }
}

impl<R: BufRead> Iterator for StatusParser<R> {
    type Item = Result<StatusRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let result = match self.blocks.next()? {
                Ok(block) => self.parse_block(block),
                Err(e) => Some(Err(e)),
            };

            match result {
                Some(Err(e)) => {
                    self.failed = true;
                    return Some(Err(e));
                }
                Some(ok) => return Some(ok),
                None => continue,
            }
        }
    }
}
