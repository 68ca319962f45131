//! Parser for the Nagios object cache (`objects.cache`).
//!
//! The object cache is written by Nagios on startup and lists every object
//! definition after template inheritance has been resolved. Only host and
//! service definitions are kept; other known kinds are skipped silently and
//! unknown kinds are skipped with a warning.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ParseError, ParseWarning};

use super::block::{BlockReader, FieldValue, RawBlock};
use super::fields::{
    build_record, count, field, flag, float, integer, list, optional_field, optional_text, text,
    FieldSpec,
};

/// Object kinds that are valid but not used by the bridge.
const IGNORED_KINDS: &[&str] = &[
    "timeperiod",
    "command",
    "contact",
    "contactgroup",
    "hostgroup",
    "servicegroup",
    "hostdependency",
    "servicedependency",
    "hostescalation",
    "serviceescalation",
];

/// Unique identity of a host: its host name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostId(String);

impl HostId {
    pub fn new(host_name: impl Into<String>) -> Self {
        HostId(host_name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identity of a service, displayed as `service_description@host_name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceId {
    host_name: String,
    service_description: String,
}

impl ServiceId {
    pub fn new(host_name: &str, service_description: &str) -> Self {
        ServiceId {
            host_name: host_name.to_string(),
            service_description: service_description.to_string(),
        }
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn service_description(&self) -> &str {
        &self.service_description
    }

    /// The host the service runs on.
    pub fn host_id(&self) -> HostId {
        HostId::new(self.host_name.clone())
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.service_description, self.host_name)
    }
}

/// Custom variables (`_NAME value`) of an object, keyed with the underscore.
pub type CustomVariables = BTreeMap<String, FieldValue>;

/// A host definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HostRecord {
    pub host_name: String,
    /// Defaults to the host name.
    pub display_name: String,
    pub alias: Option<String>,
    pub address: Option<String>,
    pub check_command: Option<String>,
    pub check_period: Option<String>,
    pub notification_period: Option<String>,
    pub parents: Vec<String>,
    pub contacts: Vec<String>,
    pub contact_groups: Vec<String>,
    pub importance: Option<i64>,
    pub check_interval: Option<f64>,
    pub retry_interval: Option<f64>,
    pub max_check_attempts: Option<u32>,
    pub active_checks_enabled: Option<bool>,
    pub passive_checks_enabled: Option<bool>,
    pub notifications_enabled: Option<bool>,
    pub notes: Option<String>,
    pub notes_url: Option<String>,
    pub action_url: Option<String>,
    pub custom_variables: CustomVariables,
}

impl HostRecord {
    pub fn id(&self) -> HostId {
        HostId::new(self.host_name.clone())
    }
}

/// A service definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceRecord {
    pub host_name: String,
    pub service_description: String,
    /// Defaults to the service description.
    pub display_name: String,
    pub check_command: Option<String>,
    pub check_period: Option<String>,
    pub notification_period: Option<String>,
    pub contacts: Vec<String>,
    pub contact_groups: Vec<String>,
    pub importance: Option<i64>,
    pub check_interval: Option<f64>,
    pub retry_interval: Option<f64>,
    pub max_check_attempts: Option<u32>,
    pub active_checks_enabled: Option<bool>,
    pub passive_checks_enabled: Option<bool>,
    pub notifications_enabled: Option<bool>,
    pub is_volatile: Option<bool>,
    pub notes: Option<String>,
    pub notes_url: Option<String>,
    pub action_url: Option<String>,
    pub custom_variables: CustomVariables,
}

impl ServiceRecord {
    pub fn id(&self) -> ServiceId {
        ServiceId::new(&self.host_name, &self.service_description)
    }
}

static HOST_FIELDS: &[FieldSpec<HostRecord>] = &[
    field!("host_name", host_name, text, required),
    field!("display_name", display_name, text),
    optional_field!("alias", alias, text),
    field!("address", address, optional_text),
    field!("check_command", check_command, optional_text),
    field!("check_period", check_period, optional_text),
    field!("notification_period", notification_period, optional_text),
    field!("parents", parents, list),
    field!("contacts", contacts, list),
    field!("contact_groups", contact_groups, list),
    optional_field!("importance", importance, integer),
    optional_field!("check_interval", check_interval, float),
    optional_field!("retry_interval", retry_interval, float),
    optional_field!("max_check_attempts", max_check_attempts, count),
    optional_field!("active_checks_enabled", active_checks_enabled, flag),
    optional_field!("passive_checks_enabled", passive_checks_enabled, flag),
    optional_field!("notifications_enabled", notifications_enabled, flag),
    field!("notes", notes, optional_text),
    field!("notes_url", notes_url, optional_text),
    field!("action_url", action_url, optional_text),
];

static SERVICE_FIELDS: &[FieldSpec<ServiceRecord>] = &[
    field!("host_name", host_name, text, required),
    field!("service_description", service_description, text, required),
    field!("display_name", display_name, text),
    field!("check_command", check_command, optional_text),
    field!("check_period", check_period, optional_text),
    field!("notification_period", notification_period, optional_text),
    field!("contacts", contacts, list),
    field!("contact_groups", contact_groups, list),
    optional_field!("importance", importance, integer),
    optional_field!("check_interval", check_interval, float),
    optional_field!("retry_interval", retry_interval, float),
    optional_field!("max_check_attempts", max_check_attempts, count),
    optional_field!("active_checks_enabled", active_checks_enabled, flag),
    optional_field!("passive_checks_enabled", passive_checks_enabled, flag),
    optional_field!("notifications_enabled", notifications_enabled, flag),
    optional_field!("is_volatile", is_volatile, flag),
    field!("notes", notes, optional_text),
    field!("notes_url", notes_url, optional_text),
    field!("action_url", action_url, optional_text),
];

fn collect_custom_variable(custom: &mut CustomVariables, key: &str, value: &FieldValue) {
    if key.starts_with('_') {
        custom.insert(key.to_string(), value.clone());
    }
}

/// A recognized object definition.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectRecord {
    Host(HostRecord),
    Service(ServiceRecord),
}

/// Streams host and service records out of an object cache.
///
/// The sequence ends after the first error.
#[derive(Debug)]
pub struct ObjectCacheParser<R> {
    blocks: BlockReader<R>,
    failed: bool,
}

impl<R: BufRead> ObjectCacheParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            blocks: BlockReader::new(reader, '\t'),
            failed: false,
        }
    }

    /// Warnings collected so far.
    pub fn warnings(&self) -> &[ParseWarning] {
        self.blocks.warnings()
    }

    fn parse_block(&mut self, block: RawBlock) -> Option<Result<ObjectRecord, ParseError>> {
        let kind = block.header.strip_prefix("define").map(str::trim);

        let record = match kind {
            Some("host") => parse_host(&block).map(ObjectRecord::Host),
            Some("service") => parse_service(&block).map(ObjectRecord::Service),
            Some(kind) if IGNORED_KINDS.contains(&kind) => return None,
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

        Some(record.map_err(ParseError::from))
    }
}

fn parse_host(block: &RawBlock) -> Result<HostRecord, crate::error::SchemaError> {
    let mut host = build_record(block, "host", HOST_FIELDS, |host: &mut HostRecord, key, value| {
        collect_custom_variable(&mut host.custom_variables, key, value)
    })?;
    if host.display_name.is_empty() {
        host.display_name = host.host_name.clone();
    }
    Ok(host)
}

fn parse_service(block: &RawBlock) -> Result<ServiceRecord, crate::error::SchemaError> {
    let mut service = build_record(
        block,
        "service",
        SERVICE_FIELDS,
        |service: &mut ServiceRecord, key, value| {
            collect_custom_variable(&mut service.custom_variables, key, value)
        },
    )?;
    if service.display_name.is_empty() {
        service.display_name = service.service_description.clone();
    }
    Ok(service)
}

impl<R: BufRead> Iterator for ObjectCacheParser<R> {
    type Item = Result<ObjectRecord, ParseError>;

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

/// All hosts and services from one object cache, keyed by identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NagiosObjects {
    pub hosts: BTreeMap<HostId, HostRecord>,
    pub services: BTreeMap<ServiceId, ServiceRecord>,
}

impl NagiosObjects {
    /// Read every record from a reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ParseError> {
        let mut objects = NagiosObjects::default();

        for record in ObjectCacheParser::new(reader) {
            match record? {
                ObjectRecord::Host(host) => {
                    if let Some(previous) = objects.hosts.insert(host.id(), host) {
                        warn!(
                            host = %previous.host_name,
                            "host defined twice, keeping the later definition"
                        );
                    }
                }
                ObjectRecord::Service(service) => {
                    if let Some(previous) = objects.services.insert(service.id(), service) {
                        warn!(
                            service = %previous.id(),
                            "service defined twice, keeping the later definition"
                        );
                    }
                }
            }
        }

        debug!(
            hosts = objects.hosts.len(),
            services = objects.services.len(),
            "object cache parsed"
        );
        Ok(objects)
    }

    /// Read the object cache at `path`.
    pub fn load(path: &Path) -> Result<Self, ParseError> {
        let file = File::open(path).map_err(|source| ParseError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }
}
