//! Bridge configuration.
//!
//! The configuration is a TOML file, overridable from the environment with
//! the `NAGIOS_BRIDGE__` prefix (`NAGIOS_BRIDGE__BATCH_SIZE=50`). It is read
//! into raw serde structs and then validated into a [`BridgeConfig`]: regexes
//! compiled, the cron expression parsed, credentials and api key references
//! checked.
//!
//! ```toml
//! nagios_config_file_path = "/usr/local/nagios/etc/nagios.cfg"
//! poll_cron = "*/1 * * * *"
//! batch_size = 25
//!
//! [api]
//! upsert_endpoint = "https://dashboard.example.com/api/feeds"
//! jwt_key_refresh_endpoint = "https://dashboard.example.com/api/token"
//!
//! [api.keys.default]
//! type = "jwt"
//! secret_key = "{! DASHBOARD_SECRET !}"
//! uuid = "{! DASHBOARD_UUID !}"
//!
//! [[exposures.services]]
//! match = { service_description = '^HTTP port (?<port>\d+)$' }
//! feeds.transparent = { organisation = { id = 1 }, page = { id = 2 }, space = { id = 3 }, name = "{{ host_name }}:{{ port }}" }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::{Config, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::exposure::{ExposureRules, FeedTemplate, HostRule, MatchField, MatchRule, ServiceRule};
use crate::poll::PollSchedule;

/// Name of the api key every feed uses unless it says otherwise.
pub const DEFAULT_API_KEY: &str = "default";

const ENV_PREFIX: &str = "NAGIOS_BRIDGE";

fn default_nagios_config_file_path() -> PathBuf {
    PathBuf::from("/usr/local/nagios/etc/nagios.cfg")
}

fn default_batch_size() -> usize {
    25
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_api_key() -> String {
    DEFAULT_API_KEY.to_string()
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default = "default_nagios_config_file_path")]
    nagios_config_file_path: PathBuf,
    poll_cron: String,
    #[serde(default = "default_batch_size")]
    batch_size: usize,
    api: RawApi,
    #[serde(default)]
    exposures: RawExposures,
}

#[derive(Debug, Deserialize)]
struct RawApi {
    upsert_endpoint: String,
    jwt_key_refresh_endpoint: String,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default)]
    keys: BTreeMap<String, RawApiKey>,
}

#[derive(Debug, Deserialize)]
struct RawApiKey {
    #[serde(rename = "type")]
    kind: String,
    secret: Option<String>,
    secret_key: Option<String>,
    access_token: Option<String>,
    uuid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawExposures {
    #[serde(default)]
    hosts: Vec<RawHostRule>,
    #[serde(default)]
    services: Vec<RawServiceRule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawServiceMatch {
    host_name: Option<String>,
    service_description: Option<String>,
    check_command: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHostMatch {
    host_name: Option<String>,
    address: Option<String>,
    check_command: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawServiceRule {
    #[serde(rename = "match", default)]
    matcher: RawServiceMatch,
    #[serde(default)]
    feeds: RawServiceFeeds,
}

#[derive(Debug, Deserialize)]
struct RawHostRule {
    #[serde(rename = "match", default)]
    matcher: RawHostMatch,
    #[serde(default)]
    feeds: RawHostFeeds,
}

#[derive(Debug, Default, Deserialize)]
struct RawServiceFeeds {
    transparent: Option<RawFeedTemplate>,
    diagnostic: Option<RawDiagnosticFeeds>,
    plugin: Option<RawPluginFeeds>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDiagnosticFeeds {
    is_running: Option<RawFeedTemplate>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPluginFeeds {
    ping: Option<RawFeedTemplate>,
}

#[derive(Debug, Default, Deserialize)]
struct RawHostFeeds {
    status: Option<RawFeedTemplate>,
}

#[derive(Debug, Deserialize)]
struct RawId {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RawFeedTemplate {
    organisation: RawId,
    page: RawId,
    space: RawId,
    name: String,
    description: Option<String>,
    #[serde(default = "default_api_key")]
    api_key: String,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

/// Credential templates of one api key. `{! VAR !}` placeholders are
/// resolved when a token is requested, not at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyConfig {
    pub secret_key: String,
    pub uuid: String,
}

/// Dashboard API settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub upsert_endpoint: String,
    pub jwt_key_refresh_endpoint: String,
    pub request_timeout: Duration,
    pub keys: BTreeMap<String, ApiKeyConfig>,
}

/// Validated bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub nagios_config_file_path: PathBuf,
    pub poll_schedule: PollSchedule,
    pub batch_size: usize,
    pub api: ApiConfig,
    pub rules: ExposureRules,
}

impl BridgeConfig {
    /// Load and validate the configuration file at `path`, with environment
    /// overrides applied on top.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_raw(config.try_deserialize()?)
    }

    /// Load and validate configuration from TOML text, without environment
    /// overrides.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?;

        Self::from_raw(config.try_deserialize()?)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        if raw.batch_size == 0 {
            return Err(ConfigError::BatchSize);
        }

        let poll_schedule = PollSchedule::parse(&raw.poll_cron)?;
        let api = compile_api(raw.api)?;
        let rules = compile_rules(raw.exposures, &api.keys)?;

        Ok(Self {
            nagios_config_file_path: raw.nagios_config_file_path,
            poll_schedule,
            batch_size: raw.batch_size,
            api,
            rules,
        })
    }
}

fn compile_api(raw: RawApi) -> Result<ApiConfig, ConfigError> {
    let mut keys = BTreeMap::new();
    for (name, key) in raw.keys {
        let compiled = compile_api_key(&name, key)?;
        keys.insert(name, compiled);
    }

    if !keys.contains_key(DEFAULT_API_KEY) {
        return Err(ConfigError::MissingDefaultKey);
    }

    Ok(ApiConfig {
        upsert_endpoint: raw.upsert_endpoint,
        jwt_key_refresh_endpoint: raw.jwt_key_refresh_endpoint,
        request_timeout: Duration::from_secs(raw.request_timeout_secs),
        keys,
    })
}

fn compile_api_key(name: &str, raw: RawApiKey) -> Result<ApiKeyConfig, ConfigError> {
    let invalid = |reason: String| ConfigError::ApiKey {
        name: name.to_string(),
        reason,
    };

    if raw.kind != "jwt" {
        return Err(invalid(format!("unsupported key type '{}'", raw.kind)));
    }

    let secret_key =
        exactly_one(raw.secret, raw.secret_key, "secret", "secret_key").map_err(invalid)?;
    let uuid = exactly_one(raw.access_token, raw.uuid, "access_token", "uuid").map_err(invalid)?;

    Ok(ApiKeyConfig { secret_key, uuid })
}

fn exactly_one(
    first: Option<String>,
    second: Option<String>,
    first_name: &str,
    second_name: &str,
) -> Result<String, String> {
    match (first, second) {
        (Some(value), None) | (None, Some(value)) => Ok(value),
        (Some(_), Some(_)) => Err(format!("both '{first_name}' and '{second_name}' are set")),
        (None, None) => Err(format!("one of '{first_name}' or '{second_name}' is required")),
    }
}

fn compile_pattern(
    label: &str,
    field: MatchField,
    pattern: Option<String>,
) -> Result<Option<(MatchField, Regex)>, ConfigError> {
    let Some(pattern) = pattern else {
        return Ok(None);
    };
    let regex = Regex::new(&pattern).map_err(|source| ConfigError::MatchRule {
        rule: label.to_string(),
        field: field.as_str(),
        source,
    })?;
    Ok(Some((field, regex)))
}

fn compile_template(
    label: &str,
    raw: RawFeedTemplate,
    default_description: &str,
    keys: &BTreeMap<String, ApiKeyConfig>,
) -> Result<FeedTemplate, ConfigError> {
    if !keys.contains_key(&raw.api_key) {
        return Err(ConfigError::UnknownApiKey {
            rule: label.to_string(),
            key: raw.api_key,
        });
    }

    Ok(FeedTemplate {
        api_key: raw.api_key,
        organisation_id: raw.organisation.id,
        page_id: raw.page.id,
        space_id: raw.space.id,
        name: raw.name,
        description: raw
            .description
            .unwrap_or_else(|| default_description.to_string()),
        tags: raw.tags,
    })
}

const SERVICE_DESCRIPTION: &str = "{{ service_description }}";
const HOST_DESCRIPTION: &str = "'{{ check_command }}' for '{{ host_name }}'";

fn compile_rules(
    raw: RawExposures,
    keys: &BTreeMap<String, ApiKeyConfig>,
) -> Result<ExposureRules, ConfigError> {
    let mut rules = ExposureRules::default();

    for (index, rule) in raw.hosts.into_iter().enumerate() {
        let label = format!("exposures.hosts[{index}]");
        let patterns = [
            compile_pattern(&label, MatchField::HostName, rule.matcher.host_name)?,
            compile_pattern(&label, MatchField::Address, rule.matcher.address)?,
            compile_pattern(&label, MatchField::CheckCommand, rule.matcher.check_command)?,
        ];

        let Some(status) = rule.feeds.status else {
            return Err(ConfigError::NoFeeds { rule: label });
        };
        let status = compile_template(&label, status, HOST_DESCRIPTION, keys)?;

        rules.hosts.push(HostRule {
            matcher: MatchRule::new(patterns.into_iter().flatten()),
            status: Some(status),
            label,
        });
    }

    for (index, rule) in raw.services.into_iter().enumerate() {
        let label = format!("exposures.services[{index}]");
        let patterns = [
            compile_pattern(&label, MatchField::HostName, rule.matcher.host_name)?,
            compile_pattern(
                &label,
                MatchField::ServiceDescription,
                rule.matcher.service_description,
            )?,
            compile_pattern(&label, MatchField::CheckCommand, rule.matcher.check_command)?,
        ];

        let feeds = rule.feeds;
        let transparent = feeds.transparent;
        let is_running = feeds.diagnostic.and_then(|d| d.is_running);
        let ping = feeds.plugin.and_then(|p| p.ping);
        if transparent.is_none() && is_running.is_none() && ping.is_none() {
            return Err(ConfigError::NoFeeds { rule: label });
        }

        let compile = |template: Option<RawFeedTemplate>| {
            template
                .map(|t| compile_template(&label, t, SERVICE_DESCRIPTION, keys))
                .transpose()
        };

        let rule = ServiceRule {
            matcher: MatchRule::new(patterns.into_iter().flatten()),
            transparent: compile(transparent)?,
            is_running: compile(is_running)?,
            ping: compile(ping)?,
            label: label.clone(),
        };
        rules.services.push(rule);
    }

    Ok(rules)
}
