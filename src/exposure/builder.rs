//! Feed builder: exposure rules plus object records to feed definitions.

use tracing::debug;

use crate::data::{CustomData, Feed, FeedKind};
use crate::error::DuplicateFeedError;
use crate::source::{CustomVariables, HostRecord, NagiosObjects, ServiceRecord};

use super::interpolate::{interpolate, InterpolationFields};
use super::matcher::{matches, Captures};
use super::rule::{ExposureRules, FeedTemplate};
use super::tags::merge_tags;
use super::UnlinkedExposures;

/// Fields available to service templates. Captures override defaults.
pub fn service_fields(service: &ServiceRecord, captures: Captures) -> InterpolationFields {
    let mut fields = InterpolationFields::new();
    fields.insert("host_name".to_string(), service.host_name.clone());
    fields.insert(
        "service_description".to_string(),
        service.service_description.clone(),
    );
    fields.insert("display_name".to_string(), service.display_name.clone());
    if let Some(check_command) = &service.check_command {
        fields.insert("check_command".to_string(), check_command.clone());
    }
    fields.extend(captures);
    fields
}

/// Fields available to host templates. Captures override defaults.
pub fn host_fields(host: &HostRecord, captures: Captures) -> InterpolationFields {
    let mut fields = InterpolationFields::new();
    fields.insert("host_name".to_string(), host.host_name.clone());
    fields.insert("display_name".to_string(), host.display_name.clone());
    if let Some(address) = &host.address {
        fields.insert("address".to_string(), address.clone());
    }
    if let Some(check_command) = &host.check_command {
        fields.insert("check_command".to_string(), check_command.clone());
    }
    fields.extend(captures);
    fields
}

fn build_feed(
    kind: FeedKind,
    template: &FeedTemplate,
    entity: &str,
    custom_variables: &CustomVariables,
    fields: &InterpolationFields,
) -> Feed {
    Feed {
        kind,
        integration_id: kind.integration_id(template.page_id, template.space_id, entity),
        api_key_name: template.api_key.clone(),
        name: interpolate(&template.name, fields),
        description: interpolate(&template.description, fields),
        organisation_id: template.organisation_id,
        page_id: template.page_id,
        space_id: template.space_id,
        custom_data: CustomData {
            tags: merge_tags(custom_variables, &template.tags, fields),
        },
        dependencies: Vec::new(),
    }
}

/// Build every feed the rules expose for the given objects.
///
/// Rules are applied in configuration order and records in identity order,
/// so the same inputs always produce the same map.
pub fn build_exposures(
    rules: &ExposureRules,
    objects: &NagiosObjects,
) -> Result<UnlinkedExposures, DuplicateFeedError> {
    let mut exposures = UnlinkedExposures::default();

    for rule in &rules.hosts {
        let Some(template) = &rule.status else {
            continue;
        };

        for (id, host) in &objects.hosts {
            let Some(captures) = matches(host, &rule.matcher) else {
                continue;
            };
            debug!(rule = %rule.label, host = %id, ?captures, "host matched");

            let fields = host_fields(host, captures);
            let feed = build_feed(
                FeedKind::HostStatus,
                template,
                id.as_str(),
                &host.custom_variables,
                &fields,
            );
            exposures.add_host_feed(id.clone(), feed)?;
        }
    }

    for rule in &rules.services {
        let templates = [
            (FeedKind::ServiceTransparent, &rule.transparent),
            (FeedKind::ServiceIsRunning, &rule.is_running),
            (FeedKind::ServicePing, &rule.ping),
        ];

        for (id, service) in &objects.services {
            let Some(captures) = matches(service, &rule.matcher) else {
                continue;
            };
            debug!(rule = %rule.label, service = %id, ?captures, "service matched");

            let fields = service_fields(service, captures);
            let entity = id.to_string();
            for (kind, template) in &templates {
                let Some(template) = template else {
                    continue;
                };
                let feed = build_feed(*kind, template, &entity, &service.custom_variables, &fields);
                exposures.add_service_feed(id.clone(), feed)?;
            }
        }
    }

    Ok(exposures)
}
