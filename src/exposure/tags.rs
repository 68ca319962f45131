//! Feed tags from `_NMTAG_` custom variables.

use std::collections::BTreeMap;

use crate::data::Tags;
use crate::source::{CustomVariables, FieldValue};

use super::interpolate::{interpolate, InterpolationFields};

/// Custom variables with this prefix are forwarded as tags.
pub const TAG_PREFIX: &str = "_NMTAG_";

/// Extract tags from custom variables, stripping the prefix once.
pub fn extract_tags(custom_variables: &CustomVariables) -> Tags {
    custom_variables
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(TAG_PREFIX)
                .map(|name| (name.to_string(), value.clone()))
        })
        .collect()
}

/// Merge custom-variable tags with a rule's tag templates. Rule tags win.
pub fn merge_tags(
    custom_variables: &CustomVariables,
    rule_tags: &BTreeMap<String, String>,
    fields: &InterpolationFields,
) -> Tags {
    let mut tags = extract_tags(custom_variables);
    for (name, template) in rule_tags {
        tags.insert(name.clone(), FieldValue::One(interpolate(template, fields)));
    }
    tags
}
