//! Template interpolation.
//!
//! Two placeholder forms are supported:
//!
//! - `{{ field }}` is replaced with a value from the interpolation fields.
//!   Unknown fields become an empty string. A placeholder preceded by a
//!   backslash is left alone, and `\{{` / `\}}` are unescaped afterwards.
//! - `{! VAR !}` is replaced with the environment variable `VAR`. It is only
//!   applied to credentials, at the moment they are used.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

/// Field name to value.
pub type InterpolationFields = BTreeMap<String, String>;

static FIELD_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\\)?\{\{\s*(\w+)\s*\}\}").expect("field placeholder pattern is valid")
});

static ENV_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\\)?\{!\s*(\w+)\s*!\}").expect("env placeholder pattern is valid")
});

fn replace_unescaped(
    pattern: &Regex,
    template: &str,
    mut lookup: impl FnMut(&str) -> String,
) -> String {
    pattern
        .replace_all(template, |caps: &Captures| {
            if caps.get(1).is_some() {
                caps[0].to_string()
            } else {
                lookup(&caps[2])
            }
        })
        .into_owned()
}

/// Replace `{{ field }}` placeholders.
pub fn interpolate(template: &str, fields: &InterpolationFields) -> String {
    let replaced = replace_unescaped(&FIELD_PLACEHOLDER, template, |name| match fields.get(name) {
        Some(value) => value.clone(),
        None => {
            debug!(field = name, template, "interpolation field not found");
            String::new()
        }
    });
    unescape(&replaced)
}

/// Turn `\{{` and `\}}` back into `{{` and `}}`.
pub fn unescape(text: &str) -> String {
    text.replace(r"\{{", "{{").replace(r"\}}", "}}")
}

/// Replace `{! VAR !}` placeholders from the process environment.
pub fn interpolate_env(template: &str) -> String {
    interpolate_env_with(template, |name| std::env::var(name).ok())
}

/// Replace `{! VAR !}` placeholders using `lookup`. Unset variables become
/// an empty string.
pub fn interpolate_env_with(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    replace_unescaped(&ENV_PLACEHOLDER, template, |name| {
        lookup(name).unwrap_or_else(|| {
            debug!(variable = name, "environment variable not set");
            String::new()
        })
    })
}
