//! Table-driven conversion of a raw block into a typed record.
//!
//! Each record type has a static table of [`FieldSpec`]s. A spec names the
//! field, says whether it is required, and holds the setter that coerces the
//! raw string into the record.

use crate::error::{FieldProblem, SchemaError};

use super::block::{FieldValue, RawBlock};

/// Writes one coerced field value into a record.
pub(crate) type Setter<T> = fn(&mut T, &str) -> Result<(), FieldProblem>;

/// How one named field is read.
pub(crate) struct FieldSpec<T: 'static> {
    pub name: &'static str,
    pub required: bool,
    pub set: Setter<T>,
}

/// Build a record from a block.
///
/// Keys without a spec are passed to `unknown`, which is where custom
/// variables are collected.
pub(crate) fn build_record<T: Default>(
    block: &RawBlock,
    kind: &str,
    table: &[FieldSpec<T>],
    mut unknown: impl FnMut(&mut T, &str, &FieldValue),
) -> Result<T, SchemaError> {
    let mut record = T::default();
    let schema_error = |field: &str, problem| SchemaError {
        block: kind.to_string(),
        line: block.line,
        field: field.to_string(),
        problem,
    };

    for spec in table.iter().filter(|spec| spec.required) {
        if !block.fields.contains_key(spec.name) {
            return Err(schema_error(spec.name, FieldProblem::Missing));
        }
    }

    for (key, value) in &block.fields {
        let key = key.as_str();
        match table.iter().find(|spec| spec.name == key) {
            Some(spec) => (spec.set)(&mut record, value.last()).map_err(|p| schema_error(key, p))?,
            None => unknown(&mut record, key, value),
        }
    }

    Ok(record)
}

pub(crate) fn text(value: &str) -> Result<String, FieldProblem> {
    Ok(value.to_string())
}

pub(crate) fn optional_text(value: &str) -> Result<Option<String>, FieldProblem> {
    Ok((!value.is_empty()).then(|| value.to_string()))
}

pub(crate) fn list(value: &str) -> Result<Vec<String>, FieldProblem> {
    Ok(value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect())
}

pub(crate) fn integer(value: &str) -> Result<i64, FieldProblem> {
    value
        .trim()
        .parse()
        .map_err(|_| FieldProblem::invalid("an integer", value))
}

pub(crate) fn count(value: &str) -> Result<u32, FieldProblem> {
    value
        .trim()
        .parse()
        .map_err(|_| FieldProblem::invalid("a non-negative integer", value))
}

pub(crate) fn float(value: &str) -> Result<f64, FieldProblem> {
    value
        .trim()
        .parse()
        .map_err(|_| FieldProblem::invalid("a number", value))
}

/// Nagios writes booleans as `0` and `1`.
pub(crate) fn flag(value: &str) -> Result<bool, FieldProblem> {
    match value.trim() {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(FieldProblem::invalid("0 or 1", value)),
    }
}

/// Declares an optional field whose setter stores `Some(coerce(value)?)`.
macro_rules! optional_field {
    ($name:literal, $field:ident, $coerce:path) => {
        $crate::source::fields::FieldSpec {
            name: $name,
            required: false,
            set: |record, value| {
                record.$field = Some($coerce(value)?);
                Ok(())
            },
        }
    };
}

/// Declares a field whose setter stores `coerce(value)?` directly.
macro_rules! field {
    ($name:literal, $field:ident, $coerce:path, required) => {
        $crate::source::fields::FieldSpec {
            name: $name,
            required: true,
            set: |record, value| {
                record.$field = $coerce(value)?;
                Ok(())
            },
        }
    };
    ($name:literal, $field:ident, $coerce:path) => {
        $crate::source::fields::FieldSpec {
            name: $name,
            required: false,
            set: |record, value| {
                record.$field = $coerce(value)?;
                Ok(())
            },
        }
    };
}

pub(crate) use {field, optional_field};
