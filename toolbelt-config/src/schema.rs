//! Declarative shape and type validation for configuration mappings.
//!
//! A [`Schema`] only confirms structure. It produces a [`Validated`] mapping
//! (unknown keys dropped or rejected, defaults filled in); turning that into
//! a typed value is a separate step, see [`Validated::construct`].

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

const ROOT_PATH: &str = "<root>";

/// Accepted shape of a single value.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    /// Any value, including null.
    Any,
    /// A string.
    String,
    /// A whole number.
    Integer,
    /// Any number.
    Float,
    /// `true` or `false`.
    Boolean,
    /// A mapping with arbitrary contents.
    Mapping,
    /// A mapping whose values all have the given kind.
    MapOf(Box<FieldKind>),
    /// A sequence whose items all have the given kind.
    SequenceOf(Box<FieldKind>),
    /// A mapping validated by its own schema.
    Nested(Schema),
}

impl FieldKind {
    /// Shorthand for [`FieldKind::MapOf`].
    #[must_use]
    pub fn map_of(values: FieldKind) -> Self {
        Self::MapOf(Box::new(values))
    }

    /// Shorthand for [`FieldKind::SequenceOf`].
    #[must_use]
    pub fn sequence_of(items: FieldKind) -> Self {
        Self::SequenceOf(Box::new(items))
    }

    fn expected(&self) -> &'static str {
        match self {
            Self::Any => "any value",
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Float => "a number",
            Self::Boolean => "a boolean",
            Self::Mapping | Self::MapOf(_) | Self::Nested(_) => "a mapping",
            Self::SequenceOf(_) => "a sequence",
        }
    }
}

/// What to do with keys the schema does not declare.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum UnknownFields {
    /// Report every undeclared key as an error.
    #[default]
    Reject,
    /// Drop undeclared keys from the validated output.
    Ignore,
}

#[derive(Clone, Debug, PartialEq)]
struct Field {
    name: String,
    kind: FieldKind,
    required: bool,
    default: Option<Value>,
}

/// Declarative description of a configuration mapping.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
    unknown: UnknownFields,
}

impl Schema {
    /// Creates an empty schema that rejects unknown keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Silently drops keys the schema does not declare.
    #[must_use]
    pub fn ignore_unknown(mut self) -> Self {
        self.unknown = UnknownFields::Ignore;
        self
    }

    /// Declares a field that must be present.
    #[must_use]
    pub fn required(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.field(name.into(), kind, true, None)
    }

    /// Declares a field that may be omitted.
    #[must_use]
    pub fn optional(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.field(name.into(), kind, false, None)
    }

    /// Declares a field that takes `default` when omitted.
    #[must_use]
    pub fn with_default(self, name: impl Into<String>, kind: FieldKind, default: Value) -> Self {
        self.field(name.into(), kind, false, Some(default))
    }

    fn field(mut self, name: String, kind: FieldKind, required: bool, default: Option<Value>) -> Self {
        self.fields.retain(|field| field.name != name);
        self.fields.push(Field {
            name,
            kind,
            required,
            default,
        });
        self
    }

    /// Validates `value` against the schema.
    ///
    /// # Errors
    ///
    /// Returns every violation found, keyed by dot-separated field path.
    pub fn validate(&self, value: &Value) -> Result<Validated, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let Some(map) = value.as_object() else {
            errors.push(
                ROOT_PATH,
                format!("expected a mapping, found {}", describe(value)),
            );
            return Err(errors);
        };

        let validated = self.validate_map("", map, &mut errors);
        if errors.is_empty() {
            Ok(Validated(validated))
        } else {
            Err(errors)
        }
    }

    fn validate_map(
        &self,
        prefix: &str,
        map: &Map<String, Value>,
        errors: &mut ValidationErrors,
    ) -> Map<String, Value> {
        let mut out = Map::new();

        for field in &self.fields {
            let path = join(prefix, &field.name);
            match map.get(&field.name) {
                None => {
                    if field.required {
                        errors.push(&path, "missing required field");
                    } else if let Some(default) = &field.default {
                        out.insert(field.name.clone(), default.clone());
                    }
                }
                Some(Value::Null) if field.kind != FieldKind::Any => {
                    errors.push(&path, "field may not be null");
                }
                Some(value) => {
                    if let Some(checked) = check(&path, &field.kind, value, errors) {
                        out.insert(field.name.clone(), checked);
                    }
                }
            }
        }

        if self.unknown == UnknownFields::Reject {
            for key in map.keys() {
                if !self.fields.iter().any(|field| &field.name == key) {
                    errors.push(&join(prefix, key), "unknown field");
                }
            }
        }

        out
    }
}

fn check(path: &str, kind: &FieldKind, value: &Value, errors: &mut ValidationErrors) -> Option<Value> {
    let matches = match kind {
        FieldKind::Any => true,
        FieldKind::String => value.is_string(),
        FieldKind::Integer => value.is_i64() || value.is_u64(),
        FieldKind::Float => value.is_number(),
        FieldKind::Boolean => value.is_boolean(),
        FieldKind::Mapping | FieldKind::MapOf(_) | FieldKind::Nested(_) => value.is_object(),
        FieldKind::SequenceOf(_) => value.is_array(),
    };
    if !matches {
        errors.push(
            path,
            format!("expected {}, found {}", kind.expected(), describe(value)),
        );
        return None;
    }

    match (kind, value) {
        (FieldKind::MapOf(inner), Value::Object(map)) => {
            let mut out = Map::new();
            for (key, item) in map {
                if let Some(checked) = check(&join(path, key), inner, item, errors) {
                    out.insert(key.clone(), checked);
                }
            }
            Some(Value::Object(out))
        }
        (FieldKind::SequenceOf(inner), Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                if let Some(checked) = check(&format!("{path}[{index}]"), inner, item, errors) {
                    out.push(checked);
                }
            }
            Some(Value::Array(out))
        }
        (FieldKind::Nested(schema), Value::Object(map)) => {
            Some(Value::Object(schema.validate_map(path, map, errors)))
        }
        _ => Some(value.clone()),
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}.{name}")
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(n) if n.is_f64() => "a number",
        Value::Number(_) => "an integer",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

/// A mapping that passed schema validation.
#[derive(Clone, Debug, PartialEq)]
pub struct Validated(Map<String, Value>);

impl Validated {
    /// Returns the validated mapping.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the wrapper and returns the validated mapping.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Builds a typed value from the validated mapping.
    ///
    /// # Errors
    ///
    /// Returns the `serde` error when `T` expects a different shape than the
    /// schema that produced this mapping.
    pub fn construct<T>(self) -> Result<T, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        serde_json::from_value(Value::Object(self.0))
    }
}

/// Messages attached to one field path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    field: String,
    messages: Vec<String>,
}

impl FieldError {
    /// Returns the dot-separated field path.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the messages recorded for the field.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.messages.join("; "))
    }
}

/// Every violation found while validating one document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: Vec<FieldError>,
}

impl ValidationErrors {
    /// Creates an error list holding a single message.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    /// Records `message` against `field`, grouping messages per field.
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        let message = message.into();
        match self.fields.iter_mut().find(|entry| entry.field == field) {
            Some(entry) => entry.messages.push(message),
            None => self.fields.push(FieldError {
                field: field.to_owned(),
                messages: vec![message],
            }),
        }
    }

    /// Returns `true` when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the per-field errors in the order they were found.
    #[must_use]
    pub fn fields(&self) -> &[FieldError] {
        &self.fields
    }

    /// Returns the messages recorded for `field`, if any.
    #[must_use]
    pub fn messages(&self, field: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|entry| entry.field == field)
            .map(FieldError::messages)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
