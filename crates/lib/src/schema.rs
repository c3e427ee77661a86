//! Closed schema model for settings-form generation.
//!
//! The supported field kinds are a fixed tagged set (bool, int, float, text,
//! lists of those, one level of nested schema). Config types describe
//! themselves by implementing [`FormSchema`]; the form builder consumes the
//! resulting [`FieldSpec`] list in declaration order.

use serde_json::Value;

/// Scalar kinds a leaf field (or list element) may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    Text,
}

impl ScalarKind {
    /// Short label for input placeholders (e.g. "Add int value").
    pub fn label(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Text => "text",
        }
    }
}

/// A scalar value of one of the supported kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ScalarValue {
    pub fn kind(&self) -> ScalarKind {
        match self {
            ScalarValue::Bool(_) => ScalarKind::Bool,
            ScalarValue::Int(_) => ScalarKind::Int,
            ScalarValue::Float(_) => ScalarKind::Float,
            ScalarValue::Text(_) => ScalarKind::Text,
        }
    }

    /// Coerce user-typed text into the given kind. `None` means the input is
    /// not usable for that kind and the caller should treat the operation as
    /// a no-op. Bool accepts case-insensitive true/1/yes/on (anything else is
    /// false); int and float must parse numerically; text passes through.
    pub fn coerce(kind: ScalarKind, input: &str) -> Option<ScalarValue> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        match kind {
            ScalarKind::Bool => {
                let truthy = matches!(input.to_lowercase().as_str(), "true" | "1" | "yes" | "on");
                Some(ScalarValue::Bool(truthy))
            }
            ScalarKind::Int => input.parse::<i64>().ok().map(ScalarValue::Int),
            ScalarKind::Float => input.parse::<f64>().ok().map(ScalarValue::Float),
            ScalarKind::Text => Some(ScalarValue::Text(input.to_string())),
        }
    }

    /// JSON rendition used when reading form values back for validation.
    pub fn to_json(&self) -> Value {
        match self {
            ScalarValue::Bool(b) => Value::Bool(*b),
            ScalarValue::Int(i) => Value::from(*i),
            ScalarValue::Float(f) => Value::from(*f),
            ScalarValue::Text(s) => Value::String(s.clone()),
        }
    }

    /// Display form for list-editor rows.
    pub fn display(&self) -> String {
        match self {
            ScalarValue::Bool(b) => b.to_string(),
            ScalarValue::Int(i) => i.to_string(),
            ScalarValue::Float(f) => f.to_string(),
            ScalarValue::Text(s) => s.clone(),
        }
    }
}

/// Fields of a nested sub-schema, captured for one grouped form section.
#[derive(Debug, Clone)]
pub struct NestedSpec {
    /// Schema type name; used as the section key and the field-path prefix.
    pub name: &'static str,
    /// Human title for the section, when the schema declares one.
    pub title: Option<&'static str>,
    pub fields: Vec<FieldSpec>,
}

/// The value side of a field: a scalar, a homogeneous list, or one nested
/// sub-schema. Nested schemas must themselves contain only scalar and list
/// fields (one nesting level is supported).
#[derive(Debug, Clone)]
pub enum FieldValue {
    Scalar(ScalarValue),
    List(ScalarKind, Vec<ScalarValue>),
    Nested(NestedSpec),
}

/// One declared field of a schema, with its current value.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Field name as it appears in the serialized config (also the form path
    /// segment and the default label).
    pub name: &'static str,
    /// Optional human title shown instead of the name.
    pub title: Option<&'static str>,
    /// Description text; may embed `@ui[...]` directives.
    pub description: &'static str,
    pub value: FieldValue,
}

impl FieldSpec {
    pub fn scalar(name: &'static str, description: &'static str, value: ScalarValue) -> Self {
        Self {
            name,
            title: None,
            description,
            value: FieldValue::Scalar(value),
        }
    }

    pub fn list(
        name: &'static str,
        description: &'static str,
        element: ScalarKind,
        values: Vec<ScalarValue>,
    ) -> Self {
        Self {
            name,
            title: None,
            description,
            value: FieldValue::List(element, values),
        }
    }

    /// A nested sub-schema field. The path prefix and section key come from
    /// the nested type's `schema_name`.
    pub fn nested<T: FormSchema>(inner: &T) -> Self {
        Self {
            name: T::schema_name(),
            title: T::schema_title(),
            description: "",
            value: FieldValue::Nested(NestedSpec {
                name: T::schema_name(),
                title: T::schema_title(),
                fields: inner.fields(),
            }),
        }
    }

    pub fn with_title(mut self, title: &'static str) -> Self {
        self.title = Some(title);
        self
    }
}

/// A type whose settings form can be generated from its declared fields.
pub trait FormSchema {
    /// Type name used as the section key for nested occurrences. Must match
    /// the serialized name of the field holding the nested value so that
    /// read-back values validate directly.
    fn schema_name() -> &'static str;

    fn schema_title() -> Option<&'static str> {
        None
    }

    /// All declared fields with their current values, in declaration order.
    fn fields(&self) -> Vec<FieldSpec>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_int_rejects_malformed() {
        assert_eq!(ScalarValue::coerce(ScalarKind::Int, "abc"), None);
        assert_eq!(
            ScalarValue::coerce(ScalarKind::Int, "3"),
            Some(ScalarValue::Int(3))
        );
    }

    #[test]
    fn coerce_bool_accepts_truthy_spellings() {
        for s in ["true", "TRUE", "1", "yes", "On"] {
            assert_eq!(
                ScalarValue::coerce(ScalarKind::Bool, s),
                Some(ScalarValue::Bool(true)),
                "{s}"
            );
        }
        assert_eq!(
            ScalarValue::coerce(ScalarKind::Bool, "nope"),
            Some(ScalarValue::Bool(false))
        );
    }

    #[test]
    fn coerce_empty_input_is_none() {
        assert_eq!(ScalarValue::coerce(ScalarKind::Text, "   "), None);
    }

    #[test]
    fn float_json_roundtrip() {
        let v = ScalarValue::Float(0.15);
        assert_eq!(v.to_json(), serde_json::json!(0.15));
    }
}
