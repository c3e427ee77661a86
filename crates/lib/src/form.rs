//! Schema-driven settings form: build editable control trees from a
//! [`FormSchema`](crate::schema::FormSchema) and read edited values back as a
//! nested JSON map for validation.
//!
//! Controls are grouped into sections: one section per nested sub-schema (in
//! declaration order), then a catch-all "General" section for top-level
//! scalar fields. Every leaf field has exactly one entry in the
//! [`FieldPathIndex`]; nested fields expand into a section and never appear
//! as leaves themselves.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::schema::{FieldValue, FormSchema, ScalarKind, ScalarValue};

/// Title of the catch-all section holding top-level scalar fields.
pub const GENERAL_SECTION_TITLE: &str = "General";

static UI_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@ui\[([^\]]+)\]").expect("static regex"));

/// Slider bounds parsed from a `@ui[slider,min,max]` directive.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SliderBounds {
    min: f64,
    max: f64,
}

/// Split a field description into the display text and any understood UI
/// directive. All `@ui[...]` occurrences are stripped from the display text
/// whether or not they were understood; a directive with malformed numeric
/// args is dropped silently.
fn parse_ui_directives(description: &str) -> (String, Option<SliderBounds>) {
    let mut bounds = None;
    for caps in UI_DIRECTIVE.captures_iter(description) {
        let parts: Vec<&str> = caps[1].split(',').map(str::trim).collect();
        if parts.first().copied() == Some("slider") && parts.len() >= 3 {
            if let (Ok(min), Ok(max)) = (parts[1].parse::<f64>(), parts[2].parse::<f64>()) {
                bounds = Some(SliderBounds { min, max });
            }
        }
    }
    let cleaned = UI_DIRECTIVE.replace_all(description, "").trim().to_string();
    (cleaned, bounds)
}

/// Editable rows plus an input/add control for a list-typed field.
#[derive(Debug, Clone)]
pub struct ListEditor {
    pub element: ScalarKind,
    pub rows: Vec<ScalarValue>,
    /// Text currently typed into the add-row input.
    pub input: String,
}

impl ListEditor {
    /// Coerce the pending input to the element kind and append it as a row.
    /// Malformed input is a no-op that leaves existing rows untouched.
    /// Returns whether a row was added; the input is cleared on success.
    pub fn push_input(&mut self) -> bool {
        match ScalarValue::coerce(self.element, &self.input) {
            Some(value) => {
                self.rows.push(value);
                self.input.clear();
                true
            }
            None => false,
        }
    }

    pub fn remove_row(&mut self, index: usize) {
        if index < self.rows.len() {
            self.rows.remove(index);
        }
    }
}

/// One editable control, dispatched from the field's declared kind.
#[derive(Debug, Clone)]
pub enum Control {
    /// Binary switch for bool fields.
    Switch { on: bool },
    /// Bounded slider for float fields and for int fields carrying a slider
    /// directive (`integer` selects integer stepping and read-back).
    Slider {
        value: f64,
        min: f64,
        max: f64,
        integer: bool,
    },
    /// Free numeric text field for int fields without a slider directive.
    NumericField { text: String },
    /// Text field; masked for password-like fields.
    TextField { text: String, masked: bool },
    List(ListEditor),
}

impl Control {
    /// Deterministic field-kind dispatch: list, then bool, float, int, text.
    fn for_field(value: &FieldValue, clean_description: &str, bounds: Option<SliderBounds>) -> Self {
        match value {
            FieldValue::List(element, values) => Control::List(ListEditor {
                element: *element,
                rows: values.clone(),
                input: String::new(),
            }),
            FieldValue::Scalar(ScalarValue::Bool(b)) => Control::Switch { on: *b },
            FieldValue::Scalar(ScalarValue::Float(f)) => {
                let bounds = bounds.unwrap_or(SliderBounds { min: 0.0, max: 2.0 });
                Control::Slider {
                    value: *f,
                    min: bounds.min,
                    max: bounds.max,
                    integer: false,
                }
            }
            FieldValue::Scalar(ScalarValue::Int(i)) => match bounds {
                Some(b) => Control::Slider {
                    value: *i as f64,
                    min: b.min.trunc(),
                    max: b.max.trunc(),
                    integer: true,
                },
                None => Control::NumericField {
                    text: i.to_string(),
                },
            },
            FieldValue::Scalar(ScalarValue::Text(s)) => Control::TextField {
                text: s.clone(),
                masked: clean_description.to_lowercase().contains("password"),
            },
            // Nested fields expand into sections before dispatch; this arm
            // only keeps the match total.
            FieldValue::Nested(nested) => Control::TextField {
                text: format!("<{}>", nested.name),
                masked: false,
            },
        }
    }

    /// Current value of the control as JSON, per descriptor kind.
    fn value(&self) -> Value {
        match self {
            Control::Switch { on } => Value::Bool(*on),
            Control::Slider { value, integer, .. } => {
                if *integer {
                    Value::from(value.round() as i64)
                } else {
                    Value::from(*value)
                }
            }
            // Parse to an integer when possible; otherwise pass the raw text
            // through and leave rejection to the validator.
            Control::NumericField { text } => match text.trim().parse::<i64>() {
                Ok(i) => Value::from(i),
                Err(_) => Value::String(text.clone()),
            },
            Control::TextField { text, .. } => Value::String(text.clone()),
            Control::List(editor) => {
                Value::Array(editor.rows.iter().map(ScalarValue::to_json).collect())
            }
        }
    }
}

/// One labelled form row: a control plus its title and cleaned description.
#[derive(Debug, Clone)]
pub struct FormItem {
    /// Dotted path: `Nested.field` inside a nested section, bare `field` at
    /// top level.
    pub path: String,
    pub label: String,
    /// Description with all `@ui[...]` directives stripped.
    pub description: String,
    pub control: Control,
}

/// A titled group of form items.
#[derive(Debug, Clone)]
pub struct Section {
    pub title: String,
    pub items: Vec<FormItem>,
}

/// Maps a field's dotted path to its live control (by section/item position).
/// Entries are kept in render order so read-back output is stable.
#[derive(Debug, Default)]
pub struct FieldPathIndex {
    entries: Vec<(String, usize, usize)>,
    by_path: HashMap<String, (usize, usize)>,
}

impl FieldPathIndex {
    fn insert(&mut self, path: String, section: usize, item: usize) {
        self.entries.push((path.clone(), section, item));
        self.by_path.insert(path, (section, item));
    }

    pub fn get(&self, path: &str) -> Option<(usize, usize)> {
        self.by_path.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _, _)| p.as_str())
    }
}

/// A rendered settings form: section tree plus the field-path index used to
/// read edited values back. Built fresh per render; reset/reload flows
/// replace the whole form rather than patching controls in place.
#[derive(Debug, Default)]
pub struct SettingsForm {
    sections: Vec<Section>,
    index: FieldPathIndex,
}

impl SettingsForm {
    /// Build the control tree for a schema instance. Nested sections come
    /// first in declaration order, then the catch-all "General" section for
    /// top-level scalar fields (omitted when there are none).
    pub fn render<S: FormSchema>(instance: &S) -> Self {
        let fields = instance.fields();
        let mut form = SettingsForm::default();

        for field in &fields {
            if let FieldValue::Nested(nested) = &field.value {
                let mut items = Vec::new();
                for inner in &nested.fields {
                    if matches!(inner.value, FieldValue::Nested(_)) {
                        log::warn!(
                            "skipping {}.{}: only one nesting level is supported",
                            nested.name,
                            inner.name
                        );
                        continue;
                    }
                    items.push(Self::build_item(
                        format!("{}.{}", nested.name, inner.name),
                        inner.name,
                        inner.title,
                        inner.description,
                        &inner.value,
                    ));
                }
                if !items.is_empty() {
                    let section_idx = form.sections.len();
                    for (item_idx, item) in items.iter().enumerate() {
                        form.index.insert(item.path.clone(), section_idx, item_idx);
                    }
                    form.sections.push(Section {
                        title: nested.title.unwrap_or(nested.name).to_string(),
                        items,
                    });
                }
            }
        }

        let mut general = Vec::new();
        for field in &fields {
            if matches!(field.value, FieldValue::Nested(_)) {
                continue;
            }
            general.push(Self::build_item(
                field.name.to_string(),
                field.name,
                field.title,
                field.description,
                &field.value,
            ));
        }
        if !general.is_empty() {
            let section_idx = form.sections.len();
            for (item_idx, item) in general.iter().enumerate() {
                form.index.insert(item.path.clone(), section_idx, item_idx);
            }
            form.sections.push(Section {
                title: GENERAL_SECTION_TITLE.to_string(),
                items: general,
            });
        }

        form
    }

    fn build_item(
        path: String,
        name: &str,
        title: Option<&str>,
        description: &str,
        value: &FieldValue,
    ) -> FormItem {
        let (clean, bounds) = parse_ui_directives(description);
        let control = Control::for_field(value, &clean, bounds);
        FormItem {
            path,
            label: title.unwrap_or(name).to_string(),
            description: clean,
            control,
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Mutable access for the UI layer driving the widgets.
    pub fn sections_mut(&mut self) -> &mut [Section] {
        &mut self.sections
    }

    pub fn index(&self) -> &FieldPathIndex {
        &self.index
    }

    pub fn control(&self, path: &str) -> Option<&Control> {
        let (s, i) = self.index.get(path)?;
        Some(&self.sections[s].items[i].control)
    }

    pub fn control_mut(&mut self, path: &str) -> Option<&mut Control> {
        let (s, i) = self.index.get(path)?;
        Some(&mut self.sections[s].items[i].control)
    }

    /// Read every indexed control back into a nested key-value map. Paths
    /// with a `.` separator are split once and inserted under their section
    /// key. The result is meant for the schema validator (serde); validation
    /// failures are the caller's to surface.
    pub fn values(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for (path, section, item) in &self.index.entries {
            let value = self.sections[*section].items[*item].control.value();
            match path.split_once('.') {
                Some((prefix, field)) => {
                    let entry = out
                        .entry(prefix.to_string())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(obj) = entry {
                        obj.insert(field.to_string(), value);
                    }
                }
                None => {
                    out.insert(path.clone(), value);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;

    struct Sampling {
        temperature: f64,
        top_k: i64,
    }

    impl FormSchema for Sampling {
        fn schema_name() -> &'static str {
            "Sampling"
        }

        fn schema_title() -> Option<&'static str> {
            Some("Sampling")
        }

        fn fields(&self) -> Vec<FieldSpec> {
            vec![
                FieldSpec::scalar(
                    "temperature",
                    "@ui[slider,0,1]Temperature",
                    ScalarValue::Float(self.temperature),
                ),
                FieldSpec::scalar("top_k", "TopK", ScalarValue::Int(self.top_k)),
            ]
        }
    }

    struct Demo {
        sampling: Sampling,
        api_key: String,
        enabled: bool,
        scripts: Vec<String>,
        limit: i64,
    }

    impl FormSchema for Demo {
        fn schema_name() -> &'static str {
            "Demo"
        }

        fn fields(&self) -> Vec<FieldSpec> {
            vec![
                FieldSpec::nested(&self.sampling),
                FieldSpec::scalar(
                    "api_key",
                    "API key password field",
                    ScalarValue::Text(self.api_key.clone()),
                ),
                FieldSpec::scalar("enabled", "", ScalarValue::Bool(self.enabled)),
                FieldSpec::list(
                    "scripts",
                    "Server scripts",
                    ScalarKind::Text,
                    self.scripts.iter().cloned().map(ScalarValue::Text).collect(),
                ),
                FieldSpec::scalar("limit", "@ui[slider,1,10]Limit", ScalarValue::Int(self.limit)),
            ]
        }
    }

    fn demo() -> Demo {
        Demo {
            sampling: Sampling {
                temperature: 0.6,
                top_k: 50,
            },
            api_key: "secret".to_string(),
            enabled: true,
            scripts: vec!["a.py".to_string()],
            limit: 5,
        }
    }

    #[test]
    fn slider_directive_sets_bounds_and_strips_description() {
        let (clean, bounds) = parse_ui_directives("@ui[slider,0,1]Temperature");
        assert_eq!(clean, "Temperature");
        assert_eq!(bounds, Some(SliderBounds { min: 0.0, max: 1.0 }));
    }

    #[test]
    fn malformed_directive_is_dropped_but_still_stripped() {
        let (clean, bounds) = parse_ui_directives("@ui[slider,low,high] tune it");
        assert_eq!(clean, "tune it");
        assert_eq!(bounds, None);
    }

    #[test]
    fn unknown_directive_is_stripped() {
        let (clean, bounds) = parse_ui_directives("@ui[color,red] pick");
        assert_eq!(clean, "pick");
        assert_eq!(bounds, None);
    }

    #[test]
    fn nested_sections_come_first_then_general() {
        let form = SettingsForm::render(&demo());
        let titles: Vec<&str> = form.sections().iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Sampling", GENERAL_SECTION_TITLE]);
    }

    #[test]
    fn every_leaf_field_is_indexed_once() {
        let form = SettingsForm::render(&demo());
        let mut paths: Vec<&str> = form.index().paths().collect();
        paths.sort_unstable();
        assert_eq!(
            paths,
            vec![
                "Sampling.temperature",
                "Sampling.top_k",
                "api_key",
                "enabled",
                "limit",
                "scripts",
            ]
        );
    }

    #[test]
    fn float_with_directive_becomes_bounded_slider() {
        let form = SettingsForm::render(&demo());
        match form.control("Sampling.temperature") {
            Some(Control::Slider {
                value,
                min,
                max,
                integer,
            }) => {
                assert_eq!(*value, 0.6);
                assert_eq!((*min, *max), (0.0, 1.0));
                assert!(!integer);
            }
            other => panic!("expected slider, got {other:?}"),
        }
    }

    #[test]
    fn int_without_directive_is_numeric_field() {
        let form = SettingsForm::render(&demo());
        match form.control("Sampling.top_k") {
            Some(Control::NumericField { text }) => assert_eq!(text, "50"),
            other => panic!("expected numeric field, got {other:?}"),
        }
    }

    #[test]
    fn int_with_directive_is_integer_slider() {
        let form = SettingsForm::render(&demo());
        match form.control("limit") {
            Some(Control::Slider { integer, min, max, .. }) => {
                assert!(integer);
                assert_eq!((*min, *max), (1.0, 10.0));
            }
            other => panic!("expected integer slider, got {other:?}"),
        }
    }

    #[test]
    fn password_description_masks_text_field() {
        let form = SettingsForm::render(&demo());
        match form.control("api_key") {
            Some(Control::TextField { masked, .. }) => assert!(masked),
            other => panic!("expected text field, got {other:?}"),
        }
    }

    #[test]
    fn int_list_add_is_noop_on_invalid_input() {
        let mut editor = ListEditor {
            element: ScalarKind::Int,
            rows: vec![ScalarValue::Int(1)],
            input: "abc".to_string(),
        };
        assert!(!editor.push_input());
        assert_eq!(editor.rows, vec![ScalarValue::Int(1)]);

        editor.input = "3".to_string();
        assert!(editor.push_input());
        assert_eq!(editor.rows, vec![ScalarValue::Int(1), ScalarValue::Int(3)]);
        assert!(editor.input.is_empty());
    }

    #[test]
    fn values_reconstruct_nested_paths() {
        let mut form = SettingsForm::render(&demo());
        if let Some(Control::NumericField { text }) = form.control_mut("Sampling.top_k") {
            *text = "5".to_string();
        }
        let values = form.values();
        assert_eq!(
            values.get("Sampling").and_then(|v| v.get("top_k")),
            Some(&serde_json::json!(5))
        );
    }

    #[test]
    fn values_reproduce_unedited_scalars() {
        let form = SettingsForm::render(&demo());
        let values = form.values();
        assert_eq!(values.get("enabled"), Some(&serde_json::json!(true)));
        assert_eq!(values.get("api_key"), Some(&serde_json::json!("secret")));
        assert_eq!(values.get("limit"), Some(&serde_json::json!(5)));
        assert_eq!(values.get("scripts"), Some(&serde_json::json!(["a.py"])));
        assert_eq!(
            values.get("Sampling").and_then(|v| v.get("temperature")),
            Some(&serde_json::json!(0.6))
        );
    }
}
