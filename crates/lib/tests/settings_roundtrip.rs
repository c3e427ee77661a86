//! Integration test: render the config into a settings form, read the values
//! back, and validate them through serde into a config instance — the same
//! path the desktop settings screen uses on save.

use lib::config::AgentConfig;
use lib::form::{Control, SettingsForm};
use serde_json::Value;

fn validate(form: &SettingsForm) -> Result<AgentConfig, serde_json::Error> {
    serde_json::from_value(Value::Object(form.values()))
}

#[test]
fn unedited_form_roundtrips_to_equal_config() {
    let mut config = AgentConfig::default();
    config.api_key = "secret".to_string();
    config.mcp_server_scripts = vec!["srv.py".to_string()];

    let form = SettingsForm::render(&config);
    let back = validate(&form).expect("values validate back into a config");
    assert_eq!(back, config);
}

#[test]
fn edited_nested_field_roundtrips_under_section_key() {
    let config = AgentConfig::default();
    let mut form = SettingsForm::render(&config);

    match form.control_mut("ModelConfig.top_k") {
        Some(Control::NumericField { text }) => *text = "5".to_string(),
        other => panic!("expected numeric field for top_k, got {other:?}"),
    }

    let values = form.values();
    assert_eq!(
        values.get("ModelConfig").and_then(|m| m.get("top_k")),
        Some(&serde_json::json!(5))
    );

    let back: AgentConfig =
        serde_json::from_value(Value::Object(values)).expect("edited values validate");
    assert_eq!(back.model.top_k, 5);
}

#[test]
fn unparseable_numeric_text_surfaces_as_validation_error() {
    let config = AgentConfig::default();
    let mut form = SettingsForm::render(&config);

    match form.control_mut("max_tokens") {
        Some(Control::NumericField { text }) => *text = "lots".to_string(),
        other => panic!("expected numeric field for max_tokens, got {other:?}"),
    }

    // The raw text is passed through and rejected by the validator, not by
    // the form layer.
    assert!(validate(&form).is_err());
}

#[test]
fn slider_edits_read_back_as_numbers() {
    let config = AgentConfig::default();
    let mut form = SettingsForm::render(&config);

    match form.control_mut("ModelConfig.temperature") {
        Some(Control::Slider { value, .. }) => *value = 0.25,
        other => panic!("expected slider for temperature, got {other:?}"),
    }

    let back = validate(&form).expect("values validate");
    assert_eq!(back.model.temperature, 0.25);
}
