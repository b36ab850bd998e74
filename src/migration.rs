//! Upgrades stored preference records written by older releases.
//!
//! Responsibilities:
//! - Rename the legacy `titleUrlFormat` key to `selectedFormat`.
//! - Inject `plainTextSeparator` (and a default `selectedFormat`) where the
//!   stored value is missing or not a string.
//! - Fill in missing template entries so every format has one.
//! - Replace the legacy plain template `{title} {url}`.
//!
//! Works on raw JSON before it is decoded into `PreferenceState`, so the
//! typed record never has to tolerate missing fields. Custom values are never
//! overwritten.

use serde_json::{Map, Value};

use crate::models::{DEFAULT_SEPARATOR, FormatKind, SelectedFormat};

pub const LEGACY_FORMAT_KEY: &str = "titleUrlFormat";
pub const LEGACY_PLAIN_TEMPLATE: &str = "{title} {url}";

const FORMAT_KEY: &str = "selectedFormat";
const TEMPLATES_KEY: &str = "templates";
const SEPARATOR_KEY: &str = "plainTextSeparator";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStep {
    RenamedLegacyFormatKey,
    InjectedDefaultFormat,
    InjectedSeparator,
    InjectedTemplates,
    FilledTemplate(FormatKind),
    UpgradedPlainTemplate,
}

/// A record after migration, with the steps that changed it
#[derive(Debug, Clone, PartialEq)]
pub struct Migrated {
    pub record: Value,
    pub steps: Vec<MigrationStep>,
}

impl Migrated {
    /// Whether the record differs from what was stored
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.steps.is_empty()
    }
}

/// Bring a stored record up to the current shape
///
/// # Errors
///
/// Returns a description of the problem if the record is not a JSON object
pub fn migrate(record: Value) -> Result<Migrated, String> {
    let Value::Object(mut fields) = record else {
        return Err(format!("expected an object, found {}", kind_of(&record)));
    };
    let mut steps = Vec::new();

    if let Some(legacy_format) = fields.remove(LEGACY_FORMAT_KEY) {
        steps.push(MigrationStep::RenamedLegacyFormatKey);
        if !is_string(fields.get(FORMAT_KEY)) {
            fields.insert(FORMAT_KEY.to_string(), legacy_format);
        }
    }
    if !is_string(fields.get(FORMAT_KEY)) {
        fields.insert(
            FORMAT_KEY.to_string(),
            Value::String(SelectedFormat::default().to_string()),
        );
        steps.push(MigrationStep::InjectedDefaultFormat);
    }

    // null or non-string separators are treated as missing
    if !is_string(fields.get(SEPARATOR_KEY)) {
        fields.insert(
            SEPARATOR_KEY.to_string(),
            Value::String(DEFAULT_SEPARATOR.to_string()),
        );
        steps.push(MigrationStep::InjectedSeparator);
    }

    migrate_templates(&mut fields, &mut steps);

    Ok(Migrated {
        record: Value::Object(fields),
        steps,
    })
}

fn migrate_templates(fields: &mut Map<String, Value>, steps: &mut Vec<MigrationStep>) {
    let templates = fields
        .entry(TEMPLATES_KEY)
        .or_insert_with(|| Value::Object(Map::new()));
    if !templates.is_object() {
        *templates = Value::Object(Map::new());
    }
    let Value::Object(templates) = templates else {
        return;
    };
    if templates.is_empty() {
        steps.push(MigrationStep::InjectedTemplates);
    }

    for kind in FormatKind::ALL {
        match templates.get(kind.as_str()) {
            Some(Value::String(_)) => {}
            _ => {
                templates.insert(
                    kind.as_str().to_string(),
                    Value::String(kind.default_template().to_string()),
                );
                if !steps.contains(&MigrationStep::InjectedTemplates) {
                    steps.push(MigrationStep::FilledTemplate(kind));
                }
            }
        }
    }

    let plain = FormatKind::Plain.as_str();
    if templates.get(plain).and_then(Value::as_str) == Some(LEGACY_PLAIN_TEMPLATE) {
        templates.insert(
            plain.to_string(),
            Value::String(FormatKind::Plain.default_template().to_string()),
        );
        steps.push(MigrationStep::UpgradedPlainTemplate);
    }
}

fn is_string(value: Option<&Value>) -> bool {
    value.is_some_and(Value::is_string)
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
