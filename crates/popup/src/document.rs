//! Declarative popup documents.
//!
//! A [`PopupDocument`] holds the data part of a [`PopupConfig`] and can be
//! loaded from TOML or JSON. Callbacks (custom validators, completion and
//! overlay click handlers) are attached in code after conversion.
//!
//! ```toml
//! title = "New account"
//! buttons = ["Create", "Cancel"]
//! cancel_button = 1
//! timeout_ms = 60000
//!
//! [[fields]]
//! message = "Email"
//! id = "email"
//! required = '^[^@\s]+@[^@\s]+$'
//! trim = true
//!
//! [[fields]]
//! message = "Plan"
//! kind = "select"
//! options = ["free", { text = "Pro", value = "pro", selected = true }]
//! ```

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::PopupConfig;
use crate::field::{FieldSpec, Requirement, SelectOption, Trim, stringify};
use crate::{PopupError, Result};

fn default_kind() -> String {
    "TEXT".to_string()
}

/// A boolean switch or a regex source string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleDocument {
    /// On or off.
    Flag(bool),
    /// A regular expression.
    Pattern(String),
}

impl RuleDocument {
    fn compile(pattern: &str) -> Result<Regex> {
        Regex::new(pattern).map_err(|err| PopupError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })
    }

    /// Converts the rule into a field requirement.
    pub fn to_requirement(&self) -> Result<Requirement> {
        match self {
            Self::Flag(required) => Ok(Requirement::from(*required)),
            Self::Pattern(pattern) => Self::compile(pattern).map(Requirement::Pattern),
        }
    }

    /// Converts the rule into a trim rule.
    pub fn to_trim(&self) -> Result<Trim> {
        match self {
            Self::Flag(trim) => Ok(Trim::from(*trim)),
            Self::Pattern(pattern) => Self::compile(pattern).map(Trim::Pattern),
        }
    }
}

/// A select option: a bare string, or a table with an optional text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionDocument {
    /// Text and value given separately. The text defaults to the value.
    Detailed {
        /// Shown text.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        /// Reported value, stringified.
        value: serde_json::Value,
        /// Whether the option starts selected.
        #[serde(default)]
        selected: bool,
    },
    /// Text and value are the same string.
    Plain(String),
}

impl OptionDocument {
    /// Converts the document into an option.
    pub fn to_option(&self) -> SelectOption {
        match self {
            Self::Plain(value) => SelectOption::plain(value.clone()),
            Self::Detailed {
                text,
                value,
                selected,
            } => {
                let value = stringify(value);
                let text = text.clone().unwrap_or_else(|| value.clone());
                SelectOption::new(text, value).selected(*selected)
            }
        }
    }
}

/// One field of a [`PopupDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDocument {
    /// Label.
    #[serde(default)]
    pub message: String,
    /// Kind string, such as `"TEXTAREA:4"`.
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Select options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<OptionDocument>>,
    /// Initial value, stringified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// `true`, `false` or a pattern the value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<RuleDocument>,
    /// `true`, `false` or a pattern to strip from the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim: Option<RuleDocument>,
    /// Message shown when the field is invalid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Result key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl FieldDocument {
    /// Converts the document into a field specification.
    ///
    /// # Errors
    ///
    /// Returns [`PopupError::InvalidPattern`] if a pattern does not compile.
    /// The kind string is checked later, when the popup opens.
    pub fn into_spec(self) -> Result<FieldSpec> {
        let mut spec = FieldSpec::new(self.message).kind(self.kind);
        if let Some(options) = &self.options {
            spec = spec.options(options.iter().map(OptionDocument::to_option).collect());
        }
        if let Some(value) = &self.value {
            spec = spec.value(stringify(value));
        }
        if let Some(required) = &self.required {
            spec = spec.required(required.to_requirement()?);
        }
        if let Some(trim) = &self.trim {
            spec = spec.trim(trim.to_trim()?);
        }
        if let Some(error) = self.error {
            spec = spec.error_message(error);
        }
        if let Some(id) = self.id {
            spec = spec.id(id);
        }
        Ok(spec)
    }
}

/// The data part of a popup configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopupDocument {
    /// Title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Message; takes precedence over `fields`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldDocument>>,
    /// Button labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<String>,
    /// Initially focused button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_button: Option<usize>,
    /// Button that skips required checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_button: Option<usize>,
    /// Auto-dismiss timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Report fields with an id only under that id.
    #[serde(default)]
    pub unindexed_results: bool,
    /// Stacking order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    /// Overlay fill.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_background: Option<String>,
    /// Default error message for this popup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl PopupDocument {
    /// Parses a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| PopupError::document(err.to_string()))
    }

    /// Parses a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|err| PopupError::document(err.to_string()))
    }

    /// Reads a document, as JSON if the extension is `.json` and as TOML
    /// otherwise.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| PopupError::io(format!("{}: {err}", path.display())))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }

    /// Converts the document into a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PopupError::InvalidPattern`] if a field pattern does not
    /// compile.
    pub fn into_config(self) -> Result<PopupConfig> {
        let mut config = PopupConfig::new()
            .buttons(self.buttons)
            .unindexed_results(self.unindexed_results);

        if let Some(title) = self.title {
            config = config.title(title);
        }
        if let Some(message) = self.message {
            config = config.with_message(message);
        }
        if let Some(fields) = self.fields {
            let specs = fields
                .into_iter()
                .map(FieldDocument::into_spec)
                .collect::<Result<Vec<_>>>()?;
            config = config.with_fields(specs);
        }
        if let Some(index) = self.default_button {
            config = config.default_button(index);
        }
        if let Some(index) = self.cancel_button {
            config = config.cancel_button(index);
        }
        if let Some(millis) = self.timeout_ms {
            config = config.timeout_ms(millis);
        }
        if let Some(z_index) = self.z_index {
            config = config.z_index(z_index);
        }
        if let Some(background) = self.overlay_background {
            config = config.overlay_background(background);
        }
        if let Some(message) = self.error_message {
            config = config.error_message(message);
        }
        Ok(config)
    }
}
