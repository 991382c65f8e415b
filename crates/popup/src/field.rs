//! Field specifications.
//!
//! A [`FieldSpec`] describes one labeled input of a fields-mode popup: its
//! kind, options, initial value and the checks that run before the popup may
//! close.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::PopupError;

// -----------------------------------------------------------------------------
// Field Kind
// -----------------------------------------------------------------------------

/// Default number of rows for a text area.
pub const DEFAULT_TEXTAREA_ROWS: u32 = 3;

/// Default visible size of a select box.
pub const DEFAULT_SELECT_SIZE: u32 = 1;

static KIND_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:(TEXT)|(TEXTAREA)(?::([1-9]\d*))?|((MULTI[-_])?SELECT)(?::([1-9]\d*))?)$",
    )
    .expect("field kind pattern is valid")
});

/// The widget type of a field.
///
/// Parsed case-insensitively from strings such as `"text"`, `"TEXTAREA:5"`,
/// `"select"` or `"MULTI-SELECT:4"`. The multi-select kind also accepts an
/// underscore (`"MULTI_SELECT"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldKind {
    /// Single-line text input.
    #[default]
    Text,
    /// Multi-line text input.
    TextArea {
        /// Visible rows.
        rows: u32,
    },
    /// Single-choice select box.
    Select {
        /// Visible options.
        size: u32,
    },
    /// Multiple-choice select box.
    MultiSelect {
        /// Visible options.
        size: u32,
    },
}

impl FieldKind {
    /// Returns true for select and multi-select kinds, which need options.
    pub fn is_selection(&self) -> bool {
        matches!(self, Self::Select { .. } | Self::MultiSelect { .. })
    }
}

impl FromStr for FieldKind {
    type Err = PopupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PopupError::InvalidFieldKind {
            index: 0,
            kind: s.to_string(),
        };
        let caps = KIND_PATTERN.captures(s).ok_or_else(invalid)?;
        let number = |group: usize, default: u32| -> Result<u32, PopupError> {
            match caps.get(group) {
                Some(m) => m.as_str().parse().map_err(|_| invalid()),
                None => Ok(default),
            }
        };

        if caps.get(1).is_some() {
            Ok(Self::Text)
        } else if caps.get(2).is_some() {
            Ok(Self::TextArea {
                rows: number(3, DEFAULT_TEXTAREA_ROWS)?,
            })
        } else if caps.get(5).is_some() {
            Ok(Self::MultiSelect {
                size: number(6, DEFAULT_SELECT_SIZE)?,
            })
        } else {
            Ok(Self::Select {
                size: number(6, DEFAULT_SELECT_SIZE)?,
            })
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("TEXT"),
            Self::TextArea { rows } => write!(f, "TEXTAREA:{rows}"),
            Self::Select { size } => write!(f, "SELECT:{size}"),
            Self::MultiSelect { size } => write!(f, "MULTI-SELECT:{size}"),
        }
    }
}

// -----------------------------------------------------------------------------
// SelectOption
// -----------------------------------------------------------------------------

/// An option for select fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    /// The text shown to the user.
    pub text: String,
    /// The value reported when the option is chosen.
    pub value: String,
    /// Whether this option is initially selected.
    pub selected: bool,
}

impl SelectOption {
    /// Creates a new option.
    pub fn new(text: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: value.into(),
            selected: false,
        }
    }

    /// Creates an option whose text is its value.
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self::new(value.clone(), value)
    }

    /// Sets whether the option is initially selected.
    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

// -----------------------------------------------------------------------------
// Requirement and Trim
// -----------------------------------------------------------------------------

/// Whether a field must be filled in before the popup closes.
#[derive(Debug, Clone, Default)]
pub enum Requirement {
    /// The field may be left as is.
    #[default]
    Optional,
    /// The field may not be empty.
    NonEmpty,
    /// The field must match the pattern.
    Pattern(Regex),
}

impl Requirement {
    /// Returns true if the (already trimmed) value breaks the requirement.
    pub fn is_violated_by(&self, value: &str) -> bool {
        match self {
            Self::Optional => false,
            Self::NonEmpty => value.is_empty(),
            Self::Pattern(pattern) => !pattern.is_match(value),
        }
    }

    /// Returns true unless the requirement is [`Requirement::Optional`].
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Optional)
    }
}

impl From<bool> for Requirement {
    fn from(required: bool) -> Self {
        if required { Self::NonEmpty } else { Self::Optional }
    }
}

impl From<Regex> for Requirement {
    fn from(pattern: Regex) -> Self {
        Self::Pattern(pattern)
    }
}

/// How a field's value is cleaned up before it is checked.
#[derive(Debug, Clone, Default)]
pub enum Trim {
    /// Leave the value untouched.
    #[default]
    Keep,
    /// Strip leading and trailing whitespace, including non-breaking spaces.
    Whitespace,
    /// Remove every substring matching the pattern.
    Pattern(Regex),
}

impl Trim {
    /// Applies the trim rule to a value.
    pub fn apply(&self, value: &str) -> String {
        match self {
            Self::Keep => value.to_string(),
            Self::Whitespace => value.trim().to_string(),
            Self::Pattern(pattern) => pattern.replace_all(value, "").into_owned(),
        }
    }
}

impl From<bool> for Trim {
    fn from(trim: bool) -> Self {
        if trim { Self::Whitespace } else { Self::Keep }
    }
}

impl From<Regex> for Trim {
    fn from(pattern: Regex) -> Self {
        Self::Pattern(pattern)
    }
}

// -----------------------------------------------------------------------------
// Verdicts
// -----------------------------------------------------------------------------

/// What a validator reports about a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The value is acceptable.
    Valid,
    /// The value is rejected with the field's configured error message.
    Invalid,
    /// The value is rejected with this message.
    Message(String),
}

impl From<bool> for Verdict {
    /// `true` means "there is an error".
    fn from(error: bool) -> Self {
        if error { Self::Invalid } else { Self::Valid }
    }
}

impl From<&str> for Verdict {
    fn from(message: &str) -> Self {
        Self::from(message.to_string())
    }
}

impl From<String> for Verdict {
    /// An empty message means the value is acceptable.
    fn from(message: String) -> Self {
        if message.is_empty() {
            Self::Valid
        } else {
            Self::Message(message)
        }
    }
}

/// The error state a validator writes into.
///
/// Handed to custom validators as their `set_error` capability. Each call to
/// [`ErrorSlot::set`] replaces the previous verdict; a validator that never
/// calls it leaves the required check's verdict in place.
#[derive(Debug, Clone)]
pub struct ErrorSlot {
    error: Option<String>,
    fallback: String,
}

impl ErrorSlot {
    pub(crate) fn new(fallback: impl Into<String>) -> Self {
        Self {
            error: None,
            fallback: fallback.into(),
        }
    }

    /// Records a verdict, replacing the previous one.
    ///
    /// ```rust
    /// # use popup::ErrorSlot;
    /// # fn check(slot: &mut ErrorSlot) {
    /// slot.set(true);              // invalid, default message
    /// slot.set("must contain @");  // invalid, this message
    /// slot.set(false);             // valid again
    /// # }
    /// ```
    pub fn set(&mut self, verdict: impl Into<Verdict>) {
        self.error = match verdict.into() {
            Verdict::Valid => None,
            Verdict::Invalid => Some(self.fallback.clone()),
            Verdict::Message(message) => Some(message),
        };
    }

    /// Returns true if an error is currently recorded.
    pub fn is_set(&self) -> bool {
        self.error.is_some()
    }

    /// Returns the recorded error message, if any.
    pub fn message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn into_error(self) -> Option<String> {
        self.error
    }
}

/// A custom field validator.
///
/// Called with the trimmed value, the field's position, the index of the
/// button being pressed (`None` for focus loss and timeouts) and the field's
/// [`ErrorSlot`]. The returned string replaces the value shown in the field,
/// whether or not the value is valid.
///
/// The popup is locked while a validator runs. Calls the validator makes on
/// its own popup, directly or through a [`Closer`](crate::Closer), return
/// immediately: triggers resolve to
/// [`Resolution::Ignored`](crate::Resolution::Ignored) and reads come back
/// empty.
pub type ValidateFn = Arc<dyn Fn(&str, usize, Option<usize>, &mut ErrorSlot) -> String + Send + Sync>;

// -----------------------------------------------------------------------------
// Stringification
// -----------------------------------------------------------------------------

/// Converts a loosely typed value into the text a field displays.
///
/// - `null` becomes the empty string
/// - strings are used as is
/// - booleans and numbers use their canonical text
/// - arrays stringify each element and join them with `,`
/// - objects become compact JSON
pub fn stringify(value: &serde_json::Value) -> String {
    use serde_json::Value;

    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

// -----------------------------------------------------------------------------
// FieldSpec
// -----------------------------------------------------------------------------

/// One labeled input of a fields-mode popup.
#[derive(Clone)]
pub struct FieldSpec {
    pub(crate) message: String,
    pub(crate) kind: String,
    pub(crate) options: Option<Vec<SelectOption>>,
    pub(crate) initial_value: String,
    pub(crate) validate: Option<ValidateFn>,
    pub(crate) required: Requirement,
    pub(crate) trim: Trim,
    pub(crate) error_message: Option<String>,
    pub(crate) id: Option<String>,
}

impl FieldSpec {
    /// Creates a text field with the given label.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: "TEXT".to_string(),
            options: None,
            initial_value: String::new(),
            validate: None,
            required: Requirement::Optional,
            trim: Trim::Keep,
            error_message: None,
            id: None,
        }
    }

    /// Creates a text area with the given label and row count.
    pub fn text_area(message: impl Into<String>, rows: u32) -> Self {
        Self::new(message).field_kind(FieldKind::TextArea { rows })
    }

    /// Creates a select box with the given label and options.
    pub fn select(message: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self::new(message)
            .field_kind(FieldKind::Select {
                size: DEFAULT_SELECT_SIZE,
            })
            .options(options)
    }

    /// Creates a multi-select box with the given label and options.
    pub fn multi_select(message: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self::new(message)
            .field_kind(FieldKind::MultiSelect {
                size: DEFAULT_SELECT_SIZE,
            })
            .options(options)
    }

    /// Sets the kind from a string such as `"TEXTAREA:5"`.
    ///
    /// The string is parsed when the popup opens; an unknown kind makes
    /// [`Popup::open`](crate::Popup::open) fail.
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Sets an already parsed kind.
    pub fn field_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind.to_string();
        self
    }

    /// Sets the select options.
    pub fn options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = Some(options);
        self
    }

    /// Sets the initial value of a text or text area field.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.initial_value = value.into();
        self
    }

    /// Sets the validation function. See [`ValidateFn`] for what it may do
    /// with its own popup.
    pub fn validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&str, usize, Option<usize>, &mut ErrorSlot) -> String + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(validate));
        self
    }

    /// Sets whether the field is required, or the pattern it must match.
    pub fn required(mut self, required: impl Into<Requirement>) -> Self {
        self.required = required.into();
        self
    }

    /// Sets whether whitespace is trimmed, or the pattern to strip.
    pub fn trim(mut self, trim: impl Into<Trim>) -> Self {
        self.trim = trim.into();
        self
    }

    /// Sets the message shown when the field is invalid without a more
    /// specific message.
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Sets the key under which the value is reported.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Returns the label.
    pub fn get_message(&self) -> &str {
        &self.message
    }

    /// Returns the kind string as declared.
    pub fn get_kind(&self) -> &str {
        &self.kind
    }

    /// Returns the select options, if any were given.
    pub fn get_options(&self) -> Option<&[SelectOption]> {
        self.options.as_deref()
    }

    /// Returns the initial value.
    pub fn get_value(&self) -> &str {
        &self.initial_value
    }

    /// Returns the result key, if any.
    pub fn get_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the requirement.
    pub fn get_required(&self) -> &Requirement {
        &self.required
    }

    /// Parses the kind and checks that selection kinds carry options.
    pub(crate) fn resolve_kind(&self, index: usize) -> crate::Result<FieldKind> {
        let kind = self
            .kind
            .parse::<FieldKind>()
            .map_err(|_| PopupError::InvalidFieldKind {
                index,
                kind: self.kind.clone(),
            })?;
        if kind.is_selection() && self.options.is_none() {
            return Err(PopupError::MissingOptions {
                index,
                kind: self.kind.clone(),
            });
        }
        Ok(kind)
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("message", &self.message)
            .field("kind", &self.kind)
            .field("options", &self.options)
            .field("initial_value", &self.initial_value)
            .field("validate", &self.validate.as_ref().map(|_| "<fn>"))
            .field("required", &self.required)
            .field("trim", &self.trim)
            .field("error_message", &self.error_message)
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_parse_defaults() {
        assert_eq!("TEXT".parse::<FieldKind>().unwrap(), FieldKind::Text);
        assert_eq!(
            "textarea".parse::<FieldKind>().unwrap(),
            FieldKind::TextArea { rows: 3 }
        );
        assert_eq!(
            "Select".parse::<FieldKind>().unwrap(),
            FieldKind::Select { size: 1 }
        );
    }

    #[test]
    fn test_kind_parse_sizes() {
        assert_eq!(
            "TEXTAREA:5".parse::<FieldKind>().unwrap(),
            FieldKind::TextArea { rows: 5 }
        );
        assert_eq!(
            "multi-select:4".parse::<FieldKind>().unwrap(),
            FieldKind::MultiSelect { size: 4 }
        );
        assert_eq!(
            "MULTI_SELECT".parse::<FieldKind>().unwrap(),
            FieldKind::MultiSelect { size: 1 }
        );
    }

    #[test]
    fn test_kind_parse_rejects() {
        for bad in ["", "DATE", "TEXT:2", "TEXTAREA:0", "SELECT:", "MULTISELECT"] {
            assert!(bad.parse::<FieldKind>().is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn test_kind_display_round_trips() {
        let kind = FieldKind::MultiSelect { size: 6 };
        assert_eq!(kind.to_string().parse::<FieldKind>().unwrap(), kind);
    }

    #[test]
    fn test_resolve_kind_requires_options() {
        let field = FieldSpec::new("Color").kind("SELECT");
        let err = field.resolve_kind(3).unwrap_err();
        assert_eq!(
            err,
            PopupError::MissingOptions {
                index: 3,
                kind: "SELECT".to_string()
            }
        );

        let field = field.options(vec![SelectOption::plain("red")]);
        assert!(field.resolve_kind(3).is_ok());
    }

    #[test]
    fn test_resolve_kind_reports_index() {
        let err = FieldSpec::new("When").kind("DATE").resolve_kind(1).unwrap_err();
        assert!(matches!(err, PopupError::InvalidFieldKind { index: 1, .. }));
    }

    #[test]
    fn test_requirement() {
        assert!(Requirement::from(true).is_violated_by(""));
        assert!(!Requirement::from(true).is_violated_by("x"));
        assert!(!Requirement::from(false).is_violated_by(""));

        let digits = Requirement::from(Regex::new(r"^\d+$").unwrap());
        assert!(digits.is_violated_by("12a"));
        assert!(!digits.is_violated_by("123"));
    }

    #[test]
    fn test_trim() {
        assert_eq!(Trim::from(true).apply("  hi \u{a0}"), "hi");
        assert_eq!(Trim::from(false).apply("  hi "), "  hi ");
        assert_eq!(
            Trim::from(Regex::new(r"-").unwrap()).apply("555-123-4567"),
            "5551234567"
        );
    }

    #[test]
    fn test_error_slot() {
        let mut slot = ErrorSlot::new("Invalid input entered.");
        assert!(!slot.is_set());

        slot.set(true);
        assert_eq!(slot.message(), Some("Invalid input entered."));

        slot.set("too short");
        assert_eq!(slot.message(), Some("too short"));

        slot.set("");
        assert!(!slot.is_set());

        slot.set(true);
        slot.set(false);
        assert!(slot.into_error().is_none());
    }

    #[test]
    fn test_stringify() {
        assert_eq!(stringify(&json!(null)), "");
        assert_eq!(stringify(&json!("abc")), "abc");
        assert_eq!(stringify(&json!(true)), "true");
        assert_eq!(stringify(&json!(42)), "42");
        assert_eq!(stringify(&json!([1, "a", null])), "1,a,");
        assert_eq!(stringify(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_field_builder() {
        let field = FieldSpec::text_area("Bio", 5)
            .id("bio")
            .value("hello")
            .error_message("Tell us more");

        assert_eq!(field.get_message(), "Bio");
        assert_eq!(field.get_kind(), "TEXTAREA:5");
        assert_eq!(field.get_id(), Some("bio"));
        assert_eq!(field.get_value(), "hello");
        assert_eq!(field.error_message.as_deref(), Some("Tell us more"));
    }
}
