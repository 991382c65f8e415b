//! Field validation.
//!
//! Each check runs in three steps: trim, required check, custom validator.
//! The result is written back to the widget (value and error indicator) and
//! to the field's [`FieldErrorState`].

use tracing::trace;

use crate::bridge::FieldWidget;
use crate::field::{ErrorSlot, FieldSpec};

/// Error state of one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrorState {
    message: Option<String>,
}

impl FieldErrorState {
    /// Returns true if the field failed its last check.
    pub fn is_invalid(&self) -> bool {
        self.message.is_some()
    }

    /// Returns the message of the last failed check.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Result of validating one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOutcome {
    /// The value the field shows after validation.
    pub value: String,
    /// Whether the field ended valid.
    pub valid: bool,
    /// The error shown on the field, if invalid.
    pub error: Option<String>,
}

/// Popup-wide settings that shape validation.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    /// The button that skips required checks.
    pub cancel_button: Option<usize>,
    /// Message for fields without their own error message.
    pub error_message: &'a str,
}

impl ValidationContext<'_> {
    fn bypasses_required(&self, button: Option<usize>) -> bool {
        matches!((button, self.cancel_button), (Some(b), Some(c)) if b == c)
    }
}

/// Validates one field against its widget's current value.
///
/// `button` is the index of the button being pressed, or `None` when the
/// check was caused by focus loss or a timeout. The required check is
/// skipped only when `button` is the cancel button; the custom validator
/// always runs.
pub fn validate_one<W: FieldWidget>(
    field: &FieldSpec,
    index: usize,
    widget: &mut W,
    state: &mut FieldErrorState,
    button: Option<usize>,
    ctx: &ValidationContext<'_>,
) -> FieldOutcome {
    let raw = widget.value();
    let value = field.trim.apply(&raw);

    let mut slot = ErrorSlot::new(field.error_message.as_deref().unwrap_or(ctx.error_message));
    if !ctx.bypasses_required(button) && field.required.is_violated_by(&value) {
        slot.set(true);
    }

    let value = match &field.validate {
        Some(validate) => validate(&value, index, button, &mut slot),
        None => value,
    };
    if value != raw {
        widget.set_value(&value);
    }

    let error = slot.into_error();
    match &error {
        Some(message) => widget.show_error(message),
        None => widget.clear_error(),
    }
    state.message = error.clone();

    trace!(
        field = index,
        button = ?button,
        valid = error.is_none(),
        "validated field"
    );

    FieldOutcome {
        value,
        valid: error.is_none(),
        error,
    }
}

/// Validates every field in order and returns whether all ended valid.
///
/// Every field is checked even after one fails, so all error indicators
/// are up to date.
pub fn validate_all<W: FieldWidget>(
    fields: &[FieldSpec],
    widgets: &mut [W],
    states: &mut [FieldErrorState],
    button: Option<usize>,
    ctx: &ValidationContext<'_>,
) -> bool {
    fields
        .iter()
        .zip(widgets.iter_mut())
        .zip(states.iter_mut())
        .enumerate()
        .fold(true, |all_valid, (index, ((field, widget), state))| {
            let outcome = validate_one(field, index, widget, state, button, ctx);
            all_valid && outcome.valid
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{FieldView, MemoryWidget};
    use crate::field::FieldKind;
    use regex::Regex;

    const CTX: ValidationContext<'static> = ValidationContext {
        cancel_button: Some(1),
        error_message: "Invalid input entered.",
    };

    fn widget(value: &str) -> MemoryWidget {
        MemoryWidget::for_field(&FieldView {
            index: 0,
            label: "Field",
            kind: FieldKind::Text,
            options: &[],
            initial_value: value,
        })
    }

    fn check(field: &FieldSpec, w: &mut MemoryWidget, button: Option<usize>) -> FieldOutcome {
        let mut state = FieldErrorState::default();
        validate_one(field, 0, w, &mut state, button, &CTX)
    }

    #[test]
    fn test_whitespace_only_fails_required_with_trim() {
        let field = FieldSpec::new("Name").required(true).trim(true);
        let mut w = widget("   ");
        let outcome = check(&field, &mut w, Some(0));
        assert!(!outcome.valid);
        assert_eq!(outcome.error.as_deref(), Some("Invalid input entered."));
        assert_eq!(w.error(), Some("Invalid input entered."));
        assert_eq!(w.value(), "");
    }

    #[test]
    fn test_whitespace_without_trim_passes_required() {
        let field = FieldSpec::new("Name").required(true);
        let mut w = widget("   ");
        assert!(check(&field, &mut w, Some(0)).valid);
    }

    #[test]
    fn test_cancel_button_skips_required() {
        let field = FieldSpec::new("Name").required(true);
        let mut w = widget("");
        assert!(check(&field, &mut w, Some(1)).valid);
        assert!(!check(&field, &mut w, Some(0)).valid);
        assert!(!check(&field, &mut w, None).valid);
    }

    #[test]
    fn test_no_cancel_button_never_bypasses() {
        let ctx = ValidationContext {
            cancel_button: None,
            error_message: "bad",
        };
        let field = FieldSpec::new("Name").required(true);
        let mut w = widget("");
        let mut state = FieldErrorState::default();
        assert!(!validate_one(&field, 0, &mut w, &mut state, None, &ctx).valid);
        assert_eq!(state.message(), Some("bad"));
    }

    #[test]
    fn test_required_pattern() {
        let field = FieldSpec::new("Zip").required(Regex::new(r"^\d{5}$").unwrap());
        let mut w = widget("1234");
        assert!(!check(&field, &mut w, Some(0)).valid);
        w.set_value("12345");
        assert!(check(&field, &mut w, Some(0)).valid);
        assert!(w.error().is_none());
    }

    #[test]
    fn test_custom_validator_runs_for_cancel_button() {
        let field = FieldSpec::new("Code").required(true).validate(|value, _, _, err| {
            err.set("never valid");
            value.to_string()
        });
        let mut w = widget("");
        let outcome = check(&field, &mut w, Some(1));
        assert!(!outcome.valid);
        assert_eq!(outcome.error.as_deref(), Some("never valid"));
    }

    #[test]
    fn test_custom_validator_normalizes_value() {
        let field = FieldSpec::new("Tag")
            .trim(true)
            .validate(|value, _, _, _| value.to_uppercase());
        let mut w = widget("  rust ");
        let outcome = check(&field, &mut w, None);
        assert!(outcome.valid);
        assert_eq!(outcome.value, "RUST");
        assert_eq!(w.value(), "RUST");
    }

    #[test]
    fn test_custom_validator_sees_arguments_and_required_verdict() {
        let field = FieldSpec::new("Name")
            .required(true)
            .validate(|value, index, button, err| {
                assert_eq!(index, 4);
                assert_eq!(button, Some(0));
                assert!(err.is_set());
                format!("{value}!")
            });
        let mut w = widget("");
        let mut state = FieldErrorState::default();
        let outcome = validate_one(&field, 4, &mut w, &mut state, Some(0), &CTX);
        assert!(!outcome.valid);
        assert_eq!(w.value(), "!");
    }

    #[test]
    fn test_custom_validator_can_clear_required_error() {
        let field = FieldSpec::new("Name").required(true).validate(|_, _, _, err| {
            err.set(false);
            "filled in".to_string()
        });
        let mut w = widget("");
        assert!(check(&field, &mut w, Some(0)).valid);
    }

    #[test]
    fn test_field_error_message_takes_precedence() {
        let field = FieldSpec::new("Name")
            .required(true)
            .error_message("Name is required");
        let mut w = widget("");
        assert_eq!(
            check(&field, &mut w, None).error.as_deref(),
            Some("Name is required")
        );
    }

    #[test]
    fn test_validate_all_checks_every_field() {
        let fields = vec![
            FieldSpec::new("A").required(true),
            FieldSpec::new("B").required(true),
            FieldSpec::new("C"),
        ];
        let mut widgets = vec![widget(""), widget(""), widget("x")];
        let mut states = vec![FieldErrorState::default(); 3];

        assert!(!validate_all(&fields, &mut widgets, &mut states, Some(0), &CTX));
        assert!(states[0].is_invalid());
        assert!(states[1].is_invalid());
        assert!(!states[2].is_invalid());

        widgets[0].set_value("a");
        widgets[1].set_value("b");
        assert!(validate_all(&fields, &mut widgets, &mut states, Some(0), &CTX));
        assert!(states.iter().all(|s| !s.is_invalid()));
    }
}
