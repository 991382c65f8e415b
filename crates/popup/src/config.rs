//! Popup configuration.
//!
//! [`PopupConfig`] is the immutable input to [`Popup::open`](crate::Popup::open).
//! It is built with consuming builder methods; every option has a default
//! taken from [`PopupDefaults`].
//!
//! # Examples
//!
//! ```rust
//! use popup::{FieldSpec, PopupConfig};
//! use std::time::Duration;
//!
//! let config = PopupConfig::message("Discard changes?")
//!     .title("Unsaved work")
//!     .buttons(["Discard", "Keep editing"])
//!     .default_button(1)
//!     .timeout(Duration::from_secs(30));
//!
//! let form = PopupConfig::fields(vec![
//!     FieldSpec::new("Email").id("email").required(true).trim(true),
//! ])
//! .unindexed_results(true);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::field::FieldSpec;
use crate::session::{Closer, TerminationEvent};

/// Message shown for an invalid field without a more specific message.
pub const DEFAULT_ERROR_MESSAGE: &str = "Invalid input entered.";

/// Stacking order used when none is configured (`2^31 - 1`).
pub const DEFAULT_Z_INDEX: i32 = i32::MAX;

/// Overlay fill used when none is configured.
pub const DEFAULT_OVERLAY_BACKGROUND: &str = "rgba(0,0,0,0.8)";

/// Completion callback, invoked at most once per popup.
pub type DoneFn = Box<dyn FnOnce(TerminationEvent) + Send>;

/// Overlay click callback, invoked every time the host reports a click on
/// the overlay while the popup is open.
pub type OverlayClickFn = Arc<dyn Fn(&Closer) + Send + Sync>;

// -----------------------------------------------------------------------------
// Defaults
// -----------------------------------------------------------------------------

/// Fallback values for options a [`PopupConfig`] leaves unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupDefaults {
    /// Button labels.
    pub buttons: Vec<String>,
    /// Index of the initially focused button.
    pub default_button: usize,
    /// Stacking order of overlay and dialog.
    pub z_index: i32,
    /// Overlay fill.
    pub overlay_background: String,
    /// Message for invalid fields.
    pub error_message: String,
}

impl Default for PopupDefaults {
    fn default() -> Self {
        Self {
            buttons: vec!["OK".to_string()],
            default_button: 0,
            z_index: DEFAULT_Z_INDEX,
            overlay_background: DEFAULT_OVERLAY_BACKGROUND.to_string(),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
        }
    }
}

// -----------------------------------------------------------------------------
// PopupConfig
// -----------------------------------------------------------------------------

/// Configuration of a single popup.
///
/// A popup shows either a message or fields. When both are set the message
/// wins and the fields are ignored; an empty message counts as unset. When
/// neither is set the popup shows an empty message.
pub struct PopupConfig {
    pub(crate) title: Option<String>,
    pub(crate) message: Option<String>,
    pub(crate) fields: Option<Vec<FieldSpec>>,
    pub(crate) buttons: Vec<String>,
    pub(crate) default_button: Option<usize>,
    pub(crate) cancel_button: Option<usize>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) unindexed_results: bool,
    pub(crate) z_index: Option<i32>,
    pub(crate) overlay_background: Option<String>,
    pub(crate) error_message: Option<String>,
    pub(crate) defaults: PopupDefaults,
    pub(crate) on_done: Option<DoneFn>,
    pub(crate) on_overlay_click: Option<OverlayClickFn>,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PopupConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self {
            title: None,
            message: None,
            fields: None,
            buttons: Vec::new(),
            default_button: None,
            cancel_button: None,
            timeout: None,
            unindexed_results: false,
            z_index: None,
            overlay_background: None,
            error_message: None,
            defaults: PopupDefaults::default(),
            on_done: None,
            on_overlay_click: None,
        }
    }

    /// Creates a message popup.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new().with_message(message)
    }

    /// Creates a fields popup.
    pub fn fields(fields: Vec<FieldSpec>) -> Self {
        Self::new().with_fields(fields)
    }

    /// Creates an alert: a message with a single OK button.
    pub fn alert(message: impl Into<String>) -> Self {
        Self::message(message).buttons(["OK"])
    }

    /// Creates a confirmation: a message with OK and Cancel, Cancel being
    /// the cancel button.
    pub fn confirm(message: impl Into<String>) -> Self {
        Self::message(message)
            .buttons(["OK", "Cancel"])
            .cancel_button(1)
    }

    /// Creates a prompt: one text field with OK and Cancel, Cancel being the
    /// cancel button.
    pub fn prompt(message: impl Into<String>, initial: impl Into<String>) -> Self {
        Self::fields(vec![FieldSpec::new(message).value(initial)])
            .buttons(["OK", "Cancel"])
            .cancel_button(1)
    }

    /// Sets the message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the fields.
    pub fn with_fields(mut self, fields: Vec<FieldSpec>) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Sets the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the button labels. An empty list falls back to the defaults.
    pub fn buttons<I, S>(mut self, buttons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.buttons = buttons.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the index of the initially focused button.
    pub fn default_button(mut self, index: usize) -> Self {
        self.default_button = Some(index);
        self
    }

    /// Sets the button that closes the popup even when required fields are
    /// empty.
    pub fn cancel_button(mut self, index: usize) -> Self {
        self.cancel_button = Some(index);
        self
    }

    /// Sets the auto-dismiss timeout. A zero duration disables the timer.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the auto-dismiss timeout in milliseconds.
    pub fn timeout_ms(self, millis: u64) -> Self {
        self.timeout(Duration::from_millis(millis))
    }

    /// Sets whether fields with an id are reported only under that id.
    ///
    /// When set, positional entries are left out of the result entirely,
    /// so fields without an id are not reported.
    pub fn unindexed_results(mut self, unindexed: bool) -> Self {
        self.unindexed_results = unindexed;
        self
    }

    /// Sets the stacking order.
    pub fn z_index(mut self, z_index: i32) -> Self {
        self.z_index = Some(z_index);
        self
    }

    /// Sets the overlay fill.
    pub fn overlay_background(mut self, background: impl Into<String>) -> Self {
        self.overlay_background = Some(background.into());
        self
    }

    /// Overrides the default error message for every field of this popup.
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Replaces the defaults used for unset options.
    pub fn defaults(mut self, defaults: PopupDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Sets the completion callback.
    pub fn on_done<F>(mut self, on_done: F) -> Self
    where
        F: FnOnce(TerminationEvent) + Send + 'static,
    {
        self.on_done = Some(Box::new(on_done));
        self
    }

    /// Sets the overlay click callback.
    pub fn on_overlay_click<F>(mut self, on_click: F) -> Self
    where
        F: Fn(&Closer) + Send + Sync + 'static,
    {
        self.on_overlay_click = Some(Arc::new(on_click));
        self
    }

    /// Returns true if the popup will show fields rather than a message.
    pub fn has_fields(&self) -> bool {
        self.shown_message().is_none() && self.fields.is_some()
    }

    /// The message the popup shows instead of its fields, if any.
    pub(crate) fn shown_message(&self) -> Option<&str> {
        self.message.as_deref().filter(|message| !message.is_empty())
    }

    /// Returns the labels of the buttons the popup will show.
    pub fn resolved_buttons(&self) -> Vec<String> {
        if self.buttons.is_empty() {
            self.defaults.buttons.clone()
        } else {
            self.buttons.clone()
        }
    }

    /// Returns the labels of the fields the popup will show.
    pub fn field_labels(&self) -> Vec<String> {
        match (self.shown_message(), &self.fields) {
            (None, Some(fields)) => fields.iter().map(|f| f.message.clone()).collect(),
            _ => Vec::new(),
        }
    }

    /// Returns the effective timeout, if a timer will be armed.
    pub fn resolved_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|timeout| !timeout.is_zero())
    }

    /// Returns the cancel button index.
    pub fn get_cancel_button(&self) -> Option<usize> {
        self.cancel_button
    }

    /// Checks the field declarations without opening a popup.
    ///
    /// # Errors
    ///
    /// Returns the error [`Popup::open`](crate::Popup::open) would return.
    pub fn check(&self) -> crate::Result<()> {
        if !self.has_fields() {
            return Ok(());
        }
        for (index, field) in self.fields.iter().flatten().enumerate() {
            field.resolve_kind(index)?;
        }
        Ok(())
    }

    pub(crate) fn resolved_error_message(&self) -> String {
        self.error_message
            .clone()
            .unwrap_or_else(|| self.defaults.error_message.clone())
    }
}

impl fmt::Debug for PopupConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopupConfig")
            .field("title", &self.title)
            .field("message", &self.message)
            .field("fields", &self.fields)
            .field("buttons", &self.buttons)
            .field("default_button", &self.default_button)
            .field("cancel_button", &self.cancel_button)
            .field("timeout", &self.timeout)
            .field("unindexed_results", &self.unindexed_results)
            .field("z_index", &self.z_index)
            .field("overlay_background", &self.overlay_background)
            .field("error_message", &self.error_message)
            .field("defaults", &self.defaults)
            .field("on_done", &self.on_done.as_ref().map(|_| "<fn>"))
            .field(
                "on_overlay_click",
                &self.on_overlay_click.as_ref().map(|_| "<fn>"),
            )
            .finish()
    }
}
