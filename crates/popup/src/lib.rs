#![forbid(unsafe_code)]
// Allow pedantic lints for early-stage API ergonomics.
#![allow(clippy::nursery)]
#![allow(clippy::pedantic)]

//! # Popup
//!
//! Modal prompts that block the rest of a host surface until they resolve to
//! exactly one outcome.
//!
//! A popup shows either a plain message or a list of labeled fields, a row of
//! buttons, and optionally arms an auto-dismiss timer. It resolves to a
//! [`TerminationEvent`]: which button closed it, whether it timed out, and
//! the final field values.
//!
//! Popup provides:
//! - Text, text area, select and multi-select fields
//! - Required checks, regex requirements, trimming and custom validators
//! - A cancel button that bypasses required checks
//! - Exactly-once termination shared by buttons, timers and code
//! - Declarative popup documents in TOML or JSON
//!
//! Drawing is left to a [`RenderBridge`]. [`MemoryBridge`] keeps everything
//! in memory and is what tests and headless hosts use.
//!
//! ## Example
//!
//! ```rust
//! use popup::{FieldSpec, MemoryBridge, Popup, PopupConfig, Resolution};
//!
//! let config = PopupConfig::fields(vec![
//!     FieldSpec::new("Name").id("name").required(true).trim(true),
//! ])
//! .buttons(["Save", "Cancel"])
//! .cancel_button(1);
//!
//! let popup = Popup::open(config, MemoryBridge::new())?;
//!
//! // Required field is empty: the click is rejected.
//! assert_eq!(popup.press(0), Resolution::Rejected);
//!
//! popup.input(0, "  Ada  ");
//! assert_eq!(popup.press(0), Resolution::Closed { reported: true });
//!
//! let event = popup.take_outcome().unwrap();
//! assert_eq!(event.button_index(), Some(0));
//! assert_eq!(event.values().unwrap().id("name"), Some("Ada"));
//! # Ok::<(), popup::PopupError>(())
//! ```

use thiserror::Error;

pub mod bridge;
pub mod config;
pub mod document;
pub mod field;
pub mod session;
pub mod timer;
pub mod validate;
pub mod values;

pub use bridge::{
    BridgeCall, DialogSurface, FieldView, FieldWidget, Journal, MemoryBridge, MemoryDialog,
    MemoryOverlay, MemoryWidget, OverlayStyle, RenderBridge,
};
pub use config::{
    DEFAULT_ERROR_MESSAGE, DEFAULT_OVERLAY_BACKGROUND, DEFAULT_Z_INDEX, DoneFn, OverlayClickFn,
    PopupConfig, PopupDefaults,
};
pub use document::{FieldDocument, OptionDocument, PopupDocument, RuleDocument};
pub use field::{
    ErrorSlot, FieldKind, FieldSpec, Requirement, SelectOption, Trim, ValidateFn, Verdict,
    stringify,
};
pub use session::{Closer, Popup, Resolution, TIMEOUT_INDEX, TerminationEvent, Trigger};
pub use timer::{ManualScheduler, Scheduler, ThreadScheduler, TimerHandle};
#[cfg(feature = "tokio")]
pub use timer::TokioScheduler;
pub use validate::{FieldErrorState, FieldOutcome};
pub use values::{FieldValues, ResultKey};

// -----------------------------------------------------------------------------
// Errors
// -----------------------------------------------------------------------------

/// Errors that can occur while building a popup.
///
/// Every variant is a programmer error detected before anything is drawn.
/// Invalid user input is never reported through this type: it lives in the
/// per-field error state of an open popup and blocks closing instead.
///
/// | Error Variant | Raised by |
/// |--------------|-----------|
/// | [`InvalidFieldKind`](PopupError::InvalidFieldKind) | [`Popup::open`] |
/// | [`MissingOptions`](PopupError::MissingOptions) | [`Popup::open`] |
/// | [`InvalidPattern`](PopupError::InvalidPattern) | [`PopupDocument::into_config`] |
/// | [`Document`](PopupError::Document) | [`PopupDocument`] parsing |
/// | [`Io`](PopupError::Io) | [`PopupDocument::from_path`] |
///
/// # Note on Clone and PartialEq
///
/// Payloads are stored as strings so the type stays `Clone` and `PartialEq`
/// for testing, as with the `Io` variant which keeps only the message of the
/// underlying `io::Error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PopupError {
    /// A field declared a kind string that is not one of `TEXT`,
    /// `TEXTAREA[:rows]`, `SELECT[:size]` or `MULTI-SELECT[:size]`.
    #[error("field {index}: \"{kind}\" is an invalid popup input type")]
    InvalidFieldKind {
        /// Position of the offending field.
        index: usize,
        /// The kind string as given.
        kind: String,
    },

    /// A select or multi-select field was declared without options.
    #[error("field {index}: options must be given for popup inputs of type \"{kind}\"")]
    MissingOptions {
        /// Position of the offending field.
        index: usize,
        /// The kind string as given.
        kind: String,
    },

    /// A `required` or `trim` pattern in a document failed to compile.
    #[error("invalid pattern \"{pattern}\": {reason}")]
    InvalidPattern {
        /// The pattern source.
        pattern: String,
        /// Why the regex engine rejected it.
        reason: String,
    },

    /// A popup document could not be decoded.
    #[error("document error: {0}")]
    Document(String),

    /// A popup document could not be read.
    #[error("io error: {0}")]
    Io(String),
}

impl PopupError {
    /// Creates a document error with the given message.
    pub fn document(message: impl Into<String>) -> Self {
        Self::Document(message.into())
    }

    /// Creates an IO error with the given message.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Returns true if this error was raised while building a popup from a
    /// configuration.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFieldKind { .. } | Self::MissingOptions { .. }
        )
    }

    /// Returns true if this error came from loading a popup document.
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPattern { .. } | Self::Document(_) | Self::Io(_)
        )
    }
}

impl From<std::io::Error> for PopupError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// A specialized [`Result`] type for popup operations.
pub type Result<T> = std::result::Result<T, PopupError>;

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
