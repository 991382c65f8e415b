//! The render bridge contract and an in-memory implementation.
//!
//! A popup never draws anything itself. It asks a [`RenderBridge`] for an
//! overlay, a dialog surface and one widget per field, and hands them back
//! for teardown when the session closes. Hosts wire their own input events
//! to [`Popup::press`](crate::Popup::press), [`Popup::blur`](crate::Popup::blur)
//! and [`Popup::input`](crate::Popup::input).

use std::sync::Arc;

use parking_lot::Mutex;

use crate::field::{FieldKind, SelectOption};

// -----------------------------------------------------------------------------
// Contract
// -----------------------------------------------------------------------------

/// How the overlay that blocks the host surface should look.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayStyle {
    /// Stacking order of the overlay and the dialog.
    pub z_index: i32,
    /// Overlay fill, as a CSS-like color string.
    pub background: String,
}

/// What the dialog surface must show around its content.
#[derive(Debug, Clone, Copy)]
pub struct DialogSurface<'a> {
    /// Optional title above the content.
    pub title: Option<&'a str>,
    /// Button labels, in order. Never empty.
    pub buttons: &'a [String],
    /// Index of the button that should receive initial focus.
    pub default_button: usize,
    /// Stacking order of the dialog.
    pub z_index: i32,
}

/// Everything a bridge needs to build one field widget.
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    /// Position of the field.
    pub index: usize,
    /// Label shown above the widget.
    pub label: &'a str,
    /// Widget type.
    pub kind: FieldKind,
    /// Options of a select or multi-select field, empty otherwise.
    pub options: &'a [SelectOption],
    /// Initial text of a text or text area field.
    pub initial_value: &'a str,
}

/// A live input widget created by a bridge.
pub trait FieldWidget: Send {
    /// Returns the current value.
    fn value(&self) -> String;

    /// Replaces the current value.
    fn set_value(&mut self, value: &str);

    /// Shows the error indicator with the given tooltip text.
    fn show_error(&mut self, message: &str);

    /// Hides the error indicator.
    fn clear_error(&mut self);
}

/// The visual construction capability a popup depends on.
pub trait RenderBridge: Send + 'static {
    /// Handle to the overlay covering the host surface.
    type Overlay: Send;
    /// Handle to the dialog surface.
    type Dialog: Send;
    /// Handle to a field widget.
    type Widget: FieldWidget;

    /// Creates the overlay that blocks the host surface.
    fn create_overlay(&mut self, style: &OverlayStyle) -> Self::Overlay;

    /// Creates the dialog surface with its title and buttons.
    fn create_dialog(&mut self, surface: &DialogSurface<'_>) -> Self::Dialog;

    /// Renders a plain message into the dialog.
    fn render_message(&mut self, dialog: &mut Self::Dialog, text: &str);

    /// Renders a field's label, error indicator and widget into the dialog.
    fn render_field(&mut self, dialog: &mut Self::Dialog, field: &FieldView<'_>) -> Self::Widget;

    /// Removes the overlay and the dialog.
    fn teardown(&mut self, overlay: Self::Overlay, dialog: Self::Dialog);
}

// -----------------------------------------------------------------------------
// Memory Bridge
// -----------------------------------------------------------------------------

/// A call recorded by [`MemoryBridge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCall {
    /// An overlay was created.
    CreateOverlay {
        /// Overlay id.
        id: usize,
        /// Requested look.
        style: OverlayStyle,
    },
    /// A dialog surface was created.
    CreateDialog {
        /// Dialog id.
        id: usize,
        /// Title, if any.
        title: Option<String>,
        /// Button labels.
        buttons: Vec<String>,
        /// Initially focused button.
        default_button: usize,
    },
    /// A message was rendered.
    RenderMessage {
        /// Dialog id.
        dialog: usize,
        /// Message text.
        text: String,
    },
    /// A field was rendered.
    RenderField {
        /// Dialog id.
        dialog: usize,
        /// Field position.
        index: usize,
        /// Field kind.
        kind: FieldKind,
    },
    /// Overlay and dialog were removed.
    Teardown {
        /// Overlay id.
        overlay: usize,
        /// Dialog id.
        dialog: usize,
    },
}

/// Shared, cloneable view of the calls a [`MemoryBridge`] received.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    calls: Arc<Mutex<Vec<BridgeCall>>>,
}

impl Journal {
    fn record(&self, call: BridgeCall) {
        self.calls.lock().push(call);
    }

    /// Returns a copy of all recorded calls.
    pub fn calls(&self) -> Vec<BridgeCall> {
        self.calls.lock().clone()
    }

    /// Returns how many teardowns happened.
    pub fn teardowns(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, BridgeCall::Teardown { .. }))
            .count()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}

/// Overlay handle of a [`MemoryBridge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryOverlay {
    /// Overlay id.
    pub id: usize,
    /// Requested look.
    pub style: OverlayStyle,
}

/// Dialog handle of a [`MemoryBridge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDialog {
    /// Dialog id.
    pub id: usize,
    /// Title, if any.
    pub title: Option<String>,
    /// Button labels.
    pub buttons: Vec<String>,
    /// Initially focused button.
    pub default_button: usize,
    /// Message text, for message-mode popups.
    pub message: Option<String>,
    /// Field labels, for fields-mode popups.
    pub labels: Vec<String>,
}

/// Field widget of a [`MemoryBridge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryWidget {
    kind: FieldKind,
    value: String,
    error: Option<String>,
}

impl MemoryWidget {
    /// Creates a widget for a field, starting from its initial value.
    ///
    /// Selection widgets start at their first selected option. A single
    /// select without a selected option starts at its first option; a
    /// multi-select starts empty.
    pub fn for_field(field: &FieldView<'_>) -> Self {
        let value = match field.kind {
            FieldKind::Text | FieldKind::TextArea { .. } => field.initial_value.to_string(),
            FieldKind::Select { .. } => field
                .options
                .iter()
                .find(|option| option.selected)
                .or_else(|| field.options.first())
                .map(|option| option.value.clone())
                .unwrap_or_default(),
            FieldKind::MultiSelect { .. } => field
                .options
                .iter()
                .find(|option| option.selected)
                .map(|option| option.value.clone())
                .unwrap_or_default(),
        };
        Self {
            kind: field.kind,
            value,
            error: None,
        }
    }

    /// Returns the widget kind.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Returns the error indicator's tooltip, if it is shown.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl FieldWidget for MemoryWidget {
    fn value(&self) -> String {
        self.value.clone()
    }

    fn set_value(&mut self, value: &str) {
        self.value = value.to_string();
    }

    fn show_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }

    fn clear_error(&mut self) {
        self.error = None;
    }
}

/// A render bridge that keeps everything in memory.
///
/// Every call is appended to a [`Journal`] that stays readable after the
/// bridge has been moved into a popup.
///
/// # Example
///
/// ```rust
/// use popup::{BridgeCall, MemoryBridge, Popup, PopupConfig};
///
/// let bridge = MemoryBridge::new();
/// let journal = bridge.journal();
///
/// let popup = Popup::open(PopupConfig::alert("Saved."), bridge)?;
/// popup.press(0);
///
/// assert_eq!(journal.teardowns(), 1);
/// assert!(matches!(journal.calls()[2], BridgeCall::RenderMessage { .. }));
/// # Ok::<(), popup::PopupError>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryBridge {
    next_id: usize,
    journal: Journal,
}

impl MemoryBridge {
    /// Creates a new bridge with an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the call journal.
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    fn next_id(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }
}

impl RenderBridge for MemoryBridge {
    type Overlay = MemoryOverlay;
    type Dialog = MemoryDialog;
    type Widget = MemoryWidget;

    fn create_overlay(&mut self, style: &OverlayStyle) -> MemoryOverlay {
        let id = self.next_id();
        self.journal.record(BridgeCall::CreateOverlay {
            id,
            style: style.clone(),
        });
        MemoryOverlay {
            id,
            style: style.clone(),
        }
    }

    fn create_dialog(&mut self, surface: &DialogSurface<'_>) -> MemoryDialog {
        let id = self.next_id();
        let title = surface.title.map(str::to_string);
        let buttons = surface.buttons.to_vec();
        self.journal.record(BridgeCall::CreateDialog {
            id,
            title: title.clone(),
            buttons: buttons.clone(),
            default_button: surface.default_button,
        });
        MemoryDialog {
            id,
            title,
            buttons,
            default_button: surface.default_button,
            message: None,
            labels: Vec::new(),
        }
    }

    fn render_message(&mut self, dialog: &mut MemoryDialog, text: &str) {
        self.journal.record(BridgeCall::RenderMessage {
            dialog: dialog.id,
            text: text.to_string(),
        });
        dialog.message = Some(text.to_string());
    }

    fn render_field(&mut self, dialog: &mut MemoryDialog, field: &FieldView<'_>) -> MemoryWidget {
        self.journal.record(BridgeCall::RenderField {
            dialog: dialog.id,
            index: field.index,
            kind: field.kind,
        });
        dialog.labels.push(field.label.to_string());
        MemoryWidget::for_field(field)
    }

    fn teardown(&mut self, overlay: MemoryOverlay, dialog: MemoryDialog) {
        self.journal.record(BridgeCall::Teardown {
            overlay: overlay.id,
            dialog: dialog.id,
        });
    }
}
