//! A line-oriented render bridge.
//!
//! Draws the dialog as plain text on a writer (stderr for the binary) and
//! keeps field values in [`MemoryWidget`]s, which the prompt loop edits
//! through [`Popup::input`](popup::Popup::input).

use std::io::Write;

use popup::{DialogSurface, FieldKind, FieldView, MemoryWidget, OverlayStyle, RenderBridge};
use tracing::warn;

/// The dialog as drawn on the console.
#[derive(Debug, Clone, Default)]
pub struct ConsoleDialog {
    /// Field labels, in order.
    pub labels: Vec<String>,
    /// Button labels, in order.
    pub buttons: Vec<String>,
    /// Index of the button chosen by an empty answer.
    pub default_button: usize,
}

/// Renders popups as text on a writer.
pub struct ConsoleBridge<W> {
    out: W,
}

impl<W: Write + Send + 'static> ConsoleBridge<W> {
    /// Creates a bridge drawing on `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn line(&mut self, text: &str) {
        if let Err(err) = writeln!(self.out, "{text}") {
            warn!(error = %err, "failed to draw popup");
        }
    }
}

impl<W: Write + Send + 'static> RenderBridge for ConsoleBridge<W> {
    type Overlay = ();
    type Dialog = ConsoleDialog;
    type Widget = MemoryWidget;

    fn create_overlay(&mut self, _style: &OverlayStyle) {}

    fn create_dialog(&mut self, surface: &DialogSurface<'_>) -> ConsoleDialog {
        self.line("");
        if let Some(title) = surface.title {
            self.line(&format!("== {title} =="));
        }
        ConsoleDialog {
            labels: Vec::new(),
            buttons: surface.buttons.to_vec(),
            default_button: surface.default_button,
        }
    }

    fn render_message(&mut self, _dialog: &mut ConsoleDialog, text: &str) {
        for line in text.lines() {
            self.line(line);
        }
    }

    fn render_field(&mut self, dialog: &mut ConsoleDialog, field: &FieldView<'_>) -> MemoryWidget {
        dialog.labels.push(field.label.to_string());
        match field.kind {
            FieldKind::Text | FieldKind::TextArea { .. } => {
                self.line(&format!("{}. {}", field.index + 1, field.label));
            }
            FieldKind::Select { .. } | FieldKind::MultiSelect { .. } => {
                self.line(&format!("{}. {} ({})", field.index + 1, field.label, field.kind));
                for option in field.options {
                    let mark = if option.selected { '*' } else { '-' };
                    self.line(&format!("   {mark} {} = {}", option.text, option.value));
                }
            }
        }
        MemoryWidget::for_field(field)
    }

    fn teardown(&mut self, _overlay: (), _dialog: ConsoleDialog) {
        self.line("");
    }
}
