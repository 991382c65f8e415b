//! The console prompt loop.
//!
//! Reads answers line by line and turns them into popup triggers: field
//! edits, focus loss and button presses. End of input closes the popup
//! without a button.

use std::io::{self, BufRead, Write};

use popup::{Popup, RenderBridge, Resolution};
use tracing::debug;

use crate::console::ConsoleDialog;

/// Drives a popup from `input` until it closes, writing prompts to `out`.
///
/// # Errors
///
/// Returns an error if reading an answer or writing a prompt fails. The
/// popup is closed before the error is returned.
pub fn drive<B, R, W>(popup: &Popup<B>, input: R, mut out: W) -> io::Result<()>
where
    B: RenderBridge<Dialog = ConsoleDialog>,
    R: BufRead,
    W: Write,
{
    let Some(dialog) = popup.with_visuals(|_, dialog| dialog.cloned()) else {
        return Ok(());
    };
    let mut lines = input.lines();

    let result = run(popup, &dialog, &mut lines, &mut out);
    if result.is_err() {
        popup.close(None);
    }
    result
}

fn run<B, I, W>(popup: &Popup<B>, dialog: &ConsoleDialog, lines: &mut I, out: &mut W) -> io::Result<()>
where
    B: RenderBridge,
    I: Iterator<Item = io::Result<String>>,
    W: Write,
{
    while popup.is_open() {
        for (index, label) in dialog.labels.iter().enumerate() {
            let current = popup.value(index).unwrap_or_default();
            write!(out, "{label} [{current}]: ")?;
            out.flush()?;

            let Some(answer) = lines.next().transpose()? else {
                end_of_input(popup);
                return Ok(());
            };
            if !answer.is_empty() && !popup.input(index, &answer) {
                return Ok(());
            }
            if popup.blur(index) == Some(false) {
                report_error(popup, index, label, out)?;
            }
        }

        let Some(button) = ask_button(dialog, lines, out)? else {
            end_of_input(popup);
            return Ok(());
        };
        match popup.press(button) {
            Resolution::Rejected => {
                writeln!(out, "Please correct the following:")?;
                for (index, label) in dialog.labels.iter().enumerate() {
                    report_error(popup, index, label, out)?;
                }
            }
            Resolution::Closed { .. } | Resolution::Ignored => return Ok(()),
        }
    }
    Ok(())
}

/// Asks for a button until the answer names one. Returns `None` at end of
/// input.
fn ask_button<I, W>(dialog: &ConsoleDialog, lines: &mut I, out: &mut W) -> io::Result<Option<usize>>
where
    I: Iterator<Item = io::Result<String>>,
    W: Write,
{
    let choices = dialog
        .buttons
        .iter()
        .enumerate()
        .map(|(i, label)| format!("[{}] {label}", i + 1))
        .collect::<Vec<_>>()
        .join("  ");

    loop {
        write!(out, "{choices}: ")?;
        out.flush()?;
        let Some(answer) = lines.next().transpose()? else {
            return Ok(None);
        };
        match parse_button(&dialog.buttons, dialog.default_button, &answer) {
            Some(index) => return Ok(Some(index)),
            None => writeln!(out, "No button \"{}\".", answer.trim())?,
        }
    }
}

/// Resolves an answer to a button index: a 1-based number, a label
/// (case-insensitive), or the default button for an empty answer.
pub fn parse_button(buttons: &[String], default_button: usize, answer: &str) -> Option<usize> {
    let answer = answer.trim();
    if answer.is_empty() {
        return (default_button < buttons.len()).then_some(default_button);
    }
    if let Ok(number) = answer.parse::<usize>() {
        return (1..=buttons.len()).contains(&number).then(|| number - 1);
    }
    buttons
        .iter()
        .position(|label| label.eq_ignore_ascii_case(answer))
}

fn report_error<B, W>(popup: &Popup<B>, index: usize, label: &str, out: &mut W) -> io::Result<()>
where
    B: RenderBridge,
    W: Write,
{
    if let Some(Some(message)) = popup.field_errors().get(index) {
        writeln!(out, "  {label}: {message}")?;
    }
    Ok(())
}

fn end_of_input<B: RenderBridge>(popup: &Popup<B>) {
    debug!("end of input, closing popup");
    popup.close(None);
}
