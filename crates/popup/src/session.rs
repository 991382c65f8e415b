//! Popup sessions and the termination protocol.
//!
//! A session goes from open to closed exactly once. Three triggers race to
//! close it:
//!
//! | Trigger | Validates with | Tears down when | Reports when |
//! |---------|----------------|-----------------|--------------|
//! | [`Popup::press`] | the pressed button | fields are valid | fields are valid |
//! | timer expiry | no button | always | fields are valid |
//! | [`Popup::close`] | the given button, if any | always | always |
//!
//! Every trigger after the one that closed the session is ignored. A timer
//! expiry with invalid fields closes the popup without reporting a result.

use std::cell::RefCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, info, warn};

use crate::bridge::{DialogSurface, FieldView, FieldWidget, OverlayStyle, RenderBridge};
use crate::config::{DoneFn, OverlayClickFn, PopupConfig};
use crate::field::{FieldKind, FieldSpec};
use crate::timer::{Scheduler, ThreadScheduler, TimerHandle};
use crate::validate::{self, FieldErrorState, ValidationContext};
use crate::values::{FieldValues, collect_values};

/// Button index reported when a popup timed out.
pub const TIMEOUT_INDEX: isize = -1;

// -----------------------------------------------------------------------------
// Triggers and Events
// -----------------------------------------------------------------------------

/// What attempted to close a popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The user activated the button at this index.
    Button(usize),
    /// The auto-dismiss timer expired.
    Timeout,
    /// Code closed the popup, optionally on behalf of a button.
    Close(Option<usize>),
}

impl Trigger {
    /// Returns the reported button index: the button's index,
    /// [`TIMEOUT_INDEX`] for a timeout, or the index given to a
    /// programmatic close.
    pub fn button_index(&self) -> Option<isize> {
        match self {
            Self::Button(index) => Some(*index as isize),
            Self::Timeout => Some(TIMEOUT_INDEX),
            Self::Close(index) => index.map(|index| index as isize),
        }
    }

    /// Returns `Some(false)` for a button, `Some(true)` for a timeout and
    /// `None` for a programmatic close.
    pub fn timed_out(&self) -> Option<bool> {
        match self {
            Self::Button(_) => Some(false),
            Self::Timeout => Some(true),
            Self::Close(_) => None,
        }
    }

    /// Returns the button index field validation runs with.
    pub fn validation_button(&self) -> Option<usize> {
        match self {
            Self::Button(index) => Some(*index),
            Self::Timeout => None,
            Self::Close(index) => *index,
        }
    }
}

/// The outcome a popup reports when it closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationEvent {
    trigger: Trigger,
    values: Option<FieldValues>,
}

impl TerminationEvent {
    /// Returns what closed the popup.
    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    /// See [`Trigger::button_index`].
    pub fn button_index(&self) -> Option<isize> {
        self.trigger.button_index()
    }

    /// See [`Trigger::timed_out`].
    pub fn timed_out(&self) -> Option<bool> {
        self.trigger.timed_out()
    }

    /// Returns the field values, present only for fields-mode popups.
    pub fn values(&self) -> Option<&FieldValues> {
        self.values.as_ref()
    }

    /// Consumes the event and returns the field values.
    pub fn into_values(self) -> Option<FieldValues> {
        self.values
    }
}

impl Serialize for TerminationEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("button", &self.button_index())?;
        map.serialize_entry("timed_out", &self.timed_out())?;
        if let Some(values) = &self.values {
            map.serialize_entry("values", values)?;
        }
        map.end()
    }
}

/// How a popup handled a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The popup was already closed, or the trigger did not apply.
    Ignored,
    /// A button press was refused because a field is invalid.
    Rejected,
    /// The popup closed. `reported` tells whether a result was delivered.
    Closed {
        /// Whether the completion callback was (or would have been) invoked.
        reported: bool,
    },
}

// -----------------------------------------------------------------------------
// Session
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Open,
    Closed,
}

enum Content<W> {
    Message,
    Fields {
        specs: Vec<FieldSpec>,
        widgets: Vec<W>,
        errors: Vec<FieldErrorState>,
    },
}

struct Session<B: RenderBridge> {
    state: SessionState,
    bridge: B,
    overlay: Option<B::Overlay>,
    dialog: Option<B::Dialog>,
    content: Content<B::Widget>,
    buttons: Vec<String>,
    cancel_button: Option<usize>,
    unindexed_results: bool,
    error_message: String,
    timer: Option<TimerHandle>,
    on_done: Option<DoneFn>,
    on_overlay_click: Option<OverlayClickFn>,
    outcome: Option<TerminationEvent>,
}

type Report = (DoneFn, TerminationEvent);

impl<B: RenderBridge> Session<B> {
    fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    fn validate_all(&mut self, button: Option<usize>) -> bool {
        let ctx = ValidationContext {
            cancel_button: self.cancel_button,
            error_message: &self.error_message,
        };
        match &mut self.content {
            Content::Message => true,
            Content::Fields {
                specs,
                widgets,
                errors,
            } => validate::validate_all(specs, widgets, errors, button, &ctx),
        }
    }

    fn validate_field(&mut self, index: usize) -> Option<bool> {
        let ctx = ValidationContext {
            cancel_button: self.cancel_button,
            error_message: &self.error_message,
        };
        let Content::Fields {
            specs,
            widgets,
            errors,
        } = &mut self.content
        else {
            return None;
        };
        let spec = specs.get(index)?;
        let widget = widgets.get_mut(index)?;
        let state = errors.get_mut(index)?;
        Some(validate::validate_one(spec, index, widget, state, None, &ctx).valid)
    }

    fn collect_values(&self) -> Option<FieldValues> {
        match &self.content {
            Content::Message => None,
            Content::Fields { specs, widgets, .. } => {
                Some(collect_values(specs, widgets, self.unindexed_results))
            }
        }
    }

    fn widget_mut(&mut self, index: usize) -> Option<&mut B::Widget> {
        match &mut self.content {
            Content::Message => None,
            Content::Fields { widgets, .. } => widgets.get_mut(index),
        }
    }

    fn widget(&self, index: usize) -> Option<&B::Widget> {
        match &self.content {
            Content::Message => None,
            Content::Fields { widgets, .. } => widgets.get(index),
        }
    }

    /// Runs one step of the termination protocol.
    ///
    /// The completion callback is handed back instead of called so it runs
    /// after the session lock is released.
    fn terminate(&mut self, trigger: Trigger) -> (Resolution, Option<Report>) {
        if !self.is_open() {
            debug!(?trigger, "popup already closed, ignoring trigger");
            return (Resolution::Ignored, None);
        }

        let valid = self.validate_all(trigger.validation_button());
        let timed_out = trigger.timed_out();
        if timed_out == Some(false) && !valid {
            debug!(?trigger, "popup close rejected by field validation");
            return (Resolution::Rejected, None);
        }

        let reported = valid || timed_out.is_none();
        let event = reported.then(|| TerminationEvent {
            trigger,
            values: self.collect_values(),
        });

        self.close_surface();
        info!(?trigger, valid, reported, "popup closed");

        self.outcome = event.clone();
        let report = self.on_done.take().zip(event);
        (Resolution::Closed { reported }, report)
    }

    fn close_surface(&mut self) {
        self.state = SessionState::Closed;
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        if let (Some(overlay), Some(dialog)) = (self.overlay.take(), self.dialog.take()) {
            self.bridge.teardown(overlay, dialog);
        }
    }
}

thread_local! {
    /// Addresses of the sessions locked by this thread.
    static LOCKED: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// A locked session, marked as held by the current thread until dropped.
struct Entered<'a, B: RenderBridge> {
    guard: MutexGuard<'a, Session<B>>,
    key: usize,
}

/// Locks a session, or returns `None` if this thread already holds it.
///
/// Custom validators run with the session locked; a validator that calls
/// back into its own popup gets `None` here instead of a deadlock.
fn enter<B: RenderBridge>(session: &Mutex<Session<B>>) -> Option<Entered<'_, B>> {
    let key = std::ptr::from_ref(session).addr();
    if LOCKED.with(|locked| locked.borrow().contains(&key)) {
        warn!("popup called from inside its own validator, ignoring");
        return None;
    }
    let guard = session.lock();
    LOCKED.with(|locked| locked.borrow_mut().push(key));
    Some(Entered { guard, key })
}

impl<B: RenderBridge> Drop for Entered<'_, B> {
    fn drop(&mut self) {
        LOCKED.with(|locked| locked.borrow_mut().retain(|key| *key != self.key));
    }
}

impl<B: RenderBridge> Deref for Entered<'_, B> {
    type Target = Session<B>;

    fn deref(&self) -> &Session<B> {
        &self.guard
    }
}

impl<B: RenderBridge> DerefMut for Entered<'_, B> {
    fn deref_mut(&mut self) -> &mut Session<B> {
        &mut self.guard
    }
}

/// Type-erased access to a session, for timers and callbacks that must not
/// know the bridge type.
trait SessionControl: Send + Sync {
    fn terminate(&self, trigger: Trigger) -> Resolution;
    fn is_open(&self) -> bool;
}

impl<B: RenderBridge> SessionControl for Mutex<Session<B>> {
    fn terminate(&self, trigger: Trigger) -> Resolution {
        let (resolution, report) = match enter(self) {
            Some(mut session) => session.terminate(trigger),
            None => return Resolution::Ignored,
        };
        if let Some((on_done, event)) = report {
            on_done(event);
        }
        resolution
    }

    // A session re-entered from its validator is still open.
    fn is_open(&self) -> bool {
        enter(self).is_none_or(|session| session.is_open())
    }
}

// -----------------------------------------------------------------------------
// Closer
// -----------------------------------------------------------------------------

/// A weak, bridge-agnostic capability to close a popup.
///
/// Handed to overlay click callbacks and held by the popup's timer. It does
/// not keep the popup alive; once every [`Popup`] handle is gone, closing
/// through it is ignored.
#[derive(Clone)]
pub struct Closer {
    session: Weak<dyn SessionControl>,
}

impl Closer {
    fn new<B: RenderBridge>(session: &Arc<Mutex<Session<B>>>) -> Self {
        let shared: Arc<dyn SessionControl> = session.clone();
        Self {
            session: Arc::downgrade(&shared),
        }
    }

    /// Closes the popup programmatically. See [`Popup::close`].
    pub fn close(&self, button: Option<usize>) -> Resolution {
        self.trigger(Trigger::Close(button))
    }

    /// Returns true if the popup is still open.
    pub fn is_open(&self) -> bool {
        self.session
            .upgrade()
            .is_some_and(|session| session.is_open())
    }

    fn expire(&self) -> Resolution {
        self.trigger(Trigger::Timeout)
    }

    fn trigger(&self, trigger: Trigger) -> Resolution {
        match self.session.upgrade() {
            Some(session) => session.terminate(trigger),
            None => Resolution::Ignored,
        }
    }
}

impl fmt::Debug for Closer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closer")
            .field("open", &self.is_open())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Popup
// -----------------------------------------------------------------------------

/// Handle to an open (or closed) popup.
///
/// Cloning the handle is cheap; all clones drive the same session. Custom
/// field validators run while the session is locked: calls they make back
/// into the same popup (or its [`Closer`]) return at once as if the popup
/// had nothing to do. Completion and overlay click callbacks run unlocked
/// and may drive the popup freely.
pub struct Popup<B: RenderBridge> {
    inner: Arc<Mutex<Session<B>>>,
}

impl<B: RenderBridge> Clone for Popup<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: RenderBridge> Popup<B> {
    /// Opens a popup, arming its timer on a [`ThreadScheduler`].
    ///
    /// # Errors
    ///
    /// Returns [`PopupError::InvalidFieldKind`](crate::PopupError::InvalidFieldKind)
    /// or [`PopupError::MissingOptions`](crate::PopupError::MissingOptions)
    /// before anything is rendered.
    pub fn open(config: PopupConfig, bridge: B) -> crate::Result<Self> {
        Self::open_with(config, bridge, &ThreadScheduler)
    }

    /// Opens a popup, arming its timer on the given scheduler.
    ///
    /// # Errors
    ///
    /// See [`Popup::open`].
    pub fn open_with(
        config: PopupConfig,
        mut bridge: B,
        scheduler: &dyn Scheduler,
    ) -> crate::Result<Self> {
        let timeout = config.resolved_timeout();
        let buttons = config.resolved_buttons();
        let error_message = config.resolved_error_message();
        let PopupConfig {
            title,
            message,
            fields,
            default_button,
            cancel_button,
            unindexed_results,
            z_index,
            overlay_background,
            defaults,
            on_done,
            on_overlay_click,
            ..
        } = config;

        let message = message.filter(|message| !message.is_empty());
        let fields = match message {
            Some(_) => None,
            None => fields,
        };
        let kinds = match &fields {
            Some(specs) => specs
                .iter()
                .enumerate()
                .map(|(index, spec)| spec.resolve_kind(index))
                .collect::<crate::Result<Vec<FieldKind>>>()?,
            None => Vec::new(),
        };

        let z_index = z_index.unwrap_or(defaults.z_index);
        let overlay = bridge.create_overlay(&OverlayStyle {
            z_index,
            background: overlay_background.unwrap_or(defaults.overlay_background),
        });
        let mut dialog = bridge.create_dialog(&DialogSurface {
            title: title.as_deref(),
            buttons: &buttons,
            default_button: default_button.unwrap_or(defaults.default_button),
            z_index,
        });

        let content = match fields {
            None => {
                bridge.render_message(&mut dialog, message.as_deref().unwrap_or_default());
                Content::Message
            }
            Some(specs) => {
                let mut widgets = Vec::with_capacity(specs.len());
                for (index, (spec, kind)) in specs.iter().zip(&kinds).enumerate() {
                    widgets.push(bridge.render_field(
                        &mut dialog,
                        &FieldView {
                            index,
                            label: &spec.message,
                            kind: *kind,
                            options: spec.options.as_deref().unwrap_or_default(),
                            initial_value: &spec.initial_value,
                        },
                    ));
                }
                let errors = vec![FieldErrorState::default(); specs.len()];
                Content::Fields {
                    specs,
                    widgets,
                    errors,
                }
            }
        };

        debug!(
            fields = kinds.len(),
            buttons = buttons.len(),
            timeout_ms = timeout.map(|t| t.as_millis() as u64),
            "popup opened"
        );

        let inner = Arc::new(Mutex::new(Session {
            state: SessionState::Open,
            bridge,
            overlay: Some(overlay),
            dialog: Some(dialog),
            content,
            buttons,
            cancel_button,
            unindexed_results,
            error_message,
            timer: None,
            on_done,
            on_overlay_click,
            outcome: None,
        }));

        if let Some(delay) = timeout {
            let closer = Closer::new(&inner);
            let timer = scheduler.schedule(
                delay,
                Box::new(move || {
                    closer.expire();
                }),
            );
            let mut session = inner.lock();
            if session.is_open() {
                session.timer = Some(timer);
            }
        }

        Ok(Self { inner })
    }

    /// Activates a button.
    ///
    /// Closes the popup if every field is valid (the cancel button skips
    /// required checks); otherwise the popup stays open with its error
    /// indicators shown.
    pub fn press(&self, button: usize) -> Resolution {
        let count = match enter(&self.inner) {
            Some(session) => session.buttons.len(),
            None => return Resolution::Ignored,
        };
        if button >= count {
            warn!(button, buttons = count, "press on a button that does not exist");
            return Resolution::Ignored;
        }
        self.inner.terminate(Trigger::Button(button))
    }

    /// Closes the popup from code.
    ///
    /// Always tears the popup down and always reports, even when fields are
    /// invalid. Fields are still validated (with `button`) so their values
    /// are normalized first.
    pub fn close(&self, button: Option<usize>) -> Resolution {
        self.inner.terminate(Trigger::Close(button))
    }

    /// Reports that a field lost focus and validates just that field.
    ///
    /// Required checks always apply. Returns whether the field is valid, or
    /// `None` if the popup is closed or has no such field.
    pub fn blur(&self, field: usize) -> Option<bool> {
        let mut session = enter(&self.inner)?;
        if !session.is_open() {
            return None;
        }
        session.validate_field(field)
    }

    /// Reports a click on the overlay.
    ///
    /// Returns true if an overlay click callback ran.
    pub fn overlay_clicked(&self) -> bool {
        let callback = {
            let Some(session) = enter(&self.inner) else {
                return false;
            };
            if !session.is_open() {
                return false;
            }
            session.on_overlay_click.clone()
        };
        match callback {
            Some(callback) => {
                callback(&self.closer());
                true
            }
            None => false,
        }
    }

    /// Replaces a field's value, as if the user had edited it.
    ///
    /// Returns false if the popup is closed or has no such field.
    pub fn input(&self, field: usize, value: impl AsRef<str>) -> bool {
        let Some(mut session) = enter(&self.inner) else {
            return false;
        };
        if !session.is_open() {
            return false;
        }
        match session.widget_mut(field) {
            Some(widget) => {
                widget.set_value(value.as_ref());
                true
            }
            None => false,
        }
    }

    /// Returns a field's current value.
    pub fn value(&self, field: usize) -> Option<String> {
        enter(&self.inner)?.widget(field).map(FieldWidget::value)
    }

    /// Returns each field's current error message.
    pub fn field_errors(&self) -> Vec<Option<String>> {
        let Some(session) = enter(&self.inner) else {
            return Vec::new();
        };
        match &session.content {
            Content::Message => Vec::new(),
            Content::Fields { errors, .. } => errors
                .iter()
                .map(|state| state.message().map(str::to_string))
                .collect(),
        }
    }

    /// Returns the button labels.
    pub fn buttons(&self) -> Vec<String> {
        enter(&self.inner).map_or_else(Vec::new, |session| session.buttons.clone())
    }

    /// Returns true until the popup closes.
    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    /// Takes the reported outcome, for hosts that poll instead of using a
    /// completion callback.
    pub fn take_outcome(&self) -> Option<TerminationEvent> {
        enter(&self.inner)?.outcome.take()
    }

    /// Gives read access to the overlay and dialog handles. Both are `None`
    /// once the popup has been torn down.
    pub fn with_visuals<R>(&self, f: impl FnOnce(Option<&B::Overlay>, Option<&B::Dialog>) -> R) -> R {
        match enter(&self.inner) {
            Some(session) => f(session.overlay.as_ref(), session.dialog.as_ref()),
            None => f(None, None),
        }
    }

    /// Returns a weak close capability for this popup.
    pub fn closer(&self) -> Closer {
        Closer::new(&self.inner)
    }
}

impl<B: RenderBridge> fmt::Debug for Popup<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Popup")
            .field("open", &self.is_open())
            .finish()
    }
}
