//! Termination protocol tests.
//!
//! Tests verify:
//! - Button presses close only when fields are valid
//! - The cancel button skips required checks but not custom validators
//! - Programmatic closes always tear down and always report
//! - Timer expiry always tears down but reports only valid fields
//! - At most one teardown and one report per popup

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use popup::{
    FieldSpec, Journal, ManualScheduler, MemoryBridge, Popup, PopupConfig, Resolution,
    SelectOption, TerminationEvent, Trigger,
};

/// Records every completion callback invocation.
#[derive(Clone, Default)]
struct Reports(Arc<Mutex<Vec<TerminationEvent>>>);

impl Reports {
    fn attach(&self, config: PopupConfig) -> PopupConfig {
        let reports = self.0.clone();
        config.on_done(move |event| reports.lock().push(event))
    }

    fn count(&self) -> usize {
        self.0.lock().len()
    }

    fn last(&self) -> TerminationEvent {
        self.0.lock().last().cloned().expect("no report")
    }
}

struct Harness {
    popup: Popup<MemoryBridge>,
    journal: Journal,
    reports: Reports,
    clock: ManualScheduler,
}

fn open(config: PopupConfig) -> Harness {
    let bridge = MemoryBridge::new();
    let journal = bridge.journal();
    let reports = Reports::default();
    let clock = ManualScheduler::new();
    let popup = Popup::open_with(reports.attach(config), bridge, &clock).unwrap();
    Harness {
        popup,
        journal,
        reports,
        clock,
    }
}

fn signup() -> PopupConfig {
    PopupConfig::fields(vec![
        FieldSpec::new("Name").required(true).trim(true),
        FieldSpec::new("Nickname"),
        FieldSpec::new("Email").id("email"),
    ])
    .buttons(["Save", "Cancel"])
    .cancel_button(1)
}

mod button_tests {
    use super::*;

    #[test]
    fn test_required_field_blocks_press() {
        let h = open(signup());

        assert_eq!(h.popup.press(0), Resolution::Rejected);
        assert!(h.popup.is_open());
        assert_eq!(h.journal.teardowns(), 0);
        assert_eq!(h.reports.count(), 0);
        assert_eq!(
            h.popup.field_errors()[0].as_deref(),
            Some("Invalid input entered.")
        );
    }

    #[test]
    fn test_whitespace_counts_as_empty_when_trimmed() {
        let h = open(signup());
        h.popup.input(0, "   ");
        assert_eq!(h.popup.press(0), Resolution::Rejected);
    }

    #[test]
    fn test_press_after_fix_closes_and_reports() {
        let h = open(signup());
        assert_eq!(h.popup.press(0), Resolution::Rejected);

        h.popup.input(0, " Ada ");
        h.popup.input(2, "ada@example.com");
        assert_eq!(h.popup.press(0), Resolution::Closed { reported: true });

        assert_eq!(h.journal.teardowns(), 1);
        let event = h.reports.last();
        assert_eq!(event.trigger(), Trigger::Button(0));
        assert_eq!(event.button_index(), Some(0));
        assert_eq!(event.timed_out(), Some(false));

        let values = event.values().unwrap();
        assert_eq!(values.index(0), Some("Ada"));
        assert_eq!(values.index(1), Some(""));
        assert_eq!(values.index(2), Some("ada@example.com"));
        assert_eq!(values.id("email"), Some("ada@example.com"));
    }

    #[test]
    fn test_cancel_button_skips_required() {
        let h = open(signup());

        assert_eq!(h.popup.press(1), Resolution::Closed { reported: true });
        assert_eq!(h.journal.teardowns(), 1);
        assert_eq!(h.reports.last().button_index(), Some(1));
        assert!(h.popup.field_errors().iter().all(Option::is_none));
    }

    #[test]
    fn test_custom_validator_blocks_cancel_button() {
        let config = PopupConfig::fields(vec![FieldSpec::new("Code").required(true).validate(
            |value, _, _, err| {
                if value != "1234" {
                    err.set("wrong code");
                }
                value.to_string()
            },
        )])
        .buttons(["OK", "Cancel"])
        .cancel_button(1);
        let h = open(config);

        assert_eq!(h.popup.press(1), Resolution::Rejected);
        assert_eq!(h.popup.field_errors(), vec![Some("wrong code".to_string())]);

        h.popup.input(0, "1234");
        assert_eq!(h.popup.press(1), Resolution::Closed { reported: true });
    }

    #[test]
    fn test_message_popup_press_always_closes() {
        let h = open(PopupConfig::confirm("Delete everything?"));

        assert_eq!(h.popup.press(0), Resolution::Closed { reported: true });
        let event = h.reports.last();
        assert_eq!(event.button_index(), Some(0));
        assert!(event.values().is_none());
    }

    #[test]
    fn test_validator_normalizes_reported_value() {
        let config = PopupConfig::fields(vec![
            FieldSpec::new("Phone")
                .id("phone")
                .trim(regex::Regex::new(r"[^\d]").unwrap())
                .required(true),
        ])
        .unindexed_results(true);
        let h = open(config);

        h.popup.input(0, "(555) 123-4567");
        assert_eq!(h.popup.press(0), Resolution::Closed { reported: true });

        let values = h.reports.last().into_values().unwrap();
        assert_eq!(values.id("phone"), Some("5551234567"));
        assert!(!values.contains_key(0usize));
    }

    #[test]
    fn test_select_value_is_reported() {
        let config = PopupConfig::fields(vec![FieldSpec::select(
            "Plan",
            vec![
                SelectOption::new("Free", "free"),
                SelectOption::new("Pro", "pro").selected(true),
            ],
        )
        .id("plan")]);
        let h = open(config);

        assert_eq!(h.popup.press(0), Resolution::Closed { reported: true });
        assert_eq!(h.reports.last().values().unwrap().id("plan"), Some("pro"));
    }
}

mod close_tests {
    use super::*;

    #[test]
    fn test_close_reports_despite_invalid_fields() {
        let h = open(signup());

        assert_eq!(h.popup.close(Some(0)), Resolution::Closed { reported: true });
        assert_eq!(h.journal.teardowns(), 1);

        let event = h.reports.last();
        assert_eq!(event.button_index(), Some(0));
        assert_eq!(event.timed_out(), None);
        assert!(event.values().is_some());
        // Validation still ran and marked the empty required field.
        assert!(h.popup.field_errors()[0].is_some());
    }

    #[test]
    fn test_close_without_button() {
        let h = open(signup());

        assert_eq!(h.popup.close(None), Resolution::Closed { reported: true });
        let event = h.reports.last();
        assert_eq!(event.trigger(), Trigger::Close(None));
        assert_eq!(event.button_index(), None);
        assert_eq!(event.timed_out(), None);
    }

    #[test]
    fn test_closer_closes() {
        let h = open(signup());
        let closer = h.popup.closer();

        assert_eq!(closer.close(Some(1)), Resolution::Closed { reported: true });
        assert!(!h.popup.is_open());
        assert_eq!(h.reports.count(), 1);
    }
}

mod timeout_tests {
    use super::*;

    #[test]
    fn test_timeout_with_valid_fields_reports() {
        let h = open(signup().timeout_ms(5_000));
        h.popup.input(0, "Ada");

        assert_eq!(h.clock.advance(Duration::from_millis(4_999)), 0);
        assert!(h.popup.is_open());
        assert_eq!(h.clock.advance(Duration::from_millis(1)), 1);

        assert!(!h.popup.is_open());
        assert_eq!(h.journal.teardowns(), 1);
        let event = h.reports.last();
        assert_eq!(event.trigger(), Trigger::Timeout);
        assert_eq!(event.button_index(), Some(-1));
        assert_eq!(event.timed_out(), Some(true));
        assert_eq!(event.values().unwrap().index(0), Some("Ada"));
    }

    #[test]
    fn test_timeout_with_invalid_fields_tears_down_silently() {
        let h = open(signup().timeout_ms(100));

        h.clock.advance(Duration::from_millis(100));

        assert!(!h.popup.is_open());
        assert_eq!(h.journal.teardowns(), 1);
        assert_eq!(h.reports.count(), 0);
        assert!(h.popup.take_outcome().is_none());
    }

    #[test]
    fn test_timeout_enforces_required_even_with_cancel_button() {
        // Timeouts validate with no button, so the cancel bypass never applies.
        let h = open(signup().timeout_ms(10));
        h.clock.advance(Duration::from_millis(10));
        assert_eq!(h.reports.count(), 0);
    }

    #[test]
    fn test_message_popup_timeout_reports() {
        let h = open(PopupConfig::alert("Autosaved").timeout(Duration::from_secs(3)));
        h.clock.advance(Duration::from_secs(3));

        let event = h.reports.last();
        assert_eq!(event.button_index(), Some(-1));
        assert_eq!(event.timed_out(), Some(true));
        assert!(event.values().is_none());
    }

    #[test]
    fn test_press_then_timer_is_inert() {
        let h = open(PopupConfig::alert("x").timeout_ms(50));

        assert_eq!(h.popup.press(0), Resolution::Closed { reported: true });
        assert_eq!(h.clock.advance(Duration::from_secs(1)), 0);
        assert_eq!(h.journal.teardowns(), 1);
        assert_eq!(h.reports.count(), 1);
        assert_eq!(h.reports.last().timed_out(), Some(false));
    }
}

mod exactly_once_tests {
    use super::*;

    #[test]
    fn test_second_press_is_ignored() {
        let h = open(PopupConfig::confirm("Sure?"));

        assert_eq!(h.popup.press(0), Resolution::Closed { reported: true });
        assert_eq!(h.popup.press(1), Resolution::Ignored);
        assert_eq!(h.popup.close(None), Resolution::Ignored);
        assert!(!h.popup.overlay_clicked());

        assert_eq!(h.journal.teardowns(), 1);
        assert_eq!(h.reports.count(), 1);
        assert_eq!(h.reports.last().button_index(), Some(0));
    }

    #[test]
    fn test_triggers_after_silent_timeout_are_ignored() {
        let h = open(signup().timeout_ms(1));
        h.clock.advance(Duration::from_millis(1));

        assert_eq!(h.popup.close(Some(0)), Resolution::Ignored);
        assert_eq!(h.popup.press(1), Resolution::Ignored);
        assert_eq!(h.popup.blur(0), None);
        assert!(!h.popup.input(0, "late"));
        assert_eq!(h.journal.teardowns(), 1);
        assert_eq!(h.reports.count(), 0);
    }

    #[test]
    fn test_concurrent_triggers_close_once() {
        let bridge = MemoryBridge::new();
        let journal = bridge.journal();
        let reports = Reports::default();
        let popup = Popup::open(reports.attach(PopupConfig::confirm("Race")), bridge).unwrap();

        let threads: Vec<_> = (0..8)
            .map(|i| {
                let popup = popup.clone();
                std::thread::spawn(move || {
                    if i % 2 == 0 {
                        popup.press(i % 2)
                    } else {
                        popup.close(None)
                    }
                })
            })
            .collect();

        let closed = threads
            .into_iter()
            .map(|t| t.join().unwrap())
            .filter(|r| matches!(r, Resolution::Closed { .. }))
            .count();

        assert_eq!(closed, 1);
        assert_eq!(journal.teardowns(), 1);
        assert_eq!(reports.count(), 1);
    }
}

mod thread_timer_tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_default_scheduler_times_out() {
        let (tx, rx) = mpsc::channel();
        let config = PopupConfig::alert("Bye").timeout_ms(20).on_done(move |event| {
            let _ = tx.send(event);
        });
        let popup = Popup::open(config, MemoryBridge::new()).unwrap();

        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event.timed_out(), Some(true));
        assert!(!popup.is_open());
    }
}
