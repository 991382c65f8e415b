//! Unit tests for popup error types.
//!
//! Tests verify:
//! - Error variant creation
//! - Display formatting
//! - Clone and `PartialEq` derives
//! - Helper methods
//! - Where each variant is raised

use popup::{FieldSpec, MemoryBridge, Popup, PopupConfig, PopupDocument, PopupError, Result};
use std::error::Error as StdError;

mod display_tests {
    use super::*;

    #[test]
    fn test_invalid_field_kind_display() {
        let e = PopupError::InvalidFieldKind {
            index: 1,
            kind: "DATE".into(),
        };
        assert_eq!(e.to_string(), "field 1: \"DATE\" is an invalid popup input type");
    }

    #[test]
    fn test_missing_options_display() {
        let e = PopupError::MissingOptions {
            index: 0,
            kind: "SELECT".into(),
        };
        assert_eq!(
            e.to_string(),
            "field 0: options must be given for popup inputs of type \"SELECT\""
        );
    }

    #[test]
    fn test_invalid_pattern_display() {
        let e = PopupError::InvalidPattern {
            pattern: "(".into(),
            reason: "unclosed group".into(),
        };
        assert_eq!(e.to_string(), "invalid pattern \"(\": unclosed group");
    }

    #[test]
    fn test_document_and_io_display() {
        assert_eq!(
            PopupError::document("missing field").to_string(),
            "document error: missing field"
        );
        assert_eq!(PopupError::io("denied").to_string(), "io error: denied");
    }
}

mod trait_tests {
    use super::*;

    #[test]
    fn test_clone_and_eq() {
        let e = PopupError::Io("gone".into());
        assert_eq!(e.clone(), e);
        assert_ne!(e, PopupError::Document("gone".into()));
    }

    #[test]
    fn test_is_std_error() {
        let e: Box<dyn StdError> = Box::new(PopupError::document("bad"));
        assert!(e.source().is_none());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let e: PopupError = io.into();
        assert_eq!(e, PopupError::Io("no such file".into()));
    }

    #[test]
    fn test_result_alias() {
        fn fails() -> Result<()> {
            Err(PopupError::document("x"))
        }
        assert!(fails().is_err());
    }
}

mod helper_tests {
    use super::*;

    #[test]
    fn test_construction_errors() {
        assert!(
            PopupError::InvalidFieldKind {
                index: 0,
                kind: "x".into()
            }
            .is_construction_error()
        );
        assert!(
            PopupError::MissingOptions {
                index: 0,
                kind: "x".into()
            }
            .is_construction_error()
        );
        assert!(!PopupError::document("x").is_construction_error());
    }

    #[test]
    fn test_document_errors() {
        assert!(PopupError::document("x").is_document_error());
        assert!(PopupError::io("x").is_document_error());
        assert!(
            PopupError::InvalidPattern {
                pattern: "x".into(),
                reason: "y".into()
            }
            .is_document_error()
        );
        assert!(
            !PopupError::InvalidFieldKind {
                index: 0,
                kind: "x".into()
            }
            .is_document_error()
        );
    }
}

mod raised_tests {
    use super::*;

    #[test]
    fn test_open_rejects_unknown_kind_without_rendering() {
        let bridge = MemoryBridge::new();
        let journal = bridge.journal();
        let config = PopupConfig::fields(vec![
            FieldSpec::new("Ok"),
            FieldSpec::new("When").kind("DATE"),
        ]);

        let err = Popup::open(config, bridge).unwrap_err();
        assert_eq!(
            err,
            PopupError::InvalidFieldKind {
                index: 1,
                kind: "DATE".into()
            }
        );
        assert!(journal.is_empty());
    }

    #[test]
    fn test_open_rejects_select_without_options() {
        let config = PopupConfig::fields(vec![FieldSpec::new("Plan").kind("select")]);
        let err = Popup::open(config, MemoryBridge::new()).unwrap_err();
        assert_eq!(
            err,
            PopupError::MissingOptions {
                index: 0,
                kind: "select".into()
            }
        );
    }

    #[test]
    fn test_message_popup_ignores_field_errors() {
        let config = PopupConfig::message("Hi").with_fields(vec![FieldSpec::new("x").kind("BAD")]);
        assert!(Popup::open(config, MemoryBridge::new()).is_ok());
    }

    #[test]
    fn test_document_bad_pattern() {
        let err = PopupDocument::from_toml_str(
            r#"
            [[fields]]
            message = "Zip"
            required = "(["
            "#,
        )
        .unwrap()
        .into_config()
        .unwrap_err();
        assert!(matches!(err, PopupError::InvalidPattern { .. }));
    }

    #[test]
    fn test_document_unknown_key() {
        let err = PopupDocument::from_toml_str("colour = \"red\"").unwrap_err();
        assert!(matches!(err, PopupError::Document(_)));
    }

    #[test]
    fn test_missing_document_file() {
        let err = PopupDocument::from_path("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, PopupError::Io(_)));
    }
}
