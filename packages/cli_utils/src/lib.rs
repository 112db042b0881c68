#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the geowatch toolchain.
//!
//! Provides [`init_logger`], which installs `pretty_env_logger` (filtered by
//! `RUST_LOG`) and can wrap it in a [`RedactingLogger`] so that phone
//! numbers, e-mail addresses, API keys and precise coordinates never reach
//! shared log output such as CI job logs.

use log::{Log, Metadata, Record};
use regex::Regex;

/// Replacement text for redacted values.
pub const REDACTED: &str = "[REDACTED]";

/// Patterns applied in order. Coordinates and phone numbers run before the
/// generic long-number rule so they are masked as a whole.
const PATTERNS: &[&str] = &[
    // e-mail addresses
    r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}",
    // high-precision coordinates, e.g. 40.024583 or -105.2717583
    r"-?[0-9]{1,3}\.[0-9]{5,}",
    // phone numbers
    r"(?:\+?[0-9]{1,3}[-. ]?)?\(?[0-9]{3}\)?[-. ]?[0-9]{3}[-. ]?[0-9]{4}",
    // hex API keys and key prefixes
    r"(?-u:\b)[a-f0-9]{10,}(?-u:\b)",
    // any other long number
    r"[0-9]{5,}",
];

/// Masks personally identifying values in log messages.
#[derive(Debug, Clone)]
pub struct Redactor {
    patterns: Vec<Regex>,
}

impl Redactor {
    /// Compiles the built-in redaction patterns.
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: PATTERNS.iter().filter_map(|p| Regex::new(p).ok()).collect(),
        }
    }

    /// Returns `message` with every sensitive value replaced by
    /// [`REDACTED`].
    #[must_use]
    pub fn redact(&self, message: &str) -> String {
        self.patterns
            .iter()
            .fold(message.to_owned(), |text, pattern| {
                pattern.replace_all(&text, REDACTED).into_owned()
            })
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`Log`] wrapper that redacts each message before handing it to the
/// inner logger.
pub struct RedactingLogger {
    inner: Box<dyn Log>,
    redactor: Redactor,
}

impl RedactingLogger {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: Box<dyn Log>) -> Self {
        Self {
            inner,
            redactor: Redactor::new(),
        }
    }
}

impl Log for RedactingLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if !self.inner.enabled(record.metadata()) {
            return;
        }

        let message = self.redactor.redact(&record.args().to_string());
        self.inner.log(
            &Record::builder()
                .metadata(record.metadata().clone())
                .args(format_args!("{message}"))
                .module_path(record.module_path())
                .file(record.file())
                .line(record.line())
                .build(),
        );
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Whether logs should be redacted: either requested explicitly or running
/// under CI, where job logs are often public.
#[must_use]
pub fn redaction_requested(configured: bool) -> bool {
    configured || std::env::var_os("GITHUB_ACTIONS").is_some()
}

/// Initializes the global logger from `RUST_LOG`, optionally redacting.
///
/// Does nothing if a logger was already set (e.g., in tests).
pub fn init_logger(redact: bool) {
    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    let installed = if redact {
        log::set_boxed_logger(Box::new(RedactingLogger::new(Box::new(logger))))
    } else {
        log::set_boxed_logger(Box::new(logger))
    };

    if installed.is_ok() {
        log::set_max_level(level);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn all_patterns_compile() {
        assert_eq!(Redactor::new().patterns.len(), PATTERNS.len());
    }

    #[test]
    fn redacts_coordinates() {
        let redactor = Redactor::new();
        assert_eq!(
            redactor.redact("device at 40.024583,-105.2717583"),
            "device at [REDACTED],[REDACTED]"
        );
    }

    #[test]
    fn redacts_phone_numbers_and_emails() {
        let redactor = Redactor::new();
        assert_eq!(
            redactor.redact("Sending SMS to +1 907-382-1079"),
            "Sending SMS to [REDACTED]"
        );
        assert_eq!(
            redactor.redact("Logged in as someone@example.com"),
            "Logged in as [REDACTED]"
        );
    }

    #[test]
    fn redacts_api_keys() {
        let redactor = Redactor::new();
        assert_eq!(redactor.redact("key: da75315f54..."), "key: [REDACTED]...");
    }

    #[test]
    fn leaves_ordinary_text_alone() {
        let redactor = Redactor::new();
        let message = "Loaded 12 zones at 2024-01-01 05:00:00";
        assert_eq!(redactor.redact(message), message);
    }

    struct Capture(Arc<Mutex<Vec<String>>>);

    impl Log for Capture {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &Record<'_>) {
            self.0.lock().unwrap().push(record.args().to_string());
        }

        fn flush(&self) {}
    }

    #[test]
    fn logger_redacts_before_forwarding() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let logger = RedactingLogger::new(Box::new(Capture(Arc::clone(&lines))));

        logger.log(
            &Record::builder()
                .args(format_args!("at {},{}", "40.0245831", "-105.2717583"))
                .level(log::Level::Info)
                .target("test")
                .build(),
        );

        assert_eq!(
            lines.lock().unwrap().as_slice(),
            ["at [REDACTED],[REDACTED]".to_string()]
        );
    }
}
