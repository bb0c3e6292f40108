//! Structured logging for gensum
//!
//! All logs use structured fields for easy parsing and analysis.
//!
//! # Log Format Conventions
//!
//! - `operation`: The checksum operation ("load", "save", "check", "prune")
//! - `task`: The task or generator name
//! - `status`: The result status ("success", "skipped", "error")
//! - `entry_count`: Number of fingerprint entries
//! - `path`: File the event is about
//!
//! # Examples
//!
//! ```rust
//! use tracing::info;
//!
//! let task = "generateLexerChecksumSave";
//! info!(operation = "save", task, entry_count = 12, "updated checksums");
//! ```

use std::fmt::{self as std_fmt, Write as _};
use std::io;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    fmt::{self, format::Writer},
    prelude::*,
    EnvFilter,
};

/// Fields of one event, with the task pulled out as a prefix
#[derive(Debug, Default)]
struct TaskEvent {
    task: Option<String>,
    message: String,
    fields: Vec<(&'static str, String)>,
}

impl TaskEvent {
    fn record(&mut self, field: &Field, value: String) {
        match field.name() {
            "task" => self.task = Some(value),
            "message" => self.message = value,
            name => self.fields.push((name, value)),
        }
    }

    /// `[task] message key=value ...`
    fn render(&self) -> String {
        let mut line = String::new();
        if let Some(task) = &self.task {
            let _ = write!(line, "[{}] ", task);
        }
        line.push_str(&self.message);
        for (name, value) in &self.fields {
            let _ = write!(line, " {}={}", name, value);
        }
        line
    }
}

impl Visit for TaskEvent {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std_fmt::Debug) {
        self.record(field, format!("{:?}", value));
    }
}

/// Formatter that prints "gensum" and the task name instead of the module path
struct GensumFormatter {
    with_ansi: bool,
}

impl<S, N> FormatEvent<S, N> for GensumFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std_fmt::Result {
        let level = *event.metadata().level();
        let timestamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f");

        let mut fields = TaskEvent::default();
        event.record(&mut fields);

        if self.with_ansi {
            let level_style = match level {
                tracing::Level::ERROR => "\x1b[31m",
                tracing::Level::WARN => "\x1b[33m",
                tracing::Level::INFO => "\x1b[32m",
                tracing::Level::DEBUG => "\x1b[34m",
                tracing::Level::TRACE => "\x1b[35m",
            };
            write!(writer, "{} {}{:5}(gensum)\x1b[0m ", timestamp, level_style, level)?;
        } else {
            write!(writer, "{} {:5}(gensum) ", timestamp, level)?;
        }

        writeln!(writer, "{}", fields.render())
    }
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors
    Pretty,
    /// Plain format (for CI)
    Compact,
    /// JSON format (for log aggregation systems)
    Json,
}

impl LogFormat {
    /// Parse from environment variable (GENSUM_LOG_FORMAT)
    pub fn from_env() -> Self {
        Self::parse(
            &std::env::var("GENSUM_LOG_FORMAT").unwrap_or_default(),
            std::env::var("CI").is_ok(),
        )
    }

    fn parse(value: &str, ci: bool) -> Self {
        match value.to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            "pretty" => Self::Pretty,
            _ if ci => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Initialize the global tracing subscriber
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "debug", "info", "warn")
/// - `GENSUM_LOG_FORMAT`: Set format ("pretty", "compact", "json")
/// - `CI`: If set, defaults to compact format
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let format = LogFormat::from_env();

    let text = (format != LogFormat::Json).then(|| {
        fmt::layer()
            .event_format(GensumFormatter {
                with_ansi: format == LogFormat::Pretty,
            })
            .with_writer(io::stderr)
    });

    // One flat object per event so `task` and `operation` sit at the top level
    let json = (format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_target(false)
            .with_writer(io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}
