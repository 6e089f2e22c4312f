use std::path::Path;
use std::sync::OnceLock;

use tracing::{field::Visit, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LogConfig;

static IGNORE_PATTERNS: OnceLock<Vec<regex::Regex>> = OnceLock::new();

/// Install the global tracing subscriber for a casefile binary.
///
/// `default_filter` applies when `RUST_LOG` is unset.  When `cfg.file` is set
/// a second, non-blocking fmt layer writes to that file; the returned guard
/// must be held until exit so buffered lines are flushed.
pub fn init(default_filter: &str, cfg: &LogConfig) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let (file_layer, guard) = match cfg.file.as_deref().map(Path::new) {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "casefile.log".into());
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(LogIgnoreFilter);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_filter(LogIgnoreFilter))
        .with(file_layer)
        .init();

    if let Err(e) = set_ignore_patterns(&cfg.ignore) {
        tracing::warn!("invalid log ignore pattern: {e}");
    }
    guard
}

/// Compile and activate the log-ignore patterns from config.
///
/// The first call wins; later calls are ignored.  Returns an error if any
/// pattern is not a valid regular expression.
pub fn set_ignore_patterns(patterns: &[String]) -> Result<(), regex::Error> {
    let compiled = patterns
        .iter()
        .map(|p| regex::Regex::new(p))
        .collect::<Result<Vec<_>, _>>()?;
    let _ = IGNORE_PATTERNS.set(compiled);
    Ok(())
}

// ── Per-layer filter ──────────────────────────────────────────────────────────

/// Per-layer filter that drops events whose `target: message` matches any
/// pattern installed via [`set_ignore_patterns`].  Parsers such as
/// `pdf_extract` log one line per unknown glyph; this is how those get
/// silenced without raising the global level.
pub struct LogIgnoreFilter;

impl<S: Subscriber> tracing_subscriber::layer::Filter<S> for LogIgnoreFilter {
    fn enabled(&self, _meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        true
    }

    fn event_enabled(&self, event: &tracing::Event<'_>, _cx: &Context<'_, S>) -> bool {
        let Some(patterns) = IGNORE_PATTERNS.get() else {
            return true;
        };
        if patterns.is_empty() {
            return true;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        // log-bridged events carry the real crate in "log.target".
        let target = visitor.log_target.as_deref().unwrap_or_else(|| event.metadata().target());
        !is_ignored(patterns, target, &visitor.message)
    }
}

fn is_ignored(patterns: &[regex::Regex], target: &str, message: &str) -> bool {
    let candidate = format!("{target}: {message}");
    patterns.iter().any(|p| p.is_match(&candidate))
}

// ── Internal helpers ─────────────────────────────────────────────────────────

#[derive(Default)]
struct MessageVisitor {
    message: String,
    log_target: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "log.target" => self.log_target = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            "log.target" => self.log_target = Some(format!("{value:?}")),
            _ => {}
        }
    }
}
