//! logging
//!
//! `tracing` subscriber setup.
//!
//! # Formats
//!
//! - [`LogFormat::Plain`]: the stock `fmt` layer on stderr, no timestamps
//! - [`LogFormat::Actions`]: GitHub Actions workflow commands on stdout, so
//!   warnings and errors are annotated in the run summary
//!
//! `RUST_LOG` overrides the level chosen from the command line.

use std::fmt;

use anyhow::Result;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines on stderr
    Plain,
    /// GitHub Actions workflow commands on stdout
    Actions,
}

impl LogFormat {
    /// Format matching the current environment.
    pub fn from_env() -> Self {
        Self::detect(std::env::var("GITHUB_ACTIONS").ok().as_deref())
    }

    /// `Actions` when running inside a workflow (`GITHUB_ACTIONS=true`).
    pub fn detect(github_actions: Option<&str>) -> Self {
        match github_actions {
            Some("true") => LogFormat::Actions,
            _ => LogFormat::Plain,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Plain => write!(f, "plain"),
            LogFormat::Actions => write!(f, "actions"),
        }
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init(format: LogFormat, level: Level) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,lnsync={}", level.as_str().to_ascii_lowercase()))
    });

    match format {
        LogFormat::Plain => {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time();
            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
        LogFormat::Actions => {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_ansi(false)
                .event_format(ActionsFormat);
            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
    }

    Ok(())
}

/// Event formatter emitting GitHub Actions workflow commands.
///
/// `INFO` lines are printed as is; other levels become `::error::`,
/// `::warning::` or `::debug::` commands with their data escaped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionsFormat;

impl<S, N> FormatEvent<S, N> for ActionsFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut message = String::new();

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                let extensions = span.extensions();
                if let Some(fields) = extensions.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        fmt::Write::write_fmt(&mut message, format_args!("[{}] ", fields))?;
                    }
                }
            }
        }
        ctx.format_fields(Writer::new(&mut message), event)?;

        match command_for(event.metadata().level()) {
            Some(command) => writeln!(writer, "::{}::{}", command, escape_data(&message)),
            None => writeln!(writer, "{}", message),
        }
    }
}

/// Workflow command for a level; `None` prints the line unchanged.
pub fn command_for(level: &Level) -> Option<&'static str> {
    match *level {
        Level::ERROR => Some("error"),
        Level::WARN => Some("warning"),
        Level::INFO => None,
        _ => Some("debug"),
    }
}

/// Escape workflow command data.
pub fn escape_data(data: &str) -> String {
    data.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Buffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Buffer {
        type Writer = Buffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let buffer = Buffer::default();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .with_writer(buffer.clone())
                .with_ansi(false)
                .event_format(ActionsFormat),
        );
        tracing::subscriber::with_default(subscriber, f);
        buffer.contents()
    }

    mod format {
        use super::*;

        #[test]
        fn detect() {
            assert_eq!(LogFormat::detect(Some("true")), LogFormat::Actions);
            assert_eq!(LogFormat::detect(Some("false")), LogFormat::Plain);
            assert_eq!(LogFormat::detect(None), LogFormat::Plain);
        }

        #[test]
        fn display() {
            assert_eq!(LogFormat::Actions.to_string(), "actions");
        }
    }

    mod actions {
        use super::*;

        #[test]
        fn commands_per_level() {
            assert_eq!(command_for(&Level::ERROR), Some("error"));
            assert_eq!(command_for(&Level::WARN), Some("warning"));
            assert_eq!(command_for(&Level::INFO), None);
            assert_eq!(command_for(&Level::DEBUG), Some("debug"));
            assert_eq!(command_for(&Level::TRACE), Some("debug"));
        }

        #[test]
        fn escapes_percent_first() {
            assert_eq!(escape_data("50%\r\nok"), "50%25%0D%0Aok");
            assert_eq!(escape_data("%0A"), "%250A");
        }

        #[test]
        fn writes_workflow_commands() {
            let out = capture(|| {
                tracing::warn!("two\nlines");
                tracing::info!("as is");
                tracing::error!("boom");
            });
            assert_eq!(out, "::warning::two%0Alines\nas is\n::error::boom\n");
        }

        #[test]
        fn span_fields_prefix_message() {
            let out = capture(|| {
                let span = tracing::info_span!("group", repo = "o/r");
                let _guard = span.enter();
                tracing::info!("up to date");
            });
            assert_eq!(out, "[repo=\"o/r\"] up to date\n");
        }
    }
}
