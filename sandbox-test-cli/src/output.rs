// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal output: color selection, log formatting and capturable writers.

use clap::{Args, ValueEnum};
use owo_colors::{OwoColorize, Style};
use std::{
    fmt,
    io::{self, Write},
    sync::Once,
};
use supports_color::Stream;
use tracing::{Event, Level, Subscriber, field, level_filters::LevelFilter};
use tracing_subscriber::{
    Layer,
    filter::Targets,
    fmt::{FmtContext, FormatEvent, FormatFields, format::Writer},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Events with this target are printed without a `level:` prefix.
pub(crate) const NO_HEADING_TARGET: &str = "sandbox_test::no_heading";

/// The environment variable holding the log filter, in `tracing` `Targets` syntax.
const LOG_ENV: &str = "SANDBOX_TEST_LOG";

pub(crate) mod palette {
    use clap::builder::{
        Styles,
        styling::{AnsiColor, Effects},
    };

    pub(crate) const fn clap() -> Styles {
        let bold = Effects::BOLD;
        Styles::styled()
            .header(AnsiColor::Green.on_default().effects(bold))
            .usage(AnsiColor::Green.on_default().effects(bold))
            .literal(AnsiColor::Cyan.on_default().effects(bold))
            .placeholder(AnsiColor::Cyan.on_default())
            .error(AnsiColor::Red.on_default().effects(bold))
            .valid(AnsiColor::Green.on_default())
            .invalid(AnsiColor::Yellow.on_default().effects(bold))
    }
}

#[derive(Copy, Clone, Debug, Args)]
#[must_use]
pub(crate) struct ColorOpts {
    /// When to use colors: auto, always, never
    #[arg(
        long,
        value_enum,
        default_value_t,
        hide_possible_values = true,
        global = true,
        value_name = "WHEN",
        env = "SANDBOX_TEST_COLOR"
    )]
    color: ColorChoice,
}

impl ColorOpts {
    /// Installs the global logger and returns the resulting context.
    pub(crate) fn install(self) -> OutputContext {
        install_logger(self.color.enabled_for(Stream::Stderr));
        OutputContext { color: self.color }
    }
}

/// Output settings chosen on the command line.
#[derive(Copy, Clone, Debug)]
#[must_use]
pub struct OutputContext {
    color: ColorChoice,
}

impl OutputContext {
    /// A context that never uses colors. The logger is left alone.
    pub fn plain() -> Self {
        Self {
            color: ColorChoice::Never,
        }
    }

    /// Whether output written to `stream` should be colorized.
    pub(crate) fn colorize(&self, stream: Stream) -> bool {
        self.color.enabled_for(stream)
    }

    /// Styles for error messages on stderr.
    pub fn error_styles(&self) -> ErrorStyles {
        if self.colorize(Stream::Stderr) {
            ErrorStyles::colorized()
        } else {
            ErrorStyles::default()
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    fn enabled_for(self, stream: Stream) -> bool {
        match self {
            Self::Auto => supports_color::on_cached(stream).is_some(),
            Self::Always => true,
            Self::Never => false,
        }
    }
}

/// Styles for error messages.
#[derive(Debug, Default)]
pub struct ErrorStyles {
    pub(crate) highlight: Style,
    pub(crate) path: Style,
}

impl ErrorStyles {
    fn colorized() -> Self {
        Self {
            highlight: Style::new().bold(),
            path: Style::new().cyan(),
        }
    }
}

static LOGGER: Once = Once::new();

fn install_logger(colorize: bool) {
    LOGGER.call_once(|| {
        let filter = std::env::var(LOG_ENV).unwrap_or_default();
        let targets = if filter.is_empty() {
            Targets::new().with_default(LevelFilter::INFO)
        } else {
            // tracing isn't set up yet, so a bad filter is reported directly.
            filter.parse().unwrap_or_else(|error| {
                eprintln!("warning: ignoring invalid {LOG_ENV} `{filter}`: {error}");
                Targets::new().with_default(LevelFilter::INFO)
            })
        };

        let prefix = if colorize {
            LevelPrefix::colorized()
        } else {
            LevelPrefix::default()
        };
        let layer = tracing_subscriber::fmt::layer()
            .event_format(prefix)
            .with_writer(io::stderr)
            .with_filter(targets);
        tracing_subscriber::registry().with(layer).init();
    });
}

/// Formats events as `level: message key=value`, like cargo's diagnostics.
#[derive(Debug, Default)]
struct LevelPrefix {
    error: Style,
    warn: Style,
    info: Style,
    debug: Style,
    trace: Style,
}

impl LevelPrefix {
    fn colorized() -> Self {
        Self {
            error: Style::new().red().bold(),
            warn: Style::new().yellow().bold(),
            info: Style::new().green().bold(),
            debug: Style::new().blue().bold(),
            trace: Style::new().dimmed(),
        }
    }

    fn label(&self, level: Level) -> (&'static str, Style) {
        match level {
            Level::ERROR => ("error", self.error),
            Level::WARN => ("warning", self.warn),
            Level::INFO => ("info", self.info),
            Level::DEBUG => ("debug", self.debug),
            Level::TRACE => ("trace", self.trace),
        }
    }
}

impl<S, N> FormatEvent<S, N> for LevelPrefix
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        if metadata.target() != NO_HEADING_TARGET {
            let (label, style) = self.label(*metadata.level());
            write!(writer, "{}: ", label.style(style))?;
        }

        let mut fields = FieldWriter {
            writer: &mut writer,
            result: Ok(()),
        };
        event.record(&mut fields);
        fields.result?;

        writeln!(writer)
    }
}

/// Writes the `message` field verbatim and every other field as ` key=value`.
struct FieldWriter<'a, 'w> {
    writer: &'a mut Writer<'w>,
    result: fmt::Result,
}

impl field::Visit for FieldWriter<'_, '_> {
    fn record_debug(&mut self, field: &field::Field, value: &dyn fmt::Debug) {
        if self.result.is_err() {
            return;
        }
        self.result = match field.name() {
            "message" => write!(self.writer, "{value:?}"),
            name => write!(self.writer, " {name}={value:?}"),
        };
    }
}

/// Where command output goes.
///
/// Tests can capture both streams in memory.
#[derive(Default)]
pub enum OutputWriter {
    /// The process's stdout and stderr.
    #[default]
    Terminal,
    /// In-memory buffers.
    #[cfg(test)]
    Captured {
        /// Bytes written to stdout.
        stdout: Vec<u8>,
        /// Bytes written to stderr.
        stderr: Vec<u8>,
    },
}

impl OutputWriter {
    pub(crate) fn stdout(&mut self) -> Box<dyn Write + '_> {
        match self {
            Self::Terminal => Box::new(io::BufWriter::new(io::stdout().lock())),
            #[cfg(test)]
            Self::Captured { stdout, .. } => Box::new(stdout),
        }
    }

    pub(crate) fn stderr(&mut self) -> Box<dyn Write + '_> {
        match self {
            Self::Terminal => Box::new(io::BufWriter::new(io::stderr().lock())),
            #[cfg(test)]
            Self::Captured { stderr, .. } => Box::new(stderr),
        }
    }
}
