// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{ExpectedError, Result},
    output::{ColorOpts, OutputContext, OutputWriter},
};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use sandbox_test_protocol::{SandboxTestExitCode, SpecPath};
use sandbox_test_session::{
    config::{ConfigLocation, SessionConfig},
    driver::{DriverReport, SessionDriver},
    reporter::SessionReporter,
    session::{MissingSpecPolicy, TestSession},
    transport::{JsonLinesSink, RecordingSink},
};
use std::{future::Future, io::Write};
use tracing::{debug, info, warn};

/// Replay or listen to the event stream of a sandboxed JavaScript test runner.
#[derive(Debug, Parser)]
#[command(
    version,
    bin_name = "sandbox-test",
    styles = crate::output::palette::clap(),
    max_term_width = 100,
)]
pub struct SandboxTestApp {
    #[clap(flatten)]
    color: ColorOpts,

    #[clap(subcommand)]
    command: Command,
}

impl SandboxTestApp {
    /// Initializes the output context, including logging.
    pub fn init_output(&self) -> OutputContext {
        self.color.install()
    }

    /// Executes the app, returning the process exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        match self.command {
            Command::Replay(opts) => opts.exec(output, output_writer),
            Command::Listen(opts) => opts.exec(output, output_writer),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay a recorded event stream and print the resulting tree
    ///
    /// The file contains one JSON message per line, exactly as sent by the runner.
    Replay(ReplayOpts),

    /// Start a test run, then consume events from standard input
    ///
    /// The run command is written to standard output as a single line of JSON. Events are read
    /// from standard input until it closes or Ctrl-C is pressed, and the summary is printed to
    /// standard error.
    Listen(ListenOpts),
}

#[derive(Debug, Args)]
struct SessionOpts {
    /// Config file [default: $XDG_CONFIG_HOME/sandbox-test/config.toml]
    ///
    /// Pass in `none` to use only built-in defaults.
    #[arg(long, global = true, value_name = "PATH", env = "SANDBOX_TEST_CONFIG")]
    config: Option<String>,

    /// Show every test, not just failures
    #[arg(long, short)]
    verbose: bool,

    /// What to do with events for a test file that was never added
    #[arg(long, value_enum, value_name = "POLICY")]
    missing_spec: Option<MissingSpecOpt>,

    /// The active test file
    #[arg(long, value_name = "PATH")]
    active_file: Option<String>,
}

impl SessionOpts {
    fn load(&self) -> Result<(SessionConfig, TestSession)> {
        let location = ConfigLocation::from_cli_or_env(self.config.as_deref());
        let mut config = SessionConfig::load(location)?;
        if self.verbose {
            config.session.verbose = true;
        }
        if let Some(missing_spec) = self.missing_spec {
            config.session.missing_spec = missing_spec.into();
        }
        debug!(?config, "loaded config");

        let mut session = TestSession::new(config.session_options());
        session.set_active_file(self.active_file.as_deref().map(SpecPath::new));
        Ok((config, session))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum MissingSpecOpt {
    /// Ignore the event and log a warning
    Discard,
    /// Create an empty entry for the file first
    Create,
}

impl From<MissingSpecOpt> for MissingSpecPolicy {
    fn from(opt: MissingSpecOpt) -> Self {
        match opt {
            MissingSpecOpt::Discard => MissingSpecPolicy::Discard,
            MissingSpecOpt::Create => MissingSpecPolicy::Create,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
enum RunModeOpt {
    /// Accept events for every file
    #[default]
    All,
    /// Accept only events for the active file
    Single,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
enum MessageFormat {
    /// A tree of results and a summary
    #[default]
    Human,
    /// The final session state and summary as JSON
    Json,
}

#[derive(Debug, Args)]
struct ReplayOpts {
    /// Path to the recorded event stream
    #[arg(value_name = "FILE")]
    file: Utf8PathBuf,

    /// Which files the recorded run targeted
    #[arg(long, value_enum, default_value_t, requires = "active_file")]
    run_mode: RunModeOpt,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    message_format: MessageFormat,

    #[clap(flatten)]
    session: SessionOpts,
}

impl ReplayOpts {
    fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let (config, mut session) = self.session.load()?;
        if self.run_mode == RunModeOpt::Single {
            // Recordings start after the run command, so it is only applied locally.
            session
                .run_spec(&mut RecordingSink::new())
                .map_err(ExpectedError::run_control)?;
        }

        let path = self.file;
        let report = block_on(async {
            let file = tokio::fs::File::open(&path)
                .await
                .map_err(|err| ExpectedError::InputOpenError {
                    path: path.clone(),
                    err,
                })?;
            let reader = tokio::io::BufReader::new(file);
            Ok::<_, ExpectedError>(SessionDriver::new(&mut session).run(reader).await?)
        })?;
        log_report(&report);

        let state = session.snapshot();
        let summary = session.summary();
        let mut stdout = output_writer.stdout();
        match self.message_format {
            MessageFormat::Human => {
                let mut reporter = SessionReporter::new(&config.display);
                if output.colorize(supports_color::Stream::Stdout) {
                    reporter.colorize();
                }
                reporter
                    .write_report(&state, &mut stdout)
                    .map_err(|err| ExpectedError::WriteError { err })?;
            }
            MessageFormat::Json => {
                let to_value = |value: serde_json::Result<serde_json::Value>| {
                    value.map_err(|err| ExpectedError::SerializeError { err })
                };
                let mut json = serde_json::Map::new();
                json.insert("state".to_owned(), to_value(serde_json::to_value(&*state))?);
                json.insert("summary".to_owned(), to_value(serde_json::to_value(summary))?);
                serde_json::to_writer_pretty(&mut stdout, &json)
                    .map_err(|err| ExpectedError::SerializeError { err })?;
                writeln!(stdout).map_err(|err| ExpectedError::WriteError { err })?;
            }
        }
        stdout
            .flush()
            .map_err(|err| ExpectedError::WriteError { err })?;

        final_exit_code(summary.has_failures())
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
enum RunTarget {
    /// Run every test file
    #[default]
    All,
    /// Run only the active file
    Spec,
}

#[derive(Debug, Args)]
struct ListenOpts {
    /// Which tests to run
    #[arg(long, value_enum, default_value_t)]
    run: RunTarget,

    #[clap(flatten)]
    session: SessionOpts,
}

impl ListenOpts {
    fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let (config, mut session) = self.session.load()?;

        let mut sink = JsonLinesSink::new(output_writer.stdout());
        match self.run {
            RunTarget::All => session.run_all_tests(&mut sink),
            RunTarget::Spec => session.run_spec(&mut sink),
        }
        .map_err(ExpectedError::run_control)?;
        drop(sink);

        let report = block_on(async {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            Ok::<_, ExpectedError>(SessionDriver::new(&mut session).run(stdin).await?)
        })?;
        log_report(&report);

        let mut reporter = SessionReporter::new(&config.display);
        if output.colorize(supports_color::Stream::Stderr) {
            reporter.colorize();
        }
        let mut stderr = output_writer.stderr();
        reporter
            .write_summary(&session.snapshot(), &mut stderr)
            .and_then(|()| stderr.flush())
            .map_err(|err| ExpectedError::WriteError { err })?;

        final_exit_code(session.summary().has_failures())
    }
}

fn block_on<T>(future: impl Future<Output = Result<T>>) -> Result<T> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| ExpectedError::RuntimeBuildError { err })?;
    runtime.block_on(future)
}

fn log_report(report: &DriverReport) {
    debug!(?report, "event stream finished");
    if report.interrupted {
        info!("stopped reading events after {} lines", report.lines);
    }
    if report.malformed > 0 {
        warn!("skipped {} malformed lines", report.malformed);
    }
    if report.anomalies > 0 {
        warn!(
            "ignored {} events that referred to unknown test files",
            report.anomalies
        );
    }
}

fn final_exit_code(has_failures: bool) -> Result<i32> {
    if has_failures {
        Err(ExpectedError::TestRunFailed)
    } else {
        Ok(SandboxTestExitCode::OK)
    }
}
