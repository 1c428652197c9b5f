//! `dex`: metadata-driven dataset exports.

use std::io::{self, IsTerminal};
use std::path::Path;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use tracing::level_filters::LevelFilter;

use dex_cli::commands::{run_build, run_columns, run_split, run_validate};
use dex_cli::job::{Job, JobFile};
use dex_cli::logging::{LogConfig, LogFormat, init_logging};
use dex_cli::summary::{print_split, print_summary};

mod cli;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(&cli.command) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(command: &Command) -> Result<i32> {
    match command {
        Command::Build(args) => {
            let job = load_job(args.job.job.as_deref(), args.to_job_file())?;
            let result = run_build(&job)?;
            print_summary(&result);
            Ok(i32::from(result.has_errors()))
        }
        Command::Validate(args) => {
            let job = load_job(args.job.as_deref(), args.to_job_file())?;
            let result = run_validate(&job)?;
            print_summary(&result);
            Ok(i32::from(result.has_errors()))
        }
        Command::Columns(args) => {
            let table = run_columns(&args.metadata, args.group.as_deref(), args.hierarchy.as_deref())?;
            println!("{table}");
            Ok(0)
        }
        Command::Split(args) => {
            let summary = run_split(&args.field, &args.source, &args.output)?;
            print_split(&summary);
            Ok(0)
        }
    }
}

fn load_job(path: Option<&Path>, flags: JobFile) -> Result<Job> {
    let file = match path {
        Some(path) => JobFile::load(path)?,
        None => JobFile::default(),
    };
    file.merge(flags).resolve()
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
