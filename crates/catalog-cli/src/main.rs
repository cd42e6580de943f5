//! Data catalog CLI.

use std::io::{self, IsTerminal};

use anyhow::Result;
use clap::{ColorChoice, Parser};
use serde::Serialize;
use tracing::Level;

use catalog_cli::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use catalog_cli::commands::{
    run_add, run_analyze, run_delete, run_export, run_import, run_init, run_list, run_publish,
    run_remove,
};
use catalog_cli::logging::{LogConfig, LogFormat, init_logging};
use catalog_cli::summary::{
    print_column_matches, print_entities, print_export, print_import_summary,
    print_publish_summary,
};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(&cli) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> Result<()> {
    let store = &cli.store;
    match &cli.command {
        Command::Init(args) => {
            let catalogs = run_init(store, args)?;
            println!(
                "Created {} with catalogs: {}",
                store.catalog_file.display(),
                catalogs.join(", ")
            );
        }
        Command::Add(args) => {
            let created = run_add(store, args)?;
            print_entities(&created);
        }
        Command::List(args) => {
            let entities = run_list(store, args)?;
            if args.json {
                print_json(&entities)?;
            } else {
                print_entities(&entities);
            }
        }
        Command::Remove(args) => {
            let removed = run_remove(store, args)?;
            println!("Removed {removed} entities");
        }
        Command::Analyze(args) => {
            let matches = run_analyze(store, args)?;
            if args.json {
                print_json(&matches)?;
            } else {
                print_column_matches(&matches);
            }
        }
        Command::Import(args) => {
            let summary = run_import(store, args)?;
            print_import_summary(&summary);
        }
        Command::Export(args) => {
            let outcome = run_export(store, args)?;
            print_export(&outcome);
        }
        Command::Delete(args) => {
            let removed = run_delete(store, args)?;
            println!("Deleted {removed} individuals");
        }
        Command::Publish(args) => {
            let summary = run_publish(store, args)?;
            print_publish_summary(&summary);
        }
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Explicit `--log-level` wins over `-v`/`-q`.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let level = match cli.log_level {
        Some(LogLevelArg::Error) => Some(Level::ERROR),
        Some(LogLevelArg::Warn) => Some(Level::WARN),
        Some(LogLevelArg::Info) => Some(Level::INFO),
        Some(LogLevelArg::Debug) => Some(Level::DEBUG),
        Some(LogLevelArg::Trace) => Some(Level::TRACE),
        None => cli.verbosity.tracing_level(),
    };
    let format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    let with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    LogConfig::default()
        .with_level(level)
        .with_format(format)
        .with_log_file(cli.log_file.clone())
        .with_ansi(with_ansi)
        .with_log_data(cli.log_data)
}
