//! `gdpr-sanitizer` entry-point: rewrites personal data in a site snapshot.
//!
//! Logs go to stderr; stdout carries only the prompt and the final report.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io::{self, BufRead, Write};

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use gdpr_sanitizer::cli::{
    CliArgs, CommandOutcome, Invocation, SanitizerSettings, render_table, run_command,
    success_message,
};
use ortho_config::OrthoConfig;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing()?;

    let args = CliArgs::parse();
    let settings = SanitizerSettings::load_from_iter([OsString::from("gdpr-sanitizer")])
        .map_err(|err| eyre!("failed to load settings: {err}"))?;
    let invocation = Invocation::resolve(args, &settings)?;

    match run_command(&invocation, confirm)? {
        CommandOutcome::Completed(result) => {
            let mut out = io::stdout().lock();
            writeln!(out, "{}", render_table(&result))?;
            writeln!(out, "Success: {}", success_message(&result))?;
        }
        CommandOutcome::Aborted => {}
    }
    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|err| eyre!("failed to install tracing subscriber: {err}"))
}

fn confirm(question: &str) -> io::Result<bool> {
    let mut out = io::stdout().lock();
    write!(out, "{question} [y/n] ")?;
    out.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
