// SPDX-License-Identifier: AGPL-3.0-or-later

#![allow(clippy::uninlined_format_args)]
mod config;
mod utils;

use std::convert::TryInto;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use cql2pgjson::{Configuration, Cql2PgJson, SqlSelect};
use log::info;

use crate::config::{load_config, Cli};

/// Builds the log filter, plain levels are scoped to the library.
fn log_filter(log_level: &str) -> String {
    if log_level.contains('=') {
        log_level.to_string()
    } else {
        format!("cql2pgjson={}", log_level)
    }
}

/// Renders the complete statement the query compiles to.
fn render_statement(table: &str, select: &SqlSelect) -> String {
    let mut statement = format!("select * from {} where {}", table, select.get_where());

    if !select.get_order_by().is_empty() {
        statement.push_str(" order by ");
        statement.push_str(select.get_order_by());
    }

    statement
}

fn run() -> Result<String> {
    let cli = Cli::parse();

    // Load configuration parameters and apply defaults
    let (config_file_path, config_file) = load_config(&cli)?;

    env_logger::Builder::new()
        .parse_filters(&log_filter(&config_file.log_level))
        .init();

    match &config_file_path {
        Some(path) => info!("Loading config file from {}", path.display()),
        None => info!("No config file provided"),
    }

    let config: Configuration = config_file.try_into()?;
    let translator = Cql2PgJson::from_config(&config).context("Could not set up translator")?;

    let select = translator
        .to_sql(&cli.query)
        .with_context(|| format!("Could not compile query '{}'", cli.query))?;

    Ok(render_statement(&translator.table_name(), &select))
}

fn main() {
    match run() {
        Ok(statement) => println!("{}", statement),
        Err(err) => {
            eprintln!("{} {:#}", "Error:".red(), err);
            process::exit(1);
        }
    }
}
