#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # spr
//!
//! Evaluates every student repository listed in a GitHub Classroom grades
//! export and writes one CSV row per repository.
//!
//! Run it from the directory holding the cloned repositories (or set
//! `repositories` in the configuration):
//!
//! ```text
//! spr --config spr.json --summary
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use bpaf::*;
use dotenvy::dotenv;
use spr::{
    config::{CONFIG_FILENAME, Config},
    evaluation::Evaluator,
    grade::load_grades,
    report::{summary_table, write_evaluations},
    student::load_students,
};
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Command line options.
#[derive(Debug, Clone)]
struct Options {
    /// Path to the configuration file.
    config:  PathBuf,
    /// Log at debug level.
    verbose: bool,
    /// Print a summary table after the report is written.
    summary: bool,
}

/// Parse the command line arguments and return the `Options`
fn options() -> Options {
    let config = short('c')
        .long("config")
        .help("Path to the JSON configuration file")
        .argument::<PathBuf>("PATH")
        .fallback(PathBuf::from(CONFIG_FILENAME))
        .debug_fallback();
    let verbose = short('v')
        .long("verbose")
        .help("Log every commit and command")
        .switch();
    let summary = short('s')
        .long("summary")
        .help("Print a summary table of the evaluations")
        .switch();

    construct!(Options {
        config,
        verbose,
        summary
    })
    .to_options()
    .descr("Evaluate a cohort of student repositories")
    .run()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv().ok();
    let options = options();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let filter_layer = LevelFilter::from_level(if options.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    });
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    let config = Config::load(&options.config)?;
    tracing::debug!("{config:?}");

    let students = load_students(config.students())?;
    tracing::info!("{} students loaded from csv file", students.len());

    let grades = load_grades(config.grades())?;
    tracing::info!("{} grades loaded from csv file", grades.len());

    let evaluator = Evaluator::new(&config);
    for program in evaluator.missing_programs() {
        tracing::warn!("`{program}` was not found on PATH, commands using it will fail");
    }

    let evaluations = evaluator
        .evaluate_repositories(&students, &grades)
        .await
        .context("Evaluation aborted")?;
    write_evaluations(config.evaluations(), &evaluations, evaluator.commands())?;

    if options.summary {
        println!("{}", summary_table(&evaluations));
    }

    Ok(())
}
