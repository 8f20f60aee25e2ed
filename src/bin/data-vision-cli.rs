#![cfg(not(tarpaulin_include))]

use clap::{Parser, Subcommand};
use data_vision::compare::compare_datasets;
use data_vision::config::init_logging;
use data_vision::dataset::Dataset;
use data_vision::formula::{FormulaKind, calculate};
use data_vision::loader::load_file;
use data_vision::period::{Period, PeriodAggregate, aggregate_by_period};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Run the calculation engines over local CSV/Excel files and print JSON
#[derive(Parser)]
#[command(name = "data-vision-cli", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the headers and row count of a file
    Info { file: PathBuf },

    /// Run a formula (sum, average, max, min, groupSum, groupAvg, trend,
    /// compare, distribution, statistics)
    Calc {
        file: PathBuf,
        #[arg(long)]
        formula: String,
        /// Grouping / label column
        #[arg(long, default_value = "")]
        x: String,
        /// Value column
        #[arg(long)]
        y: String,
    },

    /// Sum a value column per day, week, month or year
    Aggregate {
        file: PathBuf,
        #[arg(long)]
        date_column: String,
        #[arg(long)]
        value_column: String,
        #[arg(long, default_value = "month")]
        period: Period,
    },

    /// Compare totals of several files on the same columns
    Compare {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        value_column: String,
        #[arg(long)]
        label_column: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Info { file } => {
            let id = file.display().to_string();
            print_json(&load_file(&file)?.info(&id))
        }
        Command::Calc {
            file,
            formula,
            x,
            y,
        } => {
            let dataset = load_file(&file)?;
            let formula = FormulaKind::from_name(&formula);
            if formula == FormulaKind::Raw {
                log::warn!("unknown formula, returning raw rows");
            }
            print_json(&calculate(&dataset.rows, formula, &x, &y))
        }
        Command::Aggregate {
            file,
            date_column,
            value_column,
            period,
        } => {
            let dataset = load_file(&file)?;
            let data = aggregate_by_period(&dataset.rows, &date_column, &value_column, period);
            print_json(&PeriodAggregate { data })
        }
        Command::Compare {
            files,
            value_column,
            label_column,
        } => {
            let mut ids = Vec::with_capacity(files.len());
            let mut datasets: HashMap<String, Arc<Dataset>> = HashMap::new();
            for file in &files {
                let id = file.display().to_string();
                match load_file(file) {
                    Ok(dataset) => {
                        datasets.insert(id.clone(), Arc::new(dataset));
                    }
                    // Unreadable files drop out of the comparison
                    Err(e) => log::warn!("skipping {}: {}", id, e),
                }
                ids.push(id);
            }
            let lookup = |id: &str| datasets.get(id).cloned();
            print_json(&compare_datasets(&ids, &lookup, &value_column, &label_column))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
