//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments (after loading `.env`)
//! - installs logging for the chosen front-end
//! - dispatches to training, the page handlers or the dashboard

use clap::Parser;

use crate::cli::{Cli, Command, ExploreArgs, PathArgs, PredictArgs, SampleArgs, TrainArgs};
use crate::data::{generate_sample, write_inventory_csv, SampleConfig};
use crate::domain::TrainConfig;
use crate::error::AppError;
use crate::logging::{self, LogTarget};
use crate::report::format;

use self::pages::Session;

pub mod pages;
pub mod pipeline;

/// Entry point for the `demand` binary.
pub fn run() -> Result<(), AppError> {
    // `DEMAND_DATASET` / `DEMAND_ARTIFACTS` / `DEMAND_LOG` may come from `.env`.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // The dashboard owns the screen, so its logs go to a file.
    let target = match cli.command {
        None | Some(Command::Tui) => LogTarget::File(cli.paths.artifacts.clone()),
        Some(_) => LogTarget::Stderr,
    };
    logging::init(&target)?;

    match cli.command {
        Some(Command::Train(args)) => handle_train(&cli.paths, &args),
        Some(Command::Explore(args)) => handle_explore(&cli.paths, &args),
        Some(Command::Report) => handle_report(&cli.paths),
        Some(Command::Predict(args)) => handle_predict(&cli.paths, &args),
        Some(Command::Sample(args)) => handle_sample(&cli.paths, &args),
        Some(Command::Tui) | None => crate::tui::run(TrainConfig::new(&cli.paths.dataset, &cli.paths.artifacts)),
    }
}

fn handle_train(paths: &PathArgs, args: &TrainArgs) -> Result<(), AppError> {
    let config = crate::cli::train_config(paths, args);
    let summary = pipeline::run_training(&config)?;
    println!("{}", format::format_training_summary(&summary));
    Ok(())
}

fn handle_explore(paths: &PathArgs, args: &ExploreArgs) -> Result<(), AppError> {
    let mut session = Session::new(&paths.dataset, &paths.artifacts);
    let page = pages::explore_page(&mut session)?;
    println!("{}", format::format_explore_page(&page, args.width, args.height));
    Ok(())
}

fn handle_report(paths: &PathArgs) -> Result<(), AppError> {
    let mut session = Session::new(&paths.dataset, &paths.artifacts);
    let page = pages::performance_page(&mut session)?;
    println!("{}", format::format_performance_page(&page));
    Ok(())
}

/// Prints whatever the models produced; fails only if no model could answer.
fn handle_predict(paths: &PathArgs, args: &PredictArgs) -> Result<(), AppError> {
    let mut session = Session::new(&paths.dataset, &paths.artifacts);
    let request = args.to_request(chrono::Local::now().date_naive());
    let page = pages::predict_page(&mut session, &request);
    println!("{}", format::format_prediction_page(&page));

    let all_failed = page
        .outcomes
        .iter()
        .all(|o| matches!(o, pages::ModelOutcome::Failed { .. }));
    if all_failed {
        return Err(AppError::Prediction(
            "No model could classify the observation. Run `demand train` first.".to_string(),
        ));
    }
    Ok(())
}

fn handle_sample(paths: &PathArgs, args: &SampleArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        start_date: args.start,
        days: args.days,
        rows_per_day: args.rows_per_day,
        seed: args.seed,
    };
    let records = generate_sample(&config)?;
    let output = args.output.as_ref().unwrap_or(&paths.dataset);
    write_inventory_csv(output, &records)?;
    tracing::info!(rows = records.len(), path = %output.display(), "wrote sample dataset");
    println!("Wrote {} rows to {}", records.len(), output.display());
    Ok(())
}
