use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use coco_clean::{run_clean_pipeline, CleanArgs};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = CleanArgs::parse();
    let options = args.to_clean_options();

    info!("Starting the cleaning process...");

    match run_clean_pipeline(&options) {
        Ok(report) => {
            if report.is_clean() {
                info!("No inconsistencies found.");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to clean dataset: {}", e);
            ExitCode::FAILURE
        }
    }
}
