use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use coco_clean::{process_dataset, ExportArgs};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = ExportArgs::parse();

    info!("Starting COCO to YOLO conversion...");

    match process_dataset(&args) {
        Ok(_) => {
            info!("Conversion process completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to process dataset: {}", e);
            ExitCode::FAILURE
        }
    }
}
