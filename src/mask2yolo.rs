use clap::Parser;
use log::{error, info};
use std::path::PathBuf;

use mask2yolo::{process_dataset, setup_output_directories, MaskArgs};

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = MaskArgs::parse();

    let root = PathBuf::from(&args.root_dir);
    if !root.exists() {
        error!("The specified root_dir does not exist: {}", args.root_dir);
        return;
    }

    info!("Starting the mask conversion process...");

    match setup_output_directories(&PathBuf::from(&args.output_dir)) {
        Ok(output_dirs) => {
            if let Err(e) = process_dataset(&args, &root, &output_dirs) {
                error!("Failed to process dataset: {}", e);
            } else {
                info!("Mask conversion completed successfully.");
            }
        }
        Err(e) => error!("Failed to set up output directories: {}", e),
    }
}
