use clap::Parser;
use log::{error, info};
use std::path::{Path, PathBuf};

use mask2yolo::{process_voc_folder, OverlayArgs, SamSession};

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = OverlayArgs::parse();

    let dataset_dir = PathBuf::from(&args.dataset_dir);
    if !dataset_dir.exists() {
        error!(
            "The specified dataset_dir does not exist: {}",
            args.dataset_dir
        );
        return;
    }

    info!("Loading the segmentation model...");
    let mut segmenter =
        match SamSession::from_files(Path::new(&args.encoder), Path::new(&args.decoder), args.threads)
        {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to load the segmentation model: {}", e);
                return;
            }
        };

    info!("Starting the overlay rendering process...");
    match process_voc_folder(&args, &mut segmenter) {
        Ok(_) => info!("All files processed successfully!"),
        Err(e) => error!("General error: {}", e),
    }
}
