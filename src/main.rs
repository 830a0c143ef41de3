// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use roi_reader::app::frame_processor::Roi;
use roi_reader::app::frame_processor::tasks::UpscaleFilter;
use roi_reader::config::Config;
use roi_reader::constants::APP_NAME;
use std::path::PathBuf;
use std::sync::Mutex;

mod cli;

#[derive(Parser)]
#[command(name = "roi-reader")]
#[command(about = "Read QR codes and barcodes from regions of a live camera view")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Config file (default: ~/.config/roi-reader/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Camera index to use (from 'roi-reader list')
    #[arg(short, long, global = true)]
    device: Option<usize>,

    /// Write logs to this file (viewer default: ~/.cache/roi-reader/roi-reader.log)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Decode ROIs of a still image
    Scan {
        /// Image file to read
        image: PathBuf,

        /// Region as x,y,w,h[,angle]; repeat for more regions
        #[arg(long = "roi", required = true)]
        rois: Vec<Roi>,

        /// Upsampling factor applied to each region (1 = off)
        #[arg(long, default_value = "1")]
        upscale: u32,

        /// Interpolation filter used when upsampling
        #[arg(long, value_enum, default_value_t = UpscaleFilter::default())]
        filter: UpscaleFilter,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // The viewer owns the terminal, so its logs go to a file by default
    let log_file = cli.log_file.clone().or_else(|| {
        cli.command
            .is_none()
            .then(default_log_path)
            .flatten()
    });
    init_logging(log_file)?;

    match cli.command {
        Some(Commands::List) => cli::list_cameras(),
        Some(Commands::Scan {
            image,
            rois,
            upscale,
            filter,
            json,
        }) => cli::scan_image(&image, &rois, upscale, filter, json),
        None => run_viewer(cli.config, cli.device),
    }
}

/// Initialize logging
///
/// Set RUST_LOG environment variable to control log level
/// Examples: RUST_LOG=debug, RUST_LOG=roi_reader=debug, RUST_LOG=info
fn init_logging(log_file: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true);

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(APP_NAME).join(format!("{}.log", APP_NAME)))
}

fn run_viewer(
    config_path: Option<PathBuf>,
    device: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path.or_else(Config::default_path);
    let mut config = match &config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(index) = device {
        config.device_index = index;
    }

    roi_reader::terminal::run(config, config_path)
}
