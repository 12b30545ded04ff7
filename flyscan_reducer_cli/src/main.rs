//! # flyscan_reducer_cli
//!
//! Part of the flyscan_reducer crate family.
//!
//! This is the application to reduce USAXS fly scan data from the command line.
//!
//! ## Use
//!
//! Make a template configuration with
//!
//! ```bash
//! flyscan_reducer_cli -p config.yml new
//! ```
//!
//! edit it, and then reduce with
//!
//! ```bash
//! flyscan_reducer_cli -p config.yml
//! ```
//!
//! Detailed progress of every reduction is written to `flyscan_reducer.log` in the
//! working directory.
use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};

use libflyscan_reducer::config::Config;
use libflyscan_reducer::process::{
    create_subsets, process_combined, process_subset, ProcessSummary,
};
use libflyscan_reducer::worker_status::{BarColor, WorkerStatus};

const LOG_FILE_NAME: &str = "flyscan_reducer.log";

fn make_template_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config)?;
    std::fs::write(path, yaml_str)?;
    Ok(())
}

/// Send the library's logging to a file, so that it does not fight the progress bars
fn init_file_logger(path: &Path) -> spdlog::Result<()> {
    let file_sink = Arc::new(
        spdlog::sink::FileSink::builder()
            .path(path.to_path_buf())
            .truncate(true)
            .build()?,
    );
    let logger = Arc::new(
        spdlog::Logger::builder()
            .flush_level_filter(spdlog::LevelFilter::All)
            .sink(file_sink)
            .build()?,
    );
    spdlog::set_default_logger(logger);
    Ok(())
}

fn bar_style(color: &BarColor) -> ProgressStyle {
    let template = match color {
        BarColor::CYAN => "[worker {prefix}] {bar:40.cyan/blue} {pos:>3}% {msg}",
        BarColor::GREEN => "[worker {prefix}] {bar:40.green/blue} {pos:>3}% {msg}",
        BarColor::RED => "[worker {prefix}] {bar:40.red/blue} {pos:>3}% {msg}",
    };
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn main() {
    // Create a cli
    let matches = Command::new("flyscan_reducer_cli")
        .about("Reduce USAXS fly scan raw data to R(Q)")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .required(true)
                .help("Path to the configuration file"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    if let Err(e) = LogWrapper::new(pb_manager.clone(), logger).try_init() {
        eprintln!("Could not create logging/progress: {e}");
        return;
    }
    log::set_max_level(log::LevelFilter::Info);

    if let Err(e) = init_file_logger(Path::new(LOG_FILE_NAME)) {
        log::error!("Could not create log file {LOG_FILE_NAME}: {e}");
        return;
    }

    // Parse the cli
    let config_path = match matches.get_one::<String>("path") {
        Some(p) => PathBuf::from(p),
        None => {
            log::error!("A configuration path is required");
            return;
        }
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        match make_template_config(&config_path) {
            Ok(()) => log::info!("Done."),
            Err(e) => log::error!("Failed to write template config: {e}"),
        }
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    if let Err(e) = config.validate() {
        log::error!("{e}");
        return;
    }
    log::info!("Config successfully loaded.");
    log::info!("Raw Path: {}", config.raw_path.to_string_lossy());
    log::info!("Output Path: {}", config.output_path.to_string_lossy());
    log::info!(
        "Bins: {} Q range: {:?} to {:?}",
        config.number_of_bins,
        config.q_floor,
        config.q_ceiling
    );
    match config.centroid {
        Some(centroid) => log::info!("Using supplied beam centroid {centroid} degrees"),
        None => log::info!("Beam centroid will be computed from each scan"),
    }

    let files = match config.get_raw_files() {
        Ok(f) => f,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Found {} raw fly scans.", files.len());

    // A combined output file has a single writer, so it gets a single worker
    let combined = config.combined_output.is_some();
    let subsets = if combined {
        log::info!(
            "Writing every scan to {:?} with one worker.",
            config.combined_output
        );
        vec![files.clone()]
    } else {
        create_subsets(&config, &files)
    };

    // Spawn the workers! Each gets its own progress bar
    let (tx, rx) = mpsc::channel::<WorkerStatus>();
    let mut bars: Vec<ProgressBar> = vec![];
    let mut workers = vec![];
    for (idx, subset) in subsets.into_iter().enumerate() {
        // Dont make empty workers
        if subset.is_empty() {
            continue;
        }
        let bar = pb_manager.add(ProgressBar::new(100));
        bar.set_style(bar_style(&BarColor::CYAN));
        bar.set_prefix(idx.to_string());
        bars.push(bar);
        let conf = config.clone();
        let worker_tx = tx.clone();
        workers.push(std::thread::spawn(move || {
            if combined {
                process_combined(conf, worker_tx, idx, subset)
            } else {
                process_subset(conf, worker_tx, idx, subset)
            }
        }));
    }
    // Only the workers hold senders now, so the loop below ends when they all finish
    drop(tx);

    for status in rx.iter() {
        if let Some(bar) = bars.get(status.worker_id) {
            bar.set_style(bar_style(&status.color));
            bar.set_position((status.progress * 100.0) as u64);
            bar.set_message(status.dataset.clone());
        }
        if status.color == BarColor::RED {
            log::warn!(
                "Reduction of {} failed. Check {LOG_FILE_NAME} for details.",
                status.dataset
            );
        }
    }

    let mut summary = ProcessSummary::default();
    for worker in workers {
        match worker.join() {
            Ok(Ok(worker_summary)) => summary.merge(worker_summary),
            Ok(Err(e)) => log::error!("Reduction worker failed with error: {e}"),
            Err(_) => log::error!("Failed to join reduction worker!"),
        }
    }
    for bar in bars.iter() {
        bar.finish();
    }

    log::info!(
        "Reduced {} of {} fly scans.",
        summary.reduced.len(),
        files.len()
    );
    for failed in summary.failed.iter() {
        log::warn!("Not reduced: {}", failed.to_string_lossy());
    }
    log::info!("Done.");
}
