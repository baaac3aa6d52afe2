use flavorseq::cli::Args;
use flavorseq::config;
use flavorseq::runner::run_app;

use clap::Parser;
use log::{debug, error, info};

fn main() {
    // Parse command-line arguments first (needed for log setup)
    let args = Args::parse();

    // Create path configuration from CLI args and environment
    let path_config = config::PathConfig::from_env_and_cli(args.config_dir.clone());

    // Determine log level based on verbosity flags
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    // Initialize logger based on --log flag
    if let Some(log_path_opt) = &args.log_file {
        // File logging with specified verbosity level
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| config::data_file("flavorseq.log", &path_config));

        if let Err(e) = config::ensure_dirs(&path_config) {
            eprintln!("Warning: Failed to create application directories: {}", e);
        }

        let file = match std::fs::File::create(&log_path) {
            Ok(file) => file,
            Err(e) => {
                eprintln!("Error: Failed to create log file {}: {}", log_path.display(), e);
                std::process::exit(1);
            }
        };

        env_logger::Builder::new()
            .filter_level(log_level)
            .filter_module("image", log::LevelFilter::Warn)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!(
            "Logging to file: {} (level: {:?})",
            log_path.display(),
            log_level
        );
    } else {
        // Console logging with specified verbosity level (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .filter_module("image", log::LevelFilter::Warn)
            .format_timestamp_millis()
            .init();
    }

    info!("flavorseq v{} starting...", env!("CARGO_PKG_VERSION"));
    debug!("Command-line args: {:?}", args);

    if let Err(e) = run_app(args) {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
