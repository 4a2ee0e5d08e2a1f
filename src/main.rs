use clap::Parser;
use dirs::config_dir;
use env_logger::Builder;
use log::LevelFilter;
use std::fs::OpenOptions;
use tpbuild::cli::Cli;
use tpbuild::result::{BuildError, Result};

/** Main entry point for tpbuild
 *
 * # Process Flow
 * 1. Initialize file logging
 * 2. Parse command line arguments
 * 3. Execute the requested command
 *
 * # Error Handling
 * - Clap errors are printed and exit with clap's code
 * - Command errors are logged, printed with any captured tool output, and exit 1
 */
#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logging();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = run(cli).await {
        log::error!("{}", e);
        eprintln!("{}", error_report(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    cli.execute().await
}

fn error_report(e: &BuildError) -> String {
    match e.command_output() {
        Some(output) if !output.trim().is_empty() => {
            format!("Error: {}\nCaptured output:\n{}", e, output.trim_end())
        }
        _ => format!("Error: {}", e),
    }
}

/** Initializes the logging system with file-based output
 *
 * # Configuration
 * - Log file: `<config dir>/tpbuild/tpbuild.log`, current directory as fallback
 * - Level: Info unless `RUST_LOG` says otherwise
 * - Append mode, so logs from earlier runs are kept
 */
fn init_logging() {
    let log_file = get_log_file_path();

    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let mut builder = Builder::new();
    builder.filter_level(LevelFilter::Info).parse_default_env();

    match OpenOptions::new().create(true).append(true).open(&log_file) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => {
            eprintln!("Cannot open log file {}: {}", log_file.display(), e);
        }
    }
    builder.init();

    log::info!("tpbuild started");
}

fn get_log_file_path() -> std::path::PathBuf {
    if let Some(config_dir) = config_dir() {
        config_dir.join("tpbuild").join("tpbuild.log")
    } else {
        std::env::current_dir()
            .map(|p| p.join("tpbuild.log"))
            .unwrap_or_else(|_| "tpbuild.log".into())
    }
}
