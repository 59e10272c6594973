//! Entrypoint of the influxdb_lp binary
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]

use clap::Parser;
use dotenvy::dotenv;
use logging::LoggingConfig;

mod commands {
    pub(crate) mod encode;
}
mod logging;

enum ReturnCode {
    Failure = 1,
}

#[derive(Debug, clap::Parser)]
#[clap(
    name = "influxdb_lp",
    version,
    about = "Encode JSON batches of points into InfluxDB line protocol",
    long_about = r#"Encode JSON batches of points into InfluxDB line protocol

Examples:
    # Encode the batches in a file to stdout
    influxdb_lp encode batches.json

    # Encode stdin, adding a default tag and writing integers with the `i` suffix
    cat batch.json | influxdb_lp encode --tag region=us-west --force-integers

    # Encode with a fixed default timestamp and millisecond precision into a file
    influxdb_lp encode --time 2024-01-01T00:00:00Z --precision ms -o out.lp batch.json

    # Show debug logs on stderr
    LOG_FILTER=debug influxdb_lp encode batch.json
"#
)]
struct Config {
    #[clap(flatten)]
    logging_config: LoggingConfig,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Parser)]
enum Command {
    /// Encode JSON batches into line protocol
    Encode(commands::encode::Config),
}

fn main() {
    load_dotenv();

    let config = Config::parse();

    if let Err(e) = config.logging_config.install_global_subscriber() {
        eprintln!("Initializing logs failed: {e}");
        std::process::exit(ReturnCode::Failure as _);
    }

    match config.command {
        Command::Encode(config) => {
            if let Err(e) = commands::encode::command(config) {
                eprintln!("Encode command failed: {e}");
                std::process::exit(ReturnCode::Failure as _)
            }
        }
    }
}

/// Source the .env file before initialising the Config struct - this sets
/// any envs in the file, which the Config struct then uses.
///
/// Precedence is given to existing env variables.
fn load_dotenv() {
    match dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            // a missing env file is not an error
        }
        Err(e) => {
            eprintln!("FATAL Error loading config from: {e}");
            eprintln!("Aborting");
            std::process::exit(ReturnCode::Failure as _);
        }
    };
}
