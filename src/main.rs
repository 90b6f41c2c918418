use clap::Parser;
use log::{error, info, LevelFilter};
use std::path::PathBuf;

mod config;
mod decoder;
mod error;
mod extract;
mod input;
mod output;
mod sink;

use config::ExtractConfig;

/// Extract IQ sample frames carried in UDP packets of a capture file
#[derive(Parser, Debug)]
#[command(name = "iq-extract")]
#[command(version, about, long_about = None)]
struct Args {
    /// Input capture file (pcap/pcapng)
    #[arg(value_name = "INPUT")]
    input_file: PathBuf,

    /// Output WAV file; the sample log is written to <OUTPUT>.txt
    #[arg(value_name = "OUTPUT")]
    output_file: PathBuf,

    /// Verbose output (report every skipped packet)
    #[arg(short, long)]
    verbose: bool,

    /// Only report errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(a) => a,
        Err(e) => {
            // Usage problems are reported, not signalled through the exit code
            let _ = e.print();
            return;
        }
    };

    let level = if args.quiet {
        LevelFilter::Error
    } else if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .format_timestamp_secs()
        .init();

    let config = ExtractConfig::new(args.input_file, args.output_file);

    match extract::process_capture(&config) {
        Ok(stats) => {
            info!("\n{stats}");
            println!("Extraction complete.");
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}
