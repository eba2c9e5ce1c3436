use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// The nesting job to run
    #[arg(short = 'i', long, value_name = "FILE")]
    pub job_file: PathBuf,
    /// Folder the solution JSON and SVGs land in
    #[arg(short = 'o', long, value_name = "FOLDER")]
    pub output_folder: PathBuf,
    /// Optional runner configuration
    #[arg(short, long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,
    #[arg(
        short,
        long,
        value_name = "[off, error, warn, info, debug, trace]",
        default_value = "info"
    )]
    pub log_level: LevelFilter,
}
