use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use log::{info, warn};
use nestrun::config::RunConfig;
use nestrun::io::cli::Cli;
use nestrun::io::output::RunOutput;
use nestrun::{EPOCH, io};
use sheetnest::entities::PackMode;
use sheetnest::io::export::export;
use sheetnest::io::import::Importer;
use sheetnest::io::svg::layout_to_svg;
use sheetnest::packing::{ShapeNester, pack_shelf};
use sheetnest::util::CancelToken;

fn main() -> Result<()> {
    let args = Cli::parse();
    io::init_logger(args.log_level)?;

    let config = match args.config_file {
        None => {
            warn!("[MAIN] No config file provided, use --config-file to provide a custom config");
            RunConfig::default()
        }
        Some(config_file) => {
            let file = File::open(config_file)?;
            let reader = BufReader::new(file);
            serde_json::from_reader(reader).context("incorrect config file format")?
        }
    };

    info!("[MAIN] Successfully parsed RunConfig: {config:?}");

    let job_stem = args
        .job_file
        .file_stem()
        .and_then(|stem| stem.to_str())
        .context("job file has no usable name")?;

    if !args.output_folder.exists() {
        fs::create_dir_all(&args.output_folder)
            .with_context(|| format!("could not create output folder: {:?}", args.output_folder))?;
    }

    let ext_job = io::read_job(args.job_file.as_path())?;
    let instance = Importer::new(config.flatten_tolerance).import_job(&ext_job)?;

    info!(
        "[MAIN] job '{}': {} parts to place on {}x{} mm sheets",
        ext_job.name,
        instance.parts.len(),
        instance.sheet.width,
        instance.sheet.height
    );

    let result = match instance.mode {
        PackMode::Shelf => pack_shelf(&instance)?,
        PackMode::Shape => {
            let cancel = match config.time_limit_ms {
                Some(ms) => CancelToken::with_timeout(Duration::from_millis(ms)),
                None => CancelToken::new(),
            };
            ShapeNester::new(&instance, cancel)?.solve()
        }
    };

    if !result.unplaced.is_empty() {
        warn!(
            "[MAIN] {} of {} parts could not be placed: {:?}",
            result.unplaced.len(),
            instance.parts.len(),
            result.unplaced
        );
    }

    let output = RunOutput {
        solution: export(&instance, &result, *EPOCH),
        job: ext_job,
        config,
    };

    {
        let solution_path = args.output_folder.join(format!("sol_{job_stem}.json"));
        io::write_json(&output, Path::new(&solution_path))?;
    }

    {
        for layout in &result.sheets {
            let svg_path = args
                .output_folder
                .join(format!("sol_{job_stem}_{}.svg", layout.sheet_index));
            let svg = layout_to_svg(layout, &instance, config.svg_draw_options, &output.job.name);
            io::write_svg(&svg, Path::new(&svg_path))?;
        }
    }

    Ok(())
}
