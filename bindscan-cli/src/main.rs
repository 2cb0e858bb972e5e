//! # Bindscan CLI - Binding Model Scanner
//!
//! A command-line interface for scoring DNA sequences against a directory of
//! binding models.
//!
//! ## Usage
//!
//! ```bash
//! # Whole-sequence predictions for every model in a directory
//! bindscan -i seqs.fa -m models/
//!
//! # Scan with 24-base windows, keeping the prediction maps, as JSON
//! bindscan -i seqs.fa -m models/ --scan 24 --pmaps -f json -o scan.json
//!
//! # Attribution maps from finite differences, restricted to two models
//! bindscan -i seqs.fa -m models/ --include CTCF,MAX --gmaps --finite-diff -f json
//! ```
//!
//! ## Options
//!
//! - `-i, --input <FILE>`: Input FASTA file
//! - `-m, --models <DIR>`: Model directory (`.pfm` files or model subdirectories)
//! - `--include <LIST|FILE>`: Comma-separated model ids, or a file of ids
//! - `--scan <W>`: Scan with windows of `W` bases
//! - `--stride <S>`: Distance between window starts (default: 1)
//! - `--pmaps`: Keep prediction maps (JSON output)
//! - `--gmaps`: Compute attribution maps (JSON output)
//! - `--finite-diff`: Compute attribution by substitution instead of gradients
//! - `--strand <MODE>`: single, both or force (default: single)
//! - `--batch-size <N>`: Model inputs per evaluation (default: 2048)
//! - `--devices <N>`: Worker count (default: one per core)
//! - `--threads <N>`: Threads per worker
//! - `--no-isolation`: Run models sequentially on the main thread
//! - `--outdir <DIR>`: Directory for per-run artifacts
//! - `-f, --format <FORMAT>`: Output format: tsv, json (default: tsv)
//! - `-o, --output <FILE>`: Output file (default: stdout)
//! - `-q, --quiet`: Only log warnings and errors
//! - `-v, --verbose`: Log debug messages and per-model progress

use bindscan_core::config::{
    AttributionMode, OutputFormat, PredictRequest, ScanConfig, ScanWindow, StrandMode,
};
use bindscan_core::model::store::IncludeList;
use bindscan_core::output::write_results;
use bindscan_core::sequence::io::read_fasta_dataset;
use bindscan_core::worker::CpuDevices;
use bindscan_core::{PredictInput, Predictor};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use log::Level;
use simple_logger::init_with_level;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("bindscan")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Score DNA sequences against binding models")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .required(true)
                .help("Input FASTA file"),
        )
        .arg(
            Arg::new("models")
                .short('m')
                .long("models")
                .value_name("DIR")
                .required(true)
                .help("Model directory"),
        )
        .arg(
            Arg::new("include")
                .long("include")
                .value_name("LIST|FILE")
                .help("Comma-separated model ids, or a file with one id per line"),
        )
        .arg(
            Arg::new("scan")
                .long("scan")
                .value_name("W")
                .value_parser(value_parser!(usize))
                .help("Scan with windows of W bases"),
        )
        .arg(
            Arg::new("stride")
                .long("stride")
                .value_name("S")
                .value_parser(value_parser!(usize))
                .default_value("1")
                .help("Distance between window starts"),
        )
        .arg(
            Arg::new("pmaps")
                .long("pmaps")
                .action(ArgAction::SetTrue)
                .help("Keep prediction maps"),
        )
        .arg(
            Arg::new("gmaps")
                .long("gmaps")
                .action(ArgAction::SetTrue)
                .help("Compute attribution maps"),
        )
        .arg(
            Arg::new("finite-diff")
                .long("finite-diff")
                .action(ArgAction::SetTrue)
                .requires("gmaps")
                .help("Compute attribution by substitution instead of gradients"),
        )
        .arg(
            Arg::new("strand")
                .long("strand")
                .value_name("MODE")
                .value_parser(["single", "both", "force"])
                .default_value("single")
                .help("Strand handling: single, both or force (reverse only)"),
        )
        .arg(
            Arg::new("batch-size")
                .long("batch-size")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Model inputs per evaluation"),
        )
        .arg(
            Arg::new("devices")
                .long("devices")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Number of workers (default: one per core)"),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Threads per worker"),
        )
        .arg(
            Arg::new("no-isolation")
                .long("no-isolation")
                .action(ArgAction::SetTrue)
                .help("Run models sequentially on the main thread"),
        )
        .arg(
            Arg::new("outdir")
                .long("outdir")
                .value_name("DIR")
                .help("Directory for per-run artifacts"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .value_parser(["tsv", "json"])
                .default_value("tsv")
                .help("Output format: tsv, json"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output file (default: stdout)"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .help("Quiet mode"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Verbose mode"),
        )
}

/// Main entry point for the Bindscan CLI application.
///
/// Parses command-line arguments, scores the input sequences against the
/// requested models, and writes results in the requested format.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = cli().get_matches();

    let level = if matches.get_flag("quiet") {
        Level::Warn
    } else if matches.get_flag("verbose") {
        Level::Debug
    } else {
        Level::Info
    };
    init_with_level(level)?;

    if let Err(e) = run(&matches) {
        log::error!("{}", e);
        return Err(e);
    }
    Ok(())
}

fn run(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let strand_mode = match matches.get_one::<String>("strand").map(String::as_str) {
        Some("both") => StrandMode::Both,
        Some("force") => StrandMode::ForceReverse,
        _ => StrandMode::Single,
    };
    let threads = matches.get_one::<usize>("threads").copied();
    let mut config = ScanConfig {
        strand_mode,
        isolate_workers: !matches.get_flag("no-isolation"),
        threads_per_device: threads,
        ..Default::default()
    };
    if let Some(&batch_size) = matches.get_one::<usize>("batch-size") {
        config.batch_size = batch_size;
    }

    let model_dir = matches
        .get_one::<String>("models")
        .ok_or("Model directory is required")?;
    let stride = matches.get_one::<usize>("stride").copied().unwrap_or(1);
    let include = matches
        .get_one::<String>("include")
        .map(|spec| IncludeList::parse(spec))
        .transpose()?;
    let attribution = matches.get_flag("gmaps").then(|| {
        if matches.get_flag("finite-diff") {
            AttributionMode::FiniteDifference
        } else {
            AttributionMode::Analytic
        }
    });

    let request = PredictRequest {
        include,
        scan: matches
            .get_one::<usize>("scan")
            .map(|&size| ScanWindow::new(size, stride)),
        outdir: matches.get_one::<String>("outdir").map(PathBuf::from),
        verbose: matches.get_flag("verbose"),
        want_prediction_maps: matches.get_flag("pmaps"),
        attribution,
        ..PredictRequest::new(model_dir)
    };

    let format = match matches.get_one::<String>("format").map(String::as_str) {
        Some("json") => OutputFormat::Json,
        _ => OutputFormat::Tsv,
    };

    let input = matches
        .get_one::<String>("input")
        .ok_or("Input file is required")?;
    let data = read_fasta_dataset(input)?;
    let row_ids = data.ids().to_vec();
    log::info!("Read {} sequences from {}", row_ids.len(), input);

    let devices = CpuDevices::new(matches.get_one::<usize>("devices").copied()).with_threads(threads);
    let predictor = Predictor::new(config).with_devices(devices);
    let results = predictor.predict(PredictInput::Shared(data), &request)?;

    let mut writer: Box<dyn Write> = if let Some(output_file) = matches.get_one::<String>("output")
    {
        Box::new(BufWriter::new(File::create(output_file)?))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };
    write_results(&mut writer, &results, &row_ids, format)?;
    writer.flush()?;

    log::info!(
        "Scored {} sequences against {} models",
        row_ids.len(),
        results.len()
    );
    Ok(())
}
