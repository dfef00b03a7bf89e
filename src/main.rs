//! CLI tool converting a note list into 8-bit style audio
//!
//! Usage: chipify <notes.txt> [output.wav] [sample_rate] [heap|tree]

use std::env;
use std::fs;
use std::process;

use chipify::bench::run_comparison;
use chipify::pipeline::{parse_note_list, Pipeline, PipelineConfig, SUPPORTED_SAMPLE_RATES};
use chipify::StoreKind;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: chipify <notes.txt> [output.wav] [sample_rate] [heap|tree]

Render a note list as square-wave audio and compare the ordering structures.

Arguments:
  notes.txt     Note list, one `<start> <end> <pitch>` per line
  output.wav    Output WAV file path (optional, defaults to <input>_8bit.wav)
  sample_rate   22050, 44100 or 48000 (optional, defaults to 44100)
  heap|tree     Structure that orders the events (optional, defaults to tree)

Examples:
  chipify song.txt
  chipify song.txt song.wav 22050 heap
";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn default_output_path(input_path: &str) -> String {
    let stem = input_path.strip_suffix(".txt").unwrap_or(input_path);
    format!("{}_8bit.wav", stem)
}

fn parse_store(arg: &str) -> Option<StoreKind> {
    match arg {
        "heap" => Some(StoreKind::MinHeap),
        "tree" => Some(StoreKind::RedBlackTree),
        _ => None,
    }
}

fn main() {
    init_tracing();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args.len() > 5 {
        eprintln!("{}", USAGE);
        process::exit(1);
    }

    let input_path = &args[1];
    let output_path = args
        .get(2)
        .cloned()
        .unwrap_or_else(|| default_output_path(input_path));

    let sample_rate = match args.get(3).map(|s| s.parse::<u32>()) {
        None => 44100,
        Some(Ok(rate)) if SUPPORTED_SAMPLE_RATES.contains(&rate) => rate,
        Some(_) => {
            eprintln!(
                "Error: '{}' is not supported. Available choices: {:?}",
                args[3], SUPPORTED_SAMPLE_RATES
            );
            process::exit(1);
        }
    };

    let store = match args.get(4) {
        None => StoreKind::RedBlackTree,
        Some(arg) => match parse_store(arg) {
            Some(kind) => kind,
            None => {
                eprintln!("Error: unknown store '{}', expected heap or tree", arg);
                process::exit(1);
            }
        },
    };

    let content = match fs::read_to_string(input_path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading {}: {}", input_path, e);
            process::exit(1);
        }
    };

    let notes = match parse_note_list(&content) {
        Ok(notes) => notes,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            process::exit(1);
        }
    };

    println!(">>> Processing file: '{}'\n", input_path);

    let pipeline = Pipeline::new(PipelineConfig {
        sample_rate,
        store,
        ..Default::default()
    });

    let comparison = run_comparison(&pipeline.prepare_events(&notes));
    println!("{}", comparison.report);

    let result = pipeline
        .render_ordered(comparison.ordered_by(store))
        .and_then(|samples| {
            pipeline.write_wav(&samples, &output_path)?;
            Ok(samples)
        });

    match result {
        Ok(samples) => {
            let seconds = samples.len() as f64 / sample_rate as f64;
            println!(
                ">>> Converted \"{}\" -> \"{}\" ({:.2} s)",
                input_path, output_path, seconds
            );
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
