use chipify::bench::{run_comparison, run_comparison_parallel};
use chipify::{expand_notes, NoteSpan};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_SIZES: [usize; 4] = [1_000, 10_000, 100_000, 500_000];
const DEFAULT_SEED: u64 = 0x8B17;

struct Args {
    sizes: Vec<usize>,
    seed: u64,
    parallel: bool,
}

fn print_usage() {
    eprintln!("Usage: compare [--parallel] [--seed <n>] [num_notes ...]");
    eprintln!();
    eprintln!("Times the standard sort, the min-heap and the red-black tree on");
    eprintln!("random note lists (two events per note).");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  compare                      # 1k, 10k, 100k and 500k notes");
    eprintln!("  compare --parallel 200000    # one size, methods on separate threads");
}

fn parse_args() -> Result<Args, Box<dyn std::error::Error>> {
    let mut sizes = Vec::new();
    let mut seed = DEFAULT_SEED;
    let mut parallel = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--parallel" => parallel = true,
            "--seed" => {
                let value = args.next().ok_or("--seed needs a value")?;
                seed = value.parse()?;
            }
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            other => sizes.push(other.parse()?),
        }
    }

    if sizes.is_empty() {
        sizes = DEFAULT_SIZES.to_vec();
    }

    Ok(Args {
        sizes,
        seed,
        parallel,
    })
}

/// Random notes spread over a few minutes, quantized so that ties occur
fn random_notes(rng: &mut fastrand::Rng, count: usize) -> Vec<NoteSpan> {
    (0..count)
        .map(|_| {
            let start = rng.u32(0..4_000_000) as f64 / 20_000.0;
            let length = rng.u32(1..2_000) as f64 / 1_000.0;
            NoteSpan::new(start, start + length, rng.u8(36..96))
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args().map_err(|e| {
        print_usage();
        e
    })?;
    let mut rng = fastrand::Rng::with_seed(args.seed);

    for &size in &args.sizes {
        let events = expand_notes(&random_notes(&mut rng, size));
        info!(notes = size, events = events.len(), parallel = args.parallel, "running comparison");

        let comparison = if args.parallel {
            run_comparison_parallel(&events)
        } else {
            run_comparison(&events)
        };

        println!("{}", comparison.report);
        if !comparison.report.orders_agree {
            return Err(format!("methods disagree on the order of {} events", events.len()).into());
        }
    }

    Ok(())
}
