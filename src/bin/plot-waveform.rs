use chipify::event::EventKind;
use chipify::pipeline::{parse_note_list, Pipeline, PipelineConfig};
use chipify::{order_events, Event};
use plotters::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_SAMPLE_RATE: u32 = 8000;
const MAX_POINTS: usize = 20_000;

struct Args {
    input_path: String,
    output_path: String,
    sample_rate: u32,
    start_secs: f64,
    window_secs: f64,
}

fn print_usage() {
    eprintln!("Usage: plot-waveform <notes.txt> <output.svg> [sample_rate] [start_secs] [window_secs]");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  plot-waveform song.txt song.svg                # whole render at 8 kHz");
    eprintln!("  plot-waveform song.txt zoom.svg 44100 1.5 0.02 # 20 ms window at 1.5 s");
}

fn parse_args() -> Result<Args, Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 || args.len() > 6 {
        print_usage();
        return Err("Invalid number of arguments".into());
    }

    let sample_rate: u32 = match args.get(3) {
        Some(s) => s.parse()?,
        None => DEFAULT_SAMPLE_RATE,
    };
    let start_secs: f64 = match args.get(4) {
        Some(s) => s.parse()?,
        None => 0.0,
    };
    let window_secs: f64 = match args.get(5) {
        Some(s) => s.parse()?,
        None => f64::INFINITY,
    };

    if sample_rate == 0 {
        return Err("Sample rate must be positive".into());
    }
    if start_secs < 0.0 || window_secs <= 0.0 {
        return Err("Window start must be non-negative and length positive".into());
    }

    Ok(Args {
        input_path: args[1].clone(),
        output_path: args[2].clone(),
        sample_rate,
        start_secs,
        window_secs,
    })
}

fn check_range(samples: &[f32]) -> Result<(), Box<dyn std::error::Error>> {
    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if peak > 1.0 {
        return Err(format!("Samples exceed full scale: peak {}", peak).into());
    }
    println!("  ✓ Peak amplitude: {:.3}", peak);
    Ok(())
}

fn create_plot(
    args: &Args,
    samples: &[f32],
    events: &[Event],
) -> Result<(), Box<dyn std::error::Error>> {
    let sr = args.sample_rate as f64;
    let first = ((args.start_secs * sr) as usize).min(samples.len());
    let last = if args.window_secs.is_finite() {
        (((args.start_secs + args.window_secs) * sr) as usize).min(samples.len())
    } else {
        samples.len()
    };
    let window = &samples[first..last];
    // Thin out long windows; the plot cannot show more points anyway
    let step = (window.len() / MAX_POINTS).max(1);

    let t0 = first as f64 / sr;
    let t1 = (last as f64 / sr).max(t0 + 1.0 / sr);

    let root = SVGBackend::new(&args.output_path, (1000, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let title = format!(
        "{} ({} Hz, {:.3}s - {:.3}s)",
        args.input_path, args.sample_rate, t0, t1
    );

    let mut chart = ChartBuilder::on(&root)
        .caption(&title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(t0..t1, -1.1f64..1.1f64)?;

    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc("Amplitude")
        .x_labels(10)
        .y_labels(11)
        .draw()?;

    chart.draw_series(LineSeries::new(
        window
            .iter()
            .enumerate()
            .step_by(step)
            .map(|(i, &s)| ((first + i) as f64 / sr, s as f64)),
        BLUE.stroke_width(1),
    ))?;

    // Note on as crosses on the top edge, note off as circles on the bottom
    for event in events.iter().filter(|e| e.timestamp >= t0 && e.timestamp <= t1) {
        match event.kind {
            EventKind::NoteOn => {
                chart.draw_series(std::iter::once(plotters::element::Cross::new(
                    (event.timestamp, 1.05),
                    5,
                    GREEN.filled(),
                )))?;
            }
            EventKind::NoteOff => {
                chart.draw_series(std::iter::once(plotters::element::Circle::new(
                    (event.timestamp, -1.05),
                    4,
                    RED.filled(),
                )))?;
            }
        }
    }

    root.present()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args()?;

    println!("Waveform Plot Generator");
    println!("=======================");
    println!("  Input: {}", args.input_path);
    println!("  Sample rate: {} Hz", args.sample_rate);
    println!();

    let content = std::fs::read_to_string(&args.input_path)?;
    let notes = parse_note_list(&content)?;
    println!("  Parsed {} notes", notes.len());

    let pipeline = Pipeline::new(PipelineConfig {
        sample_rate: args.sample_rate,
        ..Default::default()
    });
    let (events, _) = order_events(&pipeline.prepare_events(&notes), pipeline.config().store);

    print!("  Rendering... ");
    let samples = pipeline.render_ordered(&events)?;
    println!(
        "done ({} samples, {:.3}s)",
        samples.len(),
        samples.len() as f64 / args.sample_rate as f64
    );

    check_range(&samples)?;

    print!("  Creating plot... ");
    create_plot(&args, &samples, &events)?;
    println!("done");

    println!();
    println!("Output: {}", args.output_path);

    Ok(())
}
