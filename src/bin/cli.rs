//! tracecompare CLI - compare a challenger recording against a reference track
//!
//! Usage:
//!   tracecompare-cli compare --reference <ref.gpx> --challenger <a.gpx> [<b.gpx> ...]
//!   tracecompare-cli decode <file.gpx> [...]
//!
//! Prints the accuracy and worst rolling-window figures, and optionally
//! writes the full comparison result as JSON for the report renderer.

use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracecompare::{
    CompareConfig, CompareError, ComparisonResult, DecodeOptions, GpxInput, compare_tracks,
    decode_gpx,
};

#[derive(Parser)]
#[command(name = "tracecompare-cli")]
#[command(about = "Compare a GPS recording against a reference track", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare challenger GPX file(s) against a reference GPX file
    Compare {
        /// Reference track
        #[arg(short, long)]
        reference: PathBuf,

        /// Challenger recording(s), in any order
        #[arg(short, long, num_args = 1.., required = true)]
        challenger: Vec<PathBuf>,

        /// JSON file with a comparison configuration (camelCase keys)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Rolling window duration in hours
        #[arg(long)]
        rolling_hours: Option<f64>,

        /// "On track" distance in meters
        #[arg(long)]
        trigger: Option<f64>,

        /// Deviation distance that makes a run count as missed, in meters
        #[arg(long)]
        tolerance: Option<f64>,

        /// Search budget in meters before giving up on a reference point
        #[arg(long)]
        max_detour: Option<f64>,

        /// Segment length in meters above which point distance is used
        #[arg(long)]
        max_seg_length: Option<f64>,

        /// Write the full result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode GPX file(s) and show their lines
    Decode {
        /// GPX files
        #[arg(num_args = 1.., required = true)]
        files: Vec<PathBuf>,

        /// Require timestamps (challenger rules)
        #[arg(long)]
        timed: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let outcome = match cli.command {
        Commands::Compare {
            reference,
            challenger,
            config,
            rolling_hours,
            trigger,
            tolerance,
            max_detour,
            max_seg_length,
            output,
        } => load_config(config.as_deref()).and_then(|mut cfg| {
            if let Some(v) = rolling_hours {
                cfg.rolling_duration_hours = v;
            }
            if let Some(v) = trigger {
                cfg.trigger_meters = v;
            }
            if let Some(v) = tolerance {
                cfg.tolerance_meters = v;
            }
            if let Some(v) = max_detour {
                cfg.max_detour_meters = v;
            }
            if let Some(v) = max_seg_length {
                cfg.max_seg_length_meters = v;
            }
            run_compare(&reference, &challenger, &cfg, output.as_deref())
        }),
        Commands::Decode { files, timed } => run_decode(&files, timed),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Start from defaults, or from a JSON config file
fn load_config(path: Option<&Path>) -> Result<CompareConfig, String> {
    let Some(path) = path else {
        return Ok(CompareConfig::default());
    };
    let content = fs::read_to_string(path)
        .map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("invalid config {}: {}", path.display(), e))
}

/// Read GPX files from disk
fn read_inputs(paths: &[PathBuf]) -> Result<Vec<GpxInput>, String> {
    paths
        .iter()
        .map(|path| {
            let contents =
                fs::read(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            let filename = path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown")
                .to_string();
            Ok(GpxInput::new(filename, contents))
        })
        .collect()
}

fn describe(err: CompareError) -> String {
    match err {
        CompareError::InvalidFiles(files) => {
            let mut msg = String::from("some GPX files could not be used:");
            for f in files {
                msg.push_str(&format!("\n  - {}", f));
            }
            msg
        }
        other => other.to_string(),
    }
}

fn run_compare(
    reference: &Path,
    challenger: &[PathBuf],
    config: &CompareConfig,
    output: Option<&Path>,
) -> Result<(), String> {
    println!("\n{}", "=".repeat(60));
    println!("TRACK COMPARISON");
    println!("{}", "=".repeat(60));

    println!("\n[Step 1] Decoding GPX files...");
    let reference_track = decode_gpx(
        &read_inputs(&[reference.to_path_buf()])?,
        DecodeOptions::reference(),
    )
    .map_err(describe)?
    .into_track();
    println!("  Reference: {} points", reference_track.len());

    let challenger_track = decode_gpx(&read_inputs(challenger)?, DecodeOptions::challenger())
        .map_err(describe)?
        .into_track();
    println!(
        "  Challenger: {} points from {} file(s)",
        challenger_track.len(),
        challenger.len()
    );

    println!("\n[Step 2] Comparing...");
    println!(
        "  trigger {} m, tolerance {} m, max detour {} m, max segment {} m, window {} h",
        config.trigger_meters,
        config.tolerance_meters,
        config.max_detour_meters,
        config.max_seg_length_meters,
        config.rolling_duration_hours
    );
    let result = compare_tracks(&reference_track, &challenger_track, config).map_err(describe)?;

    print_summary(&result);

    if let Some(path) = output {
        let file = File::create(path)
            .map_err(|e| format!("cannot create {}: {}", path.display(), e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &result)
            .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
        println!("\nResult written to {}", path.display());
    }

    Ok(())
}

fn print_summary(result: &ComparisonResult) {
    let accuracy = &result.accuracy;

    println!("\n{}", "=".repeat(60));
    println!("ACCURACY");
    println!("{}", "=".repeat(60));
    println!(
        "  Reference length: {:.2} km",
        accuracy.reference_length_meters / 1000.0
    );
    println!(
        "  Missed: {:.2} km ({:.2}%) in {} segment(s)",
        accuracy.missed_length_meters / 1000.0,
        accuracy.missed_ratio * 100.0,
        result.tracks.missed_segments.len()
    );
    for (i, segment) in result.tracks.missed_segments.iter().enumerate() {
        if let (Some(first), Some(last)) = (segment.first(), segment.last()) {
            println!(
                "    #{}: {} points, ({:.5}, {:.5}) -> ({:.5}, {:.5})",
                i + 1,
                segment.len(),
                first.latitude,
                first.longitude,
                last.latitude,
                last.longitude
            );
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("WORST {} H WINDOW", result.rolling_duration_hours);
    println!("{}", "=".repeat(60));
    match result.kpi() {
        Ok(kpi) => {
            println!(
                "  Distance: {:.2} km, mean speed {:.2} km/h",
                kpi.window_distance_meters / 1000.0,
                kpi.mean_speed_kmh
            );
            println!(
                "  From km {:.2} to km {:.2} of the reference",
                kpi.window_start.distance_meters / 1000.0,
                kpi.window_end.distance_meters / 1000.0
            );
            if let Some(start) = kpi.window_start_time {
                println!("  Starting at {}", start.to_rfc3339());
            }
        }
        Err(e) => println!("  Not available: {}", e),
    }
}

fn run_decode(files: &[PathBuf], timed: bool) -> Result<(), String> {
    let options = DecodeOptions {
        timestamps_required: timed,
    };
    let decoded = decode_gpx(&read_inputs(files)?, options).map_err(describe)?;

    println!("Decoded {} line(s):", decoded.lines.len());
    for (i, line) in decoded.lines.iter().enumerate() {
        let first = line.first().and_then(|p| p.time);
        let last = line.last().and_then(|p| p.time);
        match (first, last) {
            (Some(a), Some(b)) => println!(
                "  [{}] {} points, {} -> {}",
                i,
                line.len(),
                a.to_rfc3339(),
                b.to_rfc3339()
            ),
            _ => println!("  [{}] {} points, untimed", i, line.len()),
        }
    }
    println!("Total: {} points", decoded.point_count());

    Ok(())
}
