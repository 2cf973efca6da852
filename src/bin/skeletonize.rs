//! Skeletonization command-line driver
//!
//! Thins a grey-level volume, builds its voxel tree and writes the results.
//!
//! Usage:
//!     skeletonize [OPTIONS] <INPUT> <OUTPUT_DIR>
//!
//! Options:
//!     -c, --config <FILE>       Pipeline configuration (JSON)
//!     -a, --anchors <FILE>      Anchor volume (.skv, value > 0 is protected)
//!     -p, --priority <FILE>     Priority volume (.skv); chamfer distance if omitted
//!     --low <VALUE>             Background threshold (overrides config)
//!     --high <VALUE>            Anchor threshold (overrides config)
//!     --png <Z>                 Also write slice Z of the skeleton and labels as PNG
//!     --write-config <FILE>     Write the default configuration and exit
//!     -h, --help                Show this help message

use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

use skeletree::core::logging;
use skeletree::pipeline::{Pipeline, PipelineConfig};
use skeletree::volume::slice::{labels_to_gray, save_slice_png};
use skeletree::volume::storage::{VolumeData, VOLUME_FILE_EXTENSION};
use skeletree::volume::Volume;

fn print_help() {
    eprintln!("skeletonize - Topological thinning and voxel tree extraction");
    eprintln!();
    eprintln!("Usage: skeletonize [OPTIONS] <INPUT> <OUTPUT_DIR>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("    -c, --config <FILE>       Pipeline configuration (JSON)");
    eprintln!("    -a, --anchors <FILE>      Anchor volume (.skv, value > 0 is protected)");
    eprintln!("    -p, --priority <FILE>     Priority volume (.skv); chamfer distance if omitted");
    eprintln!("    --low <VALUE>             Background threshold (overrides config)");
    eprintln!("    --high <VALUE>            Anchor threshold (overrides config)");
    eprintln!("    --png <Z>                 Also write slice Z of the skeleton and labels as PNG");
    eprintln!("    --write-config <FILE>     Write the default configuration and exit");
    eprintln!("    -h, --help                Show this help message");
    eprintln!();
    eprintln!("Example:");
    eprintln!("    skeletonize -a soma.skv neurite.skv ./out");
    eprintln!("    skeletonize -c curve.json --low 40 vessels.skv ./out");
}

#[derive(Debug)]
struct Args {
    input: PathBuf,
    output_dir: PathBuf,
    config: Option<PathBuf>,
    anchors: Option<PathBuf>,
    priority: Option<PathBuf>,
    low: Option<f32>,
    high: Option<f32>,
    png_slice: Option<usize>,
}

enum Command {
    Run(Args),
    WriteConfig(PathBuf),
}

fn parse_args() -> Result<Command, String> {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.is_empty() {
        return Err("Missing input volume".to_string());
    }

    let mut config: Option<PathBuf> = None;
    let mut anchors: Option<PathBuf> = None;
    let mut priority: Option<PathBuf> = None;
    let mut low: Option<f32> = None;
    let mut high: Option<f32> = None;
    let mut png_slice: Option<usize> = None;
    let mut positional: Vec<PathBuf> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let mut value = || -> Result<String, String> {
            i += 1;
            args.get(i).cloned().ok_or_else(|| format!("Missing value for {}", flag))
        };
        match flag {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-c" | "--config" => config = Some(PathBuf::from(value()?)),
            "-a" | "--anchors" => anchors = Some(PathBuf::from(value()?)),
            "-p" | "--priority" => priority = Some(PathBuf::from(value()?)),
            "--low" => {
                let v = value()?;
                low = Some(v.parse().map_err(|_| format!("Invalid low threshold: {}", v))?);
            }
            "--high" => {
                let v = value()?;
                high = Some(v.parse().map_err(|_| format!("Invalid high threshold: {}", v))?);
            }
            "--png" => {
                let v = value()?;
                png_slice = Some(v.parse().map_err(|_| format!("Invalid slice: {}", v))?);
            }
            "--write-config" => return Ok(Command::WriteConfig(PathBuf::from(value()?))),
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            path => positional.push(PathBuf::from(path)),
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    let input = positional.next().ok_or("Missing input volume")?;
    let output_dir = positional.next().ok_or("Missing output directory")?;
    if positional.next().is_some() {
        return Err("Too many arguments".to_string());
    }

    Ok(Command::Run(Args { input, output_dir, config, anchors, priority, low, high, png_slice }))
}

fn load_u8(path: &Path) -> skeletree::Result<Volume<u8>> {
    Ok(VolumeData::load(path)?.to_u8()?)
}

fn load_u16(path: &Path) -> skeletree::Result<Volume<u16>> {
    Ok(VolumeData::load(path)?.to_u16()?)
}

fn run(args: &Args) -> skeletree::Result<()> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(low) = args.low {
        config.threshold.low = low;
    }
    if let Some(high) = args.high {
        config.threshold.high = high;
    }
    let pipeline = Pipeline::new(config)?;

    let grey = load_u16(&args.input)?;
    let anchors = args.anchors.as_deref().map(load_u8).transpose()?;
    let priority = args.priority.as_deref().map(load_u16).transpose()?;
    println!("Input: {:?} voxels, voxel size {}", grey.dims(), grey.voxel_size());

    let output = pipeline.run(&grey, anchors.as_ref(), priority.as_ref())?;

    std::fs::create_dir_all(&args.output_dir)?;
    let skeleton_path = args.output_dir.join(format!("skeleton.{}", VOLUME_FILE_EXTENSION));
    VolumeData::from_u8(&output.skeleton).save(&skeleton_path)?;

    let labels = pipeline.label_image(&output)?;
    let max_label = labels.data().iter().copied().max().unwrap_or(0);
    if max_label > u16::MAX as u32 {
        log::warn!("Label {} does not fit 16 bits, values are clamped", max_label);
    }
    let labels16 = labels.map(|v| v.min(u16::MAX as u32) as u16);
    let labels_path = args.output_dir.join(format!("labels.{}", VOLUME_FILE_EXTENSION));
    VolumeData::from_u16(&labels16).save(&labels_path)?;

    let written = pipeline.export(&output, &args.output_dir.join("tree.vtk"))?;

    if let Some(z) = args.png_slice {
        save_slice_png(&output.skeleton, z, &args.output_dir.join(format!("skeleton_z{}.png", z)))?;
        save_slice_png(&labels_to_gray(&labels), z, &args.output_dir.join(format!("labels_z{}.png", z)))?;
    }

    println!();
    println!("Summary:");
    println!("  Voxels removed: {} of {}", output.thinning.removed, output.thinning.candidates);
    if let Some(pruning) = output.pruning {
        println!("  Edges pruned: {}", pruning.short_edges + pruning.high_order_edges);
    }
    println!("  Edges: {}, junctions: {}", output.tree.edges().len(), output.tree.junctions().len());
    println!("  Max branch order: {}", output.tree.max_order());
    println!("  VTK files: {}", written.len());
    println!("  Output: {}", args.output_dir.display());
    Ok(())
}

fn main() {
    logging::init();

    let args = match parse_args() {
        Ok(Command::Run(args)) => args,
        Ok(Command::WriteConfig(path)) => {
            if let Err(e) = PipelineConfig::default().save(&path) {
                eprintln!("Error writing configuration: {}", e);
                std::process::exit(1);
            }
            println!("Default configuration written to {}", path.display());
            return;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    };

    let start = Instant::now();
    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    println!("  Total time: {:.2}s", start.elapsed().as_secs_f64());
}
