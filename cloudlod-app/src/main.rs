//! cloudlod
//!
//! Command line front end for the point cloud LOD engine.
//!
//! Commands:
//! - `info`: summary statistics of a point file as JSON
//! - `lod`: parse and echo an LOD options string
//! - `pick`: build an LOD index and intersect a ray with it

mod app;
mod errors;

use clap::{Args as ClapArgs, Parser, Subcommand};
use glam::DVec3;
use std::path::PathBuf;

/// cloudlod - multi-resolution point cloud indexing and picking
#[derive(Parser, Debug)]
#[command(name = "cloudlod")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print point count, bounds and color ranges of a point file
    Info {
        /// Path to a binary point file
        file: PathBuf,

        #[command(flatten)]
        window: WindowArgs,
    },
    /// Parse an LOD options string and print the normalized form
    Lod {
        /// Options such as "10000 100:1000000:20 20:100:10"
        options: String,
    },
    /// Build an LOD index over a point file and pick along a ray
    Pick {
        /// Path to a binary point file
        file: PathBuf,

        /// LOD options: cell capacity followed by min:max:stride buckets
        #[arg(short, long, default_value = "0")]
        options: String,

        /// Ray origin as x,y,z
        #[arg(long, value_parser = app::parse_vec3, allow_hyphen_values = true)]
        origin: DVec3,

        /// Ray direction as x,y,z
        #[arg(long, value_parser = app::parse_vec3, allow_hyphen_values = true)]
        dir: DVec3,

        /// Point that LOD distances are measured from, as x,y,z
        #[arg(long, value_parser = app::parse_vec3, allow_hyphen_values = true)]
        reference: Option<DVec3>,

        /// Largest accepted distance along the ray
        #[arg(long)]
        max_distance: Option<f64>,

        /// Largest accepted distance between a point and the ray
        #[arg(long)]
        radius: Option<f64>,

        /// Pick mode (points, bounds)
        #[arg(short, long, default_value = "points")]
        mode: String,

        #[command(flatten)]
        window: WindowArgs,
    },
}

/// Part of the file to load.
#[derive(ClapArgs, Debug, Clone, Copy)]
struct WindowArgs {
    /// First record to load, as a percentage of the file
    #[arg(long, default_value_t = 0)]
    start: u32,

    /// Share of the file to load in percent, 0 for the rest of the file
    #[arg(long, default_value_t = 0)]
    length: u32,

    /// Keep one record out of every N
    #[arg(long, default_value_t = 1)]
    decimation: u32,
}

fn main() {
    let args = Args::parse();

    app::init_logging(&app::LoggingConfig {
        level: args.log_level.clone(),
    });

    if let Err(e) = app::run(args.command) {
        eprintln!("cloudlod error: {}", e);
        std::process::exit(1);
    }
}
