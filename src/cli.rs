use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::entities::sequence::FrameDirection;

/// Scroll-driven image sequence animator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Product catalog JSON (default: the built-in flavors)
    #[arg(long = "catalog", value_name = "JSON", global = true)]
    pub catalog: Option<PathBuf>,

    /// Enable debug logging to file (default: flavorseq.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE", global = true)]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    /// Worker threads (overrides the settings file)
    #[arg(long = "workers", value_name = "N", global = true)]
    pub workers: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the asset URL of one frame
    Resolve {
        /// Base path of the sequence, e.g. /images/mango
        #[arg(long)]
        base: String,

        /// Frame number (1-based)
        #[arg(long, value_name = "N")]
        frame: u32,
    },

    /// Print the frame shown at a scroll progress
    Frame {
        /// Progress in [0, 1]; out-of-range values are clamped
        #[arg(long, allow_negative_numbers = true)]
        progress: f64,

        /// forward | reverse
        #[arg(long, default_value = "forward")]
        direction: FrameDirection,

        /// Sequence length (default: from settings)
        #[arg(long, value_name = "N")]
        frames: Option<u32>,
    },

    /// Composite one frame of a product into a PNG snapshot
    Render(RenderArgs),

    /// Run the driver headless: visibility, autoplay, then a scroll sweep
    Simulate(SimulateArgs),

    /// Load every frame of every product and report missing assets
    Preload {
        /// Directory the asset URLs resolve against (default: synthesised frames)
        #[arg(long, value_name = "DIR")]
        assets: Option<PathBuf>,
    },
}

#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Product id (default: first in catalog)
    #[arg(long)]
    pub product: Option<String>,

    /// Directory the asset URLs resolve against (default: synthesised frames)
    #[arg(long, value_name = "DIR")]
    pub assets: Option<PathBuf>,

    /// Scroll progress in [0, 1]
    #[arg(long, default_value_t = 0.0)]
    pub progress: f64,

    /// Logical canvas size
    #[arg(long, value_name = "WxH", default_value = "1280x720", value_parser = parse_size)]
    pub size: (f64, f64),

    /// Device pixel ratio (capped by settings)
    #[arg(long, default_value_t = 1.0)]
    pub dpr: f64,

    /// Output PNG path
    #[arg(short = 'o', long = "out", value_name = "PNG")]
    pub out: PathBuf,
}

#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Product id (default: first in catalog)
    #[arg(long)]
    pub product: Option<String>,

    /// Directory the asset URLs resolve against (default: synthesised frames)
    #[arg(long, value_name = "DIR")]
    pub assets: Option<PathBuf>,

    /// Logical canvas size
    #[arg(long, value_name = "WxH", default_value = "640x360", value_parser = parse_size)]
    pub size: (f64, f64),

    /// Scroll positions sampled after autoplay
    #[arg(long, default_value_t = 24)]
    pub steps: usize,

    /// Switch to the next product halfway through autoplay
    #[arg(long)]
    pub switch: bool,

    /// Save the final canvas as PNG
    #[arg(short = 'o', long = "out", value_name = "PNG")]
    pub out: Option<PathBuf>,
}

/// Parse `WIDTHxHEIGHT`, e.g. `1280x720`.
pub fn parse_size(s: &str) -> Result<(f64, f64), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{}'", s))?;
    let w: f64 = w.trim().parse().map_err(|_| format!("bad width in '{}'", s))?;
    let h: f64 = h.trim().parse().map_err(|_| format!("bad height in '{}'", s))?;
    if !(w > 0.0 && h > 0.0) {
        return Err(format!("size must be positive, got '{}'", s));
    }
    Ok((w, h))
}
