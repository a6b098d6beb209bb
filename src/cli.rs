// CLI definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "eclight")]
#[command(author, version, about = "Per-zone RGB keyboard backlight control")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Use a specific config file instead of the XDG default
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Force simulated mode (no hardware commands issued)
    #[arg(long, global = true)]
    pub simulate: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe control methods and report which one is active
    #[command(visible_alias = "d")]
    Detect,

    /// Show control method, zone colors, brightness, and circuit state
    #[command(visible_aliases = ["stat", "s"])]
    Status,

    /// Set all zones (or one zone) to a color
    Set {
        /// Color: "#RRGGBB" or a name like 'red', 'cyan'
        color: String,
        /// Zone index (0-3); omit to set every zone
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..4))]
        zone: Option<u8>,
    },

    /// Set each zone's color individually
    Zones {
        /// Four colors, left to right
        #[arg(num_args = 4)]
        colors: Vec<String>,
    },

    /// Set keyboard backlight brightness
    #[command(visible_aliases = ["bright", "b"])]
    Brightness {
        /// Brightness percent (0-100)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        level: u8,
    },

    /// Turn every zone off
    Clear,

    /// List available effects
    Effects,

    /// Run an animated effect until Ctrl-C (or --duration)
    #[command(visible_alias = "e")]
    Effect {
        /// Effect name: breathing, color-cycle, wave, zone-chase, starlight,
        /// strobe, scanner, ripple
        kind: String,

        /// Base color (ignored with --rainbow)
        #[arg(short, long, default_value = "white")]
        color: String,

        /// Speed in cycles per second
        #[arg(short, long, default_value_t = 1.0)]
        speed: f32,

        /// Derive hues from time/zone instead of the base color
        #[arg(long)]
        rainbow: bool,

        /// Reverse the propagation direction (wave, zone-chase)
        #[arg(long)]
        reverse: bool,

        /// Stop automatically after this many seconds
        #[arg(long, value_name = "SECS")]
        duration: Option<f64>,
    },
}
