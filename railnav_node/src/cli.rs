// railnav_node/src/cli.rs

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// railnav: sensor fusion for a train on a marked track.
///
/// Reads relay frames as JSON lines and writes orientation, motion,
/// track-position and speed snapshots as JSON lines.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file. `RAILNAV_*` environment variables override it.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Relay frames to read, one JSON object per line (`-` for stdin).
    #[arg(short, long, default_value = "-")]
    pub input: String,

    /// Where to write snapshots (`-` for stdout). Files are appended to.
    #[arg(short, long, default_value = "-")]
    pub output: String,

    /// Overrides the motion strategy chosen in the configuration.
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long, default_value_t = false)]
    pub print_config: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Integrator,
    Kalman,
}
