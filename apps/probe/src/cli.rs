use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "dnsprobe", version)]
#[command(
    about = "Fills a dnsprobe database with DNS probe statistics. Durations are in ms.",
    long_about = None
)]
pub struct Args {
    /// Add the listed domains (names already stored are skipped)
    #[arg(short, long, conflicts_with = "delete")]
    pub add: bool,

    /// Delete the listed domains and their measurements
    #[arg(short, long)]
    pub delete: bool,

    /// Database file or libsql URL
    #[arg(short = 'b', long)]
    pub database: Option<String>,

    #[arg(short, long)]
    pub user: Option<String>,

    /// Password, used as the auth token for remote databases
    #[arg(short, long)]
    pub password: Option<String>,

    /// Delay between probe passes, in milliseconds
    #[arg(short = 't', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub probe_interval: Option<u64>,

    /// 0 = highest verbosity, 1 = no debug messages, and so on
    #[arg(short, long)]
    pub verbosity: Option<u8>,

    /// Configuration file (defaults to $XDG_CONFIG_HOME/dnsprobe/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Domains to add or delete
    pub domains: Vec<String>,
}
