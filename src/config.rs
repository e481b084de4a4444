use std::time::Duration;

use clap::{Parser, ValueEnum};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

/// Find the number of concurrent writers that saturates insert throughput.
#[derive(Debug, Parser)]
#[command(name = "saturn", version, about)]
pub struct Config {
    /// Length of every burst, in seconds
    #[arg(
        long,
        env = "BURST_DURATION_SECONDS",
        default_value_t = 3,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub duration: u64,

    /// Exponent of the first worker count (2^power workers)
    #[arg(long, env = "STARTING_POWER", default_value_t = 0)]
    pub start_power: u32,

    /// Give up once the worker count would exceed 2^max-power
    #[arg(long, env = "MAX_POWER", default_value_t = 20)]
    pub max_power: u32,

    /// After the plateau, step one worker at a time below it
    #[arg(long, env = "REFINE")]
    pub refine: bool,

    /// Connection URL of the datastore
    #[arg(long, env = "DATABASE_URL", default_value = "postgres://mq@localhost/mq")]
    pub database_url: String,

    /// Create the `queue` table before probing
    #[arg(long)]
    pub create_table: bool,

    /// Output format of the final report
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

impl Config {
    pub fn burst(&self) -> Duration {
        Duration::from_secs(self.duration)
    }
}
