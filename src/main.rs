use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use saturn::{
    postgres::PostgresWriter, BurstSampler, JsonReporter, Reporter, Search, SearchReport,
    StdoutReporter,
};

mod config;

use config::{Config, Format};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let config = Config::parse();

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    tracing::debug!("{config:?}");
    let writer = PostgresWriter::new(&config.database_url);
    if config.create_table {
        writer
            .create_table()
            .await
            .context("failed to create the queue table")?;
    }

    let sampler = BurstSampler::builder()
        .writer(Arc::new(writer))
        .duration(config.burst())
        .build();
    let search = Search::builder()
        .start_power(config.start_power)
        .max_power(config.max_power)
        .refine(config.refine)
        .build();

    let outcome = search.run(&sampler).await?;

    let report = SearchReport::from(&outcome);
    let res = match config.format {
        Format::Text => StdoutReporter.report(&report).await,
        Format::Json => JsonReporter.report(&report).await,
    };
    res.map_err(|e| anyhow::anyhow!("failed to write the report: {e}"))
}
