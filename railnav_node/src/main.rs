// railnav_node/src/main.rs

use std::fs::File;
use std::io::{self, BufRead, BufReader};

use anyhow::Context;
use clap::Parser;
use railnav_node::cli::Cli;
use railnav_node::config::NodeConfig;
use railnav_node::output::SnapshotWriter;
use railnav_node::pipeline::Pipeline;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = NodeConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(strategy) = cli.strategy {
        config.apply_strategy(strategy);
    }

    if cli.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    // Logs go to stderr; stdout may carry the snapshots.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.node.log_filter)),
        )
        .init();

    let mut pipeline = Pipeline::new(&config).context("building estimators")?;
    let mut writer = SnapshotWriter::open(&cli.output)
        .with_context(|| format!("opening output {}", cli.output))?;

    let input: Box<dyn BufRead> = if cli.input == "-" {
        Box::new(io::stdin().lock())
    } else {
        let file =
            File::open(&cli.input).with_context(|| format!("opening input {}", cli.input))?;
        Box::new(BufReader::new(file))
    };

    info!(
        input = %cli.input,
        output = %cli.output,
        strategy = config.estimator.motion.kind(),
        timestamps = ?config.node.timestamps,
        "railnav node started"
    );

    for line in input.lines() {
        let line = line.context("reading input")?;
        if let Some(snapshot) = pipeline.process_line(&line) {
            writer.write(&snapshot).context("writing snapshot")?;
        }
    }

    let stats = pipeline.stats();
    info!(
        lines = stats.lines,
        snapshots = stats.snapshots,
        dropped = stats.dropped,
        ignored = stats.ignored,
        vehicles = pipeline.registry().len(),
        "input exhausted"
    );
    Ok(())
}
