//! `replay` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ReplayArgs;
use crate::pipeline::{InvocationRecord, Replay, ReplayConfig, StatsReport};
use crate::scenario::Scenario;

#[derive(Serialize)]
struct ReplayReport<'a> {
    node: &'a str,
    invocations: &'a [InvocationRecord],
    stats: StatsReport,
}

/// Execute the `replay` command
pub async fn run_replay(args: &ReplayArgs) -> Result<()> {
    info!(
        config = %args.config.display(),
        scenario = %args.scenario.display(),
        "Loading replay inputs"
    );

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let node = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("Failed to load scenario from {}", args.scenario.display()))?;

    let node_name = node.name.clone();
    let replay = Replay::new(ReplayConfig {
        node,
        scenario,
        max_allowance: if args.max_allowance == 0 {
            None
        } else {
            Some(args.max_allowance)
        },
        buffer_size: args.buffer_size,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    });

    let outcome = replay.run().await.context("Replay execution failed")?;

    if args.json {
        let report = ReplayReport {
            node: &node_name,
            invocations: &outcome.invocations,
            stats: outcome.stats.report(),
        };
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize replay report")?;
        println!("{}", json);
    } else {
        println!("=== Invocations of {} ===\n", node_name);
        for record in &outcome.invocations {
            println!("{}", record);
        }
        outcome.stats.print_summary();
    }

    Ok(())
}
