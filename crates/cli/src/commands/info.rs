//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{NodeConfig, SyncSetHandlerOptions, TagMap};
use serde::Serialize;
use stream_handler::{partition_sync_sets, DEFAULT_INPUT_STREAM_HANDLER};
use tracing::info;

use crate::cli::InfoArgs;

/// Node info for JSON output
#[derive(Serialize)]
struct NodeInfo {
    name: String,
    handler: String,
    queue_capacity: usize,
    channels: Vec<ChannelInfo>,
    sync_sets: Vec<SyncSetInfo>,
}

#[derive(Serialize)]
struct ChannelInfo {
    id: usize,
    tag: String,
    index: usize,
    name: String,
}

#[derive(Serialize)]
struct SyncSetInfo {
    index: usize,
    implicit: bool,
    streams: Vec<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let node_info = build_node_info(&config)?;
    if args.json {
        let json =
            serde_json::to_string_pretty(&node_info).context("Failed to serialize node info")?;
        println!("{}", json);
    } else {
        print_node_info(&node_info);
    }

    Ok(())
}

fn build_node_info(config: &NodeConfig) -> Result<NodeInfo> {
    let tag_map = TagMap::from_streams(&config.input_streams)?;

    let channels = tag_map
        .ids()
        .map(|id| {
            let (tag, index) = tag_map
                .tag_index(id)
                .map(|ti| (ti.tag.clone(), ti.index))
                .unwrap_or_default();
            ChannelInfo {
                id: id.index(),
                tag,
                index,
                name: tag_map.name(id).unwrap_or_default().to_string(),
            }
        })
        .collect();

    let options = if config.handler == DEFAULT_INPUT_STREAM_HANDLER {
        SyncSetHandlerOptions::default()
    } else {
        config.options.clone()
    };
    let sync_sets = partition_sync_sets(&options, &tag_map)?
        .iter()
        .map(|set| SyncSetInfo {
            index: set.origin(),
            implicit: set.is_implicit(),
            streams: set
                .ids()
                .iter()
                .map(|id| tag_map.name(*id).unwrap_or_default().to_string())
                .collect(),
        })
        .collect();

    Ok(NodeInfo {
        name: config.name.clone(),
        handler: config.handler.clone(),
        queue_capacity: config.queue_capacity,
        channels,
        sync_sets,
    })
}

fn print_node_info(node: &NodeInfo) {
    println!("=== Node {} ===\n", node.name);
    println!("Handler: {}", node.handler);
    println!("Queue capacity: {}", node.queue_capacity);

    println!("\nChannels ({})", node.channels.len());
    for (i, channel) in node.channels.iter().enumerate() {
        let prefix = if i + 1 == node.channels.len() { "└─" } else { "├─" };
        let tag = if channel.tag.is_empty() { "<none>" } else { channel.tag.as_str() };
        println!(
            "   {} #{} {}:{} {}",
            prefix, channel.id, tag, channel.index, channel.name
        );
    }

    println!("\nSync sets ({})", node.sync_sets.len());
    for (i, set) in node.sync_sets.iter().enumerate() {
        let prefix = if i + 1 == node.sync_sets.len() { "└─" } else { "├─" };
        let kind = if set.implicit { " (implicit)" } else { "" };
        println!(
            "   {} [{}]{} {}",
            prefix,
            set.index,
            kind,
            set.streams.join(", ")
        );
    }

    println!();
}
