//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{NodeConfig, TagMap};
use serde::Serialize;
use stream_handler::HandlerRegistry;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    name: String,
    handler: String,
    input_stream_count: usize,
    explicit_sync_set_count: usize,
    queue_capacity: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    let loaded = config_loader::ConfigLoader::load_from_path(&args.config)
        .map_err(|e| e.to_string())
        .and_then(|config| {
            // Handler name is only known to the registry
            if HandlerRegistry::with_builtin().contains(&config.handler) {
                Ok(config)
            } else {
                Err(format!(
                    "unknown input stream handler '{}'",
                    config.handler
                ))
            }
        });

    match loaded {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    name: config.name.clone(),
                    handler: config.handler.clone(),
                    input_stream_count: config.input_streams.len(),
                    explicit_sync_set_count: config.options.sync_sets.len(),
                    queue_capacity: config.queue_capacity,
                }),
            }
        }
        Err(error) => ValidationResult {
            valid: false,
            config_path,
            error: Some(error),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &NodeConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.handler == stream_handler::DEFAULT_INPUT_STREAM_HANDLER
        && !config.options.sync_sets.is_empty()
    {
        warnings.push(format!(
            "{} ignores options.sync_sets - all inputs are synchronized together",
            config.handler
        ));
    }

    // Validation already rejected duplicates, so member counts add up.
    let assigned: usize = config
        .options
        .sync_sets
        .iter()
        .map(|s| s.tag_index.len())
        .sum();
    if let Ok(tag_map) = TagMap::from_streams(&config.input_streams) {
        if assigned > 0 && assigned < tag_map.len() {
            warnings.push(format!(
                "{} input stream(s) not listed in a sync set form an implicit set",
                tag_map.len() - assigned
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Node: {}", summary.name);
            println!("  Handler: {}", summary.handler);
            println!("  Input streams: {}", summary.input_stream_count);
            println!("  Explicit sync sets: {}", summary.explicit_sync_set_count);
            println!("  Queue capacity: {}", summary.queue_capacity);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
