//! tierio CLI - Storage policy inspection tool
//!
//! This binary lists the storage policies of a suite and runs the replica
//! selection algorithms against them, so placement decisions can be checked
//! by hand.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::Path;
use tierio_common::{PolicyConfig, StorageType, StorageTypeSet, SuiteConfig};
use tierio_policy::{BlockStoragePolicy, BlockStoragePolicySuite};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tierio-cli")]
#[command(about = "tierio storage policy CLI")]
#[command(version)]
struct Args {
    /// Storage policy configuration file (defaults to the standard suite)
    #[arg(short, long, env = "TIERIO_CONFIG")]
    config: Option<String>,

    /// Log level, overriding the config file [default: warn]
    #[arg(long)]
    log_level: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all storage policies
    List,
    /// Show a storage policy
    Show {
        /// Policy name or id
        policy: String,
    },
    /// Storage types still needed for a block
    Choose {
        /// Policy name or id
        #[arg(short, long)]
        policy: String,
        /// Target replication factor
        #[arg(short, long)]
        replication: usize,
        /// Types of existing replicas (e.g. DISK,ARCHIVE)
        #[arg(long, value_delimiter = ',')]
        chosen: Vec<StorageType>,
        /// Types with no space left
        #[arg(short, long, value_delimiter = ',')]
        unavailable: Vec<StorageType>,
        /// Plan a newly created block (creation fallbacks)
        #[arg(long)]
        new_block: bool,
    },
    /// Storage types of replicas that exceed the policy
    Excess {
        /// Policy name or id
        #[arg(short, long)]
        policy: String,
        /// Target replication factor
        #[arg(short, long)]
        replication: usize,
        /// Types of existing replicas (e.g. DISK,DISK,ARCHIVE)
        #[arg(long, value_delimiter = ',')]
        chosen: Vec<StorageType>,
    },
    /// Fallback type for a single replica
    Fallback {
        /// Policy name or id
        #[arg(short, long)]
        policy: String,
        /// Types with no space left
        #[arg(short, long, value_delimiter = ',')]
        unavailable: Vec<StorageType>,
        /// Use replication fallbacks instead of creation fallbacks
        #[arg(long)]
        replication: bool,
    },
}

/// Output of `choose` and `excess`
#[derive(Debug, Serialize)]
struct SelectionOutput {
    policy: String,
    replication: usize,
    chosen: Vec<StorageType>,
    unavailable: Vec<StorageType>,
    storage_types: Vec<StorageType>,
}

/// Output of `fallback`
#[derive(Debug, Serialize)]
struct FallbackOutput {
    policy: String,
    unavailable: Vec<StorageType>,
    fallback: Option<StorageType>,
}

const DEFAULT_LOG_LEVEL: &str = "warn";

/// Load the configuration file, if one was given
fn load_config(path: Option<&str>) -> Result<Option<SuiteConfig>> {
    path.map(|path| {
        SuiteConfig::load(Path::new(path))
            .with_context(|| format!("Failed to load storage policy config {path}"))
    })
    .transpose()
}

/// Log filter used when `RUST_LOG` is unset: `--log-level` wins over the
/// config file's `[logging] level`
fn log_level(cli: Option<&str>, config: Option<&SuiteConfig>) -> String {
    cli.map(str::to_string)
        .or_else(|| config.map(|c| c.logging.level.clone()))
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

/// Build the suite from `config`, or the standard suite when absent
fn build_suite(config: Option<&SuiteConfig>) -> Result<BlockStoragePolicySuite> {
    match config {
        Some(config) => BlockStoragePolicySuite::from_config(config)
            .context("Invalid storage policy config"),
        None => Ok(BlockStoragePolicySuite::create_default_suite()),
    }
}

fn render_policy_table(suite: &BlockStoragePolicySuite) -> String {
    let mut out = String::from("Storage Policies\n================\n");
    out.push_str(&format!(
        "{:<4} {:<14} {:<20} {:<20} {:<20}\n",
        "ID", "NAME", "STORAGE TYPES", "CREATION", "REPLICATION"
    ));
    out.push_str(&"-".repeat(80));
    out.push('\n');
    for policy in suite.all_policies() {
        let name = if policy.id() == suite.default_policy_id() {
            format!("{} *", policy.name())
        } else {
            policy.name().to_string()
        };
        out.push_str(&format!(
            "{:<4} {:<14} {:<20} {:<20} {:<20}\n",
            policy.id(),
            name,
            join(policy.storage_types()),
            join(policy.creation_fallbacks()),
            join(policy.replication_fallbacks()),
        ));
    }
    out
}

fn join(types: &[StorageType]) -> String {
    if types.is_empty() {
        return "-".to_string();
    }
    types.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(",")
}

fn choose(
    policy: &BlockStoragePolicy,
    replication: usize,
    chosen: Vec<StorageType>,
    unavailable: Vec<StorageType>,
    new_block: bool,
) -> SelectionOutput {
    let unavailables: StorageTypeSet = unavailable.iter().copied().collect();
    let storage_types = if unavailables.is_empty() {
        policy.choose_storage_types_with_chosen(replication, &chosen)
    } else {
        policy.choose_storage_types_with_fallback(replication, &chosen, unavailables, new_block)
    };
    debug!("{} chose {:?} for replication {}", policy.name(), storage_types, replication);
    SelectionOutput {
        policy: policy.name().to_string(),
        replication,
        chosen,
        unavailable: unavailables.iter().collect(),
        storage_types,
    }
}

fn excess(policy: &BlockStoragePolicy, replication: usize, chosen: Vec<StorageType>) -> SelectionOutput {
    SelectionOutput {
        policy: policy.name().to_string(),
        replication,
        storage_types: policy.choose_excess(replication, &chosen),
        chosen,
        unavailable: Vec::new(),
    }
}

fn fallback(policy: &BlockStoragePolicy, unavailable: &[StorageType], replication: bool) -> FallbackOutput {
    let unavailables = StorageTypeSet::of(unavailable);
    FallbackOutput {
        policy: policy.name().to_string(),
        unavailable: unavailables.iter().collect(),
        fallback: policy.fallback(unavailables, !replication),
    }
}

fn render_selection(output: &SelectionOutput) -> String {
    format!(
        "Policy: {}\nReplication: {}\nChosen: {}\nUnavailable: {}\nResult: {}\n",
        output.policy,
        output.replication,
        join(&output.chosen),
        join(&output.unavailable),
        join(&output.storage_types),
    )
}

/// Run a command against `suite` and render its output
fn run(command: Commands, json: bool, suite: &BlockStoragePolicySuite) -> Result<String> {
    let rendered = match command {
        Commands::List => {
            if json {
                let policies: Vec<PolicyConfig> = suite.all_policies().map(PolicyConfig::from).collect();
                serde_json::to_string_pretty(&policies)?
            } else {
                render_policy_table(suite)
            }
        }
        Commands::Show { policy } => {
            let policy = suite.resolve_policy(&policy)?;
            if json {
                serde_json::to_string_pretty(&PolicyConfig::from(policy))?
            } else {
                let mut out = format!("{policy}\n");
                if policy.is_copy_on_create_file() {
                    out.push_str("Copy on create: yes\n");
                }
                out
            }
        }
        Commands::Choose {
            policy,
            replication,
            chosen,
            unavailable,
            new_block,
        } => {
            let policy = suite.resolve_policy(&policy)?;
            let output = choose(policy, replication, chosen, unavailable, new_block);
            if json {
                serde_json::to_string_pretty(&output)?
            } else {
                render_selection(&output)
            }
        }
        Commands::Excess {
            policy,
            replication,
            chosen,
        } => {
            let policy = suite.resolve_policy(&policy)?;
            let output = excess(policy, replication, chosen);
            if json {
                serde_json::to_string_pretty(&output)?
            } else {
                render_selection(&output)
            }
        }
        Commands::Fallback {
            policy,
            unavailable,
            replication,
        } => {
            let policy = suite.resolve_policy(&policy)?;
            let output = fallback(policy, &unavailable, replication);
            if json {
                serde_json::to_string_pretty(&output)?
            } else {
                format!(
                    "Policy: {}\nUnavailable: {}\nFallback: {}\n",
                    output.policy,
                    join(&output.unavailable),
                    output.fallback.map_or("none", StorageType::as_str),
                )
            }
        }
    };
    Ok(rendered)
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load config file before logging so its level applies
    let config = load_config(args.config.as_deref())?;
    let level = log_level(args.log_level.as_deref(), config.as_ref());

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let suite = build_suite(config.as_ref())?;
    if let Some(path) = &args.config {
        info!("Loaded {} storage policies from {}", suite.all_policies().count(), path);
    }
    let output = run(args.command, args.json, &suite)?;
    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}
