// SPDX-License-Identifier: MIT

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use datasync_rs::datasync::graph::DefinitionLoader;
use datasync_rs::datasync::{
    DataContext, EngineConfig, Evaluator, GraphBuilder, GraphDefinition, SnapshotStore,
};
use dotenv::dotenv;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a graph definition and list every problem found
    Validate {
        /// Path to the definition (.yaml, .yml or .json)
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Evaluate a graph definition against a data context
    Evaluate {
        /// Path to the definition (.yaml, .yml or .json)
        #[arg(short, long)]
        file: PathBuf,

        /// JSON file mapping source references to payloads
        #[arg(short, long)]
        data: PathBuf,

        /// Optional engine config (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Reference time (RFC 3339) for date predicates
        #[arg(long)]
        at: Option<String>,
    },
    /// Print the JSON Schema of the definition format
    Schema,
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Validate { file } => {
            let def = DefinitionLoader::load_file(&file)
                .with_context(|| format!("failed to load {}", file.display()))?;
            let built = GraphBuilder::build_from_def(&def)?;

            println!("{}", serde_json::to_string_pretty(&built.errors)?);
            if !built.is_executable() {
                bail!(
                    "graph '{}' has {} validation error(s)",
                    def.name,
                    built.errors.len()
                );
            }
            println!("Graph '{}' is valid", def.name);
        }
        Commands::Evaluate {
            file,
            data,
            config,
            at,
        } => {
            let config = EngineConfig::load(config.as_deref())?;
            let def = DefinitionLoader::load_file(&file)
                .with_context(|| format!("failed to load {}", file.display()))?;
            let raw = fs::read_to_string(&data)
                .with_context(|| format!("failed to read {}", data.display()))?;
            let context = DataContext::from_json(serde_json::from_str(&raw)?)
                .context("data context must be a JSON object")?;
            let now = match at {
                Some(at) => DateTime::parse_from_rfc3339(&at)
                    .with_context(|| format!("invalid --at timestamp '{}'", at))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };

            let mut built = GraphBuilder::build_from_def(&def)?;
            if !built.is_executable() {
                println!("{}", serde_json::to_string_pretty(&built.errors)?);
                bail!("graph '{}' is a draft and cannot be evaluated", def.name);
            }

            let evaluator = Evaluator::new()
                .with_change_store(Arc::new(SnapshotStore::for_change_detection(&config)))
                .with_failure_store(Arc::new(SnapshotStore::for_failures(&config)));
            let result = match evaluator.evaluate_at(&mut built.graph, &context, now) {
                Ok(result) => result,
                Err(e) => {
                    if let Some(failure) = evaluator.last_failure(&def.name, now) {
                        eprintln!("{}", serde_json::to_string_pretty(&failure)?);
                    }
                    return Err(e.into());
                }
            };

            println!(
                "{}",
                serde_json::json!({ "graph": def.name, "result": result })
            );
        }
        Commands::Schema => {
            let schema = schemars::schema_for!(GraphDefinition);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }

    Ok(())
}
