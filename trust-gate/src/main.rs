//! Content Trust Gate CLI
//!
//! ## Usage
//!
//! ```bash
//! # Create the database and write a default config
//! content-trust-gate init
//!
//! # Score content without touching storage
//! content-trust-gate evaluate --title "Launch" --body "It ships in 3 days."
//!
//! # Run content through a gate and print the decision
//! content-trust-gate decide --type comment --title "Hi" --body-file ./comment.txt
//!
//! # Inspect stored decisions and the gate log
//! content-trust-gate lookup <decision-id>
//! content-trust-gate audit --limit 50
//! content-trust-gate stats
//! ```

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use decision_store::AuditRepository;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trust_gate::{Backend, GateConfig, GateRuntime};
use verdict::{ContentType, DecisionId, GateType, HeuristicScorer, Scorer};

#[derive(Parser, Debug)]
#[command(name = "content-trust-gate")]
#[command(about = "Risk gate for published content")]
struct Args {
    /// Path to config file (defaults to <storage-dir>/config.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage directory
    #[arg(long, env = "CTG_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Ruleset tag stamped on new decisions
    #[arg(long, env = "CTG_POLICY_VERSION")]
    policy_version: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct ContentArgs {
    #[arg(long, default_value = "")]
    title: String,

    #[arg(long, conflicts_with = "body_file")]
    body: Option<String>,

    /// Read the body from a file
    #[arg(long)]
    body_file: Option<PathBuf>,

    #[arg(long, default_value = "")]
    url: String,
}

impl ContentArgs {
    fn body(&self) -> anyhow::Result<String> {
        match (&self.body, &self.body_file) {
            (Some(body), _) => Ok(body.clone()),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read body from {:?}", path)),
            (None, None) => Ok(String::new()),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database schema and write a default config
    Init,

    /// Score content (no storage, no audit)
    Evaluate(ContentArgs),

    /// Decide through a gate and print the decision
    Decide {
        /// Surface the content is submitted through
        #[arg(long = "type", default_value = "post")]
        content_type: ContentType,

        #[arg(long, default_value = "0")]
        subject_id: String,

        #[command(flatten)]
        content: ContentArgs,
    },

    /// Print a stored decision
    Lookup { decision_id: String },

    /// Print the gate log
    Audit {
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Only entries referencing this decision
        #[arg(long)]
        decision: Option<String>,
    },

    /// Decision totals by status
    Stats,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<GateConfig> {
    let mut config = match &args.config {
        Some(path) => GateConfig::load(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => {
            let storage_dir = args
                .storage_dir
                .clone()
                .unwrap_or_else(trust_gate::config::default_storage_dir);
            let default_path = storage_dir.join(trust_gate::config::CONFIG_FILE);
            if default_path.exists() {
                GateConfig::load(&default_path)?
            } else {
                GateConfig::default()
            }
        }
    };

    // Apply CLI overrides
    if let Some(dir) = &args.storage_dir {
        config.storage_dir = dir.clone();
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(version) = &args.policy_version {
        config.policy_version = version.clone();
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("content_trust_gate=info".parse()?)
                .add_directive("trust_gate=info".parse()?)
                .add_directive("decision_store=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    if let Command::Evaluate(content) = &args.command {
        let verdict = HeuristicScorer::new().evaluate(&content.title, &content.body()?, &content.url);
        return print_json(&verdict);
    }

    let runtime = GateRuntime::start(&config)?;

    let result = run(&args.command, &config, &runtime).await;

    let written = runtime.shutdown().await;
    info!(written, "Audit log flushed");
    result
}

async fn run(command: &Command, config: &GateConfig, runtime: &GateRuntime) -> anyhow::Result<()> {
    match command {
        Command::Init => {
            let path = config.config_path();
            if path.exists() {
                info!("Config already present at {:?}", path);
            } else {
                std::fs::create_dir_all(&config.storage_dir)?;
                config.save(&path)?;
                info!("Wrote default config to {:?}", path);
            }
            if config.backend == Backend::Sqlite {
                info!("Database ready at {:?}", config.db_path());
            }
            Ok(())
        }

        Command::Evaluate(_) => Ok(()),

        Command::Decide {
            content_type,
            subject_id,
            content,
        } => {
            let body = content.body()?;
            let judgment = runtime
                .gate()
                .context()
                .check(
                    GateType::from(*content_type),
                    subject_id,
                    &content.title,
                    &body,
                    &content.url,
                )
                .await;
            match judgment.view() {
                Some(view) => print_json(&view),
                None => print_json(&json!({
                    "decision_id": judgment.decision_id.as_str(),
                    "decision": null,
                    "enforced": judgment.enforced_status(),
                })),
            }
        }

        Command::Lookup { decision_id } => {
            let id = DecisionId::parse(decision_id)?;
            match runtime.store().lookup(&id).await {
                Some(decision) => print_json(&decision.view()),
                None => bail!("No decision with id {}", id),
            }
        }

        Command::Audit { limit, decision } => {
            let entries = match decision {
                Some(raw) => runtime.audit().by_decision(&DecisionId::parse(raw)?).await?,
                None => runtime.audit().recent(*limit).await?,
            };
            print_json(&entries)
        }

        Command::Stats => {
            let counts = runtime.store().stats().await?;
            let total_logs = runtime.audit().count().await?;
            print_json(&json!({
                "decisions": counts,
                "gate_logs": total_logs,
                "policy_version": runtime.store().policy_version(),
            }))
        }
    }
}
