//! CLI entry point for the nexus-connections graph engine.
//!
//! One-shot subcommands print a single JSON document to stdout. `worker`
//! serves JSON-lines requests from stdin for the life of the process, so the
//! graph cache is shared across requests. Logs always go to stderr.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use nexus_core::config::{load_section, DEFAULT_FILE_PREFIX};
use nexus_core::{EdgeStore, EntityId, EntityKind, EntityRef, EntityStore};
use nexus_graph::{GraphClient, GraphConfig};
use nexus_connections::{
    ConnectionsConfig, ConnectionsEngine, ConnectionsRequest, ErrorLine, MemoryCache, MemoryStore,
};

const ENV_PREFIX: &str = "NEXUS";

#[derive(Parser)]
#[command(name = "nexus-connections")]
#[command(about = "Two-hop connections graph engine for the Nexus entity graph")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Serve from a JSON fixture instead of Neo4j.
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Config file prefix (default: nexus).
    #[arg(short, long, default_value = DEFAULT_FILE_PREFIX, global = true)]
    config: String,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(clap::Args)]
struct RootArgs {
    /// Root entity kind (Person, Group, Organization, Community, Proposal).
    #[arg(long)]
    kind: EntityKind,
    /// Root entity ID.
    #[arg(long)]
    id: String,
}

impl RootArgs {
    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.kind, self.id.as_str())
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print the full two-hop graph around a root.
    Graph {
        #[command(flatten)]
        root: RootArgs,
    },
    /// Print the one-hop delta around a root.
    Expand {
        #[command(flatten)]
        root: RootArgs,
        /// IDs already shown; may be repeated.
        #[arg(long)]
        exclude: Vec<String>,
    },
    /// Serve JSON-lines requests from stdin. Also accepts `invalidate` and
    /// `event` requests, which only matter to a long-lived cache.
    Worker,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config: ConnectionsConfig = load_section(&cli.config, ENV_PREFIX, "connections")?;
    let (edges, entities) = open_stores(&cli).await?;
    let backend = Arc::new(MemoryCache::with_capacity(config.cache_capacity));
    let engine = ConnectionsEngine::new(edges, entities, backend, config)?;

    match cli.command {
        Command::Graph { ref root } => {
            let result = engine.graph(&root.entity_ref()).await?;
            println!("{}", serde_json::to_string(&result)?);
        }
        Command::Expand {
            ref root,
            ref exclude,
        } => {
            let exclude: HashSet<EntityId> =
                exclude.iter().map(|id| EntityId::from(id.as_str())).collect();
            let delta = engine.expand(&root.entity_ref(), &exclude).await?;
            println!("{}", serde_json::to_string(&delta)?);
        }
        Command::Worker => run_worker(&engine).await?,
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    }
}

async fn open_stores(cli: &Cli) -> anyhow::Result<(Arc<dyn EdgeStore>, Arc<dyn EntityStore>)> {
    if let Some(path) = &cli.fixture {
        let store = Arc::new(MemoryStore::load_fixture(path)?);
        let edges: Arc<dyn EdgeStore> = store.clone();
        let entities: Arc<dyn EntityStore> = store;
        return Ok((edges, entities));
    }

    let graph_config: GraphConfig = load_section(&cli.config, ENV_PREFIX, "neo4j")?;
    let client = Arc::new(GraphClient::connect(&graph_config).await?);
    let edges: Arc<dyn EdgeStore> = client.clone();
    let entities: Arc<dyn EntityStore> = client;
    Ok((edges, entities))
}

async fn run_worker(engine: &ConnectionsEngine) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut served = 0u64;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ConnectionsRequest>(line) {
            Ok(request) => engine.handle_request(request).await,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed request line");
                serde_json::to_value(ErrorLine::new(format!("Invalid request: {e}")))?
            }
        };

        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
        served += 1;
    }

    tracing::info!(served, "Worker input closed");
    Ok(())
}
