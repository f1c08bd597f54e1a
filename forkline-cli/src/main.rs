//! forkline: print the fork lineage, recent activity and catalog of a
//! content collection.

mod render;

use std::path::Path;

use alloy_primitives::Address;
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use forkline::{ForklineClient, ForklineConfig, LoadState};
use tracing::info;

#[derive(Parser)]
#[command(name = "forkline")]
#[command(about = "Fork lineage and activity reader for on-chain content collections")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "forkline.toml")]
    config: String,

    /// JSON-RPC endpoint (overrides config file)
    #[arg(long, env = "FORKLINE_RPC_URL")]
    rpc_url: Option<String>,

    /// Content collection address (overrides config file)
    #[arg(long, env = "FORKLINE_CONTENT_ADDRESS")]
    content: Option<Address>,

    /// Fork registry address (overrides config file)
    #[arg(long, env = "FORKLINE_REGISTRY_ADDRESS")]
    registry: Option<Address>,

    /// Voting pool address (overrides config file)
    #[arg(long, env = "FORKLINE_VOTING_POOL_ADDRESS")]
    voting_pool: Option<Address>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the fork lineage forest
    Lineage {
        /// Only show items whose id contains this string
        #[arg(long)]
        search: Option<String>,

        /// With --search, hide the subtree under any non-matching item
        #[arg(long, requires = "search")]
        pruned: bool,

        #[arg(long)]
        json: bool,
    },

    /// Print recent contract events, newest first
    Activity {
        #[arg(long)]
        json: bool,
    },

    /// List content items, newest first
    Catalog {
        /// Include items hidden by moderation
        #[arg(long)]
        show_hidden: bool,

        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("forkline=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = if Path::new(&cli.config).exists() {
        ForklineConfig::load(&cli.config).with_context(|| format!("reading {}", cli.config))?
    } else {
        info!(path = %cli.config, "config file not found, using defaults");
        ForklineConfig::default()
    };

    if let Some(url) = cli.rpc_url {
        config.rpc.url = url;
    }
    if let Some(content) = cli.content {
        config.contracts.content = content;
    }
    if let Some(registry) = cli.registry {
        config.contracts.registry = Some(registry);
    }
    if let Some(pool) = cli.voting_pool {
        config.contracts.voting_pool = Some(pool);
    }

    if let Command::Config = cli.command {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let client = ForklineClient::connect(config)?;

    match cli.command {
        Command::Lineage { search, pruned, json } => {
            client.refresh_lineage().await;
            let forest = ready(client.lineage().await, "lineage")?;
            match search {
                Some(query) if pruned => render::search_hits(&forest.search_pruned(&query), json)?,
                Some(query) => render::search_hits(&forest.search(&query), json)?,
                None => render::forest(&forest, json)?,
            }
        }
        Command::Activity { json } => {
            client.refresh_activity().await;
            let events = ready(client.activity().await, "activity")?;
            render::activity(&events, json)?;
        }
        Command::Catalog { show_hidden, json } => {
            client.refresh_catalog(show_hidden).await;
            let items = ready(client.catalog().await, "catalog")?;
            render::catalog(&items, json)?;
        }
        Command::Config => {}
    }

    client.shutdown();
    Ok(())
}

fn ready<T>(state: LoadState<T>, view: &str) -> anyhow::Result<T> {
    match state {
        LoadState::Ready(value) => Ok(value),
        LoadState::Failed(message) => bail!("{} load failed: {}", view, message),
        LoadState::Idle => bail!("{} load produced no result", view),
    }
}
