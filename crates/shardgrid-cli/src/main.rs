use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "shardgrid",
    about = "ShardGrid — shard-count placement limits",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate shard limits for every node of a routing snapshot.
    ///
    /// Prints the node health verdict (can the node keep its shards) and the
    /// bulk allocation verdict (can it take any shard). With --class, also
    /// evaluates placing one new shard of that class on each node.
    Explain {
        /// Path to shardgrid.toml
        #[arg(short, long, default_value = "shardgrid.toml")]
        config: String,
        /// Path to a JSON routing snapshot
        #[arg(short, long)]
        routing: String,
        /// Workload class of a candidate shard to place
        #[arg(long)]
        class: Option<String>,
        /// Override the cluster limit for this run, as with a live settings update
        #[arg(long, allow_hyphen_values = true)]
        cluster_limit: Option<i32>,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Validate a config file and print the effective limits.
    Check {
        #[arg(short, long, default_value = "shardgrid.toml")]
        config: String,
    },
    /// Print a node's shards from a routing snapshot.
    Show {
        #[arg(short, long)]
        routing: String,
        /// Node id; all nodes when omitted
        #[arg(short, long)]
        node: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,shardgrid=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Explain {
            config,
            routing,
            class,
            cluster_limit,
            format,
        } => commands::explain::explain(&config, &routing, class.as_deref(), cluster_limit, &format),
        Commands::Check { config } => commands::check::check(&config),
        Commands::Show { routing, node } => commands::show::show(&routing, node.as_deref()),
    }
}
